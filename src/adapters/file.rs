use crate::domain::ports::LineSource;
use crate::utils::error::{HistogramError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LineSource for FileSource {
    type Lines = LossyLines<BufReader<File>>;

    fn open(&self) -> Result<Self::Lines> {
        let file = File::open(&self.path).map_err(|source| HistogramError::SourceUnavailable {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(LossyLines::new(BufReader::new(file)))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Like `BufRead::lines`, but invalid UTF-8 is replaced instead of ending
/// the stream, so a bad line only costs that line. Strips `\n` and `\r\n`.
pub struct LossyLines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LossyLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(64),
        }
    }
}

impl<R: BufRead> Iterator for LossyLines<R> {
    type Item = std::io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    #[test]
    fn test_lossy_lines_strip_terminators() {
        let lines: Vec<String> = LossyLines::new(Cursor::new(b"2004-11-01\r\n2005-01-06\nlast".to_vec()))
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(lines, vec!["2004-11-01", "2005-01-06", "last"]);
    }

    #[test]
    fn test_invalid_utf8_does_not_end_stream() {
        let lines: Vec<String> = LossyLines::new(Cursor::new(b"\xff\xfe\n2005-01-06\n".to_vec()))
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "2005-01-06");
    }

    #[test]
    fn test_file_source_reads_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "2004-11-01").unwrap();
        writeln!(file, "2005-01-06").unwrap();

        let source = FileSource::new(file.path());
        let lines: Vec<String> = source.open().unwrap().map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["2004-11-01", "2005-01-06"]);
    }

    #[test]
    fn test_missing_file_is_source_unavailable() {
        let source = FileSource::new("/definitely/not/here.txt");
        assert!(matches!(source.open(), Err(HistogramError::SourceUnavailable { .. })));
        assert_eq!(source.describe(), "/definitely/not/here.txt");
    }
}
