use crate::domain::ports::LineSource;
use crate::utils::error::Result;

/// Lines held in memory. Handy for tests and for callers that already
/// have their input loaded.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    lines: Vec<String>,
}

impl MemorySource {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn from_lines<I, L>(lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        Self::new(lines.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

type ReadLine = fn(String) -> std::io::Result<String>;

fn read_ok(line: String) -> std::io::Result<String> {
    Ok(line)
}

impl LineSource for MemorySource {
    type Lines = std::iter::Map<std::vec::IntoIter<String>, ReadLine>;

    fn open(&self) -> Result<Self::Lines> {
        Ok(self.lines.clone().into_iter().map(read_ok as ReadLine))
    }

    fn describe(&self) -> String {
        format!("<memory: {} lines>", self.lines.len())
    }
}
