//! Proleptic Gregorian day counting (Howard Hinnant's `days_from_civil`)
//! and ISO `YYYY-MM-DD` parsing.

use crate::domain::model::CivilDate;
use crate::utils::error::{HistogramError, Result};

/// Days in one 400-year era.
const DAYS_PER_ERA: i64 = 146_097;
/// Day count of 1970-01-01 from 0000-03-01.
const UNIX_EPOCH_OFFSET: i64 = 719_468;

/// Signed day count since 1970-01-01.
///
/// Total: out-of-range month or day values still produce a number. The
/// year-within-era and day-within-year terms use wrapping `u32`
/// arithmetic so such inputs yield the same value on every platform.
/// The `i64` terms wrap as well, so years near `i64::MIN`/`i64::MAX`
/// return a value instead of overflowing.
pub fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    // 年份從三月開始計算，閏日落在年尾
    let year = if month <= 2 { year.wrapping_sub(1) } else { year };
    let era = year.div_euclid(400);
    let year_of_era = year.wrapping_sub(era.wrapping_mul(400)) as u32; // [0, 399]

    let shifted_month = if month > 2 {
        month.wrapping_sub(3)
    } else {
        month.wrapping_add(9)
    };
    let day_of_year = (153u32.wrapping_mul(shifted_month).wrapping_add(2) / 5)
        .wrapping_add(day)
        .wrapping_sub(1);
    let day_of_era = year_of_era
        .wrapping_mul(365)
        .wrapping_add(year_of_era / 4)
        .wrapping_sub(year_of_era / 100)
        .wrapping_add(day_of_year);

    era.wrapping_mul(DAYS_PER_ERA)
        .wrapping_add(i64::from(day_of_era))
        .wrapping_sub(UNIX_EPOCH_OFFSET)
}

impl CivilDate {
    pub fn to_days(&self) -> i64 {
        days_from_civil(self.year, self.month, self.day)
    }
}

/// Parses exactly `YYYY-MM-DD`: ten bytes, `-` at offsets 4 and 7, ASCII
/// digits elsewhere. Month and day ranges are not checked.
pub fn parse_iso_date(text: &str) -> Result<CivilDate> {
    let bytes = text.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return Err(HistogramError::date_format(text));
    }

    let digits = |range: std::ops::Range<usize>| -> Result<u32> {
        bytes[range].iter().try_fold(0u32, |acc, &b| {
            if b.is_ascii_digit() {
                Ok(acc * 10 + u32::from(b - b'0'))
            } else {
                Err(HistogramError::date_format(text))
            }
        })
    };

    Ok(CivilDate {
        year: i64::from(digits(0..4)?),
        month: digits(5..7)?,
        day: digits(8..10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_is_day_zero() {
        assert_eq!(days_from_civil(1970, 1, 1), 0);
        assert_eq!(days_from_civil(1969, 12, 31), -1);
        assert_eq!(days_from_civil(2000, 1, 1), 10_957);
        assert_eq!(days_from_civil(2000, 3, 1), 11_017);
    }

    #[test]
    fn test_negative_year_leap_rules() {
        // -1 不是閏年，0 是閏年
        assert_eq!(days_from_civil(-1, 3, 1) - days_from_civil(-1, 2, 28), 1);
        assert_eq!(days_from_civil(0, 3, 1) - days_from_civil(0, 2, 28), 2);
        assert_eq!(days_from_civil(0, 3, 1), -UNIX_EPOCH_OFFSET);
    }

    #[test]
    fn test_century_leap_rules() {
        assert_eq!(days_from_civil(1900, 3, 1) - days_from_civil(1900, 2, 28), 1);
        assert_eq!(days_from_civil(2000, 3, 1) - days_from_civil(2000, 2, 28), 2);
        assert_eq!(days_from_civil(2024, 3, 1) - days_from_civil(2024, 2, 28), 2);
    }

    #[test]
    fn test_day_count_is_strictly_increasing() {
        for year in -800..=2400 {
            assert!(days_from_civil(year + 1, 6, 15) > days_from_civil(year, 6, 15));
        }

        let mut previous = days_from_civil(2023, 12, 31);
        for month in 1..=12u32 {
            for day in 1..=28u32 {
                let current = days_from_civil(2024, month, day);
                assert!(current > previous, "2024-{}-{} not after previous", month, day);
                previous = current;
            }
        }
    }

    #[test]
    fn test_extreme_years_do_not_overflow() {
        for year in [i64::MIN, i64::MIN + 1, i64::MAX / 100, i64::MAX / 146_097, i64::MAX] {
            for month in [1, 2, 3, 12] {
                let first = days_from_civil(year, month, 1);
                let again = days_from_civil(year, month, 1);
                assert_eq!(first, again, "year {} month {}", year, month);
            }
        }

        // 不溢位的範圍內仍是正確的曆法
        let year = 1_000_000_000;
        assert_eq!(days_from_civil(year, 3, 1) - days_from_civil(year - 400, 3, 1), 146_097);
    }

    #[test]
    fn test_out_of_range_fields_do_not_panic() {
        // 月份 13 會落到下一年的一月
        assert_eq!(days_from_civil(2004, 13, 1), days_from_civil(2005, 1, 1));
        let _ = days_from_civil(2000, 0, 0);
        let _ = days_from_civil(9999, 99, 99);
    }

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(parse_iso_date("2005-01-06").unwrap(), CivilDate::new(2005, 1, 6));
        assert_eq!(parse_iso_date("0000-13-45").unwrap(), CivilDate::new(0, 13, 45));
    }

    #[test]
    fn test_parse_iso_date_rejects_bad_formats() {
        for text in ["2005-1-06", "20050106", "", "2005/01/06", "2005-01-0a", "+005-01-06", "2005-01-06 "] {
            assert!(
                matches!(parse_iso_date(text), Err(HistogramError::DateFormat { .. })),
                "{:?} should be rejected",
                text
            );
        }
    }

    #[test]
    fn test_parse_iso_date_rejects_multibyte_text() {
        assert!(parse_iso_date("2005-01-0é").is_err());
        assert!(parse_iso_date("２００５-01-06").is_err());
    }
}
