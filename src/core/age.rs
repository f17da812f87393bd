use crate::core::calendar::parse_iso_date;
use crate::domain::model::{CivilDate, MAX_AGE};
use crate::utils::error::Result;
use chrono::Datelike;

/// Mean Gregorian year length in days.
pub const DAYS_PER_YEAR: f64 = 365.2425;

/// Decimal age in years of `birth_date_text` at `reference_date`.
///
/// Format errors come from [`parse_iso_date`]; structurally valid but odd
/// dates (month 13, day 00) return whatever the arithmetic gives.
pub fn compute_age(birth_date_text: &str, reference_date: CivilDate) -> Result<f64> {
    AgeCalculator::new(reference_date).age_of(birth_date_text)
}

/// Today's calendar day in the local time zone, read once per call.
pub fn today_local() -> CivilDate {
    let today = chrono::Local::now().date_naive();
    CivilDate::new(i64::from(today.year()), today.month(), today.day())
}

/// Truncates a decimal age to its histogram bucket. Rejects NaN, negative
/// ages and anything past `MAX_AGE`.
///
/// Only non-negative values get here, so truncation toward zero and floor
/// give the same bucket.
pub fn age_bucket(age: f64) -> Option<u32> {
    if age.is_nan() || age < 0.0 {
        return None;
    }
    let years = age.trunc();
    if years > f64::from(MAX_AGE) {
        return None;
    }
    Some(years as u32)
}

/// Age computation against a fixed reference date; the reference day
/// count is computed once and shared by every consumer.
#[derive(Debug, Clone, Copy)]
pub struct AgeCalculator {
    reference_date: CivilDate,
    reference_days: i64,
}

impl AgeCalculator {
    pub fn new(reference_date: CivilDate) -> Self {
        Self {
            reference_date,
            reference_days: reference_date.to_days(),
        }
    }

    pub fn reference_date(&self) -> CivilDate {
        self.reference_date
    }

    pub fn age_of(&self, birth_date_text: &str) -> Result<f64> {
        let birth = parse_iso_date(birth_date_text)?;
        Ok(self.age_of_date(birth))
    }

    pub fn age_of_date(&self, birth: CivilDate) -> f64 {
        (self.reference_days - birth.to_days()) as f64 / DAYS_PER_YEAR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::HistogramError;

    const REFERENCE: CivilDate = CivilDate::new(2024, 11, 1);

    #[test]
    fn test_same_day_is_zero() {
        let epoch = CivilDate::new(1970, 1, 1);
        assert_eq!(compute_age("1970-01-01", epoch).unwrap(), 0.0);
    }

    #[test]
    fn test_compute_age_known_values() {
        let twenty = compute_age("2004-11-01", REFERENCE).unwrap();
        assert!((twenty - 7305.0 / DAYS_PER_YEAR).abs() < 1e-12);
        assert_eq!(age_bucket(twenty), Some(20));

        let nineteen = compute_age("2005-01-06", REFERENCE).unwrap();
        assert_eq!(age_bucket(nineteen), Some(19));
    }

    #[test]
    fn test_future_birth_date_is_negative() {
        let age = compute_age("2030-01-01", REFERENCE).unwrap();
        assert!(age < 0.0);
        assert_eq!(age_bucket(age), None);
    }

    #[test]
    fn test_format_errors_propagate() {
        assert!(matches!(
            compute_age("not-a-date", REFERENCE),
            Err(HistogramError::DateFormat { .. })
        ));
    }

    #[test]
    fn test_semantically_odd_dates_are_accepted() {
        assert!(compute_age("2004-13-40", REFERENCE).is_ok());
        assert!(compute_age("2004-00-00", REFERENCE).is_ok());
    }

    #[test]
    fn test_age_bucket_bounds() {
        assert_eq!(age_bucket(0.0), Some(0));
        assert_eq!(age_bucket(0.999), Some(0));
        assert_eq!(age_bucket(130.99), Some(130));
        assert_eq!(age_bucket(131.0), None);
        assert_eq!(age_bucket(-0.01), None);
        assert_eq!(age_bucket(f64::NAN), None);
        assert_eq!(age_bucket(f64::INFINITY), None);
    }

    #[test]
    fn test_calculator_reuses_reference_days() {
        let calculator = AgeCalculator::new(REFERENCE);
        assert_eq!(calculator.reference_date(), REFERENCE);
        assert_eq!(calculator.age_of_date(REFERENCE), 0.0);
    }
}
