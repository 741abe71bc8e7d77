pub mod aggregate;
pub mod derive;
pub mod query;
pub mod summary;

use chrono::{DateTime, Local};

/// `fraction` as a percentage with one decimal place.
pub fn round_cfr(fraction: f64) -> f64 {
    (fraction * 1000.0).round() / 10.0
}

/// Rounded percentage `numerator / denominator`, or `None` for a zero
/// denominator.
pub fn cfr(numerator: u64, denominator: u64) -> Option<f64> {
    (denominator != 0).then(|| round_cfr(numerator as f64 / denominator as f64))
}

/// Local calendar date of a sample, `YYYY-MM-DD`.
pub fn date_label(time: i64) -> String {
    DateTime::from_timestamp(time, 0)
        .map(|utc| utc.with_timezone(&Local).format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Local date and time for "last updated" lines.
pub fn datetime_label(time: i64) -> String {
    DateTime::from_timestamp(time, 0)
        .map(|utc| utc.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cfr_rounds_to_one_decimal_percent() {
        assert_eq!(cfr(1, 3), Some(33.3));
        assert_eq!(cfr(2, 3), Some(66.7));
        assert_eq!(cfr(5, 5), Some(100.0));
        assert_eq!(cfr(0, 7), Some(0.0));
    }

    #[test]
    fn test_cfr_of_zero_denominator_is_none() {
        assert_eq!(cfr(0, 0), None);
        assert_eq!(cfr(4, 0), None);
    }

    #[test]
    fn test_date_label_is_iso_date() {
        let label = date_label(1_585_699_200);
        assert_eq!(label.len(), 10);
        assert_eq!(&label[4..5], "-");
    }
}
