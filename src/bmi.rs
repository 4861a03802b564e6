//! Body-mass-index computation and classification.
//!
//! Pure functions only. Callers guarantee `height > 0` and finite inputs;
//! nothing here checks for division by zero.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound (exclusive) of the underweight band.
pub const UNDERWEIGHT_LIMIT: f64 = 18.5;
/// Upper bound (exclusive) of the normal band.
pub const NORMAL_LIMIT: f64 = 25.0;
/// Upper bound (exclusive) of the overweight band.
pub const OVERWEIGHT_LIMIT: f64 = 30.0;

/// Human-readable classification table, embedded in every success message.
pub const CLASSIFICATION_TABLE: &str =
    "<18.5 Bajo peso | 18.5-24.9 Normal | 25-29.9 Sobrepeso | >=30 Obesidad.";

/// BMI band. Ranges are half-open: lower bound inclusive, upper exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// `[0, 18.5)`
    #[serde(rename = "Bajo peso")]
    Underweight,
    /// `[18.5, 25.0)`
    #[serde(rename = "Normal")]
    Normal,
    /// `[25.0, 30.0)`
    #[serde(rename = "Sobrepeso")]
    Overweight,
    /// `[30.0, inf)`
    #[serde(rename = "Obesidad")]
    Obese,
}

impl Category {
    /// Classify a BMI value.
    pub fn classify(bmi: f64) -> Self {
        if bmi < UNDERWEIGHT_LIMIT {
            Category::Underweight
        } else if bmi < NORMAL_LIMIT {
            Category::Normal
        } else if bmi < OVERWEIGHT_LIMIT {
            Category::Overweight
        } else {
            Category::Obese
        }
    }

    /// Label used on the wire and in messages.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Underweight => "Bajo peso",
            Category::Normal => "Normal",
            Category::Overweight => "Sobrepeso",
            Category::Obese => "Obesidad",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// `mass / height²`, mass in kilograms and height in meters.
pub fn compute_bmi(mass: f64, height: f64) -> f64 {
    mass / (height * height)
}

/// Round to two decimal places.
///
/// Rounds the exact binary value, so `7.675` (stored as `7.67499…`) gives
/// `7.67`, matching `{:.2}` formatting.
pub fn round2(value: f64) -> f64 {
    format!("{value:.2}").parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_bmi() {
        assert!((compute_bmi(70.0, 1.75) - 22.857142857142858).abs() < 1e-12);
        assert!((compute_bmi(45.0, 1.60) - 17.578125).abs() < 1e-12);
        assert_eq!(compute_bmi(80.0, 2.0), 20.0);
    }

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(Category::classify(0.0), Category::Underweight);
        assert_eq!(Category::classify(18.4999), Category::Underweight);
        assert_eq!(Category::classify(18.5), Category::Normal);
        assert_eq!(Category::classify(24.9999), Category::Normal);
        assert_eq!(Category::classify(25.0), Category::Overweight);
        assert_eq!(Category::classify(29.9999), Category::Overweight);
        assert_eq!(Category::classify(30.0), Category::Obese);
        assert_eq!(Category::classify(1000.0), Category::Obese);
    }

    #[test]
    fn test_classify_is_monotonic() {
        let mut previous = Category::classify(0.0);
        let mut bmi = 0.0;
        while bmi < 60.0 {
            let current = Category::classify(bmi);
            assert!(current >= previous, "band went backwards at {bmi}");
            previous = current;
            bmi += 0.05;
        }
        assert_eq!(previous, Category::Obese);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(22.857142857142858), 22.86);
        assert_eq!(round2(17.578125), 17.58);
        assert_eq!(round2(33.95061728395062), 33.95);
        assert_eq!(round2(20.0), 20.0);
    }

    #[test]
    fn test_round2_just_below_half() {
        // 30.7 / 4 is stored slightly below 7.675
        let bmi = compute_bmi(30.7, 2.0);
        assert_eq!(round2(bmi), 7.67);
        assert_eq!(format!("{:.2}", round2(bmi)), format!("{bmi:.2}"));
        assert_eq!(round2(1.005), 1.0);
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(Category::Underweight.to_string(), "Bajo peso");
        assert_eq!(Category::Obese.label(), "Obesidad");
        assert_eq!(
            serde_json::to_string(&Category::Overweight).unwrap(),
            "\"Sobrepeso\""
        );
    }
}
