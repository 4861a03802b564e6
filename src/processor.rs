//! Request validation and evaluation.
//!
//! Turns a loosely-typed [`Request`] into a strict [`Measurement`], checks
//! the domain constraints and runs the BMI engine. [`process`] never fails:
//! every problem comes back as an error-variant [`Response`].

use crate::bmi::{self, Category, CLASSIFICATION_TABLE};
use crate::protocol::{value_kind, Report, Request, Response};
use serde_json::Value;
use tracing::trace;

/// Validation message for non-positive or non-finite inputs.
pub const INVALID_DATA: &str = "invalid data: height, mass and age must be > 0.";

/// Strictly typed request fields after coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub sex: String,
    pub age: i64,
    /// meters
    pub height: f64,
    /// kilograms
    pub mass: f64,
}

/// Processing errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProcessError {
    /// Field text is not a number of the required kind.
    #[error("invalid value for '{field}': {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    /// Field holds a JSON type that cannot be coerced.
    #[error("invalid type for '{field}': {kind}")]
    InvalidType {
        field: &'static str,
        kind: &'static str,
    },
    /// A value is zero, negative or not finite.
    #[error("{}", INVALID_DATA)]
    OutOfRange,
    /// The computed BMI is not a finite number.
    #[error("BMI is not a finite number")]
    NonFinite,
}

impl Measurement {
    /// Coerce raw request fields. A missing numeric field becomes zero and a
    /// missing `sex` becomes empty; validation happens separately.
    pub fn coerce(request: &Request) -> Result<Self, ProcessError> {
        Ok(Measurement {
            sex: coerce_text(request.sex.as_ref()),
            age: coerce_int("edad", request.age.as_ref())?,
            height: coerce_float("altura", request.height.as_ref())?,
            mass: coerce_float("peso", request.mass.as_ref())?,
        })
    }

    /// All numeric fields must be strictly positive and finite.
    pub fn validate(&self) -> Result<(), ProcessError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if self.age > 0 && positive(self.height) && positive(self.mass) {
            Ok(())
        } else {
            Err(ProcessError::OutOfRange)
        }
    }
}

/// Coerce, validate and evaluate a request.
pub fn evaluate(request: &Request) -> Result<Report, ProcessError> {
    let measurement = Measurement::coerce(request)?;
    measurement.validate()?;

    let bmi = bmi::compute_bmi(measurement.mass, measurement.height);
    if !bmi.is_finite() {
        return Err(ProcessError::NonFinite);
    }
    let category = Category::classify(bmi);
    let rounded = bmi::round2(bmi);
    trace!(bmi, %category, "Evaluated measurement");

    Ok(Report {
        bmi: rounded,
        category,
        message: format!(
            "IMC = {bmi:.2}. Categoría: {category}. Tabla: {CLASSIFICATION_TABLE}"
        ),
        sex: measurement.sex,
        age: measurement.age,
    })
}

/// Evaluate a request into a response record.
pub fn process(request: &Request) -> Response {
    match evaluate(request) {
        Ok(report) => Response::Success(report),
        Err(e) => e.to_response(),
    }
}

/// Error-variant response for an unexpected failure while handling a request.
pub fn processing_error(error: impl std::fmt::Display) -> Response {
    Response::error(format!("error processing data: {error}"))
}

impl ProcessError {
    /// Validation failures carry the combined message as is; everything
    /// else is reported as a processing error.
    pub fn to_response(&self) -> Response {
        match self {
            ProcessError::OutOfRange => Response::error(INVALID_DATA),
            other => processing_error(other),
        }
    }
}

fn coerce_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    }
}

fn coerce_int(field: &'static str, value: Option<&Value>) -> Result<i64, ProcessError> {
    match value {
        None => Ok(0),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| ProcessError::InvalidNumber {
            field,
            value: s.clone(),
        }),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => Ok(i),
            // Integral part of a float, as long as it fits.
            None => match n.as_f64() {
                Some(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Ok(f.trunc() as i64),
                _ => Err(ProcessError::InvalidNumber {
                    field,
                    value: n.to_string(),
                }),
            },
        },
        Some(other) => Err(ProcessError::InvalidType {
            field,
            kind: value_kind(other),
        }),
    }
}

fn coerce_float(field: &'static str, value: Option<&Value>) -> Result<f64, ProcessError> {
    match value {
        None => Ok(0.0),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| ProcessError::InvalidNumber {
            field,
            value: s.clone(),
        }),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| ProcessError::InvalidNumber {
            field,
            value: n.to_string(),
        }),
        Some(other) => Err(ProcessError::InvalidType {
            field,
            kind: value_kind(other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report(request: &Request) -> Report {
        match process(request) {
            Response::Success(report) => report,
            other => panic!("unexpected: {:?}", other),
        }
    }

    fn error_text(request: &Request) -> String {
        match process(request) {
            Response::Error { error } => error,
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_normal_scenario() {
        let report = report(&Request::from_text("M", "30", "1.75", "70"));
        assert_eq!(report.bmi, 22.86);
        assert_eq!(report.category, Category::Normal);
        assert_eq!(report.sex, "M");
        assert_eq!(report.age, 30);
        assert_eq!(
            report.message,
            "IMC = 22.86. Categoría: Normal. Tabla: <18.5 Bajo peso | 18.5-24.9 Normal | \
             25-29.9 Sobrepeso | >=30 Obesidad."
        );
    }

    #[test]
    fn test_underweight_scenario() {
        let report = report(&Request::from_text("F", "25", "1.60", "45"));
        assert_eq!(report.bmi, 17.58);
        assert_eq!(report.category, Category::Underweight);
    }

    #[test]
    fn test_obese_scenario() {
        let report = report(&Request::from_text("O", "40", "1.80", "110"));
        assert_eq!(report.bmi, 33.95);
        assert_eq!(report.category, Category::Obese);
    }

    #[test]
    fn test_rounded_values() {
        for (mass, height, expected) in [
            ("70", "1.75", 22.86),
            ("52.3", "1.58", 20.95),
            ("95.5", "1.91", 26.18),
            ("3.2", "0.5", 12.8),
            ("30.7", "2", 7.67),
        ] {
            let report = report(&Request::from_text("M", "20", height, mass));
            assert_eq!(report.bmi, expected, "mass {mass}, height {height}");
            assert!(
                report.message.starts_with(&format!("IMC = {expected:.2}. ")),
                "{}",
                report.message
            );
        }
    }

    #[test]
    fn test_non_positive_fields_rejected() {
        for (age, height, mass) in [
            ("0", "1.75", "70"),
            ("-3", "1.75", "70"),
            ("30", "0", "70"),
            ("30", "-1.75", "70"),
            ("30", "1.75", "0"),
            ("30", "1.75", "-70"),
        ] {
            let request = Request::from_text("M", age, height, mass);
            assert_eq!(error_text(&request), INVALID_DATA);
        }
    }

    #[test]
    fn test_zero_height_never_reaches_engine() {
        let request = Request::from_text("M", "30", "0", "70");
        assert_eq!(evaluate(&request), Err(ProcessError::OutOfRange));
    }

    #[test]
    fn test_non_finite_rejected() {
        let request = Request::from_text("M", "30", "inf", "70");
        assert_eq!(error_text(&request), INVALID_DATA);
        let request = Request::from_text("M", "30", "1.75", "NaN");
        assert_eq!(error_text(&request), INVALID_DATA);
    }

    #[test]
    fn test_overflowing_bmi_rejected() {
        let request = Request::from_text("M", "30", "1e-200", "1e200");
        assert_eq!(evaluate(&request), Err(ProcessError::NonFinite));
        assert!(error_text(&request).starts_with("error processing data:"));
    }

    #[test]
    fn test_missing_fields_default_then_fail_validation() {
        assert_eq!(error_text(&Request::default()), INVALID_DATA);

        let request = Request {
            sex: None,
            ..Request::from_text("", "30", "1.75", "70")
        };
        assert_eq!(report(&request).sex, "");
    }

    #[test]
    fn test_non_numeric_text_is_processing_error() {
        let request = Request::from_text("M", "thirty", "1.75", "70");
        assert_eq!(
            evaluate(&request),
            Err(ProcessError::InvalidNumber {
                field: "edad",
                value: "thirty".to_string()
            })
        );
        assert!(error_text(&request).starts_with("error processing data:"));

        // An integer age does not accept a decimal point in text form.
        let request = Request::from_text("M", "30.5", "1.75", "70");
        assert!(matches!(
            evaluate(&request),
            Err(ProcessError::InvalidNumber { field: "edad", .. })
        ));
    }

    #[test]
    fn test_json_numbers_accepted() {
        let request = Request {
            sex: Some(json!(" F ")),
            age: Some(json!(41.9)),
            height: Some(json!(2)),
            mass: Some(json!(100.0)),
        };
        let report = report(&request);
        assert_eq!(report.age, 41);
        assert_eq!(report.sex, "F");
        assert_eq!(report.bmi, 25.0);
        assert_eq!(report.category, Category::Overweight);
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let report = report(&Request::from_text("  M ", " 30 ", "\t1.75", "70 "));
        assert_eq!(report.sex, "M");
        assert_eq!(report.age, 30);
        assert_eq!(report.bmi, 22.86);
    }

    #[test]
    fn test_wrong_json_types() {
        let request = Request {
            age: Some(Value::Null),
            ..Request::from_text("M", "30", "1.75", "70")
        };
        assert_eq!(
            evaluate(&request),
            Err(ProcessError::InvalidType {
                field: "edad",
                kind: "null"
            })
        );

        let request = Request {
            mass: Some(json!([70])),
            ..Request::from_text("M", "30", "1.75", "70")
        };
        assert!(matches!(
            evaluate(&request),
            Err(ProcessError::InvalidType { field: "peso", kind: "array" })
        ));
    }

    #[test]
    fn test_non_string_sex_rendered_as_text() {
        let request = Request {
            sex: Some(json!(1)),
            ..Request::from_text("", "30", "1.75", "70")
        };
        assert_eq!(report(&request).sex, "1");
    }

    #[test]
    fn test_process_is_deterministic() {
        let request = Request::from_text("O", "40", "1.80", "110");
        let first = process(&request);
        for _ in 0..10 {
            assert_eq!(process(&request), first);
        }
    }
}
