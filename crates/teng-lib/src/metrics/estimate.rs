use serde::{Deserialize, Serialize};
use std::fmt;

/// A computed quantity, or an explicit marker that it could not be computed.
///
/// Serializes as a number or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Estimate {
    Value(f64),
    #[default]
    Unavailable,
}

impl Estimate {
    pub fn value(&self) -> Option<f64> {
        match self {
            Estimate::Value(v) => Some(*v),
            Estimate::Unavailable => None,
        }
    }
}

impl From<Option<f64>> for Estimate {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Estimate::Unavailable, Estimate::Value)
    }
}

impl From<Estimate> for Option<f64> {
    fn from(value: Estimate) -> Self {
        value.value()
    }
}

impl fmt::Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Estimate::Value(v) => fmt::Display::fmt(v, f),
            Estimate::Unavailable => f.write_str("n/a"),
        }
    }
}

impl fmt::LowerExp for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Estimate::Value(v) => fmt::LowerExp::fmt(v, f),
            Estimate::Unavailable => f.write_str("n/a"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_serializes_as_null() {
        let js = serde_json::to_string(&[Estimate::Value(1.5), Estimate::Unavailable]).unwrap();
        assert_eq!(js, "[1.5,null]");
        let back: Vec<Estimate> = serde_json::from_str(&js).unwrap();
        assert_eq!(back, vec![Estimate::Value(1.5), Estimate::Unavailable]);
    }

    #[test]
    fn formats_marker_distinctly_from_zero() {
        assert_eq!(format!("{:.2}", Estimate::Value(0.0)), "0.00");
        assert_eq!(format!("{:.2}", Estimate::Unavailable), "n/a");
        assert_eq!(format!("{:.2e}", Estimate::Value(1234.0)), "1.23e3");
    }
}
