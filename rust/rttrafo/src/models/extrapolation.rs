use serde::{
    Deserialize,
    Serialize,
};

use crate::errors::TransformationError;

/// What a non-linear model does with values outside its fitted range.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Extrapolation {
    /// Hold the value at the nearest end of the range.
    #[cfg_attr(feature = "clap", value(name = "constant"))]
    Constant,
    /// Continue along the slope at the nearest end of the range.
    #[default]
    #[cfg_attr(feature = "clap", value(name = "linear"))]
    Linear,
    /// Use a least squares line through all training samples.
    #[cfg_attr(feature = "clap", value(name = "global_linear"))]
    GlobalLinear,
    /// Refuse to evaluate (`OutOfRange`).
    #[cfg_attr(feature = "clap", value(name = "reject"))]
    Reject,
}

impl Extrapolation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::Linear => "linear",
            Self::GlobalLinear => "global_linear",
            Self::Reject => "reject",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "constant" => Some(Self::Constant),
            "linear" | "two-point-linear" => Some(Self::Linear),
            "global_linear" | "global-linear" => Some(Self::GlobalLinear),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

/// Values and slopes at the ends of a fitted range, plus the global line,
/// precomputed at fit time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub min_x: f64,
    pub max_x: f64,
    pub left_value: f64,
    pub left_slope: f64,
    pub right_value: f64,
    pub right_slope: f64,
    pub global_slope: f64,
    pub global_intercept: f64,
}

impl Boundary {
    pub fn contains(&self, x: f64) -> bool {
        x >= self.min_x && x <= self.max_x
    }

    /// `Ok(None)` when `x` is inside the fitted range and the model itself
    /// has to be evaluated.
    pub(crate) fn extrapolate(
        &self,
        policy: Extrapolation,
        x: f64,
    ) -> Result<Option<f64>, TransformationError> {
        if self.contains(x) {
            return Ok(None);
        }
        let below = x < self.min_x;
        let out = match policy {
            Extrapolation::Constant => {
                if below {
                    self.left_value
                } else {
                    self.right_value
                }
            }
            Extrapolation::Linear => {
                if below {
                    self.left_value + self.left_slope * (x - self.min_x)
                } else {
                    self.right_value + self.right_slope * (x - self.max_x)
                }
            }
            Extrapolation::GlobalLinear => self.global_slope * x + self.global_intercept,
            Extrapolation::Reject => {
                return Err(TransformationError::OutOfRange {
                    x,
                    min: self.min_x,
                    max: self.max_x,
                });
            }
        };
        Ok(Some(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundary() -> Boundary {
        Boundary {
            min_x: 10.0,
            max_x: 20.0,
            left_value: 100.0,
            left_slope: 2.0,
            right_value: 200.0,
            right_slope: 3.0,
            global_slope: 10.0,
            global_intercept: 0.0,
        }
    }

    #[test]
    fn inside_range_is_not_extrapolated() {
        let b = boundary();
        for policy in [
            Extrapolation::Constant,
            Extrapolation::Linear,
            Extrapolation::GlobalLinear,
            Extrapolation::Reject,
        ] {
            assert_eq!(b.extrapolate(policy, 10.0).unwrap(), None);
            assert_eq!(b.extrapolate(policy, 15.0).unwrap(), None);
            assert_eq!(b.extrapolate(policy, 20.0).unwrap(), None);
        }
    }

    #[test]
    fn policies_outside_range() {
        let b = boundary();
        assert_eq!(
            b.extrapolate(Extrapolation::Constant, 5.0).unwrap(),
            Some(100.0)
        );
        assert_eq!(
            b.extrapolate(Extrapolation::Constant, 25.0).unwrap(),
            Some(200.0)
        );
        assert_eq!(
            b.extrapolate(Extrapolation::Linear, 5.0).unwrap(),
            Some(90.0)
        );
        assert_eq!(
            b.extrapolate(Extrapolation::Linear, 25.0).unwrap(),
            Some(215.0)
        );
        assert_eq!(
            b.extrapolate(Extrapolation::GlobalLinear, 25.0).unwrap(),
            Some(250.0)
        );
        assert!(matches!(
            b.extrapolate(Extrapolation::Reject, 25.0),
            Err(TransformationError::OutOfRange { .. })
        ));
    }
}
