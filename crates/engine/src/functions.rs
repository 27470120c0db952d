//! Scientific function table and angle mode.
//!
//! Every function is a pure `f64 -> f64` transform. Trigonometric functions
//! take their argument in the current [`AngleMode`]; inverse trigonometric
//! functions report their result in it.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleMode {
    #[default]
    Radians,
    Degrees,
}

impl AngleMode {
    pub fn toggled(self) -> Self {
        match self {
            AngleMode::Radians => AngleMode::Degrees,
            AngleMode::Degrees => AngleMode::Radians,
        }
    }

    /// Indicator text shown next to the display.
    pub fn label(self) -> &'static str {
        match self {
            AngleMode::Radians => "RAD",
            AngleMode::Degrees => "DEG",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown function: {0}")]
pub struct UnknownFunction(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScientificFunction {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Log,
    Ln,
    Sqrt,
    Square,
    Cube,
    Pow10,
    Abs,
    Exp,
    Reciprocal,
    Factorial,
}

impl ScientificFunction {
    pub const ALL: [ScientificFunction; 16] = [
        ScientificFunction::Sin,
        ScientificFunction::Cos,
        ScientificFunction::Tan,
        ScientificFunction::Asin,
        ScientificFunction::Acos,
        ScientificFunction::Atan,
        ScientificFunction::Log,
        ScientificFunction::Ln,
        ScientificFunction::Sqrt,
        ScientificFunction::Square,
        ScientificFunction::Cube,
        ScientificFunction::Pow10,
        ScientificFunction::Abs,
        ScientificFunction::Exp,
        ScientificFunction::Reciprocal,
        ScientificFunction::Factorial,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScientificFunction::Sin => "sin",
            ScientificFunction::Cos => "cos",
            ScientificFunction::Tan => "tan",
            ScientificFunction::Asin => "asin",
            ScientificFunction::Acos => "acos",
            ScientificFunction::Atan => "atan",
            ScientificFunction::Log => "log",
            ScientificFunction::Ln => "ln",
            ScientificFunction::Sqrt => "sqrt",
            ScientificFunction::Square => "square",
            ScientificFunction::Cube => "cube",
            ScientificFunction::Pow10 => "pow10",
            ScientificFunction::Abs => "abs",
            ScientificFunction::Exp => "exp",
            ScientificFunction::Reciprocal => "reciprocal",
            ScientificFunction::Factorial => "factorial",
        }
    }

    /// Takes an angle argument.
    pub fn is_trig(self) -> bool {
        matches!(
            self,
            ScientificFunction::Sin | ScientificFunction::Cos | ScientificFunction::Tan
        )
    }

    /// Produces an angle result.
    pub fn is_inverse_trig(self) -> bool {
        matches!(
            self,
            ScientificFunction::Asin | ScientificFunction::Acos | ScientificFunction::Atan
        )
    }

    /// Apply the transform. Domain errors surface as `NaN`, overflow as
    /// an infinity; the caller decides what counts as a failure.
    pub fn apply(self, value: f64, mode: AngleMode) -> f64 {
        let arg = if self.is_trig() && mode == AngleMode::Degrees {
            value * PI / 180.0
        } else {
            value
        };

        let result = match self {
            ScientificFunction::Sin => arg.sin(),
            ScientificFunction::Cos => arg.cos(),
            ScientificFunction::Tan => arg.tan(),
            ScientificFunction::Asin => arg.asin(),
            ScientificFunction::Acos => arg.acos(),
            ScientificFunction::Atan => arg.atan(),
            ScientificFunction::Log => arg.log10(),
            ScientificFunction::Ln => arg.ln(),
            ScientificFunction::Sqrt => arg.sqrt(),
            ScientificFunction::Square => arg.powf(2.0),
            ScientificFunction::Cube => arg.powf(3.0),
            ScientificFunction::Pow10 => 10f64.powf(arg),
            ScientificFunction::Abs => arg.abs(),
            ScientificFunction::Exp => arg.exp(),
            ScientificFunction::Reciprocal => 1.0 / arg,
            ScientificFunction::Factorial => factorial(arg),
        };

        if self.is_inverse_trig() && mode == AngleMode::Degrees {
            result * 180.0 / PI
        } else {
            result
        }
    }
}

/// Running product `2 · 3 · … · i` for every `i <= value`.
///
/// The loop bound is the raw value, so `4.5` gives `24` and anything
/// below 2 (negatives included) gives `1`.
fn factorial(value: f64) -> f64 {
    let mut result = 1.0;
    let mut i = 2.0;
    while i <= value {
        result *= i;
        if result.is_infinite() {
            break;
        }
        i += 1.0;
    }
    result
}

impl fmt::Display for ScientificFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScientificFunction {
    type Err = UnknownFunction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScientificFunction::ALL
            .iter()
            .copied()
            .find(|func| func.name() == s)
            .ok_or_else(|| UnknownFunction(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_degrees_trig() {
        assert_eq!(ScientificFunction::Sin.apply(90.0, AngleMode::Degrees), 1.0);
        assert_eq!(ScientificFunction::Asin.apply(1.0, AngleMode::Degrees), 90.0);
        assert!(approx(
            ScientificFunction::Cos.apply(60.0, AngleMode::Degrees),
            0.5
        ));
        assert!(approx(
            ScientificFunction::Atan.apply(1.0, AngleMode::Degrees),
            45.0
        ));
    }

    #[test]
    fn test_radians_trig() {
        assert_eq!(ScientificFunction::Sin.apply(0.0, AngleMode::Radians), 0.0);
        assert!(approx(
            ScientificFunction::Asin.apply(1.0, AngleMode::Radians),
            PI / 2.0
        ));
    }

    #[test]
    fn test_non_trig_ignores_mode() {
        for mode in [AngleMode::Radians, AngleMode::Degrees] {
            assert_eq!(ScientificFunction::Log.apply(1000.0, mode), 3.0);
            assert_eq!(ScientificFunction::Sqrt.apply(16.0, mode), 4.0);
            assert_eq!(ScientificFunction::Square.apply(-3.0, mode), 9.0);
            assert_eq!(ScientificFunction::Cube.apply(2.0, mode), 8.0);
            assert_eq!(ScientificFunction::Pow10.apply(2.0, mode), 100.0);
            assert_eq!(ScientificFunction::Abs.apply(-7.5, mode), 7.5);
            assert_eq!(ScientificFunction::Exp.apply(0.0, mode), 1.0);
            assert_eq!(ScientificFunction::Ln.apply(1.0, mode), 0.0);
        }
    }

    #[test]
    fn test_domain_errors_are_nan() {
        assert!(ScientificFunction::Sqrt
            .apply(-1.0, AngleMode::Radians)
            .is_nan());
        assert!(ScientificFunction::Asin
            .apply(2.0, AngleMode::Degrees)
            .is_nan());
        assert!(ScientificFunction::Log
            .apply(-10.0, AngleMode::Radians)
            .is_nan());
    }

    #[test]
    fn test_reciprocal_of_zero_is_infinite() {
        assert_eq!(
            ScientificFunction::Reciprocal.apply(0.0, AngleMode::Radians),
            f64::INFINITY
        );
        assert_eq!(
            ScientificFunction::Reciprocal.apply(4.0, AngleMode::Radians),
            0.25
        );
    }

    #[test]
    fn test_factorial_loop_bound() {
        assert_eq!(factorial(5.0), 120.0);
        assert_eq!(factorial(10.0), 3628800.0);
        assert_eq!(factorial(4.5), 24.0);
        assert_eq!(factorial(0.0), 1.0);
        assert_eq!(factorial(-3.0), 1.0);
        assert_eq!(factorial(1e300), f64::INFINITY);
    }

    #[test]
    fn test_function_names_round_trip() {
        for func in ScientificFunction::ALL {
            assert_eq!(func.name().parse::<ScientificFunction>(), Ok(func));
        }
        assert_eq!(
            "cosh".parse::<ScientificFunction>(),
            Err(UnknownFunction("cosh".into()))
        );
    }

    #[test]
    fn test_angle_mode_toggle() {
        assert_eq!(AngleMode::default(), AngleMode::Radians);
        assert_eq!(AngleMode::Radians.toggled(), AngleMode::Degrees);
        assert_eq!(AngleMode::Degrees.toggled().label(), "RAD");
    }
}
