//! User actions and how keyboard keys / on-screen buttons map onto them.

use crate::functions::ScientificFunction;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operator: {0}")]
pub struct UnknownOperator(pub String);

/// Binary operators the user can append to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

impl Operator {
    /// Text appended to the buffer for this operator.
    pub fn glyph(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "×",
            Operator::Divide => "/",
            Operator::Power => "**",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glyph())
    }
}

impl FromStr for Operator {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Operator::Add),
            "-" | "−" => Ok(Operator::Subtract),
            "×" | "*" => Ok(Operator::Multiply),
            "/" => Ok(Operator::Divide),
            "**" | "^" => Ok(Operator::Power),
            other => Err(UnknownOperator(other.to_string())),
        }
    }
}

/// One discrete user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Append a literal character: digit, `.`, `(`, `)` or `%`.
    Append(char),
    Operator(Operator),
    Function(ScientificFunction),
    Evaluate,
    Backspace,
    Clear,
    ToggleAngleMode,
}

/// Characters the buffer accepts verbatim.
pub fn is_literal(ch: char) -> bool {
    ch.is_ascii_digit() || matches!(ch, '.' | '(' | ')' | '%')
}

impl Action {
    /// Keyboard mapping. Keys without a mapping return `None` and are
    /// ignored by front-ends.
    pub fn from_key(key: &str) -> Option<Action> {
        let action = match key {
            "Enter" | "=" => Action::Evaluate,
            "Backspace" => Action::Backspace,
            "Delete" | "Escape" => Action::Clear,
            "+" => Action::Operator(Operator::Add),
            "-" => Action::Operator(Operator::Subtract),
            "*" => Action::Operator(Operator::Multiply),
            "/" => Action::Operator(Operator::Divide),
            "^" => Action::Operator(Operator::Power),
            _ => {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) if is_literal(ch) => Action::Append(ch),
                    _ => return None,
                }
            }
        };
        Some(action)
    }

    /// On-screen button mapping: every keyboard key plus the function keys,
    /// display glyphs and the angle-mode indicator.
    pub fn from_button(label: &str) -> Option<Action> {
        if let Some(action) = Action::from_key(label) {
            return Some(action);
        }
        if let Ok(func) = label.parse::<ScientificFunction>() {
            return Some(Action::Function(func));
        }
        let action = match label {
            "×" => Action::Operator(Operator::Multiply),
            "−" => Action::Operator(Operator::Subtract),
            "**" | "xʸ" => Action::Operator(Operator::Power),
            "AC" | "C" => Action::Clear,
            "DEL" | "⌫" => Action::Backspace,
            "DEG" | "RAD" | "angle" => Action::ToggleAngleMode,
            "x²" => Action::Function(ScientificFunction::Square),
            "x³" => Action::Function(ScientificFunction::Cube),
            "10ˣ" => Action::Function(ScientificFunction::Pow10),
            "eˣ" => Action::Function(ScientificFunction::Exp),
            "√" => Action::Function(ScientificFunction::Sqrt),
            "|x|" => Action::Function(ScientificFunction::Abs),
            "1/x" => Action::Function(ScientificFunction::Reciprocal),
            "n!" | "x!" => Action::Function(ScientificFunction::Factorial),
            _ => return None,
        };
        Some(action)
    }
}
