//! Arithmetic expression evaluation.
//!
//! The display buffer is turned into evaluator input by [`preprocess`]
//! (display glyphs to ASCII operators, `N%` to `(N/100)`), then tokenized
//! and evaluated by a precedence-climbing parser over `f64`:
//!
//! | level | operators   | assoc |
//! |-------|-------------|-------|
//! | 1     | `+` `-`     | left  |
//! | 2     | `*` `/` `%` | left  |
//! | 3     | `**`        | right |
//!
//! Unary `+`/`-` bind tighter than every binary operator, but a unary
//! operand may not be the base of `**` without parentheses (`-2**2` is
//! rejected, `(-2)**2` and `2**-2` are fine). `++` and `--` are not
//! accepted anywhere. Division by zero follows IEEE rules, `**` follows
//! ECMAScript where it differs from `powf`, and a `NaN` result
//! is reported as [`ExprError::NotANumber`].

use crate::number::digit_run;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExprError {
    #[error("unexpected character '{ch}' at offset {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("malformed number at offset {0}")]
    MalformedNumber(usize),

    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("unexpected token at offset {0}")]
    UnexpectedToken(usize),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unary operand at offset {0} must be parenthesised before '**'")]
    UnaryBeforeExponent(usize),

    #[error("result is not a number")]
    NotANumber,
}

impl ExprError {
    /// `true` for syntax problems, `false` when the input parsed but the
    /// arithmetic produced no usable value.
    pub fn is_parse_failure(&self) -> bool {
        !matches!(self, ExprError::NotANumber)
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

fn percent_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d*\.?\d+)%").expect("percent pattern is valid"))
}

/// Rewrite display text into evaluator input.
pub fn preprocess(display: &str) -> String {
    let ascii = display.replace('×', "*").replace('−', "-");
    percent_pattern()
        .replace_all(&ascii, "($1/100)")
        .into_owned()
}

/// Preprocess and evaluate display text in one step.
pub fn evaluate_display(display: &str) -> Result<f64, ExprError> {
    evaluate(&preprocess(display))
}

/// Evaluate an ASCII arithmetic expression.
pub fn evaluate(source: &str) -> Result<f64, ExprError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
    };
    let value = parser.parse_expression(1)?;
    if let Some(extra) = parser.peek() {
        return Err(ExprError::UnexpectedToken(extra.pos));
    }
    if value.is_nan() {
        return Err(ExprError::NotANumber);
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    StarStar,
    Increment,
    Decrement,
    LParen,
    RParen,
}

#[derive(Debug, Clone, Copy)]
struct Spanned {
    token: Token,
    pos: usize,
}

fn tokenize(source: &str) -> Result<Vec<Spanned>, ExprError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let token = match bytes[pos] {
            b' ' | b'\t' | b'\r' | b'\n' => {
                pos += 1;
                continue;
            }
            b'0'..=b'9' | b'.' => {
                let (value, end) = scan_number(source, pos)?;
                pos = end;
                Token::Number(value)
            }
            b'+' if bytes.get(pos + 1) == Some(&b'+') => {
                pos += 2;
                Token::Increment
            }
            b'-' if bytes.get(pos + 1) == Some(&b'-') => {
                pos += 2;
                Token::Decrement
            }
            b'*' if bytes.get(pos + 1) == Some(&b'*') => {
                pos += 2;
                Token::StarStar
            }
            b'+' => {
                pos += 1;
                Token::Plus
            }
            b'-' => {
                pos += 1;
                Token::Minus
            }
            b'*' => {
                pos += 1;
                Token::Star
            }
            b'/' => {
                pos += 1;
                Token::Slash
            }
            b'%' => {
                pos += 1;
                Token::Percent
            }
            b'(' => {
                pos += 1;
                Token::LParen
            }
            b')' => {
                pos += 1;
                Token::RParen
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                let len = bytes[pos..]
                    .iter()
                    .take_while(|c| c.is_ascii_alphanumeric() || **c == b'_')
                    .count();
                let word = &source[pos..pos + len];
                pos += len;
                match word {
                    "Infinity" => Token::Number(f64::INFINITY),
                    "NaN" => Token::Number(f64::NAN),
                    other => return Err(ExprError::UnknownIdentifier(other.to_string())),
                }
            }
            _ => {
                let ch = source[pos..].chars().next().unwrap_or('\u{fffd}');
                return Err(ExprError::UnexpectedChar { ch, pos });
            }
        };
        tokens.push(Spanned { token, pos: start });
    }

    Ok(tokens)
}

/// Scan `digits [. digits] [e [+-] digits]` starting at `start`.
fn scan_number(source: &str, start: usize) -> Result<(f64, usize), ExprError> {
    let bytes = source.as_bytes();
    let mut end = start;

    let int_digits = digit_run(bytes, end);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digit_run(bytes, end + 1);
        end += 1 + frac_digits;
    }
    if int_digits == 0 && frac_digits == 0 {
        return Err(ExprError::MalformedNumber(start));
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = digit_run(bytes, exp_end);
        if exp_digits == 0 {
            return Err(ExprError::MalformedNumber(start));
        }
        end = exp_end + exp_digits;
    }

    source[start..end]
        .parse::<f64>()
        .map(|value| (value, end))
        .map_err(|_| ExprError::MalformedNumber(start))
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

impl BinaryOp {
    fn from_token(token: Token) -> Option<Self> {
        match token {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            Token::Percent => Some(BinaryOp::Rem),
            Token::StarStar => Some(BinaryOp::Pow),
            _ => None,
        }
    }

    /// (precedence, right associative)
    fn precedence(self) -> (u8, bool) {
        match self {
            BinaryOp::Add | BinaryOp::Sub => (1, false),
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => (2, false),
            BinaryOp::Pow => (3, true),
        }
    }

    fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div => lhs / rhs,
            BinaryOp::Rem => lhs % rhs,
            BinaryOp::Pow => js_pow(lhs, rhs),
        }
    }
}

/// `**` with ECMAScript results where they differ from IEEE `pow`:
/// `1 ** NaN` and `(±1) ** ±Infinity` are `NaN`.
fn js_pow(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        f64::NAN
    } else {
        base.powf(exponent)
    }
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Spanned> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Result<Spanned, ExprError> {
        let spanned = self.peek().ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(spanned)
    }

    fn parse_expression(&mut self, min_prec: u8) -> Result<f64, ExprError> {
        let mut lhs = self.parse_unary()?;

        while let Some(spanned) = self.peek() {
            let Some(op) = BinaryOp::from_token(spanned.token) else {
                break;
            };
            let (prec, right_assoc) = op.precedence();
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let next_min = if right_assoc { prec } else { prec + 1 };
            let rhs = self.parse_expression(next_min)?;
            lhs = op.apply(lhs, rhs);
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<f64, ExprError> {
        let Some(spanned) = self.peek() else {
            return Err(ExprError::UnexpectedEnd);
        };

        let negate = match spanned.token {
            Token::Plus => false,
            Token::Minus => true,
            _ => return self.parse_primary(),
        };
        self.pos += 1;

        let operand = self.parse_unary()?;
        if let Some(next) = self.peek() {
            if next.token == Token::StarStar {
                return Err(ExprError::UnaryBeforeExponent(spanned.pos));
            }
        }
        Ok(if negate { -operand } else { operand })
    }

    fn parse_primary(&mut self) -> Result<f64, ExprError> {
        let spanned = self.next()?;
        match spanned.token {
            Token::Number(value) => Ok(value),
            Token::LParen => {
                let value = self.parse_expression(1)?;
                match self.next()? {
                    Spanned {
                        token: Token::RParen,
                        ..
                    } => Ok(value),
                    other => Err(ExprError::UnexpectedToken(other.pos)),
                }
            }
            _ => Err(ExprError::UnexpectedToken(spanned.pos)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_glyphs_and_percent() {
        assert_eq!(preprocess("5×3"), "5*3");
        assert_eq!(preprocess("10−4"), "10-4");
        assert_eq!(preprocess("50%"), "(50/100)");
        assert_eq!(preprocess("12.5%×8"), "(12.5/100)*8");
        assert_eq!(preprocess("(7)%4"), "(7)%4");
    }

    #[test]
    fn test_display_examples() {
        assert_eq!(evaluate_display("5×3"), Ok(15.0));
        assert_eq!(evaluate_display("10−4"), Ok(6.0));
        assert_eq!(evaluate_display("50%"), Ok(0.5));
        assert_eq!(evaluate_display("200×15%"), Ok(30.0));
    }

    #[test]
    fn test_precedence_and_grouping() {
        assert_eq!(evaluate("2+3*4"), Ok(14.0));
        assert_eq!(evaluate("(2+3)*4"), Ok(20.0));
        assert_eq!(evaluate("10-4-3"), Ok(3.0));
        assert_eq!(evaluate("100/10/5"), Ok(2.0));
        assert_eq!(evaluate("2**3**2"), Ok(512.0));
        assert_eq!(evaluate("2*3**2"), Ok(18.0));
        assert_eq!(evaluate("(7)%4"), Ok(3.0));
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(evaluate("5+-3"), Ok(2.0));
        assert_eq!(evaluate("-5*2"), Ok(-10.0));
        assert_eq!(evaluate("- -4"), Ok(4.0));
        assert_eq!(evaluate("2**-2"), Ok(0.25));
        assert_eq!(evaluate("(-2)**2"), Ok(4.0));
        assert_eq!(evaluate("-2**2"), Err(ExprError::UnaryBeforeExponent(0)));
    }

    #[test]
    fn test_increment_tokens_rejected() {
        assert!(evaluate("5--3").is_err());
        assert!(evaluate("5++3").is_err());
    }

    #[test]
    fn test_literals() {
        assert_eq!(evaluate("5."), Ok(5.0));
        assert_eq!(evaluate(".5*2"), Ok(1.0));
        assert_eq!(evaluate("1e+21*2"), Ok(2e21));
        assert_eq!(evaluate("Infinity-1"), Ok(f64::INFINITY));
        assert_eq!(evaluate("3e"), Err(ExprError::MalformedNumber(0)));
        assert_eq!(evaluate("."), Err(ExprError::MalformedNumber(0)));
    }

    #[test]
    fn test_malformed_input() {
        assert_eq!(evaluate("5/"), Err(ExprError::UnexpectedEnd));
        assert_eq!(evaluate("5+"), Err(ExprError::UnexpectedEnd));
        assert_eq!(evaluate("(5"), Err(ExprError::UnexpectedEnd));
        assert_eq!(evaluate("5)"), Err(ExprError::UnexpectedToken(1)));
        assert_eq!(evaluate("2(3)"), Err(ExprError::UnexpectedToken(1)));
        assert_eq!(evaluate("1.2.3"), Err(ExprError::UnexpectedToken(3)));
        assert_eq!(evaluate("()"), Err(ExprError::UnexpectedToken(1)));
        assert_eq!(evaluate("*5"), Err(ExprError::UnexpectedToken(0)));
        assert_eq!(evaluate(""), Err(ExprError::UnexpectedEnd));
        assert_eq!(
            evaluate("Error"),
            Err(ExprError::UnknownIdentifier("Error".into()))
        );
        assert_eq!(
            evaluate("5×3"),
            Err(ExprError::UnexpectedChar { ch: '×', pos: 1 })
        );
    }

    #[test]
    fn test_division_by_zero_and_nan() {
        assert_eq!(evaluate("5/0"), Ok(f64::INFINITY));
        assert_eq!(evaluate("-5/0"), Ok(f64::NEG_INFINITY));
        assert_eq!(evaluate("0/0"), Err(ExprError::NotANumber));
        assert!(!ExprError::NotANumber.is_parse_failure());
        assert!(ExprError::UnexpectedEnd.is_parse_failure());
    }

    #[test]
    fn test_power_of_one_to_infinity_is_nan() {
        assert_eq!(evaluate("1**(1/0)"), Err(ExprError::NotANumber));
        assert_eq!(evaluate("(0-1)**(1/0)"), Err(ExprError::NotANumber));
        assert_eq!(evaluate("1**(-1/0)"), Err(ExprError::NotANumber));
        assert_eq!(evaluate("1**NaN"), Err(ExprError::NotANumber));
        assert_eq!(evaluate("NaN**0"), Ok(1.0));
        assert_eq!(evaluate("2**(1/0)"), Ok(f64::INFINITY));
        assert_eq!(evaluate("0.5**(1/0)"), Ok(0.0));
    }

    #[test]
    fn test_leading_zeros_read_as_decimal() {
        assert_eq!(evaluate("5+010"), Ok(15.0));
        assert_eq!(evaluate("007"), Ok(7.0));
    }
}
