//! The expression engine – one calculator session.
//!
//! A [`Calculator`] owns the display buffer and the angle mode, applies user
//! actions to them, and runs the timed "Error" display. It never returns a
//! computation failure to the caller: failed evaluations and function
//! applications turn into the error state instead.
//!
//! The error reset is a cancellable deadline rather than a fire-and-forget
//! callback. It fires on the first [`Calculator::poll`] at or after the
//! deadline, and any buffer-affecting input that arrives first cancels it
//! (the buffer resets to "0" and the input is then applied as usual).

use crate::context::AppContext;
use crate::expr::{self, ExprError};
use crate::functions::{AngleMode, ScientificFunction};
use crate::input::{is_literal, Action, Operator};
use crate::number::{format_number, parse_leading_float};
use crate::particles::{ParticleBurst, ParticleSettings};
use crate::traits::Clock;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_DISPLAY: &str = "0";
pub const ERROR_DISPLAY: &str = "Error";

/// Why a computation was rejected. Both kinds look the same on the display.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalcFailure {
    #[error("parse failure: {0}")]
    Parse(String),
    #[error("evaluation failure: {0}")]
    Evaluation(String),
}

impl From<ExprError> for CalcFailure {
    fn from(err: ExprError) -> Self {
        if err.is_parse_failure() {
            CalcFailure::Parse(err.to_string())
        } else {
            CalcFailure::Evaluation(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("'{0}' is not a digit or decimal point")]
    NotDigitOrDot(char),
    #[error("'{0}' cannot be appended to the expression")]
    NotAppendable(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Display shows the initial "0".
    Default,
    Editing,
    /// Display shows "Error" until the reset deadline.
    Error,
}

/// What an action did to the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transition {
    /// Nothing changed (e.g. an operator typed onto "0").
    Unchanged,
    /// The buffer changed.
    Edited,
    /// A result replaced the buffer; `feedback` is set unless particles are
    /// disabled.
    Computed { feedback: Option<ParticleBurst> },
    /// The angle mode flipped.
    ModeChanged { angle_mode: AngleMode },
    /// The computation failed and the error display started.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub display: String,
    pub angle_mode: AngleMode,
    pub phase: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_function: Option<ScientificFunction>,
}

pub struct Calculator {
    buffer: String,
    angle_mode: AngleMode,
    /// Last successfully applied function; cleared by `clear`.
    last_function: Option<ScientificFunction>,
    pending_reset: Option<Instant>,
    reset_delay: Duration,
    particles: ParticleSettings,
    rng: StdRng,
    clock: Arc<dyn Clock>,
}

impl Calculator {
    pub fn new(ctx: &AppContext) -> Self {
        let rng = match ctx.settings.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            buffer: DEFAULT_DISPLAY.to_string(),
            angle_mode: ctx.settings.angle_mode,
            last_function: None,
            pending_reset: None,
            reset_delay: ctx.error_reset_delay(),
            particles: ctx.settings.particles.clone(),
            rng,
            clock: ctx.clock(),
        }
    }

    // -----------------------------------------------------------------------
    // Read-only view
    // -----------------------------------------------------------------------

    pub fn display(&self) -> &str {
        &self.buffer
    }

    pub fn angle_mode(&self) -> AngleMode {
        self.angle_mode
    }

    pub fn last_function(&self) -> Option<ScientificFunction> {
        self.last_function
    }

    pub fn phase(&self) -> Phase {
        if self.pending_reset.is_some() {
            Phase::Error
        } else if self.buffer == DEFAULT_DISPLAY {
            Phase::Default
        } else {
            Phase::Editing
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            display: self.buffer.clone(),
            angle_mode: self.angle_mode,
            phase: self.phase(),
            last_function: self.last_function,
        }
    }

    /// When the error display will reset, if it is showing.
    pub fn reset_deadline(&self) -> Option<Instant> {
        self.pending_reset
    }

    // -----------------------------------------------------------------------
    // Timer
    // -----------------------------------------------------------------------

    /// Fire the error reset if its deadline has passed. Returns `true` when
    /// the display changed.
    pub fn poll(&mut self) -> bool {
        match self.pending_reset {
            Some(deadline) if self.clock.now() >= deadline => {
                self.pending_reset = None;
                self.buffer = DEFAULT_DISPLAY.to_string();
                tracing::debug!("error display expired");
                true
            }
            _ => false,
        }
    }

    /// Cancel a pending error reset ahead of new input. Returns `true` if the
    /// error display was showing.
    fn begin_input(&mut self) -> bool {
        if self.pending_reset.take().is_some() {
            self.buffer = DEFAULT_DISPLAY.to_string();
            tracing::debug!("error display cancelled by input");
            true
        } else {
            false
        }
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    pub fn dispatch(&mut self, action: Action) -> Result<Transition, InputError> {
        let transition = match action {
            Action::Append(ch) => self.append_literal(ch)?,
            Action::Operator(op) => self.append_operator(op),
            Action::Function(func) => self.apply_function(func),
            Action::Evaluate => self.evaluate(),
            Action::Backspace => self.backspace(),
            Action::Clear => self.clear(),
            Action::ToggleAngleMode => self.toggle_angle_mode(),
        };
        Ok(transition)
    }

    /// Append a digit or `.`. A digit typed onto "0" replaces it.
    pub fn append_digit_or_dot(&mut self, token: char) -> Result<Transition, InputError> {
        if !(token.is_ascii_digit() || token == '.') {
            return Err(InputError::NotDigitOrDot(token));
        }
        self.append_literal(token)
    }

    /// Append any literal the input surface types verbatim: digits, `.`,
    /// parentheses and `%`. Everything except `.` replaces a lone "0".
    pub fn append_literal(&mut self, token: char) -> Result<Transition, InputError> {
        if !is_literal(token) {
            return Err(InputError::NotAppendable(token));
        }
        self.begin_input();
        if self.buffer == DEFAULT_DISPLAY && token != '.' {
            self.buffer = token.to_string();
        } else {
            self.buffer.push(token);
        }
        Ok(Transition::Edited)
    }

    /// Append an operator. Ignored while the buffer is "0"; consecutive
    /// operators are accepted and left for `evaluate` to reject.
    pub fn append_operator(&mut self, op: Operator) -> Transition {
        let cleared = self.begin_input();
        if self.buffer == DEFAULT_DISPLAY {
            return unchanged_unless(cleared);
        }
        self.buffer.push_str(op.glyph());
        Transition::Edited
    }

    pub fn backspace(&mut self) -> Transition {
        let cleared = self.begin_input();
        if self.buffer == DEFAULT_DISPLAY {
            return unchanged_unless(cleared);
        }
        if self.buffer.chars().count() <= 1 {
            self.buffer = DEFAULT_DISPLAY.to_string();
        } else {
            self.buffer.pop();
        }
        Transition::Edited
    }

    pub fn clear(&mut self) -> Transition {
        let changed = self.pending_reset.is_some()
            || self.buffer != DEFAULT_DISPLAY
            || self.last_function.is_some();
        self.pending_reset = None;
        self.buffer = DEFAULT_DISPLAY.to_string();
        self.last_function = None;
        unchanged_unless(changed)
    }

    /// Flip between radians and degrees. The buffer and a running error
    /// display are left alone.
    pub fn toggle_angle_mode(&mut self) -> Transition {
        self.angle_mode = self.angle_mode.toggled();
        tracing::debug!(angle_mode = ?self.angle_mode, "angle mode toggled");
        Transition::ModeChanged {
            angle_mode: self.angle_mode,
        }
    }

    /// Apply a scientific function to the leading number of the buffer.
    ///
    /// Only the numeric prefix is read: on "5+3" the function sees 5 and
    /// the rest of the expression is discarded. Ignored while the buffer is
    /// "0".
    pub fn apply_function(&mut self, func: ScientificFunction) -> Transition {
        let cleared = self.begin_input();
        if self.buffer == DEFAULT_DISPLAY {
            return unchanged_unless(cleared);
        }

        let value = parse_leading_float(&self.buffer);
        if value.is_nan() {
            return self.fail(CalcFailure::Parse(format!(
                "no number at the start of {:?}",
                self.buffer
            )));
        }

        let result = func.apply(value, self.angle_mode);
        if result.is_nan() {
            return self.fail(CalcFailure::Evaluation(format!(
                "{}({}) is not a number",
                func,
                format_number(value)
            )));
        }

        self.last_function = Some(func);
        self.complete(result)
    }

    /// Evaluate the whole buffer as an arithmetic expression.
    pub fn evaluate(&mut self) -> Transition {
        self.begin_input();
        match expr::evaluate_display(&self.buffer) {
            Ok(value) => self.complete(value),
            Err(err) => self.fail(err.into()),
        }
    }

    fn complete(&mut self, value: f64) -> Transition {
        self.buffer = format_number(value);
        tracing::debug!(result = %self.buffer, "computation succeeded");
        let feedback = self
            .particles
            .enabled
            .then(|| ParticleBurst::generate(&mut self.rng, &self.particles));
        Transition::Computed { feedback }
    }

    fn fail(&mut self, failure: CalcFailure) -> Transition {
        tracing::debug!(%failure, buffer = %self.buffer, "computation failed");
        self.buffer = ERROR_DISPLAY.to_string();
        self.pending_reset = Some(self.clock.now() + self.reset_delay);
        Transition::Failed
    }
}

fn unchanged_unless(changed: bool) -> Transition {
    if changed {
        Transition::Edited
    } else {
        Transition::Unchanged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EngineSettings;
    use crate::platform::ManualClock;

    fn calculator() -> (Calculator, Arc<ManualClock>) {
        let settings = EngineSettings {
            rng_seed: Some(3),
            ..Default::default()
        };
        let (ctx, clock) = AppContext::with_manual_clock(settings);
        (Calculator::new(&ctx), clock)
    }

    fn type_keys(calc: &mut Calculator, keys: &str) {
        for ch in keys.chars() {
            let action = Action::from_button(&ch.to_string())
                .unwrap_or_else(|| panic!("no action for {ch:?}"));
            calc.dispatch(action).unwrap();
        }
    }

    fn with_buffer(text: &str) -> (Calculator, Arc<ManualClock>) {
        let (mut calc, clock) = calculator();
        type_keys(&mut calc, text);
        assert_eq!(calc.display(), text);
        (calc, clock)
    }

    #[test]
    fn test_initial_state() {
        let (calc, _) = calculator();
        assert_eq!(calc.display(), "0");
        assert_eq!(calc.phase(), Phase::Default);
        assert_eq!(calc.angle_mode(), AngleMode::Radians);
        assert_eq!(calc.reset_deadline(), None);
    }

    #[test]
    fn test_digit_replaces_initial_zero() {
        let (mut calc, _) = calculator();
        calc.append_digit_or_dot('5').unwrap();
        assert_eq!(calc.display(), "5");
        assert_eq!(calc.phase(), Phase::Editing);
    }

    #[test]
    fn test_dot_keeps_initial_zero() {
        let (mut calc, _) = calculator();
        calc.append_digit_or_dot('.').unwrap();
        assert_eq!(calc.display(), "0.");
    }

    #[test]
    fn test_multiple_dots_are_accepted() {
        let (mut calc, _) = calculator();
        for ch in "1.2.3".chars() {
            calc.append_digit_or_dot(ch).unwrap();
        }
        assert_eq!(calc.display(), "1.2.3");
    }

    #[test]
    fn test_digit_or_dot_rejects_other_chars() {
        let (mut calc, _) = calculator();
        assert_eq!(
            calc.append_digit_or_dot('('),
            Err(InputError::NotDigitOrDot('('))
        );
        assert_eq!(calc.append_literal('x'), Err(InputError::NotAppendable('x')));
        assert_eq!(calc.display(), "0");
    }

    #[test]
    fn test_operator_guard_on_zero() {
        let (mut calc, _) = calculator();
        assert_eq!(calc.append_operator(Operator::Add), Transition::Unchanged);
        assert_eq!(calc.display(), "0");
    }

    #[test]
    fn test_consecutive_operators_accepted() {
        let (mut calc, _) = with_buffer("5");
        calc.append_operator(Operator::Add);
        calc.append_operator(Operator::Subtract);
        assert_eq!(calc.display(), "5+-");
        calc.append_operator(Operator::Power);
        assert_eq!(calc.display(), "5+-**");
    }

    #[test]
    fn test_backspace() {
        let (mut calc, _) = with_buffer("12");
        calc.backspace();
        assert_eq!(calc.display(), "1");
        calc.backspace();
        assert_eq!(calc.display(), "0");
        assert_eq!(calc.backspace(), Transition::Unchanged);
        assert_eq!(calc.display(), "0");
    }

    #[test]
    fn test_backspace_removes_whole_glyph() {
        let (mut calc, _) = with_buffer("5×");
        calc.backspace();
        assert_eq!(calc.display(), "5");
    }

    #[test]
    fn test_clear_from_any_state() {
        let (mut calc, _) = with_buffer("5×3");
        calc.clear();
        assert_eq!(calc.display(), "0");
        assert_eq!(calc.clear(), Transition::Unchanged);
        assert_eq!(calc.display(), "0");

        let (mut calc, _) = with_buffer("5/");
        calc.evaluate();
        assert_eq!(calc.phase(), Phase::Error);
        calc.clear();
        assert_eq!(calc.display(), "0");
        assert_eq!(calc.reset_deadline(), None);
    }

    #[test]
    fn test_evaluate_glyph_rewrites() {
        for (input, expected) in [("5×3", "15"), ("10−4", "6"), ("50%", "0.5")] {
            let (mut calc, _) = calculator();
            calc.buffer = input.to_string();
            assert!(matches!(calc.evaluate(), Transition::Computed { .. }));
            assert_eq!(calc.display(), expected, "evaluating {input}");
        }
    }

    #[test]
    fn test_evaluate_emits_particles() {
        let (mut calc, _) = with_buffer("2+2");
        match calc.evaluate() {
            Transition::Computed {
                feedback: Some(burst),
            } => assert_eq!(burst.particles.len(), 20),
            other => panic!("unexpected transition {other:?}"),
        }
        assert_eq!(calc.display(), "4");
    }

    #[test]
    fn test_particles_can_be_disabled() {
        let mut settings = EngineSettings::default();
        settings.particles.enabled = false;
        let (ctx, _) = AppContext::with_manual_clock(settings);
        let mut calc = Calculator::new(&ctx);
        type_keys(&mut calc, "7");
        assert_eq!(
            calc.apply_function(ScientificFunction::Square),
            Transition::Computed { feedback: None }
        );
        assert_eq!(calc.display(), "49");
    }

    #[test]
    fn test_error_auto_recovery() {
        let (mut calc, clock) = with_buffer("5/");
        assert_eq!(calc.evaluate(), Transition::Failed);
        assert_eq!(calc.display(), "Error");
        assert_eq!(calc.phase(), Phase::Error);

        clock.advance(Duration::from_millis(999));
        assert!(!calc.poll());
        assert_eq!(calc.display(), "Error");

        clock.advance(Duration::from_millis(1));
        assert!(calc.poll());
        assert_eq!(calc.display(), "0");
        assert_eq!(calc.phase(), Phase::Default);
        assert!(!calc.poll());
    }

    #[test]
    fn test_one_to_the_infinity_shows_error() {
        let (mut calc, _) = calculator();
        type_keys(&mut calc, "1^(1/0)");
        assert_eq!(calc.display(), "1**(1/0)");
        assert_eq!(calc.evaluate(), Transition::Failed);
        assert_eq!(calc.display(), "Error");
        assert_eq!(calc.phase(), Phase::Error);
    }

    #[test]
    fn test_input_during_error_cancels_reset() {
        let (mut calc, clock) = with_buffer("5+-");
        calc.evaluate();
        assert_eq!(calc.display(), "Error");

        clock.advance(Duration::from_millis(400));
        calc.append_digit_or_dot('7').unwrap();
        assert_eq!(calc.display(), "7");
        assert_eq!(calc.reset_deadline(), None);

        // The cancelled reset must not wipe the new input later on.
        clock.advance(Duration::from_millis(1000));
        assert!(!calc.poll());
        assert_eq!(calc.display(), "7");
    }

    #[test]
    fn test_toggle_does_not_cancel_error() {
        let (mut calc, clock) = with_buffer("(");
        calc.evaluate();
        calc.toggle_angle_mode();
        assert_eq!(calc.display(), "Error");
        clock.advance(Duration::from_millis(1000));
        assert!(calc.poll());
        assert_eq!(calc.display(), "0");
        assert_eq!(calc.angle_mode(), AngleMode::Degrees);
    }

    #[test]
    fn test_degrees_trig_round_trip() {
        let (mut calc, _) = with_buffer("90");
        calc.toggle_angle_mode();
        calc.apply_function(ScientificFunction::Sin);
        assert_eq!(calc.display(), "1");
        calc.apply_function(ScientificFunction::Asin);
        assert_eq!(calc.display(), "90");
        assert_eq!(calc.last_function(), Some(ScientificFunction::Asin));
    }

    #[test]
    fn test_toggle_does_not_touch_buffer() {
        let (mut calc, _) = with_buffer("90");
        assert_eq!(
            calc.toggle_angle_mode(),
            Transition::ModeChanged {
                angle_mode: AngleMode::Degrees
            }
        );
        assert_eq!(calc.display(), "90");
    }

    #[test]
    fn test_function_uses_leading_number_only() {
        let (mut calc, _) = with_buffer("5+3");
        calc.apply_function(ScientificFunction::Square);
        assert_eq!(calc.display(), "25");
    }

    #[test]
    fn test_function_guard_on_zero() {
        let (mut calc, _) = calculator();
        assert_eq!(
            calc.apply_function(ScientificFunction::Reciprocal),
            Transition::Unchanged
        );
        assert_eq!(calc.display(), "0");
    }

    #[test]
    fn test_reciprocal_of_zero_point() {
        let (mut calc, _) = with_buffer("0.");
        calc.apply_function(ScientificFunction::Reciprocal);
        assert_eq!(calc.display(), "Infinity");
        assert_eq!(calc.phase(), Phase::Editing);
    }

    #[test]
    fn test_function_domain_error() {
        let (mut calc, _) = calculator();
        // A leading "-" cannot be typed onto "0", but results can be negative.
        calc.buffer = "-4".to_string();
        assert_eq!(
            calc.apply_function(ScientificFunction::Sqrt),
            Transition::Failed
        );
        assert_eq!(calc.display(), "Error");
    }

    #[test]
    fn test_function_on_unparseable_buffer() {
        let (mut calc, _) = with_buffer("(5");
        assert_eq!(
            calc.apply_function(ScientificFunction::Abs),
            Transition::Failed
        );
    }

    #[test]
    fn test_factorial_and_chaining_context() {
        let (mut calc, _) = with_buffer("5");
        calc.apply_function(ScientificFunction::Factorial);
        assert_eq!(calc.display(), "120");
        assert_eq!(calc.last_function(), Some(ScientificFunction::Factorial));
        calc.clear();
        assert_eq!(calc.last_function(), None);
    }

    #[test]
    fn test_buffer_never_empty() {
        let (mut calc, clock) = calculator();
        let script = [
            Action::Backspace,
            Action::Append('3'),
            Action::Operator(Operator::Multiply),
            Action::Backspace,
            Action::Backspace,
            Action::Backspace,
            Action::Append('('),
            Action::Evaluate,
            Action::Backspace,
            Action::Append('9'),
            Action::Function(ScientificFunction::Sqrt),
            Action::Clear,
            Action::Backspace,
        ];
        for action in script {
            calc.dispatch(action).unwrap();
            assert!(!calc.display().is_empty(), "after {action:?}");
            clock.advance(Duration::from_millis(300));
            calc.poll();
            assert!(!calc.display().is_empty());
        }
    }

    #[test]
    fn test_snapshot_serialization() {
        let (mut calc, _) = with_buffer("4");
        calc.apply_function(ScientificFunction::Sqrt);
        let json = serde_json::to_value(calc.snapshot()).unwrap();
        assert_eq!(json["display"], "2");
        assert_eq!(json["angle_mode"], "radians");
        assert_eq!(json["phase"], "editing");
        assert_eq!(json["last_function"], "sqrt");
    }
}
