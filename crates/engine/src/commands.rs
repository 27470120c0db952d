//! Command registry and built-in calculator commands.
//!
//! Commands are registered by name, invoked with JSON input against a
//! calculator session, and answer with JSON output.

use crate::calculator::{Calculator, InputError, Transition};
use crate::functions::{ScientificFunction, UnknownFunction};
use crate::input::{Action, Operator, UnknownOperator};
use crate::types::*;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;

/// Signature for all engine commands.
pub type CommandHandler = fn(Value, &mut Calculator) -> Result<Value, CommandError>;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    UnknownFunction(#[from] UnknownFunction),
    #[error(transparent)]
    UnknownOperator(#[from] UnknownOperator),
    #[error("{0}")]
    Other(String),
}

impl CommandError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            CommandError::InvalidInput(_)
            | CommandError::Input(_)
            | CommandError::UnknownFunction(_)
            | CommandError::UnknownOperator(_) => ErrorCode::InvalidInput,
            CommandError::Other(_) => ErrorCode::InternalError,
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub struct CommandRegistry {
    handlers: HashMap<String, CommandHandler>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        let mut reg = Self {
            handlers: HashMap::new(),
        };
        // Register built-in commands
        reg.register("press", cmd_press);
        reg.register("button", cmd_button);
        reg.register("append", cmd_append);
        reg.register("operator", cmd_operator);
        reg.register("function", cmd_function);
        reg.register("evaluate", cmd_evaluate);
        reg.register("backspace", cmd_backspace);
        reg.register("clear", cmd_clear);
        reg.register("toggle_angle_mode", cmd_toggle_angle_mode);
        reg.register("state", cmd_state);
        reg.register("functions", cmd_functions);
        reg
    }

    pub fn register(&mut self, name: &str, handler: CommandHandler) {
        self.handlers.insert(name.to_string(), handler);
    }

    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }

    /// Execute a command by name and return a full CommandResult.
    pub fn execute(&self, name: &str, args: Value, calc: &mut Calculator) -> CommandResult {
        let run_id = new_run_id();
        let start = Instant::now();

        let handler = match self.handlers.get(name) {
            Some(h) => h,
            None => {
                return result_err(
                    "call",
                    name,
                    &run_id,
                    start.elapsed().as_millis() as u64,
                    ErrorCode::InvalidInput,
                    format!("unknown command: {}", name),
                );
            }
        };

        // A reset that came due since the last command lands first.
        calc.poll();

        match handler(args, calc) {
            Ok(data) => {
                let mut r = result_ok("call", name, &run_id, start.elapsed().as_millis() as u64);
                r.data = Some(data);
                r
            }
            Err(e) => {
                tracing::debug!(command = name, error = %e, "command rejected");
                result_err(
                    "call",
                    name,
                    &run_id,
                    start.elapsed().as_millis() as u64,
                    e.error_code(),
                    e.to_string(),
                )
            }
        }
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Built-in commands
// ===========================================================================

fn str_arg<'a>(args: &'a Value, field: &str) -> Result<&'a str, CommandError> {
    args.get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| CommandError::InvalidInput(format!("missing '{}' string field", field)))
}

/// Payload shared by every state-changing command.
fn transition_payload(transition: &Transition, calc: &Calculator) -> Result<Value, CommandError> {
    let transition =
        serde_json::to_value(transition).map_err(|e| CommandError::Other(e.to_string()))?;
    let state =
        serde_json::to_value(calc.snapshot()).map_err(|e| CommandError::Other(e.to_string()))?;
    Ok(serde_json::json!({ "transition": transition, "state": state }))
}

fn dispatch(action: Action, calc: &mut Calculator) -> Result<Value, CommandError> {
    let transition = calc.dispatch(action)?;
    transition_payload(&transition, calc)
}

/// `press` – a keyboard key. Unmapped keys are ignored, as a keyboard
/// handler would.
///
/// Args: `{ "key": "Enter" }`
fn cmd_press(args: Value, calc: &mut Calculator) -> Result<Value, CommandError> {
    let key = str_arg(&args, "key")?;
    match Action::from_key(key) {
        Some(action) => dispatch(action, calc),
        None => {
            let mut payload = transition_payload(&Transition::Unchanged, calc)?;
            payload["ignored"] = Value::Bool(true);
            Ok(payload)
        }
    }
}

/// `button` – an on-screen control, by label.
///
/// Args: `{ "name": "sin" }`
fn cmd_button(args: Value, calc: &mut Calculator) -> Result<Value, CommandError> {
    let name = str_arg(&args, "name")?;
    let action = Action::from_button(name)
        .ok_or_else(|| CommandError::InvalidInput(format!("unknown button: {}", name)))?;
    dispatch(action, calc)
}

/// `append` – literal characters, each typed in order.
///
/// Args: `{ "token": "12.5" }`
fn cmd_append(args: Value, calc: &mut Calculator) -> Result<Value, CommandError> {
    let token = str_arg(&args, "token")?;
    if token.is_empty() {
        return Err(CommandError::InvalidInput("'token' must not be empty".into()));
    }
    let mut transition = Transition::Unchanged;
    for ch in token.chars() {
        transition = calc.append_literal(ch)?;
    }
    transition_payload(&transition, calc)
}

/// `operator` – args: `{ "op": "×" }` (also `*`, `^`, `**`, `−`).
fn cmd_operator(args: Value, calc: &mut Calculator) -> Result<Value, CommandError> {
    let op: Operator = str_arg(&args, "op")?.parse()?;
    dispatch(Action::Operator(op), calc)
}

/// `function` – args: `{ "name": "sqrt" }`
fn cmd_function(args: Value, calc: &mut Calculator) -> Result<Value, CommandError> {
    let func: ScientificFunction = str_arg(&args, "name")?.parse()?;
    dispatch(Action::Function(func), calc)
}

fn cmd_evaluate(_args: Value, calc: &mut Calculator) -> Result<Value, CommandError> {
    dispatch(Action::Evaluate, calc)
}

fn cmd_backspace(_args: Value, calc: &mut Calculator) -> Result<Value, CommandError> {
    dispatch(Action::Backspace, calc)
}

fn cmd_clear(_args: Value, calc: &mut Calculator) -> Result<Value, CommandError> {
    dispatch(Action::Clear, calc)
}

fn cmd_toggle_angle_mode(_args: Value, calc: &mut Calculator) -> Result<Value, CommandError> {
    dispatch(Action::ToggleAngleMode, calc)
}

/// `state` – current snapshot, no mutation.
fn cmd_state(_args: Value, calc: &mut Calculator) -> Result<Value, CommandError> {
    serde_json::to_value(calc.snapshot()).map_err(|e| CommandError::Other(e.to_string()))
}

/// `functions` – the function table, in display order.
fn cmd_functions(_args: Value, _calc: &mut Calculator) -> Result<Value, CommandError> {
    let names: Vec<&str> = ScientificFunction::ALL.iter().map(|f| f.name()).collect();
    Ok(serde_json::json!({ "functions": names }))
}

// ===========================================================================
// Tests
// ===========================================================================
