//! `calcctl` – command-line front-end for the scientific calculator engine.
//!
//! Drives the same session logic a keypad UI would: one-shot evaluation,
//! key sequences, raw registry commands, scripted scenarios and an
//! interactive prompt.

mod config;
mod logging;
mod repl;

use anyhow::Context;
use clap::{Parser, Subcommand};
use engine::types::*;
use engine::{Action, AppContext, Calculator, CommandRegistry, CommandResult, ScientificFunction};
use std::path::PathBuf;

// ===========================================================================
// CLI definition
// ===========================================================================

#[derive(Parser)]
#[command(name = "calcctl", version, about = "Scientific calculator engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Type an expression on the keypad and press `=`.
    Eval {
        /// Expression, e.g. "2^10" or "50%". Spaces are ignored.
        expression: String,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Press a sequence of keys or buttons and report the final state.
    Keys {
        /// Key or button names (e.g. 9 0 DEG sin).
        #[arg(required = true)]
        keys: Vec<String>,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Invoke an engine command by name with JSON args.
    Call {
        /// Command name (e.g. "function", "operator", "state").
        cmd: String,
        /// JSON args to pass to the command.
        #[arg(long, default_value = "{}")]
        args: String,
        /// Literal input typed before the command runs.
        #[arg(long)]
        input: Option<String>,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the scientific functions.
    Functions {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run a scripted scenario from a YAML file.
    RunScenario {
        /// Path to the scenario YAML file.
        file: PathBuf,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Interactive session on stdin.
    Repl,
}

// ===========================================================================
// Main
// ===========================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::get_config().context("failed to load configuration")?;
    logging::init_logging(&config.logging);
    tracing::debug!(dev_env = %config.dev_env, "configuration loaded");

    let cli = Cli::parse();
    let ctx = AppContext::default_platform(config.engine.clone());
    let registry = CommandRegistry::new();

    match cli.command {
        Commands::Eval { expression, json } => cmd_eval(&expression, json, &ctx, &registry),
        Commands::Keys { keys, json } => cmd_keys(&keys, json, &ctx, &registry),
        Commands::Call {
            cmd,
            args,
            input,
            json,
        } => cmd_call(&cmd, &args, input.as_deref(), json, &ctx, &registry),
        Commands::Functions { json } => cmd_functions(json),
        Commands::RunScenario { file, json } => {
            cmd_run_scenario(&file, json, &config.engine, &registry)
        }
        Commands::Repl => repl::run_repl(Calculator::new(&ctx)).await?,
    }
    Ok(())
}

// ===========================================================================
// Subcommand implementations
// ===========================================================================

fn cmd_eval(expression: &str, json: bool, ctx: &AppContext, registry: &CommandRegistry) {
    output_result(&run_eval(expression, ctx, registry), json);
}

/// Type `expression` into a fresh session and press `=`. An expression the
/// calculator rejects comes back as a failed check, not a command error.
fn run_eval(expression: &str, ctx: &AppContext, registry: &CommandRegistry) -> CommandResult {
    let mut calc = Calculator::new(ctx);

    for ch in expression.chars().filter(|c| !c.is_whitespace()) {
        let key = ch.to_string();
        let (command, field) = if Action::from_key(&key).is_some() {
            ("press", "key")
        } else {
            ("button", "name")
        };
        let r = registry.execute(command, single_arg(field, &key), &mut calc);
        if r.status != Status::Pass {
            return retarget(r, "eval", expression);
        }
    }

    let r = retarget(
        registry.execute("evaluate", serde_json::json!({}), &mut calc),
        "eval",
        expression,
    );
    let failed = r
        .data
        .as_ref()
        .map(|d| d["transition"]["kind"] == "failed")
        .unwrap_or(false);
    if !failed {
        return r;
    }

    let mut f = result_fail(
        "eval",
        expression,
        &r.run_id,
        r.timing_ms.total,
        ErrorCode::EvaluationFailed,
        format!("cannot evaluate {:?}", expression),
    );
    f.data = r.data;
    f
}

fn cmd_keys(keys: &[String], json: bool, ctx: &AppContext, registry: &CommandRegistry) {
    let mut calc = Calculator::new(ctx);
    let mut last = None;

    for key in keys {
        // Keyboard names first so "Enter" and "Escape" behave as keys.
        let (command, field) = if Action::from_key(key).is_some() {
            ("press", "key")
        } else {
            ("button", "name")
        };
        let r = registry.execute(command, single_arg(field, key), &mut calc);
        if r.status != Status::Pass {
            output_result(&r, json);
            return;
        }
        last = Some(r);
    }

    if let Some(r) = last {
        output_result(&retarget(r, "keys", &keys.join(" ")), json);
    }
}

fn cmd_call(
    cmd: &str,
    args_str: &str,
    input: Option<&str>,
    json: bool,
    ctx: &AppContext,
    registry: &CommandRegistry,
) {
    let args: serde_json::Value = match serde_json::from_str(args_str) {
        Ok(v) => v,
        Err(e) => {
            let r = result_err(
                "call",
                cmd,
                &new_run_id(),
                0,
                ErrorCode::InvalidInput,
                format!("invalid JSON args: {}", e),
            );
            output_result(&r, json);
            return;
        }
    };

    let mut calc = Calculator::new(ctx);
    if let Some(input) = input {
        let r = registry.execute("append", serde_json::json!({ "token": input }), &mut calc);
        if r.status != Status::Pass {
            output_result(&r, json);
            return;
        }
    }

    let result = registry.execute(cmd, args, &mut calc);
    output_result(&result, json);
}

fn cmd_functions(json: bool) {
    if json {
        let names: Vec<&str> = ScientificFunction::ALL.iter().map(|f| f.name()).collect();
        println!("{}", serde_json::json!({ "functions": names }));
    } else {
        for f in ScientificFunction::ALL {
            let kind = if f.is_inverse_trig() {
                "inverse trig"
            } else if f.is_trig() {
                "trig"
            } else {
                ""
            };
            println!("{:<8} {}", f.name(), kind);
        }
    }
}

fn cmd_run_scenario(
    file: &PathBuf,
    json: bool,
    settings: &engine::EngineSettings,
    registry: &CommandRegistry,
) {
    let yaml = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            let r = result_err(
                "run-scenario",
                &file.display().to_string(),
                &new_run_id(),
                0,
                ErrorCode::IoError,
                format!("cannot read scenario file: {}", e),
            );
            output_result(&r, json);
            return;
        }
    };

    let scenario = match engine::scenario::load_scenario(&yaml) {
        Ok(s) => s,
        Err(e) => {
            let r = result_err(
                "run-scenario",
                &file.display().to_string(),
                &new_run_id(),
                0,
                ErrorCode::InvalidInput,
                e,
            );
            output_result(&r, json);
            return;
        }
    };

    let scenario_result = engine::scenario::run_scenario(&scenario, settings, registry);

    if json {
        let j = serde_json::to_string_pretty(&scenario_result).unwrap_or_default();
        println!("{}", j);
    } else {
        println!(
            "Scenario: {}",
            scenario_result.name.as_deref().unwrap_or("<unnamed>")
        );
        println!("Overall: {:?}", scenario_result.overall_status);
        for (i, sr) in scenario_result.step_results.iter().enumerate() {
            println!(
                "  Step {}: {} {} -> {:?}",
                i, sr.command, sr.target, sr.status
            );
            if let Some(ref err) = sr.error {
                println!("    {} – {}", err.code, err.message);
            }
        }
    }

    if let Some(code) = exit_code(scenario_result.overall_status) {
        std::process::exit(code);
    }
}

// ===========================================================================
// Output helpers
// ===========================================================================

fn single_arg(field: &str, value: &str) -> serde_json::Value {
    let mut args = serde_json::Map::new();
    args.insert(field.to_string(), serde_json::Value::String(value.to_string()));
    serde_json::Value::Object(args)
}

fn retarget(mut r: CommandResult, command: &str, target: &str) -> CommandResult {
    r.command = command.to_string();
    r.target = target.to_string();
    r
}

fn output_result(result: &CommandResult, json: bool) {
    if json {
        let j = serde_json::to_string_pretty(result).unwrap_or_default();
        println!("{}", j);
    } else {
        print_human(result);
    }

    if let Some(code) = exit_code(result.status) {
        std::process::exit(code);
    }
}

/// Non-zero process exit code for a failed check (1) or an error (2).
fn exit_code(status: Status) -> Option<i32> {
    match status {
        Status::Pass => None,
        Status::Fail => Some(1),
        Status::Error => Some(2),
    }
}

fn print_human(r: &CommandResult) {
    let status_icon = match r.status {
        Status::Pass => "PASS",
        Status::Fail => "FAIL",
        Status::Error => "ERROR",
    };

    // The display line is what a user looks for first.
    let state = r.data.as_ref().map(|d| d.get("state").unwrap_or(d));
    if let Some(display) = state.and_then(|s| s.get("display")).and_then(|v| v.as_str()) {
        let mode = state
            .and_then(|s| s.get("angle_mode"))
            .and_then(|v| v.as_str())
            .unwrap_or("radians");
        let label = if mode == "degrees" { "DEG" } else { "RAD" };
        println!("[{}] {}", label, display);
    }

    println!("[{}] {} {}", status_icon, r.command, r.target);
    println!("  run_id: {}", r.run_id);
    println!("  timing: {}ms", r.timing_ms.total);

    if let Some(ref err) = r.error {
        println!("  error:  {} – {}", err.code, err.message);
    }

    match r.data.as_ref().and_then(|d| d.get("transition")) {
        Some(transition) => {
            if let Some(kind) = transition.get("kind").and_then(|v| v.as_str()) {
                println!("  transition: {}", kind);
            }
        }
        None => {
            if let Some(ref data) = r.data {
                if let Ok(s) = serde_json::to_string_pretty(data) {
                    for line in s.lines() {
                        println!("  {}", line);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::EngineSettings;

    fn eval(expression: &str) -> CommandResult {
        let (ctx, _clock) = AppContext::with_manual_clock(EngineSettings::default());
        run_eval(expression, &ctx, &CommandRegistry::new())
    }

    #[test]
    fn test_eval_success() {
        let r = eval("2^10");
        assert_eq!(r.status, Status::Pass);
        assert_eq!(r.command, "eval");
        assert_eq!(r.target, "2^10");
        assert_eq!(r.data.unwrap()["state"]["display"], "1024");
        assert_eq!(exit_code(r.status), None);
    }

    #[test]
    fn test_eval_failure_is_a_failed_check() {
        let r = eval("5/");
        assert_eq!(r.status, Status::Fail);
        assert_eq!(r.error.as_ref().unwrap().code, ErrorCode::EvaluationFailed);
        assert_eq!(r.data.unwrap()["state"]["display"], "Error");
        assert_eq!(exit_code(r.status), Some(1));
    }

    #[test]
    fn test_eval_nan_power_fails() {
        let r = eval("1^(1/0)");
        assert_eq!(r.status, Status::Fail);
        assert_eq!(r.error.unwrap().code, ErrorCode::EvaluationFailed);
    }

    #[test]
    fn test_eval_unknown_input_is_an_error() {
        let r = eval("5a");
        assert_eq!(r.status, Status::Error);
        assert_eq!(r.error.unwrap().code, ErrorCode::InvalidInput);
        assert_eq!(r.target, "5a");
        assert_eq!(exit_code(Status::Error), Some(2));
    }
}
