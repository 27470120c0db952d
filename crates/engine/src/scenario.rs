//! Scenario runner – execute scripted calculator sessions from YAML files.
//!
//! Each scenario runs against a fresh [`Calculator`] on a manual clock, so
//! `wait_ms` steps move time deterministically.

use crate::calculator::Calculator;
use crate::commands::CommandRegistry;
use crate::context::{AppContext, EngineSettings};
use crate::types::*;
use std::time::{Duration, Instant};

/// Load a scenario from a YAML string.
pub fn load_scenario(yaml: &str) -> Result<Scenario, String> {
    serde_yaml::from_str(yaml).map_err(|e| format!("failed to parse scenario YAML: {}", e))
}

/// Execute a scenario and return the overall result.
///
/// `settings` is used unless the scenario carries its own.
pub fn run_scenario(
    scenario: &Scenario,
    settings: &EngineSettings,
    registry: &CommandRegistry,
) -> ScenarioResult {
    let settings = scenario.settings.clone().unwrap_or_else(|| settings.clone());
    let (ctx, clock) = AppContext::with_manual_clock(settings);
    let mut calc = Calculator::new(&ctx);

    let mut step_results = Vec::new();
    let mut overall = Status::Pass;

    for (i, step) in scenario.steps.iter().enumerate() {
        let result = match step {
            ScenarioStep::Call {
                call,
                args,
                expect_status,
            } => {
                let r = registry.execute(call, args.clone(), &mut calc);
                let actual_status = r.status.as_str();
                if actual_status != expect_status.as_str() {
                    tracing::warn!(
                        step = i,
                        expected = %expect_status,
                        actual = %actual_status,
                        "scenario step status mismatch"
                    );
                    overall = Status::Fail;
                }
                r
            }
            ScenarioStep::Press { press } => {
                run_inputs(registry, &mut calc, "press", "key", press, &mut overall)
            }
            ScenarioStep::Button { button } => {
                run_inputs(registry, &mut calc, "button", "name", button, &mut overall)
            }
            ScenarioStep::Wait { wait_ms } => {
                let start = Instant::now();
                clock.advance(Duration::from_millis(*wait_ms));
                let fired = calc.poll();
                let mut r = result_ok(
                    "wait",
                    &format!("{}ms", wait_ms),
                    &new_run_id(),
                    start.elapsed().as_millis() as u64,
                );
                r.data = Some(serde_json::json!({
                    "reset_fired": fired,
                    "state": calc.snapshot(),
                }));
                r
            }
            ScenarioStep::Expect { expect } => {
                let r = check_expectation(expect, &calc);
                if r.status != Status::Pass {
                    tracing::warn!(step = i, "scenario expectation failed");
                    overall = Status::Fail;
                }
                r
            }
        };
        step_results.push(result);
    }

    ScenarioResult {
        name: scenario.name.clone(),
        overall_status: overall,
        step_results,
    }
}

/// Run one registry command per key/button name; the step result is the
/// last command's result, or the first one that did not pass.
fn run_inputs(
    registry: &CommandRegistry,
    calc: &mut Calculator,
    command: &str,
    field: &str,
    keys: &Keys,
    overall: &mut Status,
) -> CommandResult {
    let mut last = None;
    for name in keys.names() {
        let mut args = serde_json::Map::new();
        args.insert(field.to_string(), serde_json::Value::String(name.to_string()));
        let r = registry.execute(command, serde_json::Value::Object(args), calc);
        if r.status != Status::Pass {
            *overall = Status::Fail;
            return r;
        }
        last = Some(r);
    }
    last.unwrap_or_else(|| result_ok(command, "<none>", &new_run_id(), 0))
}

fn check_expectation(expect: &Expectation, calc: &Calculator) -> CommandResult {
    let run_id = new_run_id();
    let snapshot = calc.snapshot();
    let mut mismatches = Vec::new();

    if let Some(display) = &expect.display {
        if *display != snapshot.display {
            mismatches.push(format!(
                "display: expected {:?}, got {:?}",
                display, snapshot.display
            ));
        }
    }
    if let Some(mode) = expect.angle_mode {
        if mode != snapshot.angle_mode {
            mismatches.push(format!(
                "angle_mode: expected {:?}, got {:?}",
                mode, snapshot.angle_mode
            ));
        }
    }
    if let Some(phase) = expect.phase {
        if phase != snapshot.phase {
            mismatches.push(format!(
                "phase: expected {:?}, got {:?}",
                phase, snapshot.phase
            ));
        }
    }

    let mut r = if mismatches.is_empty() {
        result_ok("expect", &snapshot.display, &run_id, 0)
    } else {
        let mut r = result_fail(
            "expect",
            &snapshot.display,
            &run_id,
            0,
            ErrorCode::ExpectationFailed,
            mismatches.join("; "),
        );
        if let Some(err) = r.error.as_mut() {
            err.details = serde_json::json!({ "mismatches": mismatches });
        }
        r
    };
    r.data = serde_json::to_value(&snapshot).ok();
    r
}
