//! Interactive mode – one line of keys/buttons per prompt, with the error
//! display expiring on its own while the prompt waits.

use engine::{Action, Calculator, Snapshot, Transition};
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// What a single input line asks for.
#[derive(Debug, PartialEq)]
pub enum LineCommand {
    Actions(Vec<Action>),
    State,
    Quit,
}

/// Split a line into actions. Whole tokens are tried as button labels
/// first (`sin`, `AC`, `x²`), otherwise each character is read as a key.
pub fn parse_line(line: &str) -> Result<LineCommand, String> {
    match line.trim() {
        "quit" | "exit" | ":q" => return Ok(LineCommand::Quit),
        ":state" => return Ok(LineCommand::State),
        _ => {}
    }

    let mut actions = Vec::new();
    for token in line.split_whitespace() {
        if let Some(action) = Action::from_button(token) {
            actions.push(action);
            continue;
        }
        for ch in token.chars() {
            let key = ch.to_string();
            let action = Action::from_key(&key)
                .or_else(|| Action::from_button(&key))
                .ok_or_else(|| format!("unrecognised input: {}", token))?;
            actions.push(action);
        }
    }
    Ok(LineCommand::Actions(actions))
}

/// Resolves at `deadline`, or never when no reset is pending.
async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending::<()>().await,
    }
}

fn render(snapshot: &Snapshot) -> String {
    format!("[{}] {}", snapshot.angle_mode.label(), snapshot.display)
}

pub async fn run_repl(mut calc: Calculator) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    stdout
        .write_all(format!("{}\n", render(&calc.snapshot())).as_bytes())
        .await?;

    loop {
        let expiry = expire(calc.reset_deadline());

        let out = tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_line(&line) {
                    Ok(LineCommand::Quit) => break,
                    Ok(LineCommand::State) => {
                        calc.poll();
                        serde_json::to_string_pretty(&calc.snapshot())?
                    }
                    Ok(LineCommand::Actions(actions)) => apply_line(&mut calc, actions),
                    Err(message) => message,
                }
            }
            _ = expiry => {
                if !calc.poll() {
                    continue;
                }
                render(&calc.snapshot())
            }
        };

        stdout.write_all(out.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    tracing::debug!("repl closed");
    Ok(())
}

fn apply_line(calc: &mut Calculator, actions: Vec<Action>) -> String {
    calc.poll();
    let mut burst = false;
    for action in actions {
        match calc.dispatch(action) {
            Ok(Transition::Computed { feedback }) => burst |= feedback.is_some(),
            Ok(_) => {}
            Err(e) => return format!("{}\n{}", e, render(&calc.snapshot())),
        }
    }
    let mut out = render(&calc.snapshot());
    // particle burst
    if burst {
        out.push_str(" *");
    }
    out
}
