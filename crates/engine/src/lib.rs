//! Engine crate – headless scientific calculator.
//!
//! This crate holds the expression buffer state machine, the function
//! table and the arithmetic evaluator. It does NOT depend on any UI or
//! async runtime, so the same session logic backs every front-end and the
//! CLI harness.

pub mod calculator;
pub mod commands;
pub mod context;
pub mod expr;
pub mod functions;
pub mod input;
pub mod number;
pub mod particles;
pub mod platform;
pub mod scenario;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use calculator::{Calculator, Phase, Snapshot, Transition};
pub use commands::CommandRegistry;
pub use context::{AppContext, EngineSettings};
pub use functions::{AngleMode, ScientificFunction};
pub use input::{Action, Operator};
pub use types::{CommandResult, ErrorCode, ErrorInfo, Status};
