//! Transport module
//!
//! Serves decisions to an embedding process and keeps policy current while
//! doing so.

pub mod reload;
pub mod stdio;

pub use reload::{reload_policy, spawn_policy_reloader};
pub use stdio::{
    EvaluationInput, EvaluationOutput, MAX_LINE_BYTES, handle_line, run_stdio, serve,
    serve_with_limit,
};
