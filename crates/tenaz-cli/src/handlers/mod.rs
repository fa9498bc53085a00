//! Command handlers, kept out of main.rs for testability

pub mod check;
pub mod plan;

pub use check::{execute_check, load_config};
pub use plan::{build_action, build_report, execute_plan};
