//! Application-level orchestration.
//!
//! This module owns the run/status lifecycle (health polling, analysis runs) and
//! post-run processing such as exports. UI/CLI layers call into this module to
//! keep responsibilities separated.

mod controller;
mod post_process;

pub(crate) use controller::{run_controller, DashboardController, UiCommand};
pub(crate) use post_process::process_run_completion;
