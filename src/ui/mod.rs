//! User interface module.
//!
//! Releases run unattended, so there are no prompts; everything here prints.
//! `formatter` holds the formatting functions and this module re-exports
//! them for convenience.

pub mod formatter;

pub use formatter::{
    display_boundary_warning, display_error, display_failure, display_manual_push_instruction,
    display_plan, display_report, display_stage, display_status, display_success, plan_lines,
    report_lines,
};
