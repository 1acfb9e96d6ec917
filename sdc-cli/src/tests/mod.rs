//! Shared test harness modules for the CLI.

use super::*;

mod helpers;
mod write_steps;
