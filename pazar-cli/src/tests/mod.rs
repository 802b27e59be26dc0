//! Shared test harness modules for the Pazar CLI.

use super::*;

mod helpers;
