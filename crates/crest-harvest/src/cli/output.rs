//! Output mode flags shared by every command.
//!
//! The binary records `--json` and `--quiet` in environment variables so any
//! module can check them without threading flags through.

use serde::Serialize;

pub const JSON_ENV: &str = "CREST_HARVEST_JSON";
pub const QUIET_ENV: &str = "CREST_HARVEST_QUIET";

pub fn is_json() -> bool {
    std::env::var_os(JSON_ENV).is_some()
}

pub fn is_quiet() -> bool {
    std::env::var_os(QUIET_ENV).is_some()
}

/// Whether human-readable output should be printed.
pub fn is_human() -> bool {
    !is_quiet() && !is_json()
}

pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("  Error: failed to encode JSON output: {e}"),
    }
}
