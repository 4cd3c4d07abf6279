//! CLI command implementations.

pub mod bind;
pub mod discover;
pub mod resolve;

use chrono::NaiveDateTime;
use satscene::ReaderBinding;

const TIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y%m%d%H%M%S"];

/// Parse a command-line timestamp.
pub fn parse_time(value: &str) -> Result<NaiveDateTime, String> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| {
            format!(
                "invalid time '{}', expected e.g. 2015-03-11T11:25:11",
                value
            )
        })
}

/// Print a binding and its files.
pub fn print_binding(binding: &ReaderBinding) {
    println!("{} ({})", binding.format(), binding.config_path().display());
    for file in binding.filenames() {
        println!("  {}", file.display());
    }
}
