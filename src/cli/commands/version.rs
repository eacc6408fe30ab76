//! Version command implementation.

use serde::Serialize;

use super::BIN;
use crate::error::Result;

/// Memos REST API generation the client speaks.
const MEMOS_API: &str = "v1";

#[derive(Serialize)]
struct VersionOutput {
    name: &'static str,
    version: &'static str,
    build: &'static str,
    memos_api: &'static str,
}

impl VersionOutput {
    fn current() -> Self {
        Self {
            name: BIN,
            version: env!("CARGO_PKG_VERSION"),
            build: if cfg!(debug_assertions) { "dev" } else { "release" },
            memos_api: MEMOS_API,
        }
    }
}

/// Print the binary version and the Memos API it targets.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(json: bool) -> Result<()> {
    let output = VersionOutput::current();

    if json {
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!(
            "{} {} ({}, Memos API {})",
            output.name, output.version, output.build, output.memos_api
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_output_names_binary_and_api() {
        let value = serde_json::to_value(VersionOutput::current()).unwrap();
        assert_eq!(value["name"], "memos-sync");
        assert_eq!(value["memos_api"], "v1");
        assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
    }
}
