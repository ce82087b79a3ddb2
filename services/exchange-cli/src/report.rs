//! Command output on stdout.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;

use crate::OutputFormat;

/// JSON envelope around a command result.
#[derive(Debug, Serialize)]
struct Report<'a, T: Serialize> {
    command: &'a str,
    generated_at: String,
    result: &'a T,
}

/// Print `result` as JSON, or the text rendering produced by `text`.
pub fn emit<T, F>(command: &str, result: &T, format: OutputFormat, text: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Json => {
            let report = Report {
                command,
                generated_at: Utc::now().to_rfc3339(),
                result,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => println!("{}", text(result)),
    }
    Ok(())
}

/// Fixed-width rendering of a statistic that may be `NaN`.
pub fn stat(v: f64) -> String {
    if v.is_nan() {
        "n/a".to_string()
    } else {
        format!("{:.6}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_envelope() {
        let report = Report {
            command: "verify",
            generated_at: "2024-01-01T00:00:00+00:00".to_string(),
            result: &serde_json::json!({ "count_match": true }),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["command"], "verify");
        assert_eq!(value["result"]["count_match"], true);
    }

    #[test]
    fn test_stat() {
        assert_eq!(stat(f64::NAN), "n/a");
        assert_eq!(stat(0.5), "0.500000");
    }
}
