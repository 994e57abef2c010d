pub mod doctor;
pub mod migrate;
pub mod seed;

use serde::Serialize;
use serde_json::Value;

/// Outcome of one operator command: the process exit code plus a single
/// JSON line for scripts to consume.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct OutcomeLine<'a> {
    command: &'a str,
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_class: Option<&'a str>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::emit(command, "ok", None, message.into(), None, 0)
    }

    /// Success whose output also carries structured data (seeded ids, a
    /// report behind the summary line) for callers that parse it.
    pub fn success_with_detail(
        command: &str,
        message: impl Into<String>,
        detail: Value,
    ) -> Self {
        Self::emit(command, "ok", None, message.into(), Some(detail), 0)
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::emit(command, "error", Some(error_class), message.into(), None, exit_code)
    }

    fn emit(
        command: &str,
        status: &str,
        error_class: Option<&str>,
        message: String,
        detail: Option<Value>,
        exit_code: u8,
    ) -> Self {
        let line = OutcomeLine { command, status, error_class, message, detail };
        let output = serde_json::to_string(&line).unwrap_or_else(|error| {
            format!(
                "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
                error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
            )
        });
        Self { exit_code, output }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::CommandResult;

    #[test]
    fn success_line_is_parseable_json() {
        let result = CommandResult::success("migrate", "applied pending migrations");
        let line: Value = serde_json::from_str(&result.output).expect("json line");
        assert_eq!(line["command"], "migrate");
        assert_eq!(line["status"], "ok");
        assert!(line.get("error_class").is_none());
        assert!(line.get("detail").is_none());
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn detail_rides_along_for_scripted_callers() {
        let result = CommandResult::success_with_detail(
            "seed",
            "loaded 2 demo requests",
            json!({ "inserted": ["REQ-demo-leave", "REQ-demo-equipment"] }),
        );
        let line: Value = serde_json::from_str(&result.output).expect("json line");
        assert_eq!(line["detail"]["inserted"][0], "REQ-demo-leave");
    }

    #[test]
    fn failure_carries_class_and_exit_code() {
        let result =
            CommandResult::failure("migrate", "db_connectivity", "unable to open database", 4);
        let line: Value = serde_json::from_str(&result.output).expect("json line");
        assert_eq!(line["status"], "error");
        assert_eq!(line["error_class"], "db_connectivity");
        assert_eq!(result.exit_code, 4);
    }
}
