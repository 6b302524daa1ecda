//! Command results.
//!
//! A [`CommandResult`] is the reply body a caller sees plus the typed failure
//! class when the core itself produced the failure. When the script's stdout
//! parses, the reply text *is* that JSON document, byte for byte; the parsed
//! [`Value`] is only used for inspection.

use serde::{Serialize, Serializer};
use serde_json::value::RawValue;
use serde_json::{Value, json};

use crate::error::{BridgeError, ErrorKind};

pub const PARSE_ERROR_MESSAGE: &str = "Failed to parse JSON output";

#[derive(Clone, Debug)]
pub struct CommandResult {
    body: Value,
    /// Script stdout exactly as emitted, without surrounding whitespace.
    raw: Option<Box<RawValue>>,
    kind: Option<ErrorKind>,
}

impl CommandResult {
    /// Wrap an already built reply body. Expected shape: `{ success, ... }`.
    pub fn from_output(body: Value) -> Self {
        Self {
            body,
            raw: None,
            kind: None,
        }
    }

    /// Wrap a script's stdout document, keeping its original text for the reply.
    pub fn from_raw(raw: Box<RawValue>) -> serde_json::Result<Self> {
        let body = serde_json::from_str(raw.get())?;
        Ok(Self {
            body,
            raw: Some(raw),
            kind: None,
        })
    }

    /// A failure produced by the core: `{ "success": false, "error": message }`.
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            body: json!({ "success": false, "error": message.into() }),
            raw: None,
            kind: Some(kind),
        }
    }

    /// Stdout did not decode as JSON; both raw streams are kept for diagnosis.
    pub fn parse_failure(stdout: &str, stderr: &str) -> Self {
        Self {
            body: json!({
                "success": false,
                "error": PARSE_ERROR_MESSAGE,
                "stdout": stdout,
                "stderr": stderr,
            }),
            raw: None,
            kind: Some(ErrorKind::OutputParseError),
        }
    }

    pub fn success(&self) -> bool {
        self.body
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Failure class when the core produced the failure. A script that reports
    /// `success: false` on its own has no kind.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.kind
    }

    pub fn error_message(&self) -> Option<&str> {
        self.body.get("error").and_then(|err| {
            err.as_str()
                .or_else(|| err.get("message").and_then(Value::as_str))
        })
    }

    pub fn raw_stdout(&self) -> Option<&str> {
        self.raw_stream("stdout")
    }

    pub fn raw_stderr(&self) -> Option<&str> {
        self.raw_stream("stderr")
    }

    fn raw_stream(&self, field: &str) -> Option<&str> {
        if self.kind != Some(ErrorKind::OutputParseError) {
            return None;
        }
        self.body.get(field).and_then(Value::as_str)
    }

    /// Parsed view of the reply. Integers wider than 64 bits are approximated
    /// here; [`CommandResult::to_json`] keeps them exact.
    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn into_body(self) -> Value {
        self.body
    }

    /// JSON text sent back to an inbound caller.
    pub fn to_json(&self) -> String {
        match &self.raw {
            Some(raw) => raw.get().to_string(),
            None => self.body.to_string(),
        }
    }
}

impl PartialEq for CommandResult {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.to_json() == other.to_json()
    }
}

impl From<BridgeError> for CommandResult {
    fn from(err: BridgeError) -> Self {
        CommandResult::failure(err.kind(), err.message())
    }
}

impl Serialize for CommandResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.raw {
            Some(raw) => raw.serialize(serializer),
            None => self.body.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_body_is_kept_verbatim() {
        let body = json!({"success": true, "tokenId": 7});
        let result = CommandResult::from_output(body.clone());
        assert!(result.success());
        assert_eq!(result.error_kind(), None);
        assert_eq!(result.body(), &body);
    }

    #[test]
    fn script_reported_failure_has_no_kind() {
        let result = CommandResult::from_output(json!({"success": false, "error": "reverted"}));
        assert!(!result.success());
        assert_eq!(result.error_kind(), None);
        assert_eq!(result.error_message(), Some("reverted"));
    }

    #[test]
    fn non_object_output_is_not_success() {
        let result = CommandResult::from_output(json!(42));
        assert!(!result.success());
    }

    #[test]
    fn parse_failure_carries_streams() {
        let result = CommandResult::parse_failure("oops", "trace");
        assert!(!result.success());
        assert_eq!(result.error_kind(), Some(ErrorKind::OutputParseError));
        assert_eq!(result.error_message(), Some(PARSE_ERROR_MESSAGE));
        assert_eq!(result.raw_stdout(), Some("oops"));
        assert_eq!(result.raw_stderr(), Some("trace"));
    }

    #[test]
    fn raw_output_is_replayed_verbatim() {
        let text = r#"{"success":true,"liquidity":123456789012345678901234567890,"amount0":"1"}"#;
        let raw = RawValue::from_string(text.to_string()).unwrap();
        let result = CommandResult::from_raw(raw).unwrap();
        assert!(result.success());
        assert_eq!(result.to_json(), text);
        assert_eq!(serde_json::to_string(&result).unwrap(), text);
    }

    #[test]
    fn core_failure_keeps_success_first() {
        let result = CommandResult::failure(ErrorKind::UnknownCommand, "Unknown command: mint");
        assert_eq!(
            result.to_json(),
            r#"{"success":false,"error":"Unknown command: mint"}"#
        );
    }

    #[test]
    fn failure_serializes_to_wire_shape() {
        let result = CommandResult::failure(ErrorKind::UnknownCommand, "Unknown command: mint");
        let text = serde_json::to_string(&result).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            parsed,
            json!({"success": false, "error": "Unknown command: mint"})
        );
    }
}
