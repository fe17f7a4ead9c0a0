// Core types for intercepted WebDriver commands

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered command parameters, as sent on the wire
pub type Parameters = serde_json::Map<String, Value>;

/// Wire-protocol command names the reporting pipeline cares about
pub mod names {
    pub const NEW_SESSION: &str = "newSession";
    pub const QUIT: &str = "quit";
    pub const FIND_ELEMENT: &str = "findElement";
    pub const FIND_ELEMENTS: &str = "findElements";
    pub const FIND_CHILD_ELEMENT: &str = "findChildElement";
    pub const FIND_CHILD_ELEMENTS: &str = "findChildElements";
    pub const SEND_KEYS_TO_ELEMENT: &str = "sendKeysToElement";
    pub const CLICK_ELEMENT: &str = "clickElement";
    pub const SCREENSHOT: &str = "screenshot";
    pub const GET_ELEMENT_ATTRIBUTE: &str = "getElementAttribute";
}

/// One WebDriver protocol operation about to be sent to the real driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Wire command name (e.g. "findElement")
    pub name: String,

    /// Command parameters
    pub parameters: Parameters,

    /// Target driver session
    pub session_id: Option<String>,
}

impl Command {
    /// Create a command with no parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Parameters::new(),
            session_id: None,
        }
    }

    /// Add a parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Set the target session
    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Whether this is one of the element lookup commands retried by waits
    pub fn is_find_element(&self) -> bool {
        matches!(
            self.name.as_str(),
            names::FIND_ELEMENT
                | names::FIND_ELEMENTS
                | names::FIND_CHILD_ELEMENT
                | names::FIND_CHILD_ELEMENTS
        )
    }

    /// Whether this command types text into an element
    pub fn is_type_text(&self) -> bool {
        self.name == names::SEND_KEYS_TO_ELEMENT
    }

    pub fn is_new_session(&self) -> bool {
        self.name == names::NEW_SESSION
    }

    pub fn is_quit(&self) -> bool {
        self.name == names::QUIT
    }

    /// Target element id, for element-scoped commands
    pub fn element_id(&self) -> Option<&str> {
        self.parameters.get("id").and_then(Value::as_str)
    }
}

/// Outcome class of an executed command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    NoSuchElement,
    StaleElementReference,
    Timeout,
    UnknownError,
}

impl Status {
    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success)
    }

    /// W3C error string for this status
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::NoSuchElement => "no such element",
            Status::StaleElementReference => "stale element reference",
            Status::Timeout => "timeout",
            Status::UnknownError => "unknown error",
        }
    }
}

/// Result of executing a [`Command`] against the real driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Success or error kind
    pub status: Status,

    /// Optional value payload
    pub value: Option<Value>,

    /// Session the response belongs to
    pub session_id: Option<String>,
}

impl Response {
    /// A successful response carrying `value`
    pub fn success(value: Option<Value>) -> Self {
        Self {
            status: Status::Success,
            value,
            session_id: None,
        }
    }

    /// A failed response with a W3C-style `{error, message}` payload
    pub fn failure(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            value: Some(serde_json::json!({
                "error": status.as_str(),
                "message": message.into(),
            })),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn passed(&self) -> bool {
        self.status.is_success()
    }

    /// The payload as a string, if it is one
    pub fn value_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_builder() {
        let command = Command::new(names::FIND_ELEMENT)
            .param("using", "css selector")
            .param("value", "#login")
            .session("abc");

        assert!(command.is_find_element());
        assert!(!command.is_type_text());
        assert_eq!(command.session_id.as_deref(), Some("abc"));
        let keys: Vec<&str> = command.parameters.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["using", "value"]);
    }

    #[test]
    fn test_find_element_variants() {
        for name in [
            names::FIND_ELEMENT,
            names::FIND_ELEMENTS,
            names::FIND_CHILD_ELEMENT,
            names::FIND_CHILD_ELEMENTS,
        ] {
            assert!(Command::new(name).is_find_element(), "{name}");
        }
        assert!(!Command::new(names::QUIT).is_find_element());
    }

    #[test]
    fn test_failure_response_payload() {
        let response = Response::failure(Status::NoSuchElement, "gone");
        assert!(!response.passed());
        assert_eq!(
            response.value,
            Some(json!({"error": "no such element", "message": "gone"}))
        );
    }
}
