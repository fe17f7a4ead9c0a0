//! Masking of values typed into secured fields before they are reported.
//!
//! Redaction only ever touches the copy of a command that goes into a
//! report. The keystrokes sent to the real driver are never altered.

use serde_json::{Value, json};
use tracing::{debug, warn};

use super::types::{Command, names};
use crate::transport::Transport;

/// Marker reported in place of a secured value
pub const REDACTED: &str = "***";

/// iOS class name of secure text fields
const IOS_SECURE_TEXT_FIELD: &str = "XCUIElementTypeSecureTextField";

/// Kind of application under test, which decides how secured fields look
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Browser content (desktop or mobile web)
    Web,
    /// Native Android application
    Android,
    /// Native iOS application
    Ios,
}

impl Platform {
    /// Derive the platform from session capabilities
    ///
    /// A browser name always means web content, even on a mobile platform.
    pub fn from_capabilities(capabilities: &Value) -> Self {
        let browser = capabilities
            .get("browserName")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if !browser.trim().is_empty() {
            return Platform::Web;
        }

        let platform = capabilities
            .get("platformName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase();
        match platform.as_str() {
            "android" => Platform::Android,
            "ios" => Platform::Ios,
            _ => Platform::Web,
        }
    }

    /// Attribute queried on the element, and the value that marks it secured
    fn secured_marker(&self) -> (&'static str, &'static str) {
        match self {
            Platform::Web => ("type", "password"),
            Platform::Android => ("password", "true"),
            Platform::Ios => ("type", IOS_SECURE_TEXT_FIELD),
        }
    }
}

/// Masks typed values for password-like fields
#[derive(Debug, Clone)]
pub struct CommandRedactor {
    platform: Platform,
}

impl CommandRedactor {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Return the command as it should be reported
    ///
    /// Only "type text" commands targeting a secured field are changed. When
    /// the element cannot be classified the original value is reported.
    pub fn redact(&self, command: &Command, transport: &mut dyn Transport) -> Command {
        if !command.is_type_text() {
            return command.clone();
        }

        let Some(element_id) = command.element_id() else {
            debug!(command = %command.name, "no element id, skipping redaction");
            return command.clone();
        };

        match self.is_secured(element_id, command.session_id.as_deref(), transport) {
            Ok(true) => {
                let mut redacted = command.clone();
                redacted
                    .parameters
                    .insert("value".to_string(), json!([REDACTED]));
                if redacted.parameters.contains_key("text") {
                    redacted
                        .parameters
                        .insert("text".to_string(), Value::String(REDACTED.to_string()));
                }
                redacted
            }
            Ok(false) => command.clone(),
            Err(reason) => {
                warn!(element = element_id, %reason, "could not classify element, reporting typed value unredacted");
                command.clone()
            }
        }
    }

    /// Side-channel query for the element's secured marker
    fn is_secured(
        &self,
        element_id: &str,
        session_id: Option<&str>,
        transport: &mut dyn Transport,
    ) -> Result<bool, String> {
        let (attribute, secured_value) = self.platform.secured_marker();

        let mut query = Command::new(names::GET_ELEMENT_ATTRIBUTE)
            .param("id", element_id)
            .param("name", attribute);
        query.session_id = session_id.map(str::to_string);

        let response = transport.execute(&mut query).map_err(|e| e.to_string())?;
        if !response.passed() {
            return Err(format!("attribute query failed with '{}'", response.status.as_str()));
        }

        Ok(response
            .value_str()
            .map(|v| v.eq_ignore_ascii_case(secured_value))
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Response, Status};
    use crate::transport::{ScriptedTransport, TransportError};
    use pretty_assertions::assert_eq;

    fn typing(value: &str) -> Command {
        Command::new(names::SEND_KEYS_TO_ELEMENT)
            .param("id", "el-7")
            .param("value", json!([value]))
            .param("text", value)
            .session("s-1")
    }

    fn attribute_transport(value: &'static str) -> ScriptedTransport {
        ScriptedTransport::new(move |_| Ok(Response::success(Some(json!(value)))))
    }

    #[test]
    fn test_platform_from_capabilities() {
        assert_eq!(Platform::from_capabilities(&json!({"browserName": "chrome"})), Platform::Web);
        assert_eq!(
            Platform::from_capabilities(&json!({"platformName": "Android"})),
            Platform::Android
        );
        assert_eq!(Platform::from_capabilities(&json!({"platformName": "iOS"})), Platform::Ios);
        assert_eq!(
            Platform::from_capabilities(&json!({"platformName": "Android", "browserName": "chrome"})),
            Platform::Web
        );
        assert_eq!(Platform::from_capabilities(&json!({})), Platform::Web);
    }

    #[test]
    fn test_password_field_is_masked() {
        let redactor = CommandRedactor::new(Platform::Web);
        let mut transport = attribute_transport("password");
        let log = transport.log();

        let reported = redactor.redact(&typing("hunter2"), &mut transport);

        assert_eq!(reported.parameters.get("value"), Some(&json!([REDACTED])));
        assert_eq!(reported.parameters.get("text"), Some(&json!(REDACTED)));

        let queries = log.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].name, names::GET_ELEMENT_ATTRIBUTE);
        assert_eq!(queries[0].parameters.get("name"), Some(&json!("type")));
        assert_eq!(queries[0].session_id.as_deref(), Some("s-1"));
    }

    #[test]
    fn test_plain_field_is_reported_as_is() {
        let redactor = CommandRedactor::new(Platform::Web);
        let mut transport = attribute_transport("text");
        let original = typing("alice");
        assert_eq!(redactor.redact(&original, &mut transport), original);
    }

    #[test]
    fn test_mobile_markers() {
        let android = CommandRedactor::new(Platform::Android);
        let reported = android.redact(&typing("pin"), &mut attribute_transport("true"));
        assert_eq!(reported.parameters.get("text"), Some(&json!(REDACTED)));

        let ios = CommandRedactor::new(Platform::Ios);
        let reported = ios.redact(&typing("pin"), &mut attribute_transport(IOS_SECURE_TEXT_FIELD));
        assert_eq!(reported.parameters.get("text"), Some(&json!(REDACTED)));

        let reported = ios.redact(&typing("pin"), &mut attribute_transport("XCUIElementTypeTextField"));
        assert_eq!(reported.parameters.get("text"), Some(&json!("pin")));
    }

    #[test]
    fn test_stale_element_reports_unredacted() {
        let redactor = CommandRedactor::new(Platform::Web);

        let mut failing = ScriptedTransport::new(|_| {
            Ok(Response::failure(Status::StaleElementReference, "element is gone"))
        });
        let original = typing("hunter2");
        assert_eq!(redactor.redact(&original, &mut failing), original);

        let mut erroring = ScriptedTransport::new(|_| Err(TransportError::Connection("reset".into())));
        assert_eq!(redactor.redact(&original, &mut erroring), original);
    }

    #[test]
    fn test_non_typing_commands_skip_query() {
        let redactor = CommandRedactor::new(Platform::Web);
        let mut transport = attribute_transport("password");
        let log = transport.log();

        let command = Command::new(names::FIND_ELEMENT).param("value", "#pw");
        assert_eq!(redactor.redact(&command, &mut transport), command);
        assert!(log.lock().unwrap().is_empty());
    }
}
