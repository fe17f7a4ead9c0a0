use serde_json::Value;
use tracing::debug;

use super::types::Command;

/// Add the `text` parameter the Agent's report schema expects to
/// "type text" commands.
///
/// The wire `value` key is left untouched for the real driver. Commands
/// other than "type text" pass through unchanged.
pub fn normalize(command: &mut Command) {
    if !command.is_type_text() {
        return;
    }

    let text = match command.parameters.get("value") {
        Some(Value::Array(items)) => match items.first() {
            Some(first) => stringify(first),
            None => {
                debug!(command = %command.name, "'value' parameter is an empty array, not adding 'text'");
                return;
            }
        },
        Some(other) => {
            debug!(command = %command.name, value = %other, "'value' parameter is not an array, not adding 'text'");
            return;
        }
        None => {
            debug!(command = %command.name, "command has no 'value' parameter, not adding 'text'");
            return;
        }
    };

    command
        .parameters
        .insert("text".to_string(), Value::String(text));
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::names;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_array_value_adds_text() {
        let mut command = Command::new(names::SEND_KEYS_TO_ELEMENT)
            .param("id", "el-1")
            .param("value", json!(["hunter2"]));

        normalize(&mut command);

        assert_eq!(command.parameters.get("text"), Some(&json!("hunter2")));
        assert_eq!(command.parameters.get("value"), Some(&json!(["hunter2"])));
    }

    #[test]
    fn test_non_string_first_element_is_stringified() {
        let mut command = Command::new(names::SEND_KEYS_TO_ELEMENT).param("value", json!([42, "x"]));
        normalize(&mut command);
        assert_eq!(command.parameters.get("text"), Some(&json!("42")));
    }

    #[test]
    fn test_non_array_value_passes_through() {
        let mut command = Command::new(names::SEND_KEYS_TO_ELEMENT).param("value", "plain");
        let before = command.clone();
        normalize(&mut command);
        assert_eq!(command, before);

        let mut missing = Command::new(names::SEND_KEYS_TO_ELEMENT).param("id", "el-1");
        let before = missing.clone();
        normalize(&mut missing);
        assert_eq!(missing, before);

        let mut empty = Command::new(names::SEND_KEYS_TO_ELEMENT).param("value", json!([]));
        normalize(&mut empty);
        assert!(empty.parameters.get("text").is_none());
    }

    #[test]
    fn test_other_commands_untouched() {
        let mut command = Command::new(names::FIND_ELEMENT).param("value", json!(["a"]));
        normalize(&mut command);
        assert!(command.parameters.get("text").is_none());
    }
}
