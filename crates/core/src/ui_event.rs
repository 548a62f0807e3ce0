//! UI events reported by the renderer and their translation into text turns.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiEventType {
    ButtonClick,
    SliderChange,
    DropdownChange,
    TextInputChange,
    DateChange,
}

impl fmt::Display for UiEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UiEventType::ButtonClick => "button_click",
            UiEventType::SliderChange => "slider_change",
            UiEventType::DropdownChange => "dropdown_change",
            UiEventType::TextInputChange => "text_input_change",
            UiEventType::DateChange => "date_change",
        };
        f.write_str(name)
    }
}

/// A structured interaction with a rendered element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiEvent {
    pub event_type: UiEventType,
    pub element_id: String,
    #[serde(default)]
    pub state: BTreeMap<String, Value>,
}

impl UiEvent {
    /// Validates an untyped `ui_event` payload.
    pub fn from_payload(payload: Value) -> Result<Self, ValidationError> {
        if !payload.is_object() {
            return Err(ValidationError("payload must be a JSON object".to_string()));
        }
        let event: UiEvent =
            serde_json::from_value(payload).map_err(|e| ValidationError(e.to_string()))?;
        if event.element_id.trim().is_empty() {
            return Err(ValidationError("`element_id` must not be empty".to_string()));
        }
        Ok(event)
    }
}

/// Describes `event` as a single sentence the Gateway can read.
///
/// The output depends only on the event: state keys are sorted at every
/// nesting level, so identical events always produce identical text.
pub fn translate(event: &UiEvent) -> String {
    let mut state = String::from("{");
    for (i, (key, value)) in event.state.iter().enumerate() {
        if i > 0 {
            state.push_str(", ");
        }
        state.push_str(key);
        state.push('=');
        write_canonical(value, &mut state);
    }
    state.push('}');

    format!(
        "User performed action: {} on element '{}'. Current form state: {}",
        event.event_type, event.element_id, state
    )
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(key);
                out.push('=');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        // Strings keep their JSON quoting so "3000" and 3000 stay distinct.
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_translate_slider_change() {
        let event = UiEvent::from_payload(json!({
            "event_type": "slider_change",
            "element_id": "budget",
            "state": {"value": 3000}
        }))
        .unwrap();
        assert_eq!(
            translate(&event),
            "User performed action: slider_change on element 'budget'. Current form state: {value=3000}"
        );
    }

    #[test]
    fn test_translate_is_deterministic_across_key_order() {
        let a = UiEvent::from_payload(json!({
            "event_type": "button_click",
            "element_id": "generate_plan",
            "state": {"zeta": {"b": 1, "a": [true, null]}, "alpha": "x"}
        }))
        .unwrap();
        let b = UiEvent::from_payload(json!({
            "event_type": "button_click",
            "element_id": "generate_plan",
            "state": {"alpha": "x", "zeta": {"a": [true, null], "b": 1}}
        }))
        .unwrap();

        let text = translate(&a);
        assert_eq!(text, translate(&b));
        assert_eq!(text, translate(&a));
        assert!(text.ends_with("{alpha=\"x\", zeta={a=[true, null], b=1}}"));
    }

    #[test]
    fn test_missing_state_is_empty() {
        let event = UiEvent::from_payload(json!({
            "event_type": "button_click",
            "element_id": "go"
        }))
        .unwrap();
        assert!(translate(&event).ends_with("Current form state: {}"));
    }

    #[test]
    fn test_malformed_events_are_rejected() {
        let missing_type = json!({"element_id": "budget"});
        let missing_element = json!({"event_type": "slider_change"});
        let empty_element = json!({"event_type": "slider_change", "element_id": " "});
        let unknown_type = json!({"event_type": "hover", "element_id": "budget"});

        for payload in [missing_type, missing_element, empty_element, unknown_type, json!(null)] {
            assert!(UiEvent::from_payload(payload).is_err());
        }
    }
}
