//! Response Normalizer
//!
//! Gateways hand back one of several raw shapes:
//!
//! - a JSON packet: `{"chat_message": ..., "ui_commands": [{"command": ...}, ...]}`
//! - a list of discrete function invocations, each naming a variant
//! - a `candidates[0].content.parts[]` structure mixing text and function calls
//! - free text, which may itself hold a JSON packet (optionally fenced)
//!
//! Every shape is first flattened into an ordered list of raw entries, then
//! each entry is decoded through the [`CommandRegistry`]. A failing entry is
//! logged and reported in [`NormalizedResponse::dropped`]; the rest of the
//! response still goes out.

use crate::command::ResponsePacket;
use crate::error::{DecodeError, GatewayError};
use crate::registry::CommandRegistry;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// One function invocation as emitted by a model.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub name: String,
    pub args: Value,
}

impl Invocation {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Builds an invocation from a JSON-encoded argument string. Unparseable
    /// arguments are kept as a string so decoding reports them.
    pub fn from_arguments_str(name: impl Into<String>, arguments: &str) -> Self {
        let args = serde_json::from_str(arguments)
            .unwrap_or_else(|_| Value::String(arguments.to_string()));
        Self::new(name, args)
    }
}

/// Raw Gateway output, before any validation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    /// A packet object with `chat_message` and tagged `ui_commands`.
    Packet(Value),
    /// Discrete function invocations, plus any free text sent alongside.
    Invocations {
        text: Option<String>,
        calls: Vec<Invocation>,
    },
    /// A `candidates -> content -> parts` document.
    Candidates(Value),
    /// Free text.
    Text(String),
}

impl RawResponse {
    /// Detects the shape of an arbitrary JSON document.
    pub fn from_json(value: Value) -> Self {
        if value.get("candidates").is_some() {
            return RawResponse::Candidates(value);
        }
        match value {
            Value::Array(items) => RawResponse::Invocations {
                text: None,
                calls: items.into_iter().map(invocation_from_json).collect(),
            },
            Value::String(text) => RawResponse::Text(text),
            other => RawResponse::Packet(other),
        }
    }
}

fn invocation_from_json(item: Value) -> Invocation {
    let name = item
        .get("name")
        .or_else(|| item.get("command"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if item.get("name").is_none() {
        // Already a tagged command object.
        return Invocation::new(name, item);
    }
    match item.get("args").or_else(|| item.get("arguments")) {
        Some(Value::String(arguments)) => Invocation::from_arguments_str(name, arguments),
        Some(args) => Invocation::new(name, args.clone()),
        None => Invocation::new(name, Value::Null),
    }
}

/// A command that was removed from a response, with its position in the
/// flattened command list.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedCommand {
    pub index: usize,
    pub error: DecodeError,
}

/// The canonical packet plus what had to be dropped to produce it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedResponse {
    pub packet: ResponsePacket,
    pub dropped: Vec<DroppedCommand>,
}

/// A flattened entry, not yet decoded.
enum Entry {
    Call { name: String, fields: Value },
    Malformed(String),
}

#[derive(Default)]
struct Extracted {
    chat: Vec<String>,
    entries: Vec<Entry>,
}

impl Extracted {
    fn push_chat(&mut self, text: &str) {
        if !text.trim().is_empty() {
            self.chat.push(text.to_string());
        }
    }

    fn chat_message(&self) -> Option<String> {
        if self.chat.is_empty() {
            None
        } else {
            Some(self.chat.join("\n\n"))
        }
    }
}

/// Turns raw Gateway output into a [`ResponsePacket`]. Never fails.
#[derive(Debug, Clone)]
pub struct ResponseNormalizer {
    registry: Arc<CommandRegistry>,
}

impl ResponseNormalizer {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }

    /// Normalizes the outcome of a Gateway call. A Gateway failure becomes a
    /// packet whose chat message describes it and which carries no commands.
    pub fn normalize_result(
        &self,
        result: Result<RawResponse, GatewayError>,
    ) -> NormalizedResponse {
        match result {
            Ok(raw) => self.normalize(raw),
            Err(err) => {
                error!(error = %err, "Gateway call failed");
                NormalizedResponse {
                    packet: ResponsePacket::chat(err.user_message()),
                    dropped: Vec::new(),
                }
            }
        }
    }

    pub fn normalize(&self, raw: RawResponse) -> NormalizedResponse {
        let mut extracted = Extracted::default();
        match raw {
            RawResponse::Packet(value) => extract_packet(&value, &mut extracted),
            RawResponse::Invocations { text, calls } => {
                if let Some(text) = text {
                    extract_text(&text, &mut extracted);
                }
                for call in calls {
                    self.extract_invocation(call, &mut extracted);
                }
            }
            RawResponse::Candidates(value) => self.extract_candidates(&value, &mut extracted),
            RawResponse::Text(text) => extract_text(&text, &mut extracted),
        }

        let chat_message = extracted.chat_message();
        let mut ui_commands = Vec::with_capacity(extracted.entries.len());
        let mut dropped = Vec::new();

        for (index, entry) in extracted.entries.into_iter().enumerate() {
            let decoded = match entry {
                Entry::Call { name, fields } => self.registry.decode(&name, fields),
                Entry::Malformed(reason) => Err(DecodeError::invalid("", reason)),
            };
            match decoded {
                Ok(command) => ui_commands.push(command),
                Err(error) => {
                    warn!(index, tag = %error.tag(), %error, "Dropping command");
                    dropped.push(DroppedCommand { index, error });
                }
            }
        }

        debug!(
            commands = ui_commands.len(),
            dropped = dropped.len(),
            "Normalized gateway response"
        );

        NormalizedResponse {
            packet: ResponsePacket {
                chat_message,
                ui_commands,
            },
            dropped,
        }
    }

    fn extract_invocation(&self, call: Invocation, out: &mut Extracted) {
        let is_envelope = self.registry.resolve(&call.name).is_none()
            && call.args.get("ui_commands").is_some();
        if is_envelope {
            extract_packet(&call.args, out);
        } else {
            out.entries.push(Entry::Call {
                name: call.name,
                fields: call.args,
            });
        }
    }

    fn extract_candidates(&self, value: &Value, out: &mut Extracted) {
        let parts = value
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array);
        let Some(parts) = parts else {
            debug!("Response carried no candidate parts");
            return;
        };

        for part in parts {
            if part.get("thought").and_then(Value::as_bool) == Some(true) {
                continue;
            }
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                extract_text(text, out);
            }
            if let Some(call) = part.get("functionCall").or_else(|| part.get("function_call")) {
                let name = call.get("name").and_then(Value::as_str).unwrap_or_default();
                let args = call.get("args").cloned().unwrap_or(Value::Null);
                self.extract_invocation(Invocation::new(name, args), out);
            }
        }
    }
}

fn extract_packet(value: &Value, out: &mut Extracted) {
    let Some(object) = value.as_object() else {
        if !value.is_null() {
            warn!("Ignoring non-object response packet");
        }
        return;
    };

    match object.get("chat_message") {
        Some(Value::String(text)) => out.push_chat(text),
        Some(Value::Null) | None => {}
        Some(_) => warn!("Ignoring non-string chat_message"),
    }

    match object.get("ui_commands") {
        Some(Value::Array(commands)) => {
            for command in commands {
                match command.get("command").and_then(Value::as_str) {
                    Some(tag) => out.entries.push(Entry::Call {
                        name: tag.to_string(),
                        fields: command.clone(),
                    }),
                    None => out
                        .entries
                        .push(Entry::Malformed("command entry has no `command` tag".to_string())),
                }
            }
        }
        Some(Value::Null) | None => {}
        Some(_) => out
            .entries
            .push(Entry::Malformed("`ui_commands` is not an array".to_string())),
    }
}

/// Free text is either an inline JSON packet or plain chat.
fn extract_text(text: &str, out: &mut Extracted) {
    match parse_inline_packet(text) {
        Some(packet) => extract_packet(&packet, out),
        None => out.push_chat(text),
    }
}

fn parse_inline_packet(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();
    if !body.starts_with('{') {
        return None;
    }
    let value: Value = serde_json::from_str(body).ok()?;
    let is_packet = value.get("ui_commands").is_some() || value.get("chat_message").is_some();
    is_packet.then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::UiCommand;
    use serde_json::json;

    fn normalizer() -> ResponseNormalizer {
        ResponseNormalizer::new(Arc::new(CommandRegistry::default()))
    }

    fn tags(response: &NormalizedResponse) -> Vec<&'static str> {
        response.packet.ui_commands.iter().map(UiCommand::tag).collect()
    }

    #[test]
    fn test_packet_shape_preserves_order() {
        let response = normalizer().normalize(RawResponse::Packet(json!({
            "chat_message": "Let's plan!",
            "ui_commands": [
                {"command": "CLEAR_CONTAINER", "container_id": "main_workspace"},
                {"command": "ADD_SLIDER", "slider_id": "budget", "label": "Budget",
                 "min_val": 500, "max_val": 5000, "default_val": 2000}
            ]
        })));
        assert_eq!(response.packet.chat_message.as_deref(), Some("Let's plan!"));
        assert_eq!(tags(&response), vec!["CLEAR_CONTAINER", "ADD_SLIDER"]);
        assert!(response.dropped.is_empty());
    }

    #[test]
    fn test_unknown_command_is_dropped_not_fatal() {
        let response = normalizer().normalize(RawResponse::Packet(json!({
            "ui_commands": [
                {"command": "ADD_TEXT", "text": "one"},
                {"command": "SUMMON_DRAGON", "size": "large"},
                {"command": "ADD_TEXT", "text": "two"},
                {"command": "ADD_BUTTON", "button_id": "go", "text": "Go"}
            ]
        })));
        assert_eq!(tags(&response), vec!["ADD_TEXT", "ADD_TEXT", "ADD_BUTTON"]);
        assert_eq!(response.dropped.len(), 1);
        assert_eq!(response.dropped[0].index, 1);
        assert!(matches!(
            response.dropped[0].error,
            DecodeError::UnknownCommand { ref tag, .. } if tag == "SUMMON_DRAGON"
        ));
        assert_eq!(response.packet.chat_message, None);
    }

    #[test]
    fn test_invalid_and_untagged_entries_are_dropped() {
        let response = normalizer().normalize(RawResponse::Packet(json!({
            "chat_message": "partial",
            "ui_commands": [
                {"command": "ADD_SLIDER", "slider_id": "s", "label": "S",
                 "min_val": 0, "max_val": 10, "default_val": 11},
                {"text": "no tag"},
                {"command": "CLEAR_CONTAINER", "container_id": "main_workspace"}
            ]
        })));
        assert_eq!(tags(&response), vec!["CLEAR_CONTAINER"]);
        let indices: Vec<_> = response.dropped.iter().map(|d| d.index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_invocation_shape() {
        let response = normalizer().normalize(RawResponse::Invocations {
            text: Some("Here you go".to_string()),
            calls: vec![
                Invocation::new("ADD_TEXT", json!({"text": "Title", "style": "header"})),
                Invocation::from_arguments_str("AddButtonCommand", r#"{"button_id":"b","text":"B"}"#),
                Invocation::from_arguments_str("ADD_BUTTON", "{not json"),
            ],
        });
        assert_eq!(response.packet.chat_message.as_deref(), Some("Here you go"));
        assert_eq!(tags(&response), vec!["ADD_TEXT", "ADD_BUTTON"]);
        assert_eq!(response.dropped.len(), 1);
        assert_eq!(response.dropped[0].index, 2);
    }

    #[test]
    fn test_envelope_invocation_is_expanded() {
        let response = normalizer().normalize(RawResponse::Invocations {
            text: None,
            calls: vec![Invocation::new(
                "TestUICommand",
                json!({
                    "thinking": "the user wants a button",
                    "chat_message": "Done.",
                    "ui_commands": [{"command": "ADD_BUTTON", "button_id": "click", "text": "Click me"}]
                }),
            )],
        });
        assert_eq!(response.packet.chat_message.as_deref(), Some("Done."));
        assert_eq!(tags(&response), vec!["ADD_BUTTON"]);
    }

    #[test]
    fn test_candidates_shape() {
        let response = normalizer().normalize(RawResponse::Candidates(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "thinking...", "thought": true},
                        {"text": "Pick a language."},
                        {"functionCall": {"name": "ADD_DROPDOWN", "args": {
                            "container_id": "sidebar",
                            "options": ["Python", "JavaScript", "Rust"],
                            "default_value": "Python"
                        }}},
                        {"function_call": {"name": "ADD_TEXT", "args": {"text": "hi"}}}
                    ]
                }
            }]
        })));
        assert_eq!(response.packet.chat_message.as_deref(), Some("Pick a language."));
        assert_eq!(tags(&response), vec!["ADD_DROPDOWN", "ADD_TEXT"]);
    }

    #[test]
    fn test_candidate_parts_keep_their_order() {
        let response = normalizer().normalize(RawResponse::Candidates(json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"functionCall": {"name": "CLEAR_CONTAINER", "args": {"container_id": "main_workspace"}}},
                        {"text": "Here is your form."},
                        {"text": "{\"ui_commands\": [{\"command\": \"ADD_BUTTON\", \"button_id\": \"go\", \"text\": \"Go\"}]}"}
                    ]
                }
            }]
        })));
        assert_eq!(response.packet.chat_message.as_deref(), Some("Here is your form."));
        assert_eq!(tags(&response), vec!["CLEAR_CONTAINER", "ADD_BUTTON"]);
        assert!(response.dropped.is_empty());
    }

    #[test]
    fn test_absent_or_empty_candidates_yield_empty_packet() {
        for raw in [
            json!({"candidates": []}),
            json!({"candidates": [{"content": {}}]}),
            json!({"candidates": [{"content": {"parts": []}}]}),
            json!({"candidates": [{"finishReason": "SAFETY"}]}),
        ] {
            let response = normalizer().normalize(RawResponse::Candidates(raw));
            assert_eq!(response, NormalizedResponse::default());
        }
    }

    #[test]
    fn test_inline_json_text_is_a_packet() {
        let text = "```json\n{\"chat_message\": \"Hi\", \"ui_commands\": [{\"command\": \"ADD_TEXT\", \"text\": \"Hello\"}]}\n```";
        let response = normalizer().normalize(RawResponse::Text(text.to_string()));
        assert_eq!(response.packet.chat_message.as_deref(), Some("Hi"));
        assert_eq!(tags(&response), vec!["ADD_TEXT"]);

        let plain = normalizer().normalize(RawResponse::Text("{just braces} in prose".to_string()));
        assert_eq!(plain.packet.chat_message.as_deref(), Some("{just braces} in prose"));
    }

    #[test]
    fn test_shape_detection() {
        assert!(matches!(
            RawResponse::from_json(json!({"candidates": []})),
            RawResponse::Candidates(_)
        ));
        assert!(matches!(
            RawResponse::from_json(json!({"chat_message": "x"})),
            RawResponse::Packet(_)
        ));
        assert_eq!(RawResponse::from_json(json!("hey")), RawResponse::Text("hey".to_string()));

        let RawResponse::Invocations { calls, .. } = RawResponse::from_json(json!([
            {"name": "ADD_TEXT", "arguments": "{\"text\": \"a\"}"},
            {"name": "ADD_TEXT", "args": {"text": "b"}},
            {"command": "ADD_TEXT", "text": "c"}
        ])) else {
            panic!("Expected invocations");
        };
        assert_eq!(calls[0], Invocation::new("ADD_TEXT", json!({"text": "a"})));
        assert_eq!(calls[1], Invocation::new("ADD_TEXT", json!({"text": "b"})));
        assert_eq!(calls[2].name, "ADD_TEXT");
    }

    #[test]
    fn test_gateway_failure_becomes_chat_only_packet() {
        let response = normalizer()
            .normalize_result(Err(GatewayError::Transport("connection refused".to_string())));
        let message = response.packet.chat_message.unwrap();
        assert!(message.contains("connection refused"));
        assert!(response.packet.ui_commands.is_empty());
    }
}
