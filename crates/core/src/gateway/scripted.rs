//! An offline gateway that replays a small trip-planner script.
//!
//! Useful for demos and for running the service without API keys.

use super::LanguageModelGateway;
use crate::conversation::{ConversationTurn, Role};
use crate::error::GatewayError;
use crate::normalizer::RawResponse;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::info;

const BUDGET_SLIDER: &str = "budget_slider";
const GENERATE_BUTTON: &str = "generate_plan";

/// Answers from a fixed script keyed on the latest turn.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGateway {
    latency: Duration,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated network latency applied to every call.
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }
}

/// The most recent value reported for the budget slider, if any.
fn latest_budget(history: &[ConversationTurn]) -> Option<String> {
    let marker = format!("slider_change on element '{}'", BUDGET_SLIDER);
    history
        .iter()
        .rev()
        .filter(|turn| turn.role == Role::System && turn.content.contains(&marker))
        .find_map(|turn| {
            let (_, rest) = turn.content.split_once("value=")?;
            let value: String = rest
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            (!value.is_empty()).then_some(value)
        })
}

#[async_trait]
impl LanguageModelGateway for ScriptedGateway {
    async fn get_response(
        &self,
        history: &[ConversationTurn],
    ) -> Result<RawResponse, GatewayError> {
        let last = history
            .last()
            .map(|turn| turn.content.to_lowercase())
            .unwrap_or_default();
        info!(turns = history.len(), "Scripted gateway answering");

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let packet = if last.contains("button_click") && last.contains(GENERATE_BUTTON) {
            let budget = latest_budget(history).unwrap_or_else(|| "unknown".to_string());
            json!({
                "chat_message": format!(
                    "Great! I am now generating an itinerary for you with a budget of ${}...",
                    budget
                ),
                "ui_commands": [
                    {"command": "CLEAR_CONTAINER", "container_id": "main_workspace"},
                    {"command": "ADD_TEXT", "text": "Generating your amazing trip...", "style": "body"}
                ]
            })
        } else if last.contains("trip") {
            json!({
                "chat_message": "Of course! Let's plan your trip. What's your budget?",
                "ui_commands": [
                    {"command": "CLEAR_CONTAINER", "container_id": "main_workspace"},
                    {"command": "ADD_TEXT", "text": "Trip Planner", "style": "header"},
                    {"command": "ADD_SLIDER", "slider_id": BUDGET_SLIDER, "label": "Budget ($)",
                     "min_val": 500, "max_val": 5000, "default_val": 2000},
                    {"command": "ADD_BUTTON", "button_id": GENERATE_BUTTON, "text": "Generate Itinerary"}
                ]
            })
        } else {
            json!({"chat_message": "I'm sorry, I don't understand. Could you rephrase?"})
        };

        Ok(RawResponse::from_json(packet))
    }
}
