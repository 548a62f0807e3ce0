//! Gateway for any OpenAI-compatible chat completions API.
//!
//! Every registered command is offered to the model as a tool; the model's
//! tool calls come back as discrete invocations.

use super::LanguageModelGateway;
use crate::conversation::{ConversationTurn, Role};
use crate::error::GatewayError;
use crate::normalizer::{Invocation, RawResponse};
use crate::registry::CommandRegistry;
use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        ChatCompletionTool, ChatCompletionToolArgs, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse, FunctionObjectArgs,
    },
};
use async_trait::async_trait;
use tracing::debug;

impl From<OpenAIError> for GatewayError {
    fn from(err: OpenAIError) -> Self {
        match err {
            OpenAIError::Reqwest(e) => GatewayError::from(e),
            OpenAIError::ApiError(api) => {
                let kind = api.r#type.clone().unwrap_or_default().to_lowercase();
                let message = api.message.to_lowercase();
                if kind.contains("quota") || message.contains("quota") || message.contains("rate limit") {
                    GatewayError::Quota(api.message)
                } else if message.contains("api key") || kind.contains("authentication") {
                    GatewayError::Auth(api.message)
                } else {
                    GatewayError::Rejected(api.message)
                }
            }
            other => GatewayError::Malformed(other.to_string()),
        }
    }
}

/// An implementation of `LanguageModelGateway` for any OpenAI-compatible API.
pub struct OpenAiGateway {
    client: Client<OpenAIConfig>,
    model: String,
    system_prompt: String,
    tools: Vec<ChatCompletionTool>,
}

impl OpenAiGateway {
    /// Creates a gateway offering every command in `registry` as a tool.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the OpenAI client, including API key and base URL.
    /// * `model` - The model identifier to use for chat completions (e.g., "gpt-4o").
    /// * `system_prompt` - Instructions prepended to every request.
    pub fn new(
        config: OpenAIConfig,
        model: String,
        system_prompt: String,
        registry: &CommandRegistry,
    ) -> Result<Self, GatewayError> {
        let tools = registry
            .function_declarations()
            .into_iter()
            .map(|declaration| {
                ChatCompletionToolArgs::default()
                    .function(
                        FunctionObjectArgs::default()
                            .name(declaration.name)
                            .description(declaration.description)
                            .parameters(declaration.parameters)
                            .build()?,
                    )
                    .build()
            })
            .collect::<Result<Vec<_>, OpenAIError>>()?;

        Ok(Self {
            client: Client::with_config(config),
            model,
            system_prompt,
            tools,
        })
    }

    fn build_messages(
        &self,
        history: &[ConversationTurn],
    ) -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.system_prompt.clone())
                .build()?
                .into(),
        ];
        for turn in history {
            let message = match turn.role {
                Role::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(turn.content.clone())
                    .build()?
                    .into(),
                Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(turn.content.clone())
                    .build()?
                    .into(),
                Role::System => ChatCompletionRequestSystemMessageArgs::default()
                    .content(turn.content.clone())
                    .build()?
                    .into(),
            };
            messages.push(message);
        }
        Ok(messages)
    }
}

#[async_trait]
impl LanguageModelGateway for OpenAiGateway {
    async fn get_response(
        &self,
        history: &[ConversationTurn],
    ) -> Result<RawResponse, GatewayError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(self.build_messages(history)?)
            .tools(self.tools.clone())
            .tool_choice("auto")
            .build()?;

        let response: CreateChatCompletionResponse = self.client.chat().create(request).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::Malformed("response had no choices".to_string()))?;

        let calls: Vec<Invocation> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| Invocation::from_arguments_str(call.function.name, &call.function.arguments))
            .collect();
        debug!(model = %self.model, tool_calls = calls.len(), "Received chat completion");

        Ok(RawResponse::Invocations {
            text: choice.message.content,
            calls,
        })
    }
}
