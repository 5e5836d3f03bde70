pub mod fake;
pub mod real;

use anyhow::Result;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionResponse,
};
use async_trait::async_trait;

/// Model used for every generation request unless the run config overrides it
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-0613";

/// A record of one request made through the client
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model_name: String,
    pub temperature: f32,
    pub messages: Vec<ChatCompletionRequestMessage>,
}

/// A trait that abstracts OpenAI client functionality for testing
///
/// Both the real client and the scripted fake implement this, so the
/// generation loop never knows which one it is talking to.
#[async_trait]
pub trait OpenAIClientTrait: Send + Sync {
    /// Creates a chat completion by sending messages to the language model
    ///
    /// # Arguments
    /// * `model` - The model identifier (e.g., "gpt-3.5-turbo-0613")
    /// * `temperature` - Sampling temperature, 0 for deterministic intent
    /// * `messages` - The system and user messages
    ///
    /// # Returns
    /// The complete ChatCompletionResponse from the model, or an error
    async fn chat_completion(
        &self,
        model: String,
        temperature: f32,
        messages: Vec<ChatCompletionRequestMessage>,
    ) -> Result<CreateChatCompletionResponse, anyhow::Error>;
}

/// Builds the `[system, user]` message pair sent for every category.
pub fn build_messages(
    system_prompt: &str,
    user_prompt: &str,
) -> Result<Vec<ChatCompletionRequestMessage>> {
    let system_message = ChatCompletionRequestMessage::System(
        ChatCompletionRequestSystemMessageArgs::default()
            .content(system_prompt)
            .build()
            .map_err(|e| {
                anyhow::anyhow!("Failed to build system message: {}", e)
            })?,
    );

    let user_message = ChatCompletionRequestMessage::User(
        ChatCompletionRequestUserMessageArgs::default()
            .content(user_prompt)
            .build()
            .map_err(|e| {
                anyhow::anyhow!("Failed to build user message: {}", e)
            })?,
    );

    Ok(vec![system_message, user_message])
}
