use crate::openai::OpenAIClientTrait;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, CreateChatCompletionRequestArgs,
    CreateChatCompletionResponse,
};
use async_openai::Client;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

// A real implementation of the OpenAI client
pub struct RealOpenAIClient {
    client: Client<OpenAIConfig>,
}

impl RealOpenAIClient {
    pub fn new(client: Client<OpenAIConfig>) -> Self {
        Self { client }
    }
}

/// Creates a client from an explicit credential and optional endpoint.
pub fn create_openai_client(
    api_key: &str,
    api_base: Option<&str>,
) -> Arc<dyn OpenAIClientTrait> {
    let mut config = OpenAIConfig::new().with_api_key(api_key);
    if let Some(api_base) = api_base {
        debug!("Using OpenAI API base {}", api_base);
        config = config.with_api_base(api_base);
    }
    Arc::new(RealOpenAIClient::new(Client::with_config(config)))
}

#[async_trait]
impl OpenAIClientTrait for RealOpenAIClient {
    async fn chat_completion(
        &self,
        model: String,
        temperature: f32,
        messages: Vec<ChatCompletionRequestMessage>,
    ) -> Result<CreateChatCompletionResponse, anyhow::Error> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .temperature(temperature)
            .messages(messages)
            .build()?;

        let response = self.client.chat().create(request).await?;

        Ok(response)
    }
}
