use anyhow::Result;
use async_openai::types::{
    ChatChoice, ChatCompletionRequestMessage, ChatCompletionResponseMessage,
    CompletionUsage, CreateChatCompletionResponse, FinishReason, Role,
};
use async_trait::async_trait;
use std::sync::Mutex;

use crate::openai::{ModelRequest, OpenAIClientTrait};

enum ScriptedReply {
    Completion {
        content: Option<String>,
        finish_reason: FinishReason,
    },
    Failure(String),
}

/// A fake implementation of the OpenAI client for testing
///
/// Replies are scripted up front and handed out in order, one per call.
/// Once the script runs out every call gets a default single-line reply.
///
/// # Example
///
/// ```
/// use bctgen::openai::{build_messages, OpenAIClientTrait};
/// use bctgen::openai::fake::FakeOpenAIClient;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = FakeOpenAIClient::new()
///         .with_response("1. Eat slowly");
///
///     let messages = build_messages("You are an assistant.", "Hello")?;
///     let response = client
///         .chat_completion("gpt-3.5-turbo-0613".to_string(), 0.0, messages)
///         .await?;
///
///     let content = response.choices.first()
///         .and_then(|choice| choice.message.content.as_ref())
///         .map(String::from)
///         .unwrap_or_default();
///
///     assert_eq!(content, "1. Eat slowly");
///     Ok(())
/// }
/// ```
pub struct FakeOpenAIClient {
    replies: Mutex<Vec<ScriptedReply>>,
    // Track requests for verification in tests
    pub requests: Mutex<Vec<ModelRequest>>,
}

impl Default for FakeOpenAIClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeOpenAIClient {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(vec![]),
            requests: Mutex::new(vec![]),
        }
    }

    fn push(self, reply: ScriptedReply) -> Self {
        self.replies.lock().unwrap().push(reply);
        self
    }

    /// Add a naturally completed response
    pub fn with_response(self, response: &str) -> Self {
        self.push(ScriptedReply::Completion {
            content: Some(response.to_string()),
            finish_reason: FinishReason::Stop,
        })
    }

    /// Add multiple naturally completed responses, returned in sequence
    pub fn with_responses(self, responses: Vec<&str>) -> Self {
        responses
            .into_iter()
            .fold(self, |client, response| client.with_response(response))
    }

    /// Add a response cut off by the token limit
    pub fn with_truncated_response(self, response: &str) -> Self {
        self.push(ScriptedReply::Completion {
            content: Some(response.to_string()),
            finish_reason: FinishReason::Length,
        })
    }

    /// Configure the client to return a response with None content
    pub fn with_none_content_response(self) -> Self {
        self.push(ScriptedReply::Completion {
            content: None,
            finish_reason: FinishReason::Stop,
        })
    }

    /// Make the next call fail as if the transport had failed
    pub fn with_error(self, message: &str) -> Self {
        self.push(ScriptedReply::Failure(message.to_string()))
    }

    /// Number of calls made so far
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl OpenAIClientTrait for FakeOpenAIClient {
    #[allow(deprecated)]
    async fn chat_completion(
        &self,
        model: String,
        temperature: f32,
        messages: Vec<ChatCompletionRequestMessage>,
    ) -> Result<CreateChatCompletionResponse, anyhow::Error> {
        self.requests.lock().unwrap().push(ModelRequest {
            model_name: model.clone(),
            temperature,
            messages,
        });

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                ScriptedReply::Completion {
                    content: Some("Fake default response".to_string()),
                    finish_reason: FinishReason::Stop,
                }
            } else {
                replies.remove(0)
            }
        };

        let (content, finish_reason) = match reply {
            ScriptedReply::Completion {
                content,
                finish_reason,
            } => (content, finish_reason),
            ScriptedReply::Failure(message) => {
                return Err(anyhow::anyhow!(message));
            }
        };

        let message = ChatCompletionResponseMessage {
            role: Role::Assistant,
            content,
            #[allow(deprecated)]
            function_call: None,
            tool_calls: None,
            #[allow(deprecated)]
            refusal: None,
            audio: None,
        };

        let chat_choice = ChatChoice {
            index: 0,
            message,
            finish_reason: Some(finish_reason),
            logprobs: None,
        };

        let usage = CompletionUsage {
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            prompt_tokens_details: None,
            completion_tokens_details: None,
        };

        Ok(CreateChatCompletionResponse {
            id: "fake_id".to_string(),
            object: "chat.completion".to_string(),
            created: 0,
            model: model.clone(),
            system_fingerprint: Some("fake-fingerprint".to_string()),
            service_tier: None,
            choices: vec![chat_choice],
            usage: Some(usage),
        })
    }
}
