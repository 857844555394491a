use crate::llm::client::{Completion, CompletionOptions, LLMClient, LLMStream, Message, Role};
use crate::types::{AppError, Result, TokenUsage};
use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use futures::StreamExt;
use std::time::Duration;

pub struct OpenAIClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIClient {
    pub fn new(api_key: String, api_base: String, model: String) -> Self {
        Self {
            client: openai_client(api_key, api_base),
            model,
        }
    }

    fn build_request(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
        stream: bool,
    ) -> Result<CreateChatCompletionRequest> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(messages)
            .temperature(options.temperature)
            .max_tokens(options.max_tokens);

        if stream {
            builder.stream(true);
        }

        builder
            .build()
            .map_err(|e| AppError::LLM(format!("Failed to build request: {}", e)))
    }
}

/// Shared client configuration for chat and embeddings.
pub fn openai_config(api_key: String, api_base: String) -> OpenAIConfig {
    OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(api_base)
}

/// Client with async-openai's own 429 backoff switched off. Rate limits
/// surface as [`AppError::RateLimited`] on the first response.
pub fn openai_client(api_key: String, api_base: String) -> Client<OpenAIConfig> {
    Client::with_config(openai_config(api_key, api_base)).with_backoff(no_backoff())
}

fn no_backoff() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

fn to_request_message(message: &Message) -> Result<ChatCompletionRequestMessage> {
    let content = message.content.clone();
    let built = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()
            .map(Into::into),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()
            .map(Into::into),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()
            .map(Into::into),
    };

    built.map_err(|e| AppError::LLM(format!("Failed to build message: {}", e)))
}

/// Maps an API error, keeping rate limiting distinguishable so callers can
/// back off.
pub fn map_openai_error(err: OpenAIError) -> AppError {
    match err {
        OpenAIError::ApiError(api_err) => {
            if is_rate_limit(
                &api_err.message,
                api_err.r#type.as_deref(),
                api_err.code.as_deref(),
            ) {
                AppError::RateLimited(api_err.message)
            } else {
                AppError::LLM(format!("OpenAI API error: {}", api_err.message))
            }
        }
        other => AppError::LLM(format!("OpenAI API error: {}", other)),
    }
}

fn is_rate_limit(message: &str, kind: Option<&str>, code: Option<&str>) -> bool {
    message.to_lowercase().contains("rate limit")
        || kind.is_some_and(|t| t.contains("rate_limit") || t == "requests")
        || code.is_some_and(|c| c.contains("rate_limit"))
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Completion> {
        let request = self.build_request(messages, options, false)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| AppError::LLM("No response from OpenAI".to_string()))?;

        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(Completion { content, usage })
    }

    async fn stream(&self, messages: &[Message], options: &CompletionOptions) -> Result<LLMStream> {
        let request = self.build_request(messages, options, true)?;

        let mut stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(map_openai_error)?;

        let result_stream = async_stream::stream! {
            while let Some(result) = stream.next().await {
                match result {
                    Ok(response) => {
                        for choice in response.choices {
                            if let Some(content) = choice.delta.content {
                                if !content.is_empty() {
                                    yield Ok(content);
                                }
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(AppError::LLM(format!("Stream error: {}", e)));
                    }
                }
            }
        };

        Ok(Box::pin(result_stream))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
