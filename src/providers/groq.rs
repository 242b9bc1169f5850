use std::time::Duration;
use serde::{Deserialize, Serialize};
use log::{debug, trace, error};

// ===== Wire Types =====

/// Body of `POST /chat/completions`
///
/// `temperature` is left out entirely when unset so the server
/// applies its own default.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequestBody<'a>
{   pub model: &'a str
  , pub messages: &'a [crate::request::Message]
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>
}

impl<'a> From<&'a crate::request::CompletionRequest> for ChatRequestBody<'a>
{   fn from(request: &'a crate::request::CompletionRequest) -> Self
    {   ChatRequestBody
        {   model: request.model()
          , messages: request.messages()
          , temperature: request.temperature()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse
{   pub choices: Vec<Choice>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice
{   pub message: ChoiceMessage
  , #[serde(default)]
    pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage
{   #[serde(default)]
    pub content: Option<String>
}

impl ChatResponse
{   /// Content of the first choice
    pub fn first_content(&self) -> Result<&str, crate::error::Error>
    {   self.choices.first()
          .map(|c| c.message.content.as_deref().unwrap_or(""))
          .ok_or_else(|| {
            error!("No choices in response");
            crate::error::Error::NoChoicesInResponse
          })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsResponse
{   pub data: Vec<ModelData>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelData
{   pub id: String
  , #[serde(default)]
    pub owned_by: Option<String>
}

// ===== Transport Seam =====

/// One remote chat-completion call, no retries
#[allow(async_fn_in_trait)]
pub trait ChatTransport
{   async fn complete(
      &self
    , request: &crate::request::CompletionRequest
    ) -> Result<ChatResponse, crate::error::Error>;
}

// ===== Groq Client =====

/// Groq OpenAI-compatible API client
pub struct GroqClient
{   api_key: String
  , api_base: String
  , http_client: reqwest::Client
}

impl GroqClient
{   pub fn new(
      api_key: String
    , api_base: impl Into<String>
    , timeout: Duration
    ) -> Result<Self, crate::error::Error>
    {   debug!("Creating GroqClient");
        let http_client = reqwest::Client::builder()
          .timeout(timeout)
          .build()
          .map_err(|e| {
            error!("Failed to build HTTP client: {}", e);
            crate::error::Error::InvalidConfiguration(e.to_string())
          })?;
        let api_base: String = api_base.into();
        let api_base = api_base
          .trim_end_matches('/')
          .to_string();
        Ok(GroqClient
        {   api_key
          , api_base
          , http_client
        })
    }

    pub fn from_config(
      api_key: String
    , config: &crate::config::AppConfig
    ) -> Result<Self, crate::error::Error>
    {   GroqClient::new(
          api_key
        , config.api_base.clone()
        , Duration::from_secs(config.timeout_secs)
        )
    }

    /// List model ids available to this key
    pub async fn list_models(
      &self
    ) -> Result<Vec<String>, crate::error::Error>
    {   debug!("Handling list_models");

        let response = self.http_client
          .get(format!("{}/models", self.api_base))
          .bearer_auth(&self.api_key)
          .send()
          .await
          .map_err(|e| {
            error!("Failed to fetch models: {}", e);
            crate::error::Error::from(e)
          })?;

        let response = check_status(response).await?;

        let models_response: ModelsResponse
          = response.json().await.map_err(|e| {
            error!("Parse error: {}", e);
            crate::error::Error::ParseError(e.to_string())
          })?;

        let model_names: Vec<String>
          = models_response.data
            .into_iter()
            .map(|m| m.id)
            .collect();

        debug!("Retrieved {} models", model_names.len());
        Ok(model_names)
    }
}

impl ChatTransport for GroqClient
{   async fn complete(
      &self
    , request: &crate::request::CompletionRequest
    ) -> Result<ChatResponse, crate::error::Error>
    {   debug!("Sending chat completion for: {}", request.model());

        let body = ChatRequestBody::from(request);
        trace!("Groq request: {:?}", body);

        let response = self.http_client
          .post(format!("{}/chat/completions", self.api_base))
          .bearer_auth(&self.api_key)
          .json(&body)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            crate::error::Error::from(e)
          })?;

        let response = check_status(response).await?;

        response.json::<ChatResponse>().await.map_err(|e| {
          error!("Parse error: {}", e);
          crate::error::Error::ParseError(e.to_string())
        })
    }
}

async fn check_status(
  response: reqwest::Response
) -> Result<reqwest::Response, crate::error::Error>
{   let status = response.status();
    trace!("Groq response status: {}", status);

    if status.is_success()
    {   return Ok(response);
    }

    let body = response.text().await
      .unwrap_or_else(|_|
        "Unknown error".to_string()
      );
    error!("Groq API error {}: {}", status, body);
    Err(crate::error::Error::ApiError
    {   status: status.as_u16()
      , body
    })
}
