//! Request and result types shared by every tool

use serde::{Deserialize, Serialize};

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role
{   System
  , User
}

/// A single role-tagged chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message
{   pub role: Role
  , pub content: String
}

impl Message
{   pub fn system(content: impl Into<String>) -> Self
    {   Message
        {   role: Role::System
          , content: content.into()
        }
    }

    pub fn user(content: impl Into<String>) -> Self
    {   Message
        {   role: Role::User
          , content: content.into()
        }
    }
}

/// A validated chat-completion request
///
/// Messages are non-empty and a system message, if any, is first.
/// Temperature is carried as given; range checks are left to the
/// remote API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest
{   messages: Vec<Message>
  , model: String
  , #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>
}

impl CompletionRequest
{   pub fn new(
      messages: Vec<Message>
    , model: impl Into<String>
    , temperature: Option<f32>
    ) -> Result<Self, crate::error::Error>
    {   if messages.is_empty()
        {   return Err(crate::error::Error::InvalidRequest(
              "messages must not be empty".to_string()
            ));
        }
        let misplaced_system = messages
          .iter()
          .skip(1)
          .any(|m| m.role == Role::System);
        if misplaced_system
        {   return Err(crate::error::Error::InvalidRequest(
              "system message must come first".to_string()
            ));
        }
        let model = model.into();
        if model.trim().is_empty()
        {   return Err(crate::error::Error::InvalidRequest(
              "model must not be empty".to_string()
            ));
        }
        Ok(CompletionRequest
        {   messages
          , model
          , temperature
        })
    }

    pub fn messages(&self) -> &[Message]
    {   &self.messages
    }

    pub fn model(&self) -> &str
    {   &self.model
    }

    pub fn temperature(&self) -> Option<f32>
    {   self.temperature
    }
}

/// Outcome of a retried completion call
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionResult
{   Success
    {   text: String
    }
  , Failure
    {   attempts: usize
      , last_cause: crate::error::Error
    }
}

impl CompletionResult
{   /// Reply text, or an empty string on failure
    pub fn text(&self) -> &str
    {   match self
        {   CompletionResult::Success { text } => text
          , CompletionResult::Failure { .. } => ""
        }
    }

    pub fn is_success(&self) -> bool
    {   matches!(self, CompletionResult::Success { .. })
    }

    /// Non-empty reply text; a blank success counts as no response
    pub fn reply(&self) -> Option<&str>
    {   match self
        {   CompletionResult::Success { text } if !text.is_empty() => {
              Some(text)
            }
          , _ => None
        }
    }

    /// Human-readable failure line, `None` on success
    pub fn failure_message(&self) -> Option<String>
    {   match self
        {   CompletionResult::Success { .. } => None
          , CompletionResult::Failure { attempts, last_cause } => {
              let noun = if *attempts == 1 { "attempt" } else { "attempts" };
              Some(format!(
                "Request failed after {} {}: {}",
                attempts, noun, last_cause
              ))
            }
        }
    }
}

/// Per-request settings passed explicitly by each tool
#[derive(Debug, Clone)]
pub struct RequestOptions
{   pub model: String
  , pub temperature: Option<f32>
  , /// Overrides the requester's own policy when set
    pub retry: Option<crate::retry::RetryPolicy>
}

impl RequestOptions
{   pub fn new(model: impl Into<String>) -> Self
    {   RequestOptions
        {   model: model.into()
          , temperature: None
          , retry: None
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self
    {   self.temperature = temperature;
        self
    }

    pub fn with_retry(mut self, retry: crate::retry::RetryPolicy) -> Self
    {   self.retry = Some(retry);
        self
    }
}
