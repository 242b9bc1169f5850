//! Single-shot chat with optional system prompt and file context

use log::debug;
use crate::request::{CompletionResult, Message, RequestOptions};

pub const EMPTY_INPUT_WARNING: &str
  = "Please enter a prompt or upload a file.";

/// Everything the chat form collects
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatInput
{   /// Optional; omitted from the request when blank
    pub system_prompt: String
  , pub prompt: String
  , /// Decoded text of the uploaded file, empty if none
    pub file_content: String
}

impl ChatInput
{   pub fn is_empty(&self) -> bool
    {   self.prompt.is_empty() && self.file_content.is_empty()
    }

    /// File content followed by the prompt on its own line
    pub fn combined_prompt(&self) -> String
    {   format!("{}\n{}", self.file_content, self.prompt)
    }

    pub fn build_messages(&self)
      -> Result<Vec<Message>, crate::error::Error>
    {   if self.is_empty()
        {   return Err(crate::error::Error::InvalidRequest(
              EMPTY_INPUT_WARNING.to_string()
            ));
        }
        let mut messages = Vec::with_capacity(2);
        if !self.system_prompt.is_empty()
        {   messages.push(Message::system(self.system_prompt.clone()));
        }
        messages.push(Message::user(self.combined_prompt()));
        debug!("Built {} chat message(s)", messages.len());
        Ok(messages)
    }
}

/// Build the conversation and send it through the requester
pub async fn run_chat<T: crate::providers::ChatTransport>(
  requester: &crate::client::CompletionRequester<T>
, input: &ChatInput
, options: &RequestOptions
) -> Result<CompletionResult, crate::error::Error>
{   let messages = input.build_messages()?;
    Ok(requester.request_with(messages, options).await)
}
