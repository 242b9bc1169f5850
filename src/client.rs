use log::{debug, warn, error, info};
use crate::providers::ChatTransport;
use crate::request::{CompletionRequest, CompletionResult, Message};
use crate::retry::RetryPolicy;

/// Runs one chat completion with a bounded retry loop
///
/// Generic over the transport so the same loop drives the live
/// Groq client and scripted test doubles.
pub struct CompletionRequester<T>
{   transport: T
  , policy: RetryPolicy
}

impl<T: ChatTransport> CompletionRequester<T>
{   pub fn new(transport: T) -> Self
    {   CompletionRequester
        {   transport
          , policy: RetryPolicy::default()
        }
    }

    pub fn with_policy(transport: T, policy: RetryPolicy) -> Self
    {   CompletionRequester
        {   transport
          , policy
        }
    }

    pub fn transport(&self) -> &T
    {   &self.transport
    }

    /// Send `request`, retrying per the policy.
    ///
    /// Returns the trimmed first-choice text, or a failure carrying
    /// the number of attempts made and the last error seen.
    pub async fn request(
      &self
    , request: &CompletionRequest
    ) -> CompletionResult
    {   self.request_under(request, &self.policy).await
    }

    /// Same as `request`, under a caller-supplied policy
    pub async fn request_under(
      &self
    , request: &CompletionRequest
    , policy: &RetryPolicy
    ) -> CompletionResult
    {   let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 0;

        loop
        {   attempt += 1;
            debug!(
              "Completion attempt {}/{} for model: {}",
              attempt, max_attempts, request.model()
            );

            let outcome = match self.transport.complete(request).await
            {   Ok(response) => response
                  .first_content()
                  .map(|text| text.trim().to_string())
              , Err(e) => Err(e)
            };

            let cause = match outcome
            {   Ok(text) => {
                  info!("Completion succeeded on attempt {}", attempt);
                  return CompletionResult::Success { text };
                }
              , Err(cause) => cause
            };

            warn!("Attempt {} failed: {}", attempt, cause);

            if !policy.should_retry(attempt, &cause)
            {   error!(
                  "Giving up after {} attempt(s): {}",
                  attempt, cause
                );
                return CompletionResult::Failure
                {   attempts: attempt
                  , last_cause: cause
                };
            }

            let delay = policy.backoff_for_attempt(attempt);
            if !delay.is_zero()
            {   debug!("Sleeping {:?} before retry", delay);
                tokio::time::sleep(delay).await;
            }
        }
    }

    /// Validate and send in one step
    ///
    /// Uses `options.retry` when set, otherwise the requester's policy.
    /// Invalid input fails without contacting the remote API and
    /// reports zero attempts.
    pub async fn request_with(
      &self
    , messages: Vec<Message>
    , options: &crate::request::RequestOptions
    ) -> CompletionResult
    {   match CompletionRequest::new(
          messages
        , options.model.clone()
        , options.temperature
        )
        {   Ok(request) => {
              let policy = options.retry.as_ref()
                .unwrap_or(&self.policy);
              self.request_under(&request, policy).await
            }
          , Err(e) => {
              error!("Rejected request: {}", e);
              CompletionResult::Failure
              {   attempts: 0
                , last_cause: e
              }
            }
        }
    }
}
