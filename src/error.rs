use std::fmt;

/// Custom error type for chatdesk operations
/// Implements Clone so a failed attempt's cause can be kept
/// inside a `CompletionResult`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// API key environment variable is missing or empty
    MissingApiKey(String)
  , /// HTTP transport error (connect, timeout, body read)
    HttpError(String)
  , /// API returned a non-success status
    ApiError
    {   status: u16
      , body: String
    }
  , /// Failed to parse API response
    ParseError(String)
  , /// No choices in API response
    NoChoicesInResponse
  , /// Request rejected before sending (empty messages, etc.)
    InvalidRequest(String)
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// Uploaded document could not be read or decoded
    Document(String)
  , /// CSV file could not be read or parsed
    Csv(String)
  , /// Timeout error
    Timeout
  , /// Generic error
    Other(String)
}

impl Error
{   /// Whether another attempt could plausibly succeed.
    ///
    /// Only consulted when a `RetryPolicy` opts into
    /// `stop_on_permanent`; the default policy retries everything.
    pub fn is_retryable(&self) -> bool
    {   match self
        {   Error::ApiError { status, .. } => {
              *status == 408 || *status == 429 || *status >= 500
            }
          , Error::MissingApiKey(_)
          | Error::InvalidRequest(_)
          | Error::InvalidConfiguration(_)
          | Error::Document(_)
          | Error::Csv(_) => false
          , Error::HttpError(_)
          | Error::ParseError(_)
          | Error::NoChoicesInResponse
          | Error::Timeout
          | Error::Other(_) => true
        }
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::MissingApiKey(var) => {
              write!(f,
                "Missing API key: set the {} environment variable",
                var
              )
            }
          , Error::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::ApiError { status, body } => {
              write!(f, "API error ({}): {}", status, body)
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::NoChoicesInResponse => {
              write!(f, "API response contained no choices")
            }
          , Error::InvalidRequest(msg) => {
              write!(f, "Invalid request: {}", msg)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::Document(msg) => {
              write!(f, "Document error: {}", msg)
            }
          , Error::Csv(msg) => {
              write!(f, "CSV error: {}", msg)
            }
          , Error::Timeout => {
              write!(f, "Request timed out")
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}

impl From<reqwest::Error> for Error
{   fn from(e: reqwest::Error) -> Self
    {   if e.is_timeout()
        {   Error::Timeout
        } else if e.is_decode()
        {   Error::ParseError(e.to_string())
        } else
        {   Error::HttpError(e.to_string())
        }
    }
}

impl From<csv::Error> for Error
{   fn from(e: csv::Error) -> Self
    {   Error::Csv(e.to_string())
    }
}
