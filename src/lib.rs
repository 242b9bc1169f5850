pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod retry;
pub mod client;
pub mod documents;
pub mod chat;
pub mod offer;
pub mod csv_viewer;

/*

chatdesk: three small tools over one chat-completion client.

  chat      free-form prompt, optional system prompt and .txt/.pdf context
  evaluate  business offer scored on a fixed rubric, sent as a prompt
  csv       fixed list of ten legacy-encoded CSV files shown as tables

chatdesk/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Re-exports
│   ├── main.rs         # clap binary
│   ├── error.rs        # Error enum
│   ├── config.rs       # AppConfig, env + JSON file
│   ├── request.rs      # Message, CompletionRequest, CompletionResult
│   ├── retry.rs        # RetryPolicy
│   ├── client.rs       # CompletionRequester (retry loop)
│   ├── providers/
│   │   ├── mod.rs
│   │   └── groq.rs     # ChatTransport + Groq HTTP client
│   ├── documents.rs    # .txt / .pdf decoding
│   ├── chat.rs
│   ├── offer.rs
│   └── csv_viewer.rs
└── tests/

*/

pub use client::CompletionRequester;
pub use error::Error;
pub use providers::{ChatTransport, GroqClient};
pub use request::{
  CompletionRequest
, CompletionResult
, Message
, RequestOptions
, Role
};
pub use retry::RetryPolicy;
