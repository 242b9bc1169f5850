//! LLM provider implementations

pub mod groq;

// Re-export for convenience
pub use groq::{ChatTransport, GroqClient};
