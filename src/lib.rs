pub mod config;
pub mod decode;
pub mod error;
pub mod fetch;
pub mod matcher;
pub mod server;
pub mod state;

// Re-export vision types for convenience
pub use snapmatch_vision::{clip, Embedding, Encoder};
