//! Gemini API client and wire types.

mod client;
mod types;

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;

pub use client::GeminiClient;
pub use types::*;
