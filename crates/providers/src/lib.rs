//! LLM provider implementations for newsbrief.
//!
//! The only concrete backend is [`OpenAiCompatProvider`], which covers
//! OpenAI, OpenRouter, Ollama, vLLM, and any endpoint speaking the
//! `/v1/chat/completions` dialect.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
