//! LLM provider abstractions for Stepwise.
//!
//! - `LlmProvider`: RPITIT trait for concrete provider implementations
//! - `BoxLlmProvider`: Object-safe wrapper for dynamic dispatch
//! - `StubProvider`: offline provider for dry runs

pub mod box_provider;
pub mod provider;
pub mod stub;
