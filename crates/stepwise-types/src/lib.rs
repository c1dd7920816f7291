//! Shared domain types for Stepwise.
//!
//! This crate contains the domain types used across the Stepwise workspace:
//! workflows and their validation rules, run state, execution events, LLM
//! request/response shapes and configuration.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod event;
pub mod llm;
pub mod run;
pub mod workflow;
