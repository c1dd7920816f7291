//! Infrastructure layer for Stepwise.
//!
//! Contains the implementations that touch the outside world: the Unbound
//! HTTP model client, the `config.toml` loader, and completion webhooks.
//! The engine itself lives in `stepwise-core` and never depends on this
//! crate.

pub mod config;
pub mod llm;
pub mod webhook;
