//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate units of work and repositories into use-case level APIs.
//! - Keep the CLI decoupled from storage details.

pub mod user_service;
