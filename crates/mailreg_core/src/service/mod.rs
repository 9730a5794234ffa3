//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep delivery and API layers decoupled from storage details.

pub mod subscriber_service;
