//! Core components, types, and utilities for support-triage.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - Directives for the classifier and the supportive assistant.
//! - Classification types, conversation types, and result handling.

pub mod config;
pub mod prompts;
pub mod types;
