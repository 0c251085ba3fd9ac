//! Service integrations for external APIs and clients.
//!
//! This module contains implementations for the collaborators of the triage engine:
//! - Chat surfaces (e.g., the console)
//! - Emergency contact dispatch (e.g., log, webhook)
//! - LLM services (e.g., OpenAI) for classification and replies
//! - Speech-to-text (e.g., OpenAI Whisper)
//!
//! Each service module defines both generic traits and concrete implementations,
//! allowing for extensibility and easy testing.

pub mod chat;
pub mod dispatch;
pub mod llm;
pub mod transcription;
