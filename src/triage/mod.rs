//! Support-level triage and escalation.
//!
//! - `lexicon`: the critical-phrase list.
//! - `engine`: the pure decision function.
//! - `display`: the caller-owned prompt state and its transition rules.

pub mod display;
pub mod engine;
pub mod lexicon;
