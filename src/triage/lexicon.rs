//! The critical-phrase lexicon.
//!
//! This is the only list of self-harm and suicide-risk phrases in the crate; nothing else
//! should inline its own copy.

/// Phrases that always escalate to the emergency prompt, lower-case.
pub static CRITICAL_PHRASES: &[&str] = &[
    "suicide",
    "suicidal",
    "kill myself",
    "killing myself",
    "end my life",
    "ending my life",
    "end it all",
    "self harm",
    "self-harm",
    "selfharm",
    "hurt myself",
    "harm myself",
    "want to die",
    "wanna die",
    "better off dead",
    "no reason to live",
    "take my own life",
    "overdose",
];

/// Returns the first lexicon phrase contained in `text`, ignoring case.
pub fn find_critical_phrase(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();

    CRITICAL_PHRASES.iter().copied().find(|phrase| lowered.contains(phrase))
}

/// Whether `text` contains any lexicon phrase, ignoring case.
pub fn contains_critical_phrase(text: &str) -> bool {
    find_critical_phrase(text).is_some()
}

// Tests.
