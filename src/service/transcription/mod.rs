//! Speech-to-text for voice messages.

pub mod openai;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::Res;

// Types.

/// A recorded voice message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    /// File name, including an extension the provider can infer the format from.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

// Traits.

/// Generic transcription client trait that clients must implement.
#[async_trait]
pub trait GenericTranscriptionClient: Send + Sync + 'static {
    /// Transcribe a voice message to text.
    ///
    /// An empty transcript is an error.
    async fn transcribe(&self, clip: &AudioClip) -> Res<String>;
}

// Structs.

/// Transcription client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct TranscriptionClient {
    inner: Arc<dyn GenericTranscriptionClient>,
}

impl Deref for TranscriptionClient {
    type Target = dyn GenericTranscriptionClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl TranscriptionClient {
    pub fn new(inner: Arc<dyn GenericTranscriptionClient>) -> Self {
        Self { inner }
    }
}
