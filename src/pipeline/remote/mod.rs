//! Remote AI-assisted extraction boundary.
//!
//! The orchestrator hands a filtered view of the normalized text to an
//! external text-completion collaborator and parses its JSON reply
//! leniently. Everything that can go wrong here surfaces as a
//! [`RemoteError`] the orchestrator recovers from; none of it reaches the
//! pipeline caller.

pub mod ollama;
pub mod prompt;
pub mod response;

use thiserror::Error;

use super::parse::ParsedDocument;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("cannot reach extraction service at {0}")]
    Connection(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Remote extraction seam: normalized, filtered prescription text in,
/// structured records out.
pub trait RemoteExtractor {
    fn extract(&self, filtered_text: &str) -> Result<ParsedDocument, RemoteError>;
}

/// Test extractor with a canned outcome and a call counter.
pub struct MockRemoteExtractor {
    response: std::result::Result<String, String>,
    calls: std::cell::RefCell<usize>,
}

impl MockRemoteExtractor {
    /// Succeeds with the given raw completion text.
    pub fn replying(raw_completion: &str) -> Self {
        Self {
            response: Ok(raw_completion.to_string()),
            calls: std::cell::RefCell::new(0),
        }
    }

    /// Fails every call with a connection error.
    pub fn failing(reason: &str) -> Self {
        Self {
            response: Err(reason.to_string()),
            calls: std::cell::RefCell::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.borrow()
    }
}

impl RemoteExtractor for MockRemoteExtractor {
    fn extract(&self, _filtered_text: &str) -> Result<ParsedDocument, RemoteError> {
        *self.calls.borrow_mut() += 1;
        match &self.response {
            Ok(raw) => response::parse_completion(raw),
            Err(reason) => Err(RemoteError::Connection(reason.clone())),
        }
    }
}
