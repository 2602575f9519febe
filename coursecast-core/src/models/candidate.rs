//! Candidate delivery sources
//!
//! The ranked list of delivery paths a session may try for one piece of
//! content. Produced once per session by the resolver; consumed lazily —
//! only the current candidate is ever materialized into a credential.

use serde::{Deserialize, Serialize};

use super::SourceKind;
use crate::{Error, Result};

/// One ranked delivery path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSource {
    pub source_kind: SourceKind,
    /// The identifier the issuer passes to the matching delivery service:
    /// the stream id for `Stream`, the object CID for `Gateway`.
    pub resolver_hint: String,
}

impl CandidateSource {
    #[must_use]
    pub fn new(source_kind: SourceKind, resolver_hint: impl Into<String>) -> Self {
        Self {
            source_kind,
            resolver_hint: resolver_hint.into(),
        }
    }
}

/// Ordered, non-empty sequence of candidates with a cursor.
#[derive(Debug, Clone)]
pub struct CandidateSourceList {
    candidates: Vec<CandidateSource>,
    cursor: usize,
}

impl CandidateSourceList {
    /// Build a list; empty input is a programming error upstream and is
    /// rejected so downstream code never has to handle "no candidate".
    pub fn new(candidates: Vec<CandidateSource>) -> Result<Self> {
        if candidates.is_empty() {
            return Err(Error::Internal(
                "candidate source list must not be empty".to_string(),
            ));
        }
        Ok(Self {
            candidates,
            cursor: 0,
        })
    }

    /// The candidate the session is currently playing from.
    #[must_use]
    pub fn current(&self) -> &CandidateSource {
        &self.candidates[self.cursor.min(self.candidates.len() - 1)]
    }

    /// Move to the next candidate after a playback failure.
    /// Returns `None` once every path is exhausted.
    pub fn advance(&mut self) -> Option<&CandidateSource> {
        if self.cursor + 1 < self.candidates.len() {
            self.cursor += 1;
            Some(&self.candidates[self.cursor])
        } else {
            self.cursor = self.candidates.len();
            None
        }
    }

    /// Rewind to the first candidate (manual retry restarts setup).
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        // Construction forbids empty lists; kept for API completeness.
        self.candidates.is_empty()
    }

    #[must_use]
    pub fn kinds(&self) -> Vec<SourceKind> {
        self.candidates.iter().map(|c| c.source_kind).collect()
    }
}
