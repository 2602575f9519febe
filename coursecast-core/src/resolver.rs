//! Playback source resolution
//!
//! Pure, synchronous ranking of delivery paths for a content reference.
//! No I/O: the resolver only inspects identifiers already present on the
//! reference.

use crate::models::{CandidateSource, CandidateSourceList, ContentReference, PreferredPath, SourceKind};
use crate::{Error, Result};

pub struct SourceResolver;

impl SourceResolver {
    /// Rank the delivery paths for `reference`.
    ///
    /// Policy: an explicit stream preference puts the stream first when a
    /// stream id exists; every other case is gateway-first, with the other
    /// path appended as fallback when its identifier is present. Never
    /// returns an empty list; a reference with no resolvable identifier is
    /// a configuration error.
    pub fn resolve(reference: &ContentReference) -> Result<CandidateSourceList> {
        let stream = reference
            .stream_id
            .as_ref()
            .map(|id| CandidateSource::new(SourceKind::Stream, id.clone()));
        let gateway = reference
            .object_cid
            .as_ref()
            .map(|cid| CandidateSource::new(SourceKind::Gateway, cid.clone()));

        let candidates: Vec<CandidateSource> = match (reference.preferred_path, stream, gateway) {
            (PreferredPath::Stream, Some(stream), gateway) => {
                std::iter::once(stream).chain(gateway).collect()
            }
            (_, stream, Some(gateway)) => std::iter::once(gateway).chain(stream).collect(),
            (_, Some(stream), None) => vec![stream],
            (_, None, None) => {
                return Err(Error::Configuration(format!(
                    "content {} has neither a stream id nor an object CID",
                    reference.content_id
                )));
            }
        };

        tracing::debug!(
            content_id = %reference.content_id,
            candidates = ?candidates.iter().map(|c| c.source_kind).collect::<Vec<_>>(),
            "Resolved delivery candidates"
        );

        CandidateSourceList::new(candidates)
    }
}
