//! Heuristic format detection for uploaded nuclear-data files.
//!
//! Uploads arrive as bare text with an arbitrary filename; before anything
//! can be parsed the engine needs to know whether it is looking at an ACE
//! compact table or an ENDF-6 evaluated-data file. This crate answers that
//! question from content alone, with a fixed extension table as the
//! tiebreaker.
//!
//! Detection is advisory: the authoritative parser may still reject the
//! guess, and callers are expected to let the user override the kind. A
//! file that stays [`SourceKind::Unknown`] must never be parsed.
//!
//! [`classify`] is a pure function — identical input always yields the
//! identical kind, and no I/O happens here.

use tracing::debug;

mod ace;
mod endf;
mod kind;

pub use crate::ace::AceEvidence;
pub use crate::endf::EndfEvidence;
pub use crate::kind::{kind_from_extension, SourceKind};

/// Everything the detector learned about one upload.
///
/// Exposed so a UI can explain *why* a file came back ambiguous instead of
/// just shrugging at the user.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DetectReport {
    pub ace: AceEvidence,
    pub endf: EndfEvidence,
    /// The kind the resolution policy settled on.
    pub resolved: SourceKind,
    /// True when the content heuristics disagreed (or both stayed silent)
    /// and the extension table decided.
    pub via_extension: bool,
}

/// Classify raw file content into a source kind.
///
/// Resolution policy: if exactly one content heuristic matches, that kind
/// wins. If both or neither match, fall back to the extension table. If
/// the extension is unknown too, the file stays [`SourceKind::Unknown`]
/// and the caller must prompt for an explicit kind.
pub fn classify(name: &str, content: &str) -> SourceKind {
    classify_report(name, content).resolved
}

/// Like [`classify`], but returns the full evidence report.
pub fn classify_report(name: &str, content: &str) -> DetectReport {
    let ace = ace::probe(content);
    let endf = endf::probe(content);

    let (resolved, via_extension) = match (ace.matched(), endf.matched()) {
        (true, false) => (SourceKind::Ace, false),
        (false, true) => (SourceKind::Endf, false),
        _ => (kind_from_extension(name), true),
    };

    debug!(
        file = name,
        resolved = %resolved,
        via_extension,
        ace_tokens = ace.sci_tokens,
        endf_matched = endf.matched,
        "format_detected"
    );

    DetectReport {
        ace,
        endf,
        resolved,
        via_extension,
    }
}
