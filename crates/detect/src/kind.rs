use serde::{Deserialize, Serialize};
use std::fmt;

/// The typed source kinds a raw upload can resolve to.
///
/// `Unknown` means neither content heuristic nor the extension table could
/// decide; callers must obtain an explicit kind from the user before the
/// file can be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// ACE continuous-energy compact table (ZAID-headed, e.g. `1001.02c`).
    Ace,
    /// ENDF-6 columnar evaluated data (80-column records with MAT/MF/MT
    /// control fields in the trailing columns).
    Endf,
    /// Could not be determined.
    Unknown,
}

impl SourceKind {
    pub fn is_known(self) -> bool {
        self != SourceKind::Unknown
    }

    /// Short lowercase tag used in signatures and persisted summaries.
    pub fn tag(self) -> &'static str {
        match self {
            SourceKind::Ace => "ace",
            SourceKind::Endf => "endf",
            SourceKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Fixed extension fallback used when the content heuristics disagree or
/// both stay silent.
///
/// ACE library files are conventionally named after their ZAID suffix
/// (`1001.02c`, `92235.03c`), so a two-digit-plus-letter extension maps to
/// ACE as well.
pub fn kind_from_extension(name: &str) -> SourceKind {
    let ext = match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => return SourceKind::Unknown,
    };

    match ext.as_str() {
        "ace" => SourceKind::Ace,
        "endf" | "endf6" | "tape" => SourceKind::Endf,
        _ => {
            let bytes = ext.as_bytes();
            if bytes.len() == 3
                && bytes[0].is_ascii_digit()
                && bytes[1].is_ascii_digit()
                && bytes[2].is_ascii_alphabetic()
            {
                SourceKind::Ace
            } else {
                SourceKind::Unknown
            }
        }
    }
}
