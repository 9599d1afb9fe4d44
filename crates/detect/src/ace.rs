//! ACE "compact table" heuristic.
//!
//! An ACE continuous-energy table opens with a header line whose first
//! token is the ZAID (`1001.02c`): `za = z * 1000 + a` where `z` is the
//! element number and `a` the mass number. The body is dense with
//! scientific-notation values, so the heuristic additionally requires a
//! minimum count of such tokens near the top of the file.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Lines scanned for scientific-notation tokens.
const SCAN_LINES: usize = 30;
/// Minimum scientific-notation tokens required across the scanned lines.
const MIN_SCI_TOKENS: usize = 5;

const Z_RANGE: std::ops::RangeInclusive<u32> = 1..=118;
const A_RANGE: std::ops::RangeInclusive<u32> = 0..=400;

static SCI_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\d\.\d+e[+-]?\d+").expect("valid sci-notation regex"));

/// Evidence gathered while probing content for the ACE layout.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AceEvidence {
    /// First token of the first non-empty line, if any.
    pub identifier: Option<String>,
    /// Whether that token decomposed into an in-range ZAID.
    pub zaid_valid: bool,
    /// Scientific-notation tokens counted over the scanned lines.
    pub sci_tokens: usize,
}

impl AceEvidence {
    pub fn matched(&self) -> bool {
        self.zaid_valid && self.sci_tokens >= MIN_SCI_TOKENS
    }
}

pub(crate) fn probe(content: &str) -> AceEvidence {
    let mut evidence = AceEvidence::default();

    let Some(first_line) = content.lines().find(|l| !l.trim().is_empty()) else {
        return evidence;
    };
    if let Some(token) = first_line.split_whitespace().next() {
        evidence.identifier = Some(token.to_string());
        evidence.zaid_valid = zaid_in_range(token);
    }

    evidence.sci_tokens = content
        .lines()
        .filter(|l| !is_separator(l))
        .take(SCAN_LINES)
        .map(|l| SCI_TOKEN.find_iter(l).count())
        .sum();

    evidence
}

/// A ZAID token looks like `1001.02c`: an integer `za` before the dot with
/// `z` and `a` sub-fields inside the physical ranges.
fn zaid_in_range(token: &str) -> bool {
    let Some((za, _suffix)) = token.split_once('.') else {
        return false;
    };
    let Ok(za) = za.parse::<u32>() else {
        return false;
    };
    let z = za / 1000;
    let a = za % 1000;
    Z_RANGE.contains(&z) && A_RANGE.contains(&a)
}

/// Blank lines and ruled dividers don't count toward the scan window.
fn is_separator(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.chars().all(|c| matches!(c, '-' | '=' | '*'))
}
