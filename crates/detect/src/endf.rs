//! ENDF "columnar evaluated data" heuristic.
//!
//! ENDF-6 records are 80-column lines whose trailing columns carry the
//! MAT/MF/MT control numbers (plus an optional sequence number). The
//! heuristic counts lines whose last 14 characters form such a
//! small-integer triple/quad and checks the match rate over the lines it
//! inspected.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Lines inspected from the top of the file.
const SCAN_LINES: usize = 100;
/// Width of the trailing control field.
const TRAILING_WIDTH: usize = 14;
/// Absolute match count that lets a file through without a valid leading
/// number field.
const MIN_ABSOLUTE_MATCHES: usize = 10;

/// ENDF-6 number fields use both `1.234567+8` and `1.2e+8` notations.
static ENDF_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d\.\d+(?:[eE][+-]?\d+|[+-]\d+)?$").expect("valid regex"));

/// Evidence gathered while probing content for the ENDF layout.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EndfEvidence {
    /// Lines long enough to carry a trailing control field.
    pub checked: usize,
    /// Lines whose trailing field parsed as MAT/MF/MT[/NS].
    pub matched: usize,
    /// Whether any matched line opened with a structurally valid ENDF
    /// number field.
    pub leading_field_valid: bool,
}

impl EndfEvidence {
    pub fn matched(&self) -> bool {
        if self.checked == 0 || self.matched == 0 {
            return false;
        }
        // Rate of at least one in four checked lines, plus corroboration.
        let rate_ok = self.matched * 4 >= self.checked;
        rate_ok && (self.leading_field_valid || self.matched >= MIN_ABSOLUTE_MATCHES)
    }
}

pub(crate) fn probe(content: &str) -> EndfEvidence {
    let mut evidence = EndfEvidence::default();

    for line in content.lines().take(SCAN_LINES) {
        if !line.is_ascii() || line.len() < TRAILING_WIDTH {
            continue;
        }
        evidence.checked += 1;

        let trailing = &line[line.len() - TRAILING_WIDTH..];
        if !trailing_is_control_field(trailing) {
            continue;
        }
        evidence.matched += 1;

        if !evidence.leading_field_valid {
            let leading_end = line.len().min(11);
            if ENDF_NUMBER.is_match(line[..leading_end].trim()) {
                evidence.leading_field_valid = true;
            }
        }
    }

    evidence
}

/// MAT in 1..=9999, MF in 1..=99, MT in 0..=999, optional NS in 0..=99999.
fn trailing_is_control_field(field: &str) -> bool {
    let tokens: Vec<&str> = field.split_whitespace().collect();
    if tokens.len() != 3 && tokens.len() != 4 {
        return false;
    }
    let parsed: Option<Vec<u32>> = tokens.iter().map(|t| t.parse::<u32>().ok()).collect();
    let Some(values) = parsed else {
        return false;
    };

    let in_range = (1..=9999).contains(&values[0])
        && (1..=99).contains(&values[1])
        && values[2] <= 999;
    match values.get(3) {
        Some(ns) => in_range && *ns <= 99_999,
        None => in_range,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endf_line(mat: u32, mf: u32, mt: u32, ns: u32) -> String {
        format!(
            "{:<66}{:>4}{:>2}{:>3}{:>5}",
            " 1.001000+3 9.991673-1          0          0          0          5",
            mat, mf, mt, ns
        )
    }

    #[test]
    fn trailing_field_parsing() {
        assert!(trailing_is_control_field("9228 4 18    1"));
        assert!(trailing_is_control_field("  9228 4 18  "));
        assert!(trailing_is_control_field("125 3  1 9999"));
        assert!(!trailing_is_control_field("9228 4"));
        assert!(!trailing_is_control_field("0 4 18"));
        assert!(!trailing_is_control_field("9228 4 18 1 2"));
        assert!(!trailing_is_control_field("words here no"));
    }

    #[test]
    fn probe_counts_rate_and_leading_field() {
        let mut content = String::new();
        for i in 0..30 {
            content.push_str(&endf_line(9228, 4, 18, i + 1));
            content.push('\n');
        }
        let evidence = probe(&content);
        assert_eq!(evidence.checked, 30);
        assert_eq!(evidence.matched, 30);
        assert!(evidence.leading_field_valid);
        assert!(evidence.matched());
    }

    #[test]
    fn low_rate_is_rejected() {
        let mut content = String::new();
        for i in 0..4 {
            content.push_str(&endf_line(9228, 4, 18, i + 1));
            content.push('\n');
        }
        for _ in 0..96 {
            content.push_str("this is an ordinary prose line of sufficient length to be checked\n");
        }
        let evidence = probe(&content);
        assert_eq!(evidence.checked, 100);
        assert_eq!(evidence.matched, 4);
        assert!(!evidence.matched());
    }

    #[test]
    fn short_lines_are_not_checked() {
        let evidence = probe("one\ntwo\nthree\n");
        assert_eq!(evidence.checked, 0);
        assert!(!evidence.matched());
    }
}
