//! Deterministic series fingerprints.
//!
//! A signature encodes *everything* that affects a derived computation's
//! output: the source identity and every selection parameter. Equal
//! signatures are treated as requesting identical derived output, so
//! omitting an output-affecting field here is a correctness bug, not a
//! style issue — the cache would serve wrong data on a false hit.
//!
//! Source identity prefers the server-assigned stable id; without one it
//! falls back to a hash over a bounded prefix of raw content. The fallback
//! tolerates backend-side identifier expiry at the cost of recomputation
//! after expiry.
//!
//! The version prefix follows the same rule as the content hashes: bump
//! [`SIGNATURE_VERSION`] whenever the encoding changes so old and new
//! signatures can never collide.

use library::SourceFile;
use serde::{Deserialize, Serialize};
use service::SeriesParams;
use sha2::{Digest, Sha256};
use std::fmt;

/// Bump when the signature encoding changes.
pub const SIGNATURE_VERSION: u32 = 1;

/// Bytes of raw content hashed for the identity fallback.
const CONTENT_PREFIX_BYTES: usize = 64 * 1024;

/// An opaque deterministic cache key for one series configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the signature for a source/parameter pair.
///
/// Field order is fixed; floats use Rust's shortest-roundtrip formatting
/// so equal values always render equal text.
pub fn compute_signature(source: &SourceFile, params: &SeriesParams) -> Signature {
    let identity = identity_component(source);
    Signature(format!(
        "v{version}|{identity}|{kind}|{quantity}|mt{reaction}|t{temperature}|e{emin}:{emax}|u{unc}|f{factor}",
        version = SIGNATURE_VERSION,
        kind = source.detected_kind,
        quantity = params.quantity,
        reaction = params.reaction,
        temperature = params.temperature_k,
        emin = params.energy_min_ev,
        emax = params.energy_max_ev,
        unc = u8::from(params.include_uncertainty),
        factor = params.uncertainty_factor,
    ))
}

fn identity_component(source: &SourceFile) -> String {
    match source.stable_id() {
        Some(stable) => format!("s:{stable}"),
        None => format!("c:{}", content_prefix_hash(&source.content)),
    }
}

/// SHA-256 over the first [`CONTENT_PREFIX_BYTES`] of content, hex-encoded.
pub fn content_prefix_hash(content: &str) -> String {
    let bytes = content.as_bytes();
    let prefix = &bytes[..bytes.len().min(CONTENT_PREFIX_BYTES)];
    let mut hasher = Sha256::new();
    hasher.update(prefix);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use detect::SourceKind;
    use library::SourceStatus;
    use service::{Quantity, SourceMetadata};

    fn source(stable_id: Option<&str>) -> SourceFile {
        let content = "header line\nbody\n";
        SourceFile {
            id: library::SourceId::new(),
            name: "1001.02c".into(),
            display_name: "1001.02c".into(),
            content: content.into(),
            detected_kind: SourceKind::Ace,
            status: SourceStatus::Ready,
            metadata: Some(SourceMetadata::Ace {
                table_id: "1001.02c".into(),
                stable_id: stable_id.map(Into::into),
                temperature_k: 293.6,
                reactions: vec![1, 2],
            }),
            error: None,
            path: None,
            size: content.len() as u64,
            content_sha256: library::hash_content(content),
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn stable_identity_is_preferred() {
        let params = SeriesParams::default();
        let sig = compute_signature(&source(Some("svc-42")), &params);
        assert!(sig.as_str().contains("|s:svc-42|"));
    }

    #[test]
    fn content_hash_fallback_without_stable_id() {
        let params = SeriesParams::default();
        let sig = compute_signature(&source(None), &params);
        assert!(sig.as_str().contains("|c:"));
        // Same content, same fallback signature.
        assert_eq!(sig, compute_signature(&source(None), &params));
    }

    #[test]
    fn every_parameter_is_signature_relevant() {
        let file = source(Some("svc-42"));
        let base = SeriesParams::default();
        let baseline = compute_signature(&file, &base);

        let variants = [
            SeriesParams {
                quantity: Quantity::AngularDistribution,
                ..base.clone()
            },
            SeriesParams {
                reaction: 18,
                ..base.clone()
            },
            SeriesParams {
                temperature_k: 600.0,
                ..base.clone()
            },
            SeriesParams {
                energy_min_ev: 1.0,
                ..base.clone()
            },
            SeriesParams {
                energy_max_ev: 1e6,
                ..base.clone()
            },
            SeriesParams {
                include_uncertainty: true,
                ..base.clone()
            },
            SeriesParams {
                uncertainty_factor: 2.0,
                ..base.clone()
            },
        ];
        for (i, variant) in variants.iter().enumerate() {
            assert_ne!(
                compute_signature(&file, variant),
                baseline,
                "variant {i} did not change the signature"
            );
        }
    }

    #[test]
    fn different_sources_differ_by_identity() {
        let params = SeriesParams::default();
        let a = compute_signature(&source(Some("svc-1")), &params);
        let b = compute_signature(&source(Some("svc-2")), &params);
        assert_ne!(a, b);
    }

    #[test]
    fn prefix_hash_is_bounded() {
        let mut long_a = "x".repeat(CONTENT_PREFIX_BYTES);
        let mut long_b = long_a.clone();
        long_a.push_str("tail-one");
        long_b.push_str("tail-two");
        // Differences past the bound do not change the fallback hash.
        assert_eq!(content_prefix_hash(&long_a), content_prefix_hash(&long_b));

        // Differences inside the bound do.
        let short_a = "alpha";
        let short_b = "beta";
        assert_ne!(content_prefix_hash(short_a), content_prefix_hash(short_b));
    }

    #[test]
    fn signature_is_deterministic() {
        let file = source(Some("svc-42"));
        let params = SeriesParams {
            include_uncertainty: true,
            uncertainty_factor: 1.5,
            ..Default::default()
        };
        let first = compute_signature(&file, &params);
        for _ in 0..10 {
            assert_eq!(compute_signature(&file, &params), first);
        }
    }
}
