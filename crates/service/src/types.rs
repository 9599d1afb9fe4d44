//! Data-transfer types shared between the engine and the external service.
//!
//! These types define the wire-level contract: what the engine sends when
//! it asks for a derived series or a rendered figure, and what comes back.
//! Everything derives `serde` so a transport implementation can move these
//! over JSON unchanged.

use detect::SourceKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the engine identifies source material to the service.
///
/// `Stable` carries a server-assigned identifier for previously-submitted
/// content and avoids re-transmitting the file; it may expire server-side.
/// `Content` carries the raw text as a fallback. The enum shape guarantees
/// a request is never issued with both omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceIdentity {
    Stable(String),
    Content(String),
}

impl SourceIdentity {
    pub fn is_stable(&self) -> bool {
        matches!(self, SourceIdentity::Stable(_))
    }
}

/// Physical quantity a series plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    CrossSection,
    AngularDistribution,
    EnergySpectrum,
}

impl Quantity {
    /// Short lowercase tag used in signatures.
    pub fn tag(self) -> &'static str {
        match self {
            Quantity::CrossSection => "xs",
            Quantity::AngularDistribution => "ang",
            Quantity::EnergySpectrum => "spectrum",
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Selection parameters for one series.
///
/// Every field here influences the computed output and therefore
/// participates in the series signature — presentation choices live in the
/// session's style type instead, never here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesParams {
    pub quantity: Quantity,
    /// ENDF MT reaction number (e.g. 1 = total, 18 = fission, 102 = capture).
    pub reaction: u32,
    pub temperature_k: f64,
    pub energy_min_ev: f64,
    pub energy_max_ev: f64,
    pub include_uncertainty: bool,
    /// Confidence multiplier applied to the uncertainty band.
    pub uncertainty_factor: f64,
}

impl Default for SeriesParams {
    fn default() -> Self {
        Self {
            quantity: Quantity::CrossSection,
            reaction: 1,
            temperature_k: 293.6,
            energy_min_ev: 1e-5,
            energy_max_ev: 2e7,
            include_uncertainty: false,
            uncertainty_factor: 1.0,
        }
    }
}

/// One derived-data computation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeRequest {
    pub identity: SourceIdentity,
    pub kind: SourceKind,
    pub params: SeriesParams,
}

/// Pointwise uncertainty band around a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyBand {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// The numeric result of a derived-data computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesData {
    pub label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub uncertainty: Option<UncertaintyBand>,
}

impl SeriesData {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Metadata produced by authoritative parsing of one source file.
///
/// An explicit tagged union, one variant per source kind; downstream code
/// matches on the discriminant instead of probing field presence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceMetadata {
    Ace {
        /// ZAID-style table identifier, e.g. `1001.02c`.
        table_id: String,
        /// Server-assigned stable identity, if the service issued one.
        stable_id: Option<String>,
        temperature_k: f64,
        /// MT reaction numbers available for selection.
        reactions: Vec<u32>,
    },
    Endf {
        /// ENDF MAT number.
        mat: u32,
        stable_id: Option<String>,
        /// MF file numbers present in the tape.
        files: Vec<u32>,
        reactions: Vec<u32>,
    },
}

impl SourceMetadata {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceMetadata::Ace { .. } => SourceKind::Ace,
            SourceMetadata::Endf { .. } => SourceKind::Endf,
        }
    }

    pub fn stable_id(&self) -> Option<&str> {
        match self {
            SourceMetadata::Ace { stable_id, .. } | SourceMetadata::Endf { stable_id, .. } => {
                stable_id.as_deref()
            }
        }
    }

    pub fn reactions(&self) -> &[u32] {
        match self {
            SourceMetadata::Ace { reactions, .. } | SourceMetadata::Endf { reactions, .. } => {
                reactions
            }
        }
    }
}

/// Figure-level configuration for the full-image render path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureConfig {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub log_x: bool,
    pub log_y: bool,
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            x_label: "Energy (eV)".into(),
            y_label: "Cross section (b)".into(),
            log_x: true,
            log_y: true,
        }
    }
}

/// One series as handed to the render call: resolved data plus the
/// presentation fields the renderer needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSnapshot {
    pub label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub uncertainty: Option<UncertaintyBand>,
    pub color: Option<String>,
    pub line_width: Option<f32>,
}

/// Render fidelity requested from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderQuality {
    Draft,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Png,
    Svg,
}

/// A rendered figure as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub dpi: u32,
}
