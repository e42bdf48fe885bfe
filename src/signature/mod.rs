//! Tone signatures: the five fixed dimensions, their label sets, and the
//! validator that turns loosely structured model output into a complete
//! signature.

pub mod schema;
pub mod types;

pub use schema::{RawDimension, RawSignature, normalize_label, resolve_label, validate};
pub use types::{
    DegradationReason, Dimension, DimensionTable, DimensionValue, MatchKind, ToneSignature,
    embedding_dimensions, fingerprint,
};
