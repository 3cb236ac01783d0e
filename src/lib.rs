//! Pagelens: storage-structure inspection for relational tables and indexes.
//!
//! The crate consumes page snapshots produced by an external storage-format
//! parser (as JSON) and derives presentation-ready values from them: decoded
//! index keys, in-page tuple version chains, page fill buckets, density tiers
//! and maintenance recommendations.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod analysis;
pub mod inspect;
pub mod state;
pub mod types;

pub use analysis::{
    chains::{reconstruct_chains, reconstruct_chains_bounded, VersionChain, MAX_CHAIN_HOPS},
    health::{
        assess_bloat, classify_page, density_tier, recommend, BloatAssessment, BloatInputs,
        DensityHistogram, DensityTier, FillThresholds, PageFill, Recommendation,
        RecommendThresholds, Severity, TierThresholds,
    },
    keys::{decode_key, ByteOrder, DecodedKey, KeyLayout, KeyWidth},
};
pub use inspect::{HealthPolicy, InspectError};
pub use types::{PageId, PageMetrics, PhysicalPointer, PointerParseError, SlotId, Tuple};
