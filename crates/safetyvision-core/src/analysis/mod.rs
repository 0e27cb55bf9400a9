//! Hazard analysis
//!
//! Image validation, hazard extraction, per-hazard grounding and the
//! resulting violation records.

mod image;
mod orchestrator;
mod types;
mod violation;

pub use image::{detect_image_mime, validate_image};
pub use orchestrator::{SafetyAnalyzer, SafetyAnalyzerBuilder};
pub use types::{HazardFinding, SafetyReport, SafetyViolation};
pub use violation::{ConfidenceBand, GroundingOutcome, ViolationGenerator};
