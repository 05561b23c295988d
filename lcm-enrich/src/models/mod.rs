//! Data models for lcm-enrich
//!
//! - Line items and their enrichment record
//! - Assemblies and the derived enrichment summary
//! - Parts-source candidates, details and merged enrichment results

pub mod assembly;
pub mod line_item;
pub mod part;

pub use assembly::{summarize, Assembly, EnrichmentSummary};
pub use line_item::{EnrichmentRecord, LineItem, LineItemInput, SupplierRef};
pub use part::{Candidate, EnrichmentResult, FallbackFields, PartDetails};
