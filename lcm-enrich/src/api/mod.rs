//! HTTP API handlers for lcm-enrich
//!
//! JSON over HTTP plus one SSE stream for progress events.

pub mod assemblies;
pub mod enrichment;
pub mod health;
pub mod resolution;
pub mod sse;

pub use assemblies::assembly_routes;
pub use enrichment::enrichment_routes;
pub use health::health_routes;
pub use resolution::resolution_routes;
pub use sse::event_stream;
