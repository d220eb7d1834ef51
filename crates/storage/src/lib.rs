//! Storage abstractions for air-unify services.
//!
//! Provides the canonical relational representation of sources,
//! stations, measurements and fire detections, independent of any
//! one provider's schema, plus the conflict and retention policies
//! ingestion depends on.

pub mod conflict;
pub mod pg;
pub mod records;
pub mod store;

pub use conflict::ConflictPolicy;
pub use pg::PgStore;
pub use records::{
    FireRecord, IngestBatch, IngestCounts, IngestRow, MeasurementRecord, NearestReading,
    SourceRecord, StationRecord,
};
pub use store::AirStore;
