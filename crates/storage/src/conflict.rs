//! Measurement conflict policy.
//!
//! Re-ingesting the same (station, ts) pair must reconcile rather
//! than duplicate. Ground and model providers are authoritative for
//! their own numbers and overwrite on conflict. Aggregate providers
//! deliver one pollutant per record, so a blind overwrite would wipe
//! the other pollutant; they merge null-safely instead.

use aq_common::SourceQuality;

/// How an incoming measurement reconciles with an existing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Incoming values replace existing ones, nulls included.
    Overwrite,
    /// Incoming non-null values win; incoming nulls keep the
    /// existing value (COALESCE(EXCLUDED.x, existing.x)).
    Coalesce,
}

impl ConflictPolicy {
    /// Policy for a source quality tag. The distinction is kept per
    /// tag rather than unified: unifying would silently drop
    /// previously-good values on lower-quality re-ingests.
    pub fn for_quality(quality: SourceQuality) -> Self {
        match quality {
            SourceQuality::Observed | SourceQuality::Model => ConflictPolicy::Overwrite,
            SourceQuality::Aggregate => ConflictPolicy::Coalesce,
        }
    }

    /// Resolve one numeric field under this policy.
    pub fn merge(&self, incoming: Option<f64>, existing: Option<f64>) -> Option<f64> {
        match self {
            ConflictPolicy::Overwrite => incoming,
            ConflictPolicy::Coalesce => incoming.or(existing),
        }
    }
}
