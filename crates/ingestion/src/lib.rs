//! Provider payload normalizers.
//!
//! Each provider module converts one provider-native payload (already
//! fetched) into canonical station/measurement pairs or fire records.
//! Fetching and normalizing are separated so normalizers stay pure
//! and unit-testable on fixture payloads.
//!
//! Shared rules:
//! - station identity is derived deterministically into a stable
//!   `external_code`;
//! - provider sentinel values for "missing" parse to absent, never 0;
//! - timestamps are normalized to UTC from the provider's reported
//!   sample time;
//! - a malformed row is skipped and counted; a malformed payload
//!   aborts the run.

pub mod airkorea;
pub mod columns;
pub mod fetch;
pub mod fields;
pub mod firms;
pub mod kma;
pub mod openaq;
pub mod owm;
pub mod timestamp;
pub mod waqi;

pub use fetch::ProviderClient;
