//! Common types and utilities shared across all air-unify services.

pub mod align;
pub mod error;
pub mod grade;
pub mod types;

pub use align::{
    kst_floor_hour, merge_hourly, select_latest_index, to_second_precision, ForecastRecord,
    PollutantHourly, WeatherHourly, FORECAST_CONFIDENCE,
};
pub use error::{AirError, AirResult};
pub use grade::{badges, grade};
pub use types::{SourceKind, SourceQuality, StationKind};
