//! nectar-ingest: turns raw sensor exports into staging CSV files.
//!
//! - **`honeypot`**: hpfeeds JSON export → `staging_honeypot` rows
//! - **`reputation`**: `#`-delimited reputation feed → `staging_reputation` rows
//! - **`geo`**: resumable IP geolocation → `staging_ipgeo` rows

pub mod csv;
pub mod error;
pub mod geo;
pub mod honeypot;
pub mod reputation;

pub use error::{IngestError, IngestResult};
pub use geo::{GeoBatch, GeoBatchOptions, GeoLookup, GeoResponse, GeoSummary, HttpGeoLookup};
pub use honeypot::{NormalizeStats, normalize_honeypot};
pub use reputation::normalize_reputation;
