//! Shared record schema, configuration and error types for the revenue-share
//! pipeline.

pub mod config;
pub mod error;
pub mod table;
pub mod timezone;
pub mod types;

pub use config::AppConfig;
pub use error::{RevshareError, RevshareResult};
pub use timezone::ReportTimeZone;
pub use types::{EnrichedRecord, EventRecord, RawEventRow, ReportRow};
