//! Probe results, the per-session cache and the host failure ledger

pub mod cache;
pub mod hosts;
pub mod record;

pub use cache::{CacheEntry, MetadataCache};
pub use hosts::HostLedger;
pub use record::{ProbeChapter, ProbeRecord, ProbeStream};
