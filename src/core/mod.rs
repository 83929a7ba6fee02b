pub mod checksum;
pub mod engine;

pub use checksum::ChecksumLedger;
pub use engine::{SyncEngine, SyncReport};
