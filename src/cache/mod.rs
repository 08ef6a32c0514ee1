//! Content-addressed descriptor cache
//!
//! One JSON record per [`TrackFingerprint`]. The fingerprint is recomputed
//! from file-system metadata on every lookup, so a modified file simply
//! stops matching its old record.

pub mod fingerprint;
pub mod store;

pub use fingerprint::TrackFingerprint;
pub use store::FingerprintCache;
