//! Audio preprocessing modules
//!
//! Utilities for preparing decoded audio for analysis:
//! - Channel mixing (multichannel to mono)

pub mod channel_mixer;
