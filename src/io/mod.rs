//! Audio I/O modules
//!
//! Audio decoding, fixed-size sample chunking, and tag reading using Symphonia.

pub mod decoder;
pub mod sample_buffer;
pub mod tags;

pub use decoder::{decode_audio, AudioSource, DecodedAudio};
pub use tags::{CanonicalField, TagFormat, TagReader};
