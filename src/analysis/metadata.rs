//! Pass-through metadata carried in the descriptor bundle
//!
//! Nothing here is computed from the signal: tag values come from the
//! [`TagReader`] and stream properties from the decoder and file system.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::io::tags::{CanonicalField, TagReader};

/// Tag fields; empty strings when the file does not carry them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackMetadata {
    /// Track artist
    pub artist: String,
    /// Track title
    pub title: String,
    /// Album name
    pub album: String,
    /// Genre
    pub genre: String,
    /// Release year or date
    pub year: String,
    /// Comment
    pub comment: String,
}

impl TrackMetadata {
    /// Collect every canonical field from a tag reader
    pub fn from_reader(reader: &dyn TagReader) -> Self {
        let field = |f| reader.read_field(f).unwrap_or_default();
        Self {
            artist: field(CanonicalField::Artist),
            title: field(CanonicalField::Title),
            album: field(CanonicalField::Album),
            genre: field(CanonicalField::Genre),
            year: field(CanonicalField::Year),
            comment: field(CanonicalField::Comment),
        }
    }
}

/// Stream and file properties
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioInfo {
    /// Upper-case file extension, e.g. "MP3"
    pub format: String,
    /// Average bitrate in kbps, derived from file size and duration
    pub bitrate: u32,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count of the source
    pub channels: u16,
    /// File size in MiB, two decimals
    pub file_size_mb: f64,
}

impl AudioInfo {
    /// Describe a decoded file
    pub fn describe(
        path: &Path,
        sample_rate: u32,
        channels: usize,
        file_size: u64,
        duration_secs: f64,
    ) -> Self {
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_uppercase())
            .unwrap_or_default();

        let bitrate = if duration_secs > 0.0 {
            (file_size as f64 * 8.0 / duration_secs / 1000.0).round() as u32
        } else {
            0
        };

        Self {
            format,
            bitrate,
            sample_rate,
            channels: channels.min(u16::MAX as usize) as u16,
            file_size_mb: (file_size as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapReader(HashMap<CanonicalField, String>);

    impl TagReader for MapReader {
        fn read_field(&self, field: CanonicalField) -> Option<String> {
            self.0.get(&field).cloned()
        }
    }

    #[test]
    fn test_metadata_from_reader() {
        let mut fields = HashMap::new();
        fields.insert(CanonicalField::Artist, "Nils".to_string());
        fields.insert(CanonicalField::Year, "2019".to_string());
        let meta = TrackMetadata::from_reader(&MapReader(fields));

        assert_eq!(meta.artist, "Nils");
        assert_eq!(meta.year, "2019");
        assert_eq!(meta.title, "");
        assert_eq!(meta.comment, "");
    }

    #[test]
    fn test_audio_info_describe() {
        // 1 MiB over 60 s
        let info = AudioInfo::describe(Path::new("/music/a.mp3"), 44100, 2, 1_048_576, 60.0);
        assert_eq!(info.format, "MP3");
        assert_eq!(info.bitrate, 140);
        assert_eq!(info.sample_rate, 44100);
        assert_eq!(info.channels, 2);
        assert_eq!(info.file_size_mb, 1.0);

        let empty = AudioInfo::describe(Path::new("noext"), 22050, 1, 0, 0.0);
        assert_eq!(empty.format, "");
        assert_eq!(empty.bitrate, 0);
    }
}
