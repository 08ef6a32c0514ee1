//! Tag reading behind one format-independent interface
//!
//! Container formats name the same field differently (`TPE1` in ID3v2,
//! `©ART` in MP4, `ARTIST` in Vorbis comments). Callers ask for a
//! [`CanonicalField`] through [`TagReader`] and never branch on format.

use symphonia::core::meta::StandardTagKey;

/// Format-independent tag fields carried through to the descriptor bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    /// Track artist
    Artist,
    /// Track title
    Title,
    /// Album name
    Album,
    /// Genre
    Genre,
    /// Release date or year
    Year,
    /// Free-form comment
    Comment,
}

impl CanonicalField {
    fn standard_key(self) -> StandardTagKey {
        match self {
            CanonicalField::Artist => StandardTagKey::Artist,
            CanonicalField::Title => StandardTagKey::TrackTitle,
            CanonicalField::Album => StandardTagKey::Album,
            CanonicalField::Genre => StandardTagKey::Genre,
            CanonicalField::Year => StandardTagKey::Date,
            CanonicalField::Comment => StandardTagKey::Comment,
        }
    }
}

/// Read a canonical field from whatever tag container a file carries
pub trait TagReader {
    /// Value of `field`, or `None` if the file does not carry it
    fn read_field(&self, field: CanonicalField) -> Option<String>;
}

/// A tag as found in the container
#[derive(Debug, Clone)]
pub struct RawTag {
    /// Key as understood by the demuxer, when it recognized one
    pub std_key: Option<StandardTagKey>,
    /// Native key as stored in the file
    pub key: String,
    /// Value rendered as text
    pub value: String,
}

/// Tag container family, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFormat {
    /// ID3v2 frames (MP3, AIFF)
    Id3v2,
    /// iTunes-style MP4 atoms (M4A, AAC, ALAC)
    Mp4,
    /// Vorbis comments (FLAC, Ogg, Opus)
    VorbisComment,
    /// RIFF INFO chunks (WAV)
    RiffInfo,
    /// Anything else: only standard keys are consulted
    Unknown,
}

impl TagFormat {
    /// Pick the tag family for a file extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "mp3" | "aif" | "aiff" => TagFormat::Id3v2,
            "m4a" | "mp4" | "aac" | "alac" => TagFormat::Mp4,
            "flac" | "ogg" | "oga" | "opus" => TagFormat::VorbisComment,
            "wav" | "wave" => TagFormat::RiffInfo,
            _ => TagFormat::Unknown,
        }
    }

    /// Native keys for `field` in this container family, most specific first
    pub fn native_keys(self, field: CanonicalField) -> &'static [&'static str] {
        use CanonicalField::*;
        match (self, field) {
            (TagFormat::Id3v2, Artist) => &["TPE1"],
            (TagFormat::Id3v2, Title) => &["TIT2"],
            (TagFormat::Id3v2, Album) => &["TALB"],
            (TagFormat::Id3v2, Genre) => &["TCON"],
            (TagFormat::Id3v2, Year) => &["TDRC", "TYER"],
            (TagFormat::Id3v2, Comment) => &["COMM"],

            (TagFormat::Mp4, Artist) => &["\u{a9}ART"],
            (TagFormat::Mp4, Title) => &["\u{a9}nam"],
            (TagFormat::Mp4, Album) => &["\u{a9}alb"],
            (TagFormat::Mp4, Genre) => &["\u{a9}gen"],
            (TagFormat::Mp4, Year) => &["\u{a9}day"],
            (TagFormat::Mp4, Comment) => &["\u{a9}cmt"],

            (TagFormat::VorbisComment, Artist) => &["ARTIST"],
            (TagFormat::VorbisComment, Title) => &["TITLE"],
            (TagFormat::VorbisComment, Album) => &["ALBUM"],
            (TagFormat::VorbisComment, Genre) => &["GENRE"],
            (TagFormat::VorbisComment, Year) => &["DATE", "YEAR"],
            (TagFormat::VorbisComment, Comment) => &["COMMENT", "DESCRIPTION"],

            (TagFormat::RiffInfo, Artist) => &["IART"],
            (TagFormat::RiffInfo, Title) => &["INAM"],
            (TagFormat::RiffInfo, Album) => &["IPRD"],
            (TagFormat::RiffInfo, Genre) => &["IGNR"],
            (TagFormat::RiffInfo, Year) => &["ICRD"],
            (TagFormat::RiffInfo, Comment) => &["ICMT"],

            (TagFormat::Unknown, _) => &[],
        }
    }
}

/// [`TagReader`] over tags collected by the Symphonia demuxer
#[derive(Debug, Clone)]
pub struct SymphoniaTags {
    format: TagFormat,
    tags: Vec<RawTag>,
}

impl SymphoniaTags {
    /// Wrap tags read from a container of the given family
    pub fn new(format: TagFormat, tags: Vec<RawTag>) -> Self {
        Self { format, tags }
    }

    fn non_empty(value: &str) -> Option<String> {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

impl TagReader for SymphoniaTags {
    fn read_field(&self, field: CanonicalField) -> Option<String> {
        let wanted = field.standard_key();
        let standard = self
            .tags
            .iter()
            .filter(|tag| tag.std_key == Some(wanted))
            .find_map(|tag| Self::non_empty(&tag.value));
        if standard.is_some() {
            return standard;
        }

        self.format.native_keys(field).iter().find_map(|native| {
            self.tags
                .iter()
                .filter(|tag| tag.key.eq_ignore_ascii_case(native))
                .find_map(|tag| Self::non_empty(&tag.value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(std_key: Option<StandardTagKey>, key: &str, value: &str) -> RawTag {
        RawTag {
            std_key,
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_standard_key_wins() {
        let tags = SymphoniaTags::new(
            TagFormat::Id3v2,
            vec![
                raw(None, "TPE1", "Native Artist"),
                raw(Some(StandardTagKey::Artist), "TPE1", "Standard Artist"),
            ],
        );
        assert_eq!(
            tags.read_field(CanonicalField::Artist).as_deref(),
            Some("Standard Artist")
        );
    }

    #[test]
    fn test_native_key_fallback_per_format() {
        let mp4 = SymphoniaTags::new(TagFormat::Mp4, vec![raw(None, "\u{a9}nam", "Title")]);
        assert_eq!(mp4.read_field(CanonicalField::Title).as_deref(), Some("Title"));

        let vorbis = SymphoniaTags::new(
            TagFormat::VorbisComment,
            vec![raw(None, "date", " 2021 ")],
        );
        assert_eq!(vorbis.read_field(CanonicalField::Year).as_deref(), Some("2021"));

        // ID3 keys mean nothing to a Vorbis reader
        let mismatched = SymphoniaTags::new(
            TagFormat::VorbisComment,
            vec![raw(None, "TPE1", "Artist")],
        );
        assert_eq!(mismatched.read_field(CanonicalField::Artist), None);
    }

    #[test]
    fn test_empty_values_are_absent() {
        let tags = SymphoniaTags::new(
            TagFormat::Id3v2,
            vec![raw(Some(StandardTagKey::Genre), "TCON", "   ")],
        );
        assert_eq!(tags.read_field(CanonicalField::Genre), None);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(TagFormat::from_extension("MP3"), TagFormat::Id3v2);
        assert_eq!(TagFormat::from_extension("flac"), TagFormat::VorbisComment);
        assert_eq!(TagFormat::from_extension("m4a"), TagFormat::Mp4);
        assert_eq!(TagFormat::from_extension("wav"), TagFormat::RiffInfo);
        assert_eq!(TagFormat::from_extension("xyz"), TagFormat::Unknown);
    }
}
