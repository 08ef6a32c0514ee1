//! Analysis result types
//!
//! [`DescriptorBundle`] is both the extractor's output and the unit the
//! fingerprint cache persists, so its serde layout is the on-disk record.

use serde::{Deserialize, Serialize};

use super::metadata::{AudioInfo, TrackMetadata};

/// Length of the similarity feature vector (20 MFCC + 12 chroma)
pub const FEATURE_VECTOR_LEN: usize = 32;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Camelot code per major tonic (C, C#, D, ..., B)
const CAMELOT_MAJOR: [&str; 12] = [
    "8B", "3B", "10B", "5B", "12B", "7B", "2B", "9B", "4B", "11B", "6B", "1B",
];

/// Camelot code per minor tonic (C, C#, D, ..., B)
const CAMELOT_MINOR: [&str; 12] = [
    "5A", "12A", "7A", "2A", "9A", "4A", "11A", "6A", "1A", "8A", "3A", "10A",
];

/// Open Key number per major tonic ("d" suffix)
const OPEN_KEY_MAJOR: [u32; 12] = [1, 8, 3, 10, 5, 12, 7, 2, 9, 4, 11, 6];

/// Open Key number per minor tonic ("m" suffix)
const OPEN_KEY_MINOR: [u32; 12] = [10, 5, 12, 7, 2, 9, 4, 11, 6, 1, 8, 3];

/// Musical key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Major key (0 = C, 1 = C#, ..., 11 = B)
    Major(u32),
    /// Minor key (0 = C, 1 = C#, ..., 11 = B)
    Minor(u32),
}

impl Key {
    /// Tonic pitch class (0 = C)
    pub fn tonic(&self) -> usize {
        match self {
            Key::Major(i) | Key::Minor(i) => *i as usize % 12,
        }
    }

    /// Get key in standard notation (e.g., "A Major", "C# Minor")
    pub fn notation(&self) -> String {
        match self {
            Key::Major(_) => format!("{} Major", NOTE_NAMES[self.tonic()]),
            Key::Minor(_) => format!("{} Minor", NOTE_NAMES[self.tonic()]),
        }
    }

    /// Get key in Camelot notation (e.g., "8B" = C major, "8A" = A minor)
    ///
    /// Numbers follow the circle of fifths; relative major and minor keys
    /// share a number. `B` marks major keys and `A` minor keys.
    ///
    /// # Example
    ///
    /// ```
    /// use trackflow_dsp::analysis::result::Key;
    ///
    /// assert_eq!(Key::Major(0).camelot(), "8B");  // C
    /// assert_eq!(Key::Major(9).camelot(), "11B"); // A
    /// assert_eq!(Key::Minor(9).camelot(), "8A");  // Am
    /// ```
    pub fn camelot(&self) -> String {
        match self {
            Key::Major(_) => CAMELOT_MAJOR[self.tonic()].to_string(),
            Key::Minor(_) => CAMELOT_MINOR[self.tonic()].to_string(),
        }
    }

    /// Get key in Open Key notation (e.g., "1d" = C major, "1m" = A minor)
    pub fn open_key(&self) -> String {
        match self {
            Key::Major(_) => format!("{}d", OPEN_KEY_MAJOR[self.tonic()]),
            Key::Minor(_) => format!("{}m", OPEN_KEY_MINOR[self.tonic()]),
        }
    }

    /// Get key from Camelot notation
    ///
    /// # Returns
    ///
    /// `Some(Key)` if valid, `None` if invalid format
    ///
    /// # Example
    ///
    /// ```
    /// use trackflow_dsp::analysis::result::Key;
    ///
    /// assert_eq!(Key::from_camelot("8B"), Some(Key::Major(0)));
    /// assert_eq!(Key::from_camelot("8A"), Some(Key::Minor(9)));
    /// assert_eq!(Key::from_camelot("13A"), None);
    /// ```
    pub fn from_camelot(code: &str) -> Option<Self> {
        let (table, major) = if code.ends_with('B') {
            (&CAMELOT_MAJOR, true)
        } else if code.ends_with('A') {
            (&CAMELOT_MINOR, false)
        } else {
            return None;
        };

        let tonic = table.iter().position(|&c| c == code)? as u32;
        Some(if major {
            Key::Major(tonic)
        } else {
            Key::Minor(tonic)
        })
    }
}

/// Categorical key confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyConfidence {
    /// No key could be determined
    None,
    /// Weak key
    Low,
    /// Template match found
    Medium,
    /// Strong key
    High,
}

/// Key descriptors as stored in the bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyInfo {
    /// Standard notation, e.g. "A Major"
    pub notation: String,
    /// Camelot code, e.g. "11B"
    pub camelot: String,
    /// Open Key code, e.g. "4d"
    pub open_key: String,
    /// Categorical confidence
    pub confidence: KeyConfidence,
}

impl KeyInfo {
    /// Descriptors for a detected key (fixed `medium` confidence)
    pub fn detected(key: Key) -> Self {
        Self {
            notation: key.notation(),
            camelot: key.camelot(),
            open_key: key.open_key(),
            confidence: KeyConfidence::Medium,
        }
    }

    /// Neutral fallback when no key could be determined
    pub fn unknown() -> Self {
        Self {
            notation: "Unknown".to_string(),
            camelot: "N/A".to_string(),
            open_key: "N/A".to_string(),
            confidence: KeyConfidence::None,
        }
    }

    /// Parse the Camelot code back into a key, if one was detected
    pub fn key(&self) -> Option<Key> {
        Key::from_camelot(&self.camelot)
    }
}

/// Perceptual energy descriptors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyInfo {
    /// Energy level 1-10
    pub level: u8,
    /// Whole-file RMS amplitude
    pub rms: f64,
    /// Fixed label for the level
    pub description: String,
}

impl EnergyInfo {
    /// Mid-scale fallback when the file's energy could not be measured
    pub fn unknown() -> Self {
        Self {
            level: 5,
            rms: 0.0,
            description: "Unknown".to_string(),
        }
    }
}

/// Similarity feature vector: timbre then pitch-class coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Time-averaged MFCCs (20)
    pub mfcc: Vec<f32>,
    /// Time-averaged chroma (12)
    pub chroma: Vec<f32>,
}

impl FeatureVector {
    /// The 32 concatenated coefficients, or `None` if either part has the
    /// wrong length or holds a non-finite value
    pub fn to_array(&self) -> Option<[f32; FEATURE_VECTOR_LEN]> {
        if self.mfcc.len() != crate::features::timbre::MFCC_COEFFICIENTS
            || self.chroma.len() != FEATURE_VECTOR_LEN - crate::features::timbre::MFCC_COEFFICIENTS
        {
            return None;
        }
        let mut out = [0.0f32; FEATURE_VECTOR_LEN];
        for (slot, &v) in out.iter_mut().zip(self.mfcc.iter().chain(self.chroma.iter())) {
            if !v.is_finite() {
                return None;
            }
            *slot = v;
        }
        Some(out)
    }
}

/// Complete descriptor bundle for one track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptorBundle {
    /// Absolute path of the analyzed file
    pub file_path: String,

    /// File name including extension
    pub filename: String,

    /// Tempo in BPM, one decimal place; absent if no dominant periodicity
    pub tempo: Option<f64>,

    /// Key descriptors
    pub key: KeyInfo,

    /// Energy descriptors
    pub energy: EnergyInfo,

    /// Similarity feature vector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<FeatureVector>,

    /// Tag pass-through
    #[serde(default)]
    pub metadata: TrackMetadata,

    /// Stream/file pass-through
    #[serde(default)]
    pub audio_info: AudioInfo,

    /// Whole-file duration in seconds
    #[serde(default)]
    pub duration: f64,
}

impl DescriptorBundle {
    /// The 32-element similarity vector, if present and well formed
    pub fn feature_vector(&self) -> Option<[f32; FEATURE_VECTOR_LEN]> {
        self.feature.as_ref().and_then(FeatureVector::to_array)
    }
}
