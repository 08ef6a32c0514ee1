//! Krumhansl-Kessler key templates
//!
//! Defines tonal profiles for 24 keys (12 major + 12 minor). The profiles are
//! the probe-tone ratings for a C tonic; other tonics are rotations.

/// Major profile, C major (C, C#, D, ..., B)
pub const KK_MAJOR: [f32; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Minor profile, C minor (C, C#, D, ..., B)
pub const KK_MINOR: [f32; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Key templates for all 24 keys
#[derive(Debug, Clone)]
pub struct KeyTemplates {
    /// Major key templates (12 keys: C, C#, D, ..., B)
    pub major: [[f32; 12]; 12],

    /// Minor key templates (12 keys: C, C#, D, ..., B)
    pub minor: [[f32; 12]; 12],
}

impl KeyTemplates {
    /// Create new key templates with Krumhansl-Kessler profiles
    pub fn new() -> Self {
        Self {
            major: std::array::from_fn(|tonic| rotate(&KK_MAJOR, tonic)),
            minor: std::array::from_fn(|tonic| rotate(&KK_MINOR, tonic)),
        }
    }

    /// Template for major key with the given tonic (0 = C)
    pub fn get_major_template(&self, tonic: u32) -> &[f32; 12] {
        &self.major[tonic as usize % 12]
    }

    /// Template for minor key with the given tonic (0 = C)
    pub fn get_minor_template(&self, tonic: u32) -> &[f32; 12] {
        &self.minor[tonic as usize % 12]
    }
}

impl Default for KeyTemplates {
    fn default() -> Self {
        Self::new()
    }
}

/// Shift a C-based profile so that its tonic weight lands on `tonic`
fn rotate(profile: &[f32; 12], tonic: usize) -> [f32; 12] {
    std::array::from_fn(|pc| profile[(pc + 12 - tonic) % 12])
}
