//! Channel mixing utilities (multichannel to mono conversion)

/// Downmix interleaved multichannel samples to mono by averaging channels.
///
/// # Arguments
///
/// * `interleaved` - Interleaved samples (`L R L R ...` for stereo)
/// * `channels` - Number of channels in the interleaved stream
///
/// # Returns
///
/// One mono sample per frame. A trailing partial frame is dropped.
pub fn downmix_interleaved(interleaved: &[f32], channels: usize) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => interleaved.to_vec(),
        n => {
            let scale = 1.0 / n as f32;
            interleaved
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() * scale)
                .collect()
        }
    }
}

/// Append the mono downmix of `interleaved` to `out` without an intermediate buffer.
pub fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    match channels {
        0 => {}
        1 => out.extend_from_slice(interleaved),
        n => {
            let scale = 1.0 / n as f32;
            out.extend(
                interleaved
                    .chunks_exact(n)
                    .map(|frame| frame.iter().sum::<f32>() * scale),
            );
        }
    }
}
