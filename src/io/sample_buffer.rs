//! Fixed-size chunking of a decoded sample stream

/// Regroups variable-size decoder packets into fixed-size windows.
///
/// Memory stays bounded by one window plus one packet regardless of track
/// length.
#[derive(Debug)]
pub struct SampleBuffer {
    /// Buffer data
    data: Vec<f32>,
    /// Read position of the next window
    position: usize,
}

impl SampleBuffer {
    /// Create a new sample buffer
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            position: 0,
        }
    }

    /// Add samples to buffer
    pub fn push(&mut self, samples: &[f32]) {
        self.compact();
        self.data.extend_from_slice(samples);
    }

    /// Number of samples not yet handed out as a window
    pub fn pending(&self) -> usize {
        self.data.len() - self.position
    }

    /// Get next window of samples, if a full window is buffered
    pub fn next_window(&mut self, window_size: usize) -> Option<&[f32]> {
        if window_size == 0 || self.pending() < window_size {
            return None;
        }

        let start = self.position;
        self.position += window_size;
        Some(&self.data[start..start + window_size])
    }

    /// Hand out whatever is left after the final packet
    pub fn take_remainder(&mut self) -> Option<Vec<f32>> {
        if self.pending() == 0 {
            return None;
        }
        let rest = self.data[self.position..].to_vec();
        self.data.clear();
        self.position = 0;
        Some(rest)
    }

    fn compact(&mut self) {
        if self.position > 0 {
            self.data.drain(..self.position);
            self.position = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_span_packets() {
        let mut buffer = SampleBuffer::new(8);
        buffer.push(&[1.0, 2.0, 3.0]);
        assert!(buffer.next_window(4).is_none());

        buffer.push(&[4.0, 5.0]);
        assert_eq!(buffer.next_window(4), Some(&[1.0, 2.0, 3.0, 4.0][..]));
        assert!(buffer.next_window(4).is_none());
        assert_eq!(buffer.pending(), 1);

        assert_eq!(buffer.take_remainder(), Some(vec![5.0]));
        assert_eq!(buffer.take_remainder(), None);
    }

    #[test]
    fn test_storage_stays_bounded() {
        let mut buffer = SampleBuffer::new(16);
        for _ in 0..1000 {
            buffer.push(&[0.0; 10]);
            while buffer.next_window(16).is_some() {}
        }
        assert!(buffer.data.len() < 32);
    }
}
