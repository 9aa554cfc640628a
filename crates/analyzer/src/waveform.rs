/// Weight of the incoming frame in the temporal blend.
const ALPHA: f64 = 0.8;

/// Temporal and spatial smoother for display waveforms. Blends each frame
/// against float-precision state carried between calls, then runs a
/// neighbor filter over interior samples. The neighbor filter mixes the
/// already-smoothed left neighbor with the raw right neighbor; the
/// asymmetry is part of the contract and must not be made symmetric.
pub struct WaveformSmoother {
    previous: Vec<f64>,
}

impl WaveformSmoother {
    pub fn new() -> Self {
        Self {
            previous: Vec::new(),
        }
    }

    /// Output length always equals input length. An empty frame passes
    /// through untouched; a frame whose length differs from the carried
    /// state re-seeds the state from the raw frame.
    pub fn smooth(&mut self, raw: &[u8]) -> Vec<u8> {
        if raw.is_empty() {
            return Vec::new();
        }
        if self.previous.len() != raw.len() {
            self.previous = raw.iter().map(|&b| b as f64).collect();
            return raw.to_vec();
        }

        let mut blended: Vec<f64> = raw
            .iter()
            .zip(self.previous.iter())
            .map(|(&r, &p)| ALPHA * r as f64 + (1.0 - ALPHA) * p)
            .collect();
        for i in 1..blended.len() - 1 {
            blended[i] = 0.25 * blended[i - 1] + 0.5 * blended[i] + 0.25 * raw[i + 1] as f64;
        }

        let bytes = blended
            .iter()
            .map(|&v| v.round().clamp(0.0, 255.0) as u8)
            .collect();
        self.previous = blended;
        bytes
    }
}

impl Default for WaveformSmoother {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_length_matches_input() {
        let mut smoother = WaveformSmoother::new();
        for len in [0, 1, 2, 3, 1024] {
            let frame = vec![200u8; len];
            assert_eq!(smoother.smooth(&frame).len(), len);
        }
    }

    #[test]
    fn first_call_passes_through() {
        let mut smoother = WaveformSmoother::new();
        let frame = vec![10, 250, 40, 90];
        assert_eq!(smoother.smooth(&frame), frame);
    }

    #[test]
    fn constant_input_converges_to_fixed_point() {
        let mut smoother = WaveformSmoother::new();
        let ramp: Vec<u8> = (0..64).map(|i| (i * 4) as u8).collect();
        smoother.smooth(&ramp);
        let constant = vec![128u8; 64];
        let mut out = Vec::new();
        for _ in 0..12 {
            out = smoother.smooth(&constant);
        }
        assert!(out.iter().all(|&b| b == 128), "not converged: {out:?}");
    }

    #[test]
    fn neighbor_pass_is_left_smoothed_right_raw() {
        let mut smoother = WaveformSmoother::new();
        smoother.smooth(&vec![0u8; 9]);
        let mut impulse = vec![0u8; 9];
        impulse[3] = 100;
        // Temporal blend gives 80 at index 3; the sequential neighbor pass
        // then leaks the raw right neighbor one step left and the smoothed
        // value rightward with quartering decay.
        assert_eq!(
            smoother.smooth(&impulse),
            vec![0, 0, 25, 46, 12, 3, 1, 0, 0]
        );
    }

    #[test]
    fn edges_skip_the_neighbor_pass() {
        let mut smoother = WaveformSmoother::new();
        smoother.smooth(&vec![0u8; 4]);
        let out = smoother.smooth(&[100, 0, 0, 100]);
        // Edge samples carry only the temporal blend.
        assert_eq!(out[0], 80);
        assert_eq!(out[3], 80);
    }

    #[test]
    fn output_stays_in_byte_range() {
        let mut smoother = WaveformSmoother::new();
        let mut frame: Vec<u8> = (0..256).map(|i| (i % 256) as u8).collect();
        for _ in 0..20 {
            let out = smoother.smooth(&frame);
            assert_eq!(out.len(), frame.len());
            frame.rotate_left(7);
        }
    }
}
