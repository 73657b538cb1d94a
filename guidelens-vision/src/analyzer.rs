//! Per-frame metric computation
//!
//! Everything here runs on-device and must complete quickly: the camera
//! callback path cannot block on heavy work. Sharpness therefore samples a
//! subgrid instead of touching every pixel.

use crate::error::VisionError;
use crate::frame::FrameMetrics;
use std::time::Instant;

/// Grid pitch divisor: sample roughly this many points per axis
const SHARPNESS_GRID: u32 = 64;

/// Computes brightness, sharpness and motion for accepted frames.
///
/// Stateful only for motion, which needs the previous frame's brightness
/// and timestamp. `reset` clears that state on rebind or facing switch so
/// the first frame after a switch never reports phantom motion.
#[derive(Debug, Default)]
pub struct FrameAnalyzer {
    prev: Option<(Instant, f32)>,
}

impl FrameAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyze one luma frame
    pub fn analyze(
        &mut self,
        luma: &[u8],
        width: u32,
        height: u32,
        at: Instant,
    ) -> Result<FrameMetrics, VisionError> {
        let expected = width as usize * height as usize;
        if expected == 0 || luma.len() < expected {
            return Err(VisionError::Processing(format!(
                "Luma buffer mismatch: {} bytes for {}x{}",
                luma.len(),
                width,
                height
            )));
        }

        let brightness = mean_luma(&luma[..expected]);
        let sharpness = laplacian_variance(luma, width, height);
        let motion = match self.prev {
            Some((prev_at, prev_brightness)) => {
                let dt = at.duration_since(prev_at).as_secs_f32().max(1e-3);
                ((brightness - prev_brightness).abs() / dt).min(1.0)
            }
            None => 0.0,
        };
        self.prev = Some((at, brightness));

        Ok(FrameMetrics {
            captured_at: at,
            brightness,
            sharpness,
            motion,
            objects: Vec::new(),
        })
    }

    /// Forget the previous frame (rebind, facing switch)
    pub fn reset(&mut self) {
        self.prev = None;
    }
}

/// Mean luma normalized to [0, 1]
pub fn mean_luma(luma: &[u8]) -> f32 {
    if luma.is_empty() {
        return 0.0;
    }
    let sum: u64 = luma.iter().map(|&p| p as u64).sum();
    (sum as f64 / luma.len() as f64 / 255.0) as f32
}

/// Variance of a 4-neighbor Laplacian sampled on a coarse grid.
///
/// Neighbors are immediate pixels so edges register at full strength; only
/// the sample positions are subsampled.
pub fn laplacian_variance(luma: &[u8], width: u32, height: u32) -> f32 {
    if width < 3 || height < 3 {
        return 0.0;
    }
    let w = width as usize;
    let h = height as usize;
    if luma.len() < w * h {
        return 0.0;
    }

    let step = ((width.min(height) / SHARPNESS_GRID).max(1)) as usize;
    let mut values = Vec::new();
    let mut y = 1;
    while y < h - 1 {
        let mut x = 1;
        while x < w - 1 {
            let center = luma[y * w + x] as f32;
            let lap = 4.0 * center
                - luma[y * w + x - 1] as f32
                - luma[y * w + x + 1] as f32
                - luma[(y - 1) * w + x] as f32
                - luma[(y + 1) * w + x] as f32;
            values.push(lap / 255.0);
            x += step;
        }
        y += step;
    }

    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / values.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn flat(width: u32, height: u32, value: u8) -> Vec<u8> {
        vec![value; (width * height) as usize]
    }

    fn checkerboard(width: u32, height: u32) -> Vec<u8> {
        (0..height)
            .flat_map(|y| {
                (0..width).map(move |x| if (x + y) % 2 == 0 { 255u8 } else { 0u8 })
            })
            .collect()
    }

    #[test]
    fn test_brightness_of_flat_frames() {
        assert_eq!(mean_luma(&flat(8, 8, 0)), 0.0);
        assert!((mean_luma(&flat(8, 8, 255)) - 1.0).abs() < 1e-6);
        assert!((mean_luma(&flat(8, 8, 128)) - 0.502).abs() < 0.01);
    }

    #[test]
    fn test_flat_frame_has_zero_sharpness() {
        assert_eq!(laplacian_variance(&flat(16, 16, 100), 16, 16), 0.0);
    }

    #[test]
    fn test_checkerboard_sharper_than_gradient() {
        let sharp = laplacian_variance(&checkerboard(16, 16), 16, 16);
        let gradient: Vec<u8> = (0..16u32)
            .flat_map(|y| (0..16u32).map(move |x| ((x + y) * 8) as u8))
            .collect();
        let soft = laplacian_variance(&gradient, 16, 16);
        assert!(sharp > soft);
        assert!(sharp > 0.0);
    }

    #[test]
    fn test_first_frame_has_no_motion() {
        let mut analyzer = FrameAnalyzer::new();
        let metrics = analyzer
            .analyze(&flat(8, 8, 100), 8, 8, Instant::now())
            .unwrap();
        assert_eq!(metrics.motion, 0.0);
    }

    #[test]
    fn test_motion_scales_with_brightness_delta() {
        let mut analyzer = FrameAnalyzer::new();
        let start = Instant::now();
        analyzer.analyze(&flat(8, 8, 0), 8, 8, start).unwrap();
        let metrics = analyzer
            .analyze(&flat(8, 8, 255), 8, 8, start + Duration::from_secs(2))
            .unwrap();
        // Full-scale delta over 2 s => 0.5 per second
        assert!((metrics.motion - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_reset_clears_motion_state() {
        let mut analyzer = FrameAnalyzer::new();
        let start = Instant::now();
        analyzer.analyze(&flat(8, 8, 0), 8, 8, start).unwrap();
        analyzer.reset();
        let metrics = analyzer
            .analyze(&flat(8, 8, 255), 8, 8, start + Duration::from_millis(10))
            .unwrap();
        assert_eq!(metrics.motion, 0.0);
    }

    #[test]
    fn test_mismatched_buffer_rejected() {
        let mut analyzer = FrameAnalyzer::new();
        let result = analyzer.analyze(&[0u8; 10], 8, 8, Instant::now());
        assert!(result.is_err());
    }
}
