//! CPU mirror of the bloom shaders.
//!
//! Same constants and formulas as `lit.wgsl` (bright split), `blur.wgsl` and
//! `composite.wgsl`. Used to check the compositor's properties without a GPU
//! and to reason about settings (e.g. what exposure does to a given color).

use super::schedule::{BlurDirection, BlurSchedule, BlurSource};
use super::BloomSettings;

/// Rec. 709 luma weights used by the bright-pass split.
pub const LUMINANCE_WEIGHTS: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// One-sided 9-tap Gaussian kernel: center weight followed by four offsets.
pub const BLUR_WEIGHTS: [f32; 5] = [0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216];

pub type Rgb = [f32; 3];

pub fn luminance(c: Rgb) -> f32 {
    c[0] * LUMINANCE_WEIGHTS[0] + c[1] * LUMINANCE_WEIGHTS[1] + c[2] * LUMINANCE_WEIGHTS[2]
}

/// Value written to the bright attachment for a shaded fragment.
pub fn bright_pass(c: Rgb, threshold: f32) -> Rgb {
    if luminance(c) > threshold { c } else { [0.0; 3] }
}

/// Exposure tone mapping: `1 - exp(-hdr * exposure)` per channel.
pub fn tone_map(hdr: Rgb, exposure: f32) -> Rgb {
    hdr.map(|v| 1.0 - (-v * exposure).exp())
}

pub fn gamma_correct(c: Rgb, gamma: f32) -> Rgb {
    let inv = 1.0 / gamma;
    c.map(|v| v.max(0.0).powf(inv))
}

/// Final displayed color for one pixel.
///
/// `apply_gamma` is false when the surface is sRGB and the GPU encodes gamma.
pub fn composite(scene: Rgb, bloom: Rgb, settings: &BloomSettings, apply_gamma: bool) -> Rgb {
    let hdr = if settings.enabled {
        [scene[0] + bloom[0], scene[1] + bloom[1], scene[2] + bloom[2]]
    } else {
        scene
    };
    let mapped = tone_map(hdr, settings.exposure);
    if apply_gamma { gamma_correct(mapped, settings.gamma) } else { mapped }
}

/// Row-major HDR image.
#[derive(Debug, Clone, PartialEq)]
pub struct HdrImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Rgb>,
}

impl HdrImage {
    pub fn filled(width: usize, height: usize, color: Rgb) -> Self {
        Self { width, height, pixels: vec![color; width * height] }
    }

    pub fn get(&self, x: usize, y: usize) -> Rgb {
        self.pixels[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, c: Rgb) {
        self.pixels[y * self.width + x] = c;
    }

    /// Bright-pass split of every pixel.
    pub fn bright_pass(&self, threshold: f32) -> HdrImage {
        HdrImage {
            width: self.width,
            height: self.height,
            pixels: self.pixels.iter().map(|&c| bright_pass(c, threshold)).collect(),
        }
    }

    /// One 9-tap blur along `direction`, clamping samples to the edge like
    /// the GPU sampler does.
    pub fn blur_1d(&self, direction: BlurDirection) -> HdrImage {
        let [sx, sy] = direction.step();
        let (sx, sy) = (sx as isize, sy as isize);
        let max_x = self.width as isize - 1;
        let max_y = self.height as isize - 1;

        let mut out = HdrImage::filled(self.width, self.height, [0.0; 3]);
        for y in 0..self.height as isize {
            for x in 0..self.width as isize {
                let mut acc = [0.0f32; 3];
                for (i, w) in BLUR_WEIGHTS.iter().enumerate() {
                    let i = i as isize;
                    let taps: &[isize] = if i == 0 { &[0] } else { &[i, -i] };
                    for &o in taps {
                        let px = (x + sx * o).clamp(0, max_x) as usize;
                        let py = (y + sy * o).clamp(0, max_y) as usize;
                        let c = self.get(px, py);
                        acc[0] += c[0] * w;
                        acc[1] += c[1] * w;
                        acc[2] += c[2] * w;
                    }
                }
                out.set(x as usize, y as usize, acc);
            }
        }
        out
    }
}

/// Runs `schedule` over `bright` with a CPU ping-pong pair and returns the
/// image the composite would sample.
pub fn run_blur(bright: &HdrImage, schedule: BlurSchedule) -> HdrImage {
    let black = HdrImage::filled(bright.width, bright.height, [0.0; 3]);
    let mut ping_pong = [black.clone(), black];

    for step in schedule.steps() {
        let blurred = match step.source {
            BlurSource::BrightPass => bright.blur_1d(step.direction),
            BlurSource::PingPong(i) => ping_pong[i].blur_1d(step.direction),
        };
        ping_pong[step.destination] = blurred;
    }

    match schedule.final_source() {
        BlurSource::BrightPass => bright.clone(),
        BlurSource::PingPong(i) => std::mem::replace(&mut ping_pong[i], HdrImage::filled(0, 0, [0.0; 3])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn settings(enabled: bool, exposure: f32) -> BloomSettings {
        BloomSettings { enabled, exposure, ..BloomSettings::default() }
    }

    // ── bright pass ───────────────────────────────────────────────────────

    #[test]
    fn bright_pass_keeps_only_pixels_above_threshold() {
        let mut scene = HdrImage::filled(4, 4, [0.5, 0.5, 0.5]);
        scene.set(1, 2, [4.0, 3.0, 2.0]);
        scene.set(3, 0, [1.0, 1.0, 1.0]); // luminance exactly 1.0: not above

        let bright = scene.bright_pass(1.0);
        for y in 0..4 {
            for x in 0..4 {
                let src = scene.get(x, y);
                let out = bright.get(x, y);
                if luminance(src) > 1.0 {
                    assert_eq!(out, src);
                } else {
                    assert_eq!(out, [0.0; 3], "pixel ({x},{y}) should be black");
                }
            }
        }
        assert_eq!(bright.get(1, 2), [4.0, 3.0, 2.0]);
    }

    #[test]
    fn luminance_of_white_is_one() {
        assert_relative_eq!(luminance([1.0, 1.0, 1.0]), 1.0, epsilon = 1e-6);
    }

    // ── blur ──────────────────────────────────────────────────────────────

    #[test]
    fn kernel_sums_to_one() {
        let sum = BLUR_WEIGHTS[0] + 2.0 * BLUR_WEIGHTS[1..].iter().sum::<f32>();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn uniform_image_stays_uniform() {
        let img = HdrImage::filled(8, 6, [2.0, 1.0, 0.5]);
        let out = run_blur(&img, BlurSchedule::new(10));
        for c in &out.pixels {
            assert_relative_eq!(c[0], 2.0, epsilon = 1e-2);
            assert_relative_eq!(c[1], 1.0, epsilon = 1e-2);
            assert_relative_eq!(c[2], 0.5, epsilon = 1e-2);
        }
    }

    #[test]
    fn horizontal_step_only_spreads_along_rows() {
        let mut img = HdrImage::filled(9, 9, [0.0; 3]);
        img.set(4, 4, [1.0; 3]);

        let out = img.blur_1d(BlurDirection::Horizontal);
        assert_relative_eq!(out.get(4, 4)[0], BLUR_WEIGHTS[0]);
        assert_relative_eq!(out.get(3, 4)[0], BLUR_WEIGHTS[1]);
        assert_relative_eq!(out.get(5, 4)[0], BLUR_WEIGHTS[1]);
        assert_eq!(out.get(4, 3), [0.0; 3]);
        assert_eq!(out.get(4, 5), [0.0; 3]);
    }

    #[test]
    fn two_passes_spread_in_both_axes_symmetrically() {
        let mut img = HdrImage::filled(9, 9, [0.0; 3]);
        img.set(4, 4, [1.0; 3]);

        let out = run_blur(&img, BlurSchedule::new(2));
        assert_relative_eq!(out.get(2, 4)[0], out.get(4, 2)[0], epsilon = 1e-6);
        assert_relative_eq!(out.get(6, 6)[0], out.get(2, 2)[0], epsilon = 1e-6);
        assert!(out.get(3, 3)[0] > 0.0);
    }

    #[test]
    fn zero_iterations_return_bright_pass_unchanged() {
        let mut img = HdrImage::filled(3, 3, [0.0; 3]);
        img.set(1, 1, [5.0; 3]);
        assert_eq!(run_blur(&img, BlurSchedule::new(0)), img);
    }

    // ── composite ─────────────────────────────────────────────────────────

    #[test]
    fn disabled_bloom_ignores_blur_buffer() {
        let s = settings(false, 1.0);
        let scene = [0.8, 1.5, 0.2];
        let a = composite(scene, [0.0; 3], &s, true);
        let b = composite(scene, [9.0, 3.0, 100.0], &s, true);
        assert_eq!(a, b);
        assert_eq!(a, gamma_correct(tone_map(scene, 1.0), s.gamma));
    }

    #[test]
    fn enabled_bloom_adds_glow() {
        let s = settings(true, 1.0);
        let scene = [0.2, 0.2, 0.2];
        let plain = composite(scene, [0.0; 3], &s, false);
        let glow = composite(scene, [0.5, 0.5, 0.5], &s, false);
        assert!(glow[0] > plain[0]);
    }

    #[test]
    fn exposure_is_monotonic() {
        let colors = [[0.0, 0.0, 0.0], [0.05, 0.1, 0.2], [1.0, 1.0, 1.0], [12.0, 3.0, 0.4]];
        for c in colors {
            let mut prev = composite(c, [0.0; 3], &settings(false, 0.0), true);
            let mut exposure = 0.0;
            while exposure < 8.0 {
                exposure += 0.25;
                let next = composite(c, [0.0; 3], &settings(false, exposure), true);
                for ch in 0..3 {
                    assert!(next[ch] >= prev[ch], "exposure {exposure} darkened {c:?}");
                }
                prev = next;
            }
        }
    }

    #[test]
    fn tone_map_stays_in_display_range() {
        for v in [0.0, 0.5, 1.0, 10.0, 1000.0] {
            let out = tone_map([v; 3], 1.0);
            assert!((0.0..=1.0).contains(&out[0]));
        }
        assert_eq!(tone_map([0.0; 3], 1.0), [0.0; 3]);
    }

    #[test]
    fn gamma_is_skipped_for_srgb_surfaces() {
        let s = settings(false, 1.0);
        let scene = [0.3, 0.3, 0.3];
        assert_eq!(composite(scene, [0.0; 3], &s, false), tone_map(scene, 1.0));
    }
}
