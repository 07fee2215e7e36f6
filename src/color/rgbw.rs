//! RGBW colors and the transfer-to-white colorspace.

use serde::{Deserialize, Serialize};

use super::convert::{clip, kelvin_to_rgb};

/// A four-channel ledstrip color. Channel values are levels in `[0, 1]`
/// once passed through [`Rgbw::clipped`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rgbw {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub w: f64,
}

impl Rgbw {
    /// All channels off.
    pub const OFF: Rgbw = Rgbw {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        w: 0.0,
    };

    pub fn new(r: f64, g: f64, b: f64, w: f64) -> Self {
        Self { r, g, b, w }
    }

    /// Only the RGB channels lit.
    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self::new(r, g, b, 0.0)
    }

    /// Only the white channel lit.
    pub fn white(w: f64) -> Self {
        Self::new(0.0, 0.0, 0.0, w)
    }

    /// Clamp every channel into `[0, 1]`.
    pub fn clipped(self) -> Self {
        Self::new(clip(self.r), clip(self.g), clip(self.b), clip(self.w))
    }

    /// The clipped channels in ledstrip `calibrationData` order.
    pub fn to_array(self) -> [f64; 4] {
        let c = self.clipped();
        [c.r, c.g, c.b, c.w]
    }

    /// Largest channel value (unclipped).
    pub fn max_channel(&self) -> f64 {
        self.r.max(self.g).max(self.b).max(self.w)
    }

    /// Whether every channel already lies in `[0, 1]`.
    pub fn in_range(&self) -> bool {
        [self.r, self.g, self.b, self.w]
            .iter()
            .all(|c| (0.0..=1.0).contains(c))
    }
}

/// Converts color temperature + brightness into RGBW, moving as much light as
/// possible onto the white LED.
///
/// `white_brightness` is the output of the white LED at full level relative to
/// the RGB LEDs at full level mixing the same temperature. A brightness of 1.0
/// in [`Colorspace::to_rgbw`] means "as bright as the RGB LEDs alone".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Colorspace {
    pub white_temperature: f64,
    pub white_brightness: f64,
    white_rgb: [f64; 3],
}

impl Default for Colorspace {
    fn default() -> Self {
        Self::new(4000.0, 1.0)
    }
}

impl Colorspace {
    pub fn new(white_temperature: f64, white_brightness: f64) -> Self {
        let white_rgb = kelvin_to_rgb(white_temperature).map(|c| c * white_brightness);
        Self {
            white_temperature,
            white_brightness,
            white_rgb,
        }
    }

    /// Share of the target that the white LED can carry at brightness 1.
    fn white_share(&self, target: [f64; 3]) -> f64 {
        target
            .iter()
            .zip(self.white_rgb.iter())
            .filter(|(_, &white)| white > 0.0)
            .map(|(t, white)| t / white)
            .fold(f64::INFINITY, f64::min)
    }

    /// RGBW rendering of a white at `temperature` and `brightness`.
    ///
    /// The result is not clipped: channels above 1 mean the requested
    /// brightness cannot be rendered with the correct color.
    pub fn to_rgbw(&self, temperature: f64, brightness: f64) -> Rgbw {
        let target = kelvin_to_rgb(temperature).map(|c| c * brightness.max(0.0));
        let share = self.white_share(target);
        let w = if share.is_finite() { share.min(1.0) } else { 0.0 };
        let residue: Vec<f64> = target
            .iter()
            .zip(self.white_rgb.iter())
            .map(|(t, white)| (t - w * white).max(0.0))
            .collect();
        Rgbw::new(residue[0], residue[1], residue[2], w)
    }

    /// Largest brightness at `temperature` whose RGBW rendering fits in `[0, 1]`.
    pub fn max_level_correct_color(&self, temperature: f64) -> f64 {
        let target = kelvin_to_rgb(temperature);
        let share = self.white_share(target);
        if !share.is_finite() || share <= 0.0 {
            // White LED cannot contribute, RGB alone limits the level
            let max = target.iter().cloned().fold(0.0, f64::max);
            return if max > 0.0 { 1.0 / max } else { 0.0 };
        }

        // While the white LED is not saturated the residue grows linearly
        let slope = target
            .iter()
            .zip(self.white_rgb.iter())
            .map(|(t, white)| t - share * white)
            .fold(0.0, f64::max);
        let saturation = 1.0 / share;
        let linear_limit = if slope > 0.0 { 1.0 / slope } else { f64::INFINITY };
        if linear_limit <= saturation {
            return linear_limit;
        }

        // Past saturation W stays at 1 and the residue carries the rest
        target
            .iter()
            .zip(self.white_rgb.iter())
            .filter(|(t, _)| **t > 0.0)
            .map(|(t, white)| (1.0 + white) / t)
            .fold(f64::INFINITY, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_rgbw_clipped() {
        let c = Rgbw::new(-0.1, 0.5, 1.5, 0.9).clipped();
        assert_eq!(c, Rgbw::new(0.0, 0.5, 1.0, 0.9));
        assert!(c.in_range());
        assert_eq!(Rgbw::new(2.0, 0.0, 0.0, -1.0).to_array(), [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_matching_white_goes_entirely_to_w() {
        let space = Colorspace::new(3000.0, 1.0);
        let c = space.to_rgbw(3000.0, 0.6);
        assert!(close(c.w, 0.6));
        assert!(c.r < 1e-9 && c.g < 1e-9 && c.b < 1e-9);
    }

    #[test]
    fn test_white_saturates_then_rgb_takes_over() {
        let space = Colorspace::new(3000.0, 1.0);
        let c = space.to_rgbw(3000.0, 1.5);
        assert!(close(c.w, 1.0));
        assert!(close(c.r, 0.5));
        assert!(c.in_range());
        assert!(close(space.max_level_correct_color(3000.0), 2.0));
    }

    #[test]
    fn test_other_temperature_leaves_residue() {
        let space = Colorspace::new(4000.0, 1.0);
        let c = space.to_rgbw(2700.0, 0.5);
        assert!(c.w > 0.0 && c.w < 0.5);
        // Warmer than the white LED, so red has to be added
        assert!(c.r > 0.0);
        assert!(c.b < 1e-9);
    }

    #[test]
    fn test_dim_white_led_raises_w_level() {
        let bright = Colorspace::new(3000.0, 1.0).to_rgbw(3000.0, 0.4);
        let dim = Colorspace::new(3000.0, 0.5).to_rgbw(3000.0, 0.4);
        assert!(close(bright.w, 0.4));
        assert!(close(dim.w, 0.8));
    }

    #[test]
    fn test_max_level_renders_in_range() {
        let space = Colorspace::new(4000.0, 0.8);
        for temperature in [2200.0, 2700.0, 4000.0, 5500.0, 8000.0] {
            let level = space.max_level_correct_color(temperature);
            assert!(level > 0.0);
            let c = space.to_rgbw(temperature, level);
            assert!(c.max_channel() <= 1.0 + 1e-9, "{} K: {:?}", temperature, c);
            let over = space.to_rgbw(temperature, level * 1.01);
            assert!(over.max_channel() > 1.0, "{} K: {:?}", temperature, over);
        }
    }

    #[test]
    fn test_zero_brightness_is_off() {
        let c = Colorspace::default().to_rgbw(2700.0, 0.0);
        assert_eq!(c, Rgbw::OFF);
    }
}
