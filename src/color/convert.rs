//! Photometric conversions between color temperature, CIE 1931 and linear sRGB.
//!
//! All RGB values handled here are *linear* sRGB (no transfer curve applied),
//! which is what the ledstrip expects in its calibration data.

/// Lowest color temperature the Planckian locus approximation is valid for.
pub const MIN_CCT: f64 = 1667.0;

/// Highest color temperature the Planckian locus approximation is valid for.
pub const MAX_CCT: f64 = 25000.0;

/// XYZ to linear sRGB (D65 white point).
const XYZ_TO_SRGB: [[f64; 3]; 3] = [
    [3.2404542, -1.5371385, -0.4985314],
    [-0.9692660, 1.8760108, 0.0415560],
    [0.0556434, -0.2040259, 1.0572252],
];

/// Linear sRGB to XYZ (D65 white point).
const SRGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.4124564, 0.3575761, 0.1804375],
    [0.2126729, 0.7151522, 0.0721750],
    [0.0193339, 0.1191920, 0.9503041],
];

/// Clamp a level into `[0, 1]`. NaN becomes 0.
pub fn clip(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Apply gamma correction to a level, clipping it first.
pub fn gamma(level: f64, gamma: f64) -> f64 {
    clip(level).powf(gamma)
}

/// CIE 1931 xy chromaticity of a black body at `kelvin`.
///
/// Uses the cubic spline of Kang et al. (2002), "Design of Advanced Color
/// Temperature Control System for HDTV Applications". Temperatures outside
/// `[MIN_CCT, MAX_CCT]` are clamped into that range.
pub fn cct_to_xy(kelvin: f64) -> (f64, f64) {
    let t = kelvin.clamp(MIN_CCT, MAX_CCT);
    let t2 = t * t;
    let t3 = t2 * t;

    let x = if t <= 4000.0 {
        -0.2661239e9 / t3 - 0.2343589e6 / t2 + 0.8776956e3 / t + 0.179910
    } else {
        -3.0258469e9 / t3 + 2.1070379e6 / t2 + 0.2226347e3 / t + 0.240390
    };

    let x2 = x * x;
    let x3 = x2 * x;
    let y = if t <= 2222.0 {
        -1.1063814 * x3 - 1.34811020 * x2 + 2.18555832 * x - 0.20219683
    } else if t <= 4000.0 {
        -0.9549476 * x3 - 1.37418593 * x2 + 2.09137015 * x - 0.16748867
    } else {
        3.0817580 * x3 - 5.8733867 * x2 + 3.75112997 * x - 0.37001483
    };

    (x, y)
}

/// Convert xyY to XYZ. A zero `y` yields black.
pub fn xy_to_xyz(x: f64, y: f64, luminance: f64) -> [f64; 3] {
    if y == 0.0 {
        return [0.0, 0.0, 0.0];
    }
    [
        x * luminance / y,
        luminance,
        (1.0 - x - y) * luminance / y,
    ]
}

/// Chromaticity of an XYZ triple, `None` when it has no energy.
pub fn xyz_to_xy(xyz: [f64; 3]) -> Option<(f64, f64)> {
    let sum = xyz[0] + xyz[1] + xyz[2];
    if sum.abs() < f64::EPSILON {
        return None;
    }
    Some((xyz[0] / sum, xyz[1] / sum))
}

fn mul(matrix: &[[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    [
        matrix[0][0] * v[0] + matrix[0][1] * v[1] + matrix[0][2] * v[2],
        matrix[1][0] * v[0] + matrix[1][1] * v[1] + matrix[1][2] * v[2],
        matrix[2][0] * v[0] + matrix[2][1] * v[1] + matrix[2][2] * v[2],
    ]
}

/// XYZ to linear sRGB. Out-of-gamut colors produce negative channels.
pub fn xyz_to_linear_srgb(xyz: [f64; 3]) -> [f64; 3] {
    mul(&XYZ_TO_SRGB, xyz)
}

/// Linear sRGB to XYZ.
pub fn linear_srgb_to_xyz(rgb: [f64; 3]) -> [f64; 3] {
    mul(&SRGB_TO_XYZ, rgb)
}

/// Per-channel RGB factors that mix to a white of the given temperature.
///
/// Negative channels are clipped to 0 and the result is normalized so that
/// the largest channel is exactly 1.
pub fn kelvin_to_rgb(kelvin: f64) -> [f64; 3] {
    let (x, y) = cct_to_xy(kelvin);
    let rgb = xyz_to_linear_srgb(xy_to_xyz(x, y, 1.0)).map(|c| c.max(0.0));
    let max = rgb.iter().cloned().fold(0.0, f64::max);
    if max <= 0.0 {
        return [0.0, 0.0, 0.0];
    }
    rgb.map(|c| c / max)
}

/// Chromaticity of a linear sRGB color, `None` for black.
pub fn rgb_to_xy(r: f64, g: f64, b: f64) -> Option<(f64, f64)> {
    xyz_to_xy(linear_srgb_to_xyz([r, g, b]))
}
