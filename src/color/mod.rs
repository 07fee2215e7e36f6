//! Color arithmetic: gamma, color temperature mixing and RGBW conversion.

mod convert;
mod rgbw;

pub use convert::{
    cct_to_xy, clip, gamma, kelvin_to_rgb, linear_srgb_to_xyz, rgb_to_xy, xy_to_xyz,
    xyz_to_linear_srgb, xyz_to_xy, MAX_CCT, MIN_CCT,
};
pub use rgbw::{Colorspace, Rgbw};
