//! Command-line argument definitions and type conversions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use bmp_warp::Resampling;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ResampleMethod {
    /// Nearest stored pixel
    Nearest,
    /// Per-channel weighted average of the 2x2 neighborhood
    Bilinear,
}

impl ResampleMethod {
    pub fn to_resampling(self) -> Resampling {
        match self {
            ResampleMethod::Nearest => Resampling::Nearest,
            ResampleMethod::Bilinear => Resampling::Bilinear,
        }
    }
}

/// Warp a BMP image by an affine transform.
///
/// The transform is the matrix from `--matrix` followed by the rotation from
/// `--rotate`. With neither given the image is copied through the identity.
#[derive(Parser, Debug)]
#[command(name = "bmp-warp", version, about)]
pub struct Args {
    /// Input BMP file
    pub input: PathBuf,

    /// Output BMP file
    pub output: PathBuf,

    /// Text file holding a 2x2 or 3x3 transform matrix, one row per line
    #[arg(short, long, value_name = "FILE")]
    pub matrix: Option<PathBuf>,

    /// Rotation angle in degrees
    #[arg(short, long, value_name = "DEG", allow_hyphen_values = true)]
    pub rotate: Option<f64>,

    /// Rotation pivot as proportions of the image height and width
    #[arg(long, num_args = 2, value_names = ["PX", "PY"], default_values_t = [0.5, 0.5])]
    pub pivot: Vec<f64>,

    /// Resampling strategy
    #[arg(long, value_enum, default_value_t = ResampleMethod::Bilinear)]
    pub resample: ResampleMethod,

    /// Pixel code written where the source has no data
    #[arg(long, default_value_t = 0)]
    pub background: u32,

    /// Invert every pixel code after warping
    #[arg(long)]
    pub invert: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
