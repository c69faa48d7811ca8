//! bmp-warp - affine warping of BMP images
//!
//! Pipeline: read BMP -> decode rows -> warp by the inverse transform ->
//! optional inversion -> encode rows -> write BMP with the original headers.
//!
//! Logging goes to stderr through `RUST_LOG` (default `info`); `-v` switches
//! to `debug`.

mod args;

use std::process::ExitCode;

use anyhow::{Context, Result};
use args::Args;
use bmp_warp::{AffineTransform, BmpImage, OpAffineTransform};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_transform(args: &Args, rows: usize, cols: usize) -> Result<AffineTransform> {
    let mut transform = match &args.matrix {
        Some(path) => AffineTransform::from_file(path)
            .with_context(|| format!("failed to read transform {}", path.display()))?,
        None => AffineTransform::identity(),
    };
    if let Some(angle) = args.rotate {
        let (px, py) = (args.pivot[0], args.pivot[1]);
        transform = transform.then(&AffineTransform::build_rotation(angle, px, py, rows, cols));
    }
    Ok(transform)
}

fn run(args: &Args) -> Result<()> {
    let mut bmp = BmpImage::read(&args.input)
        .with_context(|| format!("image did not open: {}", args.input.display()))?;
    info!(
        width = bmp.width(),
        height = bmp.height(),
        bits = bmp.bit_depth().bits(),
        "loaded {}",
        args.input.display()
    );

    let decoded = bmp.decode().context("failed to decode pixel array")?;

    let transform = build_transform(args, bmp.height(), bmp.width())?;
    let mut warp = OpAffineTransform::new(bmp.bit_depth());
    warp.set_transform(transform)
        .context("cannot warp by this transform")?
        .set_resampling(args.resample.to_resampling())
        .set_background(args.background);
    info!("applied transformation:\n{transform}");

    let mut warped = warp.apply(&decoded.matrix);
    if args.invert {
        warped.invert(bmp.bit_depth());
    }

    bmp.set_pixels(&warped)
        .context("failed to encode pixel array")?;
    bmp.write(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!("wrote {}", args.output.display());
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
