use bmp_warp::{
    AffineTransform, BitDepth, OpAffineTransform, PixelMatrix, Resampling, RowCodec, RowOrder,
    sample_bilinear, sample_nearest,
};
use proptest::prelude::*;

fn fill_codes(rows: usize, cols: usize, depth: BitDepth, seed: &[u32]) -> PixelMatrix {
    let mut matrix = PixelMatrix::new(rows, cols, 0);
    for r in 0..rows {
        for c in 0..cols {
            matrix.set(r, c, seed[(r * cols + c) % seed.len()] & depth.code_mask());
        }
    }
    matrix
}

fn depth_strategy() -> impl Strategy<Value = BitDepth> {
    prop::sample::select(BitDepth::ALL.to_vec())
}

fn resampling_strategy() -> impl Strategy<Value = Resampling> {
    prop::sample::select(vec![Resampling::Nearest, Resampling::Bilinear])
}

#[test]
fn test_rgba_two_by_two_identity() {
    let src = PixelMatrix::from_rows(&[[0x0000_0000u32, 0xFFFF_FFFF], [0xFFFF_FFFF, 0x0000_0000]]);
    let op = OpAffineTransform::new(BitDepth::ThirtyTwo);
    assert_eq!(op.apply(&src), src);
}

#[test]
fn test_quarter_turn_moves_corner() {
    // Pivot (4 * 0.5 - 1, 4 * 0.5 - 1) = (1, 1).
    let mut src = PixelMatrix::new(4, 4, 0);
    src.set(0, 1, 200);
    let mut op = OpAffineTransform::new(BitDepth::Eight);
    op.set_rotation(90.0, 0.5, 0.5).set_resampling(Resampling::Nearest);
    let out = op.apply(&src);

    let forward = op.forward_transform(4, 4);
    let (x, y) = forward.map_point(0.0, 1.0);
    let (r, c) = (x.round() as usize, y.round() as usize);
    assert_eq!(out.get(r, c), 200);
    assert_eq!(out.as_slice().iter().filter(|&&v| v != 0).count(), 1);
}

#[test]
fn test_shape_error_falls_back_to_identity() {
    let src = fill_codes(3, 4, BitDepth::Eight, &[5, 17, 99, 250, 3]);
    let transform = AffineTransform::parse("1 2 3\n4 5 6\n").expect("numeric");
    let mut op = OpAffineTransform::new(BitDepth::Eight);
    op.set_transform(transform).expect("identity is invertible");
    assert_eq!(op.apply(&src), src);
}

#[test]
fn test_packed_translation_with_background() {
    let src = PixelMatrix::from_rows(&[[0x0102_03u32, 0x0405_06], [0x0708_09, 0x0A0B_0C]]);
    let codec = RowCodec::new(2, BitDepth::TwentyFour);
    let packed = codec.encode_image(&src).expect("width");

    let mut op = OpAffineTransform::new(BitDepth::TwentyFour);
    op.set_transform(AffineTransform::translation(1.0, 0.0))
        .expect("invertible")
        .set_background(0xFF_FFFF);
    let out = op
        .apply_packed(&packed, 2, 2, RowOrder::BottomUp)
        .expect("complete");
    let warped = codec.decode_image(&out.data, 2).expect("complete").matrix;
    assert_eq!(
        warped,
        PixelMatrix::from_rows(&[[0xFF_FFFFu32, 0xFF_FFFF], [0x0102_03, 0x0405_06]])
    );
}

#[test]
fn test_half_pixel_shift_leaves_border_as_background() {
    let src = PixelMatrix::new(2, 2, 200);
    let mut op = OpAffineTransform::new(BitDepth::Eight);
    op.set_transform(AffineTransform::translation(0.5, 0.0))
        .expect("invertible");
    // Row 0 maps back to x = -0.5, where the upper taps fall off the image.
    assert_eq!(
        op.apply(&src),
        PixelMatrix::from_rows(&[[0u32, 0], [200, 200]])
    );

    op.set_transform(AffineTransform::translation(0.0, -0.5))
        .expect("invertible")
        .set_background(9);
    assert_eq!(
        op.apply(&src),
        PixelMatrix::from_rows(&[[200u32, 9], [200, 9]])
    );
}

#[test]
fn test_invert_after_warp() {
    let src = PixelMatrix::from_rows(&[[0u32, 1, 1], [1, 0, 0]]);
    let op = OpAffineTransform::new(BitDepth::One);
    let mut out = op.apply(&src);
    out.invert(BitDepth::One);
    assert_eq!(out, PixelMatrix::from_rows(&[[1u32, 0, 0], [0, 1, 1]]));
}

proptest! {
    #[test]
    fn prop_identity_preserves_every_pixel(
        depth in depth_strategy(),
        resampling in resampling_strategy(),
        rows in 1usize..10,
        cols in 1usize..10,
        seed in prop::collection::vec(any::<u32>(), 1..32),
    ) {
        let src = fill_codes(rows, cols, depth, &seed);
        let mut op = OpAffineTransform::new(depth);
        op.set_resampling(resampling);
        prop_assert_eq!(op.apply(&src), src);
    }

    #[test]
    fn prop_zero_rotation_is_identity(
        depth in depth_strategy(),
        resampling in resampling_strategy(),
        pivot_x in 0.0f64..1.0,
        pivot_y in 0.0f64..1.0,
        seed in prop::collection::vec(any::<u32>(), 1..32),
    ) {
        let src = fill_codes(6, 5, depth, &seed);
        let mut op = OpAffineTransform::new(depth);
        op.set_rotation(0.0, pivot_x, pivot_y).set_resampling(resampling);
        prop_assert_eq!(op.apply(&src), src);
    }

    #[test]
    fn prop_inverse_of_inverse_is_original(
        angle in -180.0f64..180.0,
        sx in 0.25f64..4.0,
        sy in 0.25f64..4.0,
        tx in -50.0f64..50.0,
        ty in -50.0f64..50.0,
    ) {
        let t = AffineTransform::rotation(angle, 3.0, 7.0)
            .then(&AffineTransform::scale(sx, sy))
            .then(&AffineTransform::translation(tx, ty));
        let inv = t.invert().expect("invertible");
        prop_assert!(inv.invert().expect("invertible").approx_eq(&t, 1e-9));
        prop_assert!(t.then(&inv).approx_eq(&AffineTransform::identity(), 1e-9));
    }

    #[test]
    fn prop_bilinear_matches_nearest_on_the_grid(
        depth in depth_strategy(),
        seed in prop::collection::vec(any::<u32>(), 1..32),
        r in 0usize..5,
        c in 0usize..7,
        background in any::<u32>(),
    ) {
        let src = fill_codes(5, 7, depth, &seed);
        let background = background & depth.code_mask();
        let (x, y) = (r as f64, c as f64);
        let bilinear = sample_bilinear(&src, x, y, depth, background);
        prop_assert_eq!(bilinear, sample_nearest(&src, x, y, background));
        prop_assert_eq!(bilinear, src.get(r, c));
    }
}
