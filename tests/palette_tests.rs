// Palette reference tests
//
// The palette is part of the platform contract: assets are quantized
// against it offline, so the generated table must match the reference
// byte for byte. The gray ramp below was computed by hand from the
// construction rule (two ramps of eight, floored linear steps).

use portatil::gpu::{build_palette, Gpu};

/// The 16 shades of row 0 (white/gray/black), identical per channel.
const GRAY_RAMP: [u8; 16] = [
    0, 18, 36, 54, 73, 91, 109, 128, 143, 159, 175, 191, 207, 223, 239, 255,
];

#[test]
fn test_palette_is_768_bytes() {
    let palette = build_palette();
    assert_eq!(palette.len(), 768);
}

#[test]
fn test_gray_ramp_matches_reference() {
    let palette = build_palette();

    for (shade, &expected) in GRAY_RAMP.iter().enumerate() {
        for channel in 0..3 {
            assert_eq!(
                palette[shade * 3 + channel],
                expected,
                "gray shade {} channel {}",
                shade,
                channel
            );
        }
    }
}

#[test]
fn test_red_row_endpoints() {
    let palette = build_palette();

    // Row 1 is red: min (32,0,0), mid (255,0,0) at shade 7, max
    // (255,224,224) at shade 15.
    let row = 1;
    assert_eq!(&palette[(row * 16) * 3..(row * 16) * 3 + 3], &[32, 0, 0]);
    assert_eq!(
        &palette[(row * 16 + 7) * 3..(row * 16 + 7) * 3 + 3],
        &[255, 0, 0]
    );
    assert_eq!(
        &palette[(row * 16 + 15) * 3..(row * 16 + 15) * 3 + 3],
        &[255, 224, 224]
    );
}

#[test]
fn test_teal_row_endpoints() {
    let palette = build_palette();

    // Row 9 is teal: min (0,32,32), mid (0,255,255), max (224,255,255).
    let row = 9;
    assert_eq!(&palette[(row * 16) * 3..(row * 16) * 3 + 3], &[0, 32, 32]);
    assert_eq!(
        &palette[(row * 16 + 7) * 3..(row * 16 + 7) * 3 + 3],
        &[0, 255, 255]
    );
    assert_eq!(
        &palette[(row * 16 + 15) * 3..(row * 16 + 15) * 3 + 3],
        &[224, 255, 255]
    );
}

#[test]
fn test_palette_is_deterministic() {
    assert_eq!(build_palette().to_vec(), build_palette().to_vec());
}

#[test]
fn test_nearest_color_is_argmin_of_weighted_distance() {
    let gpu = Gpu::new();
    let palette = *gpu.palette();

    let weighted_distance = |index: usize, r: u8, g: u8, b: u8| -> i64 {
        let dr = palette[index * 3] as i64 - r as i64;
        let dg = palette[index * 3 + 1] as i64 - g as i64;
        let db = palette[index * 3 + 2] as i64 - b as i64;
        2 * dr * dr + 4 * dg * dg + 3 * db * db
    };

    // Probe a spread of colors; the lookup result must never be beaten by
    // any other palette entry.
    for &(r, g, b) in &[
        (0u8, 0u8, 0u8),
        (255, 255, 255),
        (255, 0, 0),
        (10, 200, 30),
        (100, 100, 240),
        (17, 93, 211),
        (250, 128, 5),
    ] {
        let found = gpu.nearest_color_index(r, g, b) as usize;
        let found_distance = weighted_distance(found, r, g, b);

        for index in 0..256 {
            assert!(
                weighted_distance(index, r, g, b) >= found_distance,
                "entry {} beats the lookup result {} for ({}, {}, {})",
                index,
                found,
                r,
                g,
                b
            );
        }
    }
}

#[test]
fn test_palette_round_trips_through_lookup() {
    let gpu = Gpu::new();
    let palette = *gpu.palette();

    for index in 0..256 {
        let r = palette[index * 3];
        let g = palette[index * 3 + 1];
        let b = palette[index * 3 + 2];
        let found = gpu.nearest_color_index(r, g, b) as usize;

        assert_eq!(
            [palette[found * 3], palette[found * 3 + 1], palette[found * 3 + 2]],
            [r, g, b],
            "palette entry {} should resolve to an identical color",
            index
        );
    }
}
