// Palette - procedurally built 256-color table
//
// The palette is 16 hue rows of 16 shades each. Every row is described by a
// (min, mid, max) RGB triple and expanded with two piecewise-linear ramps:
// eight steps from min toward mid, then eight from mid toward max. The
// construction is deterministic and byte-for-byte reproducible, which the
// image packer relies on when quantizing assets.

/// Number of palette entries.
pub const PALETTE_COLORS: usize = 256;

/// Size of the palette in bytes (RGB triples).
pub const PALETTE_BYTES: usize = PALETTE_COLORS * 3;

/// Darkest shade of each hue row.
const MIN_VALUES: [u8; 48] = [
    0, 0, 0, // white/gray/black
    32, 0, 0, // red
    32, 8, 0, // red/orange
    32, 16, 0, // orange
    32, 16, 0, // orange/yellow
    32, 32, 0, // yellow
    16, 32, 0, // lime
    0, 32, 0, // green
    0, 32, 16, // green/teal
    0, 32, 32, // teal
    0, 16, 32, // teal/blue
    0, 0, 32, // blue
    8, 0, 32, // blue/purple
    16, 0, 32, // purple
    32, 0, 32, // fuchsia
    32, 0, 16, // fuchsia/red
];

/// Full-saturation midpoint of each hue row.
const MID_VALUES: [u8; 48] = [
    128, 128, 128, // white/gray/black
    255, 0, 0, // red
    255, 64, 0, // red/orange
    255, 128, 0, // orange
    255, 192, 0, // orange/yellow
    255, 255, 0, // yellow
    128, 255, 0, // lime
    0, 255, 0, // green
    0, 255, 128, // green/teal
    0, 255, 255, // teal
    0, 128, 255, // teal/blue
    0, 0, 255, // blue
    64, 0, 255, // blue/purple
    128, 0, 255, // purple
    255, 0, 255, // fuchsia
    255, 0, 128, // fuchsia/red
];

/// Brightest, washed-out shade of each hue row.
const MAX_VALUES: [u8; 48] = [
    255, 255, 255, // white/gray/black
    255, 224, 224, // red
    255, 224, 224, // red/orange
    255, 240, 224, // orange
    255, 255, 224, // orange/yellow
    255, 255, 224, // yellow
    240, 255, 224, // lime
    224, 255, 224, // green
    224, 255, 240, // green/teal
    224, 255, 255, // teal
    224, 240, 255, // teal/blue
    224, 224, 255, // blue
    240, 224, 255, // blue/purple
    240, 224, 255, // purple
    255, 224, 255, // fuchsia
    255, 224, 240, // fuchsia/red
];

/// Build the 256-entry RGB palette.
///
/// Each row contributes 16 colors: indices 0..8 ramp from min to mid in
/// eight steps of `(mid - min) / 7`, indices 8..16 ramp from mid to max in
/// eight steps of `(max - mid) / 8`. Interpolated channels are floored.
pub fn build_palette() -> [u8; PALETTE_BYTES] {
    let mut palette = [0u8; PALETTE_BYTES];
    let mut color_index = 0;

    for row in 0..16 {
        let min = &MIN_VALUES[row * 3..row * 3 + 3];
        let mid = &MID_VALUES[row * 3..row * 3 + 3];
        let max = &MAX_VALUES[row * 3..row * 3 + 3];

        for column in 0..8u32 {
            for channel in 0..3 {
                let step = (mid[channel] as f32 - min[channel] as f32) / 7.0;
                let value = min[channel] as i32 + (column as f32 * step).floor() as i32;
                palette[color_index * 3 + channel] = value as u8;
            }
            color_index += 1;
        }

        for column in 1..9u32 {
            for channel in 0..3 {
                let step = (max[channel] as f32 - mid[channel] as f32) / 8.0;
                let value = mid[channel] as i32 + (column as f32 * step).floor() as i32;
                palette[color_index * 3 + channel] = value as u8;
            }
            color_index += 1;
        }
    }

    palette
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_has_256_entries() {
        let palette = build_palette();
        assert_eq!(palette.len(), 768);
    }

    #[test]
    fn test_each_row_starts_at_min() {
        let palette = build_palette();
        for row in 0..16 {
            let entry = row * 16 * 3;
            assert_eq!(
                &palette[entry..entry + 3],
                &MIN_VALUES[row * 3..row * 3 + 3],
                "row {} shade 0 should be the row minimum",
                row
            );
        }
    }

    #[test]
    fn test_each_row_ends_at_max() {
        let palette = build_palette();
        for row in 0..16 {
            let entry = (row * 16 + 15) * 3;
            assert_eq!(
                &palette[entry..entry + 3],
                &MAX_VALUES[row * 3..row * 3 + 3],
                "row {} shade 15 should be the row maximum",
                row
            );
        }
    }

    #[test]
    fn test_each_row_hits_mid_at_shade_seven() {
        let palette = build_palette();
        for row in 0..16 {
            let entry = (row * 16 + 7) * 3;
            assert_eq!(
                &palette[entry..entry + 3],
                &MID_VALUES[row * 3..row * 3 + 3],
                "row {} shade 7 should be the row midpoint",
                row
            );
        }
    }
}
