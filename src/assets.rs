// Built-in assets - default font atlas and battery icon
//
// The default font is stored as packed glyph rows (one byte per row, the
// high six bits are the pixel columns) and expanded into an indexed-color
// atlas on first use: 16 glyphs per atlas row, 8 rows, covering codepoints
// 0 through 127. Pixel value 1 is glyph ink, 0 is background; callers make
// the background transparent when they want it gone.

use std::sync::OnceLock;

use crate::gpu::Image;

/// Glyph cell width in the default font.
pub const FONT_CHAR_WIDTH: u8 = 6;

/// Glyph cell height in the default font.
pub const FONT_CHAR_HEIGHT: u8 = 8;

/// Atlas width: 16 glyphs per row.
pub const FONT_ATLAS_WIDTH: u16 = 16 * FONT_CHAR_WIDTH as u16;

/// Atlas height: 8 glyph rows.
pub const FONT_ATLAS_HEIGHT: u16 = 8 * FONT_CHAR_HEIGHT as u16;

/// Palette index used for glyph ink.
const INK: u8 = 15;

/// Battery icon cell size.
pub const BATTERY_CELL_WIDTH: u16 = 8;
pub const BATTERY_CELL_HEIGHT: u16 = 6;

/// Palette index of the battery outline (white).
const BATTERY_OUTLINE: u8 = 15;

/// Palette index of the battery charge bar (green).
const BATTERY_FILL: u8 = 119;

/// Palette index of the low-battery outline (red).
const BATTERY_WARNING: u8 = 23;

/// Packed glyph rows for codepoints 32..=126. Control characters and DEL
/// render blank.
#[rustfmt::skip]
const GLYPH_ROWS: [[u8; 8]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // space
    [0x20, 0x20, 0x20, 0x20, 0x20, 0x00, 0x20, 0x00], // !
    [0x50, 0x50, 0x50, 0x00, 0x00, 0x00, 0x00, 0x00], // "
    [0x50, 0x50, 0xF8, 0x50, 0xF8, 0x50, 0x50, 0x00], // #
    [0x20, 0x78, 0xA0, 0x70, 0x28, 0xF0, 0x20, 0x00], // $
    [0xC0, 0xC8, 0x10, 0x20, 0x40, 0x98, 0x18, 0x00], // %
    [0x40, 0xA0, 0xA0, 0x40, 0xA8, 0x90, 0x68, 0x00], // &
    [0x20, 0x20, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00], // '
    [0x10, 0x20, 0x40, 0x40, 0x40, 0x20, 0x10, 0x00], // (
    [0x40, 0x20, 0x10, 0x10, 0x10, 0x20, 0x40, 0x00], // )
    [0x00, 0x20, 0xA8, 0x70, 0xA8, 0x20, 0x00, 0x00], // *
    [0x00, 0x20, 0x20, 0xF8, 0x20, 0x20, 0x00, 0x00], // +
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x20, 0x20, 0x40], // ,
    [0x00, 0x00, 0x00, 0xF8, 0x00, 0x00, 0x00, 0x00], // -
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x60, 0x60, 0x00], // .
    [0x00, 0x08, 0x10, 0x20, 0x40, 0x80, 0x00, 0x00], // /
    [0x70, 0x88, 0x98, 0xA8, 0xC8, 0x88, 0x70, 0x00], // 0
    [0x20, 0x60, 0x20, 0x20, 0x20, 0x20, 0x70, 0x00], // 1
    [0x70, 0x88, 0x08, 0x10, 0x20, 0x40, 0xF8, 0x00], // 2
    [0xF8, 0x10, 0x20, 0x10, 0x08, 0x88, 0x70, 0x00], // 3
    [0x10, 0x30, 0x50, 0x90, 0xF8, 0x10, 0x10, 0x00], // 4
    [0xF8, 0x80, 0xF0, 0x08, 0x08, 0x88, 0x70, 0x00], // 5
    [0x30, 0x40, 0x80, 0xF0, 0x88, 0x88, 0x70, 0x00], // 6
    [0xF8, 0x08, 0x10, 0x20, 0x40, 0x40, 0x40, 0x00], // 7
    [0x70, 0x88, 0x88, 0x70, 0x88, 0x88, 0x70, 0x00], // 8
    [0x70, 0x88, 0x88, 0x78, 0x08, 0x10, 0x60, 0x00], // 9
    [0x00, 0x60, 0x60, 0x00, 0x60, 0x60, 0x00, 0x00], // :
    [0x00, 0x60, 0x60, 0x00, 0x60, 0x20, 0x40, 0x00], // ;
    [0x10, 0x20, 0x40, 0x80, 0x40, 0x20, 0x10, 0x00], // <
    [0x00, 0x00, 0xF8, 0x00, 0xF8, 0x00, 0x00, 0x00], // =
    [0x40, 0x20, 0x10, 0x08, 0x10, 0x20, 0x40, 0x00], // >
    [0x70, 0x88, 0x08, 0x10, 0x20, 0x00, 0x20, 0x00], // ?
    [0x70, 0x88, 0xB8, 0xA8, 0xB0, 0x80, 0x78, 0x00], // @
    [0x70, 0x88, 0x88, 0xF8, 0x88, 0x88, 0x88, 0x00], // A
    [0xF0, 0x88, 0x88, 0xF0, 0x88, 0x88, 0xF0, 0x00], // B
    [0x70, 0x88, 0x80, 0x80, 0x80, 0x88, 0x70, 0x00], // C
    [0xE0, 0x90, 0x88, 0x88, 0x88, 0x90, 0xE0, 0x00], // D
    [0xF8, 0x80, 0x80, 0xF0, 0x80, 0x80, 0xF8, 0x00], // E
    [0xF8, 0x80, 0x80, 0xF0, 0x80, 0x80, 0x80, 0x00], // F
    [0x70, 0x88, 0x80, 0xB8, 0x88, 0x88, 0x78, 0x00], // G
    [0x88, 0x88, 0x88, 0xF8, 0x88, 0x88, 0x88, 0x00], // H
    [0x70, 0x20, 0x20, 0x20, 0x20, 0x20, 0x70, 0x00], // I
    [0x38, 0x10, 0x10, 0x10, 0x10, 0x90, 0x60, 0x00], // J
    [0x88, 0x90, 0xA0, 0xC0, 0xA0, 0x90, 0x88, 0x00], // K
    [0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0xF8, 0x00], // L
    [0x88, 0xD8, 0xA8, 0xA8, 0x88, 0x88, 0x88, 0x00], // M
    [0x88, 0xC8, 0xA8, 0x98, 0x88, 0x88, 0x88, 0x00], // N
    [0x70, 0x88, 0x88, 0x88, 0x88, 0x88, 0x70, 0x00], // O
    [0xF0, 0x88, 0x88, 0xF0, 0x80, 0x80, 0x80, 0x00], // P
    [0x70, 0x88, 0x88, 0x88, 0xA8, 0x90, 0x68, 0x00], // Q
    [0xF0, 0x88, 0x88, 0xF0, 0xA0, 0x90, 0x88, 0x00], // R
    [0x78, 0x80, 0x80, 0x70, 0x08, 0x08, 0xF0, 0x00], // S
    [0xF8, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x00], // T
    [0x88, 0x88, 0x88, 0x88, 0x88, 0x88, 0x70, 0x00], // U
    [0x88, 0x88, 0x88, 0x88, 0x88, 0x50, 0x20, 0x00], // V
    [0x88, 0x88, 0x88, 0xA8, 0xA8, 0xA8, 0x50, 0x00], // W
    [0x88, 0x88, 0x50, 0x20, 0x50, 0x88, 0x88, 0x00], // X
    [0x88, 0x88, 0x88, 0x50, 0x20, 0x20, 0x20, 0x00], // Y
    [0xF8, 0x08, 0x10, 0x20, 0x40, 0x80, 0xF8, 0x00], // Z
    [0x70, 0x40, 0x40, 0x40, 0x40, 0x40, 0x70, 0x00], // [
    [0x00, 0x80, 0x40, 0x20, 0x10, 0x08, 0x00, 0x00], // backslash
    [0x70, 0x10, 0x10, 0x10, 0x10, 0x10, 0x70, 0x00], // ]
    [0x20, 0x50, 0x88, 0x00, 0x00, 0x00, 0x00, 0x00], // ^
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xF8, 0x00], // _
    [0x40, 0x20, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00], // `
    [0x00, 0x00, 0x70, 0x08, 0x78, 0x88, 0x78, 0x00], // a
    [0x80, 0x80, 0xF0, 0x88, 0x88, 0x88, 0xF0, 0x00], // b
    [0x00, 0x00, 0x70, 0x88, 0x80, 0x88, 0x70, 0x00], // c
    [0x08, 0x08, 0x78, 0x88, 0x88, 0x88, 0x78, 0x00], // d
    [0x00, 0x00, 0x70, 0x88, 0xF8, 0x80, 0x70, 0x00], // e
    [0x30, 0x48, 0x40, 0xE0, 0x40, 0x40, 0x40, 0x00], // f
    [0x00, 0x00, 0x78, 0x88, 0x78, 0x08, 0x70, 0x00], // g
    [0x80, 0x80, 0xF0, 0x88, 0x88, 0x88, 0x88, 0x00], // h
    [0x20, 0x00, 0x60, 0x20, 0x20, 0x20, 0x70, 0x00], // i
    [0x10, 0x00, 0x30, 0x10, 0x10, 0x90, 0x60, 0x00], // j
    [0x80, 0x80, 0x90, 0xA0, 0xC0, 0xA0, 0x90, 0x00], // k
    [0x60, 0x20, 0x20, 0x20, 0x20, 0x20, 0x70, 0x00], // l
    [0x00, 0x00, 0xD0, 0xA8, 0xA8, 0xA8, 0xA8, 0x00], // m
    [0x00, 0x00, 0xF0, 0x88, 0x88, 0x88, 0x88, 0x00], // n
    [0x00, 0x00, 0x70, 0x88, 0x88, 0x88, 0x70, 0x00], // o
    [0x00, 0x00, 0xF0, 0x88, 0xF0, 0x80, 0x80, 0x00], // p
    [0x00, 0x00, 0x78, 0x88, 0x78, 0x08, 0x08, 0x00], // q
    [0x00, 0x00, 0xB0, 0xC8, 0x80, 0x80, 0x80, 0x00], // r
    [0x00, 0x00, 0x78, 0x80, 0x70, 0x08, 0xF0, 0x00], // s
    [0x40, 0x40, 0xE0, 0x40, 0x40, 0x48, 0x30, 0x00], // t
    [0x00, 0x00, 0x88, 0x88, 0x88, 0x98, 0x68, 0x00], // u
    [0x00, 0x00, 0x88, 0x88, 0x88, 0x50, 0x20, 0x00], // v
    [0x00, 0x00, 0x88, 0x88, 0xA8, 0xA8, 0x50, 0x00], // w
    [0x00, 0x00, 0x88, 0x50, 0x20, 0x50, 0x88, 0x00], // x
    [0x00, 0x00, 0x88, 0x88, 0x78, 0x08, 0x70, 0x00], // y
    [0x00, 0x00, 0xF8, 0x10, 0x20, 0x40, 0xF8, 0x00], // z
    [0x10, 0x20, 0x20, 0x40, 0x20, 0x20, 0x10, 0x00], // {
    [0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x00], // |
    [0x40, 0x20, 0x20, 0x10, 0x20, 0x20, 0x40, 0x00], // }
    [0x00, 0x00, 0x40, 0xA8, 0x10, 0x00, 0x00, 0x00], // ~
];

fn font_atlas() -> &'static [u8] {
    static ATLAS: OnceLock<Vec<u8>> = OnceLock::new();
    ATLAS.get_or_init(|| {
        let width = FONT_ATLAS_WIDTH as usize;
        let mut pixels = vec![0u8; width * FONT_ATLAS_HEIGHT as usize];

        for codepoint in 32usize..127 {
            let rows = &GLYPH_ROWS[codepoint - 32];
            let cell_x = (codepoint % 16) * FONT_CHAR_WIDTH as usize;
            let cell_y = (codepoint / 16) * FONT_CHAR_HEIGHT as usize;

            for (row, bits) in rows.iter().enumerate() {
                for column in 0..FONT_CHAR_WIDTH as usize {
                    if bits & (0x80 >> column) != 0 {
                        pixels[(cell_y + row) * width + cell_x + column] = INK;
                    }
                }
            }
        }

        pixels
    })
}

/// The built-in font atlas as an indexed image.
pub fn default_font_image() -> Image<'static> {
    Image {
        width: FONT_ATLAS_WIDTH,
        height: FONT_ATLAS_HEIGHT,
        data: font_atlas(),
    }
}

/// Packed rows of the shell's 8x8 folder icon.
#[rustfmt::skip]
const FOLDER_ICON_ROWS: [u8; 8] = [
    0x00, 0x78, 0xFE, 0x82, 0x82, 0x82, 0xFE, 0x00,
];

/// Packed rows of the shell's 8x8 program (cartridge) icon.
#[rustfmt::skip]
const PROGRAM_ICON_ROWS: [u8; 8] = [
    0x00, 0x3C, 0x7E, 0x5A, 0x7E, 0x66, 0x3C, 0x00,
];

/// Palette index of the folder icon (yellow).
const FOLDER_INK: u8 = 87;

/// Palette index of the program icon (teal).
const PROGRAM_INK: u8 = 151;

fn expand_icon(rows: &[u8; 8], ink: u8) -> Vec<u8> {
    let mut pixels = vec![0u8; 64];
    for (row, bits) in rows.iter().enumerate() {
        for column in 0..8 {
            if bits & (0x80 >> column) != 0 {
                pixels[row * 8 + column] = ink;
            }
        }
    }
    pixels
}

/// The shell's folder icon.
pub fn folder_icon() -> Image<'static> {
    static PIXELS: OnceLock<Vec<u8>> = OnceLock::new();
    Image {
        width: 8,
        height: 8,
        data: PIXELS.get_or_init(|| expand_icon(&FOLDER_ICON_ROWS, FOLDER_INK)),
    }
}

/// The shell's program icon.
pub fn program_icon() -> Image<'static> {
    static PIXELS: OnceLock<Vec<u8>> = OnceLock::new();
    Image {
        width: 8,
        height: 8,
        data: PIXELS.get_or_init(|| expand_icon(&PROGRAM_ICON_ROWS, PROGRAM_INK)),
    }
}

fn battery_pixels() -> &'static [u8] {
    static PIXELS: OnceLock<Vec<u8>> = OnceLock::new();
    PIXELS.get_or_init(|| {
        let width = BATTERY_CELL_WIDTH as usize * 3;
        let height = BATTERY_CELL_HEIGHT as usize;
        let mut pixels = vec![0u8; width * height];

        let outline = |cell: usize, color: u8, pixels: &mut Vec<u8>| {
            let base = cell * BATTERY_CELL_WIDTH as usize;
            for x in 0..7 {
                pixels[base + x] = color;
                pixels[(height - 1) * width + base + x] = color;
            }
            for y in 0..height {
                pixels[y * width + base] = color;
                pixels[y * width + base + 6] = color;
            }
            // Terminal nub on the right edge.
            pixels[2 * width + base + 7] = color;
            pixels[3 * width + base + 7] = color;
        };

        // Cell 0: case. Cell 1: charge bar, clipped to the battery level at
        // draw time. Cell 2: low-battery warning.
        outline(0, BATTERY_OUTLINE, &mut pixels);
        for y in 1..height - 1 {
            for x in 1..6 {
                pixels[y * width + BATTERY_CELL_WIDTH as usize + x] = BATTERY_FILL;
            }
        }
        outline(2, BATTERY_WARNING, &mut pixels);

        pixels
    })
}

/// The 3-cell battery icon (case, charge bar, warning).
pub fn battery_image() -> Image<'static> {
    Image {
        width: BATTERY_CELL_WIDTH * 3,
        height: BATTERY_CELL_HEIGHT,
        data: battery_pixels(),
    }
}
