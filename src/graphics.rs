// Graphics module - draw state and anchored drawing
//
// The GPU blits raw rectangles; this layer adds the state guest programs
// and the shell actually draw with: an anchor mask, a Q16.16 scale pair,
// the substitution colors, save/restore of all of the above, and bitmap
// font text on top of the image blitter.

use crate::assets;
use crate::fixed::Fixed;
use crate::gpu::{Gpu, Image, Point, Rect, COLOR_NONE, SCREEN_HEIGHT, SCREEN_WIDTH};

/// Anchor mask bits. The low two bits pick the vertical anchor, the next
/// two the horizontal one.
pub mod anchor {
    pub const TOP: u8 = 0b0000_0001;
    pub const BOTTOM: u8 = 0b0000_0010;
    pub const MIDDLE: u8 = 0b0000_0011;
    pub const LEFT: u8 = 0b0000_0100;
    pub const RIGHT: u8 = 0b0000_1000;
    pub const CENTER: u8 = 0b0000_1100;
    pub const DEFAULT: u8 = TOP | LEFT;
}

/// A fixed-cell bitmap font: a glyph atlas with 16 glyphs per row.
#[derive(Debug, Clone, Copy)]
pub struct BitmapFont<'a> {
    pub image: Image<'a>,
    pub char_width: u8,
    pub char_height: u8,
}

impl BitmapFont<'static> {
    /// The built-in 6x8 font.
    pub fn default_font() -> BitmapFont<'static> {
        BitmapFont {
            image: assets::default_font_image(),
            char_width: assets::FONT_CHAR_WIDTH,
            char_height: assets::FONT_CHAR_HEIGHT,
        }
    }
}

/// Snapshot of the draw state for save/restore.
#[derive(Debug, Clone, Copy)]
struct DrawState {
    anchor: u8,
    scale_x: Fixed,
    scale_y: Fixed,
    transparent_color: u16,
    background_color: u16,
    foreground_color: u16,
}

impl DrawState {
    fn reset() -> DrawState {
        DrawState {
            anchor: anchor::DEFAULT,
            scale_x: Fixed::ONE,
            scale_y: Fixed::ONE,
            transparent_color: COLOR_NONE,
            background_color: COLOR_NONE,
            foreground_color: COLOR_NONE,
        }
    }
}

/// The GPU plus the drawing state applied on top of it.
pub struct Graphics {
    gpu: Gpu,
    draw_anchor: u8,
    scale_x: Fixed,
    scale_y: Fixed,
    saved_state: DrawState,
}

impl Graphics {
    pub fn new() -> Self {
        Graphics {
            gpu: Gpu::new(),
            draw_anchor: anchor::DEFAULT,
            scale_x: Fixed::ONE,
            scale_y: Fixed::ONE,
            saved_state: DrawState::reset(),
        }
    }

    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    pub fn clear_screen(&mut self, color_index: u8) {
        self.gpu.clear(color_index);
    }

    pub fn nearest_color_index(&self, red: u8, green: u8, blue: u8) -> u8 {
        self.gpu.nearest_color_index(red, green, blue)
    }

    pub fn set_transparent_color(&mut self, color: u16) {
        self.gpu.set_transparent_color(color);
    }

    pub fn set_background_color(&mut self, color: u16) {
        self.gpu.set_background_color(color);
    }

    pub fn set_foreground_color(&mut self, color: u16) {
        self.gpu.set_foreground_color(color);
    }

    pub fn set_draw_anchor(&mut self, anchor_mask: u8) {
        self.draw_anchor = anchor_mask;
    }

    pub fn set_draw_scale(&mut self, scale_x: Fixed, scale_y: Fixed) {
        self.scale_x = scale_x;
        self.scale_y = scale_y;
    }

    /// Back to the power-on draw state.
    pub fn reset_draw_state(&mut self) {
        let state = DrawState::reset();
        self.apply_state(state);
    }

    /// Remember the current draw state.
    pub fn save_draw_state(&mut self) {
        self.saved_state = DrawState {
            anchor: self.draw_anchor,
            scale_x: self.scale_x,
            scale_y: self.scale_y,
            transparent_color: self.gpu.transparent_color(),
            background_color: self.gpu.background_color(),
            foreground_color: self.gpu.foreground_color(),
        };
    }

    /// Bring back the last saved draw state.
    pub fn restore_draw_state(&mut self) {
        let state = self.saved_state;
        self.apply_state(state);
    }

    fn apply_state(&mut self, state: DrawState) {
        self.draw_anchor = state.anchor;
        self.scale_x = state.scale_x;
        self.scale_y = state.scale_y;
        self.gpu.set_transparent_color(state.transparent_color);
        self.gpu.set_background_color(state.background_color);
        self.gpu.set_foreground_color(state.foreground_color);
    }

    fn is_scaled(&self) -> bool {
        self.scale_x != Fixed::ONE || self.scale_y != Fixed::ONE
    }

    /// Shift a position by the current anchor relative to `rect`.
    fn anchor_position(&self, position: &mut Point, rect: &Rect) {
        match self.draw_anchor & 0b0011 {
            anchor::BOTTOM => position.y = position.y.wrapping_sub(rect.height),
            anchor::MIDDLE => position.y = position.y.wrapping_sub(rect.height / 2),
            _ => {}
        }

        match self.draw_anchor & 0b1100 {
            anchor::RIGHT => position.x = position.x.wrapping_sub(rect.width),
            anchor::CENTER => position.x = position.x.wrapping_sub(rect.width / 2),
            _ => {}
        }
    }

    /// Fill a rectangle after applying scale and anchor.
    pub fn draw_rectangle(&mut self, rectangle: &Rect, color_index: u8) {
        let mut rect = *rectangle;

        if self.is_scaled() {
            rect.width = Fixed::from_int(rect.width).mul(self.scale_x).to_int();
            rect.height = Fixed::from_int(rect.height).mul(self.scale_y).to_int();
        }

        if self.draw_anchor != anchor::DEFAULT {
            let mut position = Point { x: rect.x, y: rect.y };
            self.anchor_position(&mut position, &rect);
            rect.x = position.x;
            rect.y = position.y;
        }

        self.gpu.draw_rectangle(&rect, color_index);
    }

    /// Draw `clip` out of `image` at a position, honoring anchor and scale.
    pub fn draw_image(&mut self, image: &Image<'_>, x: i32, y: i32, clip: &Rect) {
        if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT {
            return;
        }

        if !self.is_scaled() {
            let mut position = Point { x, y };

            if self.draw_anchor != anchor::DEFAULT {
                self.anchor_position(&mut position, clip);
            }

            self.gpu.draw(image, position, clip);
        } else {
            let mut target = Rect::new(
                x,
                y,
                Fixed::from_int(clip.width).mul(self.scale_x).to_int(),
                Fixed::from_int(clip.height).mul(self.scale_y).to_int(),
            );

            if self.draw_anchor != anchor::DEFAULT {
                let mut position = Point { x: target.x, y: target.y };
                self.anchor_position(&mut position, &target);
                target.x = position.x;
                target.y = position.y;
            }

            self.gpu.draw_scaled(image, clip, &target);
        }
    }

    /// Draw a run of text with a bitmap font.
    ///
    /// Bytes above 127 advance the cursor without drawing, which lets
    /// programs reserve the high half of the byte range for spacing.
    pub fn draw_text(&mut self, font: &BitmapFont<'_>, x: i32, y: i32, text: &[u8]) {
        let mut draw_position = Point { x, y };

        let mut extent = Rect::new(
            x,
            y,
            font.char_width as i32 * text.len() as i32,
            font.char_height as i32,
        );

        let draw_scaled = self.is_scaled();

        if draw_scaled {
            extent.width = Fixed::from_int(extent.width).mul(self.scale_x).to_int();
            extent.height = Fixed::from_int(extent.height).mul(self.scale_y).to_int();
        }

        if self.draw_anchor != anchor::DEFAULT {
            self.anchor_position(&mut draw_position, &extent);
        }

        if draw_position.x.saturating_add(extent.width) < 0
            || draw_position.y.saturating_add(extent.height) < 0
            || draw_position.x >= SCREEN_WIDTH
            || draw_position.y >= SCREEN_HEIGHT
        {
            return;
        }

        let mut clip = Rect::new(0, 0, font.char_width as i32, font.char_height as i32);
        let mut cell = clip;

        if draw_scaled {
            cell.width = Fixed::from_int(cell.width).mul(self.scale_x).to_int();
            cell.height = Fixed::from_int(cell.height).mul(self.scale_y).to_int();
        }

        let chars_per_line = font.image.width as i32 / font.char_width as i32;

        // Glyphs are drawn unanchored; the anchor has already been applied
        // to the text origin.
        let anchor_backup = self.draw_anchor;
        self.draw_anchor = anchor::DEFAULT;

        for &byte in text {
            if draw_position.x.saturating_add(cell.width) < 0 {
                draw_position.x = draw_position.x.wrapping_add(cell.width);
                continue;
            }

            if byte <= 127 {
                let char_row = byte as i32 / chars_per_line;
                let char_column = byte as i32 % chars_per_line;

                clip.y = char_row * font.char_height as i32;
                clip.x = char_column * font.char_width as i32;

                self.draw_image(&font.image, draw_position.x, draw_position.y, &clip);
            }

            draw_position.x = draw_position.x.wrapping_add(cell.width);

            if draw_position.x >= SCREEN_WIDTH {
                break;
            }
        }

        self.draw_anchor = anchor_backup;
    }

    /// Draw a decimal number with a bitmap font.
    pub fn draw_number(&mut self, font: &BitmapFont<'_>, x: i32, y: i32, value: i32) {
        let text = value.to_string();
        self.draw_text(font, x, y, text.as_bytes());
    }
}

impl Default for Graphics {
    fn default() -> Self {
        Self::new()
    }
}
