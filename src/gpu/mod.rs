// GPU module - indexed-color framebuffer and blitter
//
// The GPU owns the 160x120 framebuffer of palette indices, the procedurally
// built 256-color palette, and the three substitution colors that the blit
// paths consult. Everything here draws into host memory; shipping the
// finished frame to a panel or a window is the display driver's job.

pub mod palette;

pub use palette::{build_palette, PALETTE_BYTES, PALETTE_COLORS};

use crate::fixed::Fixed;

/// Screen width in pixels.
pub const SCREEN_WIDTH: i32 = 160;

/// Screen height in pixels.
pub const SCREEN_HEIGHT: i32 = 120;

/// Total number of framebuffer pixels.
pub const SCREEN_PIXELS: usize = (SCREEN_WIDTH * SCREEN_HEIGHT) as usize;

/// Sentinel color value that disables transparent/background/foreground
/// substitution wherever it appears.
pub const COLOR_NONE: u16 = 0xFFFF;

/// Integer point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Integer rectangle. Width and height may go non-positive while clipping;
/// the pixel loops treat that as empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Rect {
        Rect { x, y, width, height }
    }
}

/// An indexed-color image: dimensions plus a borrowed pixel slice, one
/// palette index per pixel in row-major order. Images that live in guest
/// memory are re-sliced (and re-validated) on every draw.
#[derive(Debug, Clone, Copy)]
pub struct Image<'a> {
    pub width: u16,
    pub height: u16,
    pub data: &'a [u8],
}

/// The framebuffer, palette, and substitution state.
pub struct Gpu {
    framebuffer: [u8; SCREEN_PIXELS],
    palette: [u8; PALETTE_BYTES],
    transparent_color: u16,
    background_color: u16,
    foreground_color: u16,
}

impl Gpu {
    pub fn new() -> Self {
        Gpu {
            framebuffer: [0; SCREEN_PIXELS],
            palette: build_palette(),
            transparent_color: COLOR_NONE,
            background_color: COLOR_NONE,
            foreground_color: COLOR_NONE,
        }
    }

    /// The current frame as palette indices.
    pub fn framebuffer(&self) -> &[u8; SCREEN_PIXELS] {
        &self.framebuffer
    }

    /// The RGB palette (256 triples).
    pub fn palette(&self) -> &[u8; PALETTE_BYTES] {
        &self.palette
    }

    pub fn set_transparent_color(&mut self, color: u16) {
        self.transparent_color = color;
    }

    pub fn set_background_color(&mut self, color: u16) {
        self.background_color = color;
    }

    pub fn set_foreground_color(&mut self, color: u16) {
        self.foreground_color = color;
    }

    pub fn transparent_color(&self) -> u16 {
        self.transparent_color
    }

    pub fn background_color(&self) -> u16 {
        self.background_color
    }

    pub fn foreground_color(&self) -> u16 {
        self.foreground_color
    }

    /// Fill the whole framebuffer with one color.
    pub fn clear(&mut self, color_index: u8) {
        self.framebuffer.fill(color_index);
    }

    /// Find the palette index closest to an RGB triple.
    ///
    /// Distance is weighted per channel (2*dR^2 + 4*dG^2 + 3*dB^2) to favor
    /// the hues the eye resolves best.
    pub fn nearest_color_index(&self, red: u8, green: u8, blue: u8) -> u8 {
        let mut nearest_index = 0u8;
        let mut nearest_distance = i32::MAX;

        for color_index in 0..PALETTE_COLORS {
            let red_diff = self.palette[color_index * 3] as i32 - red as i32;
            let green_diff = self.palette[color_index * 3 + 1] as i32 - green as i32;
            let blue_diff = self.palette[color_index * 3 + 2] as i32 - blue as i32;

            let distance =
                2 * red_diff * red_diff + 4 * green_diff * green_diff + 3 * blue_diff * blue_diff;

            if distance < nearest_distance {
                nearest_distance = distance;
                nearest_index = color_index as u8;
            }
        }

        nearest_index
    }

    /// Apply the transparent/background/foreground substitution to a source
    /// pixel. `None` means the pixel is skipped entirely.
    #[inline]
    fn substitute(&self, color: u8) -> Option<u8> {
        if color as u16 == self.transparent_color {
            if self.background_color == COLOR_NONE {
                return None;
            }
            Some(self.background_color as u8)
        } else if self.foreground_color != COLOR_NONE {
            Some(self.foreground_color as u8)
        } else {
            Some(color)
        }
    }

    /// Blit `clip` out of `image` to `position`, clipped to the screen.
    ///
    /// Rectangle fields come straight from guest registers, so every sum
    /// here saturates rather than trusting the values to stay small.
    pub fn draw(&mut self, image: &Image<'_>, position: Point, clip: &Rect) {
        let mut target = Rect::new(position.x, position.y, clip.width, clip.height);
        let mut source = *clip;

        if target.x > SCREEN_WIDTH
            || target.y > SCREEN_HEIGHT
            || target.x.saturating_add(target.width) < 0
            || target.y.saturating_add(target.height) < 0
        {
            return;
        }

        if target.x < 0 {
            source.x = source.x.wrapping_sub(target.x);
            source.width = source.width.wrapping_add(target.x);
            target.width += target.x;
            target.x = 0;
        }

        if target.x.saturating_add(target.width) > SCREEN_WIDTH {
            target.width = SCREEN_WIDTH - target.x;
            source.width = target.width;
        }

        if target.y < 0 {
            source.y = source.y.wrapping_sub(target.y);
            source.height = source.height.wrapping_add(target.y);
            target.height += target.y;
            target.y = 0;
        }

        if target.y.saturating_add(target.height) > SCREEN_HEIGHT {
            target.height = SCREEN_HEIGHT - target.y;
            source.height = target.height;
        }

        for pixel_y in 0..target.height {
            for pixel_x in 0..target.width {
                let source_index =
                    (source.y + pixel_y) * image.width as i32 + source.x + pixel_x;
                let Some(&color) = usize::try_from(source_index)
                    .ok()
                    .and_then(|index| image.data.get(index))
                else {
                    continue;
                };

                let Some(color) = self.substitute(color) else {
                    continue;
                };

                let target_index = (target.y + pixel_y) * SCREEN_WIDTH + target.x + pixel_x;
                self.framebuffer[target_index as usize] = color;
            }
        }
    }

    /// Blit `source_rect` out of `image` into `target_rect`, scaling by
    /// walking the target region and stepping through the source in fixed
    /// point.
    pub fn draw_scaled(&mut self, image: &Image<'_>, source_rect: &Rect, target_rect: &Rect) {
        let mut source = *source_rect;
        let mut target = *target_rect;

        if target.x > SCREEN_WIDTH
            || target.y > SCREEN_HEIGHT
            || target.x.saturating_add(target.width) < 0
            || target.y.saturating_add(target.height) < 0
        {
            return;
        }

        let target_width = Fixed::from_int(target_rect.width);
        let target_height = Fixed::from_int(target_rect.height);
        if target_width == Fixed::ZERO || target_height == Fixed::ZERO {
            return;
        }

        let source_pixel_width = Fixed::from_int(source_rect.width).div(target_width);
        let source_pixel_height = Fixed::from_int(source_rect.height).div(target_height);

        if target.x < 0 {
            let difference = Fixed::from_int(target.x).mul(source_pixel_width).to_int();
            source.x = source.x.wrapping_sub(difference);
            source.width = source.width.wrapping_add(difference);
            target.width += target.x;
            target.x = 0;
        }

        if target.x.saturating_add(target.width) > SCREEN_WIDTH {
            target.width = SCREEN_WIDTH - target.x;
            source.width = Fixed::from_int(target.width).mul(source_pixel_width).to_int();
        }

        if target.y < 0 {
            let difference = Fixed::from_int(target.y).mul(source_pixel_height).to_int();
            source.y = source.y.wrapping_sub(difference);
            source.height = source.height.wrapping_add(difference);
            target.height += target.y;
            target.y = 0;
        }

        if target.y.saturating_add(target.height) > SCREEN_HEIGHT {
            target.height = SCREEN_HEIGHT - target.y;
            source.height = Fixed::from_int(target.height).mul(source_pixel_height).to_int();
        }

        for pixel_y in 0..target.height {
            for pixel_x in 0..target.width {
                let source_x = source.x + Fixed::from_int(pixel_x).mul(source_pixel_width).to_int();
                let source_y =
                    source.y + Fixed::from_int(pixel_y).mul(source_pixel_height).to_int();

                let source_index = source_y * image.width as i32 + source_x;
                let Some(&color) = usize::try_from(source_index)
                    .ok()
                    .and_then(|index| image.data.get(index))
                else {
                    continue;
                };

                let Some(color) = self.substitute(color) else {
                    continue;
                };

                let target_index = (target.y + pixel_y) * SCREEN_WIDTH + target.x + pixel_x;
                self.framebuffer[target_index as usize] = color;
            }
        }
    }

    /// Fill a rectangle, clipped to the screen. No scaling or anchoring
    /// happens here; callers hand in final screen coordinates.
    pub fn draw_rectangle(&mut self, rectangle: &Rect, color_index: u8) {
        let mut rect = *rectangle;

        if rect.x > SCREEN_WIDTH
            || rect.y > SCREEN_HEIGHT
            || rect.x.saturating_add(rect.width) < 0
            || rect.y.saturating_add(rect.height) < 0
        {
            return;
        }

        if rect.x < 0 {
            rect.width += rect.x;
            rect.x = 0;
        }

        if rect.x.saturating_add(rect.width) > SCREEN_WIDTH {
            rect.width = SCREEN_WIDTH - rect.x;
        }

        if rect.y < 0 {
            rect.height += rect.y;
            rect.y = 0;
        }

        if rect.y.saturating_add(rect.height) > SCREEN_HEIGHT {
            rect.height = SCREEN_HEIGHT - rect.y;
        }

        for pixel_y in 0..rect.height {
            for pixel_x in 0..rect.width {
                let index = (rect.y + pixel_y) * SCREEN_WIDTH + rect.x + pixel_x;
                self.framebuffer[index as usize] = color_index;
            }
        }
    }
}

impl Default for Gpu {
    fn default() -> Self {
        Self::new()
    }
}
