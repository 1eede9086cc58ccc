// Error state - a message panel between states
//
// Shows a short message (a guest trap, a load failure, missing storage)
// over a centered banner. Y moves on to whatever state queued the error.

use crate::gpu::{Rect, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::graphics::{anchor, BitmapFont};
use crate::input::buttons;
use crate::kernel::{Kernel, RuntimeState};

/// What the error screen shows and where it goes afterwards.
pub(crate) struct ErrorContext {
    pub(crate) message: String,
    pub(crate) next_state: RuntimeState,
    banner: Rect,
    banner_color: u8,
    backdrop: Rect,
    backdrop_color: u8,
}

impl ErrorContext {
    pub(crate) fn new() -> Self {
        ErrorContext {
            message: String::new(),
            next_state: RuntimeState::Shell,
            banner: Rect::default(),
            banner_color: 0,
            backdrop: Rect::default(),
            backdrop_color: 0,
        }
    }
}

/// Resolve colors and banner geometry once the GPU palette exists.
pub(crate) fn initialize(kernel: &mut Kernel) {
    let font = BitmapFont::default_font();
    let error = &mut kernel.error;

    error.banner_color = kernel.graphics.nearest_color_index(220, 0, 0);
    error.banner.width = SCREEN_WIDTH;
    error.banner.height = font.char_height as i32 * 5;
    error.banner.y = (SCREEN_HEIGHT - error.banner.height) / 2;

    error.backdrop_color = kernel.graphics.nearest_color_index(255, 255, 255);
    error.backdrop.width = SCREEN_WIDTH;
    error.backdrop.y = error.banner.y - 2;
    error.backdrop.height = error.banner.height + 4;
}

pub(crate) fn error_update(kernel: &mut Kernel) {
    if kernel.input.just_pressed(buttons::Y) {
        let next_state = kernel.error.next_state;
        kernel.change_state(next_state);
        return;
    }

    let font = BitmapFont::default_font();
    let char_height = font.char_height as i32;

    kernel.graphics.reset_draw_state();

    let backdrop = kernel.error.backdrop;
    let backdrop_color = kernel.error.backdrop_color;
    let banner = kernel.error.banner;
    let banner_color = kernel.error.banner_color;
    kernel.graphics.draw_rectangle(&backdrop, backdrop_color);
    kernel.graphics.draw_rectangle(&banner, banner_color);

    kernel.graphics.set_draw_anchor(anchor::MIDDLE | anchor::CENTER);
    kernel.graphics.set_transparent_color(0);

    kernel.graphics.draw_text(
        &font,
        SCREEN_WIDTH / 2,
        SCREEN_HEIGHT / 2 - char_height,
        kernel.error.message.as_bytes(),
    );

    kernel.graphics.draw_text(
        &font,
        SCREEN_WIDTH / 2,
        SCREEN_HEIGHT / 2 + char_height,
        b"Press Y to Continue",
    );
}
