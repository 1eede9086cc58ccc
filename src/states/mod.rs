// States module - the kernel's runtime state machine
//
// One state function runs per frame: the boot splash, the shell browser,
// the in-game host loop, the pause menu, or the error screen. States hand
// control to each other through `Kernel::change_state`.

mod error;
mod ingame;
mod pause;
mod shell;

pub(crate) use error::{error_update, ErrorContext};
pub(crate) use ingame::{in_game_update, InGameContext};
pub(crate) use pause::pause_menu_update;
pub(crate) use shell::{shell_update, ShellContext};

use crate::graphics::{anchor, BitmapFont};
use crate::gpu::{SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::kernel::{Kernel, RuntimeState};

/// How long the boot splash stays up, in microseconds.
const BOOT_SPLASH_TIME: u64 = 1_000_000;

/// Boot state: draw the splash once, let it sit for a moment, then set up
/// the other states and enter the shell.
pub(crate) fn boot_update(kernel: &mut Kernel) {
    if !kernel.boot_splash_drawn {
        kernel.boot_splash_drawn = true;

        kernel.graphics.clear_screen(0);
        kernel.graphics.set_transparent_color(0);
        kernel.graphics.set_draw_anchor(anchor::MIDDLE | anchor::CENTER);

        let font = BitmapFont::default_font();
        kernel
            .graphics
            .draw_text(&font, SCREEN_WIDTH / 2, SCREEN_HEIGHT / 2, b"Portatil");

        return;
    }

    kernel.drivers.clock.wait(BOOT_SPLASH_TIME);
    kernel.graphics.reset_draw_state();

    error::initialize(kernel);
    shell::initialize(kernel);

    kernel.change_state(RuntimeState::Shell);
}
