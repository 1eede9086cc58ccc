// Pause menu state
//
// Sound is paused on entry (by the in-game state) and either resumed or
// stopped on the way out.

use crate::input::buttons;
use crate::kernel::{Kernel, RuntimeState};

use super::shell::draw_shell_overlay;

pub(crate) fn pause_menu_update(kernel: &mut Kernel) {
    if kernel.input.just_pressed(buttons::B) {
        kernel.spu.stop_all();
        kernel.change_state(RuntimeState::Shell);
        return;
    }

    if kernel.input.just_pressed(buttons::A) {
        kernel.spu.pause_all(false);
        kernel.change_state(RuntimeState::InGame);
        return;
    }

    draw_shell_overlay(kernel, Some("Game Paused"), Some("(B) Exit"), Some("Resume (A)"));
}
