// In-game state - hosting a running guest program
//
// Derives the frame's speed multiplier, watches the system chords (pause,
// stats overlay), runs the VM until it yields, and routes traps to the
// error screen. The optional stats overlay shows where the frame budget
// went.

use crate::fixed::Fixed;
use crate::gpu::Rect;
use crate::graphics::BitmapFont;
use crate::input::buttons;
use crate::kernel::{Kernel, RuntimeState, TARGET_FRAME_TIME, TARGET_FRAME_TIME_MS};
use crate::vm::{Host, SyncOutcome};

/// Per-session in-game data.
pub(crate) struct InGameContext {
    pub(crate) show_stats: bool,
    speed_multiplier: Fixed,
    stats_background_color: u8,
    stats_shadow_color: u8,
    colors_resolved: bool,
}

impl InGameContext {
    pub(crate) fn new(show_stats: bool) -> Self {
        InGameContext {
            show_stats,
            speed_multiplier: Fixed::ZERO,
            stats_background_color: 0,
            stats_shadow_color: 0,
            colors_resolved: false,
        }
    }
}

/// Work out how much faster or slower than nominal the last frame ran.
///
/// The integer millisecond ratio covers normal frames; sub-millisecond
/// frames fall back to the float ratio, and a zero result is clamped up to
/// the smallest representable step so motion never stalls entirely.
fn update_game_speed(kernel: &mut Kernel, frame_time: u64) {
    let mut speed = Fixed::from_int((frame_time / 1000) as i32)
        .div(Fixed::from_int(TARGET_FRAME_TIME_MS));

    if speed == Fixed::ZERO {
        speed = Fixed::from_f32(frame_time as f32 / 1000.0)
            .div(Fixed::from_f32(TARGET_FRAME_TIME as f32 / 1000.0));
    }

    if speed == Fixed::ZERO {
        speed = Fixed::from_bits(1);
    }

    kernel.in_game.speed_multiplier = speed;
}

pub(crate) fn in_game_update(kernel: &mut Kernel, frame_time: u64) {
    update_game_speed(kernel, frame_time);

    if kernel.input.is_pressed(buttons::UP) {
        if kernel.input.just_pressed(buttons::B) && kernel.input.just_pressed(buttons::Y) {
            kernel.in_game.show_stats = !kernel.in_game.show_stats;
        }

        if kernel.input.just_pressed(buttons::A) && kernel.input.just_pressed(buttons::X) {
            kernel.spu.pause_all(true);
            kernel.change_state(RuntimeState::PauseMenu);
            return;
        }
    }

    let speed = kernel.in_game.speed_multiplier;
    let result = {
        let mut host = Host {
            graphics: &mut kernel.graphics,
            spu: &mut kernel.spu,
            engine: &mut kernel.engine,
            input: &kernel.input,
            clock: kernel.drivers.clock.as_ref(),
            battery_percent: kernel.battery_percent,
            frame_time,
        };
        kernel.vm.sync(speed, &mut host)
    };

    match result {
        Ok(SyncOutcome::Yielded) => {
            if kernel.in_game.show_stats {
                draw_performance_stats(kernel);
            }
        }
        Ok(SyncOutcome::Exited) => {
            kernel.spu.stop_all();
            kernel.change_state(RuntimeState::Shell);
        }
        Err(trap) => {
            kernel.spu.stop_all();

            if let Some(details) = kernel.vm.fault_details() {
                eprintln!("guest fault: {} at {}", trap, details);
            }

            kernel.show_error(RuntimeState::Shell, trap.to_string());
        }
    }
}

fn draw_performance_stats(kernel: &mut Kernel) {
    let font = BitmapFont::default_font();
    let char_height = font.char_height as i32;

    if !kernel.in_game.colors_resolved {
        kernel.in_game.colors_resolved = true;
        kernel.in_game.stats_background_color = kernel.graphics.nearest_color_index(220, 0, 0);
        kernel.in_game.stats_shadow_color = kernel.graphics.nearest_color_index(48, 48, 48);
    }

    let panel_width = font.char_width as i32 * 10 + 2;
    let panel_height = char_height * 5 + 2;

    kernel.graphics.save_draw_state();
    kernel.graphics.reset_draw_state();
    kernel.graphics.set_transparent_color(0);

    let shadow = kernel.in_game.stats_shadow_color;
    let background = kernel.in_game.stats_background_color;
    kernel
        .graphics
        .draw_rectangle(&Rect::new(2, 2, panel_width, panel_height), shadow);
    kernel
        .graphics
        .draw_rectangle(&Rect::new(1, 1, panel_width, panel_height), background);

    let frame_time = kernel.frame_time.max(1);
    let rows = [
        format!("BFT:{:6}", kernel.busy_frame_time),
        format!("FPS:{:6}", 1_000_000 / frame_time),
        format!("ENG:{:6}", kernel.engine.last_sync_time()),
        format!(
            "VM: {:6}",
            kernel
                .vm
                .last_sync_time()
                .saturating_sub(kernel.engine.last_sync_time())
        ),
    ];

    let mut y_position = 2;
    for row in &rows {
        kernel.graphics.draw_text(&font, 2, y_position, row.as_bytes());
        y_position += char_height;
    }

    kernel.graphics.restore_draw_state();
}
