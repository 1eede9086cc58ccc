// Syscall surface tests
//
// Guest programs exercising the non-engine host capabilities: timing,
// input, graphics, text, and audio.

mod common;

use common::{abi::*, asm::*, TestConsole};
use portatil::gpu::SCREEN_WIDTH;
use portatil::input::buttons;
use portatil::vm::SyncOutcome;

#[test]
fn test_battery_and_frame_time_reads() {
    let mut console = TestConsole::new();
    console.battery_percent = 77;
    console.frame_time = 40_000;

    console.load_words(
        &[
            addi(A7, ZERO, 10),
            ecall(),
            addi(8, A0, 0),
            addi(A7, ZERO, 4),
            ecall(),
            addi(9, A0, 0),
            addi(A7, ZERO, 1),
            ecall(),
        ],
        0,
        0,
    );

    assert_eq!(console.sync(), Ok(SyncOutcome::Exited));
    assert_eq!(console.vm.register(8), 77);
    assert_eq!(console.vm.register(9), 40_000);
}

#[test]
fn test_input_state_and_edges() {
    let mut console = TestConsole::new();
    console.input.shift(buttons::A | buttons::UP);

    console.load_words(
        &[
            // s0 = raw state
            addi(A7, ZERO, 20),
            ecall(),
            addi(8, A0, 0),
            // s1 = is A pressed
            addi(A0, ZERO, buttons::A as i32),
            addi(A7, ZERO, 22),
            ecall(),
            addi(9, A0, 0),
            // s2 = was A just pressed
            addi(A0, ZERO, buttons::A as i32),
            addi(A7, ZERO, 23),
            ecall(),
            addi(18, A0, 0),
            // s3 = axis(left, right)
            addi(A0, ZERO, buttons::LEFT as i32),
            addi(A1, ZERO, buttons::RIGHT as i32),
            addi(A7, ZERO, 21),
            ecall(),
            addi(19, A0, 0),
            addi(A7, ZERO, 1),
            ecall(),
        ],
        0,
        0,
    );

    assert_eq!(console.sync(), Ok(SyncOutcome::Exited));
    assert_eq!(
        console.vm.register(8),
        (buttons::A | buttons::UP) as i32,
        "the raw mask reaches the guest"
    );
    assert_eq!(console.vm.register(9), 1);
    assert_eq!(console.vm.register(18), 1, "a fresh press is an edge");
    assert_eq!(console.vm.register(19), 0, "neither axis button is held");
}

#[test]
fn test_clear_screen_and_rectangle() {
    let mut console = TestConsole::new();
    console.load_words(
        &[
            // clear to color 5
            addi(A0, ZERO, 5),
            addi(A7, ZERO, 30),
            ecall(),
            // target rectangle (10, 10, 20, 20), filled with color 9
            addi(A0, ZERO, 10),
            addi(A1, ZERO, 10),
            addi(A2, ZERO, 20),
            addi(A3, ZERO, 20),
            addi(A7, ZERO, 39),
            ecall(),
            addi(A0, ZERO, 9),
            addi(A7, ZERO, 41),
            ecall(),
            addi(A7, ZERO, 1),
            ecall(),
        ],
        0,
        0,
    );

    assert_eq!(console.sync(), Ok(SyncOutcome::Exited));

    let framebuffer = console.graphics.gpu().framebuffer();
    assert_eq!(framebuffer[0], 5, "the clear color fills the background");
    assert_eq!(framebuffer[(15 * SCREEN_WIDTH + 15) as usize], 9);
    assert_eq!(framebuffer[(9 * SCREEN_WIDTH + 10) as usize], 5);
}

#[test]
fn test_nearest_color_lookup() {
    let mut console = TestConsole::new();
    console.load_words(
        &[
            // pure black lives at palette index 0
            addi(A0, ZERO, 0),
            addi(A1, ZERO, 0),
            addi(A2, ZERO, 0),
            addi(A7, ZERO, 31),
            ecall(),
            addi(8, A0, 0),
            addi(A7, ZERO, 1),
            ecall(),
        ],
        0,
        0,
    );

    assert_eq!(console.sync(), Ok(SyncOutcome::Exited));
    assert_eq!(console.vm.register(8), 0);
}

#[test]
fn test_draw_text_from_guest_memory() {
    // Code first, the string "HI" appended after the exit call.
    let code = vec![
        // target position (0, 0)
        addi(A0, ZERO, 0),
        addi(A1, ZERO, 0),
        addi(A7, ZERO, 37),
        ecall(),
        // draw the text at the data address
        addi(A0, ZERO, 9 * 4),
        addi(A7, ZERO, 43),
        ecall(),
        addi(A7, ZERO, 1),
        ecall(),
        u32::from_le_bytes(*b"HI\0\0"),
    ];

    let mut console = TestConsole::new();
    console.load_words(&code, 0, 0);

    assert_eq!(console.sync(), Ok(SyncOutcome::Exited));

    let framebuffer = console.graphics.gpu().framebuffer();
    let ink = framebuffer.iter().filter(|&&pixel| pixel != 0).count();
    assert!(ink > 0, "drawing text should leave glyph pixels behind");
}

#[test]
fn test_play_tone_feeds_the_mixer() {
    let mut console = TestConsole::new();
    console.load_words(
        &[
            // channel 0, square wave, 440 Hz, forever
            addi(A0, ZERO, 0),
            addi(A1, ZERO, 1),
            addi(A2, ZERO, 440),
            addi(A3, ZERO, 0),
            addi(A7, ZERO, 51),
            ecall(),
            addi(A7, ZERO, 2),
            ecall(),
        ],
        0,
        0,
    );

    assert_eq!(console.sync(), Ok(SyncOutcome::Yielded));

    let samples = console.spu.sync(0);
    assert!(samples.iter().any(|&sample| sample != 0));
}

#[test]
fn test_stop_all_sound_silences_channels() {
    let mut console = TestConsole::new();
    console.load_words(
        &[
            addi(A0, ZERO, 0),
            addi(A1, ZERO, 1),
            addi(A2, ZERO, 440),
            addi(A3, ZERO, 0),
            addi(A7, ZERO, 51),
            ecall(),
            addi(A7, ZERO, 53),
            ecall(),
            addi(A7, ZERO, 2),
            ecall(),
        ],
        0,
        0,
    );

    assert_eq!(console.sync(), Ok(SyncOutcome::Yielded));

    let samples = console.spu.sync(0);
    assert!(samples.iter().all(|&sample| sample == 0));
}

#[test]
fn test_random_respects_range() {
    let mut console = TestConsole::new();
    console.vm.seed_random(12345);
    console.load_words(
        &[
            addi(A0, ZERO, 5),
            addi(A1, ZERO, 10),
            addi(A7, ZERO, 3),
            ecall(),
            addi(8, A0, 0),
            // an empty range returns the minimum
            addi(A0, ZERO, 9),
            addi(A1, ZERO, 9),
            addi(A7, ZERO, 3),
            ecall(),
            addi(9, A0, 0),
            addi(A7, ZERO, 1),
            ecall(),
        ],
        0,
        0,
    );

    assert_eq!(console.sync(), Ok(SyncOutcome::Exited));
    let value = console.vm.register(8);
    assert!((5..=10).contains(&value), "random value {} outside range", value);
    assert_eq!(console.vm.register(9), 9);
}
