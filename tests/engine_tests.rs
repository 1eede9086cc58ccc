// Engine scenario tests
//
// Guest programs driving the sprite/entity engine through the syscall
// surface: allocation, collision, deferred release, and the post-sync
// layer state.

mod common;

use common::{abi::*, asm::*, TestConsole};
use portatil::vm::SyncOutcome;

/// Allocate a 16x16 sprite backed by guest address 0x1000 and give it
/// full-frame cells.
fn sprite_setup() -> Vec<u32> {
    vec![
        // sprite = get_sprite(16, 16, 0x1000)
        addi(A0, ZERO, 16),
        addi(A1, ZERO, 16),
        lui(A2, 1),
        addi(A7, ZERO, 61),
        ecall(),
        // set_sprite_props(sprite 0, transparent 0, frame 16x16)
        addi(A0, ZERO, 0),
        addi(A1, ZERO, 0),
        addi(A2, ZERO, 16),
        addi(A3, ZERO, 16),
        addi(A7, ZERO, 63),
        ecall(),
    ]
}

#[test]
fn test_entity_collision_scenario() {
    let mut program = sprite_setup();
    program.extend_from_slice(&[
        // work on layer 1
        addi(A0, ZERO, 1),
        addi(A7, ZERO, 65),
        ecall(),
        // entity A: type 1 at (10, 10)
        addi(A0, ZERO, 1),
        addi(A1, ZERO, 0),
        lui(A2, 0xA0),
        lui(A3, 0xA0),
        addi(A7, ZERO, 67),
        ecall(),
        // entity B: type 2 at (20, 20)
        addi(A0, ZERO, 2),
        addi(A1, ZERO, 0),
        lui(A2, 0x140),
        lui(A3, 0x140),
        addi(A7, ZERO, 67),
        ecall(),
        // s0 = colliding index of A against type 2
        addi(A0, ZERO, 0),
        addi(A1, ZERO, 2),
        addi(A7, ZERO, 83),
        ecall(),
        addi(8, A0, 0),
        // move A to (40, 40), far from B
        addi(A0, ZERO, 0),
        lui(A1, 0x280),
        lui(A2, 0x280),
        addi(A7, ZERO, 69),
        ecall(),
        // s1 = colliding index after the move
        addi(A0, ZERO, 0),
        addi(A1, ZERO, 2),
        addi(A7, ZERO, 83),
        ecall(),
        addi(9, A0, 0),
        addi(A7, ZERO, 1),
        ecall(),
    ]);

    let mut console = TestConsole::new();
    console.load_words(&program, 0, 0);

    assert_eq!(console.sync(), Ok(SyncOutcome::Exited));
    assert_eq!(console.vm.register(8), 1, "overlapping boxes should collide");
    assert_eq!(console.vm.register(9), -1, "moving apart should break the overlap");
    assert_eq!(console.engine.number_of_entities(1), 2);
}

#[test]
fn test_deferred_release_scenario() {
    let mut program = sprite_setup();
    program.extend_from_slice(&[
        // entities A (type 100), B (type 200), C (type 300) on layer 0
        addi(A0, ZERO, 100),
        addi(A1, ZERO, 0),
        addi(A2, ZERO, 0),
        addi(A3, ZERO, 0),
        addi(A7, ZERO, 67),
        ecall(),
        addi(A0, ZERO, 200),
        addi(A1, ZERO, 0),
        addi(A2, ZERO, 0),
        addi(A3, ZERO, 0),
        addi(A7, ZERO, 67),
        ecall(),
        addi(A0, ZERO, 300),
        addi(A1, ZERO, 0),
        addi(A2, ZERO, 0),
        addi(A3, ZERO, 0),
        addi(A7, ZERO, 67),
        ecall(),
        // flag B, then run the engine sync
        addi(A0, ZERO, 1),
        addi(A7, ZERO, 68),
        ecall(),
        addi(A7, ZERO, 60),
        ecall(),
        // s0 = type of whatever now sits in B's slot
        addi(A0, ZERO, 1),
        addi(A7, ZERO, 74),
        ecall(),
        addi(8, A0, 0),
        // s1 = live count
        addi(A7, ZERO, 66),
        ecall(),
        addi(9, A0, 0),
        addi(A7, ZERO, 1),
        ecall(),
    ]);

    let mut console = TestConsole::new();
    console.load_words(&program, 0, 0);

    assert_eq!(console.sync(), Ok(SyncOutcome::Exited));
    assert_eq!(console.vm.register(8), 300, "the last entity swaps into the freed slot");
    assert_eq!(console.vm.register(9), 2, "the layer count drops by one");

    let swapped = console.engine.entity(0, 1).expect("slot 1 should be live");
    assert_eq!(swapped.index, 1, "the moved entity takes over the slot index");
    assert_eq!(swapped.type_id, 300);
}

#[test]
fn test_invalid_sprite_handle_is_benign() {
    let program = vec![
        // get_entity with a dead sprite handle reports 0
        addi(A0, ZERO, 1),
        addi(A1, ZERO, 42), // never allocated
        addi(A2, ZERO, 0),
        addi(A3, ZERO, 0),
        addi(A7, ZERO, 67),
        ecall(),
        addi(8, A0, 0),
        addi(A7, ZERO, 1),
        ecall(),
    ];

    let mut console = TestConsole::new();
    console.load_words(&program, 0, 0);

    assert_eq!(console.sync(), Ok(SyncOutcome::Exited));
    assert_eq!(console.vm.register(8), 0);
    assert_eq!(console.engine.number_of_entities(0), 0);
}

#[test]
fn test_entity_getters_round_trip() {
    let mut program = sprite_setup();
    program.extend_from_slice(&[
        // entity type 7 at (0, 0)
        addi(A0, ZERO, 7),
        addi(A1, ZERO, 0),
        addi(A2, ZERO, 0),
        addi(A3, ZERO, 0),
        addi(A7, ZERO, 67),
        ecall(),
        // direction = (1, -1)
        addi(A0, ZERO, 0),
        addi(A1, ZERO, 1),
        addi(A2, ZERO, -1),
        addi(A7, ZERO, 70),
        ecall(),
        // s0 = direction x, s1 = direction y
        addi(A0, ZERO, 0),
        addi(A7, ZERO, 77),
        ecall(),
        addi(8, A0, 0),
        addi(A0, ZERO, 0),
        addi(A7, ZERO, 78),
        ecall(),
        addi(9, A0, 0),
        // s2 = type id
        addi(A0, ZERO, 0),
        addi(A7, ZERO, 74),
        ecall(),
        addi(18, A0, 0),
        addi(A7, ZERO, 1),
        ecall(),
    ]);

    let mut console = TestConsole::new();
    console.load_words(&program, 0, 0);

    assert_eq!(console.sync(), Ok(SyncOutcome::Exited));
    assert_eq!(console.vm.register(8), 1);
    assert_eq!(console.vm.register(9), -1);
    assert_eq!(console.vm.register(18), 7);
}

#[test]
fn test_find_entity_by_occurrence() {
    let mut program = sprite_setup();
    program.extend_from_slice(&[
        // two entities of type 5 with one of type 9 in between
        addi(A0, ZERO, 5),
        addi(A1, ZERO, 0),
        addi(A2, ZERO, 0),
        addi(A3, ZERO, 0),
        addi(A7, ZERO, 67),
        ecall(),
        addi(A0, ZERO, 9),
        addi(A1, ZERO, 0),
        addi(A2, ZERO, 0),
        addi(A3, ZERO, 0),
        addi(A7, ZERO, 67),
        ecall(),
        addi(A0, ZERO, 5),
        addi(A1, ZERO, 0),
        addi(A2, ZERO, 0),
        addi(A3, ZERO, 0),
        addi(A7, ZERO, 67),
        ecall(),
        // s0 = second occurrence of type 5
        addi(A0, ZERO, 5),
        addi(A1, ZERO, 2),
        addi(A7, ZERO, 84),
        ecall(),
        addi(8, A0, 0),
        // s1 = third occurrence (absent)
        addi(A0, ZERO, 5),
        addi(A1, ZERO, 3),
        addi(A7, ZERO, 84),
        ecall(),
        addi(9, A0, 0),
        addi(A7, ZERO, 1),
        ecall(),
    ]);

    let mut console = TestConsole::new();
    console.load_words(&program, 0, 0);

    assert_eq!(console.sync(), Ok(SyncOutcome::Exited));
    assert_eq!(console.vm.register(8), 2);
    assert_eq!(console.vm.register(9), -1);
}
