// VM dispatch benchmark
//
// Times one full sync of a guest that burns a fixed number of arithmetic
// instructions before yielding.

use criterion::{criterion_group, criterion_main, Criterion};
use portatil::drivers::MonotonicClock;
use std::hint::black_box;
use portatil::fixed::Fixed;
use portatil::vm::{Host, Vm};
use portatil::{Engine, Graphics, InputState, Spu};

fn addi(rd: u32, rs1: u32, imm: i32) -> u32 {
    0b001_0011 | (rd << 7) | (rs1 << 15) | ((imm as u32 & 0xFFF) << 20)
}

fn bne(rs1: u32, rs2: u32, offset: i32) -> u32 {
    let imm = offset as u32;
    0b110_0011
        | (((imm >> 11) & 0x1) << 7)
        | (((imm >> 1) & 0xF) << 8)
        | (0b001 << 12)
        | (rs1 << 15)
        | (rs2 << 20)
        | (((imm >> 5) & 0x3F) << 25)
        | (((imm >> 12) & 0x1) << 31)
}

fn jal(rd: u32, offset: i32) -> u32 {
    let imm = offset as u32;
    0b110_1111
        | (rd << 7)
        | (((imm >> 12) & 0xFF) << 12)
        | (((imm >> 11) & 0x1) << 20)
        | (((imm >> 1) & 0x3FF) << 21)
        | (((imm >> 20) & 0x1) << 31)
}

/// Count down from 1000 in a tight loop, then yield. Restarts itself so
/// every sync does the same work.
fn counting_program() -> Vec<u8> {
    let words = [
        addi(6, 0, 1000),  // 0: t1 = 1000
        addi(5, 5, 1),     // 4: t0 += 1
        addi(6, 6, -1),    // 8: t1 -= 1
        bne(6, 0, -4),     // 12: loop
        addi(17, 0, 2),    // 16: a7 = sync
        0x0000_0073,       // 20: ecall
        jal(0, -24),       // 24: start over
    ];

    let mut image = Vec::new();
    for word in words {
        image.extend_from_slice(&word.to_le_bytes());
    }
    image
}

fn bench_sync(c: &mut Criterion) {
    let mut vm = Vm::new();
    vm.load_image(&counting_program(), 0, 0).unwrap();

    let mut graphics = Graphics::new();
    let mut spu = Spu::new();
    let mut engine = Engine::new();
    let input = InputState::new();
    let clock = MonotonicClock::new();

    c.bench_function("vm_sync_3000_instructions", |b| {
        b.iter(|| {
            let mut host = Host {
                graphics: &mut graphics,
                spu: &mut spu,
                engine: &mut engine,
                input: &input,
                clock: &clock,
                battery_percent: 100,
                frame_time: 33_333,
            };
            black_box(vm.sync(Fixed::ONE, &mut host)).expect("guest should yield");
        });
    });
}

criterion_group!(benches, bench_sync);
criterion_main!(benches);
