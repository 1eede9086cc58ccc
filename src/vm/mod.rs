// Virtual machine module - RV32IM guest interpreter
//
// Guest programs are RV32IM binaries running in a 64 KiB flat address
// space. The interpreter dispatches on the low 7 opcode bits and runs
// until the guest yields through the sync syscall, exits, or traps. Two
// runaway guards bound every sync: a locked-pc detector and a wall-clock
// ceiling re-checked every hundred thousand instructions.

pub mod decode;
pub mod disasm;
pub mod memory;
mod program;
mod syscalls;

pub use memory::{GuestMemory, MEMORY_SIZE};
pub use program::{ProgramError, ProgramHeader, PROGRAM_HEADER_SIZE, PROGRAM_MAGIC, PROGRAM_VERSION};

use crate::drivers::ClockDriver;
use crate::engine::Engine;
use crate::fixed::Fixed;
use crate::graphics::Graphics;
use crate::input::InputState;
use crate::spu::Spu;

use syscalls::SyscallScratch;

/// Hard wall-clock ceiling for one sync, in microseconds.
pub const MAX_SYNC_TIME: u64 = 1_000_000;

/// Instructions executed before the wall-clock guard engages.
const SYNC_CHECK_INTERVAL: u64 = 100_000;

/// ABI register indices.
pub mod reg {
    pub const ZERO: usize = 0;
    pub const RA: usize = 1;
    pub const SP: usize = 2;
    pub const GP: usize = 3;
    pub const TP: usize = 4;
    pub const T0: usize = 5;
    pub const T1: usize = 6;
    pub const T2: usize = 7;
    pub const S0: usize = 8;
    pub const S1: usize = 9;
    pub const A0: usize = 10;
    pub const A1: usize = 11;
    pub const A2: usize = 12;
    pub const A3: usize = 13;
    pub const A4: usize = 14;
    pub const A5: usize = 15;
    pub const A6: usize = 16;
    pub const A7: usize = 17;
    pub const T3: usize = 28;
    pub const T4: usize = 29;
    pub const T5: usize = 30;
    pub const T6: usize = 31;
}

/// Why a guest program was terminated.
///
/// Stringified only at the presentation boundary (the error screen).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trap {
    /// The program counter left the program image.
    InvalidPc(u32),
    /// An opcode with no handler.
    InvalidOpcode(u8),
    /// An ECALL with an unpopulated syscall number.
    InvalidSyscall(u32),
    /// Any other instruction-level fault (bad funct fields, bad memory
    /// operand, EBREAK).
    InstructionError,
    /// The program executed the same instruction twice in a row without
    /// moving.
    ProgramLocked,
    /// The wall-clock budget for one sync ran out.
    SyncTimeout,
}

impl std::fmt::Display for Trap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trap::InvalidPc(pc) => write!(f, "invalid pc: {}", pc),
            Trap::InvalidOpcode(opcode) => write!(f, "invalid opcode: {}", opcode),
            Trap::InvalidSyscall(number) => write!(f, "invalid syscall: {}", number),
            Trap::InstructionError => write!(f, "instruction error"),
            Trap::ProgramLocked => write!(f, "program locked"),
            Trap::SyncTimeout => write!(f, "sync timeout"),
        }
    }
}

impl std::error::Error for Trap {}

/// How a successful sync ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The guest yielded the frame through the sync syscall.
    Yielded,
    /// The guest asked to exit.
    Exited,
}

/// What an executed instruction asks the run loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Yield,
    Exit,
}

/// The host capabilities a running guest can reach through syscalls.
pub struct Host<'a> {
    pub graphics: &'a mut Graphics,
    pub spu: &'a mut Spu,
    pub engine: &'a mut Engine,
    pub input: &'a InputState,
    pub clock: &'a dyn ClockDriver,
    pub battery_percent: u8,
    pub frame_time: u64,
}

#[derive(Debug, Clone, Copy)]
struct Fault {
    pc: u32,
    instruction: u32,
}

/// The interpreter state: guest memory, the register file, and the
/// syscall scratch registers.
pub struct Vm {
    memory: GuestMemory,
    registers: [i32; 32],
    pc: u32,
    pc_snapshot: u32,
    speed_multiplier: Fixed,
    scratch: SyscallScratch,
    rng_state: u32,
    last_fault: Option<Fault>,
    last_sync_time: u64,
}

impl Vm {
    pub fn new() -> Self {
        Vm {
            memory: GuestMemory::new(),
            registers: [0; 32],
            pc: 0,
            pc_snapshot: 0,
            speed_multiplier: Fixed::ZERO,
            scratch: SyscallScratch::new(),
            rng_state: 0x9E37_79B9,
            last_fault: None,
            last_sync_time: 0,
        }
    }

    /// Read a register. x0 always reads zero.
    #[inline]
    fn x(&self, register_index: usize) -> i32 {
        if register_index < 32 {
            self.registers[register_index]
        } else {
            0
        }
    }

    /// Write a register. Writes to x0 are discarded.
    #[inline]
    fn set_x(&mut self, register_index: usize, value: i32) {
        if register_index > 0 && register_index < 32 {
            self.registers[register_index] = value;
        }
    }

    /// A register value, for states and tests.
    pub fn register(&self, register_index: usize) -> i32 {
        self.x(register_index)
    }

    /// The current (physical) program counter.
    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn memory(&self) -> &GuestMemory {
        &self.memory
    }

    /// Seed the guest-visible random stream.
    pub fn seed_random(&mut self, seed: u32) {
        self.rng_state = if seed == 0 { 0x9E37_79B9 } else { seed };
    }

    pub(crate) fn next_random(&mut self) -> u32 {
        let mut x = self.rng_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng_state = x;
        x
    }

    /// Duration of the last sync in microseconds.
    pub fn last_sync_time(&self) -> u64 {
        self.last_sync_time
    }

    /// Where and what the last trap hit, disassembled.
    pub fn fault_details(&self) -> Option<String> {
        self.last_fault.map(|fault| {
            format!(
                "pc {:#07x}: {}",
                fault.pc,
                disasm::disassemble(fault.instruction)
            )
        })
    }

    /// Run the guest until it yields the frame, exits, or traps.
    ///
    /// The speed multiplier is what the sync syscall hands back to the
    /// guest in a0 and what the engine sync scales motion by.
    pub fn sync(&mut self, speed_multiplier: Fixed, host: &mut Host<'_>) -> Result<SyncOutcome, Trap> {
        let start_time = host.clock.tick();
        let result = self.run(speed_multiplier, host, start_time);
        self.last_sync_time = host.clock.tick().saturating_sub(start_time);
        result
    }

    fn run(
        &mut self,
        speed_multiplier: Fixed,
        host: &mut Host<'_>,
        start_time: u64,
    ) -> Result<SyncOutcome, Trap> {
        let mut instruction_counter: u64 = 0;
        let mut is_locked = false;

        self.speed_multiplier = speed_multiplier;
        self.last_fault = None;

        loop {
            if self.pc as u64 + 4 > self.memory.program_size() as u64 {
                self.last_fault = Some(Fault {
                    pc: self.pc,
                    instruction: 0,
                });
                return Err(Trap::InvalidPc(self.pc));
            }

            self.pc_snapshot = self.pc;
            let instruction = self.memory.fetch(self.pc);

            self.pc += 4;
            instruction_counter += 1;

            match self.step(instruction, host) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Yield) => return Ok(SyncOutcome::Yielded),
                Ok(Flow::Exit) => return Ok(SyncOutcome::Exited),
                Err(trap) => {
                    self.last_fault = Some(Fault {
                        pc: self.pc_snapshot,
                        instruction,
                    });
                    return Err(trap);
                }
            }

            // A taken jump back onto itself makes no progress; allow it
            // once, trap the second time.
            if self.pc == self.pc_snapshot {
                if is_locked {
                    self.last_fault = Some(Fault {
                        pc: self.pc_snapshot,
                        instruction,
                    });
                    return Err(Trap::ProgramLocked);
                }
                is_locked = true;
            } else {
                is_locked = false;
            }

            // The wall clock is only consulted once the instruction gate
            // opens, so short frames never pay for it.
            if instruction_counter >= SYNC_CHECK_INTERVAL
                && host.clock.tick().saturating_sub(start_time) > MAX_SYNC_TIME
            {
                return Err(Trap::SyncTimeout);
            }
        }
    }

    fn step(&mut self, instruction: u32, host: &mut Host<'_>) -> Result<Flow, Trap> {
        let opcode = (instruction & 0x7F) as u8;

        match opcode {
            // Zero padding executes as a no-op.
            0b000_0000 => Ok(Flow::Continue),
            // FENCE: single hart, nothing to order.
            0b000_1111 => Ok(Flow::Continue),
            0b000_0011 => self.op_load(instruction).map(|_| Flow::Continue),
            0b010_0011 => self.op_store(instruction).map(|_| Flow::Continue),
            0b001_0011 => self.op_immediate(instruction).map(|_| Flow::Continue),
            0b011_0011 => self.op_register(instruction).map(|_| Flow::Continue),
            0b001_0111 => {
                // AUIPC is relative to the instruction's own address.
                let value = (self.pc_snapshot as i32).wrapping_add(decode::imm_u(instruction));
                self.set_x(decode::rd(instruction), value);
                Ok(Flow::Continue)
            }
            0b011_0111 => {
                self.set_x(decode::rd(instruction), decode::imm_u(instruction));
                Ok(Flow::Continue)
            }
            0b110_0011 => self.op_branch(instruction).map(|_| Flow::Continue),
            0b110_0111 => self.op_indirect_jump(instruction).map(|_| Flow::Continue),
            0b110_1111 => self.op_jump(instruction).map(|_| Flow::Continue),
            0b111_0011 => self.op_system(instruction, host),
            other => Err(Trap::InvalidOpcode(other)),
        }
    }

    // JAL
    fn op_jump(&mut self, instruction: u32) -> Result<(), Trap> {
        let target = self
            .pc_snapshot
            .wrapping_add(decode::imm_j(instruction) as u32);

        let Some(translated) = self.memory.translate(target as i64, 4) else {
            return Err(Trap::InstructionError);
        };

        self.set_x(decode::rd(instruction), self.pc as i32);
        self.pc = translated;

        Ok(())
    }

    // JALR
    fn op_indirect_jump(&mut self, instruction: u32) -> Result<(), Trap> {
        let target = self
            .x(decode::rs1(instruction))
            .wrapping_add(decode::imm_i(instruction))
            & !1;

        let Some(translated) = self.memory.translate(target as i64, 4) else {
            return Err(Trap::InstructionError);
        };

        self.set_x(decode::rd(instruction), self.pc as i32);
        self.pc = translated;

        Ok(())
    }

    fn op_immediate(&mut self, instruction: u32) -> Result<(), Trap> {
        let rd = decode::rd(instruction);
        let rs1_value = self.x(decode::rs1(instruction));
        let imm = decode::imm_i(instruction);

        match decode::funct3(instruction) {
            0b000 => self.set_x(rd, rs1_value.wrapping_add(imm)), // ADDI
            0b001 => self.set_x(rd, rs1_value.wrapping_shl(decode::shamt(instruction))), // SLLI
            0b010 => self.set_x(rd, (rs1_value < imm) as i32),    // SLTI
            0b011 => self.set_x(rd, ((rs1_value as u32) < imm as u32) as i32), // SLTIU
            0b100 => self.set_x(rd, rs1_value ^ imm),             // XORI
            0b101 => match decode::funct7(instruction) {
                // SRLI
                0b000_0000 => {
                    self.set_x(
                        rd,
                        (rs1_value as u32).wrapping_shr(decode::shamt(instruction)) as i32,
                    );
                }
                // SRAI
                0b010_0000 => {
                    self.set_x(rd, rs1_value.wrapping_shr(decode::shamt(instruction)));
                }
                _ => return Err(Trap::InstructionError),
            },
            0b110 => self.set_x(rd, rs1_value | imm), // ORI
            0b111 => self.set_x(rd, rs1_value & imm), // ANDI
            _ => return Err(Trap::InstructionError),
        }

        Ok(())
    }

    fn op_register(&mut self, instruction: u32) -> Result<(), Trap> {
        let rd = decode::rd(instruction);
        let a = self.x(decode::rs1(instruction));
        let b = self.x(decode::rs2(instruction));
        let funct3 = decode::funct3(instruction);
        let funct7 = decode::funct7(instruction);

        let value = match (funct3, funct7) {
            (0b000, 0b000_0000) => a.wrapping_add(b),                    // ADD
            (0b000, 0b010_0000) => a.wrapping_sub(b),                    // SUB
            (0b000, 0b000_0001) => a.wrapping_mul(b),                    // MUL
            (0b001, 0b000_0000) => a.wrapping_shl(b as u32),             // SLL
            (0b001, 0b000_0001) => ((a as i64).wrapping_mul(b as i64) >> 32) as i32, // MULH
            (0b010, 0b000_0000) => (a < b) as i32,                       // SLT
            (0b010, 0b000_0001) => {
                // MULHSU: signed * unsigned
                ((a as i64).wrapping_mul(b as u32 as i64) >> 32) as i32
            }
            (0b011, 0b000_0000) => ((a as u32) < b as u32) as i32,       // SLTU
            (0b011, 0b000_0001) => {
                // MULHU
                (((a as u32 as u64).wrapping_mul(b as u32 as u64)) >> 32) as i32
            }
            (0b100, 0b000_0000) => a ^ b,                                // XOR
            (0b100, 0b000_0001) => {
                // DIV, with the architectural corner cases
                if b == 0 {
                    -1
                } else if a == i32::MIN && b == -1 {
                    i32::MIN
                } else {
                    a.wrapping_div(b)
                }
            }
            (0b101, 0b000_0000) => ((a as u32).wrapping_shr(b as u32)) as i32, // SRL
            (0b101, 0b010_0000) => a.wrapping_shr(b as u32),             // SRA
            (0b101, 0b000_0001) => {
                // DIVU
                if b == 0 {
                    -1
                } else {
                    ((a as u32) / b as u32) as i32
                }
            }
            (0b110, 0b000_0000) => a | b,                                // OR
            (0b110, 0b000_0001) => {
                // REM
                if b == 0 {
                    a
                } else if a == i32::MIN && b == -1 {
                    0
                } else {
                    a.wrapping_rem(b)
                }
            }
            (0b111, 0b000_0000) => a & b,                                // AND
            (0b111, 0b000_0001) => {
                // REMU
                if b == 0 {
                    a
                } else {
                    ((a as u32) % b as u32) as i32
                }
            }
            _ => return Err(Trap::InstructionError),
        };

        self.set_x(rd, value);
        Ok(())
    }

    fn op_branch(&mut self, instruction: u32) -> Result<(), Trap> {
        let target = (self.pc_snapshot as i32).wrapping_add(decode::imm_b(instruction));

        let Some(translated) = self.memory.translate(target as i64, 4) else {
            return Err(Trap::InstructionError);
        };

        let a = self.x(decode::rs1(instruction));
        let b = self.x(decode::rs2(instruction));

        let taken = match decode::funct3(instruction) {
            0b000 => a == b,                     // BEQ
            0b001 => a != b,                     // BNE
            0b100 => a < b,                      // BLT
            0b101 => a >= b,                     // BGE
            0b110 => (a as u32) < b as u32,      // BLTU
            0b111 => (a as u32) >= b as u32,     // BGEU
            _ => return Err(Trap::InstructionError),
        };

        if taken {
            self.pc = translated;
        }

        Ok(())
    }

    fn op_load(&mut self, instruction: u32) -> Result<(), Trap> {
        let address = self
            .x(decode::rs1(instruction))
            .wrapping_add(decode::imm_i(instruction));
        let funct3 = decode::funct3(instruction);

        let word_size = match funct3 {
            0b000 | 0b100 => 1,
            0b001 | 0b101 => 2,
            0b010 => 4,
            _ => return Err(Trap::InstructionError),
        };

        let Some(translated) = self.memory.translate(address as i64, word_size) else {
            return Err(Trap::InstructionError);
        };

        let value = match funct3 {
            0b000 => self.memory.load_byte(translated) as i8 as i32, // LB
            0b001 => self.memory.load_half(translated) as i16 as i32, // LH
            0b010 => self.memory.load_word(translated) as i32,       // LW
            0b100 => self.memory.load_byte(translated) as i32,       // LBU
            _ => self.memory.load_half(translated) as i32,           // LHU
        };

        self.set_x(decode::rd(instruction), value);
        Ok(())
    }

    fn op_store(&mut self, instruction: u32) -> Result<(), Trap> {
        let address = self
            .x(decode::rs1(instruction))
            .wrapping_add(decode::imm_s(instruction));
        let value = self.x(decode::rs2(instruction));

        let word_size = match decode::funct3(instruction) {
            0b000 => 1,
            0b001 => 2,
            0b010 => 4,
            _ => return Err(Trap::InstructionError),
        };

        let Some(translated) = self.memory.translate(address as i64, word_size) else {
            return Err(Trap::InstructionError);
        };

        match word_size {
            1 => self.memory.store_byte(translated, value as u8),
            2 => self.memory.store_half(translated, value as u16),
            _ => self.memory.store_word(translated, value as u32),
        }

        Ok(())
    }

    fn op_system(&mut self, instruction: u32, host: &mut Host<'_>) -> Result<Flow, Trap> {
        match decode::funct3(instruction) {
            0b000 => match decode::imm_i_raw(instruction) {
                0b0000_0000_0000 => self.dispatch_syscall(host), // ECALL
                0b0000_0000_0001 => Err(Trap::InstructionError), // EBREAK
                0b0001_0000_0010 => Ok(Flow::Continue),          // SRET
                0b0011_0000_0010 => Ok(Flow::Continue),          // MRET
                _ => Err(Trap::InstructionError),
            },
            // CSR accesses are accepted and ignored.
            0b001 | 0b010 | 0b011 | 0b101 | 0b110 | 0b111 => Ok(Flow::Continue),
            _ => Err(Trap::InstructionError),
        }
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_x0_reads_zero_after_write() {
        let mut vm = Vm::new();
        vm.set_x(reg::ZERO, 123);
        assert_eq!(vm.x(reg::ZERO), 0, "x0 is hardwired to zero");
    }

    #[test]
    fn test_register_write_and_read() {
        let mut vm = Vm::new();
        vm.set_x(reg::A0, -55);
        assert_eq!(vm.x(reg::A0), -55);
        assert_eq!(vm.register(reg::A0), -55);
    }

    #[test]
    fn test_out_of_range_register_reads_zero() {
        let mut vm = Vm::new();
        vm.set_x(40, 7);
        assert_eq!(vm.x(40), 0);
    }

    #[test]
    fn test_random_stream_is_deterministic() {
        let mut first = Vm::new();
        let mut second = Vm::new();
        first.seed_random(7);
        second.seed_random(7);

        for _ in 0..16 {
            assert_eq!(first.next_random(), second.next_random());
        }
    }

    #[test]
    fn test_trap_messages() {
        assert_eq!(Trap::InvalidPc(16).to_string(), "invalid pc: 16");
        assert_eq!(Trap::InvalidOpcode(9).to_string(), "invalid opcode: 9");
        assert_eq!(Trap::InvalidSyscall(99).to_string(), "invalid syscall: 99");
        assert_eq!(Trap::InstructionError.to_string(), "instruction error");
        assert_eq!(Trap::ProgramLocked.to_string(), "program locked");
        assert_eq!(Trap::SyncTimeout.to_string(), "sync timeout");
    }
}
