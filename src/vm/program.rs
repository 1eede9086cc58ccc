// Program loading - the PVMP container format
//
// A program file is an 18-byte little-endian header followed by the raw
// image: magic, format version, image size, entrypoint, and the linker's
// memory base. The image is copied verbatim to guest address zero; the
// entrypoint goes through address translation so linkers may emit either
// flat or rebased entry addresses.

use crate::drivers::StorageDriver;
use crate::fixed::Fixed;

use super::memory::MEMORY_SIZE;
use super::{reg, Vm};

const fn four_cc(a: u8, b: u8, c: u8, d: u8) -> u32 {
    ((d as u32) << 24) | ((c as u32) << 16) | ((b as u32) << 8) | a as u32
}

/// `PVMP`, with the first character in the low byte.
pub const PROGRAM_MAGIC: u32 = four_cc(b'P', b'V', b'M', b'P');

/// The only container version this runtime understands.
pub const PROGRAM_VERSION: u16 = 1;

/// Size of the packed file header in bytes.
pub const PROGRAM_HEADER_SIZE: usize = 18;

/// The program file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramHeader {
    pub magic: u32,
    pub version: u16,
    pub program_size: u32,
    pub entrypoint: u32,
    pub memory_offset: u32,
}

impl ProgramHeader {
    /// A valid header for a program image.
    pub fn new(program_size: u32, entrypoint: u32, memory_offset: u32) -> Self {
        ProgramHeader {
            magic: PROGRAM_MAGIC,
            version: PROGRAM_VERSION,
            program_size,
            entrypoint,
            memory_offset,
        }
    }

    /// Decode the packed header. Returns `None` when `bytes` is too short.
    pub fn parse(bytes: &[u8]) -> Option<ProgramHeader> {
        if bytes.len() < PROGRAM_HEADER_SIZE {
            return None;
        }

        let word = |offset: usize| {
            u32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ])
        };

        Some(ProgramHeader {
            magic: word(0),
            version: u16::from_le_bytes([bytes[4], bytes[5]]),
            program_size: word(6),
            entrypoint: word(10),
            memory_offset: word(14),
        })
    }

    /// Encode the packed header.
    pub fn to_bytes(&self) -> [u8; PROGRAM_HEADER_SIZE] {
        let mut bytes = [0u8; PROGRAM_HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
        bytes[6..10].copy_from_slice(&self.program_size.to_le_bytes());
        bytes[10..14].copy_from_slice(&self.entrypoint.to_le_bytes());
        bytes[14..18].copy_from_slice(&self.memory_offset.to_le_bytes());
        bytes
    }
}

/// Why a program file was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramError {
    /// The storage backend could not deliver the requested bytes.
    Storage,
    /// The magic number is not `PVMP`.
    BadMagic(u32),
    /// A container version this runtime does not understand.
    BadVersion(u16),
    /// The file size does not match header + image.
    SizeMismatch { file_size: u32, expected: u64 },
    /// The image does not fit guest memory.
    Oversize(u32),
    /// The entrypoint does not translate to a valid instruction address.
    InvalidLayout,
}

impl std::fmt::Display for ProgramError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgramError::Storage => write!(f, "storage read failed"),
            ProgramError::BadMagic(magic) => write!(f, "bad magic number: 0x{:08x}", magic),
            ProgramError::BadVersion(version) => write!(f, "unsupported version: {}", version),
            ProgramError::SizeMismatch { file_size, expected } => {
                write!(f, "file size {} does not match expected {}", file_size, expected)
            }
            ProgramError::Oversize(size) => write!(f, "program too large: {} bytes", size),
            ProgramError::InvalidLayout => write!(f, "invalid entrypoint or memory layout"),
        }
    }
}

impl std::error::Error for ProgramError {}

impl Vm {
    /// Load a program from an already-opened storage file and reset the
    /// machine to run it.
    pub fn load_program(&mut self, storage: &mut dyn StorageDriver) -> Result<(), ProgramError> {
        let mut header_bytes = [0u8; PROGRAM_HEADER_SIZE];
        if !storage.read_file(&mut header_bytes) {
            return Err(ProgramError::Storage);
        }

        let header = ProgramHeader::parse(&header_bytes).ok_or(ProgramError::Storage)?;

        if header.magic != PROGRAM_MAGIC {
            return Err(ProgramError::BadMagic(header.magic));
        }

        if header.version != PROGRAM_VERSION {
            return Err(ProgramError::BadVersion(header.version));
        }

        let expected = header.program_size as u64 + PROGRAM_HEADER_SIZE as u64;
        let file_size = storage.file_size();
        if file_size as u64 != expected {
            return Err(ProgramError::SizeMismatch { file_size, expected });
        }

        if header.program_size > MEMORY_SIZE as u32 {
            return Err(ProgramError::Oversize(header.program_size));
        }

        self.reset(header.entrypoint, header.memory_offset, header.program_size)?;

        if !storage.read_file(&mut self.memory.bytes_mut()[..header.program_size as usize]) {
            return Err(ProgramError::Storage);
        }

        Ok(())
    }

    /// Load a raw program image directly, without the file container.
    pub fn load_image(
        &mut self,
        image: &[u8],
        entrypoint: u32,
        memory_offset: u32,
    ) -> Result<(), ProgramError> {
        if image.len() > MEMORY_SIZE {
            return Err(ProgramError::Oversize(image.len() as u32));
        }

        self.reset(entrypoint, memory_offset, image.len() as u32)?;
        self.memory.bytes_mut()[..image.len()].copy_from_slice(image);

        Ok(())
    }

    /// Wipe memory and registers and point the machine at a new program.
    fn reset(
        &mut self,
        entrypoint: u32,
        memory_offset: u32,
        program_size: u32,
    ) -> Result<(), ProgramError> {
        if program_size > MEMORY_SIZE as u32 {
            return Err(ProgramError::Oversize(program_size));
        }

        self.memory.reset(memory_offset, program_size);
        self.registers = [0; 32];
        self.speed_multiplier = Fixed::ZERO;
        self.scratch.reset();
        self.last_fault = None;

        let translated = self
            .memory
            .translate(entrypoint as i64, 4)
            .ok_or(ProgramError::InvalidLayout)?;

        self.pc = translated;
        self.pc_snapshot = translated;
        self.set_x(reg::SP, MEMORY_SIZE as i32);

        Ok(())
    }
}
