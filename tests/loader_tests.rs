// Program loader tests
//
// Drives `Vm::load_program` through an in-memory storage double: header
// validation, the size invariants, and the image round trip into guest
// memory.

mod common;

use common::{abi::*, asm::*};
use portatil::drivers::{StorageDriver, StorageEntry};
use portatil::vm::{ProgramError, ProgramHeader, SyncOutcome, Vm, MEMORY_SIZE, PROGRAM_HEADER_SIZE};

/// Storage that serves one in-memory file.
struct MemoryStorage {
    data: Vec<u8>,
    position: usize,
    reported_size: u32,
}

impl MemoryStorage {
    fn new(data: Vec<u8>) -> Self {
        let reported_size = data.len() as u32;
        MemoryStorage {
            data,
            position: 0,
            reported_size,
        }
    }

    /// Lie about the file size, to provoke the mismatch check.
    fn with_reported_size(mut self, size: u32) -> Self {
        self.reported_size = size;
        self
    }
}

impl StorageDriver for MemoryStorage {
    fn open_directory(&mut self, _directory_path: &str) -> bool {
        false
    }

    fn read_directory(&mut self) -> Option<StorageEntry> {
        None
    }

    fn close_directory(&mut self) {}

    fn open_file(&mut self, _file_path: &str) -> bool {
        self.position = 0;
        true
    }

    fn file_size(&self) -> u32 {
        self.reported_size
    }

    fn read_file(&mut self, buffer: &mut [u8]) -> bool {
        if self.position + buffer.len() > self.data.len() {
            return false;
        }
        buffer.copy_from_slice(&self.data[self.position..self.position + buffer.len()]);
        self.position += buffer.len();
        true
    }

    fn close_file(&mut self) {}
}

fn program_file(image: &[u8], entrypoint: u32, memory_offset: u32) -> Vec<u8> {
    let header = ProgramHeader::new(image.len() as u32, entrypoint, memory_offset);
    let mut file = header.to_bytes().to_vec();
    file.extend_from_slice(image);
    file
}

fn sample_image() -> Vec<u8> {
    let words = [addi(T0, ZERO, 7), addi(A7, ZERO, 1), ecall()];
    let mut image = Vec::new();
    for word in words {
        image.extend_from_slice(&word.to_le_bytes());
    }
    image
}

#[test]
fn test_valid_program_loads_byte_for_byte() {
    let image = sample_image();
    let mut storage = MemoryStorage::new(program_file(&image, 0, 0));
    let mut vm = Vm::new();

    assert!(storage.open_file("game.rvp"));
    vm.load_program(&mut storage).expect("program should load");

    assert_eq!(&vm.memory().bytes()[..image.len()], &image[..]);
    assert!(
        vm.memory().bytes()[image.len()..].iter().all(|&byte| byte == 0),
        "memory past the image stays zeroed"
    );
    assert_eq!(vm.register(2), MEMORY_SIZE as i32, "SP starts at the top");
}

#[test]
fn test_loaded_program_runs() {
    let image = sample_image();
    let mut storage = MemoryStorage::new(program_file(&image, 0, 0));
    let mut vm = Vm::new();

    storage.open_file("game.rvp");
    vm.load_program(&mut storage).unwrap();

    let mut console = common::TestConsole::new();
    console.vm = vm;
    assert_eq!(console.sync(), Ok(SyncOutcome::Exited));
    assert_eq!(console.vm.register(5), 7);
}

#[test]
fn test_bad_magic_is_rejected() {
    let image = sample_image();
    let mut file = program_file(&image, 0, 0);
    file[0] = b'X';

    let mut storage = MemoryStorage::new(file);
    storage.open_file("game.rvp");

    let mut vm = Vm::new();
    assert!(matches!(
        vm.load_program(&mut storage),
        Err(ProgramError::BadMagic(_))
    ));
}

#[test]
fn test_unknown_version_is_rejected() {
    let image = sample_image();
    let mut file = program_file(&image, 0, 0);
    file[4] = 2;

    let mut storage = MemoryStorage::new(file);
    storage.open_file("game.rvp");

    let mut vm = Vm::new();
    assert_eq!(vm.load_program(&mut storage), Err(ProgramError::BadVersion(2)));
}

#[test]
fn test_file_size_mismatch_is_rejected() {
    let image = sample_image();
    let file = program_file(&image, 0, 0);
    let actual_size = file.len() as u32;

    let mut storage = MemoryStorage::new(file).with_reported_size(actual_size + 4);
    storage.open_file("game.rvp");

    let mut vm = Vm::new();
    assert!(matches!(
        vm.load_program(&mut storage),
        Err(ProgramError::SizeMismatch { .. })
    ));
}

#[test]
fn test_oversize_program_is_rejected() {
    // A header claiming a 128 KiB image, with a consistent file size.
    let claimed_size = (MEMORY_SIZE * 2) as u32;
    let header = ProgramHeader::new(claimed_size, 0, 0);
    let mut storage = MemoryStorage::new(header.to_bytes().to_vec())
        .with_reported_size(claimed_size + PROGRAM_HEADER_SIZE as u32);
    storage.open_file("game.rvp");

    let mut vm = Vm::new();
    assert_eq!(
        vm.load_program(&mut storage),
        Err(ProgramError::Oversize(claimed_size))
    );
}

#[test]
fn test_truncated_file_is_rejected() {
    let image = sample_image();
    let mut file = program_file(&image, 0, 0);
    let reported = file.len() as u32;
    file.truncate(file.len() - 4);

    // The header still promises the full image, and the size matches, but
    // the storage cannot deliver the last bytes.
    let mut storage = MemoryStorage::new(file).with_reported_size(reported);
    storage.open_file("game.rvp");

    let mut vm = Vm::new();
    assert_eq!(vm.load_program(&mut storage), Err(ProgramError::Storage));
}

#[test]
fn test_rebased_header_round_trips() {
    let image = sample_image();
    let mut storage =
        MemoryStorage::new(program_file(&image, 0x1000_0000, 0x1000_0000));
    storage.open_file("game.rvp");

    let mut vm = Vm::new();
    vm.load_program(&mut storage).expect("rebased program should load");
    assert_eq!(vm.pc(), 0, "the entrypoint translates back to the image base");
}
