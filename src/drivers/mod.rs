// Drivers module - the seams between the runtime and the host platform
//
// Every side effect the kernel performs goes through one of these narrow
// traits: a monotonic clock, a display sink, a speaker sink, an input
// sampler, a battery gauge, and a storage backend. The desktop front-ends
// implement them over winit/pixels, cpal, and the local filesystem; tests
// plug in counting doubles; a hardware port would wire them to SPI and PWM.

mod storage;

#[cfg(feature = "gamepad")]
pub mod gamepad;
#[cfg(feature = "audio")]
pub mod speaker;
#[cfg(feature = "display")]
pub mod window;

pub use storage::DirectoryStorage;

use std::time::Instant;

use crate::gpu::{PALETTE_BYTES, SCREEN_PIXELS};
use crate::spu::SOUND_BUFFER_SIZE;

/// Monotonic time source. Ticks are microseconds.
pub trait ClockDriver {
    fn tick(&self) -> u64;

    /// Block for the given number of microseconds.
    fn wait(&self, microseconds: u64);
}

/// Receives the finished frame: palette indices plus the RGB palette.
///
/// The buffers are only guaranteed stable for the duration of the call;
/// implementations that blit asynchronously must copy.
pub trait DisplayDriver {
    fn sync(&mut self, framebuffer: &[u8; SCREEN_PIXELS], palette: &[u8; PALETTE_BYTES]);
}

/// Receives one frame of signed 8-bit mono samples at 22050 Hz.
pub trait SpeakerDriver {
    fn sync(&mut self, samples: &[i8; SOUND_BUFFER_SIZE]);
}

/// Samples the eight-button mask.
pub trait InputDriver {
    fn sync(&mut self) -> u8;
}

/// Samples the battery charge as a percentage.
pub trait PowerDriver {
    fn sync(&mut self) -> u8;
}

/// A directory entry as the storage backend reports it.
#[derive(Debug, Clone)]
pub struct StorageEntry {
    pub name: String,
    pub is_directory: bool,
    pub is_program: bool,
}

/// Filesystem access for the shell and the program loader.
///
/// Paths are forward-slash separated and relative to the backend's root.
/// One directory and one file may be open at a time.
pub trait StorageDriver {
    fn open_directory(&mut self, directory_path: &str) -> bool;

    /// The next entry of the open directory, or `None` at the end.
    fn read_directory(&mut self) -> Option<StorageEntry>;

    fn close_directory(&mut self);

    fn open_file(&mut self, file_path: &str) -> bool;

    /// Size of the open file in bytes.
    fn file_size(&self) -> u32;

    /// Fill `buffer` from the open file. Returns false on a short read.
    fn read_file(&mut self, buffer: &mut [u8]) -> bool;

    fn close_file(&mut self);
}

// Native implementations ------------------------------------------------

/// Clock over `std::time::Instant`.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockDriver for MonotonicClock {
    fn tick(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }

    fn wait(&self, microseconds: u64) {
        std::thread::sleep(std::time::Duration::from_micros(microseconds));
    }
}

/// Battery gauge over the Linux power-supply sysfs class. Reports a full
/// battery when no gauge is present.
pub struct SysfsPower {
    capacity_path: Option<std::path::PathBuf>,
}

impl SysfsPower {
    pub fn new() -> Self {
        let capacity_path = std::fs::read_dir("/sys/class/power_supply")
            .ok()
            .and_then(|entries| {
                entries
                    .flatten()
                    .map(|entry| entry.path().join("capacity"))
                    .find(|path| path.is_file())
            });

        SysfsPower { capacity_path }
    }
}

impl Default for SysfsPower {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerDriver for SysfsPower {
    fn sync(&mut self) -> u8 {
        let Some(path) = &self.capacity_path else {
            return 100;
        };

        std::fs::read_to_string(path)
            .ok()
            .and_then(|text| text.trim().parse::<u8>().ok())
            .map(|percent| percent.min(100))
            .unwrap_or(100)
    }
}

// Null implementations --------------------------------------------------

/// Discards frames.
pub struct NullDisplay;

impl DisplayDriver for NullDisplay {
    fn sync(&mut self, _framebuffer: &[u8; SCREEN_PIXELS], _palette: &[u8; PALETTE_BYTES]) {}
}

/// Discards samples.
pub struct NullSpeaker;

impl SpeakerDriver for NullSpeaker {
    fn sync(&mut self, _samples: &[i8; SOUND_BUFFER_SIZE]) {}
}

/// Reports no buttons held.
pub struct NullInput;

impl InputDriver for NullInput {
    fn sync(&mut self) -> u8 {
        0
    }
}

/// Reports a fixed charge level.
pub struct NullPower(pub u8);

impl PowerDriver for NullPower {
    fn sync(&mut self) -> u8 {
        self.0
    }
}

/// ORs together several input sources (keyboard plus gamepad, say).
pub struct CombinedInput(pub Vec<Box<dyn InputDriver>>);

impl InputDriver for CombinedInput {
    fn sync(&mut self) -> u8 {
        self.0.iter_mut().fold(0, |mask, driver| mask | driver.sync())
    }
}

/// A storage backend with nothing in it.
pub struct NullStorage;

impl StorageDriver for NullStorage {
    fn open_directory(&mut self, _directory_path: &str) -> bool {
        false
    }

    fn read_directory(&mut self) -> Option<StorageEntry> {
        None
    }

    fn close_directory(&mut self) {}

    fn open_file(&mut self, _file_path: &str) -> bool {
        false
    }

    fn file_size(&self) -> u32 {
        0
    }

    fn read_file(&mut self, _buffer: &mut [u8]) -> bool {
        false
    }

    fn close_file(&mut self) {}
}

/// The full driver set the kernel boots with.
pub struct Drivers {
    pub clock: Box<dyn ClockDriver>,
    pub display: Box<dyn DisplayDriver>,
    pub speaker: Box<dyn SpeakerDriver>,
    pub input: Box<dyn InputDriver>,
    pub power: Box<dyn PowerDriver>,
    pub storage: Box<dyn StorageDriver>,
}

impl Drivers {
    /// Native clock and storage, everything else discarded. The base set
    /// for headless runs and tests; front-ends replace individual drivers.
    pub fn headless(storage: Box<dyn StorageDriver>) -> Self {
        Drivers {
            clock: Box::new(MonotonicClock::new()),
            display: Box::new(NullDisplay),
            speaker: Box::new(NullSpeaker),
            input: Box::new(NullInput),
            power: Box::new(NullPower(100)),
            storage,
        }
    }
}
