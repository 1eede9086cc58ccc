// Portatil Runtime Library
// A retro handheld console platform: an RV32IM guest interpreter with a
// 160x120 indexed-color GPU, a four-channel wavetable SPU, a sprite/entity
// engine, and a 30 Hz cooperative kernel.

// Public modules
pub mod assets;
pub mod config;
pub mod drivers;
pub mod engine;
pub mod fixed;
pub mod gpu;
pub mod graphics;
pub mod input;
pub mod kernel;
pub mod screenshot;
pub mod spu;
pub mod vm;

mod states;

// Re-export main types for convenience
pub use config::RuntimeConfig;
pub use drivers::{DirectoryStorage, Drivers};
pub use engine::{Engine, Entity, Sprite};
pub use fixed::Fixed;
pub use gpu::{Gpu, Image, Point, Rect};
pub use graphics::{BitmapFont, Graphics};
pub use input::InputState;
pub use kernel::Kernel;
pub use screenshot::save_screenshot;
pub use spu::{Spu, WaveType};
pub use vm::{Host, ProgramHeader, SyncOutcome, Trap, Vm};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_components() {
        // Every major component can be instantiated independently.
        let _fixed = Fixed::ONE;
        let _gpu = Gpu::new();
        let _graphics = Graphics::new();
        let _spu = Spu::new();
        let _engine = Engine::new();
        let _vm = Vm::new();
        let _input = InputState::new();
    }
}
