// Portatil - Main Entry Point
//
// Boots the console kernel with the desktop driver set: local directory
// storage, the sysfs battery gauge, and (feature-dependent) a scaled
// window, cpal audio, and gamepad input.

use portatil::drivers::{Drivers, SysfsPower};
use portatil::{DirectoryStorage, Kernel, RuntimeConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Portatil v{}", env!("CARGO_PKG_VERSION"));

    let config = RuntimeConfig::load_or_default();
    println!("Storage root: {}", config.storage.root.display());

    let storage = DirectoryStorage::new(&config.storage.root);
    let mut drivers = Drivers::headless(Box::new(storage));
    drivers.power = Box::new(SysfsPower::new());

    #[cfg(feature = "gamepad")]
    match portatil::drivers::gamepad::GamepadInput::new() {
        Ok(gamepad) => drivers.input = Box::new(gamepad),
        Err(error) => eprintln!("Continuing without gamepad support: {}", error),
    }

    #[cfg(feature = "audio")]
    if config.audio.enabled {
        match portatil::drivers::speaker::CpalSpeaker::new(config.audio.volume) {
            Ok(speaker) => drivers.speaker = Box::new(speaker),
            Err(error) => eprintln!("Continuing without audio: {}", error),
        }
    }

    let kernel = Kernel::new(drivers, config);

    #[cfg(feature = "display")]
    {
        let window_config = portatil::drivers::window::WindowConfig::new()
            .with_scale(kernel.config().video.scale)
            .with_vsync(kernel.config().video.vsync);

        portatil::drivers::window::run_windowed(kernel, window_config)?;
    }

    #[cfg(not(feature = "display"))]
    {
        let mut kernel = kernel;
        println!("No display feature enabled; running headless.");
        kernel.run();
    }

    Ok(())
}
