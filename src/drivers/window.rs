// Window front-end - desktop display and keyboard input
//
// Runs the kernel inside a winit event loop and blits the indexed
// framebuffer through a pixels surface, scaled up to the window. Keyboard
// state is shared with the kernel's input driver through an atomic button
// mask, the same way a memory-mapped GPIO bank would behave on hardware.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use pixels::{Pixels, SurfaceTexture};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::drivers::InputDriver;
use crate::gpu::{SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::input::buttons;
use crate::kernel::{Kernel, TARGET_FRAME_TIME};
use crate::screenshot::save_screenshot;

/// Window configuration
#[derive(Debug, Clone, Copy)]
pub struct WindowConfig {
    /// Scale factor (1x-8x)
    pub scale: u32,
    /// Whether to enable VSync-style waiting between frames
    pub vsync: bool,
}

impl WindowConfig {
    pub fn new() -> Self {
        Self {
            scale: 4,
            vsync: true,
        }
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale.clamp(1, 8);
        self
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn window_width(&self) -> u32 {
        SCREEN_WIDTH as u32 * self.scale
    }

    pub fn window_height(&self) -> u32 {
        SCREEN_HEIGHT as u32 * self.scale
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Keyboard bindings for the eight console buttons.
#[derive(Debug, Clone)]
pub struct KeyboardMapping {
    pub up: KeyCode,
    pub down: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    pub button_a: KeyCode,
    pub button_b: KeyCode,
    pub button_x: KeyCode,
    pub button_y: KeyCode,
}

impl KeyboardMapping {
    /// Arrows for the D-pad, ZXAS for the face buttons.
    pub fn default_mapping() -> Self {
        Self {
            up: KeyCode::ArrowUp,
            down: KeyCode::ArrowDown,
            left: KeyCode::ArrowLeft,
            right: KeyCode::ArrowRight,
            button_a: KeyCode::KeyX,
            button_b: KeyCode::KeyZ,
            button_x: KeyCode::KeyS,
            button_y: KeyCode::KeyA,
        }
    }

    fn button_for(&self, key: KeyCode) -> Option<u8> {
        if key == self.up {
            Some(buttons::UP)
        } else if key == self.down {
            Some(buttons::DOWN)
        } else if key == self.left {
            Some(buttons::LEFT)
        } else if key == self.right {
            Some(buttons::RIGHT)
        } else if key == self.button_a {
            Some(buttons::A)
        } else if key == self.button_b {
            Some(buttons::B)
        } else if key == self.button_x {
            Some(buttons::X)
        } else if key == self.button_y {
            Some(buttons::Y)
        } else {
            None
        }
    }
}

/// An input driver fed by the window's keyboard events.
pub struct SharedButtons(Arc<AtomicU8>);

impl SharedButtons {
    pub fn new(mask: Arc<AtomicU8>) -> Self {
        SharedButtons(mask)
    }
}

impl InputDriver for SharedButtons {
    fn sync(&mut self) -> u8 {
        self.0.load(Ordering::Relaxed)
    }
}

struct ConsoleApp {
    kernel: Kernel,
    config: WindowConfig,
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    mapping: KeyboardMapping,
    button_mask: Arc<AtomicU8>,
    last_frame_time: Instant,
}

impl ConsoleApp {
    fn render(&mut self) -> Result<(), pixels::Error> {
        if let Some(pixels) = &mut self.pixels {
            let frame = pixels.frame_mut();
            let gpu = self.kernel.graphics().gpu();
            let framebuffer = gpu.framebuffer();
            let palette = gpu.palette();

            for (pixel_index, &color_index) in framebuffer.iter().enumerate() {
                let palette_base = color_index as usize * 3;
                let frame_base = pixel_index * 4;
                frame[frame_base..frame_base + 3]
                    .copy_from_slice(&palette[palette_base..palette_base + 3]);
                frame[frame_base + 3] = 0xFF;
            }

            pixels.render()?;
        }
        Ok(())
    }

    fn handle_key(&mut self, key: PhysicalKey, state: ElementState) {
        let PhysicalKey::Code(code) = key else {
            return;
        };

        if code == KeyCode::F9 && state == ElementState::Pressed {
            let directory = self.kernel.config().diagnostics.screenshot_directory.clone();
            let gpu = self.kernel.graphics().gpu();
            match save_screenshot(gpu.framebuffer(), gpu.palette(), &directory) {
                Ok(path) => println!("Screenshot saved to {}", path.display()),
                Err(error) => eprintln!("Screenshot failed: {}", error),
            }
            return;
        }

        if let Some(button) = self.mapping.button_for(code) {
            match state {
                ElementState::Pressed => {
                    self.button_mask.fetch_or(button, Ordering::Relaxed);
                }
                ElementState::Released => {
                    self.button_mask.fetch_and(!button, Ordering::Relaxed);
                }
            }
        }
    }

    fn frame_elapsed(&mut self) -> bool {
        let frame_duration = Duration::from_micros(TARGET_FRAME_TIME);
        if self.last_frame_time.elapsed() >= frame_duration {
            self.last_frame_time = Instant::now();
            true
        } else {
            false
        }
    }
}

impl ApplicationHandler for ConsoleApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title("Portatil")
            .with_inner_size(LogicalSize::new(
                self.config.window_width(),
                self.config.window_height(),
            ))
            .with_resizable(false);

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(error) => {
                eprintln!("Failed to create window: {}", error);
                event_loop.exit();
                return;
            }
        };

        let window_size = window.inner_size();
        let surface_texture =
            SurfaceTexture::new(window_size.width, window_size.height, window.clone());

        match Pixels::new(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32, surface_texture) {
            Ok(pixels) => {
                self.window = Some(window);
                self.pixels = Some(pixels);
            }
            Err(error) => {
                eprintln!("Failed to create pixel surface: {}", error);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.kernel.request_shutdown();
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event: KeyEvent {
                    physical_key,
                    state,
                    ..
                },
                ..
            } => {
                self.handle_key(physical_key, state);
            }
            WindowEvent::RedrawRequested => {
                if self.frame_elapsed() {
                    self.kernel.step_frame(false);

                    if self.kernel.is_shutdown_requested() {
                        event_loop.exit();
                        return;
                    }

                    if let Err(error) = self.render() {
                        eprintln!("Render error: {}", error);
                        event_loop.exit();
                    }
                }

                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Run the kernel under a desktop window until it shuts down.
///
/// The kernel's input driver is combined with the window's keyboard so a
/// gamepad driver installed earlier keeps working.
pub fn run_windowed(mut kernel: Kernel, config: WindowConfig) -> Result<(), Box<dyn std::error::Error>> {
    let button_mask = Arc::new(AtomicU8::new(0));

    let existing_input = std::mem::replace(
        &mut kernel.drivers.input,
        Box::new(crate::drivers::NullInput),
    );
    kernel.drivers.input = Box::new(crate::drivers::CombinedInput(vec![
        existing_input,
        Box::new(SharedButtons::new(Arc::clone(&button_mask))),
    ]));

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(if config.vsync {
        ControlFlow::Wait
    } else {
        ControlFlow::Poll
    });

    let mut app = ConsoleApp {
        kernel,
        config,
        window: None,
        pixels: None,
        mapping: KeyboardMapping::default_mapping(),
        button_mask,
        last_frame_time: Instant::now(),
    };

    event_loop.run_app(&mut app)?;

    Ok(())
}
