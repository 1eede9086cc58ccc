// Kernel module - the frame-paced scheduler
//
// The kernel owns every subsystem and the outer loop. Each iteration it
// snapshots the clock, shifts the input state, dispatches the current
// runtime state (shell, game, pause, error), mixes one frame of audio,
// ships the framebuffer on the display cadence, samples the battery every
// ten seconds, and sleeps whatever is left of the 33.33 ms frame budget.

use crate::assets;
use crate::config::RuntimeConfig;
use crate::drivers::Drivers;
use crate::engine::Engine;
use crate::fixed::Fixed;
use crate::gpu::{Rect, SCREEN_WIDTH};
use crate::graphics::{anchor, Graphics};
use crate::input::InputState;
use crate::spu::Spu;
use crate::states;
use crate::states::{ErrorContext, InGameContext, ShellContext};
use crate::vm::Vm;

/// Nominal frame rate.
pub const TARGET_FPS: i32 = 30;

/// Frame budget in microseconds.
pub const TARGET_FRAME_TIME: u64 = 33_333;

/// Frame budget in whole milliseconds.
pub const TARGET_FRAME_TIME_MS: i32 = 33;

/// Battery sampling cadence in microseconds.
const POWER_SYNC_INTERVAL: u64 = 10_000_000;

/// Low-battery indicator blink period in microseconds.
const LOW_BATTERY_INDICATOR_INTERVAL: u64 = 500_000;

/// Battery percentage at which the indicator starts blinking.
const LOW_BATTERY_WARNING_PERCENT: u8 = 10;

/// Which state function the kernel dispatches each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    Boot,
    Shell,
    InGame,
    PauseMenu,
    Error,
}

/// The runtime: drivers, subsystems, and the state machine.
pub struct Kernel {
    pub(crate) drivers: Drivers,
    pub(crate) config: RuntimeConfig,
    pub(crate) graphics: Graphics,
    pub(crate) spu: Spu,
    pub(crate) engine: Engine,
    pub(crate) vm: Vm,
    pub(crate) input: InputState,
    pub(crate) state: RuntimeState,
    pub(crate) shell: ShellContext,
    pub(crate) in_game: InGameContext,
    pub(crate) error: ErrorContext,
    pub(crate) boot_splash_drawn: bool,
    pub(crate) battery_percent: u8,
    pub(crate) frame_time: u64,
    pub(crate) busy_frame_time: u64,
    pub(crate) storage_available: bool,
    last_sync_tick: u64,
    last_gpu_sync: u64,
    last_power_sync: u64,
    low_battery_counter: u64,
    show_low_battery: bool,
    shutdown_requested: bool,
}

impl Kernel {
    pub fn new(drivers: Drivers, config: RuntimeConfig) -> Self {
        let show_stats = config.diagnostics.show_stats;

        let mut kernel = Kernel {
            drivers,
            config,
            graphics: Graphics::new(),
            spu: Spu::new(),
            engine: Engine::new(),
            vm: Vm::new(),
            input: InputState::new(),
            state: RuntimeState::Boot,
            shell: ShellContext::new(),
            in_game: InGameContext::new(show_stats),
            error: ErrorContext::new(),
            boot_splash_drawn: false,
            battery_percent: 100,
            frame_time: 0,
            busy_frame_time: 0,
            storage_available: false,
            last_sync_tick: 0,
            last_gpu_sync: 0,
            last_power_sync: 0,
            low_battery_counter: 0,
            show_low_battery: false,
            shutdown_requested: false,
        };

        let input_sample = kernel.drivers.input.sync();
        kernel.input.shift(input_sample);
        kernel.battery_percent = kernel.drivers.power.sync();
        kernel.refresh_storage();
        kernel.last_sync_tick = kernel.drivers.clock.tick();

        kernel
    }

    /// Run frames until shutdown is requested.
    pub fn run(&mut self) {
        while !self.shutdown_requested {
            self.step_frame(true);
        }
    }

    /// Run one frame. With `pace` set the call sleeps away the residual
    /// frame budget; front-ends that schedule frames themselves pass
    /// false.
    pub fn step_frame(&mut self, pace: bool) {
        let sync_tick = self.drivers.clock.tick();

        self.frame_time = sync_tick.saturating_sub(self.last_sync_tick);
        let input_sample = self.drivers.input.sync();
        self.input.shift(input_sample);

        let frame_time = self.frame_time;
        match self.state {
            RuntimeState::Boot => states::boot_update(self),
            RuntimeState::Shell => states::shell_update(self),
            RuntimeState::InGame => states::in_game_update(self, frame_time),
            RuntimeState::PauseMenu => states::pause_menu_update(self),
            RuntimeState::Error => states::error_update(self),
        }

        self.update_low_battery_indicator();

        let now = self.drivers.clock.tick();
        let samples = self.spu.sync(now);
        self.drivers.speaker.sync(samples);

        if sync_tick.saturating_sub(self.last_gpu_sync) >= TARGET_FRAME_TIME {
            self.last_gpu_sync = sync_tick;
            self.drivers
                .display
                .sync(self.graphics.gpu().framebuffer(), self.graphics.gpu().palette());
        }

        if sync_tick.saturating_sub(self.last_power_sync) >= POWER_SYNC_INTERVAL {
            self.last_power_sync = sync_tick;
            self.battery_percent = self.drivers.power.sync();
        }

        self.busy_frame_time = self.drivers.clock.tick().saturating_sub(sync_tick);

        if pace && self.busy_frame_time < TARGET_FRAME_TIME {
            self.drivers
                .clock
                .wait(TARGET_FRAME_TIME - self.busy_frame_time);
        }

        self.last_sync_tick = sync_tick;
    }

    pub fn request_shutdown(&mut self) {
        self.shutdown_requested = true;
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested
    }

    /// The current frame and palette, for display front-ends.
    pub fn graphics(&self) -> &Graphics {
        &self.graphics
    }

    /// Which state the kernel will dispatch next frame.
    pub fn state(&self) -> RuntimeState {
        self.state
    }

    /// The configured runtime settings.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Duration of the last frame in microseconds.
    pub fn frame_time(&self) -> u64 {
        self.frame_time
    }

    /// Time spent working (not sleeping) during the last frame.
    pub fn busy_frame_time(&self) -> u64 {
        self.busy_frame_time
    }

    pub(crate) fn change_state(&mut self, state: RuntimeState) {
        self.state = state;
    }

    /// Show a message on the error screen, then continue at `next_state`.
    pub(crate) fn show_error(&mut self, next_state: RuntimeState, message: impl Into<String>) {
        self.error.message = message.into();
        self.error.next_state = next_state;
        self.state = RuntimeState::Error;
    }

    /// Drop and re-probe the storage backend. Used when the card is pulled.
    pub(crate) fn refresh_storage(&mut self) {
        self.storage_available = self.drivers.storage.open_directory("");
        self.drivers.storage.close_directory();
    }

    fn update_low_battery_indicator(&mut self) {
        if self.battery_percent > LOW_BATTERY_WARNING_PERCENT {
            return;
        }

        self.low_battery_counter += self.frame_time;

        if self.low_battery_counter > LOW_BATTERY_INDICATOR_INTERVAL {
            self.show_low_battery = !self.show_low_battery;
            self.low_battery_counter = 0;
        }

        if self.show_low_battery {
            let battery = assets::battery_image();
            let cell_width = battery.width as i32 / 3;
            let clip = Rect::new(cell_width * 2, 0, cell_width, battery.height as i32);

            self.graphics.set_draw_anchor(anchor::TOP | anchor::RIGHT);
            self.graphics.draw_image(&battery, SCREEN_WIDTH - 1, 1, &clip);
            self.graphics.set_draw_anchor(anchor::DEFAULT);
        }
    }

    /// Draw the battery gauge in the top-right corner: the case, then the
    /// charge bar clipped to the current level.
    pub(crate) fn draw_battery_indicator(&mut self) {
        if self.battery_percent <= LOW_BATTERY_WARNING_PERCENT {
            return;
        }

        let battery = assets::battery_image();
        let cell_width = battery.width as i32 / 3;

        let mut clip = Rect::new(0, 0, cell_width, battery.height as i32);

        self.graphics.set_draw_anchor(anchor::DEFAULT);
        self.graphics
            .draw_image(&battery, SCREEN_WIDTH - cell_width - 1, 1, &clip);

        clip.x = cell_width;
        clip.width = Fixed::from_int(cell_width)
            .mul(Fixed::from_int(self.battery_percent as i32))
            .div(Fixed::from_int(100))
            .to_int();
        self.graphics
            .draw_image(&battery, SCREEN_WIDTH - cell_width - 1, 1, &clip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::{
        ClockDriver, DisplayDriver, Drivers, InputDriver, NullInput, NullPower, NullStorage,
        SpeakerDriver,
    };
    use crate::gpu::{PALETTE_BYTES, SCREEN_PIXELS};
    use crate::spu::SOUND_BUFFER_SIZE;
    use std::cell::Cell;
    use std::rc::Rc;

    /// A clock that advances a fixed amount per query, so frame pacing is
    /// deterministic.
    struct SteppingClock {
        now: Cell<u64>,
        step: u64,
        slept: Rc<Cell<u64>>,
    }

    impl ClockDriver for SteppingClock {
        fn tick(&self) -> u64 {
            let value = self.now.get();
            self.now.set(value + self.step);
            value
        }

        fn wait(&self, microseconds: u64) {
            self.slept.set(self.slept.get() + microseconds);
            self.now.set(self.now.get() + microseconds);
        }
    }

    struct CountingDisplay(Rc<Cell<u32>>);

    impl DisplayDriver for CountingDisplay {
        fn sync(&mut self, _framebuffer: &[u8; SCREEN_PIXELS], _palette: &[u8; PALETTE_BYTES]) {
            self.0.set(self.0.get() + 1);
        }
    }

    struct CountingSpeaker(Rc<Cell<u32>>);

    impl SpeakerDriver for CountingSpeaker {
        fn sync(&mut self, _samples: &[i8; SOUND_BUFFER_SIZE]) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn test_kernel(step: u64) -> (Kernel, Rc<Cell<u64>>, Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let slept = Rc::new(Cell::new(0));
        let frames = Rc::new(Cell::new(0));
        let audio_frames = Rc::new(Cell::new(0));

        let drivers = Drivers {
            clock: Box::new(SteppingClock {
                now: Cell::new(0),
                step,
                slept: Rc::clone(&slept),
            }),
            display: Box::new(CountingDisplay(Rc::clone(&frames))),
            speaker: Box::new(CountingSpeaker(Rc::clone(&audio_frames))),
            input: Box::new(NullInput),
            power: Box::new(NullPower(100)),
            storage: Box::new(NullStorage),
        };

        let kernel = Kernel::new(drivers, RuntimeConfig::default());
        (kernel, slept, frames, audio_frames)
    }

    #[test]
    fn test_audio_syncs_every_frame() {
        let (mut kernel, _slept, _frames, audio_frames) = test_kernel(10);

        for _ in 0..5 {
            kernel.step_frame(false);
        }

        assert_eq!(audio_frames.get(), 5, "the SPU runs once per frame");
    }

    #[test]
    fn test_residual_budget_is_slept() {
        let (mut kernel, slept, _frames, _audio) = test_kernel(10);

        kernel.step_frame(true);

        assert!(slept.get() > 0, "a fast frame should sleep the residual");
        assert!(slept.get() < TARGET_FRAME_TIME);
    }

    #[test]
    fn test_display_follows_frame_cadence() {
        let (mut kernel, _slept, frames, _audio) = test_kernel(10);

        // With a nearly free clock and no pacing, the display only updates
        // when the cadence elapses.
        for _ in 0..8 {
            kernel.step_frame(false);
        }

        assert!(
            frames.get() < 8,
            "unpaced fast frames must not ship every iteration"
        );
    }

    #[test]
    fn test_input_edges_survive_frame_shift() {
        struct PulseInput {
            fired: bool,
        }

        impl InputDriver for PulseInput {
            fn sync(&mut self) -> u8 {
                if self.fired {
                    0
                } else {
                    self.fired = true;
                    crate::input::buttons::A
                }
            }
        }

        let slept = Rc::new(Cell::new(0));
        let drivers = Drivers {
            clock: Box::new(SteppingClock {
                now: Cell::new(0),
                step: 10,
                slept,
            }),
            display: Box::new(crate::drivers::NullDisplay),
            speaker: Box::new(crate::drivers::NullSpeaker),
            input: Box::new(PulseInput { fired: false }),
            power: Box::new(NullPower(100)),
            storage: Box::new(NullStorage),
        };

        let mut kernel = Kernel::new(drivers, RuntimeConfig::default());
        // The constructor consumed the pulse; the first frame sees the
        // release edge.
        kernel.step_frame(false);
        assert!(kernel.input.just_released(crate::input::buttons::A));
    }
}
