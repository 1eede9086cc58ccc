// SPU module - four-channel wavetable synthesizer
//
// The sound processor mixes four tone channels into one frame's worth of
// signed 8-bit mono samples per sync (735 samples at 22050 Hz for a 30 Hz
// frame rate). Tone durations count down against the wall clock so a
// stuttering frame does not stretch notes.

mod channel;

pub use channel::{Channel, WaveType};

use crate::fixed::Fixed;

/// Output sample rate in Hz.
pub const SOUND_FREQUENCY: i32 = 22050;

/// Samples produced per sync (one 30 Hz frame).
pub const SOUND_BUFFER_SIZE: usize = 735;

/// Number of tone channels.
pub const NUM_CHANNELS: usize = 4;

/// `play_tone` duration meaning "until stopped".
pub const PLAY_FOREVER: u32 = 0;

pub(crate) const TARGET_SAMPLE_MIN: Fixed = Fixed::from_int(-127);
pub(crate) const TARGET_SAMPLE_MAX: Fixed = Fixed::from_int(127);

/// The synthesizer: four channels and the current output frame.
pub struct Spu {
    channels: [Channel; NUM_CHANNELS],
    buffer: [i8; SOUND_BUFFER_SIZE],
}

impl Spu {
    pub fn new() -> Self {
        Spu {
            channels: [Channel::new(), Channel::new(), Channel::new(), Channel::new()],
            buffer: [0; SOUND_BUFFER_SIZE],
        }
    }

    fn channel_mut(&mut self, channel_index: i32) -> Option<&mut Channel> {
        usize::try_from(channel_index)
            .ok()
            .and_then(|index| self.channels.get_mut(index))
    }

    /// Set a channel's volume percentage. Out-of-range channels are ignored.
    pub fn set_channel_volume(&mut self, channel_index: i32, volume_percent: u8) {
        if let Some(channel) = self.channel_mut(channel_index) {
            channel.set_volume(volume_percent);
        }
    }

    /// Start a tone on a channel. Out-of-range channels and unknown wave
    /// types are ignored.
    pub fn play_tone(
        &mut self,
        channel_index: i32,
        wave_type: i32,
        frequency: u16,
        duration_ms: u32,
        now: u64,
    ) {
        let Some(wave_type) = WaveType::from_raw(wave_type) else {
            return;
        };

        if let Some(channel) = self.channel_mut(channel_index) {
            channel.play_tone(wave_type, frequency, duration_ms, now);
        }
    }

    pub fn pause_channel(&mut self, channel_index: i32, paused: bool) {
        if let Some(channel) = self.channel_mut(channel_index) {
            channel.set_paused(paused);
        }
    }

    pub fn pause_all(&mut self, paused: bool) {
        for channel in &mut self.channels {
            channel.set_paused(paused);
        }
    }

    pub fn stop_channel(&mut self, channel_index: i32) {
        if let Some(channel) = self.channel_mut(channel_index) {
            channel.stop();
        }
    }

    pub fn stop_all(&mut self) {
        for channel in &mut self.channels {
            channel.stop();
        }
    }

    /// Advance tone durations and mix one frame of samples.
    ///
    /// `now` is the current monotonic tick in microseconds. Returns the
    /// freshly mixed frame.
    pub fn sync(&mut self, now: u64) -> &[i8; SOUND_BUFFER_SIZE] {
        for channel in &mut self.channels {
            if channel.note_frequency <= Fixed::ZERO
                || channel.time_left <= 0
                || channel.play_forever
            {
                continue;
            }

            if channel.paused {
                channel.last_sync_tick = now;
                continue;
            }

            channel.time_left -= now.saturating_sub(channel.last_sync_tick) as i64;
            channel.last_sync_tick = now;

            if channel.time_left <= 0 {
                channel.note_frequency = Fixed::ZERO;
            }
        }

        self.fill_buffer();
        &self.buffer
    }

    /// The last mixed frame.
    pub fn buffer(&self) -> &[i8; SOUND_BUFFER_SIZE] {
        &self.buffer
    }

    fn fill_buffer(&mut self) {
        for sample_index in 0..SOUND_BUFFER_SIZE {
            let mut accumulator: i64 = 0;
            let mut active_channels: i32 = 0;

            for channel in &mut self.channels {
                if !channel.is_active() {
                    continue;
                }

                channel.advance();
                accumulator += channel.output();
                active_channels += 1;
            }

            self.buffer[sample_index] = if active_channels == 0 {
                0
            } else {
                Fixed::from_int(accumulator as i32)
                    .div(Fixed::from_int(active_channels))
                    .to_int() as i8
            };
        }
    }
}

impl Default for Spu {
    fn default() -> Self {
        Self::new()
    }
}
