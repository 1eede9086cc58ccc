// Tone channel - one wavetable voice
//
// Each channel runs a single waveform generator in Q16.16: the sample value
// swings between -127 and +127 and is advanced once per output sample. The
// step size is derived from the note frequency when the tone starts.

use crate::fixed::Fixed;

use super::{SOUND_FREQUENCY, TARGET_SAMPLE_MAX, TARGET_SAMPLE_MIN};

/// Waveform shapes the synthesizer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaveType {
    #[default]
    Sawtooth,
    Square,
    Triangle,
}

impl WaveType {
    /// Map a raw guest argument to a wave type.
    pub fn from_raw(value: i32) -> Option<WaveType> {
        match value {
            0 => Some(WaveType::Sawtooth),
            1 => Some(WaveType::Square),
            2 => Some(WaveType::Triangle),
            _ => None,
        }
    }
}

/// State of one tone channel.
#[derive(Debug, Clone)]
pub struct Channel {
    pub(crate) wave_type: WaveType,
    /// Current note frequency; zero or negative means silent.
    pub(crate) note_frequency: Fixed,
    /// Microseconds of playback left for finite tones.
    pub(crate) time_left: i64,
    pub(crate) sample_step: Fixed,
    /// Square-wave phase accumulator.
    pub(crate) internal_sample: Fixed,
    /// Current output level.
    pub(crate) sample_value: Fixed,
    pub(crate) volume_multiplier: Fixed,
    pub(crate) paused: bool,
    pub(crate) play_forever: bool,
    /// Tick of the last duration update.
    pub(crate) last_sync_tick: u64,
}

impl Channel {
    pub fn new() -> Self {
        Channel {
            wave_type: WaveType::Sawtooth,
            note_frequency: Fixed::ZERO,
            time_left: 0,
            sample_step: Fixed::ZERO,
            internal_sample: Fixed::ZERO,
            sample_value: Fixed::ZERO,
            volume_multiplier: Fixed::ONE,
            paused: false,
            play_forever: false,
            last_sync_tick: 0,
        }
    }

    /// Whether the channel contributes to the mix.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.note_frequency > Fixed::ZERO && !self.paused
    }

    /// Start a tone. A duration of zero plays until stopped; a frequency of
    /// zero silences the channel.
    pub fn play_tone(&mut self, wave_type: WaveType, frequency: u16, duration_ms: u32, now: u64) {
        if frequency == 0 {
            self.note_frequency = Fixed::ZERO;
            return;
        }

        self.paused = false;
        self.last_sync_tick = now;
        self.time_left = duration_ms as i64 * 1000;
        self.play_forever = duration_ms == 0;

        self.wave_type = wave_type;
        self.note_frequency = Fixed::from_int(frequency as i32);

        let wave_samples = Fixed::from_int(SOUND_FREQUENCY).div(self.note_frequency);
        let swing = if wave_type == WaveType::Sawtooth { 256 } else { 512 };

        self.sample_value = TARGET_SAMPLE_MIN;
        self.internal_sample = TARGET_SAMPLE_MIN;
        self.sample_step = Fixed::from_int(swing).div(wave_samples);
    }

    /// Set the channel volume as a percentage, clamped to 100.
    pub fn set_volume(&mut self, volume_percent: u8) {
        self.volume_multiplier =
            Fixed::from_int(volume_percent as i32).div(Fixed::from_int(100));

        if self.volume_multiplier > Fixed::ONE {
            self.volume_multiplier = Fixed::ONE;
        }
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Silence the channel immediately.
    pub fn stop(&mut self) {
        self.time_left = 0;
        self.note_frequency = Fixed::ZERO;
    }

    /// Advance the waveform by one output sample.
    pub fn advance(&mut self) {
        match self.wave_type {
            WaveType::Sawtooth => {
                self.sample_value = self.sample_value + self.sample_step;

                if self.sample_value >= TARGET_SAMPLE_MAX {
                    self.sample_value = TARGET_SAMPLE_MIN;
                }
            }

            WaveType::Square => {
                self.internal_sample = self.internal_sample + self.sample_step;

                if self.internal_sample >= TARGET_SAMPLE_MAX {
                    self.internal_sample = TARGET_SAMPLE_MIN;
                    self.sample_value = -self.sample_value;
                }
            }

            WaveType::Triangle => {
                self.sample_value = self.sample_value + self.sample_step;

                if self.sample_value >= TARGET_SAMPLE_MAX {
                    self.sample_value = TARGET_SAMPLE_MAX;
                    self.sample_step = -self.sample_step;
                } else if self.sample_value <= TARGET_SAMPLE_MIN {
                    self.sample_value = TARGET_SAMPLE_MIN;
                    self.sample_step = -self.sample_step;
                }
            }
        }
    }

    /// The channel's contribution to the current sample, volume applied,
    /// as an integer sample level.
    #[inline]
    pub fn output(&self) -> i64 {
        self.sample_value.mul(self.volume_multiplier).to_int() as i64
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::new()
    }
}
