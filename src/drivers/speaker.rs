// Speaker front-end - audio output through cpal
//
// The SPU produces signed 8-bit mono at 22050 Hz; most audio devices
// negotiate something else, so frames are linearly resampled into a shared
// ring buffer that the cpal callback drains. The ring holds a few frames
// of slack; overruns drop the oldest samples rather than blocking the
// kernel loop.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use crate::drivers::SpeakerDriver;
use crate::spu::{SOUND_BUFFER_SIZE, SOUND_FREQUENCY};

/// How much audio the ring buffer holds, in milliseconds.
const BUFFER_DURATION_MS: usize = 200;

/// Speaker driver over the default cpal output device.
pub struct CpalSpeaker {
    _stream: Stream,
    buffer: Arc<Mutex<VecDeque<f32>>>,
    buffer_capacity: usize,
    device_rate: u32,
    channels: usize,
    volume: f32,
}

impl CpalSpeaker {
    /// Open the default output device. `volume_percent` scales all output.
    pub fn new(volume_percent: u8) -> Result<Self, String> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or("no audio output device available")?;

        let default_config = device
            .default_output_config()
            .map_err(|error| format!("no default output config: {}", error))?;

        if default_config.sample_format() != cpal::SampleFormat::F32 {
            return Err(format!(
                "unsupported sample format: {:?}",
                default_config.sample_format()
            ));
        }

        let device_rate = default_config.sample_rate().0;
        let channels = default_config.channels();

        let stream_config = StreamConfig {
            channels,
            sample_rate: SampleRate(device_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let buffer_capacity =
            device_rate as usize * channels as usize * BUFFER_DURATION_MS / 1000;
        let buffer = Arc::new(Mutex::new(VecDeque::with_capacity(buffer_capacity)));
        let callback_buffer = Arc::clone(&buffer);

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut buffer = callback_buffer.lock().unwrap();
                    for sample in data.iter_mut() {
                        *sample = buffer.pop_front().unwrap_or(0.0);
                    }
                },
                move |error| {
                    eprintln!("audio stream error: {}", error);
                },
                None,
            )
            .map_err(|error| format!("failed to build audio stream: {}", error))?;

        stream
            .play()
            .map_err(|error| format!("failed to start audio stream: {}", error))?;

        Ok(CpalSpeaker {
            _stream: stream,
            buffer,
            buffer_capacity,
            device_rate,
            channels: channels as usize,
            volume: (volume_percent.min(100)) as f32 / 100.0,
        })
    }
}

impl SpeakerDriver for CpalSpeaker {
    fn sync(&mut self, samples: &[i8; SOUND_BUFFER_SIZE]) {
        // Linear resample from the SPU rate to the device rate.
        let output_length =
            SOUND_BUFFER_SIZE * self.device_rate as usize / SOUND_FREQUENCY as usize;
        let step = SOUND_BUFFER_SIZE as f32 / output_length as f32;

        let mut buffer = self.buffer.lock().unwrap();

        for output_index in 0..output_length {
            let position = output_index as f32 * step;
            let index = position as usize;
            let fraction = position - index as f32;

            let current = samples[index.min(SOUND_BUFFER_SIZE - 1)] as f32 / 127.0;
            let next = samples[(index + 1).min(SOUND_BUFFER_SIZE - 1)] as f32 / 127.0;
            let value = (current + (next - current) * fraction) * self.volume;

            for _ in 0..self.channels {
                if buffer.len() >= self.buffer_capacity {
                    buffer.pop_front();
                }
                buffer.push_back(value);
            }
        }
    }
}
