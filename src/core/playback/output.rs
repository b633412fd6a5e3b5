use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, Stream};
use log::{error, info};

use super::mixer::{Mixer, MixerHandle, VoiceId};
use super::samples::SampleBuffer;
use super::AudioOutput;

/// Sample rate used when no device is opened.
pub const HEADLESS_SAMPLE_RATE: u32 = 44_100;

/// The process-wide audio output: the default `cpal` device with a
/// [`Mixer`] running inside its callback.
pub struct CpalOutput {
    handle: MixerHandle,
    stream: Option<Stream>,
}

impl CpalOutput {
    /// Open the default output device and start streaming.
    pub fn open() -> Result<Self> {
        let host = cpal::default_host();
        info!("Using audio host: {}", host.id().name());

        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("No output device available"))?;
        info!("Using output device: {:?}", device.name());

        let config = device
            .default_output_config()
            .context("Failed to query output config")?;
        let sample_format = config.sample_format();
        let config = cpal::StreamConfig::from(config);
        let sample_rate = config.sample_rate.0;
        info!("Using sample rate: {}", sample_rate);

        let (mixer, handle) = Mixer::new(sample_rate);
        let stream = match sample_format {
            SampleFormat::F32 => create_stream::<f32>(&device, &config, mixer),
            SampleFormat::I16 => create_stream::<i16>(&device, &config, mixer),
            SampleFormat::U16 => create_stream::<u16>(&device, &config, mixer),
            other => bail!("Unsupported sample format {:?}", other),
        }?;

        stream.play().context("Failed to start audio stream")?;
        info!("Audio stream started");

        Ok(Self {
            handle,
            stream: Some(stream),
        })
    }

    /// A mixer handle with nothing rendering behind it.
    pub fn headless() -> Self {
        let (_mixer, handle) = Mixer::new(HEADLESS_SAMPLE_RATE);
        Self { handle, stream: None }
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    pub fn sample_rate(&self) -> u32 {
        self.handle.sample_rate()
    }
}

impl AudioOutput for CpalOutput {
    fn start_voice(&mut self, buffer: &SampleBuffer, looping: bool, fade_in: f32) -> VoiceId {
        self.handle.start_voice(buffer, looping, fade_in)
    }

    fn stop_voice(&mut self, id: VoiceId, fade: f32) {
        self.handle.stop_voice(id, fade)
    }

    fn set_master_gain(&mut self, gain: f32, ramp: f32) {
        self.handle.set_master_gain(gain, ramp)
    }

    fn stop_all(&mut self, fade: f32) {
        self.handle.stop_all(fade)
    }

    fn drain_finished(&mut self) -> Vec<VoiceId> {
        self.handle.drain_finished()
    }
}

fn create_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut mixer: Mixer,
) -> Result<Stream>
where
    T: Sample + Send + 'static + SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let err_fn = |err| error!("an error occurred on the audio stream: {}", err);

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                mixer.process_commands();
                for frame in data.chunks_mut(channels) {
                    let value = T::from_sample(mixer.next_sample());
                    for sample in frame.iter_mut() {
                        *sample = value;
                    }
                }
            },
            err_fn,
            None,
        )
        .context("Failed to build output stream")?;

    Ok(stream)
}
