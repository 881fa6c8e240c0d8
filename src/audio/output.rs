use anyhow::{Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use crossbeam::channel::Sender;
use std::sync::{Arc, Mutex};

use super::{ENGINE_CHANNELS, PlayerEngine, PlayerEvent};

/// The Output Sink boundary: the default cpal output device, running at its
/// native configuration. The engine is pulled once per callback for as long
/// as the stream lives; dropping AudioOutput closes the device on every exit
/// path.
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    device_name: String,
    stream: Option<Stream>,
}

impl AudioOutput {
    pub fn open() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("No output device available"))?;
        let default = device.default_output_config()?;

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let config = StreamConfig {
            channels: default.channels(),
            sample_rate: default.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };

        tracing::debug!(
            device = %device_name,
            rate = config.sample_rate.0,
            channels = config.channels,
            "opened output device"
        );

        Ok(Self {
            device,
            config,
            device_name,
            stream: None,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Build and start the output stream. Each callback pulls one stereo
    /// buffer from the engine and maps it onto the device channel count.
    pub fn start(&mut self, engine: Arc<PlayerEngine>, events: Sender<PlayerEvent>) -> Result<()> {
        let device_channels = self.config.channels as usize;

        // Preallocated stereo scratch; the callback must not allocate.
        // 8192 frames covers any sane device callback size.
        let scratch = Arc::new(Mutex::new(vec![0.0f32; 8192 * ENGINE_CHANNELS]));
        let err_sender = events.clone();

        let stream = self.device.build_output_stream(
            &self.config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / device_channels;

                let Ok(mut mix) = scratch.try_lock() else {
                    data.fill(0.0);
                    return;
                };
                let needed = (frames * ENGINE_CHANNELS).min(mix.len());
                engine.process(&mut mix[..needed]);

                for (i, frame) in data.chunks_mut(device_channels).enumerate() {
                    let left = mix.get(i * ENGINE_CHANNELS).copied().unwrap_or(0.0);
                    let right = mix.get(i * ENGINE_CHANNELS + 1).copied().unwrap_or(0.0);
                    match frame.len() {
                        0 => {}
                        1 => frame[0] = 0.5 * (left + right),
                        _ => {
                            frame[0] = left;
                            frame[1] = right;
                            for extra in frame.iter_mut().skip(2) {
                                *extra = 0.0;
                            }
                        }
                    }
                }
            },
            move |_err| {
                // Owned string, no format! allocation; this callback may run
                // on the audio thread depending on the backend.
                let _ = err_sender.try_send(PlayerEvent::Error(String::from(
                    "Output stream error",
                )));
            },
            None,
        )?;

        stream.play()?;
        self.stream = Some(stream);
        Ok(())
    }
}
