//! `cpal`-backed device enumeration and stream construction.
//!
//! Fixed contract: float32 samples, mono, 48 000 Hz, 1024-sample input
//! buffers and 4096-sample output buffers. The session loop only ever
//! talks to the blocking channel endpoints this module hands back; it
//! never touches `cpal` directly.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

const SAMPLE_RATE: u32 = 48_000;
const INPUT_BUFFER_FRAMES: u32 = 1024;
const OUTPUT_BUFFER_FRAMES: u32 = 4096;

/// One enumerated device, for `--list` output.
pub struct DeviceInfo {
    pub index: u32,
    pub name: String,
    pub is_input: bool,
}

/// Lists input and output devices visible to the default host.
pub fn list_devices() -> Result<Vec<DeviceInfo>> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    for (index, device) in host.input_devices().context("enumerating input devices")?.enumerate() {
        devices.push(DeviceInfo {
            index: index as u32,
            name: device.name().unwrap_or_else(|_| "<unknown>".to_string()),
            is_input: true,
        });
    }
    for (index, device) in host.output_devices().context("enumerating output devices")?.enumerate() {
        devices.push(DeviceInfo {
            index: index as u32,
            name: device.name().unwrap_or_else(|_| "<unknown>".to_string()),
            is_input: false,
        });
    }
    Ok(devices)
}

fn nth_device(mut devices: impl Iterator<Item = cpal::Device>, index: Option<u32>) -> Option<cpal::Device> {
    index.and_then(|i| devices.nth(i as usize))
}

/// Live input and output streams, plus the blocking channel endpoints the
/// session loop reads from and writes to. Streams are stopped and dropped
/// together with this struct.
pub struct AudioIo {
    input_stream: cpal::Stream,
    output_stream: cpal::Stream,
    pub samples_in: Receiver<Vec<f32>>,
    pub samples_out: SyncSender<Vec<f32>>,
}

impl AudioIo {
    pub fn open(input_device: Option<u32>, output_device: Option<u32>) -> Result<Self> {
        let host = cpal::default_host();

        let input = match nth_device(host.input_devices()?, input_device) {
            Some(d) => d,
            None => host.default_input_device().context("no default input device")?,
        };
        let output = match nth_device(host.output_devices()?, output_device) {
            Some(d) => d,
            None => host.default_output_device().context("no default output device")?,
        };

        let input_config = StreamConfig {
            channels: 1,
            sample_rate: SampleRate(SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Fixed(INPUT_BUFFER_FRAMES),
        };
        let output_config = StreamConfig {
            channels: 1,
            sample_rate: SampleRate(SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Fixed(OUTPUT_BUFFER_FRAMES),
        };

        let (in_tx, in_rx) = sync_channel::<Vec<f32>>(8);
        let (out_tx, out_rx) = sync_channel::<Vec<f32>>(8);

        let input_stream = input
            .build_input_stream(
                &input_config,
                move |data: &[f32], _| {
                    let _ = in_tx.try_send(data.to_vec());
                },
                |err| tracing::error!(error = %err, "audio input stream error"),
                None,
            )
            .context("building input stream")?;

        let output_stream = output
            .build_output_stream(
                &output_config,
                move |data: &mut [f32], _| {
                    if let Ok(block) = out_rx.try_recv() {
                        let n = block.len().min(data.len());
                        data[..n].copy_from_slice(&block[..n]);
                        for sample in &mut data[n..] {
                            *sample = 0.0;
                        }
                    } else {
                        data.fill(0.0);
                    }
                },
                |err| tracing::error!(error = %err, "audio output stream error"),
                None,
            )
            .context("building output stream")?;

        input_stream.play().context("starting input stream")?;
        output_stream.play().context("starting output stream")?;

        Ok(Self {
            input_stream,
            output_stream,
            samples_in: in_rx,
            samples_out: out_tx,
        })
    }
}

impl Drop for AudioIo {
    fn drop(&mut self) {
        let _ = self.input_stream.pause();
        let _ = self.output_stream.pause();
    }
}
