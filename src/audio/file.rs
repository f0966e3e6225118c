// File-backed audio devices
//
// WavMicrophone replays a WAV file as if it were live input, paced at the
// real chunk duration. WavSpeaker records model audio to a WAV file.

use hound::{WavReader, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::backend::{pcm16_bytes, pcm16_samples, AudioFormat, Microphone, Speaker};
use crate::error::DeviceError;

pub struct WavMicrophone {
    name: String,
    samples: Vec<i16>,
    position: usize,
    format: AudioFormat,
    chunk_duration: Duration,
}

impl WavMicrophone {
    /// Load a 16-bit mono WAV file whose rate matches `format`
    pub fn open(path: impl AsRef<Path>, format: AudioFormat) -> Result<Self, DeviceError> {
        let path = path.as_ref();
        let name = path.display().to_string();
        info!("Opening WAV microphone: {}", name);

        let reader = WavReader::open(path).map_err(|e| DeviceError::Open {
            device: name.clone(),
            reason: e.to_string(),
        })?;

        let spec = reader.spec();
        if spec.channels != 1
            || spec.bits_per_sample != 16
            || spec.sample_format != hound::SampleFormat::Int
            || spec.sample_rate != format.sample_rate
        {
            return Err(DeviceError::UnsupportedFormat(format!(
                "{}: expected {}Hz mono PCM16, got {}Hz {}ch {}-bit",
                name, format.sample_rate, spec.sample_rate, spec.channels, spec.bits_per_sample
            )));
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DeviceError::Io {
                device: name.clone(),
                reason: e.to_string(),
            })?;

        if samples.is_empty() {
            return Err(DeviceError::Open {
                device: name,
                reason: "file contains no samples".to_string(),
            });
        }

        info!(
            "WAV microphone loaded: {:.1}s, {}Hz, {} samples",
            samples.len() as f64 / spec.sample_rate as f64,
            spec.sample_rate,
            samples.len()
        );

        let chunk_duration = Duration::from_secs_f64(
            format.chunk_samples as f64 / f64::from(format.sample_rate.max(1)),
        );

        Ok(Self {
            name,
            samples,
            position: 0,
            format,
            chunk_duration,
        })
    }

    /// Next chunk, looping back to the start of the file
    fn next_samples(&mut self) -> Vec<i16> {
        let mut chunk = Vec::with_capacity(self.format.chunk_samples);
        while chunk.len() < self.format.chunk_samples {
            let remaining = self.format.chunk_samples - chunk.len();
            let end = (self.position + remaining).min(self.samples.len());
            chunk.extend_from_slice(&self.samples[self.position..end]);
            self.position = if end == self.samples.len() { 0 } else { end };
        }
        chunk
    }
}

impl Microphone for WavMicrophone {
    fn read_chunk(&mut self) -> Result<Vec<u8>, DeviceError> {
        // Pace like a real device
        std::thread::sleep(self.chunk_duration);
        Ok(pcm16_bytes(&self.next_samples()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

pub struct WavSpeaker {
    name: String,
    path: PathBuf,
    writer: Option<WavWriter<BufWriter<File>>>,
    samples_written: usize,
}

impl WavSpeaker {
    pub fn create(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self, DeviceError> {
        let path = path.as_ref().to_path_buf();
        let name = path.display().to_string();

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = WavWriter::create(&path, spec).map_err(|e| DeviceError::Open {
            device: name.clone(),
            reason: e.to_string(),
        })?;

        info!("WAV speaker ready: {} ({}Hz)", name, sample_rate);

        Ok(Self {
            name,
            path,
            writer: Some(writer),
            samples_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn samples_written(&self) -> usize {
        self.samples_written
    }
}

impl Speaker for WavSpeaker {
    fn write(&mut self, pcm: &[u8]) -> Result<(), DeviceError> {
        let Some(writer) = &mut self.writer else {
            return Err(DeviceError::Io {
                device: self.name.clone(),
                reason: "writer already finalized".to_string(),
            });
        };

        for sample in pcm16_samples(pcm) {
            writer.write_sample(sample).map_err(|e| DeviceError::Io {
                device: self.name.clone(),
                reason: e.to_string(),
            })?;
            self.samples_written += 1;
        }

        // Keep the header valid so the file is playable while recording
        writer.flush().map_err(|e| DeviceError::Io {
            device: self.name.clone(),
            reason: e.to_string(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for WavSpeaker {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV speaker on drop: {}", e);
            }
        }
    }
}
