use crate::error::DeviceError;

/// PCM16 mono stream format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Samples per read (microphone) chunk
    pub chunk_samples: usize,
}

impl AudioFormat {
    pub fn new(sample_rate: u32, chunk_samples: usize) -> Self {
        Self {
            sample_rate,
            chunk_samples,
        }
    }

    /// Chunk length in bytes (16-bit samples)
    pub fn chunk_bytes(&self) -> usize {
        self.chunk_samples * 2
    }
}

/// Blocking microphone handle. Dropping it releases the device.
///
/// Implementations block until a full chunk is available; callers run them
/// on the blocking thread pool.
pub trait Microphone: Send {
    /// Read one chunk of little-endian PCM16 mono samples
    fn read_chunk(&mut self) -> Result<Vec<u8>, DeviceError>;

    /// Device name for logging
    fn name(&self) -> &str;
}

/// Blocking speaker handle. Dropping it releases the device.
pub trait Speaker: Send {
    /// Play little-endian PCM16 mono samples
    fn write(&mut self, pcm: &[u8]) -> Result<(), DeviceError>;

    /// Device name for logging
    fn name(&self) -> &str;
}

/// Convert little-endian PCM16 bytes into samples; a trailing odd byte is ignored
pub fn pcm16_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Convert samples into little-endian PCM16 bytes
pub fn pcm16_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
