pub mod backend;
pub mod file;

pub use backend::{pcm16_bytes, pcm16_samples, AudioFormat, Microphone, Speaker};
pub use file::{WavMicrophone, WavSpeaker};
