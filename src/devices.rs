//! Device provider: opens the microphone, speaker and screen handles that the
//! session units use. Each open returns an owned handle released on drop.

use std::path::PathBuf;

use crate::audio::{AudioFormat, Microphone, Speaker, WavMicrophone, WavSpeaker};
use crate::error::DeviceError;
use crate::screencapture::{ScreenGrabber, StillImageGrabber};

pub trait DeviceProvider: Send + Sync {
    fn open_microphone(&self, format: AudioFormat) -> Result<Box<dyn Microphone>, DeviceError>;

    fn open_speaker(&self, format: AudioFormat) -> Result<Box<dyn Speaker>, DeviceError>;

    fn open_screen(&self) -> Result<Box<dyn ScreenGrabber>, DeviceError>;
}

/// File-backed devices (WAV input, WAV output, JPEG screen)
#[derive(Debug, Clone)]
pub struct FileDevices {
    pub microphone_wav: PathBuf,
    pub speaker_wav: PathBuf,
    pub screen_image: PathBuf,
}

impl DeviceProvider for FileDevices {
    fn open_microphone(&self, format: AudioFormat) -> Result<Box<dyn Microphone>, DeviceError> {
        Ok(Box::new(WavMicrophone::open(&self.microphone_wav, format)?))
    }

    fn open_speaker(&self, format: AudioFormat) -> Result<Box<dyn Speaker>, DeviceError> {
        Ok(Box::new(WavSpeaker::create(&self.speaker_wav, format.sample_rate)?))
    }

    fn open_screen(&self) -> Result<Box<dyn ScreenGrabber>, DeviceError> {
        Ok(Box::new(StillImageGrabber::open(&self.screen_image)?))
    }
}
