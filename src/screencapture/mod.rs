// Screen capture collaborator
//
// Grabbing and JPEG-encoding the screen is platform work outside this crate;
// the session only needs a blocking handle that returns encoded frames.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::DeviceError;

const JPEG_MAGIC: [u8; 2] = [0xFF, 0xD8];

/// Blocking screen capture handle. Dropping it releases the device.
pub trait ScreenGrabber: Send {
    /// Capture the screen as a JPEG image
    fn grab_jpeg(&mut self) -> Result<Vec<u8>, DeviceError>;

    /// Device name for logging
    fn name(&self) -> &str;
}

/// Serves a JPEG file from disk as the "screen".
///
/// The file is re-read on every grab, so replacing it on disk changes what
/// the model sees.
pub struct StillImageGrabber {
    name: String,
    path: PathBuf,
}

impl StillImageGrabber {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DeviceError> {
        let path = path.as_ref().to_path_buf();
        let name = path.display().to_string();

        if !path.is_file() {
            return Err(DeviceError::Open {
                device: name,
                reason: "image file not found".to_string(),
            });
        }

        info!("Screen source: {}", name);

        Ok(Self { name, path })
    }
}

impl ScreenGrabber for StillImageGrabber {
    fn grab_jpeg(&mut self) -> Result<Vec<u8>, DeviceError> {
        let bytes = std::fs::read(&self.path).map_err(|e| DeviceError::Io {
            device: self.name.clone(),
            reason: e.to_string(),
        })?;

        if !bytes.starts_with(&JPEG_MAGIC) {
            return Err(DeviceError::UnsupportedFormat(format!(
                "{} is not a JPEG image",
                self.name
            )));
        }

        Ok(bytes)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
