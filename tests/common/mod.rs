// Shared fakes for the integration tests: an in-memory transport and
// instant devices.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use live_guide::audio::{AudioFormat, Microphone, Speaker};
use live_guide::devices::DeviceProvider;
use live_guide::error::{DeviceError, TransportError};
use live_guide::screencapture::ScreenGrabber;
use live_guide::session::SessionConfig;
use live_guide::transport::{InboundEvent, OutboundMedia, Transport, TransportSession};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub type InboundSender = mpsc::UnboundedSender<Result<InboundEvent, TransportError>>;

pub const FAKE_JPEG: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xD9];

/// Config with short timings for tests that run in real time
pub fn fast_config() -> SessionConfig {
    SessionConfig {
        device_retry_secs: 0,
        ..SessionConfig::default()
    }
}

/// Poll `check` until it holds or `timeout` passes
pub async fn wait_until(timeout: Duration, check: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

// ============================================================================
// Transport
// ============================================================================

pub struct FakeSession {
    sent: Arc<Mutex<Vec<OutboundMedia>>>,
    inbound: Mutex<Option<mpsc::UnboundedReceiver<Result<InboundEvent, TransportError>>>>,
    fail_sends: AtomicBool,
    closed: AtomicBool,
}

impl FakeSession {
    /// Session plus the sender that feeds its inbound stream
    pub fn pair() -> (Self, InboundSender) {
        Self::with_log(Arc::new(Mutex::new(Vec::new())))
    }

    fn with_log(sent: Arc<Mutex<Vec<OutboundMedia>>>) -> (Self, InboundSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Self {
            sent,
            inbound: Mutex::new(Some(rx)),
            fail_sends: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        };
        (session, tx)
    }

    pub fn sent(&self) -> Vec<OutboundMedia> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportSession for FakeSession {
    async fn send(&self, media: OutboundMedia) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Send("connection reset".to_string()));
        }
        self.sent.lock().unwrap().push(media);
        Ok(())
    }

    fn receive(&self) -> BoxStream<'static, Result<InboundEvent, TransportError>> {
        match self.inbound.lock().unwrap().take() {
            Some(rx) => stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|event| (event, rx))
            })
            .boxed(),
            None => stream::pending().boxed(),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeTransport {
    /// Connect attempts that fail before one succeeds; `u32::MAX` never succeeds
    failures_left: AtomicU32,
    connects: AtomicU32,
    sent: Arc<Mutex<Vec<OutboundMedia>>>,
    inbound: Mutex<Vec<InboundSender>>,
}

impl FakeTransport {
    pub fn healthy() -> Arc<Self> {
        Self::failing_first(0)
    }

    pub fn always_failing() -> Arc<Self> {
        Self::failing_first(u32::MAX)
    }

    pub fn failing_first(failures: u32) -> Arc<Self> {
        Arc::new(Self {
            failures_left: AtomicU32::new(failures),
            connects: AtomicU32::new(0),
            sent: Arc::new(Mutex::new(Vec::new())),
            inbound: Mutex::new(Vec::new()),
        })
    }

    /// Connect attempts, failed ones included
    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    /// Everything sent over every connection
    pub fn sent(&self) -> Vec<OutboundMedia> {
        self.sent.lock().unwrap().clone()
    }

    /// Deliver an event on the most recent connection
    pub fn push_inbound(&self, event: InboundEvent) -> bool {
        match self.inbound.lock().unwrap().last() {
            Some(tx) => tx.send(Ok(event)).is_ok(),
            None => false,
        }
    }

    /// End the inbound stream of the most recent connection
    pub fn drop_inbound(&self) {
        self.inbound.lock().unwrap().pop();
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&self, _model: &str) -> Result<Box<dyn TransportSession>, TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        let failures = self.failures_left.load(Ordering::SeqCst);
        if failures > 0 {
            if failures != u32::MAX {
                self.failures_left.store(failures - 1, Ordering::SeqCst);
            }
            return Err(TransportError::Connect("connection refused".to_string()));
        }

        let (session, tx) = FakeSession::with_log(Arc::clone(&self.sent));
        self.inbound.lock().unwrap().push(tx);
        Ok(Box::new(session))
    }
}

// ============================================================================
// Devices
// ============================================================================

#[derive(Default)]
pub struct FakeDevices {
    played: Arc<Mutex<Vec<Vec<u8>>>>,
    microphone_failures: AtomicU32,
    microphone_opens: AtomicU32,
}

impl FakeDevices {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// First `failures` microphone opens fail
    pub fn with_flaky_microphone(failures: u32) -> Arc<Self> {
        let devices = Self::default();
        devices.microphone_failures.store(failures, Ordering::SeqCst);
        Arc::new(devices)
    }

    pub fn played(&self) -> Vec<Vec<u8>> {
        self.played.lock().unwrap().clone()
    }

    pub fn microphone_opens(&self) -> u32 {
        self.microphone_opens.load(Ordering::SeqCst)
    }
}

impl DeviceProvider for FakeDevices {
    fn open_microphone(&self, format: AudioFormat) -> Result<Box<dyn Microphone>, DeviceError> {
        self.microphone_opens.fetch_add(1, Ordering::SeqCst);

        let failures = self.microphone_failures.load(Ordering::SeqCst);
        if failures > 0 {
            self.microphone_failures.store(failures - 1, Ordering::SeqCst);
            return Err(DeviceError::Open {
                device: "fake-mic".to_string(),
                reason: "device busy".to_string(),
            });
        }

        Ok(Box::new(FakeMicrophone {
            chunk_bytes: format.chunk_bytes(),
        }))
    }

    fn open_speaker(&self, _format: AudioFormat) -> Result<Box<dyn Speaker>, DeviceError> {
        Ok(Box::new(FakeSpeaker {
            played: Arc::clone(&self.played),
        }))
    }

    fn open_screen(&self) -> Result<Box<dyn ScreenGrabber>, DeviceError> {
        Ok(Box::new(FakeScreen))
    }
}

/// Produces non-silent chunks every few milliseconds
struct FakeMicrophone {
    chunk_bytes: usize,
}

impl Microphone for FakeMicrophone {
    fn read_chunk(&mut self) -> Result<Vec<u8>, DeviceError> {
        std::thread::sleep(Duration::from_millis(5));
        Ok(vec![1u8; self.chunk_bytes])
    }

    fn name(&self) -> &str {
        "fake-mic"
    }
}

struct FakeSpeaker {
    played: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl Speaker for FakeSpeaker {
    fn write(&mut self, pcm: &[u8]) -> Result<(), DeviceError> {
        self.played.lock().unwrap().push(pcm.to_vec());
        Ok(())
    }

    fn name(&self) -> &str {
        "fake-speaker"
    }
}

struct FakeScreen;

impl ScreenGrabber for FakeScreen {
    fn grab_jpeg(&mut self) -> Result<Vec<u8>, DeviceError> {
        Ok(FAKE_JPEG.to_vec())
    }

    fn name(&self) -> &str {
        "fake-screen"
    }
}
