//! Hotkey collaborator
//!
//! Hotkey sources block, so they run on their own OS thread and only talk to
//! the session by sending `ControlMessage`s or cancelling its shutdown token.

use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::session::{ControlEvent, ControlMessage, ControlMode, ControlSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyKey {
    /// Mute toggle or push-to-talk, depending on mode
    Talk,
    /// Ends the session
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Press,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyEvent {
    pub key: HotkeyKey,
    pub action: KeyAction,
}

impl HotkeyEvent {
    pub fn press(key: HotkeyKey) -> Self {
        Self {
            key,
            action: KeyAction::Press,
        }
    }

    pub fn release(key: HotkeyKey) -> Self {
        Self {
            key,
            action: KeyAction::Release,
        }
    }
}

/// Blocking source of key events. `None` means the source is exhausted.
pub trait HotkeySource: Send {
    fn next_event(&mut self) -> Option<HotkeyEvent>;
}

/// Map a key event to a control event for the given mode
pub fn translate(event: HotkeyEvent, mode: ControlMode) -> Option<ControlEvent> {
    match (event.key, event.action, mode) {
        (HotkeyKey::Quit, KeyAction::Press, _) => Some(ControlEvent::Shutdown),
        (HotkeyKey::Talk, KeyAction::Press, ControlMode::Toggle) => Some(ControlEvent::Toggle),
        (HotkeyKey::Talk, KeyAction::Press, ControlMode::PushToTalk) => {
            Some(ControlEvent::PttPress)
        }
        (HotkeyKey::Talk, KeyAction::Release, ControlMode::PushToTalk) => {
            Some(ControlEvent::PttRelease)
        }
        _ => None,
    }
}

/// Where key presses go: the control channel and shutdown token of one
/// running session
#[derive(Debug, Clone)]
pub struct HotkeyTarget {
    pub mode: ControlMode,
    pub control_tx: ControlSender,
    pub shutdown: CancellationToken,
}

impl HotkeyTarget {
    /// Deliver one key event. Returns `false` once the session is gone.
    ///
    /// Quit cancels the shutdown token directly so it also works while the
    /// session is connecting or backing off. Nothing here blocks.
    fn deliver(&self, event: HotkeyEvent) -> bool {
        let Some(control) = translate(event, self.mode) else {
            debug!("Unmapped hotkey {:?}", event);
            return true;
        };

        if control == ControlEvent::Shutdown {
            info!("Quit pressed; ending session");
            self.shutdown.cancel();
            return false;
        }

        match self.control_tx.try_send(ControlMessage::from(control)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Control queue full; dropped {:?}", control);
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Session control channel closed");
                false
            }
        }
    }
}

/// Forward hotkeys from `source` to a single session on a dedicated thread
/// until the source is exhausted, quit is pressed, or the session ends
pub fn spawn_listener(
    mut source: Box<dyn HotkeySource>,
    target: HotkeyTarget,
) -> io::Result<JoinHandle<()>> {
    log_key_map(target.mode);

    thread::Builder::new()
        .name("hotkeys".to_string())
        .spawn(move || {
            while let Some(event) = source.next_event() {
                if !target.deliver(event) {
                    return;
                }
            }
        })
}

/// Forward hotkeys from `source` to whichever session `targets` currently
/// names. One thread serves every session for the lifetime of the source.
pub fn spawn_router(
    mut source: Box<dyn HotkeySource>,
    targets: watch::Receiver<Option<HotkeyTarget>>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("hotkeys".to_string())
        .spawn(move || {
            while let Some(event) = source.next_event() {
                let target = targets.borrow().clone();
                match target {
                    Some(target) => {
                        target.deliver(event);
                    }
                    None => debug!("No session running; ignoring hotkey {:?}", event),
                }
            }
            debug!("Hotkey source exhausted; router exiting");
        })
}

pub(crate) fn log_key_map(mode: ControlMode) {
    match mode {
        ControlMode::PushToTalk => info!("Hotkeys: hold talk key = Push-to-Talk | quit key = Quit"),
        ControlMode::Toggle => info!("Hotkeys: talk key = Toggle Mute | quit key = Quit"),
    }
}

/// Line-based hotkeys, e.g. from stdin:
/// `t` = talk press, `r` = talk release, `q` = quit
pub struct LineHotkeys<R> {
    reader: R,
}

impl<R: BufRead + Send> LineHotkeys<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl LineHotkeys<io::BufReader<io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new(io::BufReader::new(io::stdin()))
    }
}

impl<R: BufRead + Send> HotkeySource for LineHotkeys<R> {
    fn next_event(&mut self) -> Option<HotkeyEvent> {
        let mut line = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => match line.trim() {
                    "t" => return Some(HotkeyEvent::press(HotkeyKey::Talk)),
                    "r" => return Some(HotkeyEvent::release(HotkeyKey::Talk)),
                    "q" => return Some(HotkeyEvent::press(HotkeyKey::Quit)),
                    "" => continue,
                    other => warn!("Unknown hotkey command {:?} (use t, r or q)", other),
                },
                Err(e) => {
                    warn!("Hotkey input error: {}", e);
                    return None;
                }
            }
        }
    }
}
