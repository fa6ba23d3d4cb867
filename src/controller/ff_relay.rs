//! # Force-Feedback Relay
//!
//! Games upload rumble effects to the virtual controller. The relay replays
//! them on the real gamepad and keeps the mapping from virtual effect ids to
//! the effects uploaded there.
//!
//! ## Request Handling
//!
//! | Request | Gamepad present | Gamepad absent |
//! |---------|-----------------|----------------|
//! | Upload, unknown id | allocate a real effect | acknowledge, not tracked |
//! | Upload, known id | update in place | acknowledge, not tracked |
//! | Erase, known id | drop the real effect | acknowledge |
//! | Erase, unknown id | log and acknowledge | acknowledge |
//! | Play | forward to the mapped effect | ignore |
//! | Pulse | upload and play a short rumble | ignore |

use std::collections::HashMap;
use std::io;
use std::time::Duration;

use evdev::{Device, EventType, FFEffect, FFEffectData, FFEffectKind, FFReplay, FFTrigger, InputEvent};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

/// uinput reply for a handled request
pub const FF_OK: i32 = 0;
/// uinput reply for a failed upload or erase
pub const FF_FAILED: i32 = -1;

/// `FF_GAIN` and `FF_AUTOCENTER` are device settings, not effect ids
const FF_GAIN: u16 = 0x60;
const FF_AUTOCENTER: u16 = 0x61;

/// Force-feedback work routed to the gamepad loop
#[derive(Debug)]
pub enum FfRequest {
    /// Effect uploaded to the virtual controller
    Upload {
        virtual_id: i16,
        data: FFEffectData,
        reply: oneshot::Sender<i32>,
    },
    /// Effect erased from the virtual controller
    Erase { virtual_id: i16, reply: oneshot::Sender<i32> },
    /// `EV_FF` write on the virtual controller
    Play { code: u16, value: i32 },
    /// Haptic cue of the given length
    Pulse(Duration),
}

/// An effect living on the real gamepad
pub trait HapticEffect: Send {
    fn id(&self) -> u16;
    fn update(&mut self, data: FFEffectData) -> io::Result<()>;
    fn play(&mut self, count: i32) -> io::Result<()>;
    fn stop(&mut self) -> io::Result<()>;
}

/// The real gamepad, as seen by the relay
pub trait HapticTarget {
    fn upload(&mut self, data: FFEffectData) -> io::Result<Box<dyn HapticEffect>>;

    /// Write a raw `EV_FF` setting such as gain
    fn send_ff(&mut self, code: u16, value: i32) -> io::Result<()>;
}

impl HapticEffect for FFEffect {
    fn id(&self) -> u16 {
        FFEffect::id(self)
    }

    fn update(&mut self, data: FFEffectData) -> io::Result<()> {
        FFEffect::update(self, data)
    }

    fn play(&mut self, count: i32) -> io::Result<()> {
        FFEffect::play(self, count)
    }

    fn stop(&mut self) -> io::Result<()> {
        FFEffect::stop(self)
    }
}

impl HapticTarget for Device {
    fn upload(&mut self, data: FFEffectData) -> io::Result<Box<dyn HapticEffect>> {
        Ok(Box::new(self.upload_ff_effect(data)?))
    }

    fn send_ff(&mut self, code: u16, value: i32) -> io::Result<()> {
        self.send_events(&[InputEvent::new(EventType::FORCEFEEDBACK.0, code, value)])
    }
}

/// Rumble effect used for haptic cues
#[must_use]
pub fn rumble(duration: Duration) -> FFEffectData {
    FFEffectData {
        direction: 0,
        trigger: FFTrigger { button: 0, interval: 0 },
        replay: FFReplay { length: u16::try_from(duration.as_millis()).unwrap_or(u16::MAX), delay: 0 },
        kind: FFEffectKind::Rumble { strong_magnitude: 0x0000, weak_magnitude: 0xffff },
    }
}

/// Virtual-to-real effect map
#[derive(Default)]
pub struct ForceFeedbackRelay {
    effects: HashMap<i16, Box<dyn HapticEffect>>,
    /// Last haptic cue, kept alive until the next one replaces it
    pulse: Option<Box<dyn HapticEffect>>,
}

impl std::fmt::Debug for ForceFeedbackRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForceFeedbackRelay")
            .field("effects", &self.effects.len())
            .finish_non_exhaustive()
    }
}

impl ForceFeedbackRelay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of virtual effects currently mapped
    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Whether `virtual_id` is mapped to a real effect
    #[must_use]
    pub fn tracks(&self, virtual_id: i16) -> bool {
        self.effects.contains_key(&virtual_id)
    }

    /// Forget every mapped effect, used when the gamepad goes away
    pub fn clear(&mut self) {
        if !self.effects.is_empty() {
            debug!("Dropping {} relayed effects", self.effects.len());
        }
        self.effects.clear();
        self.pulse = None;
    }

    /// Service one request against `target`, replying where uinput waits
    pub fn handle(&mut self, request: FfRequest, target: Option<&mut dyn HapticTarget>) {
        match request {
            FfRequest::Upload { virtual_id, data, reply } => {
                let retval = self.upload(target, virtual_id, data);
                // The uploader may have timed out; nothing left to tell it.
                let _ = reply.send(retval);
            }
            FfRequest::Erase { virtual_id, reply } => {
                let retval = self.erase(virtual_id);
                let _ = reply.send(retval);
            }
            FfRequest::Play { code, value } => self.play(target, code, value),
            FfRequest::Pulse(duration) => self.pulse(target, duration),
        }
    }

    /// Mirror an upload of `virtual_id`, returning the uinput reply
    pub fn upload(&mut self, target: Option<&mut dyn HapticTarget>, virtual_id: i16, data: FFEffectData) -> i32 {
        let Some(target) = target else {
            debug!("No gamepad, acknowledging effect {} untracked", virtual_id);
            return FF_OK;
        };

        if let Some(effect) = self.effects.get_mut(&virtual_id) {
            return match effect.update(data) {
                Ok(()) => {
                    debug!("Updated effect {} (real {})", virtual_id, effect.id());
                    FF_OK
                }
                Err(e) => {
                    error!("{} | Error updating effect {}", e, virtual_id);
                    FF_FAILED
                }
            };
        }

        match target.upload(data) {
            Ok(effect) => {
                debug!("Uploaded effect {} as real {}", virtual_id, effect.id());
                self.effects.insert(virtual_id, effect);
                FF_OK
            }
            Err(e) => {
                error!("{} | Error uploading effect {}", e, virtual_id);
                FF_FAILED
            }
        }
    }

    /// Mirror an erase of `virtual_id`, returning the uinput reply
    pub fn erase(&mut self, virtual_id: i16) -> i32 {
        if self.effects.remove(&virtual_id).is_none() {
            warn!("Erase of unknown effect {}", virtual_id);
        }
        FF_OK
    }

    fn play(&mut self, target: Option<&mut dyn HapticTarget>, code: u16, value: i32) {
        let Some(target) = target else {
            return;
        };

        if code == FF_GAIN || code == FF_AUTOCENTER {
            if let Err(e) = target.send_ff(code, value) {
                error!("{} | Error forwarding FF setting {}", e, code);
            }
            return;
        }

        let virtual_id = code as i16;
        let Some(effect) = self.effects.get_mut(&virtual_id) else {
            debug!("Play request for untracked effect {}", virtual_id);
            return;
        };

        let result = if value > 0 { effect.play(value) } else { effect.stop() };
        if let Err(e) = result {
            error!("{} | Error playing effect {}", e, virtual_id);
        }
    }

    fn pulse(&mut self, target: Option<&mut dyn HapticTarget>, duration: Duration) {
        let Some(target) = target else {
            debug!("No gamepad for haptic cue");
            return;
        };

        // Replacing the previous cue erases it from the gamepad
        self.pulse = None;
        match target.upload(rumble(duration)) {
            Ok(mut effect) => {
                if let Err(e) = effect.play(1) {
                    error!("{} | Error playing haptic cue", e);
                }
                self.pulse = Some(effect);
            }
            Err(e) => error!("{} | Error uploading haptic cue", e),
        }
    }
}
