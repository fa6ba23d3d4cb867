//! # Virtual Controller
//!
//! The single uinput device every loop writes to. One actor task owns it:
//! other loops send event batches over a channel, and the actor services the
//! force-feedback requests games make against it.
//!
//! ## Identity
//!
//! - Name: "Handheld Controller"
//! - Bus USB, vendor 0x045e, product 0x028e, version 0x110 (Xbox 360 pad)
//!
//! ## Axes
//!
//! - Sticks: ABS_X, ABS_Y, ABS_RX, ABS_RY (-32768..32767, fuzz 16, flat 128)
//! - Triggers: ABS_Z, ABS_RZ (0..255)
//! - D-pad: ABS_HAT0X, ABS_HAT0Y (-1..1)

use evdev::uinput::{VirtualDevice, VirtualEventStream};
use evdev::{
    AbsInfo, AbsoluteAxisCode, AttributeSet, BusType, EventSummary, FFEffectCode, InputEvent, InputId,
    KeyCode, MiscCode, UInputCode, UinputAbsSetup,
};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use super::ff_relay::{FfRequest, FF_FAILED};
use crate::error::{HandyconError, Result};

pub const VIRTUAL_NAME: &str = "Handheld Controller";

const VENDOR_ID: u16 = 0x045e;
const PRODUCT_ID: u16 = 0x028e;
const VERSION: u16 = 0x110;

/// Highest keyboard code exposed (KEY_MICMUTE)
const LAST_KEYBOARD_CODE: u16 = 248;

const FF_EFFECTS_MAX: u32 = 16;

/// Build the uinput device
///
/// # Errors
///
/// Returns `VirtualDevice` if `/dev/uinput` cannot be opened or configured.
pub fn build() -> Result<VirtualDevice> {
    let map = |e: std::io::Error| HandyconError::VirtualDevice(format!("Failed to create {}: {}", VIRTUAL_NAME, e));

    let mut keys = AttributeSet::<KeyCode>::new();
    for code in 1..=LAST_KEYBOARD_CODE {
        keys.insert(KeyCode::new(code));
    }
    for code in KeyCode::BTN_SOUTH.code()..=KeyCode::BTN_THUMBR.code() {
        keys.insert(KeyCode::new(code));
    }

    let stick = AbsInfo::new(0, -32768, 32767, 16, 128, 0);
    let trigger = AbsInfo::new(0, 0, 255, 0, 0, 0);
    let hat = AbsInfo::new(0, -1, 1, 0, 0, 0);

    let mut misc = AttributeSet::<MiscCode>::new();
    misc.insert(MiscCode::MSC_SCAN);

    let mut ff = AttributeSet::<FFEffectCode>::new();
    for code in [
        FFEffectCode::FF_RUMBLE,
        FFEffectCode::FF_PERIODIC,
        FFEffectCode::FF_SQUARE,
        FFEffectCode::FF_TRIANGLE,
        FFEffectCode::FF_SINE,
        FFEffectCode::FF_GAIN,
    ] {
        ff.insert(code);
    }

    let device = VirtualDevice::builder()
        .map_err(map)?
        .name(VIRTUAL_NAME)
        .input_id(InputId::new(BusType::BUS_USB, VENDOR_ID, PRODUCT_ID, VERSION))
        .with_keys(&keys)
        .map_err(map)?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_X, stick))
        .map_err(map)?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_Y, stick))
        .map_err(map)?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_RX, stick))
        .map_err(map)?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_RY, stick))
        .map_err(map)?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_Z, trigger))
        .map_err(map)?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_RZ, trigger))
        .map_err(map)?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_HAT0X, hat))
        .map_err(map)?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisCode::ABS_HAT0Y, hat))
        .map_err(map)?
        .with_msc(&misc)
        .map_err(map)?
        .with_ff(&ff)
        .map_err(map)?
        .with_ff_effects_max(FF_EFFECTS_MAX)
        .build()
        .map_err(map)?;

    info!("Created virtual controller: {}", VIRTUAL_NAME);
    Ok(device)
}

/// Sending side of the virtual controller actor
#[derive(Debug, Clone)]
pub struct VirtualControllerHandle {
    tx: mpsc::UnboundedSender<Vec<InputEvent>>,
}

impl VirtualControllerHandle {
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<Vec<InputEvent>>) -> Self {
        Self { tx }
    }

    /// Emit one event followed by a sync report
    pub fn emit(&self, event: InputEvent) -> Result<()> {
        self.emit_batch(vec![event])
    }

    /// Emit events sharing one sync report
    ///
    /// # Errors
    ///
    /// Returns `VirtualDevice` once the actor has stopped.
    pub fn emit_batch(&self, events: Vec<InputEvent>) -> Result<()> {
        self.tx
            .send(events)
            .map_err(|_| HandyconError::VirtualDevice("Virtual controller is gone".to_string()))
    }
}

/// Own the virtual controller until shutdown.
///
/// Batches from `events` are written as they arrive. uinput FF uploads and
/// erases are answered by the gamepad loop through `ff`, and `EV_FF` writes
/// are forwarded there as play requests.
///
/// Needs the multi-threaded runtime: an upload or erase parks this worker
/// until the gamepad loop replies.
pub async fn run(
    device: VirtualDevice,
    mut events: mpsc::UnboundedReceiver<Vec<InputEvent>>,
    ff: mpsc::UnboundedSender<FfRequest>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let mut stream = device
        .into_event_stream()
        .map_err(|e| HandyconError::VirtualDevice(format!("Failed to read {}: {}", VIRTUAL_NAME, e)))?;

    loop {
        tokio::select! {
            batch = events.recv() => {
                let Some(batch) = batch else { break };
                if let Err(e) = stream.device_mut().emit(&batch) {
                    error!("{} | Error emitting {} events", e, batch.len());
                }
            }
            event = stream.next_event() => {
                match event {
                    Ok(event) => handle_uinput(&mut stream, event, &ff),
                    Err(e) => {
                        error!("{} | Error reading virtual controller", e);
                        break;
                    }
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    debug!("Virtual controller stopped");
    Ok(())
}

/// Answer one uinput request.
///
/// The kernel-side upload and erase handles must be completed on this thread
/// before anything else touches the device, so the gamepad reply is awaited
/// in place.
fn handle_uinput(stream: &mut VirtualEventStream, event: InputEvent, ff: &mpsc::UnboundedSender<FfRequest>) {
    match event.destructure() {
        EventSummary::UInput(event, UInputCode::UI_FF_UPLOAD, ..) => {
            let mut upload = match stream.device_mut().process_ff_upload(event) {
                Ok(upload) => upload,
                Err(e) => {
                    error!("{} | Error beginning FF upload", e);
                    return;
                }
            };
            let (reply, answer) = oneshot::channel();
            let request = FfRequest::Upload { virtual_id: upload.effect_id(), data: upload.effect(), reply };
            upload.set_retval(exchange(ff, request, answer));
        }
        EventSummary::UInput(event, UInputCode::UI_FF_ERASE, ..) => {
            let mut erase = match stream.device_mut().process_ff_erase(event) {
                Ok(erase) => erase,
                Err(e) => {
                    error!("{} | Error beginning FF erase", e);
                    return;
                }
            };
            let (reply, answer) = oneshot::channel();
            let request = FfRequest::Erase { virtual_id: erase.effect_id() as i16, reply };
            erase.set_retval(exchange(ff, request, answer));
        }
        EventSummary::ForceFeedback(_, code, value) => {
            if ff.send(FfRequest::Play { code: code.0, value }).is_err() {
                debug!("Gamepad loop is gone, dropping FF play");
            }
        }
        _ => {}
    }
}

/// Hand `request` to the gamepad loop and block until its uinput reply
fn exchange(ff: &mpsc::UnboundedSender<FfRequest>, request: FfRequest, answer: oneshot::Receiver<i32>) -> i32 {
    if ff.send(request).is_err() {
        warn!("Gamepad loop is gone, failing FF request");
        return FF_FAILED;
    }
    tokio::task::block_in_place(|| answer.blocking_recv()).unwrap_or(FF_FAILED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::EventType;

    // ==================== Handle Tests ====================

    #[test]
    fn test_handle_emits_single_event_batches() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = VirtualControllerHandle::new(tx);
        let event = InputEvent::new(EventType::KEY.0, KeyCode::BTN_MODE.code(), 1);

        handle.emit(event).unwrap();

        assert_eq!(rx.try_recv().unwrap(), vec![event]);
    }

    #[test]
    fn test_handle_fails_once_actor_stopped() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let handle = VirtualControllerHandle::new(tx);

        let err = handle.emit_batch(Vec::new()).unwrap_err();
        assert!(matches!(err, HandyconError::VirtualDevice(_)));
    }

    #[test]
    fn test_exchange_without_gamepad_loop_fails_request() {
        let (ff, ff_rx) = mpsc::unbounded_channel();
        drop(ff_rx);
        let (reply, answer) = oneshot::channel();

        let retval = exchange(&ff, FfRequest::Erase { virtual_id: 0, reply }, answer);

        assert_eq!(retval, FF_FAILED);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_exchange_returns_gamepad_reply() {
        let (ff, mut ff_rx) = mpsc::unbounded_channel();
        let responder = tokio::spawn(async move {
            if let Some(FfRequest::Erase { reply, .. }) = ff_rx.recv().await {
                reply.send(0).unwrap();
            }
        });
        let (reply, answer) = oneshot::channel();

        let retval = exchange(&ff, FfRequest::Erase { virtual_id: 2, reply }, answer);

        assert_eq!(retval, 0);
        responder.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_exchange_when_gamepad_drops_reply() {
        let (ff, mut ff_rx) = mpsc::unbounded_channel();
        let responder = tokio::spawn(async move { drop(ff_rx.recv().await) });
        let (reply, answer) = oneshot::channel();

        let retval = exchange(&ff, FfRequest::Erase { virtual_id: 1, reply }, answer);

        assert_eq!(retval, FF_FAILED);
        responder.await.unwrap();
    }

    // ==================== Actor Tests ====================

    /// Compile-time check that `run` can go on a multi-threaded `JoinSet`
    fn spawnable<F, Fut>(_: F)
    where
        F: FnOnce(
            VirtualDevice,
            mpsc::UnboundedReceiver<Vec<InputEvent>>,
            mpsc::UnboundedSender<FfRequest>,
            watch::Receiver<bool>,
        ) -> Fut,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
    }

    #[test]
    fn test_run_future_is_send() {
        spawnable(run);
    }

    // Integration test - needs write access to /dev/uinput
    #[test]
    #[ignore]
    fn test_build_with_uinput() {
        let device = build().unwrap();
        drop(device);
    }

    // Integration test - needs write access to /dev/uinput
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[ignore]
    async fn test_run_on_join_set_until_shutdown() {
        let device = build().unwrap();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (ff_tx, _ff_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown) = watch::channel(false);

        let mut tasks = tokio::task::JoinSet::new();
        tasks.spawn(run(device, event_rx, ff_tx, shutdown));
        VirtualControllerHandle::new(event_tx)
            .emit(InputEvent::new(evdev::EventType::KEY.0, KeyCode::BTN_SOUTH.code(), 1))
            .unwrap();
        shutdown_tx.send(true).unwrap();

        let joined = tasks.join_next().await.unwrap().unwrap();
        assert!(joined.is_ok());
    }
}
