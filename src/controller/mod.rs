//! # Controller Module
//!
//! The virtual game controller and the real gamepad behind it.
//!
//! This module handles:
//! - Creating the uinput "Handheld Controller" and writing to it ([`virtual_device`])
//! - Forwarding the real gamepad's reports to it ([`gamepad`])
//! - Relaying force feedback from games back to the real gamepad ([`ff_relay`])

pub mod ff_relay;
pub mod gamepad;
pub mod virtual_device;

pub use ff_relay::{FfRequest, ForceFeedbackRelay};
pub use gamepad::{GamepadHandle, GamepadLoop};
pub use virtual_device::VirtualControllerHandle;
