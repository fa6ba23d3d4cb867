//! # Handycon Library
//!
//! Unify the vendor buttons of handheld gaming PCs into one virtual game
//! controller.
//!
//! The daemon grabs and hides the real gamepad and the vendor keyboard devices,
//! recognises each model's key chords, and emits controller and keyboard
//! events on a single uinput device. Force feedback sent to that device is
//! relayed back to the real gamepad.

pub mod action;
pub mod chord;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod profile;
pub mod session;
pub mod system;
