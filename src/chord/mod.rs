//! # Chord Module
//!
//! Recognition of vendor key chords.
//!
//! This module handles:
//! - Raw key code names used by the chord tables ([`codes`])
//! - Static chord descriptions ([`definition`])
//! - Arm/latch bookkeeping ([`queue`])
//! - The table-driven recognizer ([`recognizer`])

pub mod codes;
pub mod definition;
pub mod queue;
pub mod recognizer;

pub use definition::{ChordDefinition, ChordTable, FireMode, Gate, HapticCue, TriggerKind};
pub use queue::EventQueue;
pub use recognizer::{ChordRecognizer, ChordState, Command};
