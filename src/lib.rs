//! Bedside - a virtual-patient diagnostic training simulator
//!
//! This crate provides the core of the simulator, including:
//! - Conversation controller with the data-unlock directive protocol
//! - Clinical data store with per-category single-flight generation
//! - Diagnosis evaluation against a fixed surgical rubric
//! - Speech playback with a live speaking-animation driver
//! - Voice capture glue for dictated questions

pub mod audio;
pub mod case;
pub mod config;
pub mod error;
pub mod gateway;
pub mod sim;
pub mod voice;

pub use config::Config;
