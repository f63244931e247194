//! plan-audio library crate
//!
//! Composes per-day audio for Bible reading plans: chapter recordings are
//! joined in reading order, optionally sped up, and optionally mixed over
//! rotating, loudness-normalized background music.
//! The batch driver binary is in main.rs.

#[macro_use]
extern crate log;

pub mod batch;
pub mod buffer;
pub mod composer;
pub mod config;
pub mod constants;
pub mod error;
pub mod limiter;
pub mod loudness;
pub mod mixer;
pub mod naming;
pub mod plan;
pub mod rotation;
pub mod sources;
pub mod tempo;
pub mod wav;

#[cfg(test)]
mod composer_tests;
