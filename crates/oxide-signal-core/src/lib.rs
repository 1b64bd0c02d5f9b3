#![deny(missing_docs)]
//! Oxide Signal core library.
//!
//! Transport-agnostic rules for the signal responder: settings, keyword
//! matching, the trading-hours window, signal generation and the
//! per-user / per-chat rate guards.

/// Configuration management.
pub mod config;
/// Per-user cooldown and per-chat burst bookkeeping.
pub mod guard;
/// Inbound event evaluation.
pub mod responder;
/// Trading-hours window.
pub mod schedule;
/// Randomized signal generation and rendering.
pub mod signal;
/// Trigger keyword detection.
pub mod trigger;
/// Utility functions.
pub mod utils;
