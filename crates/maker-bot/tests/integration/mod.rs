//! Integration tests for maker-bot.
//!
//! These tests drive the quoting engine through full ticks against
//! recording mocks: book snapshots in, order intents out, no network.

pub mod common;
