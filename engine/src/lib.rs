//! Bridgehold engine library.
//!
//! A deterministic rules engine for a hex-grid conquest game. Exposes the
//! board, card catalog, resolver, legal-command generation and the JSON-lines
//! protocol for use by integration tests and the binary entry points.

pub mod board;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod game;
pub mod movegen;
pub mod protocol;
pub mod resolve;
pub mod rng;
pub mod selfplay;
