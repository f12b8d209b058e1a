//! Phase engines.
//!
//! Each submodule owns one part of the round: setup, the market auction,
//! action declarations and their resolution, combat and sieges, card effects,
//! and the bookkeeping phases. [`phase`] drives them.

pub mod action;
pub mod combat;
pub mod effects;
pub mod market;
pub mod phase;
pub mod retreat;
pub mod round;
pub mod setup;

pub use effects::{is_card_playable, resolve_card_effects};
pub use phase::{run_until_blocked, MAX_DRIVER_STEPS};
