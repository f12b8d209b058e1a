//! Phase driver.
//!
//! [`run_until_blocked`] keeps stepping a working copy until the game needs
//! player input. A step either settles a block whose waiting set has emptied
//! or runs the automatic part of the current phase.

use crate::board::PlayerId;
use crate::game::{Block, BlockPayload, GameState, Phase};

use super::{action, combat, effects, market, retreat, round};

/// Upper bound on automatic steps per driver call.
pub const MAX_DRIVER_STEPS: usize = 10_000;

/// Advances `state` until it is blocked on player input, the game is over, or
/// it is still in setup.
pub fn run_until_blocked(state: &GameState) -> GameState {
    let mut next = state.clone();
    drive(&mut next);
    next
}

/// In-place form of [`run_until_blocked`].
pub fn drive(state: &mut GameState) {
    let mut steps = 0;
    while !state.is_blocked() {
        if steps >= MAX_DRIVER_STEPS {
            log::warn!(
                "driver stopped after {} steps in {} (round {})",
                steps,
                state.phase,
                state.round
            );
            return;
        }
        step(state);
        steps += 1;
    }
}

/// Runs one automatic step.
pub fn step(state: &mut GameState) {
    state.revision += 1;
    if let Some(block) = state.block.take() {
        resolve_block(state, block.payload);
        return;
    }
    match state.phase {
        Phase::Setup | Phase::GameOver => {}
        Phase::RoundReset => round::reset(state),
        Phase::RoundStudy => round::begin_study(state),
        Phase::RoundMarket => market::step(state),
        Phase::RoundAction => action::step(state),
        Phase::RoundSieges => combat::sieges_step(state),
        Phase::RoundCollection => round::begin_collection(state),
        Phase::RoundScoring => round::score(state),
        Phase::RoundCleanup => round::cleanup(state),
        Phase::RoundAgeUpdate => round::age_update(state),
    }
}

/// Settles a block nobody is waiting on any more.
fn resolve_block(state: &mut GameState, payload: BlockPayload) {
    match payload {
        BlockPayload::SetupDeckPreview { .. }
        | BlockPayload::SetupCapitalDraft { .. }
        | BlockPayload::SetupStartingBridges { .. }
        | BlockPayload::SetupFreeStartingCard { .. } => {
            // Setup steps only close through the host's advance command.
            state.block = Some(Block::new(Vec::<PlayerId>::new(), payload));
        }
        BlockPayload::QuietStudy { discards, .. } => round::resolve_quiet_study(state, &discards),
        BlockPayload::MarketBidsForCard { .. } => market::resolve_slot(state),
        BlockPayload::ActionDeclarations { declarations } => action::begin_resolution(state, &declarations),
        BlockPayload::CollectionChoices { offers, choices } => {
            round::resolve_collection(state, &offers, &choices)
        }
        BlockPayload::CombatRetreat {
            hex,
            player,
            decision,
            ..
        } => retreat::resolve_retreat(state, hex, &player, decision),
        BlockPayload::ScoutReport {
            player,
            cards,
            chosen,
            ..
        } => effects::resolve_scout_report(state, &player, &cards, &chosen.unwrap_or_default()),
    }
}
