//! Card effects resolver.
//!
//! Cards are interpreted, not coded: [`is_card_playable`] checks the target
//! payload against the card's [`TargetSpec`] and then runs the effect list in
//! strict mode on a scratch copy, failing on the first effect whose
//! precondition does not hold. [`resolve_card_effects`] runs the same code
//! leniently: an inapplicable effect is skipped and the rest still apply.
//! Because both paths share the per-effect checks, a target accepted by the
//! strict pass never no-ops a movement or bridge effect on the same state.

use std::collections::BTreeSet;

use serde_json::json;

use crate::board::{ChampionState, EdgeKey, Hex, PlayerId, UnitId};
use crate::catalog::{CardDef, CardTargets, Effect, TargetSpec};
use crate::game::deck::{draw_cards, take_from_top, take_random_from_hand};
use crate::game::{Block, BlockPayload, CardInstanceId, GameState, ModifierKind};

use super::combat::slay_champion;

/// One card being played.
#[derive(Debug, Clone, Copy)]
pub struct CardPlay<'a> {
    pub player: &'a PlayerId,
    pub card: &'a CardDef,
    /// The physical card, when played from a hand.
    pub instance: Option<CardInstanceId>,
    pub targets: &'a CardTargets,
}

/// What a lenient resolution left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayOutcome {
    /// A champion now carries the card instance.
    pub champion_attached: bool,
    pub applied: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Strict,
    Lenient,
}

#[derive(Default)]
struct Tally {
    outcome: PlayOutcome,
    scout: Option<(usize, usize)>,
}

/// True if `card` may be played by `player` with `targets` on `state`.
pub fn is_card_playable(state: &GameState, player: &PlayerId, card: &CardDef, targets: &CardTargets) -> bool {
    if card.disabled || state.player(player).is_none() {
        return false;
    }
    if !card.effects.iter().all(Effect::is_supported) {
        return false;
    }
    if !scout_report_is_last(&card.effects) {
        return false;
    }
    if !targets_satisfy_spec(state, player, &card.target_spec, targets) {
        return false;
    }
    let play = CardPlay {
        player,
        card,
        instance: None,
        targets,
    };
    let mut scratch = state.clone();
    let mut tally = Tally::default();
    apply_effects(&mut scratch, &play, &card.effects, Mode::Strict, &mut tally)
}

/// Applies `card`'s effects for `player` and returns the new state. Never
/// fails; inapplicable effects are skipped.
pub fn resolve_card_effects(state: &GameState, player: &PlayerId, card: &CardDef, targets: &CardTargets) -> GameState {
    let mut next = state.clone();
    let play = CardPlay {
        player,
        card,
        instance: None,
        targets,
    };
    apply_card(&mut next, &play);
    next
}

/// Lenient resolution on a working state. A trailing scout report opens its
/// block here.
pub fn apply_card(state: &mut GameState, play: &CardPlay) -> PlayOutcome {
    let mut tally = Tally::default();
    apply_effects(state, play, &play.card.effects, Mode::Lenient, &mut tally);
    if let Some((look, keep)) = tally.scout {
        begin_scout_report(state, play.player, look, keep);
    }
    tally.outcome
}

/// `ScoutReport` may appear once, as the final top-level effect.
fn scout_report_is_last(effects: &[Effect]) -> bool {
    let nested = effects.iter().any(|e| match e {
        Effect::IfChosen { effects, .. } => effects.iter().any(|n| matches!(n, Effect::ScoutReport { .. })),
        _ => false,
    });
    let positions: Vec<usize> = effects
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e, Effect::ScoutReport { .. }))
        .map(|(i, _)| i)
        .collect();
    !nested && (positions.is_empty() || positions == [effects.len() - 1])
}

fn edge_on_board(state: &GameState, edge: EdgeKey) -> bool {
    let (a, b) = edge.endpoints();
    state.board.contains(a) && state.board.contains(b)
}

/// The player has units on an endpoint or owns a capital there.
fn present_at_edge(state: &GameState, player: &PlayerId, edge: EdgeKey) -> bool {
    let (a, b) = edge.endpoints();
    let capital = state.player(player).and_then(|p| p.capital);
    [a, b]
        .iter()
        .any(|h| state.board.has_units(player, *h) || capital == Some(*h))
}

fn path_shape_ok(state: &GameState, path: &[Hex], max_length: usize) -> bool {
    if path.len() < 2 || path.len() - 1 > max_length {
        return false;
    }
    let distinct: BTreeSet<&Hex> = path.iter().collect();
    distinct.len() == path.len()
        && path.iter().all(|h| state.board.contains(*h))
        && path.windows(2).all(|w| w[0].is_adjacent(w[1]))
}

/// Checks a target payload against a target spec on the current state.
pub fn targets_satisfy_spec(state: &GameState, player: &PlayerId, spec: &TargetSpec, targets: &CardTargets) -> bool {
    let board = &state.board;
    match (spec, targets) {
        (TargetSpec::None, CardTargets::None) => true,
        (TargetSpec::Edge { require_presence }, CardTargets::Edge { edge }) => {
            edge_on_board(state, *edge) && (!require_presence || present_at_edge(state, player, *edge))
        }
        (TargetSpec::MultiEdge { count, require_presence }, CardTargets::MultiEdge { edges }) => {
            let distinct: BTreeSet<&EdgeKey> = edges.iter().collect();
            edges.len() == *count
                && distinct.len() == edges.len()
                && edges.iter().all(|e| {
                    edge_on_board(state, *e) && (!require_presence || present_at_edge(state, player, *e))
                })
        }
        (
            TargetSpec::Stack {
                max_distance,
                require_bridges,
            },
            CardTargets::Stack { from, to },
        ) => {
            from != to
                && board.contains(*to)
                && board.has_units(player, *from)
                && stack_reach_ok(state, *from, *to, *max_distance, *require_bridges)
        }
        (TargetSpec::Path { max_length }, CardTargets::Path { path }) => {
            path_shape_ok(state, path, *max_length) && board.has_units(player, path[0])
        }
        (TargetSpec::MultiPath { count, max_length }, CardTargets::MultiPath { paths }) => {
            let starts: BTreeSet<Hex> = paths.iter().filter_map(|p| p.first().copied()).collect();
            paths.len() == *count
                && starts.len() == paths.len()
                && paths
                    .iter()
                    .all(|p| path_shape_ok(state, p, *max_length) && board.has_units(player, p[0]))
        }
        (
            TargetSpec::Hex {
                max_distance_from_capital,
                require_presence,
                require_empty,
            },
            CardTargets::Hex { hex },
        ) => {
            if !board.contains(*hex) {
                return false;
            }
            if let Some(max) = max_distance_from_capital {
                let capital = state.player(player).and_then(|p| p.capital);
                if !capital.is_some_and(|c| c.distance(*hex) <= *max) {
                    return false;
                }
            }
            (!require_presence || board.has_units(player, *hex)) && (!require_empty || board.is_empty_hex(*hex))
        }
        (TargetSpec::HexPair { max_distance }, CardTargets::HexPair { from, to }) => {
            from != to
                && board.contains(*from)
                && board.contains(*to)
                && from.distance(*to) <= *max_distance
        }
        (TargetSpec::Champion { own }, CardTargets::Champion { unit_id }) => {
            match board.units.get(unit_id) {
                Some(u) if u.champion().is_some() => (u.owner == *player) == *own,
                _ => false,
            }
        }
        (TargetSpec::Choice { options }, CardTargets::Choice { option }) => options.contains(option),
        _ => false,
    }
}

fn stack_reach_ok(state: &GameState, from: Hex, to: Hex, max_distance: u32, require_bridges: bool) -> bool {
    if require_bridges {
        state.board.reachable_over_bridges(from, max_distance).contains(&to)
    } else {
        from.distance(to) <= max_distance
    }
}

fn apply_effects(state: &mut GameState, play: &CardPlay, effects: &[Effect], mode: Mode, tally: &mut Tally) -> bool {
    for effect in effects {
        let ok = apply_effect(state, play, effect, mode, tally);
        if ok {
            tally.outcome.applied += 1;
        } else {
            if mode == Mode::Strict {
                return false;
            }
            log::trace!("{}: {} skipped an effect", play.player, play.card.id);
            tally.outcome.skipped += 1;
        }
    }
    true
}

/// Applies one effect. Returns false when its precondition fails.
fn apply_effect(state: &mut GameState, play: &CardPlay, effect: &Effect, mode: Mode, tally: &mut Tally) -> bool {
    let player = play.player;
    match effect {
        Effect::GainGold { amount } => {
            state.credit_gold(player, *amount);
            true
        }
        Effect::GainMana { amount } => {
            if let Some(p) = state.player_mut(player) {
                p.resources.mana += amount;
            }
            true
        }
        Effect::DrawCards { count } => {
            draw_cards(state, player, *count);
            true
        }
        Effect::DiscardCards { count } => {
            let cards = take_random_from_hand(state, player, *count);
            if let Some(p) = state.player_mut(player) {
                p.deck.discard_pile.extend(cards);
            }
            true
        }
        Effect::BurnCards { count } => {
            let cards = take_random_from_hand(state, player, *count);
            if let Some(p) = state.player_mut(player) {
                p.burned.extend(cards);
            }
            true
        }
        Effect::BuildBridge => build_bridges(state, play, false, mode),
        Effect::BuildTemporaryBridge => build_bridges(state, play, true, mode),
        Effect::DestroyBridge => match play.targets {
            CardTargets::Edge { edge } => state.board.remove_bridge(*edge).is_some(),
            _ => false,
        },
        Effect::MoveStack => move_stack(state, play),
        Effect::MovePath => move_paths(state, play, mode),
        Effect::DeployForces { count } => {
            let Some(hex) = deploy_hex(state, play) else {
                return false;
            };
            !state.board.add_forces(player, hex, *count).is_empty()
        }
        Effect::DeployChampion => {
            let deployed = deploy_champion(state, play);
            if deployed && mode == Mode::Lenient {
                tally.outcome.champion_attached = play.instance.is_some();
            }
            deployed
        }
        Effect::RollGold { sides, table } => {
            let roll = state.roll_die(*sides);
            let gold = table.get(roll as usize - 1).copied().unwrap_or(0);
            state.credit_gold(player, gold);
            true
        }
        Effect::GoldIfOccupying { tile, amount } => {
            let occupies = state
                .board
                .hexes
                .iter()
                .any(|(h, rec)| rec.tile == *tile && state.board.has_units(player, *h));
            if occupies {
                state.credit_gold(player, *amount);
            }
            true
        }
        Effect::GainVictoryPoints { amount } => {
            if let Some(p) = state.player_mut(player) {
                p.vp.permanent += amount;
                p.vp.recompute();
            }
            true
        }
        Effect::HealChampion { amount } => {
            let Some(unit_id) = champion_target(state, play) else {
                return false;
            };
            match state.board.units.get_mut(&unit_id).and_then(|u| u.champion_mut()) {
                Some(champ) => {
                    champ.hp = (champ.hp + amount).min(champ.max_hp);
                    true
                }
                None => false,
            }
        }
        Effect::DamageChampion { amount } => {
            let Some(unit_id) = champion_target(state, play) else {
                return false;
            };
            let remaining = match state.board.units.get_mut(&unit_id).and_then(|u| u.champion_mut()) {
                Some(champ) => {
                    champ.hp = champ.hp.saturating_sub(*amount);
                    champ.hp
                }
                None => return false,
            };
            if remaining == 0 && mode == Mode::Lenient {
                slay_champion(state, unit_id, Some(player));
            } else if remaining == 0 {
                state.board.remove_unit(unit_id);
            }
            true
        }
        Effect::CombatBonus { dice } => {
            state.add_modifier(
                player,
                Some(play.card.id.clone()),
                ModifierKind::CombatDice { bonus: *dice },
            );
            true
        }
        Effect::ScoutReport { look, keep } => {
            if mode == Mode::Lenient {
                tally.scout = Some((*look, *keep));
            }
            true
        }
        Effect::IfChosen { option, effects } => {
            if matches!(play.targets, CardTargets::Choice { option: chosen } if chosen == option) {
                apply_effects(state, play, effects, mode, tally)
            } else {
                true
            }
        }
        Effect::AssignHits | Effect::RetreatOnLoss | Effect::Unsupported => false,
    }
}

fn build_bridges(state: &mut GameState, play: &CardPlay, temporary: bool, mode: Mode) -> bool {
    let edges: Vec<EdgeKey> = match play.targets {
        CardTargets::Edge { edge } => vec![*edge],
        CardTargets::MultiEdge { edges } => edges.clone(),
        _ => return false,
    };
    let mut all = true;
    for edge in edges {
        let built = state.board.add_bridge(edge, Some(play.player.clone()), temporary);
        if !built {
            all = false;
            if mode == Mode::Strict {
                return false;
            }
        }
    }
    all
}

/// Re-validates and moves a whole stack for `Stack` or `HexPair` targets.
fn move_stack(state: &mut GameState, play: &CardPlay) -> bool {
    let (from, to) = match play.targets {
        CardTargets::Stack { from, to } | CardTargets::HexPair { from, to } => (*from, *to),
        _ => return false,
    };
    let reach_ok = match &play.card.target_spec {
        TargetSpec::Stack {
            max_distance,
            require_bridges,
        } => stack_reach_ok(state, from, to, *max_distance, *require_bridges),
        TargetSpec::HexPair { max_distance } => from.distance(to) <= *max_distance,
        _ => false,
    };
    let board = &state.board;
    if from == to
        || !reach_ok
        || !board.contains(to)
        || !board.has_units(play.player, from)
        || board.would_exceed_two_players(to, play.player)
    {
        return false;
    }
    state.board.move_stack(play.player, from, to) > 0
}

/// Moves a stack along a bridged path. Intermediate hexes may not hold
/// another player's units.
fn move_along(state: &mut GameState, player: &PlayerId, path: &[Hex], max_length: usize) -> bool {
    if !path_shape_ok(state, path, max_length) || !state.board.has_units(player, path[0]) {
        return false;
    }
    if !path.windows(2).all(|w| state.board.has_bridge(w[0], w[1])) {
        return false;
    }
    let last = path.len() - 1;
    let blocked = path[1..last].iter().any(|h| {
        state
            .board
            .occupying_players(*h)
            .iter()
            .any(|p| p != player)
    });
    if blocked || state.board.would_exceed_two_players(path[last], player) {
        return false;
    }
    state.board.move_stack(player, path[0], path[last]) > 0
}

fn move_paths(state: &mut GameState, play: &CardPlay, mode: Mode) -> bool {
    let max_length = match &play.card.target_spec {
        TargetSpec::Path { max_length } | TargetSpec::MultiPath { max_length, .. } => *max_length,
        _ => return false,
    };
    let paths: Vec<Vec<Hex>> = match play.targets {
        CardTargets::Path { path } => vec![path.clone()],
        CardTargets::MultiPath { paths } => paths.clone(),
        _ => return false,
    };
    let mut all = true;
    for path in &paths {
        if !move_along(state, play.player, path, max_length) {
            all = false;
            if mode == Mode::Strict {
                return false;
            }
        }
    }
    all
}

/// Deploy location: the targeted hex, or the player's capital.
fn deploy_hex(state: &GameState, play: &CardPlay) -> Option<Hex> {
    let hex = match play.targets {
        CardTargets::Hex { hex } => *hex,
        CardTargets::None => state.player(play.player)?.capital?,
        _ => return None,
    };
    if !state.board.contains(hex) || state.board.would_exceed_two_players(hex, play.player) {
        return None;
    }
    Some(hex)
}

fn deploy_champion(state: &mut GameState, play: &CardPlay) -> bool {
    let Some(stats) = play.card.champion.as_ref() else {
        return false;
    };
    let Some(hex) = deploy_hex(state, play) else {
        return false;
    };
    let champion = ChampionState {
        card_id: play.card.id.clone(),
        card_instance: play.instance,
        name: play.card.name.clone(),
        hp: stats.hp,
        max_hp: stats.hp,
        attack_dice: stats.attack_dice,
        hit_faces: stats.hit_faces,
        bounty: stats.bounty,
    };
    state.board.add_champion(play.player, hex, champion).is_some()
}

/// The targeted champion, re-checked against the card's ownership rule.
fn champion_target(state: &GameState, play: &CardPlay) -> Option<UnitId> {
    let CardTargets::Champion { unit_id } = play.targets else {
        return None;
    };
    let unit = state.board.units.get(unit_id)?;
    unit.champion()?;
    let own = matches!(play.card.target_spec, TargetSpec::Champion { own: true });
    ((unit.owner == *play.player) == own).then_some(*unit_id)
}

/// Reveals the top cards of `player`'s draw pile and waits for a keep choice.
fn begin_scout_report(state: &mut GameState, player: &PlayerId, look: usize, keep: usize) {
    let cards = take_from_top(state, player, look);
    if cards.is_empty() {
        return;
    }
    state.block = Some(Block::new(
        [player.clone()],
        BlockPayload::ScoutReport {
            player: player.clone(),
            cards,
            keep,
            chosen: None,
        },
    ));
}

/// Records which revealed cards the scouting player keeps.
pub fn submit_scout_choice(state: &GameState, player: &PlayerId, keep: &[CardInstanceId]) -> Option<GameState> {
    let block = state.block.as_ref()?;
    let BlockPayload::ScoutReport {
        cards, keep: max, ..
    } = &block.payload
    else {
        return None;
    };
    if !block.is_waiting_on(player) || keep.len() > *max {
        return None;
    }
    let distinct: BTreeSet<&CardInstanceId> = keep.iter().collect();
    if distinct.len() != keep.len() || !keep.iter().all(|c| cards.contains(c)) {
        return None;
    }
    let mut next = state.clone();
    let block = next.block.as_mut()?;
    if let BlockPayload::ScoutReport { chosen, .. } = &mut block.payload {
        *chosen = Some(keep.to_vec());
    }
    block.waiting_for.remove(player);
    Some(next)
}

/// Kept cards go to hand, the rest to the discard pile.
pub fn resolve_scout_report(state: &mut GameState, player: &PlayerId, cards: &[CardInstanceId], chosen: &[CardInstanceId]) {
    if let Some(p) = state.player_mut(player) {
        for card in cards {
            if chosen.contains(card) {
                p.deck.hand.push(*card);
            } else {
                p.deck.discard_pile.push(*card);
            }
        }
    }
    state.push_event(
        "action.scoutResolved",
        json!({ "player": player, "revealed": cards.len(), "kept": chosen.len() }),
    );
}
