//! Candidate target payloads for a card.
//!
//! Enumerates a bounded set of plausible targets from the card's target spec
//! and keeps those the card would accept.

use std::collections::BTreeSet;

use crate::board::{EdgeKey, Hex, PlayerId};
use crate::catalog::{CardDef, CardTargets, TargetSpec};
use crate::game::GameState;
use crate::resolve::effects::targets_satisfy_spec;

/// Cap on candidates per card.
const MAX_CANDIDATES: usize = 24;

/// Hexes the player has units on, plus its capital.
fn presence_hexes(state: &GameState, player: &PlayerId) -> Vec<Hex> {
    let mut hexes: BTreeSet<Hex> = state.board.hexes_with_units(player).into_iter().collect();
    if let Some(capital) = state.player(player).and_then(|p| p.capital) {
        hexes.insert(capital);
    }
    hexes.into_iter().collect()
}

/// On-board edges leaving the player's hexes.
fn presence_edges(state: &GameState, player: &PlayerId) -> Vec<EdgeKey> {
    let mut edges = BTreeSet::new();
    for hex in presence_hexes(state, player) {
        for n in hex.neighbors() {
            if state.board.contains(n) {
                if let Some(edge) = EdgeKey::new(hex, n) {
                    edges.insert(edge);
                }
            }
        }
    }
    edges.into_iter().collect()
}

/// Simple bridged paths starting at `from`, at most `max_length` steps.
fn bridged_paths(state: &GameState, from: Hex, max_length: usize) -> Vec<Vec<Hex>> {
    let mut out = Vec::new();
    let mut stack = vec![vec![from]];
    while let Some(path) = stack.pop() {
        if path.len() > 1 {
            out.push(path.clone());
        }
        if path.len() > max_length || out.len() >= MAX_CANDIDATES {
            continue;
        }
        let Some(&last) = path.last() else {
            continue;
        };
        for n in state.board.bridged_neighbors(last) {
            if !path.contains(&n) {
                let mut next = path.clone();
                next.push(n);
                stack.push(next);
            }
        }
    }
    out
}

fn raw_candidates(state: &GameState, player: &PlayerId, spec: &TargetSpec) -> Vec<CardTargets> {
    let board = &state.board;
    let units = board.hexes_with_units(player);
    match spec {
        TargetSpec::None => vec![CardTargets::None],
        TargetSpec::Edge { .. } => {
            let mut edges: BTreeSet<EdgeKey> = presence_edges(state, player).into_iter().collect();
            edges.extend(board.bridges.keys().copied());
            edges.into_iter().map(|edge| CardTargets::Edge { edge }).collect()
        }
        TargetSpec::MultiEdge { count, .. } => {
            let edges: Vec<EdgeKey> = presence_edges(state, player)
                .into_iter()
                .filter(|e| {
                    let (a, b) = e.endpoints();
                    !board.has_bridge(a, b)
                })
                .collect();
            edges
                .chunks(*count)
                .filter(|c| c.len() == *count)
                .map(|c| CardTargets::MultiEdge { edges: c.to_vec() })
                .collect()
        }
        TargetSpec::Stack {
            max_distance,
            require_bridges,
        } => {
            let mut out = Vec::new();
            for from in &units {
                let reach: Vec<Hex> = if *require_bridges {
                    board.reachable_over_bridges(*from, *max_distance).into_iter().collect()
                } else {
                    board
                        .hexes
                        .keys()
                        .copied()
                        .filter(|h| from.distance(*h) <= *max_distance)
                        .collect()
                };
                for to in reach {
                    if to != *from {
                        out.push(CardTargets::Stack { from: *from, to });
                    }
                }
            }
            out
        }
        TargetSpec::Path { max_length } => units
            .iter()
            .flat_map(|from| bridged_paths(state, *from, *max_length))
            .map(|path| CardTargets::Path { path })
            .collect(),
        TargetSpec::MultiPath { count, max_length } => {
            let firsts: Vec<Vec<Hex>> = units
                .iter()
                .filter_map(|from| bridged_paths(state, *from, *max_length).into_iter().next())
                .collect();
            firsts
                .chunks(*count)
                .filter(|c| c.len() == *count)
                .map(|c| CardTargets::MultiPath { paths: c.to_vec() })
                .collect()
        }
        TargetSpec::Hex { .. } => board
            .hexes
            .keys()
            .map(|hex| CardTargets::Hex { hex: *hex })
            .collect(),
        TargetSpec::HexPair { max_distance } => {
            let mut out = Vec::new();
            for from in &units {
                for to in board.hexes.keys() {
                    if to != from && from.distance(*to) <= *max_distance {
                        out.push(CardTargets::HexPair { from: *from, to: *to });
                    }
                }
            }
            out
        }
        TargetSpec::Champion { .. } => board
            .units
            .values()
            .filter(|u| u.champion().is_some())
            .map(|u| CardTargets::Champion { unit_id: u.id })
            .collect(),
        TargetSpec::Choice { options } => options
            .iter()
            .map(|option| CardTargets::Choice {
                option: option.clone(),
            })
            .collect(),
    }
}

/// Target payloads that satisfy `card`'s target spec on `state`.
pub fn candidate_targets(state: &GameState, player: &PlayerId, card: &CardDef) -> Vec<CardTargets> {
    raw_candidates(state, player, &card.target_spec)
        .into_iter()
        .filter(|t| targets_satisfy_spec(state, player, &card.target_spec, t))
        .take(MAX_CANDIDATES)
        .collect()
}
