//! Battles and sieges.
//!
//! A battle is fought on a hex held by exactly two players. Each round both
//! sides roll at once: one die per force, a champion's attack dice, plus any
//! bonus dice from modifiers (and the capital's defense dice for a besieged
//! owner). Hits land on forces first, then on champions in unit order. After
//! a round in which both sides survive, the smaller side may be offered a
//! retreat, which blocks the driver until it answers.

use serde_json::json;

use crate::board::{Hex, PlayerId, TileType, UnitId};
use crate::game::{BattleState, Block, BlockPayload, GameState, Phase};

use super::retreat::retreat_options;

/// Removes a champion, paying its bounty to `killer` and returning its card
/// to the owner's discard pile.
pub fn slay_champion(state: &mut GameState, unit_id: UnitId, killer: Option<&PlayerId>) {
    let Some(unit) = state.board.remove_unit(unit_id) else {
        return;
    };
    let Some(champ) = unit.champion() else {
        return;
    };
    let bounty = match killer {
        Some(k) if *k != unit.owner => {
            state.credit_gold(k, champ.bounty);
            champ.bounty
        }
        _ => 0,
    };
    if let Some(card) = champ.card_instance {
        if let Some(p) = state.player_mut(&unit.owner) {
            p.deck.in_play.retain(|c| *c != card);
            p.deck.discard_pile.push(card);
        }
    }
    log::debug!("{} slain at {}", champ.name, unit.hex);
    state.push_event(
        "combat.championSlain",
        json!({
            "unitId": unit_id,
            "cardId": champ.card_id,
            "owner": unit.owner,
            "killer": killer,
            "bounty": bounty,
        }),
    );
}

/// Lands `hits` on `player`'s units at `hex`: forces first, then champions
/// one hit point at a time in unit order.
pub fn apply_hits(state: &mut GameState, hex: Hex, player: &PlayerId, hits: u32, killer: Option<&PlayerId>) {
    let mut hits = hits;
    let forces: Vec<UnitId> = state
        .board
        .units_of(player, hex)
        .iter()
        .copied()
        .filter(|id| state.board.units.get(id).is_some_and(|u| u.is_force()))
        .collect();
    for id in forces {
        if hits == 0 {
            return;
        }
        state.board.remove_unit(id);
        hits -= 1;
    }
    let champions: Vec<UnitId> = state
        .board
        .champions_of(player, hex)
        .iter()
        .map(|u| u.id)
        .collect();
    for id in champions {
        while hits > 0 {
            let remaining = match state.board.units.get_mut(&id).and_then(|u| u.champion_mut()) {
                Some(champ) => {
                    champ.hp = champ.hp.saturating_sub(1);
                    champ.hp
                }
                None => break,
            };
            hits -= 1;
            if remaining == 0 {
                slay_champion(state, id, killer);
                break;
            }
        }
    }
}

/// Rolls `player`'s side at `hex`. Returns the number of hits.
fn roll_side(state: &mut GameState, hex: Hex, player: &PlayerId, extra_dice: u32) -> u32 {
    let sides = state.config.dice_sides;
    let force_faces = state.config.force_hit_faces;
    let mut pools: Vec<(u32, u32)> = Vec::new();
    let forces = state.board.force_count(player, hex) as u32;
    let bonus = state.combat_bonus_dice(player) + extra_dice;
    pools.push((forces + bonus, force_faces));
    for unit in state.board.champions_of(player, hex) {
        if let Some(champ) = unit.champion() {
            pools.push((champ.attack_dice, champ.hit_faces));
        }
    }
    let mut hits = 0;
    for (dice, faces) in pools {
        for _ in 0..dice {
            if state.roll_die(sides) <= faces {
                hits += 1;
            }
        }
    }
    hits
}

fn unit_count(state: &GameState, player: &PlayerId, hex: Hex) -> usize {
    state.board.units_of(player, hex).len()
}

/// Starts a battle on a hex held by two players and fights it.
///
/// The hex owner defends when it is one of the two sides; otherwise the
/// earlier player counting from the lead seat defends.
pub fn start_battle(state: &mut GameState, hex: Hex, siege: bool) {
    let sides = state.board.occupying_players(hex);
    let [a, b] = sides.as_slice() else {
        log::warn!("battle at {} needs two sides, found {}", hex, sides.len());
        return;
    };
    let owner = state.board.get(hex).and_then(|rec| rec.owner.clone());
    let defender = match owner {
        Some(o) if o == *a || o == *b => o,
        _ => {
            let seat = |id: &PlayerId| state.player(id).map_or(usize::MAX, |p| state.lead_distance(p.seat));
            if seat(a) <= seat(b) {
                a.clone()
            } else {
                b.clone()
            }
        }
    };
    let attacker = if defender == *a { b.clone() } else { a.clone() };
    state.push_event(
        "combat.started",
        json!({ "hex": hex, "attacker": attacker, "defender": defender, "siege": siege }),
    );
    state.battle = Some(BattleState {
        hex,
        attacker,
        defender,
        siege,
        round: 0,
        retreat_offered: Default::default(),
    });
    continue_battle(state);
}

/// Fights rounds of the current battle until it ends or a retreat is offered.
pub fn continue_battle(state: &mut GameState) {
    loop {
        let Some(battle) = state.battle.clone() else {
            return;
        };
        let hex = battle.hex;
        let attackers = unit_count(state, &battle.attacker, hex);
        let defenders = unit_count(state, &battle.defender, hex);
        if attackers == 0 || defenders == 0 {
            end_battle(state, &battle);
            return;
        }
        if battle.round >= state.config.max_combat_rounds {
            withdraw_attacker(state, &battle);
            end_battle(state, &battle);
            return;
        }

        let round = battle.round + 1;
        let defense = if battle.siege {
            state.config.capital_defense_dice
        } else {
            0
        };
        let attacker_hits = roll_side(state, hex, &battle.attacker, 0);
        let defender_hits = roll_side(state, hex, &battle.defender, defense);
        apply_hits(state, hex, &battle.defender, attacker_hits, Some(&battle.attacker));
        apply_hits(state, hex, &battle.attacker, defender_hits, Some(&battle.defender));
        state.push_event(
            "combat.round",
            json!({
                "hex": hex,
                "round": round,
                "attackerHits": attacker_hits,
                "defenderHits": defender_hits,
            }),
        );
        if let Some(b) = state.battle.as_mut() {
            b.round = round;
        }

        if offer_retreat(state, &battle) {
            return;
        }
    }
}

/// Opens a retreat block for the first side, attacker then defender, that
/// has strictly fewer units, was not offered one yet, and has somewhere to go.
fn offer_retreat(state: &mut GameState, battle: &BattleState) -> bool {
    let hex = battle.hex;
    let attackers = unit_count(state, &battle.attacker, hex);
    let defenders = unit_count(state, &battle.defender, hex);
    if attackers == 0 || defenders == 0 {
        return false;
    }
    let candidates = [
        (&battle.attacker, attackers < defenders),
        (&battle.defender, defenders < attackers),
    ];
    for (player, smaller) in candidates {
        if !smaller || battle.retreat_offered.contains(player) {
            continue;
        }
        let options = retreat_options(&state.board, hex, player);
        if options.is_empty() {
            continue;
        }
        if let Some(b) = state.battle.as_mut() {
            b.retreat_offered.insert(player.clone());
        }
        state.block = Some(Block::new(
            [player.clone()],
            BlockPayload::CombatRetreat {
                hex,
                player: player.clone(),
                options,
                decision: None,
            },
        ));
        return true;
    }
    false
}

/// After the last allowed round the attacker falls back to its first retreat
/// option, or is destroyed if it has none.
fn withdraw_attacker(state: &mut GameState, battle: &BattleState) {
    let hex = battle.hex;
    let options = retreat_options(&state.board, hex, &battle.attacker);
    match options.first() {
        Some(to) => {
            let moved = state.board.move_stack(&battle.attacker, hex, *to);
            state.push_event(
                "combat.withdrew",
                json!({ "hex": hex, "player": battle.attacker, "to": to, "units": moved }),
            );
        }
        None => {
            let units = state.board.units_of(&battle.attacker, hex).to_vec();
            for id in &units {
                let is_champion = state.board.units.get(id).is_some_and(|u| u.champion().is_some());
                if is_champion {
                    slay_champion(state, *id, Some(&battle.defender));
                } else {
                    state.board.remove_unit(*id);
                }
            }
            state.push_event(
                "combat.withdrew",
                json!({ "hex": hex, "player": battle.attacker, "to": null, "destroyed": units.len() }),
            );
        }
    }
}

/// Closes the current battle and records who holds the hex.
pub fn end_battle(state: &mut GameState, battle: &BattleState) {
    let hex = battle.hex;
    let holder = state.board.sole_occupant(hex).cloned();
    log::debug!("battle at {} over after {} rounds", hex, battle.round);
    state.push_event(
        "combat.ended",
        json!({ "hex": hex, "winner": holder, "siege": battle.siege }),
    );
    state.battle = None;
}

/// Enters the siege step and queues every capital holding enemy units.
pub fn enter_sieges(state: &mut GameState) {
    state.enter_phase(Phase::RoundSieges);
    let queue: Vec<Hex> = state
        .board
        .hexes
        .iter()
        .filter(|(_, rec)| rec.tile == TileType::Capital)
        .filter(|(_, rec)| {
            rec.occupants
                .keys()
                .any(|p| rec.owner.as_ref() != Some(p))
        })
        .map(|(h, _)| *h)
        .collect();
    state.siege_queue = queue;
}

/// Siege step with no block open: finishes a running battle, or takes the
/// next queued capital, or moves on to collection.
pub fn sieges_step(state: &mut GameState) {
    if state.battle.is_some() {
        continue_battle(state);
        return;
    }
    if state.siege_queue.is_empty() {
        state.enter_phase(Phase::RoundCollection);
        return;
    }
    let hex = state.siege_queue.remove(0);
    let owner = state.board.get(hex).and_then(|rec| rec.owner.clone());
    let occupants = state.board.occupying_players(hex);
    let enemies: Vec<PlayerId> = occupants
        .iter()
        .filter(|p| owner.as_ref() != Some(*p))
        .cloned()
        .collect();
    match (owner, enemies.as_slice()) {
        (_, []) => {}
        (Some(owner), _) if occupants.contains(&owner) => start_battle(state, hex, true),
        (_, [_, _]) => start_battle(state, hex, false),
        (owner, [enemy]) => garrison_defense(state, hex, owner.as_ref(), enemy),
        (_, _) => log::warn!("siege at {} with {} enemies", hex, enemies.len()),
    }
}

/// An unattended capital shoots at the besieger once; survivors sack it.
fn garrison_defense(state: &mut GameState, hex: Hex, owner: Option<&PlayerId>, enemy: &PlayerId) {
    let sides = state.config.dice_sides;
    let faces = state.config.force_hit_faces;
    let dice = state.config.capital_defense_dice;
    let hits = (0..dice).filter(|_| state.roll_die(sides) <= faces).count() as u32;
    apply_hits(state, hex, enemy, hits, owner);
    if !state.board.has_units(enemy, hex) {
        state.push_event(
            "siege.repelled",
            json!({ "hex": hex, "owner": owner, "besieger": enemy, "hits": hits }),
        );
        return;
    }
    let stolen = match owner {
        Some(o) => {
            let take = state.config.siege_gold_steal;
            state.debit_gold(o, take)
        }
        None => 0,
    };
    state.credit_gold(enemy, stolen);
    log::info!("{} sacks the capital at {} for {} gold", enemy, hex, stolen);
    state.push_event(
        "siege.sacked",
        json!({ "hex": hex, "owner": owner, "besieger": enemy, "hits": hits, "gold": stolen }),
    );
}
