//! The battle session aggregate and its phase state machine.
//!
//! ```text
//! intro → player_turn → (action_resolve) → enemy_turn → (action_resolve)
//!       → status_tick → player_turn | victory | defeat | flee
//! ```
//!
//! Rule refusals (unknown spell, not enough PP, ...) come back as an
//! unsuccessful [`ActionResult`] and leave the session untouched. Every
//! resolved sub-event is queued as a [`BattleLogEntry`] until the handler
//! persists it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spellbound_core::error::DomainError;
use spellbound_core::rng::DeterministicRng;
use uuid::Uuid;

use super::combatant::Combatant;
use super::damage::{calculate_damage, check_accuracy};
use super::definitions::{ItemDefinition, STRUGGLE_ID, SpellDefinition, SpellTarget};
use super::discipline::EffectivenessTier;
use super::resources::{consume_resource, has_sufficient_resource};
use super::status::{
    Eligibility, StatusKind, apply_status, can_act, cure_status, has_status, tick_statuses,
};
use super::turn_order::order_by_speed;

const BASE_FLEE_CHANCE: i64 = 50;

/// Battle state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattlePhase {
    /// Battle created, nobody has acted yet.
    Intro,
    /// Waiting on the player's side.
    PlayerTurn,
    /// An action is being resolved.
    ActionResolve,
    /// Waiting on the opponent.
    EnemyTurn,
    /// Both sides acted; end-of-turn effects are due.
    StatusTick,
    /// The opponent was defeated.
    Victory,
    /// The player was defeated.
    Defeat,
    /// The player escaped.
    #[serde(rename = "flee")]
    Fled,
}

impl BattlePhase {
    /// Whether the battle is over.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Victory | Self::Defeat | Self::Fled)
    }

    /// The outcome a terminal phase represents.
    #[must_use]
    pub fn outcome(self) -> Option<BattleOutcome> {
        match self {
            Self::Victory => Some(BattleOutcome::Victory),
            Self::Defeat => Some(BattleOutcome::Defeat),
            Self::Fled => Some(BattleOutcome::Fled),
            _ => None,
        }
    }
}

/// How a battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleOutcome {
    /// The opponent was defeated.
    Victory,
    /// The player was defeated.
    Defeat,
    /// The player escaped.
    #[serde(rename = "flee")]
    Fled,
}

impl BattleOutcome {
    /// The terminal phase for this outcome.
    #[must_use]
    pub fn phase(self) -> BattlePhase {
        match self {
            Self::Victory => BattlePhase::Victory,
            Self::Defeat => BattlePhase::Defeat,
            Self::Fled => BattlePhase::Fled,
        }
    }
}

/// An action submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BattleAction {
    /// Cast a spell at the opponent or oneself.
    Spell {
        /// Spell identifier.
        spell_id: String,
    },
    /// Use an item from the player's inventory.
    Item {
        /// Item identifier.
        item_id: String,
    },
    /// Try to escape.
    Flee,
}

/// An action with its reference data already looked up.
#[derive(Debug, Clone, PartialEq)]
pub enum PreparedAction {
    /// Cast a spell; `definition` is `None` when the catalog has no such
    /// spell.
    Spell {
        /// Spell identifier.
        spell_id: String,
        /// Catalog entry.
        definition: Option<SpellDefinition>,
    },
    /// Use an item.
    Item {
        /// Item identifier.
        item_id: String,
        /// Catalog entry.
        definition: Option<ItemDefinition>,
        /// How many the player owns.
        owned: u32,
    },
    /// Try to escape.
    Flee,
}

/// Kind of logged event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    /// A spell was cast.
    Spell,
    /// An item was used.
    Item,
    /// An escape was attempted.
    Flee,
    /// End-of-turn damage or expiry.
    StatusTick,
    /// A combatant fell.
    Defeat,
}

/// One persisted line of the battle log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleLogEntry {
    /// Battle this entry belongs to.
    pub battle_id: Uuid,
    /// Turn number.
    pub turn: u32,
    /// Acting (or affected) combatant.
    pub actor: String,
    /// Kind of event.
    pub action: LogAction,
    /// Target, if any.
    pub target: Option<String>,
    /// Spell cast, if any.
    pub spell_id: Option<String>,
    /// Item used, if any.
    pub item_id: Option<String>,
    /// Damage dealt.
    pub damage: Option<u32>,
    /// Health restored.
    pub healing: Option<u32>,
    /// Whether the hit was critical.
    pub critical: bool,
    /// Whether the spell missed.
    pub missed: bool,
    /// Condition inflicted.
    pub status_applied: Option<StatusKind>,
    /// Human-readable description.
    pub message: String,
    /// When it happened.
    pub recorded_at: DateTime<Utc>,
}

/// Report of one resolved (or refused) action. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionResult {
    /// `false` for rule refusals; the battle is unchanged.
    pub success: bool,
    /// Human-readable description.
    pub message: String,
    /// Damage dealt.
    pub damage: Option<u32>,
    /// Health restored.
    pub healing: Option<u32>,
    /// Whether the hit was critical.
    pub critical: bool,
    /// Whether the spell missed.
    pub missed: bool,
    /// Matchup bucket of a damaging spell.
    pub effectiveness: Option<EffectivenessTier>,
    /// Condition newly inflicted.
    pub status_applied: Option<StatusKind>,
    /// Whether the target fell.
    pub target_defeated: bool,
    /// Whether the battle is now over.
    pub battle_ended: bool,
    /// How it ended.
    pub outcome: Option<BattleOutcome>,
}

impl ActionResult {
    /// A refusal that consumes nothing.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Self::default()
        }
    }

    fn resolved(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            ..Self::default()
        }
    }
}

/// A condition that ran out during an end-of-turn tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiredStatus {
    /// Who carried it.
    pub combatant: String,
    /// The condition.
    pub kind: StatusKind,
}

/// Report of an end-of-turn tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnEndReport {
    /// Damage-over-time taken by the player.
    pub player_damage: u32,
    /// Damage-over-time taken by the opponent.
    pub enemy_damage: u32,
    /// Conditions that ran out.
    pub expired: Vec<ExpiredStatus>,
    /// Set when the tick ended the battle.
    pub outcome: Option<BattleOutcome>,
}

/// Which slot a combatant occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The player.
    Player,
    /// The opponent.
    Enemy,
    /// A companion on the player's side.
    Companion(usize),
}

impl Side {
    fn opponent(self) -> Self {
        match self {
            Self::Enemy => Self::Player,
            Self::Player | Self::Companion(_) => Self::Enemy,
        }
    }
}

/// Everything needed to open a battle.
#[derive(Debug, Clone)]
pub struct NewBattle {
    /// Battle identifier.
    pub id: Uuid,
    /// Owning profile.
    pub profile_id: Uuid,
    /// The player.
    pub player: Combatant,
    /// The opponent.
    pub enemy: Combatant,
    /// Allies of the player.
    pub companions: Vec<Combatant>,
    /// Where the battle takes place.
    pub location: String,
    /// Whether escaping is possible.
    pub flee_allowed: bool,
}

/// The aggregate root for a battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleSession {
    /// Battle identifier.
    pub id: Uuid,
    /// Owning profile.
    pub profile_id: Uuid,
    /// The player.
    pub player: Combatant,
    /// The opponent.
    pub enemy: Combatant,
    /// Allies of the player.
    #[serde(default)]
    pub companions: Vec<Combatant>,
    /// Names, fastest first.
    pub turn_order: Vec<String>,
    /// Turn number, starting at 1.
    pub turn: u32,
    /// Current phase.
    pub phase: BattlePhase,
    /// Where the battle takes place.
    pub location: String,
    /// Whether escaping is possible.
    pub flee_allowed: bool,
    /// When the session last changed.
    pub last_action_at: DateTime<Utc>,
    /// Set once rewards and the terminal phase have been persisted.
    #[serde(default)]
    pub finalized: bool,
    /// Persisted version, for optimistic concurrency.
    #[serde(default)]
    pub version: i64,
    /// Log entries pending persistence.
    #[serde(skip)]
    uncommitted_log: Vec<BattleLogEntry>,
}

/// Flee success chance in percent: `50 + (player − enemy speed)`, clamped
/// to `[0, 100]`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn flee_chance(player_speed: u32, enemy_speed: u32) -> u32 {
    let chance = BASE_FLEE_CHANCE + i64::from(player_speed) - i64::from(enemy_speed);
    chance.clamp(0, 100) as u32
}

fn claim_name(taken: &mut Vec<String>, name: &str) -> String {
    let mut candidate = name.to_owned();
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = format!("{name} {n}");
        n += 1;
    }
    taken.push(candidate.clone());
    candidate
}

impl BattleSession {
    /// Opens a battle in the `intro` phase with an initial turn order.
    ///
    /// Duplicate display names get a numeric suffix so actors can be
    /// addressed by name.
    pub fn start(new: NewBattle, now: DateTime<Utc>, rng: &mut dyn DeterministicRng) -> Self {
        let NewBattle {
            id,
            profile_id,
            player,
            mut enemy,
            mut companions,
            location,
            flee_allowed,
        } = new;

        let mut taken = vec![player.name.clone()];
        for companion in &mut companions {
            companion.name = claim_name(&mut taken, &companion.name);
        }
        enemy.name = claim_name(&mut taken, &enemy.name);

        let mut session = Self {
            id,
            profile_id,
            player,
            enemy,
            companions,
            turn_order: Vec::new(),
            turn: 1,
            phase: BattlePhase::Intro,
            location,
            flee_allowed,
            last_action_at: now,
            finalized: false,
            version: 0,
            uncommitted_log: Vec::new(),
        };
        session.turn_order = session.compute_turn_order(rng);
        session
    }

    fn compute_turn_order(&self, rng: &mut dyn DeterministicRng) -> Vec<String> {
        let mut everyone: Vec<&Combatant> = vec![&self.player];
        everyone.extend(self.companions.iter());
        everyone.push(&self.enemy);
        order_by_speed(&everyone, rng)
    }

    /// Finds the slot occupied by the combatant called `name`.
    #[must_use]
    pub fn side_of(&self, name: &str) -> Option<Side> {
        if self.player.name == name {
            return Some(Side::Player);
        }
        if self.enemy.name == name {
            return Some(Side::Enemy);
        }
        self.companions
            .iter()
            .position(|c| c.name == name)
            .map(Side::Companion)
    }

    /// The combatant in `side`.
    ///
    /// # Panics
    ///
    /// Panics if `side` names a companion index that does not exist; sides
    /// come from [`Self::side_of`].
    #[must_use]
    pub fn combatant(&self, side: Side) -> &Combatant {
        match side {
            Side::Player => &self.player,
            Side::Enemy => &self.enemy,
            Side::Companion(i) => &self.companions[i],
        }
    }

    fn set_combatant(&mut self, side: Side, combatant: Combatant) {
        match side {
            Side::Player => self.player = combatant,
            Side::Enemy => self.enemy = combatant,
            Side::Companion(i) => self.companions[i] = combatant,
        }
    }

    /// Log entries produced since the last [`Self::take_uncommitted_log`].
    #[must_use]
    pub fn uncommitted_log(&self) -> &[BattleLogEntry] {
        &self.uncommitted_log
    }

    /// Drains the pending log entries for persistence.
    pub fn take_uncommitted_log(&mut self) -> Vec<BattleLogEntry> {
        std::mem::take(&mut self.uncommitted_log)
    }

    /// Checks the invariants of a loaded session.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::CorruptSession` naming the first violation.
    pub fn check_invariants(&self) -> Result<(), DomainError> {
        let corrupt = |reason: String| DomainError::CorruptSession {
            battle_id: self.id,
            reason,
        };
        for combatant in std::iter::once(&self.player)
            .chain(std::iter::once(&self.enemy))
            .chain(self.companions.iter())
        {
            combatant.check_invariants().map_err(corrupt)?;
        }
        if self.turn == 0 {
            return Err(corrupt("turn counter is zero".to_owned()));
        }
        Ok(())
    }

    fn log_entry(
        &self,
        actor: &str,
        action: LogAction,
        message: String,
        now: DateTime<Utc>,
    ) -> BattleLogEntry {
        BattleLogEntry {
            battle_id: self.id,
            turn: self.turn,
            actor: actor.to_owned(),
            action,
            target: None,
            spell_id: None,
            item_id: None,
            damage: None,
            healing: None,
            critical: false,
            missed: false,
            status_applied: None,
            message,
            recorded_at: now,
        }
    }

    fn end_with(&mut self, outcome: BattleOutcome, result: &mut ActionResult) {
        self.phase = outcome.phase();
        result.battle_ended = true;
        result.outcome = Some(outcome);
    }

    fn advance_after(&mut self, side: Side) {
        self.phase = match side {
            Side::Enemy => BattlePhase::StatusTick,
            Side::Player | Side::Companion(_) => BattlePhase::EnemyTurn,
        };
    }

    /// Resolves one action by the combatant called `actor_name`.
    ///
    /// Refusals leave the session unchanged. A resolved action records log
    /// entries, stamps `last_action_at`, and moves the phase on: to a
    /// terminal phase if the battle ended, otherwise to `enemy_turn` after
    /// the player's side or `status_tick` after the opponent.
    pub fn execute_action(
        &mut self,
        actor_name: &str,
        action: PreparedAction,
        now: DateTime<Utc>,
        rng: &mut dyn DeterministicRng,
    ) -> ActionResult {
        if self.phase.is_terminal() {
            return ActionResult::failure("The battle is already over.");
        }
        let Some(side) = self.side_of(actor_name) else {
            return ActionResult::failure(format!("No combatant named {actor_name} in this battle."));
        };

        let eligibility = can_act(self.combatant(side), rng);
        if !eligibility.can_act() {
            let reason = eligibility
                .reason(actor_name)
                .unwrap_or_else(|| format!("{actor_name} cannot act."));
            return ActionResult::failure(reason);
        }

        let result = match action {
            PreparedAction::Flee => self.resolve_flee(side, now, rng),
            PreparedAction::Spell {
                spell_id,
                definition,
            } => self.resolve_spell(side, &spell_id, definition, eligibility, now, rng),
            PreparedAction::Item {
                item_id,
                definition,
                owned,
            } => self.resolve_item(side, &item_id, definition, owned, now),
        };

        if result.success {
            self.last_action_at = now;
            if !result.battle_ended {
                self.advance_after(side);
            }
        }
        result
    }

    fn resolve_flee(
        &mut self,
        side: Side,
        now: DateTime<Utc>,
        rng: &mut dyn DeterministicRng,
    ) -> ActionResult {
        if side != Side::Player {
            return ActionResult::failure("Only the player can flee.");
        }
        if !self.flee_allowed {
            return ActionResult::failure("You cannot flee from this battle!");
        }

        self.phase = BattlePhase::ActionResolve;
        let chance = flee_chance(self.player.stats.speed, self.enemy.stats.speed);
        let escaped = rng.roll_percent() < f64::from(chance);
        let name = self.player.name.clone();

        let mut result;
        if escaped {
            result = ActionResult::resolved(format!("{name} fled from the battle!"));
            self.end_with(BattleOutcome::Fled, &mut result);
        } else {
            result = ActionResult::resolved(format!("{name} couldn't get away!"));
        }

        let entry = self.log_entry(&name, LogAction::Flee, result.message.clone(), now);
        self.uncommitted_log.push(entry);
        result
    }

    fn resolve_spell(
        &mut self,
        side: Side,
        spell_id: &str,
        definition: Option<SpellDefinition>,
        eligibility: Eligibility,
        now: DateTime<Utc>,
        rng: &mut dyn DeterministicRng,
    ) -> ActionResult {
        let actor = self.combatant(side).clone();

        let spell = if spell_id == STRUGGLE_ID {
            SpellDefinition::struggle()
        } else {
            let Some(spell) = definition else {
                return ActionResult::failure(format!("Unknown spell: {spell_id}."));
            };
            if !actor.spells.iter().any(|s| s == spell_id) {
                return ActionResult::failure(format!("{} doesn't know {}.", actor.name, spell.name));
            }
            if eligibility == Eligibility::Silenced {
                return ActionResult::failure(
                    eligibility
                        .reason(&actor.name)
                        .unwrap_or_else(|| "Spells are sealed.".to_owned()),
                );
            }
            if !has_sufficient_resource(&actor, spell_id, &spell) {
                return ActionResult::failure(format!(
                    "{} doesn't have enough PP to cast {}!",
                    actor.name, spell.name
                ));
            }
            spell
        };

        self.phase = BattlePhase::ActionResolve;
        let mut actor = if spell.is_struggle() {
            actor
        } else {
            consume_resource(actor, spell_id, &spell)
        };
        let target_side = side.opponent();
        let mut target = self.combatant(target_side).clone();

        let mut entry = self.log_entry(&actor.name, LogAction::Spell, String::new(), now);
        entry.spell_id = Some(spell.id.clone());

        let mut message;
        let mut result = ActionResult::resolved(String::new());

        if spell.target == SpellTarget::Other {
            entry.target = Some(target.name.clone());

            if !check_accuracy(&spell, &actor, &target, rng) {
                message = format!("{} casts {}, but it misses {}!", actor.name, spell.name, target.name);
                result.missed = true;
                entry.missed = true;
                entry.message.clone_from(&message);
                result.message = message;
                self.set_combatant(side, actor);
                self.uncommitted_log.push(entry);
                return result;
            }

            let roll = calculate_damage(&spell, &actor, &target, rng);
            message = format!("{} casts {} on {}", actor.name, spell.name, target.name);
            if spell.damage() > 0 {
                target = target.take_damage(roll.damage);
                message.push_str(&format!(" for {} damage.", roll.damage));
                if roll.is_critical {
                    message.push_str(" A critical hit!");
                }
                match roll.effectiveness {
                    EffectivenessTier::Super => message.push_str(" It's super effective!"),
                    EffectivenessTier::Weak => message.push_str(" It's not very effective..."),
                    EffectivenessTier::Normal => {}
                }
                result.damage = Some(roll.damage);
                result.critical = roll.is_critical;
                result.effectiveness = Some(roll.effectiveness);
                entry.damage = Some(roll.damage);
                entry.critical = roll.is_critical;
            } else {
                message.push('.');
            }
        } else {
            message = format!("{} casts {}.", actor.name, spell.name);
        }

        if let Some(kind) = spell.status_effect.filter(|_| spell.inflicts_status()) {
            let recipient = match spell.target {
                SpellTarget::Caster => &mut actor,
                SpellTarget::Other => &mut target,
            };
            if !recipient.is_defeated()
                && !has_status(recipient, kind)
                && rng.roll_percent() < f64::from(spell.status_chance)
            {
                *recipient = apply_status(recipient.clone(), kind, spell.status_duration());
                message.push_str(&format!(" {} is now {}!", recipient.name, kind.label()));
                result.status_applied = Some(kind);
                entry.status_applied = Some(kind);
            }
        }

        if spell.target == SpellTarget::Caster && spell.heals() {
            let (healed, restored) = actor.heal(spell.heal_amount);
            actor = healed;
            message.push_str(&format!(" {} recovers {restored} health.", actor.name));
            result.healing = Some(restored);
            entry.healing = Some(restored);
        }

        let defeated = spell.target == SpellTarget::Other && target.is_defeated();
        let actor_name = actor.name.clone();
        let target_name = target.name.clone();
        self.set_combatant(side, actor);
        if spell.target == SpellTarget::Other {
            self.set_combatant(target_side, target);
        }

        entry.message.clone_from(&message);
        result.message = message;
        self.uncommitted_log.push(entry);

        if defeated {
            result.target_defeated = true;
            let outcome = if side == Side::Enemy {
                BattleOutcome::Defeat
            } else {
                BattleOutcome::Victory
            };
            self.end_with(outcome, &mut result);
            let mut faint = self.log_entry(
                &target_name,
                LogAction::Defeat,
                format!("{target_name} was defeated by {actor_name}!"),
                now,
            );
            faint.target = Some(target_name.clone());
            self.uncommitted_log.push(faint);
            result.message.push_str(&format!(" {target_name} was defeated!"));
        }

        result
    }

    fn resolve_item(
        &mut self,
        side: Side,
        item_id: &str,
        definition: Option<ItemDefinition>,
        owned: u32,
        now: DateTime<Utc>,
    ) -> ActionResult {
        if side != Side::Player {
            return ActionResult::failure("Only the player can use items.");
        }
        let Some(item) = definition else {
            return ActionResult::failure(format!("Unknown item: {item_id}."));
        };
        if !item.usable_in_battle {
            return ActionResult::failure(format!("{} can't be used in battle.", item.name));
        }
        if owned == 0 {
            return ActionResult::failure(format!("You don't have any {}.", item.name));
        }

        self.phase = BattlePhase::ActionResolve;
        let mut player = self.player.clone();
        let mut message = format!("{} uses {}.", player.name, item.name);
        let mut result = ActionResult::resolved(String::new());
        let mut entry = self.log_entry(&player.name, LogAction::Item, String::new(), now);
        entry.item_id = Some(item.id.clone());
        entry.target = Some(player.name.clone());

        if item.heal_amount > 0 {
            let (healed, restored) = player.heal(item.heal_amount);
            player = healed;
            message.push_str(&format!(" Restored {restored} health."));
            result.healing = Some(restored);
            entry.healing = Some(restored);
        }

        for kind in &item.cures {
            if has_status(&player, *kind) {
                player = cure_status(player, *kind);
                message.push_str(&format!(" {} is no longer {}.", player.name, kind.label()));
            }
        }

        self.player = player;
        entry.message.clone_from(&message);
        result.message = message;
        self.uncommitted_log.push(entry);
        result
    }

    /// Runs end-of-turn status ticks for every combatant and advances the
    /// turn.
    ///
    /// The player reaching zero health is a defeat even if the opponent
    /// also falls in the same tick.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the battle is already over.
    pub fn end_turn(
        &mut self,
        now: DateTime<Utc>,
        rng: &mut dyn DeterministicRng,
    ) -> Result<TurnEndReport, DomainError> {
        if self.phase.is_terminal() {
            return Err(DomainError::Validation(format!(
                "battle {} has already ended",
                self.id
            )));
        }

        let mut report = TurnEndReport {
            player_damage: 0,
            enemy_damage: 0,
            expired: Vec::new(),
            outcome: None,
        };

        let mut sides = vec![Side::Player, Side::Enemy];
        sides.extend((0..self.companions.len()).map(Side::Companion));

        for side in sides {
            let tick = tick_statuses(self.combatant(side));
            let name = tick.updated.name.clone();
            if tick.damage_dealt > 0 {
                let mut entry = self.log_entry(
                    &name,
                    LogAction::StatusTick,
                    format!("{name} suffers {} damage from lingering effects.", tick.damage_dealt),
                    now,
                );
                entry.damage = Some(tick.damage_dealt);
                self.uncommitted_log.push(entry);
            }
            for kind in &tick.expired {
                let entry = self.log_entry(
                    &name,
                    LogAction::StatusTick,
                    format!("{name} is no longer {}.", kind.label()),
                    now,
                );
                self.uncommitted_log.push(entry);
                report.expired.push(ExpiredStatus {
                    combatant: name.clone(),
                    kind: *kind,
                });
            }
            match side {
                Side::Player => report.player_damage = tick.damage_dealt,
                Side::Enemy => report.enemy_damage = tick.damage_dealt,
                Side::Companion(_) => {}
            }
            self.set_combatant(side, tick.updated);
        }

        self.turn += 1;
        self.turn_order = self.compute_turn_order(rng);
        self.last_action_at = now;

        let outcome = if self.player.is_defeated() {
            Some(BattleOutcome::Defeat)
        } else if self.enemy.is_defeated() {
            Some(BattleOutcome::Victory)
        } else {
            None
        };

        match outcome {
            Some(outcome) => {
                self.phase = outcome.phase();
                let fallen = match outcome {
                    BattleOutcome::Defeat => self.player.name.clone(),
                    _ => self.enemy.name.clone(),
                };
                let entry = self.log_entry(&fallen, LogAction::Defeat, format!("{fallen} was defeated!"), now);
                self.uncommitted_log.push(entry);
            }
            None => self.phase = BattlePhase::PlayerTurn,
        }
        report.outcome = outcome;

        Ok(report)
    }

    /// Marks a terminal battle as finalized.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the battle has not reached the
    /// terminal phase matching `outcome`, or was already finalized.
    pub fn finalize(
        &mut self,
        outcome: BattleOutcome,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.finalized {
            return Err(DomainError::Validation(format!(
                "battle {} has already been finalized",
                self.id
            )));
        }
        if self.phase != outcome.phase() {
            return Err(DomainError::Validation(format!(
                "battle {} is in phase {:?} and cannot end as {:?}",
                self.id, self.phase, outcome
            )));
        }
        self.finalized = true;
        self.last_action_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::domain::combatant::fixtures::combatant;
    use crate::domain::discipline::Discipline;
    use spellbound_test_support::{ConstantRng, MockRng, SequenceRng};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }

    fn spell(id: &str, base: Option<u32>) -> SpellDefinition {
        SpellDefinition {
            id: id.to_owned(),
            name: id.to_owned(),
            discipline: None,
            base_damage: base,
            accuracy: Some(100),
            cost: None,
            max_resource: None,
            status_effect: None,
            status_chance: 0,
            status_duration: None,
            heal_amount: 0,
            target: SpellTarget::Other,
            crit_bonus: 0,
            priority: 0,
        }
    }

    fn cast(s: &SpellDefinition) -> PreparedAction {
        PreparedAction::Spell {
            spell_id: s.id.clone(),
            definition: Some(s.clone()),
        }
    }

    fn session() -> BattleSession {
        let mut player = combatant("Mira");
        player.is_player = true;
        player.stats.speed = 60;
        player.spells = vec!["bolt".to_owned(), "ignite".to_owned(), "mend".to_owned()];
        let mut enemy = combatant("Goblin");
        enemy.spells = vec!["bite".to_owned()];

        BattleSession::start(
            NewBattle {
                id: Uuid::new_v4(),
                profile_id: Uuid::new_v4(),
                player,
                enemy,
                companions: Vec::new(),
                location: "forest".to_owned(),
                flee_allowed: true,
            },
            now(),
            &mut MockRng,
        )
    }

    #[test]
    fn test_start_opens_in_intro_with_turn_order() {
        let s = session();
        assert_eq!(s.phase, BattlePhase::Intro);
        assert_eq!(s.turn, 1);
        assert_eq!(s.turn_order, vec!["Mira", "Goblin"]);
        assert!(s.check_invariants().is_ok());
    }

    #[test]
    fn test_start_disambiguates_duplicate_names() {
        let mut wolf = combatant("Wolf");
        wolf.is_player = true;
        let s = BattleSession::start(
            NewBattle {
                id: Uuid::new_v4(),
                profile_id: Uuid::new_v4(),
                player: combatant("Mira"),
                enemy: combatant("Wolf"),
                companions: vec![wolf],
                location: "den".to_owned(),
                flee_allowed: true,
            },
            now(),
            &mut MockRng,
        );
        assert_eq!(s.companions[0].name, "Wolf");
        assert_eq!(s.enemy.name, "Wolf 2");
        assert_eq!(s.side_of("Wolf 2"), Some(Side::Enemy));
        assert_eq!(s.side_of("Wolf"), Some(Side::Companion(0)));
    }

    #[test]
    fn test_spell_hit_damages_target_and_advances_to_enemy_turn() {
        let mut s = session();
        let bolt = spell("bolt", Some(40));

        let result = s.execute_action("Mira", cast(&bolt), now(), &mut MockRng);

        assert!(result.success);
        assert_eq!(result.damage, Some(80));
        assert_eq!(result.effectiveness, Some(EffectivenessTier::Normal));
        assert_eq!(s.enemy.current_health, 20);
        assert_eq!(s.player.resources.get("bolt"), Some(&15));
        assert_eq!(s.phase, BattlePhase::EnemyTurn);
        assert_eq!(s.uncommitted_log().len(), 1);
        assert_eq!(s.uncommitted_log()[0].damage, Some(80));
    }

    #[test]
    fn test_lethal_spell_ends_in_victory() {
        let mut s = session();
        s.enemy.current_health = 50;
        let bolt = spell("bolt", Some(40));

        let result = s.execute_action("Mira", cast(&bolt), now(), &mut MockRng);

        assert!(result.target_defeated);
        assert!(result.battle_ended);
        assert_eq!(result.outcome, Some(BattleOutcome::Victory));
        assert_eq!(s.phase, BattlePhase::Victory);
        assert_eq!(s.enemy.current_health, 0);
        assert_eq!(s.uncommitted_log().last().unwrap().action, LogAction::Defeat);
    }

    #[test]
    fn test_enemy_lethal_spell_ends_in_defeat() {
        let mut s = session();
        s.player.current_health = 10;
        let bite = spell("bite", Some(40));

        let result = s.execute_action("Goblin", cast(&bite), now(), &mut MockRng);

        assert_eq!(result.outcome, Some(BattleOutcome::Defeat));
        assert_eq!(s.phase, BattlePhase::Defeat);
    }

    #[test]
    fn test_enemy_action_advances_to_status_tick() {
        let mut s = session();
        let bite = spell("bite", Some(5));

        let result = s.execute_action("Goblin", cast(&bite), now(), &mut MockRng);

        assert!(result.success);
        assert_eq!(s.phase, BattlePhase::StatusTick);
    }

    #[test]
    fn test_miss_spends_resource_but_deals_nothing() {
        let mut s = session();
        let mut bolt = spell("bolt", Some(40));
        bolt.accuracy = Some(50);
        // accuracy draw 0.9 → 90 >= 50
        let mut rng = SequenceRng::new(vec![0.9]);

        let result = s.execute_action("Mira", cast(&bolt), now(), &mut rng);

        assert!(result.success);
        assert!(result.missed);
        assert!(!result.battle_ended);
        assert_eq!(s.enemy.current_health, 100);
        assert_eq!(s.player.resources.get("bolt"), Some(&15));
        assert!(s.uncommitted_log()[0].missed);
        assert_eq!(s.phase, BattlePhase::EnemyTurn);
    }

    #[test]
    fn test_insufficient_resource_is_refused_without_mutation() {
        let mut s = session();
        s.player.resources.insert("bolt".to_owned(), 3);
        let before = s.clone();

        let result = s.execute_action("Mira", cast(&spell("bolt", Some(40))), now(), &mut MockRng);

        assert!(!result.success);
        assert!(result.message.contains("PP"));
        assert_eq!(s, before);
        assert!(s.uncommitted_log().is_empty());
    }

    #[test]
    fn test_unknown_spell_is_refused() {
        let mut s = session();
        let before = s.clone();
        let action = PreparedAction::Spell {
            spell_id: "meteor".to_owned(),
            definition: None,
        };

        let result = s.execute_action("Mira", action, now(), &mut MockRng);

        assert!(!result.success);
        assert_eq!(s, before);
    }

    #[test]
    fn test_unlearned_spell_is_refused() {
        let mut s = session();
        let result = s.execute_action("Mira", cast(&spell("meteor", Some(99))), now(), &mut MockRng);
        assert!(!result.success);
        assert!(result.message.contains("doesn't know"));
    }

    #[test]
    fn test_unknown_actor_is_refused() {
        let mut s = session();
        let result = s.execute_action("Nobody", PreparedAction::Flee, now(), &mut MockRng);
        assert!(!result.success);
    }

    #[test]
    fn test_stunned_actor_is_refused_without_consuming_turn() {
        let mut s = session();
        s.player = apply_status(s.player.clone(), StatusKind::Stunned, 2);
        let before = s.clone();

        let result = s.execute_action("Mira", cast(&spell("bolt", Some(40))), now(), &mut MockRng);

        assert!(!result.success);
        assert!(result.message.contains("stunned"));
        assert_eq!(s, before);
    }

    #[test]
    fn test_silenced_actor_cannot_cast_but_can_struggle() {
        let mut s = session();
        s.player = apply_status(s.player.clone(), StatusKind::Silenced, 2);

        let refused = s.execute_action("Mira", cast(&spell("bolt", Some(40))), now(), &mut MockRng);
        assert!(!refused.success);
        assert!(refused.message.contains("silenced"));

        let struggle = PreparedAction::Spell {
            spell_id: STRUGGLE_ID.to_owned(),
            definition: None,
        };
        let result = s.execute_action("Mira", struggle, now(), &mut MockRng);
        assert!(result.success);
        // 10 × 2 = 20
        assert_eq!(result.damage, Some(20));
        assert!(s.player.resources.is_empty());
    }

    #[test]
    fn test_status_roll_applies_once() {
        let mut s = session();
        let mut ignite = spell("ignite", None);
        ignite.status_effect = Some(StatusKind::Burning);
        ignite.status_chance = 60;

        // accuracy 0.0, status 0.5 → 50 < 60
        let mut rng = SequenceRng::new(vec![0.0, 0.5]);
        let result = s.execute_action("Mira", cast(&ignite), now(), &mut rng);
        assert_eq!(result.status_applied, Some(StatusKind::Burning));
        assert!(has_status(&s.enemy, StatusKind::Burning));
        assert_eq!(s.enemy.current_health, 100);

        // Already burning: no status draw, nothing newly applied.
        let mut rng = SequenceRng::new(vec![0.0]);
        let result = s.execute_action("Mira", cast(&ignite), now(), &mut rng);
        assert_eq!(result.status_applied, None);
        assert_eq!(s.enemy.statuses.len(), 1);
    }

    #[test]
    fn test_failed_status_roll() {
        let mut s = session();
        let mut ignite = spell("ignite", None);
        ignite.status_effect = Some(StatusKind::Burning);
        ignite.status_chance = 10;
        let mut rng = SequenceRng::new(vec![0.0, 0.5]);

        let result = s.execute_action("Mira", cast(&ignite), now(), &mut rng);

        assert!(result.success);
        assert_eq!(result.status_applied, None);
    }

    #[test]
    fn test_self_heal_skips_accuracy_and_caps_at_max() {
        let mut s = session();
        s.player.current_health = 80;
        let mut mend = spell("mend", None);
        mend.heal_amount = 50;
        mend.target = SpellTarget::Caster;
        let mut rng = SequenceRng::new(vec![]);

        let result = s.execute_action("Mira", cast(&mend), now(), &mut rng);

        assert!(result.success);
        assert_eq!(result.healing, Some(20));
        assert_eq!(s.player.current_health, 100);
    }

    #[test]
    fn test_self_buff_lands_on_caster() {
        let mut s = session();
        let mut ward = spell("mend", None);
        ward.target = SpellTarget::Caster;
        ward.status_effect = Some(StatusKind::Shielded);
        ward.status_chance = 100;

        let result = s.execute_action("Mira", cast(&ward), now(), &mut MockRng);

        assert_eq!(result.status_applied, Some(StatusKind::Shielded));
        assert!(has_status(&s.player, StatusKind::Shielded));
        assert!(!has_status(&s.enemy, StatusKind::Shielded));
    }

    #[test]
    fn test_super_effective_message() {
        let mut s = session();
        s.enemy.discipline = Some(Discipline::Hexes);
        let mut bolt = spell("bolt", Some(10));
        bolt.discipline = Some(Discipline::Charms);

        let result = s.execute_action("Mira", cast(&bolt), now(), &mut MockRng);

        assert_eq!(result.effectiveness, Some(EffectivenessTier::Super));
        assert!(result.message.contains("super effective"));
    }

    #[test]
    fn test_flee_chance_example() {
        assert_eq!(flee_chance(60, 40), 70);
        assert_eq!(flee_chance(200, 10), 100);
        assert_eq!(flee_chance(0, 200), 0);
    }

    #[test]
    fn test_successful_flee_ends_battle() {
        let mut s = session();
        s.enemy.stats.speed = 40;
        // 0.69 → 69 < 70
        let mut rng = SequenceRng::new(vec![0.69]);

        let result = s.execute_action("Mira", PreparedAction::Flee, now(), &mut rng);

        assert!(result.success);
        assert_eq!(result.outcome, Some(BattleOutcome::Fled));
        assert_eq!(s.phase, BattlePhase::Fled);
    }

    #[test]
    fn test_failed_flee_keeps_battle_going() {
        let mut s = session();
        s.enemy.stats.speed = 40;
        let mut rng = SequenceRng::new(vec![0.71]);

        let result = s.execute_action("Mira", PreparedAction::Flee, now(), &mut rng);

        assert!(result.success);
        assert!(!result.battle_ended);
        assert_eq!(s.phase, BattlePhase::EnemyTurn);
        assert_eq!(s.uncommitted_log()[0].action, LogAction::Flee);
    }

    #[test]
    fn test_flee_disallowed_against_boss() {
        let mut s = session();
        s.flee_allowed = false;
        let before = s.clone();

        let result = s.execute_action("Mira", PreparedAction::Flee, now(), &mut MockRng);

        assert!(!result.success);
        assert_eq!(s, before);
    }

    #[test]
    fn test_enemy_cannot_flee_or_use_items() {
        let mut s = session();
        assert!(!s.execute_action("Goblin", PreparedAction::Flee, now(), &mut MockRng).success);
        let item = PreparedAction::Item {
            item_id: "potion".to_owned(),
            definition: Some(potion()),
            owned: 1,
        };
        assert!(!s.execute_action("Goblin", item, now(), &mut MockRng).success);
    }

    fn potion() -> ItemDefinition {
        ItemDefinition {
            id: "potion".to_owned(),
            name: "Potion".to_owned(),
            heal_amount: 30,
            cures: vec![StatusKind::Poisoned],
            usable_in_battle: true,
        }
    }

    #[test]
    fn test_item_heals_and_cures_player() {
        let mut s = session();
        s.player.current_health = 50;
        s.player = apply_status(s.player.clone(), StatusKind::Poisoned, 3);
        let item = PreparedAction::Item {
            item_id: "potion".to_owned(),
            definition: Some(potion()),
            owned: 2,
        };

        let result = s.execute_action("Mira", item, now(), &mut MockRng);

        assert!(result.success);
        assert_eq!(result.healing, Some(30));
        assert_eq!(s.player.current_health, 80);
        assert!(!has_status(&s.player, StatusKind::Poisoned));
        assert_eq!(s.phase, BattlePhase::EnemyTurn);
    }

    #[test]
    fn test_item_refusals() {
        let mut s = session();
        let unusable = ItemDefinition {
            usable_in_battle: false,
            ..potion()
        };
        for (definition, owned) in [(None, 1), (Some(unusable), 1), (Some(potion()), 0)] {
            let item = PreparedAction::Item {
                item_id: "potion".to_owned(),
                definition,
                owned,
            };
            assert!(!s.execute_action("Mira", item, now(), &mut MockRng).success);
        }
        assert!(s.uncommitted_log().is_empty());
    }

    #[test]
    fn test_actions_on_finished_battle_are_refused() {
        let mut s = session();
        s.phase = BattlePhase::Victory;
        let result = s.execute_action("Mira", cast(&spell("bolt", Some(1))), now(), &mut MockRng);
        assert!(!result.success);
    }

    #[test]
    fn test_end_turn_ticks_and_returns_to_player_turn() {
        let mut s = session();
        s.phase = BattlePhase::StatusTick;
        s.enemy.max_health = 200;
        s.enemy.current_health = 200;
        s.enemy = apply_status(s.enemy.clone(), StatusKind::Burning, 1);

        let report = s.end_turn(now(), &mut MockRng).unwrap();

        assert_eq!(report.enemy_damage, 12);
        assert_eq!(report.player_damage, 0);
        assert_eq!(
            report.expired,
            vec![ExpiredStatus {
                combatant: "Goblin".to_owned(),
                kind: StatusKind::Burning
            }]
        );
        assert_eq!(report.outcome, None);
        assert_eq!(s.enemy.current_health, 188);
        assert_eq!(s.turn, 2);
        assert_eq!(s.phase, BattlePhase::PlayerTurn);
        assert_eq!(s.uncommitted_log().len(), 2);
    }

    #[test]
    fn test_end_turn_defeat_takes_precedence_over_victory() {
        let mut s = session();
        s.player.current_health = 1;
        s.enemy.current_health = 1;
        s.player = apply_status(s.player.clone(), StatusKind::Poisoned, 3);
        s.enemy = apply_status(s.enemy.clone(), StatusKind::Poisoned, 3);

        let report = s.end_turn(now(), &mut ConstantRng(0.5)).unwrap();

        assert_eq!(report.outcome, Some(BattleOutcome::Defeat));
        assert_eq!(s.phase, BattlePhase::Defeat);
    }

    #[test]
    fn test_end_turn_enemy_falls_to_poison() {
        let mut s = session();
        s.enemy.current_health = 2;
        s.enemy = apply_status(s.enemy.clone(), StatusKind::Poisoned, 3);

        let report = s.end_turn(now(), &mut MockRng).unwrap();

        assert_eq!(report.outcome, Some(BattleOutcome::Victory));
        assert_eq!(s.phase, BattlePhase::Victory);
    }

    #[test]
    fn test_end_turn_on_finished_battle_is_an_error() {
        let mut s = session();
        s.phase = BattlePhase::Fled;
        assert!(matches!(
            s.end_turn(now(), &mut MockRng),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_finalize_requires_matching_terminal_phase_once() {
        let mut s = session();
        assert!(s.finalize(BattleOutcome::Victory, now()).is_err());

        s.phase = BattlePhase::Victory;
        assert!(s.finalize(BattleOutcome::Defeat, now()).is_err());
        assert!(s.finalize(BattleOutcome::Victory, now()).is_ok());
        assert!(s.finalized);
        assert!(s.finalize(BattleOutcome::Victory, now()).is_err());
    }

    #[test]
    fn test_health_stays_within_bounds_across_many_actions() {
        let mut s = session();
        let bolt = spell("bolt", Some(7));
        let mut bite = spell("bite", Some(9));
        bite.cost = Some(0);
        let mut rng = ConstantRng(0.3);

        for _ in 0..6 {
            if s.phase.is_terminal() {
                break;
            }
            s.execute_action("Mira", cast(&bolt), now(), &mut rng);
            s.execute_action("Goblin", cast(&bite), now(), &mut rng);
            assert!(s.player.current_health <= s.player.max_health);
            assert!(s.enemy.current_health <= s.enemy.max_health);
        }
        assert!(s.check_invariants().is_ok());
    }

    #[test]
    fn test_session_round_trips_through_json_without_pending_log() {
        let mut s = session();
        s.execute_action("Mira", cast(&spell("bolt", Some(10))), now(), &mut MockRng);

        let json = serde_json::to_value(&s).unwrap();
        let loaded: BattleSession = serde_json::from_value(json).unwrap();

        assert!(loaded.uncommitted_log().is_empty());
        assert_eq!(loaded.enemy, s.enemy);
        assert_eq!(loaded.phase, s.phase);
    }

    #[test]
    fn test_escape_serializes_as_flee() {
        assert_eq!(serde_json::to_value(BattlePhase::Fled).unwrap(), "flee");
        assert_eq!(serde_json::to_value(BattleOutcome::Fled).unwrap(), "flee");
        let outcome: BattleOutcome = serde_json::from_str("\"flee\"").unwrap();
        assert_eq!(outcome, BattleOutcome::Fled);
    }
}
