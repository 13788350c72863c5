//! Commands accepted by the combat engine.

use spellbound_core::command::Command;
use uuid::Uuid;

use super::session::{BattleAction, BattleOutcome};

/// Command to open a battle for a profile.
#[derive(Debug, Clone)]
pub struct InitializeBattle {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The player profile.
    pub profile_id: Uuid,
    /// Fight this creature; roll a random encounter when `None`.
    pub creature_id: Option<String>,
    /// Location the encounter table is keyed by.
    pub location: String,
}

impl Command for InitializeBattle {
    fn command_type(&self) -> &'static str {
        "combat.initialize_battle"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn battle_id(&self) -> Option<Uuid> {
        None
    }
}

/// Command to resolve one action by a named combatant.
#[derive(Debug, Clone)]
pub struct ExecuteAction {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The battle.
    pub battle_id: Uuid,
    /// Display name of the acting combatant.
    pub actor: String,
    /// What to do.
    pub action: BattleAction,
}

impl Command for ExecuteAction {
    fn command_type(&self) -> &'static str {
        "combat.execute_action"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn battle_id(&self) -> Option<Uuid> {
        Some(self.battle_id)
    }
}

/// Command to let the opponent pick and resolve its action.
#[derive(Debug, Clone)]
pub struct ExecuteAiTurn {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The battle.
    pub battle_id: Uuid,
}

impl Command for ExecuteAiTurn {
    fn command_type(&self) -> &'static str {
        "combat.execute_ai_turn"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn battle_id(&self) -> Option<Uuid> {
        Some(self.battle_id)
    }
}

/// Command to run end-of-turn effects.
#[derive(Debug, Clone)]
pub struct ProcessTurnEnd {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The battle.
    pub battle_id: Uuid,
}

impl Command for ProcessTurnEnd {
    fn command_type(&self) -> &'static str {
        "combat.process_turn_end"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn battle_id(&self) -> Option<Uuid> {
        Some(self.battle_id)
    }
}

/// Command to finalize a finished battle and grant rewards.
#[derive(Debug, Clone)]
pub struct EndBattle {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The battle.
    pub battle_id: Uuid,
    /// The outcome the battle reached.
    pub outcome: BattleOutcome,
}

impl Command for EndBattle {
    fn command_type(&self) -> &'static str {
        "combat.end_battle"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn battle_id(&self) -> Option<Uuid> {
        Some(self.battle_id)
    }
}
