//! Command abstractions.

use uuid::Uuid;

/// Trait that all engine commands implement.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging/routing).
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid;

    /// The battle this command mutates, if it targets an existing one.
    ///
    /// Handlers serialize commands that share a battle identifier.
    fn battle_id(&self) -> Option<Uuid>;
}
