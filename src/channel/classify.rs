//! Turns raw command replies into tagged outcomes.
//!
//! Clusters report "this is already done" as an ordinary failure with a
//! human-readable message. All message matching lives here so the placement
//! components only ever see `Applied | AlreadyApplied | Failed`.

use super::command::{AdminCommand, CommandReply};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Applied(JsonValue),
    AlreadyApplied,
    Failed(String),
}

impl CommandOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

lazy_static! {
    static ref ALREADY_ASSOCIATED: Regex =
        Regex::new(r"(?i)already (in|a member of|associated with) zone|\bduplicate\b").unwrap();
    static ref NOT_ASSOCIATED: Regex =
        Regex::new(r"(?i)not in zone|not associated|no such zone association").unwrap();
    static ref ZONE_NOT_FOUND: Regex = Regex::new(r"(?i)not found|does not exist").unwrap();
    static ref SHARDING_ALREADY_ENABLED: Regex = Regex::new(r"(?i)already enabled").unwrap();
    static ref ALREADY_SHARDED: Regex = Regex::new(r"(?i)already sharded").unwrap();
}

/// The message pattern that marks a failed `command` as a satisfied no-op.
///
/// Commands without a pattern (e.g. `move_primary`) never classify as no-ops.
fn noop_pattern(command: &AdminCommand) -> Option<&'static Regex> {
    match command {
        AdminCommand::AddShardToZone { .. } => Some(&*ALREADY_ASSOCIATED),
        AdminCommand::RemoveShardFromZone { .. } => Some(&*NOT_ASSOCIATED),
        AdminCommand::RemoveZone { .. } => Some(&*ZONE_NOT_FOUND),
        AdminCommand::EnableSharding { .. } => Some(&*SHARDING_ALREADY_ENABLED),
        AdminCommand::ShardCollection { .. } => Some(&*ALREADY_SHARDED),
        _ => None,
    }
}

pub fn classify(command: &AdminCommand, reply: CommandReply) -> CommandOutcome {
    match reply {
        CommandReply::Ok(result) => CommandOutcome::Applied(result),
        CommandReply::Failed(message) => match noop_pattern(command) {
            Some(pattern) if pattern.is_match(&message) => CommandOutcome::AlreadyApplied,
            _ => CommandOutcome::Failed(message),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Namespace;

    fn add() -> AdminCommand {
        AdminCommand::AddShardToZone {
            shard_id: "shard00".into(),
            zone: "region1".into(),
        }
    }

    #[test]
    fn already_associated_is_a_noop() {
        let outcome = classify(
            &add(),
            CommandReply::failed("shard 'shard00' is already in zone 'region1'"),
        );
        assert_eq!(outcome, CommandOutcome::AlreadyApplied);
        let outcome = classify(&add(), CommandReply::failed("Duplicate key error"));
        assert_eq!(outcome, CommandOutcome::AlreadyApplied);
    }

    #[test]
    fn unrelated_already_message_is_a_failure() {
        let message = "ConflictingOperationInProgress: a zone operation is already running";
        let outcome = classify(&add(), CommandReply::failed(message));
        assert!(outcome.is_failure());
    }

    #[test]
    fn other_failures_keep_their_reason() {
        let outcome = classify(&add(), CommandReply::failed("ShardNotFound: shard09"));
        assert_eq!(outcome, CommandOutcome::Failed("ShardNotFound: shard09".into()));
    }

    #[test]
    fn move_primary_failures_are_never_noops() {
        let cmd = AdminCommand::MovePrimary {
            database: "app_region1".into(),
            shard_id: "shard00".into(),
        };
        let outcome = classify(&cmd, CommandReply::failed("it is already the primary"));
        assert!(outcome.is_failure());
    }

    #[test]
    fn patterns_are_scoped_per_command() {
        let shard = AdminCommand::ShardCollection {
            namespace: Namespace::new("db", "orders"),
            key: vec!["tenant_id".into(), "zone_name".into()],
        };
        assert_eq!(
            classify(&shard, CommandReply::failed("collection already sharded")),
            CommandOutcome::AlreadyApplied
        );
        // "not found" only counts as done when removing a zone
        assert!(classify(&shard, CommandReply::failed("database not found")).is_failure());
        assert_eq!(
            classify(
                &AdminCommand::RemoveZone { zone: "region1".into() },
                CommandReply::failed("zone 'region1' not found")
            ),
            CommandOutcome::AlreadyApplied
        );
    }
}
