//! Subjects: the entity types permission rules talk about.

use serde::Serialize;

use inkwell_entity::content::{Comment, Post};
use inkwell_entity::message::Message;
use inkwell_entity::rbac::{PermissionRecord, Role};
use inkwell_entity::user::User;

/// The wildcard subject: a rule on `all` applies to every subject.
pub const ALL_SUBJECTS: &str = "all";

/// A record type that can be the target of an instance-level check.
///
/// Conditions are evaluated against the record's serde form, so field
/// paths follow the serialized names (`author.id`, `receivers.receiver.id`).
pub trait Subject: Serialize {
    const NAME: &'static str;
}

impl Subject for Post {
    const NAME: &'static str = "Post";
}

impl Subject for Comment {
    const NAME: &'static str = "Comment";
}

impl Subject for Message {
    const NAME: &'static str = "Message";
}

impl Subject for Role {
    const NAME: &'static str = "Role";
}

impl Subject for PermissionRecord {
    const NAME: &'static str = "Permission";
}

impl Subject for User {
    const NAME: &'static str = "User";
}

/// Whether a rule written for `rule_subject` covers `requested`.
pub fn subject_matches(rule_subject: &str, requested: &str) -> bool {
    rule_subject == ALL_SUBJECTS || rule_subject == requested
}
