//! Typed rule conditions.
//!
//! A conditional rule carries a list of predicates that must all hold for
//! a record to match. Field paths are checked when the rule is declared,
//! so a typo fails at boot instead of silently never matching.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;

use inkwell_core::error::AppError;
use inkwell_core::result::AppResult;

use super::actor::Actor;

/// A dotted path into a record's serialized form, e.g. `sender.id`.
///
/// Grammar: one or more `.`-separated segments, each a non-empty run of
/// `[A-Za-z0-9_]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(raw: &str) -> AppResult<Self> {
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        let valid = segments.iter().all(|s| {
            !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
        if !valid {
            return Err(AppError::configuration(format!(
                "Invalid condition field path: '{raw}'"
            )));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_nested(&self) -> bool {
        self.segments.len() > 1
    }

    /// Every value reachable through this path. Arrays met on the way
    /// fan out, so `receivers.receiver.id` yields one id per receiver.
    pub fn resolve<'a>(&self, record: &'a Value) -> Vec<&'a Value> {
        let mut found = Vec::new();
        collect(record, &self.segments, &mut found);
        found
    }
}

fn collect<'a>(value: &'a Value, segments: &[String], found: &mut Vec<&'a Value>) {
    match (value, segments.split_first()) {
        (Value::Array(items), _) => {
            for item in items {
                collect(item, segments, found);
            }
        }
        (_, None) => found.push(value),
        (Value::Object(map), Some((head, rest))) => {
            if let Some(next) = map.get(head) {
                collect(next, rest, found);
            }
        }
        _ => {}
    }
}

impl FromStr for FieldPath {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// The right-hand side of an equality predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// The acting user's id, bound when the ability is compiled.
    ActorId,
    Literal(Value),
}

impl Operand {
    fn bind(&self, actor: Option<&Actor>) -> Option<Value> {
        match self {
            Self::ActorId => actor.map(|a| Value::String(a.id.to_string())),
            Self::Literal(value) => Some(value.clone()),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActorId => f.write_str("$actor.id"),
            Self::Literal(value) => write!(f, "{value}"),
        }
    }
}

type CustomFn = dyn Fn(&Actor, &Value) -> bool + Send + Sync;

/// A named escape hatch for conditions equality cannot express.
#[derive(Clone)]
pub struct CustomPredicate {
    name: String,
    check: Arc<CustomFn>,
}

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomPredicate").field("name", &self.name).finish()
    }
}

/// One clause of a rule condition.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// A top-level field equals the operand.
    FieldEq { field: FieldPath, operand: Operand },
    /// A field reached through relations equals the operand.
    RelationEq { path: FieldPath, operand: Operand },
    Custom(CustomPredicate),
}

impl Predicate {
    pub fn field_eq(field: &str, operand: Operand) -> AppResult<Self> {
        let field = FieldPath::parse(field)?;
        if field.is_nested() {
            return Err(AppError::configuration(format!(
                "'{field}' is a relation path, use a relation predicate"
            )));
        }
        Ok(Self::FieldEq { field, operand })
    }

    pub fn relation_eq(path: &str, operand: Operand) -> AppResult<Self> {
        let path = FieldPath::parse(path)?;
        if !path.is_nested() {
            return Err(AppError::configuration(format!(
                "'{path}' has no relation segment, use a field predicate"
            )));
        }
        Ok(Self::RelationEq { path, operand })
    }

    pub fn custom(
        name: impl Into<String>,
        check: impl Fn(&Actor, &Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::Custom(CustomPredicate {
            name: name.into(),
            check: Arc::new(check),
        })
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::FieldEq { field: a, operand: x },
                Self::FieldEq { field: b, operand: y },
            ) => a == b && x == y,
            (
                Self::RelationEq { path: a, operand: x },
                Self::RelationEq { path: b, operand: y },
            ) => a == b && x == y,
            (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(&a.check, &b.check),
            _ => false,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldEq { field, operand } => write!(f, "{field} = {operand}"),
            Self::RelationEq { path, operand } => write!(f, "{path} = {operand}"),
            Self::Custom(custom) => write!(f, "custom({})", custom.name),
        }
    }
}

/// Predicates that must all hold.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Conditions(Vec<Predicate>);

impl Conditions {
    pub fn new(predicates: Vec<Predicate>) -> Self {
        Self(predicates)
    }

    /// Shorthand for the common "record belongs to me" condition.
    pub fn owned_via(path: &str) -> AppResult<Self> {
        let predicate = if path.contains('.') {
            Predicate::relation_eq(path, Operand::ActorId)?
        } else {
            Predicate::field_eq(path, Operand::ActorId)?
        };
        Ok(Self(vec![predicate]))
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fix actor-dependent operands for one actor.
    pub(crate) fn bind(&self, actor: Option<&Arc<Actor>>) -> BoundConditions {
        let clauses = self
            .0
            .iter()
            .map(|predicate| match predicate {
                Predicate::FieldEq { field: path, operand }
                | Predicate::RelationEq { path, operand } => {
                    match operand.bind(actor.map(|a| &**a)) {
                        Some(expected) => BoundClause::Equals {
                            path: path.clone(),
                            expected,
                        },
                        None => BoundClause::Never,
                    }
                }
                Predicate::Custom(custom) => match actor {
                    Some(actor) => BoundClause::Custom {
                        check: Arc::clone(&custom.check),
                        actor: Arc::clone(actor),
                    },
                    None => BoundClause::Never,
                },
            })
            .collect();
        BoundConditions(clauses)
    }
}

impl fmt::Display for Conditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(" && "))
    }
}

/// Conditions with operands resolved for one actor.
#[derive(Clone)]
pub(crate) struct BoundConditions(Vec<BoundClause>);

#[derive(Clone)]
enum BoundClause {
    Equals { path: FieldPath, expected: Value },
    Custom { check: Arc<CustomFn>, actor: Arc<Actor> },
    /// Actor-dependent clause compiled for a guest.
    Never,
}

impl fmt::Debug for BoundConditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoundConditions({} clauses)", self.0.len())
    }
}

impl BoundConditions {
    pub(crate) fn matches(&self, record: &Value) -> bool {
        self.0.iter().all(|clause| match clause {
            BoundClause::Equals { path, expected } => {
                path.resolve(record).into_iter().any(|v| v == expected)
            }
            BoundClause::Custom { check, actor } => check(actor, record),
            BoundClause::Never => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn actor(id: Uuid) -> Arc<Actor> {
        Arc::new(Actor {
            id,
            username: "u".into(),
            roles: vec![],
            permissions: vec![],
        })
    }

    #[test]
    fn test_field_path_grammar() {
        assert!(FieldPath::parse("sender.id").is_ok());
        assert!(FieldPath::parse("author_id").is_ok());
        assert!(FieldPath::parse("").is_err());
        assert!(FieldPath::parse("a..b").is_err());
        assert!(FieldPath::parse("a.b-c").is_err());
        assert!(FieldPath::parse(".id").is_err());
    }

    #[test]
    fn test_resolve_fans_out_over_arrays() {
        let record = json!({
            "receivers": [
                { "receiver": { "id": "a" } },
                { "receiver": { "id": "b" } }
            ]
        });
        let path = FieldPath::parse("receivers.receiver.id").unwrap();
        assert_eq!(path.resolve(&record), vec![&json!("a"), &json!("b")]);
        assert!(FieldPath::parse("receivers.missing").unwrap().resolve(&record).is_empty());
    }

    #[test]
    fn test_predicate_constructors_check_shape() {
        assert!(Predicate::field_eq("author.id", Operand::ActorId).is_err());
        assert!(Predicate::relation_eq("id", Operand::ActorId).is_err());
        assert!(Predicate::relation_eq("author.id", Operand::ActorId).is_ok());
    }

    #[test]
    fn test_bound_conditions_match_actor() {
        let me = Uuid::new_v4();
        let conditions = Conditions::owned_via("author.id").unwrap();
        let bound = conditions.bind(Some(&actor(me)));
        assert!(bound.matches(&json!({ "author": { "id": me.to_string() } })));
        assert!(!bound.matches(&json!({ "author": { "id": Uuid::new_v4().to_string() } })));
        assert!(!bound.matches(&json!({})));
    }

    #[test]
    fn test_guest_never_matches_actor_conditions() {
        let bound = Conditions::owned_via("user.id").unwrap().bind(None);
        assert!(!bound.matches(&json!({ "user": { "id": "x" } })));
    }

    #[test]
    fn test_all_predicates_must_hold() {
        let me = Uuid::new_v4();
        let conditions = Conditions::new(vec![
            Predicate::relation_eq("sender.id", Operand::ActorId).unwrap(),
            Predicate::field_eq("kind", Operand::Literal(json!("notice"))).unwrap(),
            Predicate::custom("has-body", |_, record| record["body"].is_string()),
        ]);
        let bound = conditions.bind(Some(&actor(me)));
        let mut record = json!({ "sender": { "id": me.to_string() }, "kind": "notice", "body": "hi" });
        assert!(bound.matches(&record));
        record["kind"] = json!("chat");
        assert!(!bound.matches(&record));
    }

    #[test]
    fn test_display() {
        let conditions = Conditions::owned_via("sender.id").unwrap();
        assert_eq!(conditions.to_string(), "sender.id = $actor.id");
    }
}
