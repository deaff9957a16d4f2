use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CustomerId = Uuid;
pub type ModelId = Uuid;

/// An authenticated admin or user acting on a record. Authentication and
/// permission checks happen upstream; this core trusts the id it is given.
pub type ActorId = Uuid;

/// A wallet owner: exactly one of the platform's two user classes.
/// Customers pay; models get paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Owner {
    Customer(CustomerId),
    Model(ModelId),
}

impl Owner {
    pub fn kind(&self) -> &'static str {
        match self {
            Owner::Customer(_) => "customer",
            Owner::Model(_) => "model",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Owner::Customer(id) | Owner::Model(id) => *id,
        }
    }

    /// Rebuild an owner from its persisted (kind, id) pair.
    pub fn from_kind(kind: &str, id: Uuid) -> Option<Self> {
        match kind {
            "customer" => Some(Owner::Customer(id)),
            "model" => Some(Owner::Model(id)),
            _ => None,
        }
    }

    pub fn is_customer(&self) -> bool {
        matches!(self, Owner::Customer(_))
    }

    pub fn is_model(&self) -> bool {
        matches!(self, Owner::Model(_))
    }
}

impl std::fmt::Display for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_roundtrip() {
        let id = Uuid::new_v4();
        for owner in [Owner::Customer(id), Owner::Model(id)] {
            let rebuilt = Owner::from_kind(owner.kind(), owner.id()).unwrap();
            assert_eq!(owner, rebuilt);
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert_eq!(Owner::from_kind("admin", Uuid::new_v4()), None);
    }

    #[test]
    fn kind_predicates() {
        let id = Uuid::new_v4();
        assert!(Owner::Customer(id).is_customer());
        assert!(!Owner::Customer(id).is_model());
        assert!(Owner::Model(id).is_model());
    }
}
