//! Identity collaborator interface
//!
//! The login flow lives outside the core; whatever handles it supplies
//! `(participant_id, display_name)` pairs through this trait. The core treats
//! the id as an opaque authenticated identity and manages no sessions.

use dashmap::DashMap;
use mural_core::ParticipantId;

/// An authenticated identity as supplied by the collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Opaque participant id
    pub id: ParticipantId,
    /// Human-readable name
    pub display_name: String,
}

impl Identity {
    /// Create an identity
    #[inline]
    pub fn new(id: impl Into<ParticipantId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Resolves opaque participant ids to authenticated identities
pub trait IdentityProvider: Send + Sync {
    /// Resolve an id; `None` means the participant is not logged in
    fn resolve(&self, id: &ParticipantId) -> Option<Identity>;
}

/// In-memory identity provider
///
/// Backs tests and single-process deployments; a production deployment would
/// implement [`IdentityProvider`] over its real session store.
#[derive(Debug, Default)]
pub struct StaticIdentities {
    known: DashMap<ParticipantId, Identity>,
}

impl StaticIdentities {
    /// Create an empty provider
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an identity
    pub fn add(&self, identity: Identity) {
        self.known.insert(identity.id.clone(), identity);
    }

    /// Register an identity, builder style
    #[must_use]
    pub fn with(self, identity: Identity) -> Self {
        self.add(identity);
        self
    }
}

impl IdentityProvider for StaticIdentities {
    fn resolve(&self, id: &ParticipantId) -> Option<Identity> {
        self.known.get(id).map(|i| i.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_identity() {
        let identities =
            StaticIdentities::new().with(Identity::new(ParticipantId::from("p1"), "Pat"));

        let found = identities.resolve(&"p1".into()).unwrap();
        assert_eq!(found.display_name, "Pat");
    }

    #[test]
    fn unknown_identity_is_none() {
        let identities = StaticIdentities::new();
        assert!(identities.resolve(&"ghost".into()).is_none());
    }
}
