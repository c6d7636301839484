//! Identifier types used across the document pipeline
//!
//! Uuid-backed identifiers are minted by this system; string-backed ones are
//! opaque references handed to us by callers or external collaborators and
//! are never interpreted.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier for a logical document.
///
/// Assigned once at record creation and immutable afterwards. Deduplicated
/// uploads resolve to the identifier of the record that won the race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    /// Mint a new random document identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc-{}", self.0)
    }
}

/// Identifier for a lifecycle event.
///
/// Consumers deduplicate on this, so it must be unique per published event
/// even when the same transition is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Mint a new random event identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event-{}", self.0)
    }
}

macro_rules! opaque_string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from its string form.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the underlying string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_string_id! {
    /// Subject a document belongs to (typically a patient).
    OwnerId
}

opaque_string_id! {
    /// Party that submitted a document (hospital, lab, insurer).
    OriginId
}

opaque_string_id! {
    /// Party whose signature moves a document from pending to signed.
    AttestorId
}

opaque_string_id! {
    /// Party that anchored a document on the external ledger.
    VerifierId
}

opaque_string_id! {
    /// Reference into the external key service. Never key material itself.
    KeyId
}

opaque_string_id! {
    /// Opaque locator for an encrypted blob in the blob store.
    StorageRef
}

opaque_string_id! {
    /// Opaque receipt reference returned by the anchoring ledger.
    AnchorRef
}
