//! Version tokens for optimistic concurrency.

use serde::{Deserialize, Serialize};

/// Row version of a mutable entity.
///
/// Incremented by the store on every successful update. Callers treat it as
/// opaque and only compare it for equality.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Version assigned to freshly provisioned rows.
    pub const INITIAL: Version = Version(1);

    pub fn new(v: u64) -> Self {
        Self(v)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl core::fmt::Display for Version {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "v{}", self.0)
    }
}
