//! Stable group identities.
//!
//! Every container in a compiled hierarchy (SuperTrack, Composite, Overlay) is
//! identified by a [`GroupKey`], a digest of the ordered tuple of column values
//! that defines the group. The encoding is explicit and versioned, so that the
//! same tuple gets the same key across runs, across machines, and across a
//! sidecar round trip:
//!
//!  1. The tuple is written as a canonical JSON array, in the declared column
//!     order, with `null` for missing values, e.g. `["ATAC",null,"bigWig"]`.
//!  2. The SHA-256 digest of [`KEY_ENCODING`] followed by a NUL byte and the
//!     JSON bytes is computed.
//!  3. The key is the lowercase hex digest.
//!
//! Nothing here rejects a tuple; a tuple of all `null`s still has a key.
//! Callers decide whether nulls are eligible to form a group.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// The version tag mixed into every digest. Changing the encoding requires
/// bumping this, which changes every key.
pub const KEY_ENCODING: &str = "tracknado-group-key-v1";

/// A stable identifier for a group, computed from a tuple of column values.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(String);

impl GroupKey {
    /// Compute the key of an ordered tuple of (possibly missing) values.
    pub fn of<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let tuple: Vec<Option<&str>> = values.into_iter().collect();
        // a Vec of Option<&str> always serializes
        let encoded = serde_json::to_vec(&tuple).unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(KEY_ENCODING.as_bytes());
        hasher.update([0u8]);
        hasher.update(&encoded);
        GroupKey(format!("{:x}", hasher.finalize()))
    }

    /// Compute the key of a tuple with no missing values.
    pub fn of_values<S: AsRef<str>>(values: &[S]) -> Self {
        Self::of(values.iter().map(|v| Some(v.as_ref())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
