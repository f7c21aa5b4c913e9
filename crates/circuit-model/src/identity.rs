//! The three identity classes the synchronizer matches on, kept as distinct
//! newtypes so a call site cannot silently pass a reference where a uuid
//! was meant — conflating them is, per the design notes, the easiest bug to
//! introduce in a system shaped like this one.

use sha2::{Digest, Sha256};
use std::fmt;

/// Stable identity: minted once when an entity is created, never reused,
/// carried forward across every subsequent load/sync cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uuid(String);

impl Uuid {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// User identity: the human-readable designator (`R1`, `U7`). Editable in
/// KiCad, globally unique within a project, not stable across edits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference(String);

impl Reference {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The alphabetic prefix of a reference, e.g. `"R"` from `"R12"`.
    pub fn prefix(&self) -> &str {
        self.0.trim_end_matches(|c: char| c.is_ascii_digit())
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structural identity: a deterministic hash over `(lib_id, value, sorted
/// pin-to-net incidences)`, used as the tertiary match key for components
/// with no uuid yet whose reference is absent or conflicting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub fn compute<'a>(
        lib_id: &str,
        value: &str,
        pin_net_incidences: impl Iterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let mut incidences: Vec<(&str, &str)> = pin_net_incidences.collect();
        incidences.sort_unstable();

        let mut hasher = Sha256::new();
        hasher.update(lib_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(value.as_bytes());
        for (pin, net) in incidences {
            hasher.update([0u8]);
            hasher.update(pin.as_bytes());
            hasher.update([1u8]);
            hasher.update(net.as_bytes());
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        Self(u64::from_le_bytes(bytes))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
