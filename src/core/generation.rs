use derive_deref::Deref;
use serde::Serialize;

/// Monotonically increasing request generation.
///
/// Bumped whenever the criteria change or the session resets. A response
/// tagged with an older generation is stale and must be dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deref, Serialize)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn is_stale(self, current: Generation) -> bool {
        self < current
    }
}
