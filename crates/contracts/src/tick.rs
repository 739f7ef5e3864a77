//! Tick - simulator frame identifier

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one fixed simulation step.
///
/// Produced by the simulator every time simulated time advances; strictly
/// increasing for the lifetime of a world. Records belonging to the same
/// simulated instant carry the same `Tick`.
///
/// # Examples
/// ```
/// use contracts::Tick;
///
/// let tick = Tick::new(41);
/// assert_eq!(tick.next(), Tick::new(42));
/// assert!(tick < tick.next());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tick(u64);

impl Tick {
    #[inline]
    pub const fn new(frame: u64) -> Self {
        Self(frame)
    }

    /// Raw frame number as reported by the simulator.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl From<u64> for Tick {
    #[inline]
    fn from(frame: u64) -> Self {
        Self(frame)
    }
}

impl From<Tick> for u64 {
    #[inline]
    fn from(tick: Tick) -> Self {
        tick.0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_follows_frame_number() {
        let ticks: Vec<Tick> = [3u64, 1, 2].into_iter().map(Tick::from).collect();
        let mut sorted = ticks.clone();
        sorted.sort();
        assert_eq!(sorted, vec![Tick::new(1), Tick::new(2), Tick::new(3)]);
    }

    #[test]
    fn test_serde_is_transparent() {
        let json = serde_json::to_string(&Tick::new(7)).unwrap();
        assert_eq!(json, "7");
        let parsed: Tick = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Tick::new(7));
    }

    #[test]
    fn test_display() {
        assert_eq!(Tick::new(12).to_string(), "#12");
    }
}
