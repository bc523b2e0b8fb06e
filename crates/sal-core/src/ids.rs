use core::fmt;
use core::num::NonZeroU32;

/// Number under which the solver persists a solution or phase assemblage
/// (`SAVE SOLUTION <tag>` / `USE SOLUTION <tag>`).
///
/// Tags are 1-based in the solver input language, so `NonZeroU32` fits and
/// lets `Option<Tag>` stay the size of a `u32`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tag(NonZeroU32);

impl Tag {
    /// Create a tag from its solver number; `None` for 0.
    pub fn new(number: u32) -> Option<Self> {
        NonZeroU32::new(number).map(Self)
    }

    /// Solver number of this tag.
    pub fn number(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self.number())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Tag of a saved SOLUTION.
pub type SolutionTag = Tag;
/// Tag of a saved EQUILIBRIUM_PHASES assemblage.
pub type PhaseTag = Tag;

/// Solution number holding the untouched feed brine.
pub const BRINE_SOLUTION: u32 = 1;

/// Tags written by the charge stage of cascade step `k` (1-based):
/// solution `k + 1`, phase assemblage `k`.
///
/// The solution tag equals the number of the receiving pond it feeds.
pub fn charge_tags(k: u32) -> Option<(SolutionTag, PhaseTag)> {
    Some((Tag::new(k.checked_add(1)?)?, Tag::new(k)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_not_a_tag() {
        assert!(Tag::new(0).is_none());
        assert_eq!(Tag::new(7).map(Tag::number), Some(7));
    }

    #[test]
    fn option_tag_is_small() {
        assert_eq!(
            core::mem::size_of::<Tag>(),
            core::mem::size_of::<Option<Tag>>()
        );
    }

    #[test]
    fn charge_tags_follow_pond_numbering() {
        let numbers: Vec<(u32, u32)> = (1..=5)
            .filter_map(charge_tags)
            .map(|(s, p)| (s.number(), p.number()))
            .collect();
        assert_eq!(numbers, vec![(2, 1), (3, 2), (4, 3), (5, 4), (6, 5)]);
        assert!(charge_tags(0).is_none());
    }
}
