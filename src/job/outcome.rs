use std::fmt;
use std::ops::BitOr;

/// What a single file action did to the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Effect {
    Skipped,
    Updated,
    Deleted,
    Created,
}

impl Effect {
    pub const ALL: [Effect; 4] = [
        Effect::Skipped,
        Effect::Updated,
        Effect::Deleted,
        Effect::Created,
    ];

    fn bit(self) -> u8 {
        1 << (self as u8)
    }

    pub fn label(self) -> &'static str {
        match self {
            Effect::Skipped => "Skipped",
            Effect::Updated => "Updated",
            Effect::Deleted => "Deleted",
            Effect::Created => "Created",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Set of [`Effect`]s accumulated over one repository run.
///
/// A run may both update and create files, so effects combine freely.
/// Only `Skipped` on its own never counts as a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Outcome(u8);

impl Outcome {
    pub const fn empty() -> Self {
        Outcome(0)
    }

    pub fn insert(&mut self, effect: Effect) {
        self.0 |= effect.bit();
    }

    pub fn remove(&mut self, effect: Effect) {
        self.0 &= !effect.bit();
    }

    pub fn merge(&mut self, other: Outcome) {
        self.0 |= other.0;
    }

    pub fn contains(&self, effect: Effect) -> bool {
        self.0 & effect.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True when anything besides `Skipped` happened.
    pub fn changed(&self) -> bool {
        [Effect::Updated, Effect::Deleted, Effect::Created]
            .into_iter()
            .any(|e| self.contains(e))
    }

    pub fn iter(&self) -> impl Iterator<Item = Effect> + use<> {
        let set = *self;
        Effect::ALL.into_iter().filter(move |e| set.contains(*e))
    }
}

impl From<Effect> for Outcome {
    fn from(effect: Effect) -> Self {
        let mut o = Outcome::empty();
        o.insert(effect);
        o
    }
}

impl FromIterator<Effect> for Outcome {
    fn from_iter<I: IntoIterator<Item = Effect>>(iter: I) -> Self {
        let mut o = Outcome::empty();
        for e in iter {
            o.insert(e);
        }
        o
    }
}

impl BitOr for Outcome {
    type Output = Outcome;

    fn bitor(mut self, rhs: Outcome) -> Outcome {
        self.merge(rhs);
        self
    }
}

impl BitOr<Effect> for Outcome {
    type Output = Outcome;

    fn bitor(mut self, rhs: Effect) -> Outcome {
        self.insert(rhs);
        self
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("No action");
        }
        let labels: Vec<&str> = self.iter().map(Effect::label).collect();
        f.write_str(&labels.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// All 16 combinations of the four effects.
    fn every_outcome() -> Vec<Outcome> {
        (0u8..16)
            .map(|mask| {
                Effect::ALL
                    .into_iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(_, e)| e)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn changed_iff_any_real_effect_is_present() {
        for o in every_outcome() {
            let expected = o.contains(Effect::Updated)
                || o.contains(Effect::Deleted)
                || o.contains(Effect::Created);
            assert_eq!(o.changed(), expected, "outcome {}", o);
        }
    }

    #[test]
    fn skipped_alone_is_not_a_change() {
        assert!(!Outcome::from(Effect::Skipped).changed());
        assert!(!Outcome::empty().changed());
        assert!((Outcome::from(Effect::Skipped) | Effect::Created).changed());
    }

    #[test]
    fn insert_then_remove_restores_previous_value() {
        for base in every_outcome() {
            for e in Effect::ALL {
                if base.contains(e) {
                    continue;
                }
                let mut o = base;
                o.insert(e);
                o.remove(e);
                assert_eq!(o, base);
            }
        }
    }

    #[test]
    fn merge_is_a_union() {
        let mut o = Outcome::from(Effect::Updated);
        o.merge(Effect::Created.into());
        assert!(o.contains(Effect::Updated));
        assert!(o.contains(Effect::Created));
        assert!(!o.contains(Effect::Deleted));
    }

    #[test]
    fn display_lists_effects_in_declaration_order() {
        let o: Outcome = [Effect::Created, Effect::Skipped, Effect::Deleted]
            .into_iter()
            .collect();
        assert_eq!(o.to_string(), "Skipped|Deleted|Created");
        assert_eq!(Outcome::empty().to_string(), "No action");
    }
}
