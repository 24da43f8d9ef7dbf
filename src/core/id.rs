// Stable identity tokens for modes, states and stats

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident { $($konst:ident = $raw:literal => $label:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            $(pub const $konst: Self = Self($raw);)*

            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u32 {
                self.0
            }

            /// Built-in label, if this is one of the predefined ids
            pub fn builtin_name(self) -> Option<&'static str> {
                match self.0 {
                    $($raw => Some($label),)*
                    _ => None,
                }
            }

            /// All predefined ids with their labels
            pub fn builtins() -> &'static [(&'static str, $name)] {
                &[$(($label, $name::$konst)),*]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.builtin_name() {
                    Some(label) => write!(f, "{}", label),
                    None => write!(f, "{}#{}", stringify!($name), self.0),
                }
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }
    };
}

define_id!(
    /// Identity of a locomotion state kind
    StateId {
        IDLE = 0 => "Idle",
        LOCOMOTION = 1 => "Locomotion",
        JUMP = 2 => "Jump",
        FALL = 3 => "Fall",
        SWIM = 4 => "Swim",
        CLIMB = 5 => "Climb",
        FLY = 6 => "Fly",
    }
);

define_id!(
    /// Identity of a mode (family of abilities)
    ModeId {
        ATTACK1 = 1 => "Attack1",
        ATTACK2 = 2 => "Attack2",
        DAMAGED = 3 => "Damaged",
        ACTION = 4 => "Action",
    }
);

define_id!(
    /// Identity of a stat (health, stamina, ...)
    StatId {
        HEALTH = 1 => "Health",
        STAMINA = 2 => "Stamina",
    }
);

/// First raw value handed out to names that are not built in
const FIRST_CUSTOM_ID: u32 = 100;

/// Interns names to ids so profiles can refer to states and modes by name.
///
/// The same name always resolves to the same id within a registry.
#[derive(Debug, Clone)]
pub struct IdRegistry<I> {
    by_name: HashMap<String, I>,
    next: u32,
}

impl<I> IdRegistry<I>
where
    I: Copy + From<u32>,
{
    /// Empty registry (no built-ins)
    pub fn empty() -> Self {
        Self {
            by_name: HashMap::new(),
            next: FIRST_CUSTOM_ID,
        }
    }

    /// Registry seeded with the given builtins
    pub fn with_builtins(builtins: &[(&'static str, I)]) -> Self {
        let mut registry = Self::empty();
        for (name, id) in builtins {
            registry.by_name.insert(normalize(name), *id);
        }
        registry
    }

    /// Resolve or create the id for a name
    pub fn intern(&mut self, name: &str) -> I {
        let key = normalize(name);
        if let Some(id) = self.by_name.get(&key) {
            return *id;
        }
        let id = I::from(self.next);
        self.next += 1;
        self.by_name.insert(key, id);
        id
    }

    /// Resolve a name without creating it
    pub fn get(&self, name: &str) -> Option<I> {
        self.by_name.get(&normalize(name)).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl IdRegistry<StateId> {
    pub fn states() -> Self {
        Self::with_builtins(StateId::builtins())
    }
}

impl IdRegistry<ModeId> {
    pub fn modes() -> Self {
        Self::with_builtins(ModeId::builtins())
    }
}

impl IdRegistry<StatId> {
    pub fn stats() -> Self {
        Self::with_builtins(StatId::builtins())
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_equality() {
        assert_eq!(StateId::new(3), StateId::FALL);
        assert_ne!(StateId::FALL, StateId::FLY);
    }

    #[test]
    fn test_display_uses_builtin_label() {
        assert_eq!(StateId::FLY.to_string(), "Fly");
        assert_eq!(ModeId::new(77).to_string(), "ModeId#77");
    }

    #[test]
    fn test_registry_resolves_builtins_case_insensitively() {
        let registry = IdRegistry::states();
        assert_eq!(registry.get("fall"), Some(StateId::FALL));
        assert_eq!(registry.get(" Fly "), Some(StateId::FLY));
        assert_eq!(registry.get("Glide"), None);
    }

    #[test]
    fn test_registry_interns_custom_names_once() {
        let mut registry = IdRegistry::modes();
        let sit = registry.intern("Sit");
        let again = registry.intern("SIT");
        let other = registry.intern("Eat");

        assert_eq!(sit, again);
        assert_ne!(sit, other);
        assert_eq!(sit.raw(), FIRST_CUSTOM_ID);
        assert_eq!(registry.intern("Attack1"), ModeId::ATTACK1);
    }
}
