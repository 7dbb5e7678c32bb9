//! Level types: the modes an operator navigates between.
//!
//! A [`LevelType`] is the static description of a level: its name, its
//! registration table and a constructor for per-visit instances. The instance
//! (anything implementing [`Level`]) carries state that lives while the level
//! is on the navigation stack, e.g. uncommitted configuration changes.

use std::any::Any;
use std::fmt;

use crate::registry::Member;

/// Behavior of an entered level.
///
/// All hooks have permissive defaults, so a stateless level needs nothing
/// beyond `impl Level for MyLevel {}`.
pub trait Level: Any + Send {
    /// Checked on a fresh instance before it is pushed. Returning `false`
    /// refuses the transition.
    fn requires(&self) -> bool {
        true
    }

    /// Called before the level is left via `up` or `quit`. Returning `false`
    /// vetoes leaving. With `no_questions_asked` set the level must not prompt.
    fn end_game(&mut self, no_questions_asked: bool) -> bool {
        let _ = no_questions_asked;
        true
    }

    /// Forces every command run inside this level to wait for its completion
    /// signal, regardless of the command's own `wait` flag.
    fn should_wait(&self) -> bool {
        false
    }
}

/// Static description of a level.
#[derive(Clone, Copy)]
pub struct LevelType {
    /// Declared name of the level, also the key of its help entry.
    pub name: &'static str,
    /// The registration table: commands and sub-levels, in declaration order.
    pub members: fn() -> Vec<Member>,
    /// Creates the instance pushed onto the stack on every visit.
    pub create: fn() -> Box<dyn Level>,
}

impl LevelType {
    pub const fn new(
        name: &'static str,
        members: fn() -> Vec<Member>,
        create: fn() -> Box<dyn Level>,
    ) -> Self {
        Self {
            name,
            members,
            create,
        }
    }

    /// A level without per-visit state.
    pub const fn stateless(name: &'static str, members: fn() -> Vec<Member>) -> Self {
        Self::new(name, members, plain_level)
    }

    pub fn instantiate(&self) -> Box<dyn Level> {
        (self.create)()
    }
}

impl PartialEq for LevelType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for LevelType {}

impl fmt::Debug for LevelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LevelType").field("name", &self.name).finish()
    }
}

impl fmt::Display for LevelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Instance type used by [`LevelType::stateless`].
#[derive(Debug, Default)]
pub struct PlainLevel;

impl Level for PlainLevel {}

fn plain_level() -> Box<dyn Level> {
    Box::new(PlainLevel)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Guarded {
        allowed: bool,
    }

    impl Level for Guarded {
        fn requires(&self) -> bool {
            self.allowed
        }
    }

    fn no_members() -> Vec<Member> {
        Vec::new()
    }

    #[test]
    fn test_stateless_defaults() {
        let level = LevelType::stateless("node", no_members);
        let mut instance = level.instantiate();
        assert!(instance.requires());
        assert!(instance.end_game(false));
        assert!(!instance.should_wait());
    }

    #[test]
    fn test_equality_by_name() {
        let a = LevelType::stateless("node", no_members);
        let b = LevelType::new("node", no_members, || -> Box<dyn Level> {
            Box::new(Guarded { allowed: false })
        });
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "node");
    }

    #[test]
    fn test_custom_instance_hooks() {
        let level = LevelType::new("locked", no_members, || -> Box<dyn Level> {
            Box::new(Guarded { allowed: false })
        });
        assert!(!level.instantiate().requires());
    }
}
