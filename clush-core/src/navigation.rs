//! The level stack: where the operator currently is.
//!
//! The stack always holds the root frame; sub-levels are pushed on top of it.
//! It is mutated only through [`LevelStack::enter`], [`LevelStack::up`] and
//! [`LevelStack::jump_path`], and every successful transition is saved to the
//! configured [`StackStore`].

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::NavigationError;
use crate::level::{Level, LevelType};
use crate::persistence::StackStore;
use crate::registry::Registry;

/// One entered level.
pub struct Frame {
    level: LevelType,
    instance: Box<dyn Level>,
    registry: Arc<Registry>,
    entered_as: String,
}

impl Frame {
    fn new(
        level: LevelType,
        instance: Box<dyn Level>,
        registry: Arc<Registry>,
        entered_as: String,
    ) -> Self {
        Self {
            level,
            instance,
            registry,
            entered_as,
        }
    }

    pub fn level_type(&self) -> LevelType {
        self.level
    }

    /// Declared name of the level type.
    pub fn name(&self) -> &'static str {
        self.level.name
    }

    /// The name or alias the operator used to get here.
    pub fn entered_as(&self) -> &str {
        &self.entered_as
    }

    pub fn instance(&self) -> &dyn Level {
        self.instance.as_ref()
    }

    pub fn instance_mut(&mut self) -> &mut dyn Level {
        self.instance.as_mut()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("level", &self.level.name)
            .field("entered_as", &self.entered_as)
            .finish()
    }
}

/// Non-empty stack of entered levels.
pub struct LevelStack {
    root: Frame,
    above: Vec<Frame>,
    store: Box<dyn StackStore>,
}

impl LevelStack {
    pub fn new(root: LevelType, registry: Arc<Registry>, store: Box<dyn StackStore>) -> Self {
        let instance = root.instantiate();
        Self {
            root: Frame::new(root, instance, registry, root.name.to_string()),
            above: Vec::new(),
            store,
        }
    }

    pub fn current(&self) -> &Frame {
        self.above.last().unwrap_or(&self.root)
    }

    pub fn current_mut(&mut self) -> &mut Frame {
        self.above.last_mut().unwrap_or(&mut self.root)
    }

    /// The frame directly below the current one; `None` at the root.
    pub fn previous(&self) -> Option<&Frame> {
        match self.above.len() {
            0 => None,
            1 => Some(&self.root),
            n => self.above.get(n - 2),
        }
    }

    /// Number of frames, counting the root.
    pub fn depth(&self) -> usize {
        self.above.len() + 1
    }

    pub fn at_root(&self) -> bool {
        self.above.is_empty()
    }

    /// Frames from the root up to the current level.
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        std::iter::once(&self.root).chain(self.above.iter())
    }

    pub fn level_name(&self) -> &'static str {
        self.current().name()
    }

    /// Names used to enter each level above the root.
    pub fn path(&self) -> Vec<String> {
        self.above.iter().map(|f| f.entered_as.clone()).collect()
    }

    /// Push a fresh instance of `level`, unless its `requires` check fails.
    pub fn enter(
        &mut self,
        level: LevelType,
        registry: Arc<Registry>,
        entered_as: impl Into<String>,
    ) -> Result<(), NavigationError> {
        let instance = level.instantiate();
        if !instance.requires() {
            debug!(level = level.name, "Level requirements not met");
            return Err(NavigationError::RequirementsNotMet {
                level: level.name.to_string(),
            });
        }
        let entered_as = entered_as.into();
        debug!(level = level.name, entered_as = %entered_as, depth = self.depth() + 1, "Entering level");
        self.above
            .push(Frame::new(level, instance, registry, entered_as));
        self.save();
        Ok(())
    }

    /// Leave the current level, giving it a chance to veto.
    pub fn up(&mut self) -> Result<(), NavigationError> {
        self.up_with(false)
    }

    /// Like [`up`](Self::up), but with `no_questions_asked` set the level
    /// must decide without prompting the operator.
    pub fn up_with(&mut self, no_questions_asked: bool) -> Result<(), NavigationError> {
        let Some(top) = self.above.last_mut() else {
            return Err(NavigationError::AtRoot);
        };
        if !top.instance.end_game(no_questions_asked) {
            debug!(level = top.name(), "Leaving level vetoed");
            return Err(NavigationError::Vetoed {
                level: top.name().to_string(),
            });
        }
        if let Some(frame) = self.above.pop() {
            debug!(level = frame.name(), depth = self.depth(), "Left level");
        }
        self.save();
        Ok(())
    }

    /// Walk a `/` separated path: `..` goes up, empty segments and `.` stay,
    /// anything else is resolved among the current level's children and must
    /// name a sub-level. Processing stops at the first failing segment and the
    /// transitions already made stay applied.
    pub fn jump_path(&mut self, path: &str) -> Result<(), NavigationError> {
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => self.up()?,
                name => {
                    let registry = Arc::clone(&self.current().registry);
                    let target = registry.resolve(name).and_then(|(key, descriptor)| {
                        let level = descriptor.level_type()?;
                        let children = Arc::clone(descriptor.children()?);
                        Some((key.to_string(), level, children))
                    });
                    let Some((key, level, children)) = target else {
                        return Err(NavigationError::NotFound {
                            name: name.to_string(),
                            level: self.level_name().to_string(),
                        });
                    };
                    self.enter(level, children, key)?;
                }
            }
        }
        Ok(())
    }

    /// Ask every level, top first, whether the session may end. The first
    /// veto stops the walk.
    pub fn end_game_all(&mut self, no_questions_asked: bool) -> bool {
        self.above
            .iter_mut()
            .rev()
            .chain(std::iter::once(&mut self.root))
            .all(|frame| frame.instance.end_game(no_questions_asked))
    }

    /// Persist the current path. Failures are logged, never propagated.
    pub fn save(&mut self) {
        let path = self.path();
        if let Err(e) = self.store.save(&path) {
            warn!(error = %e, "Failed to save level stack");
        }
    }

    /// The path saved by a previous session.
    pub fn saved_path(&self) -> Option<Vec<String>> {
        match self.store.load() {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "Failed to load saved level stack");
                None
            }
        }
    }
}

impl fmt::Debug for LevelStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.frames()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::descriptor::Outcome;
    use crate::error::Result;
    use crate::persistence::MemoryStackStore;
    use crate::registry::{LevelRegistrar, Member};
    use std::sync::atomic::{AtomicBool, Ordering};

    static ALLOW_LEAVE: AtomicBool = AtomicBool::new(true);

    struct Sticky;

    impl Level for Sticky {
        fn end_game(&mut self, _no_questions_asked: bool) -> bool {
            ALLOW_LEAVE.load(Ordering::SeqCst)
        }
    }

    struct Locked;

    impl Level for Locked {
        fn requires(&self) -> bool {
            false
        }
    }

    fn noop(_: &mut Context, _: &[String]) -> Result<Outcome> {
        Ok(Outcome::success())
    }

    fn root_members() -> Vec<Member> {
        vec![
            Member::level("do_resource", RESOURCE),
            Member::level("do_configure", CONFIGURE),
            Member::level("do_vault", VAULT),
            Member::command("do_status", noop),
        ]
    }

    fn resource_members() -> Vec<Member> {
        vec![Member::command("do_start", noop)]
    }

    fn configure_members() -> Vec<Member> {
        vec![Member::level("do_ra", RA)]
    }

    const ROOT: LevelType = LevelType::stateless("root", root_members);
    const RESOURCE: LevelType = LevelType::stateless("resource", resource_members);
    const CONFIGURE: LevelType = LevelType::stateless("configure", configure_members);
    const RA: LevelType = LevelType::stateless("ra", Vec::new);
    const VAULT: LevelType = LevelType::new("vault", Vec::new, locked);
    const STICKY: LevelType = LevelType::new("sticky", Vec::new, sticky);

    fn locked() -> Box<dyn Level> {
        Box::new(Locked)
    }

    fn sticky() -> Box<dyn Level> {
        Box::new(Sticky)
    }

    fn stack() -> (LevelStack, MemoryStackStore) {
        let mut registrar = LevelRegistrar::bare();
        let registry = registrar.build(ROOT).unwrap();
        let store = MemoryStackStore::new();
        (
            LevelStack::new(ROOT, registry, Box::new(store.clone())),
            store,
        )
    }

    #[test]
    fn test_starts_at_root() {
        let (stack, _) = stack();
        assert_eq!(stack.level_name(), "root");
        assert_eq!(stack.depth(), 1);
        assert!(stack.previous().is_none());
        assert!(stack.path().is_empty());
    }

    #[test]
    fn test_up_at_root_fails_and_keeps_stack() {
        let (mut stack, store) = stack();
        assert!(matches!(stack.up(), Err(NavigationError::AtRoot)));
        assert_eq!(stack.depth(), 1);
        assert!(store.saved().is_none());
    }

    #[test]
    fn test_jump_path_enters_and_saves() {
        let (mut stack, store) = stack();
        stack.jump_path("configure/ra").unwrap();
        assert_eq!(stack.level_name(), "ra");
        assert_eq!(stack.previous().unwrap().name(), "configure");
        assert_eq!(store.saved(), Some(vec!["configure".to_string(), "ra".to_string()]));
    }

    #[test]
    fn test_jump_path_relative() {
        let (mut stack, _) = stack();
        stack.jump_path("resource").unwrap();
        stack.jump_path("../configure").unwrap();
        assert_eq!(stack.level_name(), "configure");
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn test_jump_path_partial_failure_stays_where_it_stopped() {
        let (mut stack, _) = stack();
        stack.jump_path("resource").unwrap();
        let err = stack.jump_path("../missing").unwrap_err();
        assert_eq!(err.to_string(), "missing not found in root");
        assert_eq!(stack.level_name(), "root");
    }

    #[test]
    fn test_jump_path_rejects_commands() {
        let (mut stack, _) = stack();
        assert!(matches!(
            stack.jump_path("status"),
            Err(NavigationError::NotFound { .. })
        ));
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_jump_path_noop_segments() {
        let (mut stack, _) = stack();
        stack.jump_path("").unwrap();
        stack.jump_path(".").unwrap();
        stack.jump_path("./res/.").unwrap();
        assert_eq!(stack.level_name(), "resource");
        assert_eq!(stack.current().entered_as(), "resource");
    }

    #[test]
    fn test_requirements_refuse_entry() {
        let (mut stack, _) = stack();
        assert!(matches!(
            stack.jump_path("vault"),
            Err(NavigationError::RequirementsNotMet { .. })
        ));
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_end_game_veto_blocks_up() {
        let (mut stack, _) = stack();
        let registry = LevelRegistrar::bare().build(STICKY).unwrap();
        stack.enter(STICKY, registry, "sticky").unwrap();

        ALLOW_LEAVE.store(false, Ordering::SeqCst);
        assert!(matches!(stack.up(), Err(NavigationError::Vetoed { .. })));
        assert!(!stack.end_game_all(true));
        assert_eq!(stack.level_name(), "sticky");

        ALLOW_LEAVE.store(true, Ordering::SeqCst);
        stack.up().unwrap();
        assert_eq!(stack.level_name(), "root");
    }

    #[test]
    fn test_up_with_passes_no_questions_flag() {
        struct AsksFirst;
        impl Level for AsksFirst {
            fn end_game(&mut self, no_questions_asked: bool) -> bool {
                no_questions_asked
            }
        }
        fn asks_first() -> Box<dyn Level> {
            Box::new(AsksFirst)
        }
        const ASKS_FIRST: LevelType = LevelType::new("asks-first", Vec::new, asks_first);

        let (mut stack, _) = stack();
        let registry = LevelRegistrar::bare().build(ASKS_FIRST).unwrap();
        stack.enter(ASKS_FIRST, registry, "asks-first").unwrap();
        assert!(matches!(stack.up(), Err(NavigationError::Vetoed { .. })));
        stack.up_with(true).unwrap();
        assert_eq!(stack.level_name(), "root");
    }
}
