//! The session context handed to every command handler.
//!
//! Owns the level stack, the registrar (and with it the help index), the
//! operator's skill level and the output sink. Handlers reach the state of
//! the level they run in through [`Context::current_level_mut`].

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::config::ShellConfig;
use crate::error::{CommandError, NavigationError, RegistrationError, Result, ShellError};
use crate::help::HelpIndex;
use crate::level::{Level, LevelType};
use crate::navigation::{Frame, LevelStack};
use crate::persistence::{MemoryStackStore, StackStore};
use crate::registry::{LevelRegistrar, Registry};
use crate::skill::SkillLevel;

/// Fixed-width column layout used by `ls`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListLayout {
    pub column_width: usize,
    pub columns: usize,
}

impl Default for ListLayout {
    fn default() -> Self {
        Self {
            column_width: 16,
            columns: 3,
        }
    }
}

/// Output sink that keeps everything written to it, for tests and scripting.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer(Arc<Mutex<Vec<u8>>>);

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.0
            .lock()
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut buf) = self.0.lock() {
            buf.clear();
        }
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self
            .0
            .lock()
            .map_err(|e| io::Error::other(e.to_string()))?;
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct ContextBuilder {
    root: LevelType,
    registrar: Option<LevelRegistrar>,
    store: Option<Box<dyn StackStore>>,
    output: Option<Box<dyn Write + Send>>,
    skill_level: SkillLevel,
    wait_all: bool,
    layout: ListLayout,
}

impl ContextBuilder {
    pub fn new(root: LevelType) -> Self {
        Self {
            root,
            registrar: None,
            store: None,
            output: None,
            skill_level: SkillLevel::default(),
            wait_all: false,
            layout: ListLayout::default(),
        }
    }

    /// Use a pre-populated registrar, e.g. one whose help index already holds
    /// documented entries and topics.
    pub fn registrar(mut self, registrar: LevelRegistrar) -> Self {
        self.registrar = Some(registrar);
        self
    }

    pub fn store(mut self, store: impl StackStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn output(mut self, output: impl Write + Send + 'static) -> Self {
        self.output = Some(Box::new(output));
        self
    }

    pub fn skill_level(mut self, level: SkillLevel) -> Self {
        self.skill_level = level;
        self
    }

    pub fn wait_all(mut self, wait: bool) -> Self {
        self.wait_all = wait;
        self
    }

    pub fn layout(mut self, layout: ListLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Take skill level, wait mode and layout from the loaded configuration.
    pub fn config(self, config: &ShellConfig) -> Self {
        self.skill_level(config.skill_level)
            .wait_all(config.wait)
            .layout(ListLayout {
                column_width: config.ui.column_width,
                columns: config.ui.columns,
            })
    }

    /// Build every registry reachable from the root. Fails on the first
    /// registration error.
    pub fn build(self) -> std::result::Result<Context, RegistrationError> {
        let mut registrar = self.registrar.unwrap_or_default();
        let registry = registrar.build(self.root)?;
        let store = self
            .store
            .unwrap_or_else(|| Box::new(MemoryStackStore::new()));
        let output = self.output.unwrap_or_else(|| Box::new(io::stdout()));
        info!(root = self.root.name, skill_level = %self.skill_level, "Shell context ready");
        Ok(Context {
            stack: LevelStack::new(self.root, registry, store),
            registrar,
            skill_level: self.skill_level,
            wait_all: self.wait_all,
            layout: self.layout,
            command_name: None,
            quit_requested: false,
            output,
            extensions: HashMap::new(),
            transit: RefCell::new(Vec::new()),
        })
    }
}

pub struct Context {
    stack: LevelStack,
    registrar: LevelRegistrar,
    skill_level: SkillLevel,
    wait_all: bool,
    layout: ListLayout,
    command_name: Option<String>,
    quit_requested: bool,
    output: Box<dyn Write + Send>,
    extensions: HashMap<TypeId, Box<dyn Any + Send>>,
    /// Levels a line being completed passes through without entering them.
    transit: RefCell<Vec<Arc<Registry>>>,
}

impl Context {
    pub fn builder(root: LevelType) -> ContextBuilder {
        ContextBuilder::new(root)
    }

    // -- Navigation --

    pub fn stack(&self) -> &LevelStack {
        &self.stack
    }

    pub fn current_frame(&self) -> &Frame {
        self.stack.current()
    }

    pub fn current_level(&self) -> &dyn Level {
        self.stack.current().instance()
    }

    /// The current level instance as its concrete type.
    pub fn current_level_as<T: Level>(&self) -> Option<&T> {
        let level: &dyn Any = self.stack.current().instance();
        level.downcast_ref::<T>()
    }

    pub fn current_level_mut<T: Level>(&mut self) -> Option<&mut T> {
        let level: &mut dyn Any = self.stack.current_mut().instance_mut();
        level.downcast_mut::<T>()
    }

    pub fn current_level_type(&self) -> LevelType {
        self.stack.current().level_type()
    }

    /// Declared name of the current level.
    pub fn level_name(&self) -> &'static str {
        self.stack.level_name()
    }

    pub fn previous_level(&self) -> Option<&Frame> {
        self.stack.previous()
    }

    pub fn current_registry(&self) -> Arc<Registry> {
        Arc::clone(self.stack.current().registry())
    }

    /// Registries from the root to the level a completer works in. While a
    /// line like `configure cd <Tab>` is completed, this ends with the levels
    /// the line passes through.
    pub fn completion_trail(&self) -> Vec<Arc<Registry>> {
        self.stack
            .frames()
            .map(|frame| Arc::clone(frame.registry()))
            .chain(self.transit.borrow().iter().cloned())
            .collect()
    }

    pub(crate) fn in_transit<T>(&self, registry: Arc<Registry>, f: impl FnOnce() -> T) -> T {
        self.transit.borrow_mut().push(registry);
        let result = f();
        self.transit.borrow_mut().pop();
        result
    }

    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// Names used to enter each level above the root.
    pub fn path(&self) -> Vec<String> {
        self.stack.path()
    }

    /// Enter `level` directly, building its registry on first use.
    pub fn enter_level(&mut self, level: LevelType) -> Result<()> {
        let registry = self.registrar.build(level)?;
        self.stack.enter(level, registry, level.name)?;
        Ok(())
    }

    pub(crate) fn enter_registered(
        &mut self,
        level: LevelType,
        children: Arc<Registry>,
        used: &str,
    ) -> Result<()> {
        self.stack.enter(level, children, used)?;
        Ok(())
    }

    pub fn up(&mut self) -> Result<()> {
        self.stack.up()?;
        Ok(())
    }

    pub fn jump_path(&mut self, path: &str) -> Result<()> {
        self.stack.jump_path(path)?;
        Ok(())
    }

    /// Leave levels until the stack is `depth` frames deep. No level on the
    /// way may prompt the operator; each decides on its own whether to leave.
    pub fn return_to(&mut self, depth: usize) -> Result<()> {
        while self.stack.depth() > depth {
            self.stack.up_with(true)?;
        }
        Ok(())
    }

    pub fn save_stack(&mut self) {
        self.stack.save();
    }

    /// Replay the path saved by a previous session. Returns whether the whole
    /// path could be restored; a partial restore stays where it stopped.
    pub fn restore_stack(&mut self) -> bool {
        let Some(path) = self.stack.saved_path() else {
            return true;
        };
        if path.is_empty() {
            return true;
        }
        let joined = path.join("/");
        match self.stack.jump_path(&joined) {
            Ok(()) => {
                debug!(path = %joined, "Restored level stack");
                true
            }
            Err(e) => {
                warn!(path = %joined, error = %e, "Could not restore level stack");
                false
            }
        }
    }

    // -- Session settings --

    pub fn skill_level(&self) -> SkillLevel {
        self.skill_level
    }

    pub fn set_skill_level(&mut self, level: SkillLevel) {
        info!(from = %self.skill_level, to = %level, "Skill level changed");
        self.skill_level = level;
    }

    /// Whether every command waits for its completion signal.
    pub fn wait_all(&self) -> bool {
        self.wait_all
    }

    pub fn set_wait_all(&mut self, wait: bool) {
        self.wait_all = wait;
    }

    pub fn layout(&self) -> ListLayout {
        self.layout
    }

    /// The name or alias the running command was invoked by.
    pub fn command_name(&self) -> Option<&str> {
        self.command_name.as_deref()
    }

    pub(crate) fn set_command_name(&mut self, name: Option<String>) {
        self.command_name = name;
    }

    /// End the session, unless a level vetoes it. Levels are asked top first.
    pub fn quit(&mut self) -> Result<()> {
        self.quit_with(false)
    }

    /// With `no_questions_asked` set, levels must decide without prompting.
    pub fn quit_with(&mut self, no_questions_asked: bool) -> Result<()> {
        if !self.stack.end_game_all(no_questions_asked) {
            return Err(NavigationError::Vetoed {
                level: self.level_name().to_string(),
            }
            .into());
        }
        self.quit_requested = true;
        Ok(())
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    // -- Output and help --

    pub fn output(&mut self) -> &mut dyn Write {
        self.output.as_mut()
    }

    pub fn println(&mut self, line: impl fmt::Display) -> Result<()> {
        writeln!(self.output, "{line}")?;
        Ok(())
    }

    pub fn help(&self) -> &HelpIndex {
        self.registrar.help()
    }

    pub fn help_mut(&mut self) -> &mut HelpIndex {
        self.registrar.help_mut()
    }

    /// A command failure attributed to the running command.
    pub fn fail(&self, message: impl Into<String>) -> ShellError {
        ShellError::Command {
            command: self.command_name.clone().unwrap_or_default(),
            source: CommandError::failed(message),
        }
    }

    // -- Extensions --

    /// Attach session-wide state owned by the application, one value per type.
    pub fn insert_extension<T: Any + Send>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn extension<T: Any + Send>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn extension_mut<T: Any + Send>(&mut self) -> Option<&mut T> {
        self.extensions
            .get_mut(&TypeId::of::<T>())
            .and_then(|value| value.downcast_mut::<T>())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("stack", &self.stack)
            .field("skill_level", &self.skill_level)
            .field("wait_all", &self.wait_all)
            .field("command_name", &self.command_name)
            .finish()
    }
}
