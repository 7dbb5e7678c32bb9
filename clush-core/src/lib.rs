//! # clush core
//!
//! Navigation and dispatch core of the clush cluster administration shell.
//! Levels declare their commands and sub-levels in registration tables; the
//! registrar turns them into cached registries, the level stack tracks where
//! the operator is, and dispatch resolves typed names (exactly, by unique
//! prefix, or by unique subsequence) to commands or level transitions.

pub mod builtins;
pub mod completion;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod fuzzy;
pub mod help;
pub mod level;
pub mod navigation;
pub mod persistence;
pub mod registry;
pub mod skill;
pub mod wait;

// Re-export commonly used types at the crate root.
pub use completion::{Completer, choices, completers, completers_repeating};
pub use config::{ShellConfig, load_config};
pub use context::{Context, ContextBuilder, ListLayout, OutputBuffer};
pub use descriptor::{Descriptor, Kind, Outcome, Param};
pub use dispatch::{complete, dispatch};
pub use error::{
    CommandError, ConfigError, NavigationError, RegistrationError, Result, ShellError,
};
pub use help::{HelpEntry, HelpIndex};
pub use level::{Level, LevelType};
pub use navigation::LevelStack;
pub use persistence::{FileStackStore, MemoryStackStore, StackStore};
pub use registry::{LevelRegistrar, Member, Registry};
pub use skill::SkillLevel;
pub use wait::{CompletionHandle, CompletionSignal, completion_channel};
