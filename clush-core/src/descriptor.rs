//! Descriptors: the registered, read-only records for commands and levels.

use std::fmt;
use std::sync::Arc;

use crate::completion::Completer;
use crate::context::Context;
use crate::error::Result;
use crate::level::LevelType;
use crate::registry::Registry;
use crate::skill::SkillLevel;
use crate::wait::CompletionSignal;

/// Business logic behind a command. The context always comes first; the
/// remaining tokens of the input line follow.
pub type Handler = Arc<dyn Fn(&mut Context, &[String]) -> Result<Outcome> + Send + Sync>;

/// What a handler reports back to dispatch.
#[derive(Debug)]
pub struct Outcome {
    /// Whether the command considers itself successful.
    pub ok: bool,
    /// Fired when an operation started by the handler finishes.
    pub completion: Option<CompletionSignal>,
}

impl Outcome {
    pub fn success() -> Self {
        Self {
            ok: true,
            completion: None,
        }
    }

    pub fn failure() -> Self {
        Self {
            ok: false,
            completion: None,
        }
    }

    /// Successful so far; the real effect completes when `signal` fires.
    pub fn pending(signal: CompletionSignal) -> Self {
        Self {
            ok: true,
            completion: Some(signal),
        }
    }

    pub fn from_bool(ok: bool) -> Self {
        if ok { Self::success() } else { Self::failure() }
    }
}

impl Default for Outcome {
    fn default() -> Self {
        Self::success()
    }
}

/// Whether a descriptor names a command or a sub-level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Command,
    Level,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Command => f.write_str("command"),
            Kind::Level => f.write_str("level"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Required,
    Optional,
    Variadic,
}

/// A declared command argument, used for arity checks and usage lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
}

impl Param {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Required,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Optional,
        }
    }

    pub fn variadic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Variadic,
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ParamKind::Required => write!(f, "{}", self.name),
            ParamKind::Optional => write!(f, "[{}]", self.name),
            ParamKind::Variadic => write!(f, "[{} ...]", self.name),
        }
    }
}

/// Render an argument list the way generated help shows it: `rsc [force] [attr ...]`.
pub fn pretty_arguments(params: &[Param]) -> String {
    params
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// What the descriptor resolves to.
pub enum Target {
    Command {
        handler: Handler,
        params: Vec<Param>,
    },
    Level {
        level: LevelType,
        children: Arc<Registry>,
    },
}

/// Registered metadata for one command or sub-level of a level.
pub struct Descriptor {
    pub name: String,
    pub aliases: Vec<String>,
    pub short_help: Option<String>,
    pub long_help: Option<String>,
    pub skill_level: SkillLevel,
    /// The shell blocks until the command's completion signal fires.
    pub wait: bool,
    pub completer: Option<Completer>,
    /// Name of the level type this descriptor was registered in.
    pub parent: &'static str,
    pub target: Target,
}

impl Descriptor {
    pub fn kind(&self) -> Kind {
        match self.target {
            Target::Command { .. } => Kind::Command,
            Target::Level { .. } => Kind::Level,
        }
    }

    pub fn is_level(&self) -> bool {
        self.kind() == Kind::Level
    }

    /// The sub-level type, for level descriptors.
    pub fn level_type(&self) -> Option<LevelType> {
        match &self.target {
            Target::Level { level, .. } => Some(*level),
            Target::Command { .. } => None,
        }
    }

    /// The sub-level registry, for level descriptors.
    pub fn children(&self) -> Option<&Arc<Registry>> {
        match &self.target {
            Target::Level { children, .. } => Some(children),
            Target::Command { .. } => None,
        }
    }

    pub fn params(&self) -> &[Param] {
        match &self.target {
            Target::Command { params, .. } => params,
            Target::Level { .. } => &[],
        }
    }

    /// Whether `count` arguments satisfy the declared parameters.
    pub fn accepts(&self, count: usize) -> bool {
        let params = self.params();
        let required = params
            .iter()
            .filter(|p| p.kind == ParamKind::Required)
            .count();
        let variadic = params.iter().any(|p| p.kind == ParamKind::Variadic);
        count >= required && (variadic || count <= params.len())
    }

    pub fn usage(&self) -> String {
        let args = pretty_arguments(self.params());
        if args.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, args)
        }
    }

    /// Run the completer with `args[0]` set to this descriptor's name.
    pub fn complete(&self, ctx: &Context, args: &[String]) -> Vec<String> {
        let Some(completer) = &self.completer else {
            return Vec::new();
        };
        let mut line = Vec::with_capacity(args.len() + 1);
        line.push(self.name.clone());
        line.extend_from_slice(args);
        completer.call(&line, ctx)
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} ({})",
            self.kind(),
            self.name,
            self.short_help.as_deref().unwrap_or("")
        )
    }
}
