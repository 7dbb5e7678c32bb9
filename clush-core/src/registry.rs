//! Level registries: the name → descriptor maps built from registration tables.
//!
//! Each [`LevelType`] declares its commands and sub-levels as an ordered list of
//! [`Member`] records. [`LevelRegistrar::build`] turns that list into a
//! [`Registry`], validating names and argument declarations, registering every
//! alias, recursing depth-first into sub-levels and feeding the help index.
//! Registries are cached per level type and never rebuilt.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::completion::Completer;
use crate::context::Context;
use crate::descriptor::{Descriptor, Handler, Outcome, Param, ParamKind, Target};
use crate::error::{RegistrationError, Result};
use crate::fuzzy;
use crate::help::{HelpEntry, HelpIndex, split_doc};
use crate::level::LevelType;
use crate::skill::SkillLevel;

/// Prefix stripped from member identifiers to derive command names.
const COMMAND_PREFIX: &str = "do_";

/// Derive a command name from a member identifier: `do_status` → `status`.
pub fn make_name(identifier: &str) -> &str {
    identifier.strip_prefix(COMMAND_PREFIX).unwrap_or(identifier)
}

enum MemberKind {
    Command { handler: Handler },
    Level { level: LevelType },
}

/// One record of a level's registration table.
pub struct Member {
    identifier: &'static str,
    name: Option<String>,
    aliases: Vec<String>,
    doc: Option<String>,
    skill_level: SkillLevel,
    wait: bool,
    completer: Option<Completer>,
    params: Vec<Param>,
    kind: MemberKind,
}

impl Member {
    /// A command. The handler receives the context first, then the arguments.
    pub fn command<F>(identifier: &'static str, handler: F) -> Self
    where
        F: Fn(&mut Context, &[String]) -> Result<Outcome> + Send + Sync + 'static,
    {
        Self::with_kind(
            identifier,
            MemberKind::Command {
                handler: Arc::new(handler),
            },
        )
    }

    /// A transition into `level`. Entering never runs code of the parent level.
    pub fn level(identifier: &'static str, level: LevelType) -> Self {
        Self::with_kind(identifier, MemberKind::Level { level })
    }

    fn with_kind(identifier: &'static str, kind: MemberKind) -> Self {
        Self {
            identifier,
            name: None,
            aliases: Vec::new(),
            doc: None,
            skill_level: SkillLevel::Operator,
            wait: false,
            completer: None,
            params: Vec::new(),
            kind,
        }
    }

    /// Override the derived name, e.g. for names containing dashes.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases.extend(aliases.iter().map(|a| a.to_string()));
        self
    }

    /// Help text: the first line is the summary, the rest the full text.
    pub fn help(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn skill_level(mut self, level: SkillLevel) -> Self {
        self.skill_level = level;
        self
    }

    /// Block the shell until the command's completion signal fires.
    pub fn wait(mut self) -> Self {
        self.wait = true;
        self
    }

    pub fn completer(mut self, completer: Completer) -> Self {
        self.completer = Some(completer);
        self
    }

    pub fn arg(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param::required(name));
        self
    }

    pub fn opt_arg(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param::optional(name));
        self
    }

    pub fn rest(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param::variadic(name));
        self
    }

    pub fn resolved_name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or_else(|| make_name(self.identifier))
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            MemberKind::Command { .. } => "command".to_string(),
            MemberKind::Level { level } => format!("level {}", level.name),
        };
        f.debug_struct("Member")
            .field("identifier", &self.identifier)
            .field("name", &self.resolved_name())
            .field("kind", &kind)
            .field("aliases", &self.aliases)
            .finish()
    }
}

/// The children of one level: every name and alias maps to one descriptor.
pub struct Registry {
    level: &'static str,
    entries: Vec<Arc<Descriptor>>,
    children: BTreeMap<String, Arc<Descriptor>>,
}

impl Registry {
    fn new(level: &'static str) -> Self {
        Self {
            level,
            entries: Vec::new(),
            children: BTreeMap::new(),
        }
    }

    /// Name of the level type this registry belongs to.
    pub fn level(&self) -> &'static str {
        self.level
    }

    /// Exact lookup of a name or alias.
    pub fn get(&self, name: &str) -> Option<&Arc<Descriptor>> {
        self.children.get(name)
    }

    /// Fuzzy lookup, returning the key that matched and its descriptor.
    pub fn resolve(&self, query: &str) -> Option<(&str, &Arc<Descriptor>)> {
        fuzzy::resolve(&self.children, query)
    }

    /// Fuzzy lookup of a child.
    pub fn get_child(&self, query: &str) -> Option<&Arc<Descriptor>> {
        fuzzy::fuzzy_get(&self.children, query)
    }

    /// Whether `name` resolves to a sub-level.
    pub fn is_sublevel(&self, name: &str) -> bool {
        self.get_child(name).is_some_and(|d| d.is_level())
    }

    /// Every name and alias, sorted.
    pub fn completions(&self) -> Vec<&str> {
        self.children.keys().map(String::as_str).collect()
    }

    /// Distinct descriptors in registration order.
    pub fn descriptors(&self) -> &[Arc<Descriptor>] {
        &self.entries
    }

    /// The name/alias map the resolver runs against.
    pub fn children(&self) -> &BTreeMap<String, Arc<Descriptor>> {
        &self.children
    }

    /// Number of names and aliases.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    fn insert(&mut self, descriptor: Descriptor) -> std::result::Result<(), RegistrationError> {
        let descriptor = Arc::new(descriptor);
        let names = std::iter::once(&descriptor.name).chain(descriptor.aliases.iter());
        for name in names {
            if self.children.contains_key(name) {
                return Err(RegistrationError::DuplicateName {
                    level: self.level.to_string(),
                    name: name.clone(),
                });
            }
            self.children.insert(name.clone(), Arc::clone(&descriptor));
        }
        self.entries.push(descriptor);
        Ok(())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("level", &self.level)
            .field("children", &self.children)
            .finish()
    }
}

/// Builds and caches registries, one per level type.
pub struct LevelRegistrar {
    cache: HashMap<&'static str, Arc<Registry>>,
    building: Vec<&'static str>,
    builtins: fn() -> Vec<Member>,
    help: HelpIndex,
}

impl LevelRegistrar {
    /// Every level gets the built-in navigation commands (`cd`, `ls`, `up`,
    /// `help`, `quit`) ahead of its own members.
    pub fn new() -> Self {
        Self::with_builtins(crate::builtins::members)
    }

    /// Registries contain only the members each level declares.
    pub fn bare() -> Self {
        Self::with_builtins(Vec::new)
    }

    pub fn with_builtins(builtins: fn() -> Vec<Member>) -> Self {
        Self {
            cache: HashMap::new(),
            building: Vec::new(),
            builtins,
            help: HelpIndex::new(),
        }
    }

    pub fn help(&self) -> &HelpIndex {
        &self.help
    }

    pub fn help_mut(&mut self) -> &mut HelpIndex {
        &mut self.help
    }

    /// The cached registry of a level type, if it was built.
    pub fn cached(&self, level: &str) -> Option<Arc<Registry>> {
        self.cache.get(level).cloned()
    }

    /// Build (or fetch from cache) the registry of `level` and, depth-first,
    /// of every level reachable from it.
    pub fn build(
        &mut self,
        level: LevelType,
    ) -> std::result::Result<Arc<Registry>, RegistrationError> {
        if let Some(registry) = self.cache.get(level.name) {
            return Ok(Arc::clone(registry));
        }
        if self.building.contains(&level.name) {
            return Err(RegistrationError::Cycle {
                level: level.name.to_string(),
            });
        }

        self.building.push(level.name);
        let built = self.build_uncached(level);
        self.building.pop();

        let registry = Arc::new(built?);
        debug!(
            level = level.name,
            names = registry.len(),
            "Built level registry"
        );
        if self.building.is_empty() {
            info!(level = level.name, levels = self.cache.len() + 1, "Level tree registered");
        }
        self.cache.insert(level.name, Arc::clone(&registry));
        Ok(registry)
    }

    fn build_uncached(
        &mut self,
        level: LevelType,
    ) -> std::result::Result<Registry, RegistrationError> {
        self.help.add_help(
            HelpEntry::generated(
                format!("Help for level {}", level.name),
                "Note: This level is not documented.\n",
            ),
            level.name,
            None,
        );

        let mut registry = Registry::new(level.name);
        let members = (self.builtins)().into_iter().chain((level.members)());
        for member in members {
            let descriptor = self.prepare(level.name, member)?;
            self.help.register(&descriptor);
            registry.insert(descriptor)?;
        }
        Ok(registry)
    }

    fn prepare(
        &mut self,
        parent: &'static str,
        member: Member,
    ) -> std::result::Result<Descriptor, RegistrationError> {
        let name = member.resolved_name().to_string();
        for candidate in std::iter::once(&name).chain(member.aliases.iter()) {
            validate_name(parent, candidate)?;
        }

        let target = match member.kind {
            MemberKind::Command { handler } => {
                validate_params(parent, member.identifier, &member.params)?;
                Target::Command {
                    handler,
                    params: member.params,
                }
            }
            MemberKind::Level { level } => {
                if !member.params.is_empty() {
                    return Err(RegistrationError::InvalidSignature {
                        level: parent.to_string(),
                        identifier: member.identifier.to_string(),
                        reason: "level transitions take no arguments".into(),
                    });
                }
                let children = self.build(level)?;
                Target::Level { level, children }
            }
        };

        let (short_help, long_help) = match member.doc.as_deref().map(split_doc) {
            Some((short, long)) => (Some(short), Some(long)),
            None => (None, None),
        };

        Ok(Descriptor {
            name,
            aliases: member.aliases,
            short_help,
            long_help,
            skill_level: member.skill_level,
            wait: member.wait,
            completer: member.completer,
            parent,
            target,
        })
    }
}

impl Default for LevelRegistrar {
    fn default() -> Self {
        Self::new()
    }
}

/// `.` and `..` are path steps, so a member by either name could never be
/// reached with `cd`.
fn validate_name(level: &str, name: &str) -> std::result::Result<(), RegistrationError> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.chars().any(char::is_whitespace)
    {
        return Err(RegistrationError::InvalidName {
            level: level.to_string(),
            name: name.to_string(),
        });
    }
    Ok(())
}

/// The context is passed implicitly as the first handler argument, so the
/// declared list only names the operator-supplied arguments.
fn validate_params(
    level: &str,
    identifier: &str,
    params: &[Param],
) -> std::result::Result<(), RegistrationError> {
    let invalid = |reason: String| RegistrationError::InvalidSignature {
        level: level.to_string(),
        identifier: identifier.to_string(),
        reason,
    };

    if params.first().is_some_and(|p| p.name == "context") {
        return Err(invalid(
            "the context is passed implicitly and must not be declared".into(),
        ));
    }

    let mut seen_optional = false;
    for (index, param) in params.iter().enumerate() {
        let valid_ident = param
            .name
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_')
            && param
                .name
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-');
        if !valid_ident {
            return Err(invalid(format!("bad argument name '{}'", param.name)));
        }
        if params[..index].iter().any(|p| p.name == param.name) {
            return Err(invalid(format!("duplicate argument '{}'", param.name)));
        }
        match param.kind {
            ParamKind::Required if seen_optional => {
                return Err(invalid(format!(
                    "required argument '{}' follows an optional one",
                    param.name
                )));
            }
            ParamKind::Required => {}
            ParamKind::Optional => seen_optional = true,
            ParamKind::Variadic if index + 1 != params.len() => {
                return Err(invalid(format!(
                    "only the last argument may be variadic, not '{}'",
                    param.name
                )));
            }
            ParamKind::Variadic => seen_optional = true,
        }
    }
    Ok(())
}
