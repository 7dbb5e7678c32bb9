//! Help entries and the index they are looked up in.
//!
//! Registration feeds a generated entry for every command and level. Entries
//! from a real documentation source are added without the `generated` flag and
//! always win over generated ones, whichever is added first.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::descriptor::{Descriptor, Target, pretty_arguments};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpEntry {
    pub short: String,
    pub long: String,
    #[serde(default)]
    pub generated: bool,
}

impl HelpEntry {
    pub fn new(short: impl Into<String>, long: impl Into<String>) -> Self {
        Self {
            short: short.into(),
            long: long.into(),
            generated: false,
        }
    }

    pub fn generated(short: impl Into<String>, long: impl Into<String>) -> Self {
        Self {
            generated: true,
            ..Self::new(short, long)
        }
    }

    /// Split a doc string: the first line is the short help, the rest the body.
    pub fn from_doc(doc: &str) -> Self {
        let (short, long) = split_doc(doc);
        Self::new(short, long)
    }

    /// Text shown by the `help` command.
    pub fn render(&self) -> String {
        let long = self.long.trim_end();
        if long.is_empty() {
            self.short.clone()
        } else {
            format!("{}\n\n{}", self.short, long)
        }
    }
}

pub(crate) fn split_doc(doc: &str) -> (String, String) {
    match doc.split_once('\n') {
        Some((short, long)) => (short.to_string(), long.to_string()),
        None => (doc.to_string(), String::new()),
    }
}

/// Help entries by level, by command within a level, and by topic.
#[derive(Debug, Default)]
pub struct HelpIndex {
    levels: HashMap<String, HelpEntry>,
    commands: HashMap<(String, String), HelpEntry>,
    topics: BTreeMap<String, HelpEntry>,
}

impl HelpIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry for a level (`command == None`) or for a command in a level.
    pub fn add_help(&mut self, entry: HelpEntry, level: &str, command: Option<&str>) {
        match command {
            Some(command) => {
                let key = (level.to_string(), command.to_string());
                if replaces(self.commands.get(&key), &entry) {
                    self.commands.insert(key, entry);
                }
            }
            None => {
                if replaces(self.levels.get(level), &entry) {
                    self.levels.insert(level.to_string(), entry);
                }
            }
        }
    }

    pub fn add_topic(&mut self, name: &str, entry: HelpEntry) {
        if replaces(self.topics.get(name), &entry) {
            self.topics.insert(name.to_string(), entry);
        }
    }

    pub fn level(&self, level: &str) -> Option<&HelpEntry> {
        self.levels.get(level)
    }

    pub fn command(&self, level: &str, command: &str) -> Option<&HelpEntry> {
        self.commands
            .get(&(level.to_string(), command.to_string()))
    }

    /// Topic lookup ignores case.
    pub fn topic(&self, name: &str) -> Option<&HelpEntry> {
        self.topics.get(name).or_else(|| {
            self.topics
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, entry)| entry)
        })
    }

    pub fn list_topics(&self) -> Vec<&str> {
        self.topics.keys().map(String::as_str).collect()
    }

    /// Resolve help by exact names.
    ///
    /// Without a subject this is the help of `level` itself. A subject is tried
    /// as a command of `level`, then as a level name (with `subtopic` as one of
    /// its commands), then as a topic.
    pub fn lookup(
        &self,
        level: &str,
        subject: Option<&str>,
        subtopic: Option<&str>,
    ) -> Option<&HelpEntry> {
        let Some(subject) = subject else {
            return self.level(level);
        };
        if let Some(entry) = self.command(level, subject) {
            return Some(entry);
        }
        if self.levels.contains_key(subject) {
            return match subtopic {
                Some(command) => self.command(subject, command),
                None => self.level(subject),
            };
        }
        self.topic(subject)
    }

    /// Record help for a freshly registered descriptor.
    pub(crate) fn register(&mut self, descriptor: &Descriptor) {
        let entry = match &descriptor.short_help {
            Some(short) => HelpEntry::generated(
                short.clone(),
                descriptor.long_help.clone().unwrap_or_default(),
            ),
            None => match &descriptor.target {
                Target::Command { params, .. } => HelpEntry::generated(
                    format!("Help for command {}", descriptor.name),
                    format!(
                        "Note: This command is not documented.\nUsage: {} {}",
                        descriptor.name,
                        pretty_arguments(params)
                    ),
                ),
                Target::Level { .. } => HelpEntry::generated(
                    format!("Help for level {}", descriptor.name),
                    "Note: This level is not documented.\n",
                ),
            },
        };
        match &descriptor.target {
            Target::Command { .. } => {
                self.add_help(entry, descriptor.parent, Some(&descriptor.name))
            }
            Target::Level { level, .. } => self.add_help(entry, level.name, None),
        }
    }
}

/// Generated entries never replace documented ones.
fn replaces(existing: Option<&HelpEntry>, entry: &HelpEntry) -> bool {
    match existing {
        Some(existing) => !(entry.generated && !existing.generated),
        None => true,
    }
}
