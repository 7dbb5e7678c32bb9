//! Help reference shipped with the binary.

use std::collections::BTreeMap;

use clush_core::{HelpEntry, HelpIndex};
use serde::Deserialize;

const REFERENCE: &str = include_str!("../help/reference.toml");

#[derive(Debug, Deserialize)]
struct DocEntry {
    short: String,
    #[serde(default)]
    long: String,
}

impl From<DocEntry> for HelpEntry {
    fn from(doc: DocEntry) -> Self {
        HelpEntry::new(doc.short, doc.long)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Reference {
    topics: BTreeMap<String, DocEntry>,
    levels: BTreeMap<String, DocEntry>,
    commands: BTreeMap<String, BTreeMap<String, DocEntry>>,
}

/// Add the embedded reference to `help`.
pub fn install(help: &mut HelpIndex) -> Result<(), toml::de::Error> {
    install_from(help, REFERENCE)
}

fn install_from(help: &mut HelpIndex, source: &str) -> Result<(), toml::de::Error> {
    let reference: Reference = toml::from_str(source)?;
    for (name, entry) in reference.topics {
        help.add_topic(&name, entry.into());
    }
    for (level, entry) in reference.levels {
        help.add_help(entry.into(), &level, None);
    }
    for (level, commands) in reference.commands {
        for (command, entry) in commands {
            help.add_help(entry.into(), &level, Some(&command));
        }
    }
    Ok(())
}
