//! Operator skill levels gating which commands may run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SkillLevelError;

/// Privilege tier of the operator, or the tier a command requires.
///
/// Ordered: `Operator < Administrator < Expert`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "SkillLevelRepr", into = "String")]
pub enum SkillLevel {
    #[default]
    Operator = 0,
    Administrator = 1,
    Expert = 2,
}

impl SkillLevel {
    pub fn all() -> &'static [SkillLevel] {
        &[
            SkillLevel::Operator,
            SkillLevel::Administrator,
            SkillLevel::Expert,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            SkillLevel::Operator => "operator",
            SkillLevel::Administrator => "administrator",
            SkillLevel::Expert => "expert",
        }
    }

    /// Numeric tier, 0 for operator.
    pub fn tier(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for SkillLevel {
    type Error = SkillLevelError;

    fn try_from(tier: u8) -> Result<Self, Self::Error> {
        match tier {
            0 => Ok(SkillLevel::Operator),
            1 => Ok(SkillLevel::Administrator),
            2 => Ok(SkillLevel::Expert),
            other => Err(SkillLevelError(other.to_string())),
        }
    }
}

/// Accepts a name in any case, or the numeric tier.
impl FromStr for SkillLevel {
    type Err = SkillLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(tier) = trimmed.parse::<u8>() {
            return SkillLevel::try_from(tier);
        }
        SkillLevel::all()
            .iter()
            .copied()
            .find(|level| level.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| SkillLevelError(s.to_string()))
    }
}

impl From<SkillLevel> for String {
    fn from(level: SkillLevel) -> Self {
        level.name().to_string()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SkillLevelRepr {
    Tier(u8),
    Name(String),
}

impl TryFrom<SkillLevelRepr> for SkillLevel {
    type Error = SkillLevelError;

    fn try_from(repr: SkillLevelRepr) -> Result<Self, Self::Error> {
        match repr {
            SkillLevelRepr::Tier(tier) => SkillLevel::try_from(tier),
            SkillLevelRepr::Name(name) => name.parse(),
        }
    }
}
