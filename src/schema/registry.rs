//! Leveled schema registry: ordered Levels of ordered Units.
//!
//! Level rank encodes dependency order. A Unit at rank N must not depend on a Unit at a higher
//! rank; that is trusted, not checked here.

use crate::capability::{resolve, SharedTask, TaskProvider};
use crate::error::ConfigError;
use serde::Serialize;
use std::collections::HashSet;

/// One schema bootstrap step.
#[derive(Clone)]
pub struct Unit {
    pub name: String,
    /// `None` when the unit was declared without a callable task.
    pub task: Option<SharedTask>,
    pub critical: bool,
    pub description: String,
}

impl Unit {
    pub fn new(name: impl Into<String>, task: SharedTask) -> Self {
        Unit {
            name: name.into(),
            task: Some(task),
            critical: false,
            description: String::new(),
        }
    }

    /// Build from a provider: preferred capability, then `init`, then the skip stub.
    pub fn resolved<P>(name: impl Into<String>, provider: &P, preferred: &str) -> Self
    where
        P: TaskProvider + ?Sized,
    {
        Unit::new(name, resolve(provider, preferred))
    }

    pub fn unresolved(name: impl Into<String>) -> Self {
        Unit {
            name: name.into(),
            task: None,
            critical: false,
            description: String::new(),
        }
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl std::fmt::Debug for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unit")
            .field("name", &self.name)
            .field("has_task", &self.task.is_some())
            .field("critical", &self.critical)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct Level {
    pub rank: u32,
    pub name: String,
    pub description: String,
    pub units: Vec<Unit>,
}

impl Level {
    pub fn new(rank: u32, name: impl Into<String>) -> Self {
        Level {
            rank,
            name: name.into(),
            description: String::new(),
            units: Vec::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn unit(mut self, unit: Unit) -> Self {
        self.units.push(unit);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub level: u32,
    pub unit: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
}

/// Levels sorted by ascending rank.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    levels: Vec<Level>,
}

impl SchemaRegistry {
    /// Rejects duplicate ranks and duplicate unit names within a level.
    pub fn new(mut levels: Vec<Level>) -> Result<Self, ConfigError> {
        levels.sort_by_key(|l| l.rank);
        let mut ranks = HashSet::new();
        for level in &levels {
            if !ranks.insert(level.rank) {
                return Err(ConfigError::DuplicateLevel(level.rank));
            }
            let mut names = HashSet::new();
            for unit in &level.units {
                if !names.insert(unit.name.as_str()) {
                    return Err(ConfigError::DuplicateUnit {
                        level: level.rank,
                        unit: unit.name.clone(),
                    });
                }
            }
        }
        Ok(SchemaRegistry { levels })
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn unit_count(&self) -> usize {
        self.levels.iter().map(|l| l.units.len()).sum()
    }

    /// Pre-flight check: lists every unit without a callable task. Executes nothing.
    pub fn validate(&self) -> ValidationReport {
        let issues: Vec<ValidationIssue> = self
            .levels
            .iter()
            .flat_map(|level| {
                level
                    .units
                    .iter()
                    .filter(|u| u.task.is_none())
                    .map(move |u| ValidationIssue {
                        level: level.rank,
                        unit: u.name.clone(),
                    })
            })
            .collect();
        ValidationReport {
            valid: issues.is_empty(),
            issues,
        }
    }
}
