use crate::config::DaemonConfig;
use crate::grading::GradingSystem;
use crate::letters::{LetterSet, LetterSystem};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Registry key for a configured grading system. Class and subject are
/// matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemKey {
    pub school_year: i32,
    pub class_name: String,
    pub subject: String,
}

impl SystemKey {
    pub fn new(school_year: i32, class_name: &str, subject: &str) -> Self {
        Self {
            school_year,
            class_name: class_name.trim().to_ascii_lowercase(),
            subject: subject.trim().to_ascii_lowercase(),
        }
    }
}

pub struct AppState {
    pub config: DaemonConfig,
    pub systems: HashMap<SystemKey, GradingSystem>,
    pub letter_systems: HashMap<LetterSet, LetterSystem>,
}

impl AppState {
    pub fn new(config: DaemonConfig) -> Self {
        let letter_systems = [LetterSet::Standard, LetterSet::Descriptive]
            .into_iter()
            .map(|set| (set, LetterSystem::builtin(set)))
            .collect();
        Self {
            config,
            systems: HashMap::new(),
            letter_systems,
        }
    }

    pub fn letter_system(&self, set: LetterSet) -> LetterSystem {
        self.letter_systems
            .get(&set)
            .cloned()
            .unwrap_or_else(|| LetterSystem::builtin(set))
    }
}
