use crate::grading::presets::Preset;
use crate::letters::LetterSet;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "n", rename_all = "camelCase")]
pub enum ClassLevel {
    Kindergarten(u8),
    Grade(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Track {
    General,
    Science,
    Commerce,
}

/// A free-text class name ("KG2", "10 sci", "Grade 12-com") parsed once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInfo {
    pub name: String,
    pub level: ClassLevel,
    pub track: Track,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot classify class name {0:?}")]
pub struct ClassParseError(pub String);

impl ClassInfo {
    pub fn parse(name: &str) -> Result<Self, ClassParseError> {
        let raw = name.trim();
        let lower = raw.to_ascii_lowercase();
        let bad = || ClassParseError(raw.to_string());

        let rest = lower
            .strip_prefix("grade")
            .map(str::trim_start)
            .unwrap_or(&lower);

        if let Some(kg) = rest.strip_prefix("kg") {
            let kg = kg.trim_start_matches([' ', '-']);
            let digits: String = kg.chars().take_while(|c| c.is_ascii_digit()).collect();
            let section = kg[digits.len()..].trim_matches([' ', '-']);
            // A bare "KG" is the first level; a section needs an explicit level.
            let n = if digits.is_empty() {
                if !section.is_empty() {
                    return Err(bad());
                }
                1
            } else {
                digits.parse::<u8>().map_err(|_| bad())?
            };
            if !(1..=3).contains(&n) || !section.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(bad());
            }
            return Ok(Self {
                name: raw.to_string(),
                level: ClassLevel::Kindergarten(n),
                track: Track::General,
            });
        }

        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        let grade: u8 = digits.parse().map_err(|_| bad())?;
        if !(1..=12).contains(&grade) {
            return Err(bad());
        }
        let suffix = rest[digits.len()..].trim_matches(|c: char| c == ' ' || c == '-');
        let track = if suffix.starts_with("sci") {
            Track::Science
        } else if suffix.starts_with("com") {
            Track::Commerce
        } else if suffix.is_empty() || suffix.chars().all(|c| c.is_ascii_alphabetic()) {
            // Section letters such as "7a" or "7 b".
            Track::General
        } else {
            return Err(bad());
        };

        Ok(Self {
            name: raw.to_string(),
            level: ClassLevel::Grade(grade),
            track,
        })
    }

    pub fn is_kindergarten(&self) -> bool {
        matches!(self.level, ClassLevel::Kindergarten(_))
    }

    /// Grade number; kindergarten classes are below grade 1.
    pub fn grade(&self) -> Option<u8> {
        match self.level {
            ClassLevel::Grade(n) => Some(n),
            ClassLevel::Kindergarten(_) => None,
        }
    }

    pub fn letter_set(&self) -> LetterSet {
        if self.is_kindergarten() {
            LetterSet::Descriptive
        } else {
            LetterSet::Standard
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SubjectKind {
    Math,
    English,
    Science,
    Religion,
    ComputerScience,
    PhysicalEducation,
    Ucmas,
    Behavior,
    Other(String),
}

impl SubjectKind {
    pub fn parse(name: &str) -> Self {
        let n = name.trim().to_ascii_lowercase();
        match n.as_str() {
            "math" | "maths" | "mathematics" => Self::Math,
            "english" => Self::English,
            "science" | "physics" | "chemistry" | "biology" => Self::Science,
            "religion" | "islamic" | "islamic studies" | "religious studies" => Self::Religion,
            "computer" | "computers" | "computer science" | "ict" => Self::ComputerScience,
            "pe" | "p.e." | "physical education" | "sports" => Self::PhysicalEducation,
            "ucmas" | "mental arithmetic" => Self::Ucmas,
            "behavior" | "behaviour" | "conduct" => Self::Behavior,
            _ => Self::Other(name.trim().to_string()),
        }
    }
}

/// Whether a subject's mark counts toward the class average.
pub fn counts_in_average(class: &ClassInfo, subject: &SubjectKind) -> bool {
    match subject {
        SubjectKind::Behavior | SubjectKind::Ucmas => false,
        SubjectKind::Religion => !class.is_kindergarten(),
        SubjectKind::ComputerScience => class.grade().map(|g| g >= 9).unwrap_or(false),
        _ => true,
    }
}

/// Grading system used when nothing was configured for a class and subject.
pub fn default_preset(class: &ClassInfo, subject: &SubjectKind) -> Preset {
    if matches!(subject, SubjectKind::Behavior) {
        return Preset::Behavior;
    }
    if class.is_kindergarten() {
        return Preset::SimpleSum;
    }
    match subject {
        SubjectKind::Math => Preset::Math,
        SubjectKind::English => Preset::English,
        SubjectKind::Science => Preset::Science,
        SubjectKind::PhysicalEducation => Preset::PhysicalEducation,
        SubjectKind::Ucmas => Preset::Ucmas,
        SubjectKind::ComputerScience => {
            if class.grade().map(|g| g >= 9).unwrap_or(false) {
                Preset::ComputerUpper
            } else {
                Preset::ComputerLower
            }
        }
        SubjectKind::Behavior | SubjectKind::Religion | SubjectKind::Other(_) => Preset::Generic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(s: &str) -> ClassInfo {
        ClassInfo::parse(s).unwrap()
    }

    #[test]
    fn parses_class_names() {
        assert_eq!(class("KG2").level, ClassLevel::Kindergarten(2));
        assert_eq!(class("kg").level, ClassLevel::Kindergarten(1));
        assert_eq!(class("KG2B").level, ClassLevel::Kindergarten(2));
        assert_eq!(class("kg-3 a").level, ClassLevel::Kindergarten(3));
        assert_eq!(class("Grade 7").level, ClassLevel::Grade(7));
        assert_eq!(class("7b").track, Track::General);
        let c = class("11 sci");
        assert_eq!((c.level, c.track), (ClassLevel::Grade(11), Track::Science));
        let c = class("Grade 12-com");
        assert_eq!((c.level, c.track), (ClassLevel::Grade(12), Track::Commerce));
        assert_eq!(class(" 10 Science ").track, Track::Science);
    }

    #[test]
    fn rejects_unclassifiable_names() {
        assert!(ClassInfo::parse("").is_err());
        assert!(ClassInfo::parse("staff room").is_err());
        assert!(ClassInfo::parse("13").is_err());
        assert!(ClassInfo::parse("0").is_err());
        assert!(ClassInfo::parse("KG7").is_err());
        assert!(ClassInfo::parse("kg x").is_err());
        assert!(ClassInfo::parse("KG2?").is_err());
        assert!(ClassInfo::parse("kg999").is_err());
        assert!(ClassInfo::parse("9/2").is_err());
    }

    #[test]
    fn subject_in_average_rules() {
        let kg = class("KG1");
        let g8 = class("8");
        let g9 = class("9 sci");
        assert!(!counts_in_average(&kg, &SubjectKind::Religion));
        assert!(counts_in_average(&g8, &SubjectKind::Religion));
        assert!(!counts_in_average(&g8, &SubjectKind::ComputerScience));
        assert!(counts_in_average(&g9, &SubjectKind::ComputerScience));
        assert!(!counts_in_average(&g9, &SubjectKind::Behavior));
        assert!(!counts_in_average(&g9, &SubjectKind::Ucmas));
        assert!(counts_in_average(&kg, &SubjectKind::Math));
        assert!(counts_in_average(&g8, &SubjectKind::parse("Art")));
    }

    #[test]
    fn default_presets() {
        assert_eq!(default_preset(&class("KG2"), &SubjectKind::Math), Preset::SimpleSum);
        assert_eq!(default_preset(&class("KG2"), &SubjectKind::Behavior), Preset::Behavior);
        assert_eq!(default_preset(&class("5"), &SubjectKind::Math), Preset::Math);
        assert_eq!(
            default_preset(&class("8"), &SubjectKind::ComputerScience),
            Preset::ComputerLower
        );
        assert_eq!(
            default_preset(&class("10 com"), &SubjectKind::ComputerScience),
            Preset::ComputerUpper
        );
        assert_eq!(
            default_preset(&class("10"), &SubjectKind::parse("History")),
            Preset::Generic
        );
    }

    #[test]
    fn letter_set_follows_level() {
        assert_eq!(class("KG1").letter_set(), LetterSet::Descriptive);
        assert_eq!(class("3").letter_set(), LetterSet::Standard);
    }
}
