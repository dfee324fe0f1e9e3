use crate::grading::ConfigError;
use serde::{Deserialize, Serialize};

pub const NOT_AVAILABLE: &str = "N/A";
/// Returned when a table has no matching threshold. Unreachable for a
/// validated table.
pub const NO_MATCH: &str = "ERR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LetterSet {
    Standard,
    Descriptive,
}

impl LetterSet {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Some(Self::Standard),
            "descriptive" | "kg" | "kindergarten" => Some(Self::Descriptive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterThreshold {
    pub letter: String,
    pub description: String,
    pub minimum_mark: f64,
}

/// Ordered thresholds, highest first, covering 0..=100 without gaps.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterSystem {
    name: String,
    thresholds: Vec<LetterThreshold>,
}

impl LetterSystem {
    pub fn new(
        name: impl Into<String>,
        thresholds: Vec<LetterThreshold>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let invalid = |reason: &str| ConfigError::InvalidLetterTable {
            name: name.clone(),
            reason: reason.to_string(),
        };
        let Some(first) = thresholds.first() else {
            return Err(invalid("table is empty"));
        };
        if !(0.0..=100.0).contains(&first.minimum_mark) {
            return Err(invalid("highest threshold must be within 0..=100"));
        }
        for pair in thresholds.windows(2) {
            if !(pair[0].minimum_mark > pair[1].minimum_mark) {
                return Err(invalid("thresholds must strictly decrease"));
            }
        }
        if thresholds.iter().any(|t| t.letter.trim().is_empty()) {
            return Err(invalid("every threshold needs a letter"));
        }
        if thresholds.last().map(|t| t.minimum_mark) != Some(0.0) {
            return Err(invalid("lowest threshold must be 0"));
        }
        Ok(Self { name, thresholds })
    }

    pub fn builtin(set: LetterSet) -> Self {
        let rows: &[(&str, &str, f64)] = match set {
            LetterSet::Standard => &[
                ("A", "Excellent", 90.0),
                ("B", "Very Good", 80.0),
                ("C", "Good", 70.0),
                ("D", "Satisfactory", 60.0),
                ("F", "Fail", 0.0),
            ],
            LetterSet::Descriptive => &[
                ("E", "Exceeding", 85.0),
                ("M", "Meeting", 70.0),
                ("P", "Progressing", 50.0),
                ("B", "Beginning", 0.0),
            ],
        };
        let name = match set {
            LetterSet::Standard => "standard",
            LetterSet::Descriptive => "descriptive",
        };
        Self {
            name: name.to_string(),
            thresholds: rows
                .iter()
                .map(|(letter, description, min)| LetterThreshold {
                    letter: letter.to_string(),
                    description: description.to_string(),
                    minimum_mark: *min,
                })
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn thresholds(&self) -> &[LetterThreshold] {
        &self.thresholds
    }

    fn lookup(&self, mark: f64) -> Option<&LetterThreshold> {
        self.thresholds.iter().find(|t| t.minimum_mark <= mark)
    }

    pub fn get_letter(&self, mark: f64) -> &str {
        if mark.is_nan() {
            return NOT_AVAILABLE;
        }
        self.lookup(mark).map(|t| t.letter.as_str()).unwrap_or(NO_MATCH)
    }

    /// Letter and its description, for report cards.
    pub fn get_letter_with_description(&self, mark: f64) -> (&str, &str) {
        if mark.is_nan() {
            return (NOT_AVAILABLE, "");
        }
        match self.lookup(mark) {
            Some(t) => (t.letter.as_str(), t.description.as_str()),
            None => (NO_MATCH, ""),
        }
    }
}

const GPA_BANDS: [(&str, f64, f64); 13] = [
    ("A+", 97.0, 4.0),
    ("A", 93.0, 4.0),
    ("A-", 90.0, 3.7),
    ("B+", 87.0, 3.4),
    ("B", 83.0, 3.1),
    ("B-", 80.0, 2.8),
    ("C+", 77.0, 2.5),
    ("C", 73.0, 2.2),
    ("C-", 70.0, 1.9),
    ("D+", 67.0, 1.6),
    ("D", 63.0, 1.3),
    ("D-", 60.0, 1.0),
    ("F", 0.0, 0.0),
];

pub const CREDIT_PASS_MARK: f64 = 60.0;

/// Letter and 4.0-scale grade point for a 100-point mark.
pub fn gpa_av_wgp(mark: f64) -> (&'static str, f64) {
    if mark.is_nan() || !(0.0..=100.0).contains(&mark) {
        return (NOT_AVAILABLE, f64::NAN);
    }
    for (letter, min, point) in GPA_BANDS {
        if mark >= min {
            return (letter, point);
        }
    }
    (NOT_AVAILABLE, f64::NAN)
}

/// Full credit at or above `pass_mark`, nothing otherwise.
pub fn credits_earned(mark: f64, credits: f64, pass_mark: f64) -> f64 {
    if mark >= pass_mark {
        credits
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreditedMark {
    pub mark: f64,
    pub credits: f64,
}

/// Cumulative GPA: Σ(earned credits × mark) / Σ(attempted credits), mapped
/// through [`gpa_av_wgp`]. Any missing mark, or no attempted credits, gives
/// `("N/A", NaN)`.
pub fn cumulative_gpa(subjects: &[CreditedMark], pass_mark: f64) -> (f64, &'static str, f64) {
    let mut weighted = 0.0_f64;
    let mut attempted = 0.0_f64;
    for s in subjects {
        if s.mark.is_nan() {
            return (f64::NAN, NOT_AVAILABLE, f64::NAN);
        }
        weighted += credits_earned(s.mark, s.credits, pass_mark) * s.mark;
        attempted += s.credits;
    }
    if attempted <= 0.0 {
        return (f64::NAN, NOT_AVAILABLE, f64::NAN);
    }
    let average = weighted / attempted;
    let (letter, point) = gpa_av_wgp(average);
    (average, letter, point)
}
