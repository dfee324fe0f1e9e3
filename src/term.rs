use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TermKind {
    Quarter,
    Semester,
    EndOfYear,
}

impl TermKind {
    fn key(self) -> &'static str {
        match self {
            Self::Quarter => "quarter",
            Self::Semester => "semester",
            Self::EndOfYear => "endofyear",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Quarter => "Quarter",
            Self::Semester => "Semester",
            Self::EndOfYear => "End of Year",
        }
    }

    fn valid_n(self, n: u8) -> bool {
        match self {
            Self::Quarter => (1..=4).contains(&n),
            Self::Semester => (1..=2).contains(&n),
            Self::EndOfYear => n == 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TermError {
    #[error("malformed term: {0:?}")]
    Malformed(String),
    #[error("unknown term type: {0:?}")]
    UnknownKind(String),
    #[error("{kind} number {n} is out of range")]
    OutOfRange { kind: &'static str, n: u8 },
}

/// A grading period. Ordering is chronological within a kind, kinds ordered
/// quarter < semester < end of year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Term {
    kind: TermKind,
    n: u8,
}

impl Term {
    pub const END_OF_YEAR: Term = Term {
        kind: TermKind::EndOfYear,
        n: 0,
    };

    pub fn new(kind: TermKind, n: u8) -> Result<Self, TermError> {
        if !kind.valid_n(n) {
            return Err(TermError::OutOfRange {
                kind: kind.label(),
                n,
            });
        }
        Ok(Self { kind, n })
    }

    pub fn quarter(n: u8) -> Result<Self, TermError> {
        Self::new(TermKind::Quarter, n)
    }

    pub fn semester(n: u8) -> Result<Self, TermError> {
        Self::new(TermKind::Semester, n)
    }

    pub fn kind(&self) -> TermKind {
        self.kind
    }

    pub fn n(&self) -> u8 {
        self.n
    }

    /// All seven terms in chronological order of when they close.
    pub fn all() -> Vec<Term> {
        let mut out = Vec::with_capacity(7);
        for n in 1..=4 {
            out.push(Term {
                kind: TermKind::Quarter,
                n,
            });
        }
        for n in 1..=2 {
            out.push(Term {
                kind: TermKind::Semester,
                n,
            });
        }
        out.push(Self::END_OF_YEAR);
        out
    }

    /// Canonical storage key, e.g. `quarter-3` or `endofyear`.
    pub fn key(&self) -> String {
        match self.kind {
            TermKind::EndOfYear => self.kind.key().to_string(),
            _ => format!("{}-{}", self.kind.key(), self.n),
        }
    }

    /// Ordinal of the semester this term belongs to; 0 for end of year.
    pub fn semester_number(&self) -> u8 {
        match self.kind {
            TermKind::Quarter => self.n.div_ceil(2),
            TermKind::Semester => self.n,
            TermKind::EndOfYear => 0,
        }
    }

    /// The two quarters a semester is composed of. `None` for any other kind.
    pub fn quarter_pair(&self) -> Option<(Term, Term)> {
        if self.kind != TermKind::Semester {
            return None;
        }
        let first = 2 * self.n - 1;
        Some((
            Term {
                kind: TermKind::Quarter,
                n: first,
            },
            Term {
                kind: TermKind::Quarter,
                n: first + 1,
            },
        ))
    }

    /// The two terms this term is derived from: quarters for a semester,
    /// semesters for the end of year, nothing for a quarter.
    pub fn constituents(&self) -> Option<(Term, Term)> {
        match self.kind {
            TermKind::Quarter => None,
            TermKind::Semester => self.quarter_pair(),
            TermKind::EndOfYear => Some((
                Term {
                    kind: TermKind::Semester,
                    n: 1,
                },
                Term {
                    kind: TermKind::Semester,
                    n: 2,
                },
            )),
        }
    }

    pub fn parse(s: &str) -> Result<Self, TermError> {
        let t = s.trim();
        if t.is_empty() {
            return Err(TermError::Malformed(s.to_string()));
        }
        let lower = t.to_ascii_lowercase();
        let compact: String = lower.chars().filter(|c| !c.is_whitespace()).collect();

        if compact == "endofyear" || compact == "endofyear-0" {
            return Ok(Self::END_OF_YEAR);
        }

        // "quarter-3" or "quarter 3"
        let split = lower
            .split_once('-')
            .or_else(|| lower.split_once(char::is_whitespace));
        let Some((kind_s, n_s)) = split else {
            if lower.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(TermError::UnknownKind(t.to_string()));
            }
            return Err(TermError::Malformed(t.to_string()));
        };
        let kind = match kind_s.trim() {
            "quarter" => TermKind::Quarter,
            "semester" => TermKind::Semester,
            "endofyear" => TermKind::EndOfYear,
            other => return Err(TermError::UnknownKind(other.to_string())),
        };
        let n: u8 = n_s
            .trim()
            .parse()
            .map_err(|_| TermError::Malformed(t.to_string()))?;
        Self::new(kind, n)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TermKind::EndOfYear => f.write_str(self.kind.label()),
            _ => write!(f, "{} {}", self.kind.label(), self.n),
        }
    }
}

impl FromStr for Term {
    type Err = TermError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Term {
    type Error = TermError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Term> for String {
    fn from(t: Term) -> Self {
        t.key()
    }
}
