use crate::term::{Term, TermError};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Recoverable validation problems raised while evaluating a row. The store
/// is always left holding a sanitized row when one of these is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarkError {
    #[error("{term}: expected {expected} marks, found {found}; row was reset")]
    InvalidNumberOfMarks {
        term: Term,
        expected: usize,
        found: usize,
    },
    #[error("{term}: mark {value} for {column:?} {}", range_problem(.max))]
    InvalidRangeOfMarks {
        term: Term,
        column: String,
        value: String,
        /// `None` when the value was not a number at all.
        max: Option<f64>,
    },
}

impl MarkError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidNumberOfMarks { .. } => "invalid_number_of_marks",
            Self::InvalidRangeOfMarks { .. } => "invalid_range_of_marks",
        }
    }

    pub fn term(&self) -> Term {
        match self {
            Self::InvalidNumberOfMarks { term, .. } | Self::InvalidRangeOfMarks { term, .. } => {
                *term
            }
        }
    }
}

fn range_problem(max: &Option<f64>) -> String {
    match max {
        Some(m) => format!("is outside 0..={}", m),
        None => "is not a number".to_string(),
    }
}

/// Keeps the first error seen; later ones are dropped.
pub fn keep_first(slot: &mut Option<MarkError>, next: Result<(), MarkError>) {
    if let Err(e) = next {
        if slot.is_none() {
            *slot = Some(e);
        }
    }
}

/// Strict sum: NaN if any operand is NaN.
pub fn sum_marks(values: &[f64]) -> f64 {
    let mut total = 0.0_f64;
    for v in values {
        if v.is_nan() {
            return f64::NAN;
        }
        total += *v;
    }
    total
}

/// Sum of the best `keep` scores. Tolerates at most one missing score, which
/// ranks as zero; two or more missing scores make the result NaN.
pub fn quiz_sum(scores: &[f64], keep: usize) -> f64 {
    let missing = scores.iter().filter(|v| v.is_nan()).count();
    if missing > 1 {
        return f64::NAN;
    }
    let mut ranked: Vec<f64> = scores
        .iter()
        .map(|v| if v.is_nan() { 0.0 } else { *v })
        .collect();
    ranked.sort_by(|a, b| b.total_cmp(a));
    ranked.iter().take(keep).sum()
}

/// One student's rows for one subject, keyed by term.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkStore {
    rows: HashMap<Term, Vec<f64>>,
}

impl MarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, term: Term) -> Option<&[f64]> {
        self.rows.get(&term).map(|r| r.as_slice())
    }

    pub fn insert(&mut self, term: Term, row: Vec<f64>) {
        self.rows.insert(term, row);
    }

    pub fn row_mut(&mut self, term: Term) -> &mut Vec<f64> {
        self.rows.entry(term).or_default()
    }

    pub fn terms(&self) -> Vec<Term> {
        let mut out: Vec<Term> = self.rows.keys().copied().collect();
        out.sort();
        out
    }

    /// Builds a store from the wire shape `{ "quarter-1": [5, null, "7"], ... }`.
    ///
    /// `null` and blank strings are missing marks. Numeric strings are parsed.
    /// Anything else is malformed: it is stored as NaN and reported as an
    /// out-of-range mark so the caller can surface it without failing.
    pub fn from_wire(
        raw: &serde_json::Map<String, Value>,
    ) -> Result<(Self, Option<MarkError>), WireError> {
        let mut store = MarkStore::new();
        let mut first_err: Option<MarkError> = None;
        for (key, row_v) in raw {
            let term = Term::parse(key).map_err(|e| WireError::Term(key.clone(), e))?;
            let row = match row_v {
                Value::Null => Vec::new(),
                Value::Array(items) => {
                    let mut row = Vec::with_capacity(items.len());
                    for (idx, item) in items.iter().enumerate() {
                        match parse_wire_mark(item) {
                            Some(v) => row.push(v),
                            None => {
                                row.push(f64::NAN);
                                if first_err.is_none() {
                                    first_err = Some(MarkError::InvalidRangeOfMarks {
                                        term,
                                        column: format!("#{}", idx),
                                        value: item.to_string(),
                                        max: None,
                                    });
                                }
                            }
                        }
                    }
                    row
                }
                _ => return Err(WireError::RowNotArray(key.clone())),
            };
            store.insert(term, row);
        }
        Ok((store, first_err))
    }

    /// Wire shape with NaN written as `null`.
    pub fn to_wire(&self) -> BTreeMap<String, Vec<Option<f64>>> {
        let mut out = BTreeMap::new();
        for term in self.terms() {
            let row = &self.rows[&term];
            out.insert(term.key(), row.iter().map(|v| finite_or_none(*v)).collect());
        }
        out
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("bad term key {0:?}: {1}")]
    Term(String, TermError),
    #[error("marks for {0:?} must be an array or null")]
    RowNotArray(String),
}

/// `Some(NaN)` means "missing"; `None` means malformed.
fn parse_wire_mark(v: &Value) -> Option<f64> {
    match v {
        Value::Null => Some(f64::NAN),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                Some(f64::NAN)
            } else {
                t.parse::<f64>().ok().filter(|v| !v.is_nan())
            }
        }
        _ => None,
    }
}

pub fn finite_or_none(v: f64) -> Option<f64> {
    if v.is_finite() {
        Some(v)
    } else {
        None
    }
}

/// A [`MarkError`] as reported back to collaborators.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub code: &'static str,
    pub term: Term,
    pub message: String,
}

impl From<&MarkError> for ValidationIssue {
    fn from(e: &MarkError) -> Self {
        Self {
            code: e.code(),
            term: e.term(),
            message: e.to_string(),
        }
    }
}
