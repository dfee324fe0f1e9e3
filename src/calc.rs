use crate::grading::GradingSystem;
use crate::letters::{self, CreditedMark, LetterSystem};
use crate::marks::{finite_or_none, keep_first, MarkError, MarkStore, ValidationIssue};
use crate::term::Term;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::warn;

/// Report-card 1-decimal rounding:
/// `Int(10*x + 0.5) / 10`
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

fn rounded(v: f64) -> Option<f64> {
    finite_or_none(v).map(round_off_1_decimal)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkStats {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub ready_count: usize,
    pub missing_count: usize,
    pub pass_count: usize,
}

/// Statistics over 100-point marks. Missing (NaN) marks are counted but
/// excluded from every average; with nothing ready the averages are NaN.
pub fn mark_stats<I>(marks: I, pass_mark: f64) -> MarkStats
where
    I: IntoIterator<Item = f64>,
{
    let mut ready: Vec<f64> = Vec::new();
    let mut missing_count = 0usize;
    for m in marks {
        if m.is_nan() {
            missing_count += 1;
        } else {
            ready.push(m);
        }
    }

    if ready.is_empty() {
        return MarkStats {
            mean: f64::NAN,
            median: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
            ready_count: 0,
            missing_count,
            pass_count: 0,
        };
    }

    let sum: f64 = ready.iter().sum();
    MarkStats {
        mean: sum / (ready.len() as f64),
        median: compute_median(&ready),
        min: ready.iter().copied().fold(f64::INFINITY, f64::min),
        max: ready.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        ready_count: ready.len(),
        missing_count,
        pass_count: ready.iter().filter(|m| **m >= pass_mark).count(),
    }
}

fn compute_median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[(n / 2) - 1] + sorted[n / 2]) / 2.0
    }
}

/// One subject on a student's report card.
pub struct SubjectEntry<'a> {
    pub subject: String,
    pub system: &'a GradingSystem,
    pub store: MarkStore,
    pub credits: f64,
    pub counts_in_average: bool,
    /// Problem already found while reading the marks in.
    pub prior_error: Option<MarkError>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectLine {
    pub subject: String,
    pub system: String,
    pub mark100: Option<f64>,
    pub exam: Option<f64>,
    pub ready: bool,
    pub letter: String,
    pub description: String,
    pub counts_in_average: bool,
    pub credits_attempted: f64,
    pub credits_earned: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationIssue>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GpaSummary {
    pub average: Option<f64>,
    pub letter: &'static str,
    pub point: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReport {
    pub term: Term,
    pub subjects: Vec<SubjectLine>,
    pub average: Option<f64>,
    pub counted_count: usize,
    pub missing_count: usize,
    pub passed: bool,
    pub failed_subjects: Vec<String>,
    pub gpa: GpaSummary,
}

/// Evaluates every subject for `term` and rolls the results up into a
/// report card. Subjects outside the average still get a line.
pub fn student_report(
    term: Term,
    subjects: &mut [SubjectEntry<'_>],
    letter_system: &LetterSystem,
    pass_mark: f64,
) -> StudentReport {
    let mut lines = Vec::with_capacity(subjects.len());
    let mut counted: Vec<f64> = Vec::new();
    let mut failed_subjects = Vec::new();
    let mut credited: Vec<CreditedMark> = Vec::new();

    for entry in subjects.iter_mut() {
        let mut first = entry.prior_error.take();
        keep_first(&mut first, entry.system.evaluate(term, &mut entry.store));
        let validation = first.map(|e| {
            warn!(subject = %entry.subject, error = %e, "mark validation");
            ValidationIssue::from(&e)
        });
        let mark = entry.system.get100(term, &entry.store);
        let exam = entry.system.get_exam(term, &entry.store);
        let ready = entry.system.ready(term, &entry.store);
        let (letter, description) = letter_system.get_letter_with_description(mark);
        let earned = letters::credits_earned(mark, entry.credits, pass_mark);

        if entry.counts_in_average {
            counted.push(mark);
            if !ready || mark < pass_mark {
                failed_subjects.push(entry.subject.clone());
            }
            if entry.credits > 0.0 {
                credited.push(CreditedMark {
                    mark,
                    credits: entry.credits,
                });
            }
        }

        lines.push(SubjectLine {
            subject: entry.subject.clone(),
            system: entry.system.label().to_string(),
            mark100: rounded(mark),
            exam: rounded(exam),
            ready,
            letter: letter.to_string(),
            description: description.to_string(),
            counts_in_average: entry.counts_in_average,
            credits_attempted: entry.credits,
            credits_earned: earned,
            validation,
        });
    }

    let stats = mark_stats(counted.iter().copied(), pass_mark);
    let (gpa_average, gpa_letter, gpa_point) = letters::cumulative_gpa(&credited, pass_mark);

    StudentReport {
        term,
        subjects: lines,
        average: rounded(stats.mean),
        counted_count: counted.len(),
        missing_count: stats.missing_count,
        passed: !counted.is_empty() && failed_subjects.is_empty(),
        failed_subjects,
        gpa: GpaSummary {
            average: rounded(gpa_average),
            letter: gpa_letter,
            point: finite_or_none(gpa_point),
        },
    }
}

pub struct StudentMarks {
    pub student_id: String,
    pub store: MarkStore,
    pub prior_error: Option<MarkError>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentMark {
    pub student_id: String,
    pub mark100: Option<f64>,
    pub ready: bool,
    pub letter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationIssue>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStats {
    pub term: Term,
    pub system: String,
    pub student_count: usize,
    pub ready_count: usize,
    pub missing_count: usize,
    pub pass_count: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub per_student: Vec<StudentMark>,
}

/// Per-subject class statistics for one term.
pub fn class_stats(
    term: Term,
    system: &GradingSystem,
    students: &mut [StudentMarks],
    letter_system: &LetterSystem,
    pass_mark: f64,
) -> ClassStats {
    let mut per_student = Vec::with_capacity(students.len());
    let mut marks = Vec::with_capacity(students.len());
    for student in students.iter_mut() {
        let mut first = student.prior_error.take();
        keep_first(&mut first, system.evaluate(term, &mut student.store));
        let validation = first.as_ref().map(ValidationIssue::from);
        let mark = system.get100(term, &student.store);
        marks.push(mark);
        per_student.push(StudentMark {
            student_id: student.student_id.clone(),
            mark100: rounded(mark),
            ready: system.ready(term, &student.store),
            letter: letter_system.get_letter(mark).to_string(),
            validation,
        });
    }

    let stats = mark_stats(marks, pass_mark);
    ClassStats {
        term,
        system: system.label().to_string(),
        student_count: per_student.len(),
        ready_count: stats.ready_count,
        missing_count: stats.missing_count,
        pass_count: stats.pass_count,
        mean: rounded(stats.mean),
        median: rounded(stats.median),
        min: rounded(stats.min),
        max: rounded(stats.max),
        per_student,
    }
}
