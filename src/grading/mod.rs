pub mod engine;
pub mod layout;
pub mod presets;

use crate::term::{Term, TermKind};
use layout::{ColumnDescriptor, Layout, QuarterSlots, SemesterSlots};
use presets::Preset;
use serde::{Deserialize, Serialize};

pub use layout::{ExamComposition, QuarterColumn};

pub const MAX_QUARTER_WEIGHT: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("quarter weight {0} must be within 0..=50")]
    QuarterWeightOutOfRange(f64),
    #[error("a grading system needs at least one quarter column")]
    EmptyLayout,
    #[error("every column needs a name")]
    UnnamedColumn,
    #[error("column {column:?}: maximum {max} must be positive")]
    NonPositiveMax { column: String, max: f64 },
    #[error("column {column:?}: cannot keep best {keep} of {count}")]
    InvalidQuizKeep {
        column: String,
        keep: usize,
        count: usize,
    },
    #[error("column {column:?}: {count} quizzes is more than {max}")]
    TooManyQuizzes {
        column: String,
        count: usize,
        max: usize,
    },
    #[error("a quarter row of {len} marks is longer than {max}")]
    RowTooLong { len: usize, max: usize },
    #[error("column {column:?}: final weight {weight} must be a non-negative number")]
    BadFinalWeight { column: String, weight: f64 },
    #[error("final weights add up to {total}, expected 100")]
    WeightsDoNotSumTo100 { total: f64 },
    #[error("letter table {name:?}: {reason}")]
    InvalidLetterTable { name: String, reason: String },
}

/// Wire shape of a grading-system configuration for one
/// (school year, class, subject).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemConfig {
    #[serde(default)]
    pub quarter_weight: Option<f64>,
    #[serde(flatten)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "engine", rename_all = "camelCase")]
pub enum EngineConfig {
    Preset {
        preset: Preset,
    },
    #[serde(rename_all = "camelCase")]
    Subject {
        #[serde(default)]
        label: Option<String>,
        quarter_columns: Vec<QuarterColumn>,
        semester_exam: ExamComposition,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradingSystem {
    label: String,
    layout: Layout,
    quarter_weight: f64,
    pub(crate) quarter_slots: QuarterSlots,
    pub(crate) semester_slots: SemesterSlots,
}

impl GradingSystem {
    /// Validates the layout and weight and resolves the row slot maps.
    pub fn new(
        label: impl Into<String>,
        layout: Layout,
        quarter_weight: f64,
    ) -> Result<Self, ConfigError> {
        layout.validate()?;
        // Without a semester exam the quarters carry the whole semester.
        let quarter_weight = if layout.semester_exam.has_exam() {
            quarter_weight
        } else {
            MAX_QUARTER_WEIGHT
        };
        if !quarter_weight.is_finite() || !(0.0..=MAX_QUARTER_WEIGHT).contains(&quarter_weight) {
            return Err(ConfigError::QuarterWeightOutOfRange(quarter_weight));
        }
        let quarter_slots = QuarterSlots::resolve(&layout);
        let semester_slots = SemesterSlots::resolve(&layout);
        Ok(Self {
            label: label.into(),
            layout,
            quarter_weight,
            quarter_slots,
            semester_slots,
        })
    }

    pub fn from_preset(preset: Preset, quarter_weight: f64) -> Result<Self, ConfigError> {
        let qw = preset.pinned_quarter_weight().unwrap_or(quarter_weight);
        Self::new(preset.label(), preset.layout(), qw)
    }

    pub fn from_config(cfg: &SystemConfig, default_quarter_weight: f64) -> Result<Self, ConfigError> {
        let qw = cfg.quarter_weight.unwrap_or(default_quarter_weight);
        match &cfg.engine {
            EngineConfig::Preset { preset } => Self::from_preset(*preset, qw),
            EngineConfig::Subject {
                label,
                quarter_columns,
                semester_exam,
            } => Self::new(
                label.clone().unwrap_or_else(|| "Subject".to_string()),
                Layout {
                    quarter_columns: quarter_columns.clone(),
                    semester_exam: semester_exam.clone(),
                },
                qw,
            ),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn quarter_weight(&self) -> f64 {
        self.quarter_weight
    }

    pub fn semester_weight(&self) -> f64 {
        100.0 - 2.0 * self.quarter_weight
    }

    /// Columns of a term's row, in slot order.
    pub fn description(&self, term: Term) -> Vec<ColumnDescriptor> {
        match term.kind() {
            TermKind::Quarter => layout::quarter_descriptors(&self.layout, self.quarter_weight),
            TermKind::Semester => {
                let Some((a, b)) = term.quarter_pair() else {
                    unreachable!("semester without quarters: {term}");
                };
                layout::semester_descriptors(
                    &self.layout,
                    &a.to_string(),
                    &b.to_string(),
                    self.quarter_weight,
                    self.semester_weight(),
                )
            }
            TermKind::EndOfYear => layout::year_descriptors(),
        }
    }

    pub fn row_len(&self, term: Term) -> usize {
        match term.kind() {
            TermKind::Quarter => self.quarter_slots.len,
            TermKind::Semester => self.semester_slots.len,
            TermKind::EndOfYear => layout::YEAR_LEN,
        }
    }
}
