use super::ConfigError;
use serde::{Deserialize, Serialize};

/// One gradable column as shown in a mark-entry grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub name: String,
    pub max: f64,
    pub editable: bool,
    /// Contribution to the 100-point quarter mark, for columns that feed it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_weight: Option<f64>,
}

impl ColumnDescriptor {
    fn input(name: impl Into<String>, max: f64) -> Self {
        Self {
            name: name.into(),
            max,
            editable: true,
            final_weight: None,
        }
    }

    fn derived(name: impl Into<String>, max: f64) -> Self {
        Self {
            name: name.into(),
            max,
            editable: false,
            final_weight: None,
        }
    }

    fn weighted(mut self, w: f64) -> Self {
        self.final_weight = Some(w);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum QuarterColumn {
    /// A single raw score out of `max`.
    #[serde(rename_all = "camelCase")]
    Direct {
        name: String,
        max: f64,
        #[serde(default)]
        final_weight: Option<f64>,
        #[serde(default)]
        exam: bool,
    },
    /// `count` scores out of `max` each, reduced to the best `keep`.
    #[serde(rename_all = "camelCase")]
    Quiz {
        name: String,
        count: usize,
        keep: usize,
        max: f64,
        #[serde(default)]
        final_weight: Option<f64>,
    },
}

impl QuarterColumn {
    pub fn direct(name: &str, max: f64) -> Self {
        Self::Direct {
            name: name.to_string(),
            max,
            final_weight: None,
            exam: false,
        }
    }

    pub fn exam(name: &str, max: f64) -> Self {
        Self::Direct {
            name: name.to_string(),
            max,
            final_weight: None,
            exam: true,
        }
    }

    pub fn quiz(name: &str, count: usize, keep: usize, max: f64) -> Self {
        Self::Quiz {
            name: name.to_string(),
            count,
            keep,
            max,
            final_weight: None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Direct { name, .. } | Self::Quiz { name, .. } => name,
        }
    }

    /// Points this column is worth out of 100. Defaults to its raw maximum.
    pub fn final_weight(&self) -> f64 {
        match self {
            Self::Direct {
                max, final_weight, ..
            } => final_weight.unwrap_or(*max),
            Self::Quiz {
                keep,
                max,
                final_weight,
                ..
            } => final_weight.unwrap_or(*keep as f64 * *max),
        }
    }
}

/// How a semester's exam score is formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExamComposition {
    #[serde(rename_all = "camelCase")]
    Direct { name: String, max: f64 },
    /// Two papers summed and rescaled to 100.
    #[serde(rename_all = "camelCase")]
    WrittenPlusPractical { written_max: f64, practical_max: f64 },
    /// No semester exam; the two quarters carry the whole semester.
    None,
}

impl ExamComposition {
    pub fn direct(max: f64) -> Self {
        Self::Direct {
            name: "Semester Exam".to_string(),
            max,
        }
    }

    pub fn has_exam(&self) -> bool {
        !matches!(self, Self::None)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub quarter_columns: Vec<QuarterColumn>,
    pub semester_exam: ExamComposition,
}

const WEIGHT_TOLERANCE: f64 = 1e-6;
pub const MAX_QUIZ_COUNT: usize = 50;
/// Editable and derived slots of one quarter row together.
pub const MAX_QUARTER_ROW_LEN: usize = 256;

fn positive(name: &str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositiveMax {
            column: name.to_string(),
            max: v,
        })
    }
}

impl Layout {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quarter_columns.is_empty() {
            return Err(ConfigError::EmptyLayout);
        }
        let mut total = 0.0_f64;
        // Quarter Mark and Quarter % close every row.
        let mut row_len = 2usize;
        for col in &self.quarter_columns {
            if col.name().trim().is_empty() {
                return Err(ConfigError::UnnamedColumn);
            }
            match col {
                QuarterColumn::Direct { name, max, .. } => positive(name, *max)?,
                QuarterColumn::Quiz {
                    name,
                    count,
                    keep,
                    max,
                    ..
                } => {
                    positive(name, *max)?;
                    if *count > MAX_QUIZ_COUNT {
                        return Err(ConfigError::TooManyQuizzes {
                            column: name.clone(),
                            count: *count,
                            max: MAX_QUIZ_COUNT,
                        });
                    }
                    if *count == 0 || *keep == 0 || keep > count {
                        return Err(ConfigError::InvalidQuizKeep {
                            column: name.clone(),
                            keep: *keep,
                            count: *count,
                        });
                    }
                }
            }
            row_len += match col {
                QuarterColumn::Direct { .. } => 1,
                QuarterColumn::Quiz { count, .. } => count + 1,
            };
            if row_len > MAX_QUARTER_ROW_LEN {
                return Err(ConfigError::RowTooLong {
                    len: row_len,
                    max: MAX_QUARTER_ROW_LEN,
                });
            }
            let w = col.final_weight();
            if !w.is_finite() || w < 0.0 {
                return Err(ConfigError::BadFinalWeight {
                    column: col.name().to_string(),
                    weight: w,
                });
            }
            total += w;
        }
        if (total - 100.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConfigError::WeightsDoNotSumTo100 { total });
        }
        match &self.semester_exam {
            ExamComposition::Direct { name, max } => positive(name, *max)?,
            ExamComposition::WrittenPlusPractical {
                written_max,
                practical_max,
            } => {
                positive("Written", *written_max)?;
                positive("Practical", *practical_max)?;
            }
            ExamComposition::None => {}
        }
        Ok(())
    }
}

// Slot maps are resolved once per system so the engine never does index
// arithmetic on literal offsets.

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum InputSlot {
    Direct {
        slot: usize,
        max: f64,
        scale: f64,
        exam: bool,
    },
    Quiz {
        first: usize,
        count: usize,
        keep: usize,
        best: usize,
        scale: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QuarterSlots {
    pub inputs: Vec<InputSlot>,
    pub quarter_mark: usize,
    pub quarter_percent: usize,
    pub len: usize,
}

impl QuarterSlots {
    pub fn resolve(layout: &Layout) -> Self {
        let mut inputs = Vec::with_capacity(layout.quarter_columns.len());
        let mut next = 0usize;
        for col in &layout.quarter_columns {
            let w = col.final_weight();
            match col {
                QuarterColumn::Direct { max, exam, .. } => {
                    inputs.push(InputSlot::Direct {
                        slot: next,
                        max: *max,
                        scale: w / *max,
                        exam: *exam,
                    });
                    next += 1;
                }
                QuarterColumn::Quiz {
                    count, keep, max, ..
                } => {
                    inputs.push(InputSlot::Quiz {
                        first: next,
                        count: *count,
                        keep: *keep,
                        best: next + count,
                        scale: w / (*keep as f64 * *max),
                    });
                    next += count + 1;
                }
            }
        }
        Self {
            inputs,
            quarter_mark: next,
            quarter_percent: next + 1,
            len: next + 2,
        }
    }

    pub fn exam_slot(&self) -> Option<(usize, f64)> {
        self.inputs.iter().find_map(|s| match s {
            InputSlot::Direct {
                slot,
                max,
                exam: true,
                ..
            } => Some((*slot, *max)),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ExamSlots {
    Direct {
        raw: usize,
        percent: usize,
        max: f64,
    },
    WrittenPlusPractical {
        written: usize,
        practical: usize,
        exam: usize,
        percent: usize,
        total_max: f64,
    },
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SemesterSlots {
    pub exam: ExamSlots,
    pub first_quarter: usize,
    pub second_quarter: usize,
    pub mark: usize,
    pub len: usize,
}

impl SemesterSlots {
    pub fn resolve(layout: &Layout) -> Self {
        let (exam, next) = match &layout.semester_exam {
            ExamComposition::Direct { max, .. } => (
                ExamSlots::Direct {
                    raw: 0,
                    percent: 1,
                    max: *max,
                },
                2,
            ),
            ExamComposition::WrittenPlusPractical {
                written_max,
                practical_max,
            } => (
                ExamSlots::WrittenPlusPractical {
                    written: 0,
                    practical: 1,
                    exam: 2,
                    percent: 3,
                    total_max: written_max + practical_max,
                },
                4,
            ),
            ExamComposition::None => (ExamSlots::None, 0),
        };
        Self {
            exam,
            first_quarter: next,
            second_quarter: next + 1,
            mark: next + 2,
            len: next + 3,
        }
    }
}

pub(crate) const YEAR_FIRST_SEMESTER: usize = 0;
pub(crate) const YEAR_SECOND_SEMESTER: usize = 1;
pub(crate) const YEAR_FINAL: usize = 2;
pub(crate) const YEAR_LEN: usize = 3;

pub(crate) fn quarter_descriptors(
    layout: &Layout,
    quarter_weight: f64,
) -> Vec<ColumnDescriptor> {
    let mut out = Vec::new();
    for col in &layout.quarter_columns {
        let w = col.final_weight();
        match col {
            QuarterColumn::Direct { name, max, .. } => {
                out.push(ColumnDescriptor::input(name.clone(), *max).weighted(w));
            }
            QuarterColumn::Quiz {
                name,
                count,
                keep,
                max,
                ..
            } => {
                for i in 1..=*count {
                    out.push(ColumnDescriptor::input(format!("{} {}", name, i), *max));
                }
                out.push(
                    ColumnDescriptor::derived(
                        format!("{} (best {} of {})", name, keep, count),
                        *keep as f64 * *max,
                    )
                    .weighted(w),
                );
            }
        }
    }
    out.push(ColumnDescriptor::derived("Quarter Mark", 100.0));
    out.push(ColumnDescriptor::derived("Quarter %", quarter_weight));
    out
}

pub(crate) fn semester_descriptors(
    layout: &Layout,
    first_quarter_label: &str,
    second_quarter_label: &str,
    quarter_weight: f64,
    semester_weight: f64,
) -> Vec<ColumnDescriptor> {
    let mut out = Vec::new();
    match &layout.semester_exam {
        ExamComposition::Direct { name, max } => {
            out.push(ColumnDescriptor::input(name.clone(), *max));
            out.push(ColumnDescriptor::derived(
                format!("{} %", name),
                semester_weight,
            ));
        }
        ExamComposition::WrittenPlusPractical {
            written_max,
            practical_max,
        } => {
            out.push(ColumnDescriptor::input("Written", *written_max));
            out.push(ColumnDescriptor::input("Practical", *practical_max));
            out.push(ColumnDescriptor::derived("Semester Exam", 100.0));
            out.push(ColumnDescriptor::derived("Semester Exam %", semester_weight));
        }
        ExamComposition::None => {}
    }
    out.push(ColumnDescriptor::derived(
        format!("{} %", first_quarter_label),
        quarter_weight,
    ));
    out.push(ColumnDescriptor::derived(
        format!("{} %", second_quarter_label),
        quarter_weight,
    ));
    out.push(ColumnDescriptor::derived("Semester Mark", 100.0));
    out
}

pub(crate) fn year_descriptors() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::derived("Semester 1 Mark", 100.0),
        ColumnDescriptor::derived("Semester 2 Mark", 100.0),
        ColumnDescriptor::derived("Final Mark", 100.0),
    ]
}
