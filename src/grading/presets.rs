use super::layout::{ExamComposition, Layout, QuarterColumn};
use serde::{Deserialize, Serialize};

/// Fixed grading systems, each one only a column layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Preset {
    Generic,
    Math,
    English,
    Science,
    PhysicalEducation,
    SimpleSum,
    ComputerLower,
    ComputerUpper,
    Ucmas,
    Behavior,
}

impl Preset {
    pub const ALL: [Preset; 10] = [
        Preset::Generic,
        Preset::Math,
        Preset::English,
        Preset::Science,
        Preset::PhysicalEducation,
        Preset::SimpleSum,
        Preset::ComputerLower,
        Preset::ComputerUpper,
        Preset::Ucmas,
        Preset::Behavior,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Generic => "Generic",
            Self::Math => "Mathematics",
            Self::English => "English",
            Self::Science => "Science",
            Self::PhysicalEducation => "Physical Education",
            Self::SimpleSum => "Simple Sum",
            Self::ComputerLower => "Computer (lower grades)",
            Self::ComputerUpper => "Computer (upper grades)",
            Self::Ucmas => "UCMAS",
            Self::Behavior => "Behavior",
        }
    }

    /// Quarter weight this preset always uses, whatever the school year says.
    pub fn pinned_quarter_weight(self) -> Option<f64> {
        match self {
            Self::Ucmas => Some(25.0),
            _ => None,
        }
    }

    pub fn layout(self) -> Layout {
        use QuarterColumn as C;
        let (quarter_columns, semester_exam) = match self {
            Self::Generic => (
                vec![
                    C::direct("Homework", 5.0),
                    C::direct("Participation", 5.0),
                    C::direct("Daily Work", 20.0),
                    C::quiz("Quiz", 6, 5, 10.0),
                    C::exam("Quarter Exam", 20.0),
                ],
                ExamComposition::direct(100.0),
            ),
            Self::Math => (
                vec![
                    C::direct("Homework", 10.0),
                    C::direct("Classwork", 10.0),
                    C::quiz("Quiz", 5, 4, 10.0),
                    C::exam("Quarter Exam", 40.0),
                ],
                ExamComposition::direct(100.0),
            ),
            Self::English => (
                vec![
                    C::direct("Reading", 10.0),
                    C::direct("Writing", 15.0),
                    C::direct("Speaking", 10.0),
                    C::quiz("Quiz", 4, 3, 10.0),
                    C::exam("Quarter Exam", 35.0),
                ],
                ExamComposition::direct(100.0),
            ),
            Self::Science => (
                vec![
                    C::direct("Homework", 10.0),
                    C::direct("Lab Work", 20.0),
                    C::quiz("Quiz", 6, 5, 10.0),
                    C::exam("Quarter Exam", 20.0),
                ],
                ExamComposition::direct(100.0),
            ),
            Self::PhysicalEducation => (
                vec![
                    C::direct("Participation", 40.0),
                    C::direct("Skills", 40.0),
                    C::direct("Fitness Test", 20.0),
                ],
                ExamComposition::None,
            ),
            Self::SimpleSum => (
                vec![C::direct("Classwork", 50.0), C::exam("Quarter Exam", 50.0)],
                ExamComposition::direct(100.0),
            ),
            Self::ComputerLower => (
                vec![
                    C::direct("Classwork", 30.0),
                    C::direct("Project", 30.0),
                    C::exam("Quarter Exam", 40.0),
                ],
                ExamComposition::WrittenPlusPractical {
                    written_max: 25.0,
                    practical_max: 25.0,
                },
            ),
            Self::ComputerUpper => (
                vec![
                    C::direct("Homework", 10.0),
                    C::quiz("Quiz", 4, 3, 10.0),
                    C::direct("Project", 20.0),
                    C::exam("Practical Exam", 40.0),
                ],
                ExamComposition::WrittenPlusPractical {
                    written_max: 50.0,
                    practical_max: 50.0,
                },
            ),
            Self::Ucmas => (
                vec![C::direct("Speed", 50.0), C::direct("Accuracy", 50.0)],
                ExamComposition::direct(100.0),
            ),
            Self::Behavior => (
                vec![C::direct("Conduct", 50.0), C::direct("Effort", 50.0)],
                ExamComposition::None,
            ),
        };
        Layout {
            quarter_columns,
            semester_exam,
        }
    }
}
