use super::layout::{self, ExamSlots, InputSlot};
use super::GradingSystem;
use crate::marks::{keep_first, quiz_sum, sum_marks, MarkError, MarkStore};
use crate::term::{Term, TermKind};
use tracing::debug;

// Quarter columns roll up into the quarter mark, two quarters and the
// semester exam into the semester mark, two semesters into the final mark.
impl GradingSystem {
    /// Recomputes every derived slot of `term` (and the terms it is built
    /// from). The store is updated even when an error is returned; the error
    /// is the first validation problem found, own row before constituents.
    pub fn evaluate(&self, term: Term, store: &mut MarkStore) -> Result<(), MarkError> {
        match term.kind() {
            TermKind::Quarter => self.evaluate_quarter(term, store),
            TermKind::Semester => self.evaluate_semester(term, store),
            TermKind::EndOfYear => self.evaluate_year(term, store),
        }
    }

    /// 100-point mark of an already evaluated term; NaN when the row is
    /// missing or shaped for a different layout.
    pub fn get100(&self, term: Term, store: &MarkStore) -> f64 {
        let Some(row) = self.current_row(term, store) else {
            return f64::NAN;
        };
        match term.kind() {
            TermKind::Quarter => row[self.quarter_slots.quarter_mark],
            TermKind::Semester => row[self.semester_slots.mark],
            TermKind::EndOfYear => row[layout::YEAR_FINAL],
        }
    }

    /// Exam-only mark on a 100-point scale.
    pub fn get_exam(&self, term: Term, store: &MarkStore) -> f64 {
        match term.kind() {
            TermKind::Quarter => {
                let (Some(row), Some((slot, max))) =
                    (self.current_row(term, store), self.quarter_slots.exam_slot())
                else {
                    return f64::NAN;
                };
                row[slot] * (100.0 / max)
            }
            TermKind::Semester => {
                let Some(row) = self.current_row(term, store) else {
                    return f64::NAN;
                };
                match &self.semester_slots.exam {
                    ExamSlots::Direct { raw, max, .. } => row[*raw] * (100.0 / max),
                    ExamSlots::WrittenPlusPractical { exam, .. } => row[*exam],
                    ExamSlots::None => f64::NAN,
                }
            }
            TermKind::EndOfYear => {
                let Some((s1, s2)) = term.constituents() else {
                    unreachable!("end of year without semesters");
                };
                sum_marks(&[
                    self.get_exam(s1, store) / 2.0,
                    self.get_exam(s2, store) / 2.0,
                ])
            }
        }
    }

    /// True once the last slot of the row, the final aggregate, is known.
    pub fn ready(&self, term: Term, store: &MarkStore) -> bool {
        self.current_row(term, store)
            .and_then(|row| row.last())
            .map(|v| !v.is_nan())
            .unwrap_or(false)
    }

    fn current_row<'a>(&self, term: Term, store: &'a MarkStore) -> Option<&'a [f64]> {
        store
            .get(term)
            .filter(|row| row.len() == self.row_len(term))
    }

    /// Brings the stored row to the right length and clears out-of-range
    /// raw marks.
    fn prepare_row(&self, term: Term, store: &mut MarkStore) -> Result<(), MarkError> {
        let columns = self.description(term);
        let row = store.row_mut(term);
        let mut first: Option<MarkError> = None;

        if row.is_empty() {
            *row = vec![f64::NAN; columns.len()];
        } else if row.len() != columns.len() {
            first = Some(MarkError::InvalidNumberOfMarks {
                term,
                expected: columns.len(),
                found: row.len(),
            });
            *row = vec![f64::NAN; columns.len()];
        }

        for (value, column) in row.iter_mut().zip(&columns) {
            if !column.editable || value.is_nan() {
                continue;
            }
            let v = *value;
            if !v.is_finite() || v < 0.0 || v > column.max {
                *value = f64::NAN;
                if first.is_none() {
                    first = Some(MarkError::InvalidRangeOfMarks {
                        term,
                        column: column.name.clone(),
                        value: v.to_string(),
                        max: Some(column.max),
                    });
                }
            }
        }

        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn evaluate_quarter(&self, term: Term, store: &mut MarkStore) -> Result<(), MarkError> {
        let result = self.prepare_row(term, store);
        let slots = &self.quarter_slots;
        let row = store.row_mut(term);

        let mut parts = Vec::with_capacity(slots.inputs.len());
        for input in &slots.inputs {
            match input {
                InputSlot::Direct { slot, scale, .. } => parts.push(row[*slot] * scale),
                InputSlot::Quiz {
                    first,
                    count,
                    keep,
                    best,
                    scale,
                } => {
                    let b = quiz_sum(&row[*first..*first + *count], *keep);
                    row[*best] = b;
                    parts.push(b * scale);
                }
            }
        }
        let quarter_mark = sum_marks(&parts);
        row[slots.quarter_mark] = quarter_mark;
        row[slots.quarter_percent] = quarter_mark * self.quarter_weight() / 100.0;

        debug!(term = %term, quarter_mark, "evaluated quarter");
        result
    }

    fn evaluate_semester(&self, term: Term, store: &mut MarkStore) -> Result<(), MarkError> {
        let Some((qa, qb)) = term.quarter_pair() else {
            unreachable!("semester without quarters: {term}");
        };
        let mut first = self.prepare_row(term, store).err();
        keep_first(&mut first, self.evaluate_quarter(qa, store));
        keep_first(&mut first, self.evaluate_quarter(qb, store));

        let percent_slot = self.quarter_slots.quarter_percent;
        let qa_percent = store.get(qa).map(|r| r[percent_slot]).unwrap_or(f64::NAN);
        let qb_percent = store.get(qb).map(|r| r[percent_slot]).unwrap_or(f64::NAN);

        let semester_weight = self.semester_weight();
        let slots = &self.semester_slots;
        let row = store.row_mut(term);

        let exam_percent = match &slots.exam {
            ExamSlots::Direct { raw, percent, max } => {
                let p = row[*raw] * (100.0 / max) * semester_weight / 100.0;
                row[*percent] = p;
                Some(p)
            }
            ExamSlots::WrittenPlusPractical {
                written,
                practical,
                exam,
                percent,
                total_max,
            } => {
                let e = sum_marks(&[row[*written], row[*practical]]) * (100.0 / total_max);
                row[*exam] = e;
                let p = e * semester_weight / 100.0;
                row[*percent] = p;
                Some(p)
            }
            ExamSlots::None => None,
        };

        row[slots.first_quarter] = qa_percent;
        row[slots.second_quarter] = qb_percent;
        let mark = match exam_percent {
            Some(p) => sum_marks(&[p, qa_percent, qb_percent]),
            None => sum_marks(&[qa_percent, qb_percent]),
        };
        row[slots.mark] = mark;

        debug!(term = %term, mark, "evaluated semester");
        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn evaluate_year(&self, term: Term, store: &mut MarkStore) -> Result<(), MarkError> {
        let Some((s1, s2)) = term.constituents() else {
            unreachable!("end of year without semesters");
        };
        let mut first = self.prepare_row(term, store).err();
        keep_first(&mut first, self.evaluate_semester(s1, store));
        keep_first(&mut first, self.evaluate_semester(s2, store));

        let s1_mark = self.get100(s1, store);
        let s2_mark = self.get100(s2, store);
        let row = store.row_mut(term);
        row[layout::YEAR_FIRST_SEMESTER] = s1_mark;
        row[layout::YEAR_SECOND_SEMESTER] = s2_mark;
        row[layout::YEAR_FINAL] = sum_marks(&[s1_mark / 2.0, s2_mark / 2.0]);

        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::presets::Preset;
    use crate::grading::{ExamComposition, QuarterColumn};
    use crate::grading::layout::Layout;

    const NAN: f64 = f64::NAN;

    fn q(n: u8) -> Term {
        Term::quarter(n).unwrap()
    }

    fn s(n: u8) -> Term {
        Term::semester(n).unwrap()
    }

    fn generic() -> GradingSystem {
        GradingSystem::from_preset(Preset::Generic, 40.0).unwrap()
    }

    /// Homework, Participation, Daily Work, 6 quizzes, Quarter Exam, then the
    /// three derived slots.
    fn full_quarter() -> Vec<f64> {
        vec![
            5.0, 5.0, 20.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, NAN, 20.0, NAN, NAN,
        ]
    }

    fn same_rows(a: &MarkStore, b: &MarkStore) -> bool {
        a.terms() == b.terms()
            && a.terms().into_iter().all(|t| {
                let (x, y) = (a.get(t).unwrap(), b.get(t).unwrap());
                x.len() == y.len()
                    && x.iter()
                        .zip(y)
                        .all(|(p, q)| (p.is_nan() && q.is_nan()) || p == q)
            })
    }

    #[test]
    fn perfect_quarter_scores_full_weight() {
        let g = generic();
        let mut store = MarkStore::new();
        store.insert(q(1), full_quarter());
        assert_eq!(g.evaluate(q(1), &mut store), Ok(()));

        let row = store.get(q(1)).unwrap();
        assert_eq!(row[9], 50.0);
        assert_eq!(row[11], 100.0);
        assert_eq!(row[12], 40.0);
        assert_eq!(g.get100(q(1), &store), 100.0);
        assert_eq!(g.get_exam(q(1), &store), 100.0);
        assert!(g.ready(q(1), &store));
    }

    #[test]
    fn quarter_with_one_missing_quiz_still_ready() {
        let g = generic();
        let mut store = MarkStore::new();
        let mut row = full_quarter();
        row[3] = NAN;
        row[4] = 7.0;
        store.insert(q(1), row);
        g.evaluate(q(1), &mut store).unwrap();
        let row = store.get(q(1)).unwrap();
        // The missing quiz is dropped as the lowest.
        assert_eq!(row[9], 47.0);
        assert_eq!(row[11], 97.0);
    }

    #[test]
    fn missing_mandatory_column_leaves_quarter_unready() {
        let g = generic();
        let mut store = MarkStore::new();
        let mut row = full_quarter();
        row[0] = NAN;
        store.insert(q(2), row);
        g.evaluate(q(2), &mut store).unwrap();
        assert!(g.get100(q(2), &store).is_nan());
        assert!(!g.ready(q(2), &store));
        // The quiz aggregate is still filled in.
        assert_eq!(store.get(q(2)).unwrap()[9], 50.0);
    }

    #[test]
    fn semester_adds_exam_and_both_quarters() {
        let g = generic();
        let mut store = MarkStore::new();
        store.insert(q(1), full_quarter());
        store.insert(q(2), full_quarter());
        store.insert(s(1), vec![100.0, NAN, NAN, NAN, NAN]);
        assert_eq!(g.evaluate(s(1), &mut store), Ok(()));

        let row = store.get(s(1)).unwrap();
        assert_eq!(row, &[100.0, 20.0, 40.0, 40.0, 100.0]);
        assert_eq!(g.get100(s(1), &store), 100.0);
        assert_eq!(g.get_exam(s(1), &store), 100.0);
        // Quarter rows were written back as a side effect.
        assert_eq!(g.get100(q(2), &store), 100.0);
    }

    #[test]
    fn semester_mark_tracks_weights() {
        for qw in [0.0, 12.5, 25.0, 40.0, 50.0] {
            let g = GradingSystem::from_preset(Preset::SimpleSum, qw).unwrap();
            let mut store = MarkStore::new();
            store.insert(q(3), vec![40.0, 30.0, NAN, NAN]);
            store.insert(q(4), vec![45.0, 35.0, NAN, NAN]);
            store.insert(s(2), vec![60.0, NAN, NAN, NAN, NAN]);
            g.evaluate(s(2), &mut store).unwrap();

            let qa = store.get(q(3)).unwrap()[3];
            let qb = store.get(q(4)).unwrap()[3];
            let exam_pct = 60.0 * g.semester_weight() / 100.0;
            assert_eq!(g.get100(s(2), &store), exam_pct + qa + qb, "qw {}", qw);
        }
    }

    #[test]
    fn year_averages_semesters() {
        let g = generic();
        let mut store = MarkStore::new();
        for n in 1..=4 {
            store.insert(q(n), full_quarter());
        }
        store.insert(s(1), vec![100.0, NAN, NAN, NAN, NAN]);
        store.insert(s(2), vec![50.0, NAN, NAN, NAN, NAN]);
        g.evaluate(Term::END_OF_YEAR, &mut store).unwrap();

        let s1 = g.get100(s(1), &store);
        let s2 = g.get100(s(2), &store);
        assert_eq!(s1, 100.0);
        assert_eq!(s2, 90.0);
        assert_eq!(g.get100(Term::END_OF_YEAR, &store), s1 / 2.0 + s2 / 2.0);
        assert_eq!(g.get_exam(Term::END_OF_YEAR, &store), 75.0);
        assert!(g.ready(Term::END_OF_YEAR, &store));
    }

    #[test]
    fn year_is_nan_when_a_semester_is_incomplete() {
        let g = generic();
        let mut store = MarkStore::new();
        store.insert(q(1), full_quarter());
        store.insert(q(2), full_quarter());
        store.insert(s(1), vec![100.0, NAN, NAN, NAN, NAN]);
        g.evaluate(Term::END_OF_YEAR, &mut store).unwrap();
        assert_eq!(g.get100(s(1), &store), 100.0);
        assert!(g.get100(Term::END_OF_YEAR, &store).is_nan());
        assert!(!g.ready(Term::END_OF_YEAR, &store));
        // Absent rows were created at the right length.
        assert_eq!(store.get(q(4)).unwrap().len(), 13);
    }

    #[test]
    fn out_of_range_mark_becomes_missing() {
        let g = generic();
        let mut store = MarkStore::new();
        let mut row = full_quarter();
        row[2] = -5.0;
        store.insert(q(1), row);
        let err = g.evaluate(q(1), &mut store).unwrap_err();
        match err {
            MarkError::InvalidRangeOfMarks { column, max, .. } => {
                assert_eq!(column, "Daily Work");
                assert_eq!(max, Some(20.0));
            }
            other => panic!("unexpected {:?}", other),
        }
        let row = store.get(q(1)).unwrap();
        assert!(row[2].is_nan());
        assert_eq!(row[0], 5.0);
        assert_eq!(row[1], 5.0);
        assert_eq!(row[9], 50.0);
        assert_eq!(row[10], 20.0);
    }

    #[test]
    fn too_high_and_infinite_marks_are_rejected() {
        let g = generic();
        let mut store = MarkStore::new();
        let mut row = full_quarter();
        row[0] = 5.5;
        row[5] = f64::INFINITY;
        store.insert(q(1), row);
        assert!(matches!(
            g.evaluate(q(1), &mut store),
            Err(MarkError::InvalidRangeOfMarks { .. })
        ));
        let row = store.get(q(1)).unwrap();
        assert!(row[0].is_nan());
        assert!(row[5].is_nan());
    }

    #[test]
    fn wrong_length_row_is_reset() {
        let g = generic();
        let mut store = MarkStore::new();
        store.insert(q(1), vec![5.0, 5.0, 20.0]);
        let err = g.evaluate(q(1), &mut store).unwrap_err();
        assert_eq!(
            err,
            MarkError::InvalidNumberOfMarks {
                term: q(1),
                expected: 13,
                found: 3
            }
        );
        let row = store.get(q(1)).unwrap();
        assert_eq!(row.len(), 13);
        assert!(row.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn empty_row_is_not_an_error() {
        let g = generic();
        let mut store = MarkStore::new();
        store.insert(q(1), vec![]);
        assert_eq!(g.evaluate(q(1), &mut store), Ok(()));
        assert_eq!(store.get(q(1)).unwrap().len(), 13);
    }

    #[test]
    fn constituent_errors_surface_through_the_semester() {
        let g = generic();
        let mut store = MarkStore::new();
        let mut bad = full_quarter();
        bad[10] = 21.0;
        store.insert(q(1), full_quarter());
        store.insert(q(2), bad);
        store.insert(s(1), vec![100.0, NAN, NAN, NAN, NAN]);
        let err = g.evaluate(s(1), &mut store).unwrap_err();
        assert_eq!(err.term(), q(2));
        assert!(g.get100(s(1), &store).is_nan());
    }

    #[test]
    fn own_row_error_wins_over_constituents() {
        let g = generic();
        let mut store = MarkStore::new();
        store.insert(q(1), vec![1.0]);
        store.insert(s(1), vec![101.0, NAN, NAN, NAN, NAN]);
        let err = g.evaluate(s(1), &mut store).unwrap_err();
        assert_eq!(err.term(), s(1));
        assert_eq!(err.code(), "invalid_range_of_marks");
    }

    #[test]
    fn evaluation_is_idempotent() {
        for p in Preset::ALL {
            let g = GradingSystem::from_preset(p, 40.0).unwrap();
            let mut store = MarkStore::new();
            for t in Term::all() {
                let row: Vec<f64> = g
                    .description(t)
                    .iter()
                    .enumerate()
                    .map(|(i, d)| if i % 5 == 4 { NAN } else { d.max * 0.75 })
                    .collect();
                store.insert(t, row);
            }
            g.evaluate(Term::END_OF_YEAR, &mut store).unwrap();
            let once = store.clone();
            g.evaluate(Term::END_OF_YEAR, &mut store).unwrap();
            assert!(same_rows(&once, &store), "{:?} not idempotent", p);
            for t in Term::all() {
                g.evaluate(t, &mut store).unwrap();
            }
            assert!(same_rows(&once, &store), "{:?} per-term not idempotent", p);
        }
    }

    #[test]
    fn evaluation_without_errors_is_idempotent_after_sanitizing() {
        let g = generic();
        let mut store = MarkStore::new();
        let mut row = full_quarter();
        row[1] = 99.0;
        store.insert(q(1), row);
        assert!(g.evaluate(q(1), &mut store).is_err());
        let once = store.clone();
        assert_eq!(g.evaluate(q(1), &mut store), Ok(()));
        assert!(same_rows(&once, &store));
    }

    #[test]
    fn written_plus_practical_is_doubled_to_100() {
        let g = GradingSystem::from_preset(Preset::ComputerLower, 40.0).unwrap();
        let mut store = MarkStore::new();
        store.insert(q(1), vec![30.0, 30.0, 40.0, NAN, NAN]);
        store.insert(q(2), vec![15.0, 15.0, 20.0, NAN, NAN]);
        store.insert(s(1), vec![20.0, 25.0, NAN, NAN, NAN, NAN, NAN]);
        g.evaluate(s(1), &mut store).unwrap();
        let row = store.get(s(1)).unwrap();
        assert_eq!(row[2], 90.0);
        assert_eq!(row[3], 18.0);
        assert_eq!(row[4], 40.0);
        assert_eq!(row[5], 20.0);
        assert_eq!(row[6], 78.0);
        assert_eq!(g.get_exam(s(1), &store), 90.0);

        // One paper missing: no exam, no semester mark.
        store.insert(s(1), vec![20.0, NAN, NAN, NAN, NAN, NAN, NAN]);
        g.evaluate(s(1), &mut store).unwrap();
        assert!(g.get_exam(s(1), &store).is_nan());
        assert!(!g.ready(s(1), &store));
    }

    #[test]
    fn no_exam_semester_is_the_two_quarters() {
        let g = GradingSystem::from_preset(Preset::Behavior, 40.0).unwrap();
        let mut store = MarkStore::new();
        store.insert(q(1), vec![40.0, 50.0, NAN, NAN]);
        store.insert(q(2), vec![30.0, 40.0, NAN, NAN]);
        g.evaluate(s(1), &mut store).unwrap();
        assert_eq!(store.get(s(1)).unwrap(), &[45.0, 35.0, 80.0]);
        assert!(g.get_exam(s(1), &store).is_nan());
        assert!(g.get_exam(q(1), &store).is_nan());
    }

    #[test]
    fn final_weights_rescale_raw_scores() {
        let layout = Layout {
            quarter_columns: vec![
                QuarterColumn::Direct {
                    name: "Essay".into(),
                    max: 20.0,
                    final_weight: Some(40.0),
                    exam: true,
                },
                QuarterColumn::Quiz {
                    name: "Quiz".into(),
                    count: 3,
                    keep: 2,
                    max: 10.0,
                    final_weight: Some(60.0),
                },
            ],
            semester_exam: ExamComposition::direct(50.0),
        };
        let g = GradingSystem::new("Essay course", layout, 25.0).unwrap();
        let mut store = MarkStore::new();
        store.insert(q(1), vec![15.0, 10.0, 5.0, 8.0, NAN, NAN, NAN]);
        g.evaluate(q(1), &mut store).unwrap();
        let row = store.get(q(1)).unwrap();
        assert_eq!(row[4], 18.0);
        // 15/20*40 + 18/20*60
        assert_eq!(row[5], 84.0);
        assert_eq!(row[6], 21.0);
        assert_eq!(g.get_exam(q(1), &store), 75.0);

        store.insert(q(2), vec![20.0, 10.0, 10.0, 10.0, NAN, NAN, NAN]);
        store.insert(s(1), vec![40.0, NAN, NAN, NAN, NAN]);
        g.evaluate(s(1), &mut store).unwrap();
        // exam 40/50 -> 80 on 100, times semester weight 50%.
        assert_eq!(store.get(s(1)).unwrap()[1], 40.0);
        assert_eq!(g.get100(s(1), &store), 40.0 + 21.0 + 25.0);
    }

    #[test]
    fn rows_shaped_for_another_layout_read_as_nan() {
        let g = generic();
        let mut store = MarkStore::new();
        store.insert(q(1), vec![1.0, 2.0, 3.0]);
        assert!(g.get100(q(1), &store).is_nan());
        assert!(!g.ready(q(1), &store));
        assert!(g.get100(s(1), &store).is_nan());
    }
}
