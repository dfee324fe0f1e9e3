use crate::calc::{self, StudentMarks, SubjectEntry};
use crate::classes::{self, SubjectKind};
use crate::grading::GradingSystem;
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    letter_system_for, parse_class, parse_store, parse_term, require_str, resolve_system,
    HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::marks::{MarkError, MarkStore};
use serde_json::json;

const REPORT_MAX_SUBJECTS: usize = 64;
const STATS_MAX_STUDENTS: usize = 2000;

fn student_card(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let params = &req.params;
    let term = parse_term(params)?;
    let class = parse_class(require_str(params, "className")?)?;
    let letters = letter_system_for(state, params)?;
    let items = params
        .get("subjects")
        .and_then(|v| v.as_array())
        .ok_or_else(|| HandlerErr::bad_params("missing subjects"))?;
    if items.len() > REPORT_MAX_SUBJECTS {
        return Err(HandlerErr::bad_params("too many subjects").with_details(json!({
            "max": REPORT_MAX_SUBJECTS,
            "got": items.len(),
        })));
    }

    // Systems are resolved up front so entries can borrow them.
    let mut systems: Vec<GradingSystem> = Vec::with_capacity(items.len());
    let mut pending: Vec<(String, MarkStore, Option<MarkError>, f64)> =
        Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let subject = require_str(item, "subject")
            .map_err(|_| HandlerErr::bad_params(format!("subjects[{}].subject is required", i)))?;
        let system = resolve_system(state, params, item.get("system"), subject)?;
        let (store, wire_err) = parse_store(item.get("marks"))?;
        let credits = match item.get("credits") {
            None | Some(serde_json::Value::Null) => 0.0,
            Some(v) => v.as_f64().filter(|c| *c >= 0.0).ok_or_else(|| {
                HandlerErr::bad_params(format!("subjects[{}].credits must be >= 0", i))
            })?,
        };
        systems.push(system);
        pending.push((subject.to_string(), store, wire_err, credits));
    }

    let mut entries: Vec<SubjectEntry<'_>> = pending
        .into_iter()
        .zip(systems.iter())
        .map(|((subject, store, prior_error, credits), system)| {
            let counts_in_average =
                classes::counts_in_average(&class, &SubjectKind::parse(&subject));
            SubjectEntry {
                subject,
                system,
                store,
                credits,
                counts_in_average,
                prior_error,
            }
        })
        .collect();

    let report = calc::student_report(term, &mut entries, &letters, state.config.pass_mark);
    serde_json::to_value(report).map_err(|e| HandlerErr {
        code: "internal",
        message: e.to_string(),
        details: None,
    })
}

fn class_stats(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let params = &req.params;
    let term = parse_term(params)?;
    let subject = require_str(params, "subject")?;
    let system = resolve_system(state, params, params.get("system"), subject)?;
    let letters = letter_system_for(state, params)?;
    let items = params
        .get("students")
        .and_then(|v| v.as_array())
        .ok_or_else(|| HandlerErr::bad_params("missing students"))?;
    if items.len() > STATS_MAX_STUDENTS {
        return Err(HandlerErr::bad_params("too many students").with_details(json!({
            "max": STATS_MAX_STUDENTS,
            "got": items.len(),
        })));
    }

    let mut students = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let student_id = require_str(item, "studentId")
            .map_err(|_| HandlerErr::bad_params(format!("students[{}].studentId is required", i)))?;
        let (store, prior_error) = parse_store(item.get("marks"))?;
        students.push(StudentMarks {
            student_id: student_id.to_string(),
            store,
            prior_error,
        });
    }

    let stats = calc::class_stats(
        term,
        &system,
        &mut students,
        &letters,
        state.config.pass_mark,
    );
    serde_json::to_value(stats).map_err(|e| HandlerErr {
        code: "internal",
        message: e.to_string(),
        details: None,
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "reports.studentCard" => student_card(state, req),
        "reports.classStats" => class_stats(state, req),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
