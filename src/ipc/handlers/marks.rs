use crate::ipc::error::ok;
use crate::ipc::helpers::{
    letter_system_for, optional_str, parse_store, parse_term, resolve_system, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::marks::{finite_or_none, keep_first, ValidationIssue};
use crate::term::Term;
use serde_json::json;
use tracing::warn;

fn evaluate(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let params = &req.params;
    let term = parse_term(params)?;
    let subject = optional_str(params, "subject").unwrap_or("");
    let system = resolve_system(state, params, params.get("system"), subject)?;
    let letters = letter_system_for(state, params)?;
    let (mut store, wire_err) = parse_store(params.get("marks"))?;

    let mut first = wire_err;
    keep_first(&mut first, system.evaluate(term, &mut store));
    if let Some(e) = &first {
        warn!(term = %term, error = %e, "mark validation");
    }

    let mark = system.get100(term, &store);
    Ok(json!({
        "term": term,
        "system": system.label(),
        "quarterWeight": system.quarter_weight(),
        "semesterWeight": system.semester_weight(),
        "marks": store.to_wire(),
        "validation": first.as_ref().map(ValidationIssue::from),
        "mark100": finite_or_none(mark),
        "exam": finite_or_none(system.get_exam(term, &store)),
        "ready": system.ready(term, &store),
        "letter": letters.get_letter(mark),
    }))
}

/// Evaluates the whole year, then reports every term.
fn summary(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let params = &req.params;
    let subject = optional_str(params, "subject").unwrap_or("");
    let system = resolve_system(state, params, params.get("system"), subject)?;
    let letters = letter_system_for(state, params)?;
    let (mut store, wire_err) = parse_store(params.get("marks"))?;

    let mut first = wire_err;
    keep_first(&mut first, system.evaluate(Term::END_OF_YEAR, &mut store));

    let terms: Vec<serde_json::Value> = Term::all()
        .into_iter()
        .map(|t| {
            let mark = system.get100(t, &store);
            json!({
                "term": t,
                "label": t.to_string(),
                "mark100": finite_or_none(mark),
                "exam": finite_or_none(system.get_exam(t, &store)),
                "ready": system.ready(t, &store),
                "letter": letters.get_letter(mark),
            })
        })
        .collect();

    Ok(json!({
        "system": system.label(),
        "quarterWeight": system.quarter_weight(),
        "semesterWeight": system.semester_weight(),
        "terms": terms,
        "marks": store.to_wire(),
        "validation": first.as_ref().map(ValidationIssue::from),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "marks.evaluate" => evaluate(state, req),
        "marks.summary" => summary(state, req),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
