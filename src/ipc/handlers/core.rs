use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use crate::term::Term;
use serde_json::json;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "registeredSystems": state.systems.len(),
            "schoolYear": state.config.current_school_year(),
            "defaultQuarterWeight": state.config.default_quarter_weight,
            "passMark": state.config.pass_mark,
        }),
    )
}

fn handle_terms_list(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let terms: Vec<serde_json::Value> = Term::all()
        .into_iter()
        .map(|t| {
            let constituents: Vec<String> = t
                .constituents()
                .map(|(a, b)| vec![a.key(), b.key()])
                .unwrap_or_default();
            json!({
                "key": t.key(),
                "label": t.to_string(),
                "kind": t.kind(),
                "n": t.n(),
                "semesterNumber": t.semester_number(),
                "constituents": constituents,
            })
        })
        .collect();
    ok(&req.id, json!({ "terms": terms }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "terms.list" => Some(handle_terms_list(state, req)),
        _ => None,
    }
}
