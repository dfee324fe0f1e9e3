use crate::classes::{self, SubjectKind};
use crate::grading::GradingSystem;
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    build_system, parse_class, parse_term, require_str, resolve_system, school_year, HandlerErr,
};
use crate::ipc::types::{AppState, Request, SystemKey};
use crate::term::Term;
use serde_json::json;
use tracing::info;

fn system_json(sys: &GradingSystem) -> serde_json::Value {
    json!({
        "label": sys.label(),
        "quarterWeight": sys.quarter_weight(),
        "semesterWeight": sys.semester_weight(),
        "layout": sys.layout(),
    })
}

fn register(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let params = &req.params;
    let class_name = require_str(params, "className")?;
    let subject = require_str(params, "subject")?;
    let year = school_year(state, params)?;
    let class = parse_class(class_name)?;

    let system = match params.get("system").filter(|v| !v.is_null()) {
        Some(raw) => build_system(state, raw)?,
        None => {
            let qw = match params.get("quarterWeight") {
                None | Some(serde_json::Value::Null) => state.config.default_quarter_weight,
                Some(v) => v
                    .as_f64()
                    .ok_or_else(|| HandlerErr::bad_params("quarterWeight must be a number"))?,
            };
            let preset = classes::default_preset(&class, &SubjectKind::parse(subject));
            GradingSystem::from_preset(preset, qw).map_err(|e| HandlerErr {
                code: "invalid_config",
                message: e.to_string(),
                details: None,
            })?
        }
    };

    let key = SystemKey::new(year, class_name, subject);
    info!(
        school_year = year,
        class = %key.class_name,
        subject = %key.subject,
        system = system.label(),
        "registered grading system"
    );
    let out = json!({ "key": key, "system": system_json(&system) });
    state.systems.insert(key, system);
    Ok(out)
}

fn list(state: &AppState) -> serde_json::Value {
    let mut keys: Vec<&SystemKey> = state.systems.keys().collect();
    keys.sort();
    let systems: Vec<serde_json::Value> = keys
        .into_iter()
        .map(|k| {
            let sys = &state.systems[k];
            json!({
                "key": k,
                "label": sys.label(),
                "quarterWeight": sys.quarter_weight(),
                "semesterWeight": sys.semester_weight(),
            })
        })
        .collect();
    json!({ "systems": systems })
}

fn describe(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let params = &req.params;
    let subject = crate::ipc::helpers::optional_str(params, "subject").unwrap_or("");
    let system = resolve_system(state, params, params.get("system"), subject)?;

    let terms = match params.get("term").filter(|v| !v.is_null()) {
        Some(_) => vec![parse_term(params)?],
        None => Term::all(),
    };
    let descriptions: Vec<serde_json::Value> = terms
        .into_iter()
        .map(|t| {
            json!({
                "term": t,
                "label": t.to_string(),
                "columns": system.description(t),
            })
        })
        .collect();

    let mut out = system_json(&system);
    out["terms"] = json!(descriptions);
    Ok(out)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "systems.register" => register(state, req),
        "systems.list" => Ok(list(state)),
        "systems.describe" => describe(state, req),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
