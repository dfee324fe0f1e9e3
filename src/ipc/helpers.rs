use crate::classes::{self, ClassInfo, SubjectKind};
use crate::grading::{GradingSystem, SystemConfig};
use crate::ipc::error::err;
use crate::ipc::types::{AppState, SystemKey};
use crate::letters::{LetterSet, LetterSystem};
use crate::marks::{MarkError, MarkStore};
use crate::term::Term;
use serde_json::{json, Value};

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn response(self, id: &str) -> Value {
        err(id, self.code, self.message, self.details)
    }
}

pub fn require_str<'a>(params: &'a Value, key: &str) -> Result<&'a str, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn optional_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// A mark parameter: number, or `null` for a missing mark.
pub fn mark_param(v: Option<&Value>, key: &str) -> Result<f64, HandlerErr> {
    match v {
        None | Some(Value::Null) => Ok(f64::NAN),
        Some(v) => v
            .as_f64()
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a number or null", key))),
    }
}

pub fn parse_term(params: &Value) -> Result<Term, HandlerErr> {
    let raw = require_str(params, "term")?;
    Term::parse(raw).map_err(|e| {
        HandlerErr::bad_params(e.to_string()).with_details(json!({ "term": raw }))
    })
}

pub fn school_year(state: &AppState, params: &Value) -> Result<i32, HandlerErr> {
    match params.get("schoolYear") {
        None | Some(Value::Null) => Ok(state.config.current_school_year()),
        Some(v) => v
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| HandlerErr::bad_params("schoolYear must be an integer")),
    }
}

pub fn parse_class(name: &str) -> Result<ClassInfo, HandlerErr> {
    ClassInfo::parse(name)
        .map_err(|e| HandlerErr::bad_params(e.to_string()).with_details(json!({ "className": name })))
}

pub fn build_system(state: &AppState, raw: &Value) -> Result<GradingSystem, HandlerErr> {
    let cfg: SystemConfig = serde_json::from_value(raw.clone())
        .map_err(|e| HandlerErr::bad_params(format!("invalid system: {}", e)))?;
    GradingSystem::from_config(&cfg, state.config.default_quarter_weight).map_err(|e| HandlerErr {
        code: "invalid_config",
        message: e.to_string(),
        details: None,
    })
}

/// Grading system for a request: an inline `system` config wins, then the
/// registered system for (schoolYear, className, subject), then the default
/// preset for the class and subject.
pub fn resolve_system(
    state: &AppState,
    params: &Value,
    inline: Option<&Value>,
    subject: &str,
) -> Result<GradingSystem, HandlerErr> {
    if let Some(raw) = inline.filter(|v| !v.is_null()) {
        return build_system(state, raw);
    }
    let class_name = require_str(params, "className")?;
    let key = SystemKey::new(school_year(state, params)?, class_name, subject);
    if let Some(sys) = state.systems.get(&key) {
        return Ok(sys.clone());
    }
    let class = parse_class(class_name)?;
    let preset = classes::default_preset(&class, &SubjectKind::parse(subject));
    GradingSystem::from_preset(preset, state.config.default_quarter_weight).map_err(|e| {
        HandlerErr {
            code: "invalid_config",
            message: e.to_string(),
            details: None,
        }
    })
}

pub fn parse_store(raw: Option<&Value>) -> Result<(MarkStore, Option<MarkError>), HandlerErr> {
    match raw {
        None | Some(Value::Null) => Ok((MarkStore::new(), None)),
        Some(Value::Object(map)) => {
            MarkStore::from_wire(map).map_err(|e| HandlerErr::bad_params(e.to_string()))
        }
        Some(_) => Err(HandlerErr::bad_params("marks must be an object keyed by term")),
    }
}

/// `letterSet` if given, else the set for `className`, else standard.
pub fn letter_system_for(state: &AppState, params: &Value) -> Result<LetterSystem, HandlerErr> {
    if let Some(s) = optional_str(params, "letterSet") {
        let set = LetterSet::parse(s).ok_or_else(|| {
            HandlerErr::bad_params("letterSet must be standard or descriptive")
                .with_details(json!({ "letterSet": s }))
        })?;
        return Ok(state.letter_system(set));
    }
    let set = match optional_str(params, "className") {
        Some(name) => parse_class(name)?.letter_set(),
        None => LetterSet::Standard,
    };
    Ok(state.letter_system(set))
}
