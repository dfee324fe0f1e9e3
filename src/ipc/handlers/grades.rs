use crate::classes::{self, SubjectKind};
use crate::ipc::error::ok;
use crate::ipc::helpers::{letter_system_for, mark_param, parse_class, require_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::letters::{self, CreditedMark, LetterSet, LetterSystem, LetterThreshold};
use crate::marks::finite_or_none;
use serde_json::json;
use tracing::info;

fn letter(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let letters = letter_system_for(state, &req.params)?;
    let mark = mark_param(req.params.get("mark"), "mark")?;
    let (letter, description) = letters.get_letter_with_description(mark);
    Ok(json!({
        "letterSet": letters.name(),
        "letter": letter,
        "description": description,
    }))
}

fn gpa(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let pass_mark = state.config.pass_mark;
    if let Some(subjects) = req.params.get("subjects") {
        let items = subjects
            .as_array()
            .ok_or_else(|| HandlerErr::bad_params("subjects must be an array"))?;
        let mut credited = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let mark = mark_param(item.get("mark"), &format!("subjects[{}].mark", i))?;
            let credits = item
                .get("credits")
                .and_then(|v| v.as_f64())
                .filter(|c| *c >= 0.0)
                .ok_or_else(|| {
                    HandlerErr::bad_params(format!("subjects[{}].credits must be >= 0", i))
                })?;
            credited.push(CreditedMark { mark, credits });
        }
        let attempted: f64 = credited.iter().map(|c| c.credits).sum();
        let earned: f64 = credited
            .iter()
            .map(|c| letters::credits_earned(c.mark, c.credits, pass_mark))
            .sum();
        let (average, letter, point) = letters::cumulative_gpa(&credited, pass_mark);
        return Ok(json!({
            "average": finite_or_none(average),
            "letter": letter,
            "point": finite_or_none(point),
            "creditsAttempted": attempted,
            "creditsEarned": earned,
        }));
    }

    let mark = mark_param(req.params.get("mark"), "mark")?;
    let (letter, point) = letters::gpa_av_wgp(mark);
    Ok(json!({
        "letter": letter,
        "point": finite_or_none(point),
    }))
}

fn classify(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_name = require_str(&req.params, "className")?;
    let class = parse_class(class_name)?;
    let subjects: Vec<serde_json::Value> = req
        .params
        .get("subjects")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .map(|name| {
                    let kind = SubjectKind::parse(name);
                    json!({
                        "subject": name,
                        "kind": kind,
                        "countsInAverage": classes::counts_in_average(&class, &kind),
                        "defaultPreset": classes::default_preset(&class, &kind),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(json!({
        "class": class,
        "letterSet": class.letter_set(),
        "subjects": subjects,
    }))
}

fn letters_list(state: &AppState) -> serde_json::Value {
    let sets: Vec<LetterSystem> = [LetterSet::Standard, LetterSet::Descriptive]
        .into_iter()
        .map(|s| state.letter_system(s))
        .collect();
    json!({ "letterSets": sets })
}

fn letters_configure(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let set_name = require_str(&req.params, "letterSet")?;
    let set = LetterSet::parse(set_name)
        .ok_or_else(|| HandlerErr::bad_params("letterSet must be standard or descriptive"))?;
    let thresholds: Vec<LetterThreshold> = req
        .params
        .get("thresholds")
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| HandlerErr::bad_params(format!("invalid thresholds: {}", e)))?
        .ok_or_else(|| HandlerErr::bad_params("missing thresholds"))?;
    let builtin_name = LetterSystem::builtin(set).name().to_string();
    let system = LetterSystem::new(builtin_name, thresholds).map_err(|e| HandlerErr {
        code: "invalid_config",
        message: e.to_string(),
        details: None,
    })?;
    info!(
        letter_set = system.name(),
        bands = system.thresholds().len(),
        "letter table replaced"
    );
    let out = json!({ "letterSet": system });
    state.letter_systems.insert(set, system);
    Ok(out)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "grades.letter" => letter(state, req),
        "grades.gpa" => gpa(state, req),
        "classes.classify" => classify(req),
        "letters.list" => Ok(letters_list(state)),
        "letters.configure" => letters_configure(state, req),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
