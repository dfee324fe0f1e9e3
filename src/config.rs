use anyhow::{bail, Context};
use chrono::{Datelike, NaiveDate};
use std::env;

use crate::grading::MAX_QUARTER_WEIGHT;
use crate::letters::CREDIT_PASS_MARK;

/// Read once at startup from the environment (and `.env`).
///
/// | variable | default |
/// |---|---|
/// | `REPORTCARDD_LOG` | `reportcardd=info` |
/// | `REPORTCARDD_DEFAULT_QUARTER_WEIGHT` | `40` |
/// | `REPORTCARDD_SCHOOL_YEAR_START_MONTH` | `9` |
/// | `REPORTCARDD_PASS_MARK` | `60` |
#[derive(Clone, Debug, PartialEq)]
pub struct DaemonConfig {
    pub log_filter: String,
    pub default_quarter_weight: f64,
    pub school_year_start_month: u32,
    pub pass_mark: f64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_filter: format!("{}=info", env!("CARGO_CRATE_NAME")),
            default_quarter_weight: 40.0,
            school_year_start_month: 9,
            pass_mark: CREDIT_PASS_MARK,
        }
    }
}

impl DaemonConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let log_filter = lookup("REPORTCARDD_LOG").unwrap_or(defaults.log_filter);

        let default_quarter_weight = match lookup("REPORTCARDD_DEFAULT_QUARTER_WEIGHT") {
            Some(v) => v
                .trim()
                .parse::<f64>()
                .with_context(|| format!("REPORTCARDD_DEFAULT_QUARTER_WEIGHT={v:?}"))?,
            None => defaults.default_quarter_weight,
        };
        if !(0.0..=MAX_QUARTER_WEIGHT).contains(&default_quarter_weight) {
            bail!("REPORTCARDD_DEFAULT_QUARTER_WEIGHT must be within 0..=50");
        }

        let school_year_start_month = match lookup("REPORTCARDD_SCHOOL_YEAR_START_MONTH") {
            Some(v) => v
                .trim()
                .parse::<u32>()
                .with_context(|| format!("REPORTCARDD_SCHOOL_YEAR_START_MONTH={v:?}"))?,
            None => defaults.school_year_start_month,
        };
        if !(1..=12).contains(&school_year_start_month) {
            bail!("REPORTCARDD_SCHOOL_YEAR_START_MONTH must be within 1..=12");
        }

        let pass_mark = match lookup("REPORTCARDD_PASS_MARK") {
            Some(v) => v
                .trim()
                .parse::<f64>()
                .with_context(|| format!("REPORTCARDD_PASS_MARK={v:?}"))?,
            None => defaults.pass_mark,
        };
        if !(0.0..=100.0).contains(&pass_mark) {
            bail!("REPORTCARDD_PASS_MARK must be within 0..=100");
        }

        Ok(Self {
            log_filter,
            default_quarter_weight,
            school_year_start_month,
            pass_mark,
        })
    }

    /// School year (named by the calendar year it starts in) containing `date`.
    pub fn school_year_for(&self, date: NaiveDate) -> i32 {
        if date.month() >= self.school_year_start_month {
            date.year()
        } else {
            date.year() - 1
        }
    }

    pub fn current_school_year(&self) -> i32 {
        self.school_year_for(chrono::Local::now().date_naive())
    }
}
