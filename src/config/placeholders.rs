// src/config/placeholders.rs

//! `{{name}}` placeholder substitution on the raw declaration text.
//!
//! Built-ins:
//! - `{{currentdate}}` → `%d%m%Y`
//! - `{{currentdatetime}}` → `%d%m%Y-%H%M%S`
//!
//! Everything else must be provided by the caller (CLI `-p name=value`).

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{DateTime, Local};
use regex::{Captures, Regex};

use crate::errors::{Result, TaskchainError};

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{([^}]*)\}\}").expect("placeholder regex is valid"))
}

/// Substitute placeholders using the current local time for the built-ins.
pub fn substitute(text: &str, custom: &BTreeMap<String, String>) -> Result<String> {
    substitute_at(text, custom, Local::now())
}

/// Substitute placeholders with an explicit clock (used by tests).
pub fn substitute_at(
    text: &str,
    custom: &BTreeMap<String, String>,
    now: DateTime<Local>,
) -> Result<String> {
    let mut missing: Option<String> = None;

    let replaced = placeholder_re().replace_all(text, |caps: &Captures<'_>| {
        let name = &caps[1];
        match name.to_lowercase().as_str() {
            "currentdate" => now.format("%d%m%Y").to_string(),
            "currentdatetime" => now.format("%d%m%Y-%H%M%S").to_string(),
            _ => match custom.get(name) {
                Some(value) => value.clone(),
                None => {
                    missing.get_or_insert_with(|| name.to_string());
                    caps[0].to_string()
                }
            },
        }
    });

    if let Some(name) = missing {
        return Err(TaskchainError::config(format!(
            "declarations use undefined placeholder '{{{{{name}}}}}'; pass it with -p {name}=<value>"
        )));
    }

    Ok(replaced.into_owned())
}

/// Parse `name=value` pairs as given on the command line.
pub fn parse_assignments<I, S>(pairs: I) -> Result<BTreeMap<String, String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut map = BTreeMap::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let (name, value) = pair.split_once('=').ok_or_else(|| {
            TaskchainError::config(format!("placeholder '{pair}' must look like name=value"))
        })?;
        map.insert(name.trim().to_string(), value.to_string());
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2018, 4, 13, 9, 5, 7).unwrap()
    }

    #[test]
    fn builtins_and_custom_values_are_replaced() {
        let custom = parse_assignments(["series=ipv4"]).unwrap();
        let text = "target = \"{{series}}_{{currentdate}}.json\"\nstamp = \"{{CurrentDateTime}}\"";

        let out = substitute_at(text, &custom, fixed_now()).unwrap();
        assert_eq!(out, "target = \"ipv4_13042018.json\"\nstamp = \"13042018-090507\"");
    }

    #[test]
    fn undefined_placeholder_is_an_error() {
        let err = substitute_at("{{nope}}", &BTreeMap::new(), fixed_now()).unwrap_err();
        match err {
            TaskchainError::ConfigError(msg) => assert!(msg.contains("nope")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn assignments_need_an_equals_sign() {
        assert!(parse_assignments(["novalue"]).is_err());
        let map = parse_assignments(["a=b=c"]).unwrap();
        assert_eq!(map.get("a").map(String::as_str), Some("b=c"));
    }
}
