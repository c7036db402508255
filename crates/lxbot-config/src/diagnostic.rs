// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns figment extraction failures into miette diagnostics.
//!
//! Keys are reported by their dotted path (`ollama.model`). A rejected value
//! is traced back to where it was set: a span in the TOML file, or the
//! environment variable that carried it, so the help text can name the
//! exact `LXBOT_*` variable to fix.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use std::fmt;

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

use crate::loader::{ENV_PREFIX, LEGACY_ENV};

/// Jaro-Winkler score above which a known key is offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Name under which an in-memory TOML string is registered as a source.
pub const INLINE_SOURCE: &str = "<inline>";

/// Where a rejected value was set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// A TOML file, by path.
    File(String),
    /// A TOML string handed to the loader directly.
    Inline,
    /// An environment variable, by name.
    Env(String),
    /// Any other provider, such as a command-line flag.
    Provider(String),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::File(path) => write!(f, "{path}"),
            Origin::Inline => f.write_str("inline configuration"),
            Origin::Env(var) => write!(f, "environment variable {var}"),
            Origin::Provider(name) => f.write_str(name),
        }
    }
}

/// A configuration error ready for miette to render.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(lxbot::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys, origin.as_ref()))
    )]
    UnknownKey {
        /// Dotted path of the rejected key.
        key: String,
        /// Closest accepted key, as a dotted path.
        suggestion: Option<String>,
        /// Keys accepted at the same level.
        valid_keys: &'static [&'static str],
        origin: Option<Origin>,
        #[label("not recognized here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: found {found}, expected {expected}")]
    #[diagnostic(
        code(lxbot::config::invalid_type),
        help("{}", invalid_type_help(expected, origin.as_ref()))
    )]
    InvalidType {
        key: String,
        found: String,
        expected: String,
        origin: Option<Origin>,
        #[label("set here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value that parsed but is out of range.
    #[error("validation error: {message}")]
    #[diagnostic(code(lxbot::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(lxbot::config::other))]
    Other(String),
}

impl ConfigError {
    /// Where the offending value came from, when known.
    pub fn origin(&self) -> Option<&Origin> {
        match self {
            ConfigError::UnknownKey { origin, .. } | ConfigError::InvalidType { origin, .. } => {
                origin.as_ref()
            }
            ConfigError::Validation { .. } | ConfigError::Other(_) => None,
        }
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid: &[&str], origin: Option<&Origin>) -> String {
    let accepted = format!("accepted here: {}", valid.join(", "));
    match (suggestion, origin) {
        (Some(key), Some(Origin::Env(_))) => {
            format!("did you mean `{}`? {accepted}", env_var_for(key))
        }
        (Some(key), _) => format!("did you mean `{key}`? {accepted}"),
        (None, _) => accepted,
    }
}

fn invalid_type_help(expected: &str, origin: Option<&Origin>) -> String {
    match origin {
        Some(Origin::Env(var)) => format!("{var} must hold {expected}"),
        Some(Origin::File(path)) => format!("fix the value in {path}: expected {expected}"),
        _ => format!("expected {expected}"),
    }
}

/// The `LXBOT_*` variable that sets the dotted `key`.
pub fn env_var_for(key: &str) -> String {
    format!("{ENV_PREFIX}{}", key.replace('.', "_").to_ascii_uppercase())
}

/// Convert a `figment::Error` into one diagnostic per underlying failure.
///
/// `toml_sources` pairs each readable config file path with its contents;
/// an entry named [`INLINE_SOURCE`] stands for a TOML string.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| convert(&error, toml_sources))
        .collect()
}

fn convert(error: &figment::Error, toml_sources: &[(String, String)]) -> ConfigError {
    match &error.kind {
        Kind::UnknownField(field, expected) => {
            let mut section = error.path.clone();
            if section.last() == Some(field) {
                section.pop();
            }
            let key = dotted(&section, field);
            let origin = origin_of(error, &key);
            let (span, src) = locate(toml_sources, origin.as_ref(), &section, field);
            ConfigError::UnknownKey {
                suggestion: suggest_key(field, expected).map(|s| dotted(&section, &s)),
                key,
                valid_keys: *expected,
                origin,
                span,
                src,
            }
        }
        Kind::InvalidType(found, expected) | Kind::InvalidValue(found, expected) => {
            let key = error.path.join(".");
            let origin = origin_of(error, &key);
            let (span, src) = match error.path.split_last() {
                Some((field, section)) => locate(toml_sources, origin.as_ref(), section, field),
                None => (None, None),
            };
            ConfigError::InvalidType {
                key,
                found: found.to_string(),
                expected: expected.clone(),
                origin,
                span,
                src,
            }
        }
        _ => ConfigError::Other(error.to_string()),
    }
}

fn dotted(section: &[String], field: &str) -> String {
    if section.is_empty() {
        field.to_string()
    } else {
        format!("{}.{field}", section.join("."))
    }
}

/// Works out which provider supplied the value at `key`.
fn origin_of(error: &figment::Error, key: &str) -> Option<Origin> {
    let metadata = error.metadata.as_ref()?;
    if let Some(figment::Source::File(path)) = &metadata.source {
        return Some(Origin::File(path.display().to_string()));
    }
    if metadata.name.contains("environment") {
        let var = if metadata.name.contains(ENV_PREFIX) {
            env_var_for(key)
        } else {
            LEGACY_ENV
                .iter()
                .find(|(_, path)| *path == key)
                .map_or_else(|| key.to_ascii_uppercase(), |(var, _)| (*var).to_string())
        };
        return Some(Origin::Env(var));
    }
    if metadata.name.contains("source string")
        || matches!(metadata.source, Some(figment::Source::Code(_)))
    {
        return Some(Origin::Inline);
    }
    Some(Origin::Provider(metadata.name.to_string()))
}

fn locate(
    toml_sources: &[(String, String)],
    origin: Option<&Origin>,
    section: &[String],
    field: &str,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let wanted = match origin {
        Some(Origin::File(path)) => path.as_str(),
        Some(Origin::Env(_)) | None => return (None, None),
        Some(Origin::Inline | Origin::Provider(_)) => INLINE_SOURCE,
    };
    let Some((name, content)) = toml_sources.iter().find(|(name, _)| name == wanted) else {
        return (None, None);
    };
    match find_key_offset(content, section, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(name, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `key` inside the `[section]` table of `content`.
///
/// Only assignments under the matching table header count, so `model` in
/// `[ollama]` is never confused with a key of the same name elsewhere. A
/// top-level `key` also matches a `[key]` table header.
pub fn find_key_offset(content: &str, section: &[String], key: &str) -> Option<usize> {
    let wanted = section.join(".");
    let mut table = String::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let body = line.trim_start();
        let indent = line.len() - body.len();

        if let Some(header) = body.strip_prefix('[') {
            table = header
                .trim_start_matches('[')
                .split(']')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            if wanted.is_empty() && table == key {
                return Some(offset + line.find(key).unwrap_or(indent));
            }
        } else if table == wanted
            && let Some(rest) = body.strip_prefix(key)
            && rest.trim_start().starts_with('=')
        {
            return Some(offset + indent);
        }

        offset += line.len();
    }
    None
}

/// The candidate closest to `unknown`, if any is close enough to be a typo.
pub fn suggest_key(unknown: &str, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .map(|candidate| (strsim::jaro_winkler(unknown, candidate), *candidate))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, candidate)| candidate.to_string())
}

/// Print every error to stderr as a miette report.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = GraphicalReportHandler::new();
    let mut out = String::new();
    for error in errors {
        out.clear();
        match handler.render_report(&mut out, error) {
            Ok(()) => eprintln!("{out}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
    if errors.len() > 1 {
        eprintln!("{} configuration problems found.", errors.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::Overrides;

    fn errors_for(toml: &str) -> Vec<ConfigError> {
        crate::load_and_validate_str(toml).expect_err("config should be rejected")
    }

    #[test]
    fn suggest_picks_the_closest_key() {
        let keys = ["base_url", "model", "timeout_secs", "probe_timeout_secs"];
        assert_eq!(suggest_key("modle", &keys).as_deref(), Some("model"));
        assert_eq!(suggest_key("timeout_sec", &keys).as_deref(), Some("timeout_secs"));
        assert_eq!(suggest_key("xyzzy", &keys), None);
    }

    #[test]
    fn key_offset_respects_table_boundaries() {
        let content = "[bot]\nname = \"a\"\n\n[ollama]\nname = \"b\"\nmodel = \"c\"\n";
        let section = vec!["ollama".to_string()];
        let offset = find_key_offset(content, &section, "name").unwrap();
        assert_eq!(&content[offset..offset + 10], "name = \"b\"");
        assert_eq!(find_key_offset(content, &section, "mod"), None);
        assert_eq!(find_key_offset(content, &["queue".to_string()], "name"), None);
    }

    #[test]
    fn misspelled_section_header_is_located() {
        let content = "[ollma]\nmodel = \"x\"\n";
        assert_eq!(find_key_offset(content, &[], "ollma"), Some(1));
    }

    #[test]
    fn unknown_key_is_reported_by_dotted_path() {
        let errors = errors_for("[ollama]\nmodle = \"llama3\"\n");
        let [ConfigError::UnknownKey { key, suggestion, valid_keys, .. }] = errors.as_slice()
        else {
            panic!("expected one unknown key, got {errors:?}");
        };
        assert_eq!(key, "ollama.modle");
        assert_eq!(suggestion.as_deref(), Some("ollama.model"));
        assert!(valid_keys.contains(&"base_url"));
    }

    #[test]
    fn misspelled_section_suggests_the_real_one() {
        let errors = errors_for("[ollma]\nmodel = \"x\"\n");
        assert!(
            errors.iter().any(|e| matches!(
                e,
                ConfigError::UnknownKey { key, suggestion: Some(s), .. }
                    if key == "ollma" && s == "ollama"
            )),
            "{errors:?}"
        );
    }

    #[test]
    fn inline_typo_carries_a_span() {
        let content = "[queue]\ncapcity = 5\n";
        let errors = errors_for(content);
        let Some(ConfigError::UnknownKey { span: Some(span), .. }) = errors.first() else {
            panic!("expected a located unknown key, got {errors:?}");
        };
        assert_eq!(&content[span.offset()..span.offset() + span.len()], "capcity");
    }

    #[test]
    fn wrong_type_from_environment_names_the_variable() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("LXBOT_QUEUE_CAPACITY", "ten");
            let errors = crate::load_and_validate_with(&Overrides::default())
                .expect_err("non-numeric capacity");
            let error = errors
                .iter()
                .find(|e| matches!(e, ConfigError::InvalidType { .. }))
                .expect("invalid type error");
            assert_eq!(
                error.origin(),
                Some(&Origin::Env("LXBOT_QUEUE_CAPACITY".into()))
            );
            let help = error.help().map(|h| h.to_string()).unwrap_or_default();
            assert!(help.starts_with("LXBOT_QUEUE_CAPACITY must hold"), "{help}");
            Ok(())
        });
    }

    #[test]
    fn unknown_env_key_suggests_a_variable() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("LXBOT_OLLAMA_MODLE", "mistral");
            let errors = crate::load_and_validate_with(&Overrides::default())
                .expect_err("unknown env key");
            let error = errors
                .iter()
                .find(|e| matches!(e, ConfigError::UnknownKey { .. }))
                .expect("unknown key error");
            assert_eq!(error.origin(), Some(&Origin::Env("LXBOT_OLLAMA_MODLE".into())));
            let help = error.help().map(|h| h.to_string()).unwrap_or_default();
            assert!(help.starts_with("did you mean `LXBOT_OLLAMA_MODEL`?"), "{help}");
            Ok(())
        });
    }

    #[test]
    fn env_var_names_follow_the_prefix() {
        assert_eq!(env_var_for("ollama.base_url"), "LXBOT_OLLAMA_BASE_URL");
        assert_eq!(env_var_for("chat.persist_history"), "LXBOT_CHAT_PERSIST_HISTORY");
    }
}
