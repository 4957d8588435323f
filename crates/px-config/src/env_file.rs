// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `.env`-style file parsing (SPEC_FULL §4.11). Deliberately small: `KEY=VALUE`
//! lines, `#` comments, blank lines ignored, optional surrounding quotes
//! stripped from the value. Not a general shell dialect — interpolation and
//! expansion of the value itself is out of scope, matching the env-file
//! contract's narrow role as a source of `${VAR}` substitutions, not a
//! second shell.

use crate::error::{ConfigError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Parse a `.env`-style file into an ordered set of key/value pairs.
pub fn parse_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let content = std::fs::read_to_string(path).map_err(|_| ConfigError::EnvFileNotFound(path.to_path_buf()))?;
    let mut vars = HashMap::new();
    for (lineno, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::invalid(
                format!("{}:{}", path.display(), lineno + 1),
                "expected KEY=VALUE",
            ));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::invalid(format!("{}:{}", path.display(), lineno + 1), "empty key"));
        }
        vars.insert(key.to_string(), unquote(value.trim()));
    }
    Ok(vars)
}

fn unquote(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}

/// Substitute `${VAR}` references in `text` from `vars`, leaving unresolved
/// references untouched (SPEC_FULL §4.11: interpolation scope is limited to
/// env-file/explicit-env entries, not arbitrary shell expansion).
pub fn interpolate(text: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            out.push_str(rest);
            return out;
        };
        out.push_str(&rest[..start]);
        let name = &rest[start + 2..start + end];
        match vars.get(name) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[start..start + end + 1]),
        }
        rest = &rest[start + end + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_env(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_simple_assignments() {
        let file = write_env("A=1\nB=hello\n");
        let vars = parse_env_file(file.path()).unwrap();
        assert_eq!(vars.get("A"), Some(&"1".to_string()));
        assert_eq!(vars.get("B"), Some(&"hello".to_string()));
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let file = write_env("# comment\n\nA=1\n");
        let vars = parse_env_file(file.path()).unwrap();
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn strips_surrounding_quotes() {
        let file = write_env("A=\"quoted value\"\nB='single'\n");
        let vars = parse_env_file(file.path()).unwrap();
        assert_eq!(vars.get("A"), Some(&"quoted value".to_string()));
        assert_eq!(vars.get("B"), Some(&"single".to_string()));
    }

    #[test]
    fn strips_export_prefix() {
        let file = write_env("export A=1\n");
        let vars = parse_env_file(file.path()).unwrap();
        assert_eq!(vars.get("A"), Some(&"1".to_string()));
    }

    #[test]
    fn missing_file_is_env_file_not_found() {
        let err = parse_env_file(Path::new("/nonexistent/.env")).unwrap_err();
        assert!(matches!(err, ConfigError::EnvFileNotFound(_)));
    }

    #[test]
    fn line_without_equals_is_invalid() {
        let file = write_env("NOT_AN_ASSIGNMENT\n");
        let err = parse_env_file(file.path()).unwrap_err();
        assert_eq!(err.code(), px_core::ErrorCode::InvalidConfig);
    }

    #[test]
    fn interpolation_substitutes_known_vars_and_leaves_unknown() {
        let mut vars = HashMap::new();
        vars.insert("PORT".to_string(), "3000".to_string());
        assert_eq!(interpolate("curl localhost:${PORT}", &vars), "curl localhost:3000");
        assert_eq!(interpolate("echo ${MISSING}", &vars), "echo ${MISSING}");
    }
}
