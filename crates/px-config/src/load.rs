// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level config loading (SPEC_FULL §4.11): reads the YAML document,
//! composes per-process environments, interpolates `${VAR}` references in
//! `cmd` strings, and validates the result before handing back a [`Config`].

use crate::document::{Config, RawConfig, RawProcessConfig};
use crate::env_file::{interpolate, parse_env_file};
use crate::error::{ConfigError, Result};
use indexmap::IndexMap;
use px_core::ProcessConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Load and validate a config document from `path`.
pub fn load(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let raw_text = std::fs::read_to_string(path).map_err(|_| ConfigError::NotFound(path.to_path_buf()))?;
    let raw: RawConfig =
        serde_yaml::from_str(&raw_text).map_err(|e| ConfigError::InvalidYaml { path: path.to_path_buf(), reason: e.to_string() })?;

    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));

    let top_env = match &raw.env_file {
        Some(rel) => parse_env_file(&base_dir.join(rel))?,
        None => HashMap::new(),
    };

    let mut processes = IndexMap::new();
    for (name, raw_process) in &raw.processes {
        if name.is_empty() {
            return Err(ConfigError::invalid("processes", "process name must not be empty"));
        }
        if processes.contains_key(name) {
            return Err(ConfigError::invalid("processes", format!("duplicate process name '{name}'")));
        }
        processes.insert(name.clone(), build_process_config(name, raw_process, &top_env, &base_dir)?);
    }

    if let Some(proxy) = &raw.proxy {
        validate_proxy(proxy, raw.certs.as_ref())?;
    }

    Ok(Config { api: raw.api.clone(), processes, proxy: raw.proxy.clone(), certs: raw.certs.clone() })
}

/// Compose one process's environment (parent env_file → process env_file →
/// explicit `env`, SPEC_FULL §4.11 / Testable Property 12) and interpolate
/// `${VAR}` references in `cmd` from the composed map.
fn build_process_config(
    name: &str,
    raw: &RawProcessConfig,
    top_env: &HashMap<String, String>,
    base_dir: &Path,
) -> Result<ProcessConfig> {
    let mut env = top_env.clone();
    if let Some(rel) = &raw.env_file {
        let process_env = parse_env_file(&base_dir.join(rel))?;
        env.extend(process_env);
    }
    env.extend(raw.env.clone());

    let cmd = interpolate(&raw.cmd, &env);

    Ok(ProcessConfig {
        name: name.to_string(),
        cmd,
        env,
        cwd: raw.cwd.clone(),
        env_file: raw.env_file.clone(),
        health: raw.health.clone(),
    })
}

/// Proxy-block validation invariants (SPEC_FULL §4.11).
fn validate_proxy(proxy: &px_core::ProxyConfig, certs: Option<&px_core::CertConfig>) -> Result<()> {
    if !proxy.enabled {
        return Ok(());
    }
    if proxy.domain.as_deref().unwrap_or("").is_empty() {
        return Err(ConfigError::invalid("proxy.domain", "required when proxy.enabled"));
    }
    if proxy.http_port.is_none() && proxy.https_port.is_none() {
        return Err(ConfigError::invalid("proxy", "at least one of http_port/https_port is required when enabled"));
    }
    for (subdomain, target) in &proxy.services {
        if target.port() == 0 {
            return Err(ConfigError::invalid(format!("proxy.services.{subdomain}"), "port must be nonzero"));
        }
    }
    if proxy.https_port.is_some() {
        let certs = certs.ok_or_else(|| ConfigError::invalid("certs", "required when proxy.https_port is set"))?;
        if !certs.cert_path().is_file() || !certs.key_path().is_file() {
            return Err(ConfigError::invalid(
                "certs.dir",
                format!(
                    "no readable cert/key pair under {} (cert provisioning is out of scope; pre-provision cert.pem/key.pem)",
                    certs.dir.display()
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_minimal_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "prox.yaml",
            "processes:\n  web:\n    cmd: \"echo hi\"\n",
        );
        let config = load(&path).unwrap();
        assert_eq!(config.processes.len(), 1);
        assert_eq!(config.processes["web"].cmd, "echo hi");
        assert_eq!(config.api.port, 9090);
    }

    #[test]
    fn rejects_unknown_top_level_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "prox.yaml", "bogus: true\n");
        let err = load(&path).unwrap_err();
        assert_eq!(err.code(), px_core::ErrorCode::InvalidConfig);
    }

    #[test]
    fn rejects_unknown_process_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "prox.yaml", "processes:\n  web:\n    cmd: \"echo hi\"\n    bogus: 1\n");
        let err = load(&path).unwrap_err();
        assert_eq!(err.code(), px_core::ErrorCode::InvalidConfig);
    }

    #[test]
    fn missing_file_is_config_not_found() {
        let err = load("/nonexistent/prox.yaml").unwrap_err();
        assert_eq!(err.code(), px_core::ErrorCode::ConfigNotFound);
    }

    #[test]
    fn env_composition_order_matches_property_12() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), ".env", "A=1\n");
        write_file(dir.path(), ".env.web", "A=2\nB=1\n");
        let path = write_file(
            dir.path(),
            "prox.yaml",
            "env_file: .env\nprocesses:\n  web:\n    cmd: \"run\"\n    env_file: .env.web\n    env:\n      A: \"3\"\n",
        );
        let config = load(&path).unwrap();
        let web = &config.processes["web"];
        assert_eq!(web.env.get("A"), Some(&"3".to_string()));
        assert_eq!(web.env.get("B"), Some(&"1".to_string()));
    }

    #[test]
    fn cmd_interpolates_composed_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "prox.yaml",
            "processes:\n  web:\n    cmd: \"curl localhost:${PORT}\"\n    env:\n      PORT: \"3000\"\n",
        );
        let config = load(&path).unwrap();
        assert_eq!(config.processes["web"].cmd, "curl localhost:3000");
    }

    #[test]
    fn proxy_enabled_without_domain_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "prox.yaml", "proxy:\n  enabled: true\n  http_port: 8080\n");
        let err = load(&path).unwrap_err();
        assert_eq!(err.code(), px_core::ErrorCode::InvalidConfig);
    }

    #[test]
    fn proxy_enabled_without_any_port_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "prox.yaml", "proxy:\n  enabled: true\n  domain: local.dev\n");
        let err = load(&path).unwrap_err();
        assert_eq!(err.code(), px_core::ErrorCode::InvalidConfig);
    }

    #[test]
    fn https_port_without_certs_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "prox.yaml",
            "proxy:\n  enabled: true\n  domain: local.dev\n  https_port: 8443\n",
        );
        let err = load(&path).unwrap_err();
        assert_eq!(err.code(), px_core::ErrorCode::InvalidConfig);
    }

    #[test]
    fn valid_proxy_config_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "prox.yaml",
            "proxy:\n  enabled: true\n  domain: local.dev\n  http_port: 8080\n  services:\n    app: 3000\n",
        );
        let config = load(&path).unwrap();
        let proxy = config.proxy.unwrap();
        assert!(proxy.enabled);
        assert_eq!(proxy.services["app"].port(), 3000);
    }

    #[test]
    fn duplicate_process_name_across_map_is_impossible_but_empty_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "prox.yaml", "processes:\n  \"\":\n    cmd: \"echo hi\"\n");
        let err = load(&path).unwrap_err();
        assert_eq!(err.code(), px_core::ErrorCode::InvalidConfig);
    }
}
