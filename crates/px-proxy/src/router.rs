// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subdomain routing (spec §4.10): strips the `Host` header's port, checks
//! the label boundary against the configured wildcard domain, and looks up
//! the remaining subdomain label in the service map.

use px_core::ServiceTarget;
use std::collections::HashMap;

/// Outcome of resolving a `Host` header against the configured domain and
/// service map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// `host` matched `subdomain.<domain>` and the subdomain is configured.
    Matched { subdomain: String },
    /// `host` ends with `.{domain}` but the label has no configured
    /// service.
    UnknownService { subdomain: String },
    /// `host` does not end with the `"." + domain` label boundary at all.
    NoSubdomain,
}

/// Strip a trailing `:port` from a `Host` header value.
fn strip_port(host: &str) -> &str {
    // IPv6 literals (`[::1]:8080`) are not a routing concern here: Prox
    // only ever matches against `subdomain.domain` hostnames, never raw IPs.
    match host.rfind(':') {
        Some(idx) => &host[..idx],
        None => host,
    }
}

/// Resolve a `Host` header against `domain` (spec §4.10 "Subdomain label
/// boundary"): the host must end with `"." + domain`, and the label
/// immediately before that suffix is the subdomain.
pub fn resolve_subdomain(host: &str, domain: &str) -> Option<String> {
    let host = strip_port(host);
    let suffix = format!(".{domain}");
    let rest = host.strip_suffix(&suffix)?;
    if rest.is_empty() {
        return None;
    }
    // "The remainder up to the next dot is the subdomain" (spec §4.10): for
    // `x.y.d` the label taken is the leftmost one, `x`, not `y`.
    let subdomain = match rest.split_once('.') {
        Some((label, _)) => label,
        None => rest,
    };
    if subdomain.is_empty() {
        None
    } else {
        Some(subdomain.to_string())
    }
}

/// Route a `Host` header to a configured service (spec §4.10 Routing,
/// Testable Property 8).
pub fn route(host: &str, domain: &str, services: &HashMap<String, ServiceTarget>) -> RouteOutcome {
    match resolve_subdomain(host, domain) {
        None => RouteOutcome::NoSubdomain,
        Some(subdomain) => {
            if services.contains_key(&subdomain) {
                RouteOutcome::Matched { subdomain }
            } else {
                RouteOutcome::UnknownService { subdomain }
            }
        }
    }
}
