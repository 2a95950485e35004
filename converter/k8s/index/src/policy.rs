//! Projects per-record policy settings onto the routes they contributed to.
//!
//! Routes are visited in first-seen order, rules in order, and backends in
//! order; when a record contributes several backends, the settings applied
//! last win. Each record's policy tracks the (rule, backend) positions it
//! governs.

use crate::annotations::{IngressSettings, Settings};
use ingress_converter_core::{
    ConversionError, Diagnostics, ErrorKind, Policy, ResourceRef, RouteContext, RouteTable,
    RuleBackendIndex,
};
use tracing::trace;

pub fn merge(routes: &mut RouteTable, settings: &Settings, provider: &str) {
    for route in routes.iter_mut() {
        merge_route(route, settings, provider);
    }
}

fn merge_route(route: &mut RouteContext, settings: &Settings, provider: &str) {
    let governed = route
        .rule_backend_sources()
        .filter_map(|(idx, backend)| {
            let settings = settings.get(&backend.source)?;
            settings
                .has_policy()
                .then(|| (idx, backend.source.clone(), settings))
        })
        .collect::<Vec<_>>();
    if governed.is_empty() {
        return;
    }

    let route_key = route.key.clone();
    let policies = route.provider_policies_mut(provider);
    for (idx, source, settings) in governed {
        let policy = policies.entry(source.name.clone()).or_default();
        apply(policy, settings);
        if policy.govern(idx) {
            trace!(route = %route_key, %source, rule = idx.rule, backend = idx.backend, "Policy governs backend");
        }
    }
}

fn apply(policy: &mut Policy, settings: &IngressSettings) {
    if let Some(rate_limit) = settings.rate_limit.as_ref() {
        policy.merge_rate_limit(rate_limit);
    }
    if let Some(access_log) = settings.access_log {
        policy.merge_access_log(access_log);
    }
    if let Some(cors) = settings.cors.as_ref() {
        policy.merge_cors(cors);
    }
}

/// Ensures every position a policy governs exists on its route.
pub fn check_indices(routes: &RouteTable, diagnostics: &mut Diagnostics) {
    for route in routes.iter() {
        for (provider, policies) in &route.policies {
            for (name, policy) in policies {
                for idx in policy
                    .rule_backend_sources
                    .iter()
                    .filter(|idx| !route.contains(**idx))
                {
                    diagnostics.error(out_of_range(route, provider, name, *idx));
                }
            }
        }
    }
}

fn out_of_range(
    route: &RouteContext,
    provider: &str,
    name: &str,
    RuleBackendIndex { rule, backend }: RuleBackendIndex,
) -> ConversionError {
    ConversionError::new(
        ErrorKind::RuleIndexOutOfRange,
        ResourceRef::new(&route.key.namespace, name),
        format!("policies[{provider}].ruleBackendSources"),
        format!(
            "route {} has no backend {backend} in rule {rule}",
            route.key
        ),
    )
}
