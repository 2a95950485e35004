use crate::rule_group::RuleGroup;
use ingress_converter_core::{
    BackendRef, Diagnostics, HttpRouteMatch, PathMatch, PathMatchKey, RouteRule, RouteTable,
    SourcedBackend,
};
use ingress_converter_k8s_api::{IngressPath, PathType};
use tracing::trace;

/// Builds the structural IR for each group: rules are clustered by their
/// path match key, and each contributing record rule adds one backend.
pub fn build(groups: &[RuleGroup<'_>], routes: &mut RouteTable, diagnostics: &mut Diagnostics) {
    for group in groups {
        let route = routes.get_or_insert(group.key.clone(), Some(&group.host));

        for grouped in &group.rules {
            let record = grouped.record;
            let Some(service) = grouped.rule.backend.as_ref() else {
                diagnostics.warn(
                    Some(&record.id),
                    format!(
                        "path {} on host {:?} does not reference a Service and is skipped",
                        path_value(&grouped.rule.path),
                        grouped.rule.host,
                    ),
                );
                continue;
            };

            let route_match = HttpRouteMatch {
                path: Some(path_match(&grouped.rule.path)),
                headers: vec![],
            };
            let key = PathMatchKey::from_match(&route_match);
            let idx = match route.rule_position(&key) {
                Some(idx) => idx,
                None => {
                    route.rules.push(RouteRule {
                        matches: vec![route_match],
                        ..Default::default()
                    });
                    route.rules.len() - 1
                }
            };

            let backend = SourcedBackend {
                backend: BackendRef {
                    name: service.name.clone(),
                    port: service.port.clone(),
                    weight: None,
                },
                source: record.id.clone(),
            };
            let rule = &mut route.rules[idx];
            if !rule.backends.contains(&backend) {
                trace!(route = %route.key, rule = idx, backend = %backend.backend.name, source = %record.id, "Adding backend");
                rule.backends.push(backend);
            }
        }
    }
}

pub fn path_match(path: &IngressPath) -> PathMatch {
    let value = path_value(path).to_string();
    match path.path_type {
        PathType::Exact => PathMatch::Exact(value),
        PathType::Prefix | PathType::ImplementationSpecific => PathMatch::Prefix(value),
    }
}

fn path_value(path: &IngressPath) -> &str {
    path.value.as_deref().filter(|p| !p.is_empty()).unwrap_or("/")
}
