use crate::annotations::Settings;
use ahash::AHashSet as HashSet;
use ingress_converter_core::{PathMatch, RouteTable};
use ingress_converter_k8s_api::SourceRecord;
use tracing::debug;

/// Rewrites every path match of every route serving a host on which some
/// non-canary record enables regex paths. Legacy regex locations are prefix
/// matches, so `.*` is appended to each path.
pub fn rewrite(routes: &mut RouteTable, records: &[SourceRecord], settings: &Settings) {
    let hosts = records
        .iter()
        .filter(|record| {
            settings
                .get(&record.id)
                .map(|s| s.use_regex && !s.is_canary())
                .unwrap_or(false)
        })
        .flat_map(|record| record.rules.iter().map(|rule| rule.host.as_str()))
        .collect::<HashSet<&str>>();
    if hosts.is_empty() {
        return;
    }

    for route in routes.iter_mut() {
        let affected = if route.hostnames.is_empty() {
            hosts.contains("")
        } else {
            route.hostnames.iter().any(|h| hosts.contains(h.as_str()))
        };
        if !affected {
            continue;
        }

        debug!(route = %route.key, "Rewriting paths as regular expressions");
        for path in route
            .rules
            .iter_mut()
            .flat_map(|rule| rule.matches.iter_mut())
            .filter_map(|m| m.path.as_mut())
        {
            if let PathMatch::Exact(value) | PathMatch::Prefix(value) = path {
                *path = PathMatch::Regex(format!("{value}.*"));
            }
        }
    }
}
