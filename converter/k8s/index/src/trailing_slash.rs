use ahash::AHashSet as HashSet;
use ingress_converter_core::{
    routes::StatusCode, Filter, HttpRouteMatch, PathMatch, PathModifier, RequestRedirectFilter,
    RouteContext, RouteRule, RouteTable,
};
use tracing::debug;

/// Adds a permanent redirect from `/foo` to `/foo/` for every exact or prefix
/// path ending in a slash, unless `/foo` is already matched exactly.
pub fn synthesize(routes: &mut RouteTable) {
    for route in routes.iter_mut() {
        synthesize_route(route);
    }
}

fn synthesize_route(route: &mut RouteContext) {
    let mut exact = route
        .rules
        .iter()
        .flat_map(|rule| rule.matches.iter())
        .filter_map(|m| match &m.path {
            Some(PathMatch::Exact(path)) => Some(path.clone()),
            _ => None,
        })
        .collect::<HashSet<String>>();

    let slashed = route
        .rules
        .iter()
        .flat_map(|rule| rule.matches.iter())
        .filter_map(|m| match &m.path {
            Some(PathMatch::Exact(path)) | Some(PathMatch::Prefix(path))
                if path.len() > 1 && path.ends_with('/') =>
            {
                Some(path.clone())
            }
            _ => None,
        })
        .collect::<Vec<_>>();

    for path in slashed {
        let stripped = &path[..path.len() - 1];
        // Marking the stripped path as exact also dedupes later candidates.
        if !exact.insert(stripped.to_string()) {
            continue;
        }

        debug!(route = %route.key, from = %stripped, to = %path, "Synthesizing trailing slash redirect");
        route.rules.push(RouteRule {
            matches: vec![HttpRouteMatch {
                path: Some(PathMatch::Exact(stripped.to_string())),
                headers: vec![],
            }],
            filters: vec![Filter::RequestRedirect(RequestRedirectFilter {
                path: Some(PathModifier::Full(path.clone())),
                status: Some(StatusCode::MOVED_PERMANENTLY),
                ..Default::default()
            })],
            backends: vec![],
        });
    }
}
