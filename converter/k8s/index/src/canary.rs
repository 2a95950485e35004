//! Resolves canary splits per route rule.
//!
//! Each rule may have at most one canary backend and one stable backend. A
//! weighted canary sets backend weights on the rule; a header canary adds a
//! header-gated rule ahead of the original rule, since target routers pick the
//! first matching rule.

use crate::annotations::{CanaryConfig, CanaryWeight, Settings};
use ahash::AHashSet as HashSet;
use ingress_converter_core::{
    ConversionError, Diagnostics, ErrorKind, HeaderMatch, HttpRouteMatch, PathMatchKey,
    RouteContext, RouteRule, RouteTable,
};
use tracing::{debug, trace};

/// How weights are assigned when a rule has backends from more than two
/// records.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CanaryMode {
    /// At most one canary and one stable backend per rule.
    #[default]
    Strict,

    /// Rules with more than two backends, only some of which carry an
    /// explicit canary weight, split the remainder of the weight total evenly
    /// across the unweighted backends. All other rules resolve strictly.
    Legacy,
}

pub fn resolve(
    routes: &mut RouteTable,
    settings: &Settings,
    mode: CanaryMode,
    diagnostics: &mut Diagnostics,
) {
    for route in routes.iter_mut() {
        resolve_route(route, settings, mode, diagnostics);
    }
}

fn resolve_route(
    route: &mut RouteContext,
    settings: &Settings,
    mode: CanaryMode,
    diagnostics: &mut Diagnostics,
) {
    let rules = std::mem::take(&mut route.rules);
    let mut keys = rules
        .iter()
        .filter_map(RouteRule::path_match_key)
        .collect::<HashSet<PathMatchKey>>();
    let mut resolved = Vec::with_capacity(rules.len());
    let route_name = route.key.to_string();

    for (idx, mut rule) in rules.into_iter().enumerate() {
        let cx = RuleContext {
            route: &route_name,
            rule: idx,
        };

        let header_rule = if mode == CanaryMode::Legacy && is_partially_weighted(&rule, settings) {
            distribute_weights(&cx, &mut rule, settings, diagnostics);
            None
        } else {
            resolve_rule(&cx, &mut rule, &mut keys, settings, diagnostics)
        };

        if let Some(header_rule) = header_rule {
            resolved.push(header_rule);
        }
        resolved.push(rule);
    }

    route.rules = resolved;
}

struct RuleContext<'a> {
    route: &'a str,
    rule: usize,
}

/// Applies a canary split to `rule`, returning the header-gated rule that
/// must be placed before it, if any.
fn resolve_rule(
    cx: &RuleContext<'_>,
    rule: &mut RouteRule,
    keys: &mut HashSet<PathMatchKey>,
    settings: &Settings,
    diagnostics: &mut Diagnostics,
) -> Option<RouteRule> {
    let (canaries, stables): (Vec<usize>, Vec<usize>) = (0..rule.backends.len())
        .partition(|&i| settings.canary(&rule.backends[i].source).is_some());

    if canaries.len() > 1 {
        diagnostics.error(multiple(cx, rule, &canaries, ErrorKind::MultipleCanaryBackends));
        return None;
    }
    if stables.len() > 1 {
        diagnostics.error(multiple(
            cx,
            rule,
            &stables,
            ErrorKind::MultipleNonCanaryBackends,
        ));
        return None;
    }

    let canary_idx = *canaries.first()?;
    let canary_source = rule.backends[canary_idx].source.clone();
    let Some(&stable_idx) = stables.first() else {
        diagnostics.error(ConversionError::new(
            ErrorKind::CanaryWithoutStable,
            canary_source,
            "canary",
            format!(
                "route {} rule {}: canary backend {} has no stable backend to split traffic with",
                cx.route, cx.rule, rule.backends[canary_idx].backend.name
            ),
        ));
        return None;
    };

    let config: &CanaryConfig = settings.canary(&canary_source)?;
    let weight = match &config.weight {
        Ok(weight) => *weight,
        Err(error) => {
            let mut error = error.clone();
            error.message = format!("route {} rule {}: {}", cx.route, cx.rule, error.message);
            diagnostics.error(error);
            return None;
        }
    };

    let canary_name = rule.backends[canary_idx].backend.name.clone();
    let stable_name = rule.backends[stable_idx].backend.name.clone();

    let Some(header) = config.header.as_ref() else {
        set_weights(rule, canary_idx, stable_idx, weight);
        diagnostics.info(
            Some(&canary_source),
            format!(
                "route {} rule {}: {canary_name} receives {}/{} of traffic, {stable_name} receives {}/{}",
                cx.route,
                cx.rule,
                weight.weight,
                weight.total,
                weight.total - weight.weight,
                weight.total,
            ),
        );
        return None;
    };

    let header_match = HeaderMatch {
        name: header.name.clone(),
        value: header.value.clone(),
    };
    let matches = if rule.matches.is_empty() {
        vec![HttpRouteMatch {
            path: None,
            headers: vec![header_match],
        }]
    } else {
        rule.matches
            .iter()
            .cloned()
            .map(|mut m| {
                m.headers.push(header_match.clone());
                m
            })
            .collect()
    };
    let mut canary_backend = rule.backends[canary_idx].clone();
    canary_backend.backend.weight = None;
    let header_rule = RouteRule {
        matches,
        filters: rule.filters.clone(),
        backends: vec![canary_backend],
    };

    // The original rule is only changed once the header rule is accepted.
    if let Some(key) = header_rule.path_match_key() {
        if !keys.insert(key) {
            diagnostics.warn(
                Some(&canary_source),
                format!(
                    "route {} rule {}: a rule matching header {} already exists; canary left unresolved",
                    cx.route, cx.rule, header.name
                ),
            );
            return None;
        }
    }

    if weight.explicit {
        set_weights(rule, canary_idx, stable_idx, weight);
        diagnostics.info(
            Some(&canary_source),
            format!(
                "route {} rule {}: requests with header {} matching {:?} go to {canary_name}; \
                 other requests are split {}/{} to {canary_name} and {}/{} to {stable_name}",
                cx.route,
                cx.rule,
                header.name,
                header.value,
                weight.weight,
                weight.total,
                weight.total - weight.weight,
                weight.total,
            ),
        );
    } else {
        rule.backends.remove(canary_idx);
        diagnostics.info(
            Some(&canary_source),
            format!(
                "route {} rule {}: requests with header {} matching {:?} go to {canary_name}; \
                 other requests go to {stable_name}",
                cx.route, cx.rule, header.name, header.value,
            ),
        );
    }

    debug!(route = %cx.route, rule = cx.rule, header = %header.name, "Synthesized canary header rule");
    Some(header_rule)
}

fn set_weights(rule: &mut RouteRule, canary: usize, stable: usize, weight: CanaryWeight) {
    rule.backends[canary].backend.weight = Some(weight.weight);
    rule.backends[stable].backend.weight = Some(weight.total - weight.weight);
    trace!(canary = weight.weight, stable = weight.total - weight.weight, "Set canary weights");
}

fn multiple(
    cx: &RuleContext<'_>,
    rule: &RouteRule,
    indices: &[usize],
    kind: ErrorKind,
) -> ConversionError {
    let names = indices
        .iter()
        .map(|&i| rule.backends[i].source.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    ConversionError::new(
        kind,
        rule.backends[indices[0]].source.clone(),
        "canary",
        format!(
            "route {} rule {}: backends from {names} cannot share a rule",
            cx.route, cx.rule
        ),
    )
}

/// True when more than two backends share `rule` and some, but not all, of
/// them carry an explicit canary weight.
fn is_partially_weighted(rule: &RouteRule, settings: &Settings) -> bool {
    let explicit = rule
        .backends
        .iter()
        .filter(|b| {
            matches!(
                settings.canary(&b.source).map(|c| &c.weight),
                Some(Ok(CanaryWeight { explicit: true, .. }))
            )
        })
        .count();
    rule.backends.len() > 2 && explicit > 0 && explicit < rule.backends.len()
}

/// Spreads the weight total across a rule's backends. Backends whose records
/// carry an explicit canary weight keep it; the remainder is divided evenly
/// across the others.
fn distribute_weights(
    cx: &RuleContext<'_>,
    rule: &mut RouteRule,
    settings: &Settings,
    diagnostics: &mut Diagnostics,
) {
    let mut explicit = Vec::with_capacity(rule.backends.len());
    for backend in &rule.backends {
        let weight = match settings.canary(&backend.source).map(|c| &c.weight) {
            Some(Ok(weight)) if weight.explicit => Some(*weight),
            Some(Err(error)) => {
                let mut error = error.clone();
                error.message = format!("route {} rule {}: {}", cx.route, cx.rule, error.message);
                diagnostics.error(error);
                return;
            }
            _ => None,
        };
        explicit.push(weight);
    }

    let Some(total) = explicit.iter().flatten().map(|w| w.total).next() else {
        return;
    };
    let unweighted = explicit.iter().filter(|w| w.is_none()).count();
    let assigned = explicit
        .iter()
        .flatten()
        .map(|w| i64::from(w.weight))
        .sum::<i64>();
    let share = if unweighted > 0 {
        ((i64::from(total) - assigned) / unweighted as i64).max(0)
    } else {
        0
    };

    for (backend, weight) in rule.backends.iter_mut().zip(&explicit) {
        let weight = weight.map(|w| i64::from(w.weight)).unwrap_or(share);
        backend.backend.weight = Some(weight.min(i64::from(total)) as u32);
    }

    diagnostics.info(
        rule.backends.first().map(|b| &b.source),
        format!(
            "route {} rule {}: weights distributed across {} backends ({})",
            cx.route,
            cx.rule,
            rule.backends.len(),
            rule.backends
                .iter()
                .map(|b| format!("{}={}", b.backend.name, b.backend.weight.unwrap_or(0)))
                .collect::<Vec<_>>()
                .join(", "),
        ),
    );
}
