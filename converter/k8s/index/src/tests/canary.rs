use super::*;
use crate::annotations::keys;
use ingress_converter_core::{HeaderMatch, Value};
use pretty_assertions::assert_eq;

fn stable() -> SourceRecord {
    mk_record(
        "ns",
        "stable",
        btreemap! {},
        vec![mk_rule("example.com", "/", "web")],
    )
}

fn canary(annotations: BTreeMap<&str, &str>) -> SourceRecord {
    let mut annotations = annotations;
    annotations.insert(keys::CANARY, "true");
    mk_record(
        "ns",
        "canary",
        annotations,
        vec![mk_rule("example.com", "/", "web-canary")],
    )
}

#[test]
fn weighted_split() {
    let Conversion {
        routes,
        diagnostics,
    } = run(&[stable(), canary(btreemap! { keys::CANARY_WEIGHT => "20" })]);

    assert!(!diagnostics.has_errors());
    let route = routes.iter().next().expect("route must exist");
    assert_eq!(route.rules.len(), 1);
    assert_eq!(
        weights(&route.rules[0]),
        vec![("web", Some(80)), ("web-canary", Some(20))]
    );
    assert_eq!(diagnostics.notifications.len(), 1);
}

#[test]
fn weights_always_sum_to_total() {
    for (weight, total) in [("0", "100"), ("3", "10"), ("10", "10"), ("1", "1000")] {
        let Conversion { routes, .. } = run(&[
            stable(),
            canary(btreemap! {
                keys::CANARY_WEIGHT => weight,
                keys::CANARY_WEIGHT_TOTAL => total,
            }),
        ]);
        let route = routes.iter().next().expect("route must exist");
        let sum = route.rules[0]
            .backends
            .iter()
            .map(|b| b.backend.weight.expect("weight must be set"))
            .sum::<u32>();
        assert_eq!(sum.to_string(), total, "weight={weight} total={total}");
    }
}

#[test]
fn header_rule_precedes_fallback() {
    let Conversion {
        routes,
        diagnostics,
    } = run(&[
        stable(),
        canary(btreemap! { keys::CANARY_BY_HEADER => "X-Canary" }),
    ]);

    assert!(!diagnostics.has_errors());
    let route = routes.iter().next().expect("route must exist");
    assert_eq!(route.rules.len(), 2);

    let header_rule = &route.rules[0];
    assert_eq!(
        header_rule.matches[0].headers,
        vec![HeaderMatch {
            name: "X-Canary".to_string(),
            value: Value::Exact("always".to_string()),
        }]
    );
    assert_eq!(
        header_rule.matches[0].path,
        Some(PathMatch::Prefix("/".to_string()))
    );
    assert_eq!(weights(header_rule), vec![("web-canary", None)]);

    let fallback = &route.rules[1];
    assert!(fallback.matches[0].headers.is_empty());
    assert_eq!(weights(fallback), vec![("web", None)]);
}

#[test]
fn header_with_explicit_weight_keeps_canary_in_fallback() {
    let Conversion { routes, .. } = run(&[
        stable(),
        canary(btreemap! {
            keys::CANARY_BY_HEADER => "X-Canary",
            keys::CANARY_BY_HEADER_VALUE => "yes",
            keys::CANARY_WEIGHT => "10",
        }),
    ]);

    let route = routes.iter().next().expect("route must exist");
    assert_eq!(route.rules.len(), 2);
    assert_eq!(
        route.rules[0].matches[0].headers[0].value,
        Value::Exact("yes".to_string())
    );
    assert_eq!(weights(&route.rules[0]), vec![("web-canary", None)]);
    assert_eq!(
        weights(&route.rules[1]),
        vec![("web", Some(90)), ("web-canary", Some(10))]
    );
}

#[test]
fn header_pattern_becomes_regex_match() {
    let Conversion { routes, .. } = run(&[
        stable(),
        canary(btreemap! {
            keys::CANARY_BY_HEADER => "X-Canary",
            keys::CANARY_BY_HEADER_PATTERN => "^beta-.*$",
        }),
    ]);
    let route = routes.iter().next().expect("route must exist");
    assert_eq!(
        route.rules[0].matches[0].headers[0].value,
        Value::Regex("^beta-.*$".to_string())
    );
}

#[test]
fn multiple_canaries_conflict() {
    let other = mk_record(
        "ns",
        "canary-2",
        btreemap! {
            keys::CANARY => "true",
            keys::CANARY_WEIGHT => "30",
        },
        vec![mk_rule("example.com", "/", "web-canary-2")],
    );
    let Conversion {
        routes,
        diagnostics,
    } = run(&[
        stable(),
        canary(btreemap! { keys::CANARY_WEIGHT => "20" }),
        other,
    ]);

    assert_eq!(
        diagnostics
            .errors_of(ErrorKind::MultipleCanaryBackends)
            .count(),
        1
    );
    let route = routes.iter().next().expect("route must exist");
    assert!(route.rules[0]
        .backends
        .iter()
        .all(|b| b.backend.weight.is_none()));
}

#[test]
fn multiple_stables_conflict() {
    let other = mk_record(
        "ns",
        "stable-2",
        btreemap! {},
        vec![mk_rule("example.com", "/", "web-2")],
    );
    let Conversion {
        routes,
        diagnostics,
    } = run(&[
        stable(),
        other,
        canary(btreemap! { keys::CANARY_WEIGHT => "20" }),
    ]);

    assert_eq!(
        diagnostics
            .errors_of(ErrorKind::MultipleNonCanaryBackends)
            .count(),
        1
    );
    let route = routes.iter().next().expect("route must exist");
    assert!(route.rules[0]
        .backends
        .iter()
        .all(|b| b.backend.weight.is_none()));
}

#[test]
fn canary_without_stable() {
    let Conversion {
        routes,
        diagnostics,
    } = run(&[canary(btreemap! { keys::CANARY_WEIGHT => "20" })]);

    let errors = diagnostics
        .errors_of(ErrorKind::CanaryWithoutStable)
        .collect::<Vec<_>>();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].resource, ResourceRef::new("ns", "canary"));

    let route = routes.iter().next().expect("route must exist");
    assert_eq!(weights(&route.rules[0]), vec![("web-canary", None)]);
}

#[test]
fn invalid_weight_leaves_rule_untouched() {
    let Conversion {
        routes,
        diagnostics,
    } = run(&[
        stable(),
        canary(btreemap! {
            keys::CANARY_WEIGHT => "150",
            keys::CANARY_BY_HEADER => "X-Canary",
        }),
    ]);

    assert_eq!(
        diagnostics
            .errors_of(ErrorKind::WeightExceedsTotal)
            .count(),
        1
    );
    let route = routes.iter().next().expect("route must exist");
    assert_eq!(route.rules.len(), 1, "no header rule is synthesized");
    assert_eq!(
        weights(&route.rules[0]),
        vec![("web", None), ("web-canary", None)]
    );
}

#[test]
fn canary_only_affects_shared_rules() {
    let mut stable = stable();
    stable.rules.push(mk_rule("example.com", "/api", "api"));

    let Conversion { routes, .. } = run(&[
        stable,
        canary(btreemap! { keys::CANARY_WEIGHT => "50" }),
    ]);

    let route = routes.iter().next().expect("route must exist");
    assert_eq!(
        weights(&route.rules[0]),
        vec![("web", Some(50)), ("web-canary", Some(50))]
    );
    assert_eq!(weights(&route.rules[1]), vec![("api", None)]);
}

#[test]
fn legacy_mode_distributes_remainder() {
    let weighted = mk_record(
        "ns",
        "canary-weighted",
        btreemap! {
            keys::CANARY => "true",
            keys::CANARY_WEIGHT => "30",
        },
        vec![mk_rule("example.com", "/", "web-weighted")],
    );
    let config = Config {
        canary_mode: CanaryMode::Legacy,
        ..Config::default()
    };

    let Conversion {
        routes,
        diagnostics,
    } = run_with(&[stable(), weighted, canary(btreemap! {})], &config);

    assert!(!diagnostics.has_errors());
    let route = routes.iter().next().expect("route must exist");
    assert_eq!(
        weights(&route.rules[0]),
        vec![
            ("web", Some(35)),
            ("web-weighted", Some(30)),
            ("web-canary", Some(35)),
        ]
    );
}

#[test]
fn legacy_mode_never_assigns_negative_weights() {
    let heavy = |name: &'static str, weight: &'static str| {
        mk_record(
            "ns",
            name,
            btreemap! {
                keys::CANARY => "true",
                keys::CANARY_WEIGHT => weight,
            },
            vec![mk_rule("example.com", "/", name)],
        )
    };
    let config = Config {
        canary_mode: CanaryMode::Legacy,
        ..Config::default()
    };

    let Conversion { routes, .. } = run_with(
        &[stable(), heavy("canary-a", "80"), heavy("canary-b", "90")],
        &config,
    );

    let route = routes.iter().next().expect("route must exist");
    assert_eq!(
        weights(&route.rules[0]),
        vec![
            ("web", Some(0)),
            ("canary-a", Some(80)),
            ("canary-b", Some(90)),
        ]
    );
}

#[test]
fn legacy_mode_keeps_strict_rules_for_pairs() {
    let config = Config {
        canary_mode: CanaryMode::Legacy,
        ..Config::default()
    };
    let Conversion { routes, .. } = run_with(
        &[stable(), canary(btreemap! { keys::CANARY_WEIGHT => "25" })],
        &config,
    );
    let route = routes.iter().next().expect("route must exist");
    assert_eq!(
        weights(&route.rules[0]),
        vec![("web", Some(75)), ("web-canary", Some(25))]
    );
}

#[test]
fn legacy_mode_reports_conflicts_without_explicit_weights() {
    let other = mk_record(
        "ns",
        "canary-2",
        btreemap! { keys::CANARY => "true" },
        vec![mk_rule("example.com", "/", "web-canary-2")],
    );
    let config = Config {
        canary_mode: CanaryMode::Legacy,
        ..Config::default()
    };

    let Conversion {
        routes,
        diagnostics,
    } = run_with(&[stable(), canary(btreemap! {}), other], &config);

    assert_eq!(
        diagnostics
            .errors_of(ErrorKind::MultipleCanaryBackends)
            .count(),
        1
    );
    let route = routes.iter().next().expect("route must exist");
    assert!(route.rules[0]
        .backends
        .iter()
        .all(|b| b.backend.weight.is_none()));
}

#[test]
fn legacy_mode_requires_a_stable_backend() {
    let weighted = |name: &'static str, weight: &'static str| {
        mk_record(
            "ns",
            name,
            btreemap! {
                keys::CANARY => "true",
                keys::CANARY_WEIGHT => weight,
            },
            vec![mk_rule("example.com", "/", name)],
        )
    };
    let config = Config {
        canary_mode: CanaryMode::Legacy,
        ..Config::default()
    };

    let Conversion {
        routes,
        diagnostics,
    } = run_with(
        &[
            weighted("canary-a", "10"),
            weighted("canary-b", "20"),
            weighted("canary-c", "30"),
        ],
        &config,
    );

    assert_eq!(
        diagnostics
            .errors_of(ErrorKind::MultipleCanaryBackends)
            .count(),
        1
    );
    let route = routes.iter().next().expect("route must exist");
    assert!(route.rules[0]
        .backends
        .iter()
        .all(|b| b.backend.weight.is_none()));
}
