use ahash::AHashMap as HashMap;
use ingress_converter_core::RouteKey;
use ingress_converter_k8s_api::{SourceRecord, SourceRule};

/// All rules contributed to a single (namespace, host) route.
#[derive(Clone, Debug)]
pub struct RuleGroup<'r> {
    pub key: RouteKey,
    pub name: String,
    pub host: String,
    pub rules: Vec<GroupedRule<'r>>,
}

#[derive(Copy, Clone, Debug)]
pub struct GroupedRule<'r> {
    pub record: &'r SourceRecord,
    pub rule: &'r SourceRule,
}

/// Groups every rule of every record by route identity. Groups are returned
/// in the order they were first seen, and each group's rules keep record
/// ingestion order. No validation happens here.
pub fn group_rules<'r>(records: &'r [SourceRecord], default_class: &str) -> Vec<RuleGroup<'r>> {
    let mut groups = Vec::<RuleGroup<'r>>::new();
    let mut by_key = HashMap::<RouteKey, usize>::new();

    for record in records {
        let name = record.class().unwrap_or(default_class);
        for rule in &record.rules {
            let key = RouteKey {
                namespace: record.id.namespace.clone(),
                name: route_name(name, &rule.host),
            };
            let idx = *by_key.entry(key.clone()).or_insert_with(|| {
                groups.push(RuleGroup {
                    key,
                    name: name.to_string(),
                    host: rule.host.clone(),
                    rules: vec![],
                });
                groups.len() - 1
            });
            groups[idx].rules.push(GroupedRule { record, rule });
        }
    }

    groups
}

/// Derives a route name from a group name and host.
pub fn route_name(group: &str, host: &str) -> String {
    let host = if host.is_empty() {
        "all-hosts".to_string()
    } else {
        host.replace('*', "wildcard")
    };
    format!("{group}-{host}")
}
