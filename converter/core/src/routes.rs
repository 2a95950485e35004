use crate::policy::{Policy, RuleBackendIndex};
use ahash::AHashMap as HashMap;
pub use http::StatusCode;
use serde::{Serialize, Serializer};
use std::{collections::BTreeMap, fmt};

/// Identifies the source resource that contributed part of a route.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResourceRef {
    pub namespace: String,
    pub name: String,
}

/// Identifies a target route: the namespace plus a name derived from the rule
/// group's name and host.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RouteKey {
    pub namespace: String,
    pub name: String,
}

/// Holds all routes produced by a conversion run, in the order their keys were
/// first seen.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<RouteContext>,
    by_key: HashMap<RouteKey, usize>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteContext {
    pub key: RouteKey,
    pub hostnames: Vec<String>,
    pub rules: Vec<RouteRule>,

    /// Policies indexed by provider and then by originating resource name.
    pub policies: BTreeMap<String, BTreeMap<String, Policy>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RouteRule {
    pub matches: Vec<HttpRouteMatch>,
    pub filters: Vec<Filter>,
    pub backends: Vec<SourcedBackend>,
}

/// A backend along with the resource that produced it. Keeping the two
/// together means provenance can never drift from the backend list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourcedBackend {
    #[serde(flatten)]
    pub backend: BackendRef,
    pub source: ResourceRef,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BackendRef {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<BackendPort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BackendPort {
    Number(u16),
    Name(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HttpRouteMatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathMatch>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<HeaderMatch>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum PathMatch {
    Exact(String),
    #[serde(rename = "PathPrefix")]
    Prefix(String),
    #[serde(rename = "RegularExpression")]
    Regex(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct HeaderMatch {
    pub name: String,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Exact(String),
    #[serde(rename = "RegularExpression")]
    Regex(String),
}

/// Clusters rules that must collapse into a single target rule. The header
/// component keeps header-gated rules apart from unconditional ones.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathMatchKey {
    pub kind: PathKind,
    pub value: String,
    pub header: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathKind {
    None,
    Exact,
    Prefix,
    Regex,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Filter {
    RequestRedirect(RequestRedirectFilter),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRedirectFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathModifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(
        rename = "statusCode",
        serialize_with = "serialize_status",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<StatusCode>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum PathModifier {
    #[serde(rename = "ReplaceFullPath")]
    Full(String),
    #[serde(rename = "ReplacePrefixMatch")]
    Prefix(String),
}

fn serialize_status<S: Serializer>(status: &Option<StatusCode>, s: S) -> Result<S::Ok, S::Error> {
    match status {
        Some(status) => s.serialize_u16(status.as_u16()),
        None => s.serialize_none(),
    }
}

// === impl ResourceRef ===

impl ResourceRef {
    pub fn new(namespace: impl ToString, name: impl ToString) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

// === impl RouteKey ===

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

// === impl RouteTable ===

impl RouteTable {
    /// Returns the route for `key`, creating an empty one for `hostname` if
    /// the key has not been seen yet.
    pub fn get_or_insert(&mut self, key: RouteKey, hostname: Option<&str>) -> &mut RouteContext {
        let idx = match self.by_key.get(&key) {
            Some(idx) => *idx,
            None => {
                let idx = self.routes.len();
                self.by_key.insert(key.clone(), idx);
                self.routes.push(RouteContext::new(key, hostname));
                idx
            }
        };
        &mut self.routes[idx]
    }

    pub fn get(&self, key: &RouteKey) -> Option<&RouteContext> {
        self.by_key.get(key).map(|idx| &self.routes[*idx])
    }

    pub fn get_mut(&mut self, key: &RouteKey) -> Option<&mut RouteContext> {
        let idx = *self.by_key.get(key)?;
        self.routes.get_mut(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteContext> {
        self.routes.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RouteContext> {
        self.routes.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Serialize for RouteTable {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(self.routes.iter())
    }
}

// === impl RouteContext ===

impl RouteContext {
    pub fn new(key: RouteKey, hostname: Option<&str>) -> Self {
        Self {
            key,
            hostnames: hostname
                .filter(|h| !h.is_empty())
                .map(|h| vec![h.to_string()])
                .unwrap_or_default(),
            rules: vec![],
            policies: BTreeMap::new(),
        }
    }

    /// Iterates over every backend in rule order, yielding its position and
    /// the resource it came from.
    pub fn rule_backend_sources(
        &self,
    ) -> impl Iterator<Item = (RuleBackendIndex, &SourcedBackend)> + '_ {
        self.rules.iter().enumerate().flat_map(|(rule, r)| {
            r.backends
                .iter()
                .enumerate()
                .map(move |(backend, b)| (RuleBackendIndex { rule, backend }, b))
        })
    }

    pub fn contains(&self, idx: RuleBackendIndex) -> bool {
        self.rules
            .get(idx.rule)
            .map(|r| idx.backend < r.backends.len())
            .unwrap_or(false)
    }

    pub fn provider_policies_mut(&mut self, provider: &str) -> &mut BTreeMap<String, Policy> {
        self.policies.entry(provider.to_string()).or_default()
    }

    pub fn provider_policies(&self, provider: &str) -> Option<&BTreeMap<String, Policy>> {
        self.policies.get(provider)
    }

    pub fn rule_position(&self, key: &PathMatchKey) -> Option<usize> {
        self.rules
            .iter()
            .position(|r| r.path_match_key().as_ref() == Some(key))
    }
}

// === impl RouteRule ===

impl RouteRule {
    /// A rule is keyed by its first match.
    pub fn path_match_key(&self) -> Option<PathMatchKey> {
        self.matches.first().map(PathMatchKey::from_match)
    }
}

// === impl PathMatch ===

impl PathMatch {
    pub fn value(&self) -> &str {
        match self {
            Self::Exact(v) | Self::Prefix(v) | Self::Regex(v) => v,
        }
    }

    pub fn kind(&self) -> PathKind {
        match self {
            Self::Exact(_) => PathKind::Exact,
            Self::Prefix(_) => PathKind::Prefix,
            Self::Regex(_) => PathKind::Regex,
        }
    }
}

// === impl PathMatchKey ===

impl PathMatchKey {
    pub fn from_match(m: &HttpRouteMatch) -> Self {
        let (kind, value) = match &m.path {
            Some(path) => (path.kind(), path.value().to_string()),
            None => (PathKind::None, String::new()),
        };
        Self {
            kind,
            value,
            header: m.headers.first().map(|h| h.name.to_ascii_lowercase()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(name: &str) -> RouteKey {
        RouteKey {
            namespace: "default".to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn route_table_preserves_first_seen_order() {
        let mut table = RouteTable::default();
        assert!(table.is_empty());
        table.get_or_insert(key("b"), Some("b.example.com"));
        table.get_or_insert(key("a"), Some("a.example.com"));
        table
            .get_or_insert(key("b"), Some("ignored.example.com"))
            .rules
            .push(RouteRule::default());

        let names = table.iter().map(|r| r.key.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["b", "a"]);
        assert!(!table.is_empty());
        let b = table.get(&key("b")).expect("route must exist");
        assert_eq!(b.hostnames, vec!["b.example.com".to_string()]);
        assert_eq!(b.rules.len(), 1);
    }

    #[test]
    fn header_matches_are_part_of_the_key() {
        let plain = HttpRouteMatch {
            path: Some(PathMatch::Prefix("/".to_string())),
            headers: vec![],
        };
        let gated = HttpRouteMatch {
            headers: vec![HeaderMatch {
                name: "X-Canary".to_string(),
                value: Value::Exact("always".to_string()),
            }],
            ..plain.clone()
        };
        assert_ne!(PathMatchKey::from_match(&plain), PathMatchKey::from_match(&gated));
        assert_eq!(
            PathMatchKey::from_match(&gated).header.as_deref(),
            Some("x-canary")
        );
    }

    #[test]
    fn redirect_filter_serializes_status_code() {
        let filter = Filter::RequestRedirect(RequestRedirectFilter {
            path: Some(PathModifier::Full("/foo/".to_string())),
            status: Some(StatusCode::MOVED_PERMANENTLY),
            ..Default::default()
        });
        let json = serde_json::to_value(&filter).expect("must serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "RequestRedirect": {
                    "path": { "ReplaceFullPath": "/foo/" },
                    "statusCode": 301,
                }
            })
        );
    }
}
