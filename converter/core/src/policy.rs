use serde::Serialize;
use std::collections::BTreeSet;

/// Accumulates the policy intent of a single source resource across every
/// route rule and backend it contributed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_log: Option<AccessLogPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cors: Option<CorsPolicy>,

    /// The (rule, backend) positions this policy governs.
    pub rule_backend_sources: BTreeSet<RuleBackendIndex>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RuleBackendIndex {
    pub rule: usize,
    pub backend: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitPolicy {
    pub limit: u32,
    pub unit: RateUnit,
    pub burst_multiplier: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum RateUnit {
    Second,
    Minute,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AccessLogPolicy {
    pub enabled: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorsPolicy {
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expose_headers: Vec<String>,
    pub allow_credentials: bool,
    /// Seconds.
    pub max_age: u64,
}

// === impl Policy ===

impl Policy {
    /// Merges a rate limit into this policy. The most recent limit and unit
    /// win; the burst multiplier is only replaced by a positive value.
    pub fn merge_rate_limit(&mut self, update: &RateLimitPolicy) {
        match self.rate_limit.as_mut() {
            Some(current) => {
                current.limit = update.limit;
                current.unit = update.unit;
                if update.burst_multiplier > 0 {
                    current.burst_multiplier = update.burst_multiplier;
                }
            }
            None => self.rate_limit = Some(update.clone()),
        }
    }

    pub fn merge_access_log(&mut self, update: AccessLogPolicy) {
        self.access_log = Some(update);
    }

    pub fn merge_cors(&mut self, update: &CorsPolicy) {
        self.cors = Some(update.clone());
    }

    /// Records that this policy governs `idx`. Returns false if it already
    /// did.
    pub fn govern(&mut self, idx: RuleBackendIndex) -> bool {
        self.rule_backend_sources.insert(idx)
    }
}

// === impl RateLimitPolicy ===

impl RateLimitPolicy {
    pub const DEFAULT_BURST_MULTIPLIER: u32 = 1;
}

// === impl CorsPolicy ===

impl CorsPolicy {
    pub const DEFAULT_MAX_AGE: u64 = 1_728_000;

    pub const DEFAULT_ALLOW_METHODS: [&'static str; 6] =
        ["GET", "PUT", "POST", "DELETE", "PATCH", "OPTIONS"];

    pub const DEFAULT_ALLOW_HEADERS: [&'static str; 9] = [
        "DNT",
        "Keep-Alive",
        "User-Agent",
        "X-Requested-With",
        "If-Modified-Since",
        "Cache-Control",
        "Content-Type",
        "Range",
        "Authorization",
    ];
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allow_origins: vec!["*".to_string()],
            allow_methods: Self::DEFAULT_ALLOW_METHODS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allow_headers: Self::DEFAULT_ALLOW_HEADERS
                .iter()
                .map(|h| h.to_string())
                .collect(),
            expose_headers: vec![],
            allow_credentials: true,
            max_age: Self::DEFAULT_MAX_AGE,
        }
    }
}
