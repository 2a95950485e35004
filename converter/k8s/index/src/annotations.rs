//! Parses a record's annotations into typed per-feature settings.
//!
//! Each record is parsed exactly once; the extractors below never see the raw
//! annotation map again. Canary and CORS problems are reported as errors,
//! while malformed rate-limit and access-log values simply disable the
//! feature for that record.

use ahash::AHashMap as HashMap;
use ingress_converter_core::{
    AccessLogPolicy, ConversionError, CorsPolicy, Diagnostics, ErrorKind, RateLimitPolicy,
    ResourceRef,
};
use ingress_converter_k8s_api::SourceRecord;

pub mod access_log;
pub mod canary;
pub mod cors;
pub mod rate_limit;

pub use self::canary::{CanaryConfig, CanaryHeader, CanaryWeight};

pub const PREFIX: &str = "nginx.ingress.kubernetes.io/";

pub mod keys {
    pub const CANARY: &str = "nginx.ingress.kubernetes.io/canary";
    pub const CANARY_BY_HEADER: &str = "nginx.ingress.kubernetes.io/canary-by-header";
    pub const CANARY_BY_HEADER_VALUE: &str = "nginx.ingress.kubernetes.io/canary-by-header-value";
    pub const CANARY_BY_HEADER_PATTERN: &str =
        "nginx.ingress.kubernetes.io/canary-by-header-pattern";
    pub const CANARY_WEIGHT: &str = "nginx.ingress.kubernetes.io/canary-weight";
    pub const CANARY_WEIGHT_TOTAL: &str = "nginx.ingress.kubernetes.io/canary-weight-total";

    pub const LIMIT_RPS: &str = "nginx.ingress.kubernetes.io/limit-rps";
    pub const LIMIT_RPM: &str = "nginx.ingress.kubernetes.io/limit-rpm";
    pub const LIMIT_BURST_MULTIPLIER: &str = "nginx.ingress.kubernetes.io/limit-burst-multiplier";

    pub const ENABLE_ACCESS_LOG: &str = "nginx.ingress.kubernetes.io/enable-access-log";

    pub const ENABLE_CORS: &str = "nginx.ingress.kubernetes.io/enable-cors";
    pub const CORS_ALLOW_ORIGIN: &str = "nginx.ingress.kubernetes.io/cors-allow-origin";
    pub const CORS_ALLOW_METHODS: &str = "nginx.ingress.kubernetes.io/cors-allow-methods";
    pub const CORS_ALLOW_HEADERS: &str = "nginx.ingress.kubernetes.io/cors-allow-headers";
    pub const CORS_EXPOSE_HEADERS: &str = "nginx.ingress.kubernetes.io/cors-expose-headers";
    pub const CORS_ALLOW_CREDENTIALS: &str = "nginx.ingress.kubernetes.io/cors-allow-credentials";
    pub const CORS_MAX_AGE: &str = "nginx.ingress.kubernetes.io/cors-max-age";

    pub const USE_REGEX: &str = "nginx.ingress.kubernetes.io/use-regex";

    pub const SUPPORTED: [&str; 18] = [
        CANARY,
        CANARY_BY_HEADER,
        CANARY_BY_HEADER_VALUE,
        CANARY_BY_HEADER_PATTERN,
        CANARY_WEIGHT,
        CANARY_WEIGHT_TOTAL,
        LIMIT_RPS,
        LIMIT_RPM,
        LIMIT_BURST_MULTIPLIER,
        ENABLE_ACCESS_LOG,
        ENABLE_CORS,
        CORS_ALLOW_ORIGIN,
        CORS_ALLOW_METHODS,
        CORS_ALLOW_HEADERS,
        CORS_EXPOSE_HEADERS,
        CORS_ALLOW_CREDENTIALS,
        CORS_MAX_AGE,
        USE_REGEX,
    ];
}

/// The typed configuration of every annotation family for one record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngressSettings {
    pub canary: Option<CanaryConfig>,
    pub rate_limit: Option<RateLimitPolicy>,
    pub access_log: Option<AccessLogPolicy>,
    pub cors: Option<CorsPolicy>,
    pub use_regex: bool,
}

/// Settings for every record of a run, indexed by record.
#[derive(Clone, Debug, Default)]
pub struct Settings {
    by_resource: HashMap<ResourceRef, IngressSettings>,
}

// === impl IngressSettings ===

impl IngressSettings {
    pub fn parse(record: &SourceRecord, diagnostics: &mut Diagnostics) -> Self {
        for key in record.annotations.keys() {
            if key.starts_with(PREFIX) && !keys::SUPPORTED.contains(&key.as_str()) {
                diagnostics.warn(
                    Some(&record.id),
                    format!("annotation {key} is not supported and will be ignored"),
                );
            }
        }

        let use_regex = match record.annotation(keys::USE_REGEX).map(parse_bool) {
            Some(Some(use_regex)) => use_regex,
            Some(None) => {
                diagnostics.error(invalid_value(
                    &record.id,
                    keys::USE_REGEX,
                    "expected a boolean",
                ));
                false
            }
            None => false,
        };

        Self {
            canary: canary::parse(record, diagnostics),
            rate_limit: rate_limit::parse(record),
            access_log: access_log::parse(record),
            cors: cors::parse(record, diagnostics),
            use_regex,
        }
    }

    pub fn is_canary(&self) -> bool {
        self.canary.is_some()
    }

    /// True when the record carries any setting that must be attributed to a
    /// policy.
    pub fn has_policy(&self) -> bool {
        self.rate_limit.is_some() || self.access_log.is_some() || self.cors.is_some()
    }
}

// === impl Settings ===

impl Settings {
    /// Parses every record in ingestion order.
    pub fn parse<'r>(
        records: impl IntoIterator<Item = &'r SourceRecord>,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let by_resource = records
            .into_iter()
            .map(|record| {
                (
                    record.id.clone(),
                    IngressSettings::parse(record, diagnostics),
                )
            })
            .collect();
        Self { by_resource }
    }

    pub fn get(&self, id: &ResourceRef) -> Option<&IngressSettings> {
        self.by_resource.get(id)
    }

    pub fn canary(&self, id: &ResourceRef) -> Option<&CanaryConfig> {
        self.get(id).and_then(|s| s.canary.as_ref())
    }
}

impl FromIterator<(ResourceRef, IngressSettings)> for Settings {
    fn from_iter<T: IntoIterator<Item = (ResourceRef, IngressSettings)>>(iter: T) -> Self {
        Self {
            by_resource: iter.into_iter().collect(),
        }
    }
}

/// Parses booleans the way the legacy controller does.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Splits a comma-separated list, dropping empty items.
pub fn parse_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn invalid_value(
    resource: &ResourceRef,
    key: &str,
    message: impl std::fmt::Display,
) -> ConversionError {
    ConversionError::new(
        ErrorKind::InvalidAnnotationValue,
        resource.clone(),
        key,
        format!("invalid value for {key}: {message}"),
    )
}
