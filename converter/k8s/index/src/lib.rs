//! Ingress annotation resolution
//!
//! Converts a batch of Ingress records into route IR, resolving the
//! provider-specific annotations each record carries:
//!
//! - Every record's annotations are parsed once into typed settings.
//! - Record rules are grouped by namespace and host; each group becomes a
//!   route whose rules cluster identical path matches across records.
//! - Canary records split traffic with the stable backend of each rule they
//!   share, either by weight or by a header-gated rule placed ahead of the
//!   shared rule.
//! - Rate-limit, access-log, and CORS settings are merged into a per-record
//!   policy that tracks which (rule, backend) positions it governs.
//! - Hosts with regex-enabled records have all their paths rewritten as
//!   regular expressions, and slash-suffixed paths get a redirect from their
//!   slash-less form.
//!
//! ```text
//! [ SourceRecord ] -> [ RuleGroup ] -> [ RouteContext ] <- canary, policy, regex, trailing slash
//! ```
//!
//! The conversion is best-effort: problems with one record or route are
//! collected in [`Diagnostics`] and do not stop the rest of the batch.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod annotations;
pub mod baseline;
pub mod canary;
pub mod policy;
pub mod regex_path;
pub mod rule_group;
pub mod trailing_slash;


pub use self::{
    annotations::{IngressSettings, Settings},
    canary::CanaryMode,
    rule_group::{group_rules, RuleGroup},
};
use ingress_converter_core::{Diagnostics, RouteTable};
use ingress_converter_k8s_api::SourceRecord;
use tracing::{debug, info_span};

/// The provider name under which policies are recorded on each route.
pub const PROVIDER: &str = "ingress-nginx";

/// The ingress class used for records that do not name one.
pub const DEFAULT_INGRESS_CLASS: &str = "nginx";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub provider: String,
    pub default_ingress_class: String,
    pub canary_mode: CanaryMode,
}

/// The result of a conversion run.
#[derive(Clone, Debug, Default)]
pub struct Conversion {
    pub routes: RouteTable,
    pub diagnostics: Diagnostics,
}

// === impl Config ===

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: PROVIDER.to_string(),
            default_ingress_class: DEFAULT_INGRESS_CLASS.to_string(),
            canary_mode: CanaryMode::default(),
        }
    }
}

/// Converts `records` into route IR.
///
/// Records are processed in the order given. That order determines route and
/// rule order and, where a record contributes several backends, which policy
/// settings are applied last.
pub fn convert(records: &[SourceRecord], config: &Config) -> Conversion {
    let _span = info_span!("convert", records = records.len()).entered();
    let mut diagnostics = Diagnostics::default();

    let settings = Settings::parse(records, &mut diagnostics);

    let groups = group_rules(records, &config.default_ingress_class);
    debug!(groups = groups.len(), "Grouped rules");

    let mut routes = RouteTable::default();
    baseline::build(&groups, &mut routes, &mut diagnostics);

    canary::resolve(&mut routes, &settings, config.canary_mode, &mut diagnostics);
    policy::merge(&mut routes, &settings, &config.provider);
    regex_path::rewrite(&mut routes, records, &settings);
    trailing_slash::synthesize(&mut routes);
    policy::check_indices(&routes, &mut diagnostics);

    debug!(
        routes = routes.len(),
        errors = diagnostics.errors.len(),
        notifications = diagnostics.notifications.len(),
        "Converted"
    );
    Conversion {
        routes,
        diagnostics,
    }
}
