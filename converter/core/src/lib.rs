#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod diagnostics;
pub mod policy;
pub mod routes;

pub use self::{
    diagnostics::{ConversionError, Diagnostics, ErrorKind, Notification, NotificationLevel},
    policy::{AccessLogPolicy, CorsPolicy, Policy, RateLimitPolicy, RateUnit, RuleBackendIndex},
    routes::{
        BackendRef, Filter, HeaderMatch, HttpRouteMatch, PathMatch, PathMatchKey, PathModifier,
        RequestRedirectFilter, ResourceRef, RouteContext, RouteKey, RouteRule, RouteTable,
        SourcedBackend, Value,
    },
};
