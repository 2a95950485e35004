#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod manifest;
pub mod source;

pub use self::source::{IngressPath, PathType, ServiceBackend, SourceRecord, SourceRule};
pub use ingress_converter_core::ResourceRef;
pub use k8s_openapi::{
    api::networking::v1::{
        HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
        IngressServiceBackend, IngressSpec, ServiceBackendPort,
    },
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
};
pub use kube::{Resource, ResourceExt};

/// The legacy annotation naming an Ingress's class.
pub const INGRESS_CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";
