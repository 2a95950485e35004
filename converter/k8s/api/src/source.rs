use crate::{Ingress, IngressBackend, ResourceExt, INGRESS_CLASS_ANNOTATION};
use ingress_converter_core::{routes::BackendPort, ResourceRef};
use std::collections::BTreeMap;

/// A legacy routing resource as consumed by the converter. Records are never
/// modified once read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceRecord {
    pub id: ResourceRef,
    pub ingress_class: Option<String>,
    pub annotations: BTreeMap<String, String>,
    pub rules: Vec<SourceRule>,
}

/// A single (host, path, backend) triple of a record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceRule {
    /// Empty when the rule applies to all hosts.
    pub host: String,
    pub path: IngressPath,
    /// `None` when the path refers to something other than a Service.
    pub backend: Option<ServiceBackend>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngressPath {
    pub path_type: PathType,
    pub value: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathType {
    Exact,
    Prefix,
    ImplementationSpecific,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceBackend {
    pub name: String,
    pub port: Option<BackendPort>,
}

// === impl SourceRecord ===

impl SourceRecord {
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    /// The class this record belongs to, if any is configured.
    pub fn class(&self) -> Option<&str> {
        self.ingress_class
            .as_deref()
            .or_else(|| self.annotation(INGRESS_CLASS_ANNOTATION))
            .filter(|c| !c.is_empty())
    }
}

impl From<Ingress> for SourceRecord {
    fn from(ingress: Ingress) -> Self {
        let id = ResourceRef::new(
            ingress.namespace().unwrap_or_else(|| "default".to_string()),
            ingress.name_any(),
        );
        let annotations = ingress.metadata.annotations.unwrap_or_default();
        let spec = ingress.spec.unwrap_or_default();

        let rules = spec
            .rules
            .into_iter()
            .flatten()
            .flat_map(|rule| {
                let host = rule.host.unwrap_or_default();
                rule.http
                    .map(|http| http.paths)
                    .unwrap_or_default()
                    .into_iter()
                    .map(move |path| SourceRule {
                        host: host.clone(),
                        path: IngressPath {
                            path_type: path.path_type.parse().unwrap_or(PathType::Prefix),
                            value: path.path,
                        },
                        backend: service_backend(path.backend),
                    })
            })
            .collect();

        Self {
            id,
            ingress_class: spec.ingress_class_name,
            annotations,
            rules,
        }
    }
}

fn service_backend(backend: IngressBackend) -> Option<ServiceBackend> {
    let service = backend.service?;
    let port = service.port.and_then(|port| {
        if let Some(number) = port.number.and_then(|n| u16::try_from(n).ok()) {
            return Some(BackendPort::Number(number));
        }
        port.name.map(BackendPort::Name)
    });
    Some(ServiceBackend {
        name: service.name,
        port,
    })
}

// === impl PathType ===

impl std::str::FromStr for PathType {
    type Err = UnknownPathType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Exact" => Ok(Self::Exact),
            "Prefix" => Ok(Self::Prefix),
            "ImplementationSpecific" => Ok(Self::ImplementationSpecific),
            _ => Err(UnknownPathType(s.to_string())),
        }
    }
}

#[derive(Clone, Debug, thiserror::Error)]
#[error("unknown path type: {0}")]
pub struct UnknownPathType(String);
