//! Reads `Ingress` resources out of YAML manifests.

use crate::Ingress;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to parse YAML document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("document {index} has no kind")]
    MissingKind { index: usize },
}

/// Decodes every `Ingress` in a (possibly multi-document) manifest, flattening
/// `List` and `IngressList` documents. Other kinds are skipped.
pub fn ingresses_from_yaml(manifest: &str) -> Result<Vec<Ingress>, ManifestError> {
    let mut ingresses = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_str(manifest).enumerate() {
        let value = serde_yaml::Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        collect(index, value, &mut ingresses)?;
    }
    Ok(ingresses)
}

fn collect(
    index: usize,
    value: serde_yaml::Value,
    ingresses: &mut Vec<Ingress>,
) -> Result<(), ManifestError> {
    let kind = value
        .get("kind")
        .and_then(|k| k.as_str())
        .ok_or(ManifestError::MissingKind { index })?;

    match kind {
        "Ingress" => ingresses.push(serde_yaml::from_value(value)?),
        "List" | "IngressList" => {
            let items = value
                .get("items")
                .and_then(|items| items.as_sequence())
                .cloned()
                .unwrap_or_default();
            for item in items {
                collect(index, item, ingresses)?;
            }
        }
        kind => debug!(index, %kind, "Skipping unsupported resource"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResourceExt;

    #[test]
    fn reads_documents_and_lists() {
        let manifest = r#"
apiVersion: networking.k8s.io/v1
kind: Ingress
metadata:
  name: web
  namespace: ns
spec:
  rules:
  - host: example.com
    http:
      paths:
      - path: /
        pathType: Prefix
        backend:
          service:
            name: web
            port:
              number: 80
---
apiVersion: v1
kind: Service
metadata:
  name: web
---
apiVersion: v1
kind: List
items:
- apiVersion: networking.k8s.io/v1
  kind: Ingress
  metadata:
    name: api
    namespace: ns
"#;
        let ingresses = ingresses_from_yaml(manifest).expect("manifest must parse");
        let names = ingresses.iter().map(|i| i.name_any()).collect::<Vec<_>>();
        assert_eq!(names, vec!["web".to_string(), "api".to_string()]);
    }

    #[test]
    fn rejects_documents_without_kind() {
        let err = ingresses_from_yaml("metadata:\n  name: web\n").unwrap_err();
        assert!(matches!(err, ManifestError::MissingKind { index: 0 }));
    }
}
