use super::{invalid_value, keys, parse_bool, parse_list};
use ingress_converter_core::{CorsPolicy, Diagnostics};
use ingress_converter_k8s_api::SourceRecord;

/// Reads a record's CORS settings. CORS is strictly opt-in: unless
/// `enable-cors` is truthy, no policy is produced. Once enabled, an invalid
/// max-age or credentials value is an error and no policy is produced.
pub fn parse(record: &SourceRecord, diagnostics: &mut Diagnostics) -> Option<CorsPolicy> {
    if record.annotation(keys::ENABLE_CORS).and_then(parse_bool) != Some(true) {
        return None;
    }

    let mut cors = CorsPolicy::default();
    let mut valid = true;

    if let Some(origins) = non_empty_list(record, keys::CORS_ALLOW_ORIGIN) {
        cors.allow_origins = origins;
    }
    if let Some(methods) = non_empty_list(record, keys::CORS_ALLOW_METHODS) {
        cors.allow_methods = methods;
    }
    if let Some(headers) = non_empty_list(record, keys::CORS_ALLOW_HEADERS) {
        cors.allow_headers = headers;
    }
    if let Some(headers) = non_empty_list(record, keys::CORS_EXPOSE_HEADERS) {
        cors.expose_headers = headers;
    }

    if let Some(credentials) = record.annotation(keys::CORS_ALLOW_CREDENTIALS) {
        match parse_bool(credentials) {
            Some(credentials) => cors.allow_credentials = credentials,
            None => {
                diagnostics.error(invalid_value(
                    &record.id,
                    keys::CORS_ALLOW_CREDENTIALS,
                    "expected a boolean",
                ));
                valid = false;
            }
        }
    }

    if let Some(max_age) = record.annotation(keys::CORS_MAX_AGE) {
        match max_age.trim().parse::<u64>() {
            Ok(max_age) => cors.max_age = max_age,
            Err(error) => {
                diagnostics.error(invalid_value(&record.id, keys::CORS_MAX_AGE, error));
                valid = false;
            }
        }
    }

    valid.then_some(cors)
}

fn non_empty_list(record: &SourceRecord, key: &str) -> Option<Vec<String>> {
    let items = parse_list(record.annotation(key)?);
    (!items.is_empty()).then_some(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mk_record;
    use ingress_converter_core::ErrorKind;
    use maplit::btreemap;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::collections::BTreeMap;

    fn parse_annotations(annotations: BTreeMap<&str, &str>) -> (Option<CorsPolicy>, Diagnostics) {
        let record = mk_record("ns", "web", annotations, vec![]);
        let mut diagnostics = Diagnostics::default();
        let cors = parse(&record, &mut diagnostics);
        (cors, diagnostics)
    }

    #[test]
    fn defaults_when_enabled() {
        let (cors, diagnostics) = parse_annotations(btreemap! { keys::ENABLE_CORS => "true" });
        let cors = cors.expect("cors must be enabled");
        assert_eq!(cors.allow_origins, vec!["*".to_string()]);
        assert_eq!(
            cors.allow_methods,
            vec!["GET", "PUT", "POST", "DELETE", "PATCH", "OPTIONS"]
        );
        assert!(cors.allow_credentials);
        assert_eq!(cors.max_age, 1_728_000);
        assert!(cors.expose_headers.is_empty());
        assert!(!diagnostics.has_errors());
    }

    #[test]
    fn disabled_unless_truthy() {
        for value in ["false", "0", "yes", ""] {
            let (cors, _) = parse_annotations(btreemap! {
                keys::ENABLE_CORS => value,
                keys::CORS_ALLOW_ORIGIN => "https://example.com",
            });
            assert_eq!(cors, None, "{value:?}");
        }
        let (cors, _) = parse_annotations(btreemap! {
            keys::CORS_ALLOW_ORIGIN => "https://example.com",
        });
        assert_eq!(cors, None);
    }

    #[test]
    fn overrides_are_trimmed() {
        let (cors, _) = parse_annotations(btreemap! {
            keys::ENABLE_CORS => "true",
            keys::CORS_ALLOW_ORIGIN => " https://a.example.com , https://b.example.com",
            keys::CORS_EXPOSE_HEADERS => "X-Request-Id,  X-Trace ,",
            keys::CORS_ALLOW_CREDENTIALS => "false",
            keys::CORS_MAX_AGE => "600",
        });
        assert_eq!(
            cors,
            Some(CorsPolicy {
                allow_origins: vec![
                    "https://a.example.com".to_string(),
                    "https://b.example.com".to_string()
                ],
                expose_headers: vec!["X-Request-Id".to_string(), "X-Trace".to_string()],
                allow_credentials: false,
                max_age: 600,
                ..CorsPolicy::default()
            })
        );
    }

    #[test]
    fn invalid_max_age_is_an_error() {
        let (cors, diagnostics) = parse_annotations(btreemap! {
            keys::ENABLE_CORS => "true",
            keys::CORS_MAX_AGE => "a day",
        });
        assert_eq!(cors, None);
        let errors = diagnostics
            .errors_of(ErrorKind::InvalidAnnotationValue)
            .collect::<Vec<_>>();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, keys::CORS_MAX_AGE);
    }

    #[rstest]
    #[case::methods(keys::CORS_ALLOW_METHODS, " GET , POST,, ", &["GET", "POST"])]
    #[case::single_method(keys::CORS_ALLOW_METHODS, "OPTIONS", &["OPTIONS"])]
    #[case::headers(keys::CORS_ALLOW_HEADERS, "X-Api-Key,  Content-Type ,", &["X-Api-Key", "Content-Type"])]
    fn list_overrides(#[case] key: &str, #[case] value: &str, #[case] expected: &[&str]) {
        let (cors, diagnostics) = parse_annotations(btreemap! {
            keys::ENABLE_CORS => "true",
            key => value,
        });
        let cors = cors.expect("cors must be enabled");
        let actual = if key == keys::CORS_ALLOW_METHODS {
            cors.allow_methods
        } else {
            cors.allow_headers
        };
        assert_eq!(actual, expected);
        assert!(!diagnostics.has_errors());
    }

    #[rstest]
    #[case::methods(keys::CORS_ALLOW_METHODS)]
    #[case::headers(keys::CORS_ALLOW_HEADERS)]
    fn blank_list_overrides_keep_defaults(#[case] key: &str) {
        let (cors, _) = parse_annotations(btreemap! {
            keys::ENABLE_CORS => "true",
            key => " , ",
        });
        assert_eq!(cors, Some(CorsPolicy::default()));
    }

    #[test]
    fn invalid_credentials_is_an_error() {
        let (cors, diagnostics) = parse_annotations(btreemap! {
            keys::ENABLE_CORS => "true",
            keys::CORS_ALLOW_CREDENTIALS => "maybe",
        });
        assert_eq!(cors, None);
        let errors = diagnostics
            .errors_of(ErrorKind::InvalidAnnotationValue)
            .collect::<Vec<_>>();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, keys::CORS_ALLOW_CREDENTIALS);
        assert_eq!(errors[0].resource.name, "web");
    }
}
