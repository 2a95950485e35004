use super::{invalid_value, keys, parse_bool};
use ingress_converter_core::{ConversionError, Diagnostics, ErrorKind, Value};
use ingress_converter_k8s_api::SourceRecord;

/// The header value that always selects the canary when no explicit value is
/// configured.
pub const DEFAULT_HEADER_VALUE: &str = "always";

pub const DEFAULT_WEIGHT_TOTAL: u32 = 100;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanaryConfig {
    pub header: Option<CanaryHeader>,

    /// Weight problems are only reported once the canary is actually
    /// resolved against a rule.
    pub weight: Result<CanaryWeight, ConversionError>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanaryHeader {
    pub name: String,
    pub value: Value,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CanaryWeight {
    pub weight: u32,
    pub total: u32,

    /// Whether `canary-weight` was set on the record.
    pub explicit: bool,
}

/// Returns the record's canary configuration if the record is an enabled
/// canary.
pub fn parse(record: &SourceRecord, diagnostics: &mut Diagnostics) -> Option<CanaryConfig> {
    let enabled = record.annotation(keys::CANARY)?;
    match parse_bool(enabled) {
        Some(true) => {}
        Some(false) => return None,
        None => {
            diagnostics.error(invalid_value(&record.id, keys::CANARY, "expected a boolean"));
            return None;
        }
    }

    let header = match parse_header(record) {
        Ok(header) => header,
        Err(error) => {
            diagnostics.error(error);
            None
        }
    };

    Some(CanaryConfig {
        header,
        weight: parse_weight(record),
    })
}

fn parse_header(record: &SourceRecord) -> Result<Option<CanaryHeader>, ConversionError> {
    let name = match record
        .annotation(keys::CANARY_BY_HEADER)
        .map(str::trim)
        .filter(|n| !n.is_empty())
    {
        Some(name) => name,
        None => return Ok(None),
    };
    http::HeaderName::from_bytes(name.as_bytes())
        .map_err(|error| invalid_value(&record.id, keys::CANARY_BY_HEADER, error))?;

    let value = record
        .annotation(keys::CANARY_BY_HEADER_VALUE)
        .filter(|v| !v.is_empty());
    let pattern = record
        .annotation(keys::CANARY_BY_HEADER_PATTERN)
        .filter(|p| !p.is_empty());

    let value = match (value, pattern) {
        (Some(value), _) => Value::Exact(value.to_string()),
        (None, Some(pattern)) => {
            regex::Regex::new(pattern).map_err(|error| {
                invalid_value(&record.id, keys::CANARY_BY_HEADER_PATTERN, error)
            })?;
            Value::Regex(pattern.to_string())
        }
        (None, None) => Value::Exact(DEFAULT_HEADER_VALUE.to_string()),
    };

    Ok(Some(CanaryHeader {
        name: name.to_string(),
        value,
    }))
}

fn parse_weight(record: &SourceRecord) -> Result<CanaryWeight, ConversionError> {
    let parse = |key: &str| {
        record
            .annotation(key)
            .map(|v| v.trim().parse::<i64>())
            .transpose()
            .map_err(|error| invalid_value(&record.id, key, error))
    };

    let weight = parse(keys::CANARY_WEIGHT)?;
    let total = parse(keys::CANARY_WEIGHT_TOTAL)?.unwrap_or(DEFAULT_WEIGHT_TOTAL.into());
    let explicit = weight.is_some();
    let weight = weight.unwrap_or(0);

    if total <= 0 || total > u32::MAX.into() {
        return Err(ConversionError::new(
            ErrorKind::InvalidWeight,
            record.id.clone(),
            keys::CANARY_WEIGHT_TOTAL,
            format!("canary weight total must be positive, got {total}"),
        ));
    }
    if weight < 0 {
        return Err(ConversionError::new(
            ErrorKind::InvalidWeight,
            record.id.clone(),
            keys::CANARY_WEIGHT,
            format!("canary weight must not be negative, got {weight}"),
        ));
    }
    if weight > total {
        return Err(ConversionError::new(
            ErrorKind::WeightExceedsTotal,
            record.id.clone(),
            keys::CANARY_WEIGHT,
            format!("canary weight {weight} exceeds total {total}"),
        ));
    }

    Ok(CanaryWeight {
        weight: weight as u32,
        total: total as u32,
        explicit,
    })
}
