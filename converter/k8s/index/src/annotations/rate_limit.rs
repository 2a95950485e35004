use super::keys;
use ingress_converter_core::{RateLimitPolicy, RateUnit};
use ingress_converter_k8s_api::SourceRecord;

/// Reads a record's rate limit. Requests-per-second is preferred over
/// requests-per-minute; unparseable or non-positive values are treated as
/// absent.
pub fn parse(record: &SourceRecord) -> Option<RateLimitPolicy> {
    let (limit, unit) = [
        (keys::LIMIT_RPS, RateUnit::Second),
        (keys::LIMIT_RPM, RateUnit::Minute),
    ]
    .into_iter()
    .find_map(|(key, unit)| Some((positive(record.annotation(key)?)?, unit)))?;

    let burst_multiplier = record
        .annotation(keys::LIMIT_BURST_MULTIPLIER)
        .and_then(positive)
        .unwrap_or(RateLimitPolicy::DEFAULT_BURST_MULTIPLIER);

    Some(RateLimitPolicy {
        limit,
        unit,
        burst_multiplier,
    })
}

fn positive(s: &str) -> Option<u32> {
    s.trim().parse::<u32>().ok().filter(|v| *v > 0)
}
