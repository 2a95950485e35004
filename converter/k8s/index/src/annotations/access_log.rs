use super::{keys, parse_bool};
use ingress_converter_core::AccessLogPolicy;
use ingress_converter_k8s_api::SourceRecord;

/// Reads a record's access-log flag. An unparseable value is treated as
/// absent.
pub fn parse(record: &SourceRecord) -> Option<AccessLogPolicy> {
    record
        .annotation(keys::ENABLE_ACCESS_LOG)
        .and_then(parse_bool)
        .map(|enabled| AccessLogPolicy { enabled })
}
