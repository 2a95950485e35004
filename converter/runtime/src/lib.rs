#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use ingress_converter_core as core;
pub use ingress_converter_k8s_api as k8s;
pub use ingress_converter_k8s_index as index;

mod args;
mod log;

pub use self::{
    args::Args,
    log::{LogFilter, LogFormat},
};

use crate::{
    core::{ConversionError, Diagnostics, Notification, NotificationLevel, RouteTable},
    index::Conversion,
    k8s::SourceRecord,
};
use anyhow::{Context, Result};
use serde::Serialize;
use std::{io::Write, path::PathBuf};
use tracing::{debug, error, info, warn};

/// The serialized form of a conversion.
#[derive(Debug, Serialize)]
pub struct Report<'c> {
    pub routes: &'c RouteTable,
    pub errors: &'c [ConversionError],
    pub notifications: &'c [Notification],
}

impl<'c> From<&'c Conversion> for Report<'c> {
    fn from(conversion: &'c Conversion) -> Self {
        Self {
            routes: &conversion.routes,
            errors: &conversion.diagnostics.errors,
            notifications: &conversion.diagnostics.notifications,
        }
    }
}

/// Reads every Ingress from the given manifests, in order. A path of `-`
/// reads from stdin.
pub fn read_records(paths: &[PathBuf]) -> Result<Vec<SourceRecord>> {
    let mut records = Vec::new();
    for path in paths {
        let manifest = if path.as_os_str() == "-" {
            std::io::read_to_string(std::io::stdin().lock()).context("failed to read stdin")?
        } else {
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?
        };
        let ingresses = k8s::manifest::ingresses_from_yaml(&manifest)
            .with_context(|| format!("failed to decode {}", path.display()))?;
        debug!(path = %path.display(), ingresses = ingresses.len(), "Decoded manifest");
        records.extend(ingresses.into_iter().map(SourceRecord::from));
    }
    Ok(records)
}

pub fn write_report(conversion: &Conversion, mut out: impl Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, &Report::from(conversion))?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

fn log_diagnostics(diagnostics: &Diagnostics) {
    for Notification {
        level,
        resource,
        message,
    } in &diagnostics.notifications
    {
        let resource = resource.as_ref().map(ToString::to_string).unwrap_or_default();
        match level {
            NotificationLevel::Info => info!(%resource, "{message}"),
            NotificationLevel::Warning => warn!(%resource, "{message}"),
        }
    }
    for e in &diagnostics.errors {
        error!(kind = ?e.kind, resource = %e.resource, field = %e.field, "{}", e.message);
    }
}
