use crate::routes::ResourceRef;
use serde::Serialize;
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    InvalidAnnotationValue,
    InvalidWeight,
    WeightExceedsTotal,
    MultipleCanaryBackends,
    MultipleNonCanaryBackends,
    CanaryWithoutStable,
    RuleIndexOutOfRange,
}

/// A problem found while converting a resource. Carries enough context for a
/// user to locate the offending record and field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{kind} in {resource} ({field}): {message}")]
pub struct ConversionError {
    pub kind: ErrorKind,
    pub resource: ResourceRef,
    pub field: String,
    pub message: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum NotificationLevel {
    Info,
    Warning,
}

/// A non-fatal advisory about the conversion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub resource: Option<ResourceRef>,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub errors: Vec<ConversionError>,
    pub notifications: Vec<Notification>,
}

// === impl ErrorKind ===

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidAnnotationValue => "invalid annotation value",
            Self::InvalidWeight => "invalid canary weight",
            Self::WeightExceedsTotal => "canary weight exceeds total",
            Self::MultipleCanaryBackends => "multiple canary backends",
            Self::MultipleNonCanaryBackends => "multiple non-canary backends",
            Self::CanaryWithoutStable => "canary backend without a stable backend",
            Self::RuleIndexOutOfRange => "rule index out of range",
        };
        f.write_str(s)
    }
}

// === impl ConversionError ===

impl ConversionError {
    pub fn new(
        kind: ErrorKind,
        resource: ResourceRef,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            resource,
            field: field.into(),
            message: message.into(),
        }
    }
}

// === impl Diagnostics ===

impl Diagnostics {
    pub fn error(&mut self, error: ConversionError) {
        self.errors.push(error);
    }

    pub fn info(&mut self, resource: Option<&ResourceRef>, message: impl Into<String>) {
        self.notify(NotificationLevel::Info, resource, message)
    }

    pub fn warn(&mut self, resource: Option<&ResourceRef>, message: impl Into<String>) {
        self.notify(NotificationLevel::Warning, resource, message)
    }

    fn notify(
        &mut self,
        level: NotificationLevel,
        resource: Option<&ResourceRef>,
        message: impl Into<String>,
    ) {
        self.notifications.push(Notification {
            level,
            resource: resource.cloned(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors_of(&self, kind: ErrorKind) -> impl Iterator<Item = &ConversionError> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }
}
