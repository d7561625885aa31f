//! Natural matching of contract requirements against subject members, and
//! the per-field record it leaves behind.

use std::any::type_name;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config;
use crate::error::DefinitionError;
use crate::subject::{Lookup, MemberSlot, Subject};

/// How a binding field got (or did not get) its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Taken from the subject member of the same name and shape.
    Inferred,
    /// Supplied through a builder setter.
    Explicit,
    /// Builder started empty and nothing was supplied.
    Unset,
    /// The subject has no member of that name.
    Absent,
    /// The subject has a member of that name with another shape.
    Mismatch { found: String },
}

impl Outcome {
    pub fn is_bound(&self) -> bool {
        matches!(self, Outcome::Inferred | Outcome::Explicit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldResolution {
    pub field: &'static str,
    /// Required function-pointer shape.
    pub required: &'static str,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Field-by-field account of how a binding was assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    contract: &'static str,
    subject: &'static str,
    fields: Vec<FieldResolution>,
}

impl ResolutionReport {
    pub fn new(contract: &'static str, subject: &'static str) -> Self {
        Self {
            contract,
            subject,
            fields: Vec::new(),
        }
    }

    pub fn contract(&self) -> &'static str {
        self.contract
    }

    pub fn subject(&self) -> &'static str {
        self.subject
    }

    pub fn fields(&self) -> &[FieldResolution] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldResolution> {
        self.fields.iter().find(|entry| entry.field == name)
    }

    /// Record the outcome for `field`, replacing any earlier one.
    pub fn record<F: ?Sized>(&mut self, field: &'static str, outcome: Outcome) {
        match self.fields.iter_mut().find(|entry| entry.field == field) {
            Some(entry) => entry.outcome = outcome,
            None => self.fields.push(FieldResolution {
                field,
                required: type_name::<F>(),
                outcome,
            }),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.fields.iter().all(|entry| entry.outcome.is_bound())
    }

    /// Fields without a value, in declaration order.
    pub fn missing(&self) -> impl Iterator<Item = &FieldResolution> {
        self.fields.iter().filter(|entry| !entry.outcome.is_bound())
    }

    /// The error for building with `field` still unset.
    pub fn unbound(&self, field: &'static str) -> DefinitionError {
        match self.field(field) {
            Some(FieldResolution {
                required,
                outcome: Outcome::Mismatch { found },
                ..
            }) => DefinitionError::ShapeMismatch {
                contract: self.contract,
                subject: self.subject,
                field,
                expected: *required,
                found: found.clone(),
            },
            _ => DefinitionError::Unbound {
                contract: self.contract,
                subject: self.subject,
                field,
            },
        }
    }
}

/// Look up the member of `S` named `field` and keep it only if its shape is
/// exactly `F`.
pub fn natural<S: Subject, F: Copy + 'static>(
    report: &mut ResolutionReport,
    field: &'static str,
) -> Option<F> {
    let mut value: Option<F> = None;
    let lookup = S::bind_member(field, &mut MemberSlot::new(&mut value));
    let outcome = match lookup {
        Lookup::Bound if value.is_some() => Outcome::Inferred,
        Lookup::Bound | Lookup::Absent => Outcome::Absent,
        Lookup::Mismatch { found } => Outcome::Mismatch {
            found: found.to_string(),
        },
    };

    let diagnostics = &config::current().diagnostics;
    if let Outcome::Mismatch { found } = &outcome {
        if diagnostics.warn_on_mismatch.unwrap_or(true) {
            warn!(
                target: "conform::resolve",
                contract = report.contract(),
                subject = report.subject(),
                field,
                required = type_name::<F>(),
                %found,
                "member shape differs from requirement; no default"
            );
        }
    }
    if diagnostics.trace_fields.unwrap_or(false) {
        debug!(
            target: "conform::resolve",
            contract = report.contract(),
            subject = report.subject(),
            field,
            outcome = ?outcome,
            "resolved binding field"
        );
    }

    report.record::<F>(field, outcome);
    value
}
