/// Failures detected while defining a binding or inspecting a shape.
///
/// These surface when a binding is default-constructed or built from a
/// builder. Dispatching through a handle never returns them; an unset entry
/// panics instead.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("{contract} for {subject}: no member or explicit binding for `{field}`")]
    Unbound {
        contract: &'static str,
        subject: &'static str,
        field: &'static str,
    },
    #[error(
        "{contract} for {subject}: member `{field}` has shape `{found}`, required `{expected}`"
    )]
    ShapeMismatch {
        contract: &'static str,
        subject: &'static str,
        field: &'static str,
        expected: &'static str,
        found: String,
    },
    #[error("`{shape}` is not a single layer of reference to a sized item")]
    NotSingleReference { shape: String },
}

impl DefinitionError {
    /// The binding field the error refers to, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            DefinitionError::Unbound { field, .. } | DefinitionError::ShapeMismatch { field, .. } => {
                Some(field)
            }
            DefinitionError::NotSingleReference { .. } => None,
        }
    }
}
