use crate::descriptor::ChartFamily;
use thiserror::Error;

/// Signals the compiler hands back instead of a plan.
/// Unsupported families are not errors; they compile to a fallback plan.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("{family} chart needs at least {required} variable(s), got {provided}")]
    InsufficientVariables {
        family: ChartFamily,
        required: usize,
        provided: usize,
    },
}

impl CompileError {
    pub fn is_insufficient_variables(&self) -> bool {
        matches!(self, CompileError::InsufficientVariables { .. })
    }
}
