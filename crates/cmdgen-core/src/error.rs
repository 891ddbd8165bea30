use crate::model::WorkloadKind;
use thiserror::Error;

/// Errors raised while synthesizing a command or writing a batch script.
#[derive(Debug, Error)]
pub enum GenError {
    /// A strategy was handed a test definition of another workload kind.
    #[error("configuration mismatch: strategy expects `{expected}` but test definition is `{actual}`")]
    ConfigurationMismatch {
        expected: WorkloadKind,
        actual: WorkloadKind,
    },

    /// A parameter field has no value to put after its flag.
    #[error("unformattable value for `{field}` in `{kind}` arguments: field is unset or renders empty")]
    UnformattableValue {
        kind: WorkloadKind,
        field: &'static str,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GenError>;
