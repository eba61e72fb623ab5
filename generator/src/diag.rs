// diag.rs — Generation error model
//
// Generation is all-or-nothing per invocation: the first unsupported
// construct or selection failure aborts with a `GenError` naming the
// offending record. There are no warnings and no partial output.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

/// A fatal generation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenError {
    /// The definition body uses a construct outside the supported subset.
    Unsupported { kernel: String, construct: String },
    /// The definition body did not parse.
    Parse { kernel: String, message: String },
    /// The launch bound could not be determined uniquely.
    AmbiguousBound { kernel: String, bounds: Vec<String> },
    /// The requested kernel name is not in the registry.
    NotFound { name: String },
    /// The requested kernel exists but is not classified as eligible.
    NotEligible {
        name: String,
        classification: &'static str,
    },
}

impl GenError {
    /// Convenience constructor for the common rejection path.
    pub fn unsupported(kernel: &str, construct: impl Into<String>) -> Self {
        GenError::Unsupported {
            kernel: kernel.to_string(),
            construct: construct.into(),
        }
    }
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenError::Unsupported { kernel, construct } => {
                write!(f, "kernel `{kernel}`: unsupported construct: {construct}")
            }
            GenError::Parse { kernel, message } => {
                write!(f, "kernel `{kernel}`: definition does not parse: {message}")
            }
            GenError::AmbiguousBound { kernel, bounds } => {
                write!(
                    f,
                    "kernel `{kernel}`: ambiguous launch bound (candidates: {})",
                    bounds.join(", ")
                )
            }
            GenError::NotFound { name } => {
                write!(f, "kernel `{name}` not found in registry")
            }
            GenError::NotEligible {
                name,
                classification,
            } => {
                write!(
                    f,
                    "kernel `{name}` is not eligible for generation (classified {classification})"
                )
            }
        }
    }
}

impl std::error::Error for GenError {}
