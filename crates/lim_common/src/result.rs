//! Linker bug reports.

/// Result of an operation whose only failure mode is a linker bug.
///
/// Problems with the input (unmatched connections, bad constraints) go
/// through their own error enums or a diagnostic sink instead.
pub type LimResult<T> = Result<T, InternalError>;

/// A broken structural invariant, such as a merge-tree node whose parent
/// does not list it as a child.
#[derive(Debug, thiserror::Error)]
#[error("internal invariant violation: {message}")]
pub struct InternalError {
    /// What went wrong.
    pub message: String,
}

impl InternalError {
    /// Wraps `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_root(has_parent: bool) -> LimResult<()> {
        if has_parent {
            return Err(InternalError::new("root has a parent"));
        }
        Ok(())
    }

    #[test]
    fn message_is_prefixed() {
        let err = check_root(true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "internal invariant violation: root has a parent"
        );
    }

    #[test]
    fn ok_passes_through() {
        assert!(check_root(false).is_ok());
    }
}
