use std::any::Any;

use thiserror::Error;

pub type Result<T, E = SortError> = std::result::Result<T, E>;

/// Everything that can go wrong while configuring an engine or running a sort.
///
/// Parallel engines do not roll back work that already completed when a later task fails, so a
/// failed sort leaves the sequence as a permutation of its input in an unspecified order.
#[derive(Debug, Error)]
pub enum SortError {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid configuration {name}: {message}")]
    InvalidConfiguration { name: String, message: String },

    #[error("error while executing {task}")]
    TaskExecution {
        task: String,
        #[source]
        source: Box<SortError>,
    },

    #[error("comparison panicked: {message}")]
    Panicked { message: String },

    #[error("a dependency of {task} did not complete")]
    DependencyFailed { task: String },
}

impl SortError {
    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> SortError {
        SortError::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn invalid_config(name: impl Into<String>, message: impl Into<String>) -> SortError {
        SortError::InvalidConfiguration {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn task(task: impl Into<String>, source: SortError) -> SortError {
        SortError::TaskExecution {
            task: task.into(),
            source: Box::new(source),
        }
    }

    /// Turns a caught unwind payload into an error.
    pub fn panicked(payload: Box<dyn Any + Send>) -> SortError {
        let message = if let Some(msg) = payload.downcast_ref::<&str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "non-string panic payload".to_string()
        };

        SortError::Panicked { message }
    }

    /// Innermost error below any number of `TaskExecution` wrappers.
    pub fn root_cause(&self) -> &SortError {
        let mut err = self;
        while let SortError::TaskExecution { source, .. } = err {
            err = source.as_ref();
        }
        err
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self.root_cause(), SortError::InvalidArgument { .. })
    }

    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self, SortError::InvalidConfiguration { .. })
    }
}
