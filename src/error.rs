use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

use crate::domain::ObjectKind;

#[derive(Debug, Error, Diagnostic)]
pub enum BrowseError {
    #[error("access to {context} denied: {message}")]
    RemoteAccess { context: String, message: String },

    #[error("remote service failed while loading {context}: {message}")]
    RemoteService { context: String, message: String },

    #[error("remote call for {context} failed: {message}")]
    Execution { context: String, message: String },

    #[error("{child} {id} cannot be a child of {parent}")]
    MalformedHierarchy {
        parent: ObjectKind,
        child: ObjectKind,
        id: i64,
    },

    #[error("worker pool {0} is shut down")]
    WorkerShutdown(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config value: {0}")]
    #[diagnostic(help("thumbnail_workers and orphaned_progress_batch must be at least 1"))]
    InvalidConfig(String),
}

impl BrowseError {
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            BrowseError::RemoteAccess { .. }
                | BrowseError::RemoteService { .. }
                | BrowseError::Execution { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_remote_failures_count_as_remote() {
        let denied = BrowseError::RemoteAccess {
            context: "projects".to_string(),
            message: "permission denied".to_string(),
        };
        assert!(denied.is_remote());
        assert!(!BrowseError::WorkerShutdown("hierarchy".to_string()).is_remote());
        assert!(
            !BrowseError::MalformedHierarchy {
                parent: ObjectKind::Server,
                child: ObjectKind::Image,
                id: 3,
            }
            .is_remote()
        );
    }
}
