//! Where an instance's session credential comes from

use crate::{ConfigError, ConfigResult};
use rejoin_util::{InstanceId, SessionHandle};
use std::path::PathBuf;

/// Configured source of a session credential.
///
/// File and environment sources are read when [`SessionSource::load`] is
/// called, so a changed credential can be picked up without a restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSource {
    Inline(SessionHandle),
    File(PathBuf),
    Env(String),
}

impl SessionSource {
    pub fn load(&self, instance: &InstanceId) -> ConfigResult<SessionHandle> {
        let session_err = |message: String| ConfigError::Session {
            instance: instance.to_string(),
            message,
        };

        let handle = match self {
            SessionSource::Inline(handle) => handle.clone(),
            SessionSource::File(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    session_err(format!("cannot read {}: {}", path.display(), e))
                })?;
                SessionHandle::new(content.trim())
            }
            SessionSource::Env(var) => {
                let value = std::env::var(var)
                    .map_err(|e| session_err(format!("${}: {}", var, e)))?;
                SessionHandle::new(value.trim())
            }
        };

        if handle.is_empty() {
            return Err(session_err(format!("{} is empty", self.describe())));
        }
        Ok(handle)
    }

    /// Human-readable description that never includes the credential
    pub fn describe(&self) -> String {
        match self {
            SessionSource::Inline(_) => "inline session".into(),
            SessionSource::File(path) => format!("session file {}", path.display()),
            SessionSource::Env(var) => format!("session env ${}", var),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn load_inline() {
        let source = SessionSource::Inline(SessionHandle::new("abc"));
        let handle = source.load(&InstanceId::new("com.roblox.client")).unwrap();
        assert_eq!(handle.expose(), "abc");
    }

    #[test]
    fn load_file_trims_whitespace() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  _|WARNING:-DO-NOT-SHARE-THIS.|_token  ").unwrap();

        let source = SessionSource::File(file.path().to_path_buf());
        let handle = source.load(&InstanceId::new("com.roblox.client")).unwrap();
        assert_eq!(handle.expose(), "_|WARNING:-DO-NOT-SHARE-THIS.|_token");
    }

    #[test]
    fn empty_file_is_an_error() {
        let file = NamedTempFile::new().unwrap();
        let source = SessionSource::File(file.path().to_path_buf());
        let result = source.load(&InstanceId::new("com.roblox.client"));
        assert!(matches!(result, Err(ConfigError::Session { .. })));
    }

    #[test]
    fn missing_file_is_an_error() {
        let source = SessionSource::File(PathBuf::from("/nonexistent/rejoind/session"));
        assert!(source.load(&InstanceId::new("com.roblox.client")).is_err());
    }

    #[test]
    fn missing_env_is_an_error() {
        let source = SessionSource::Env("REJOIND_TEST_SESSION_THAT_IS_NEVER_SET".into());
        assert!(source.load(&InstanceId::new("com.roblox.client")).is_err());
    }

    #[test]
    fn describe_does_not_leak() {
        let source = SessionSource::Inline(SessionHandle::new("secret"));
        assert!(!source.describe().contains("secret"));
        assert!(!format!("{:?}", source).contains("secret"));
    }
}
