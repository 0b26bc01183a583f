#[cfg(test)]
mod tests {
    use crate::{DaemonError, Result};
    use canary_core::CoreError;
    use std::error::Error;
    use std::io;

    #[test]
    fn test_daemon_error_display() {
        let err = DaemonError::ServerError("Failed to bind to 0.0.0.0:80".to_string());
        assert_eq!(err.to_string(), "Server error: Failed to bind to 0.0.0.0:80");

        let err = DaemonError::Core(CoreError::StoragePathUnset);
        assert_eq!(
            err.to_string(),
            "no storage path set via STORAGE_PATH env variable [CORE002]"
        );

        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = DaemonError::IoError(io_err);
        assert!(err.to_string().contains("access denied"));
    }

    #[test]
    fn test_daemon_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::AddrInUse, "in use");
        let daemon_err: DaemonError = io_err.into();

        if let DaemonError::IoError(_) = daemon_err {
            // Expected variant
        } else {
            panic!("Expected DaemonError::IoError variant");
        }
    }

    #[test]
    fn test_daemon_error_from_core() {
        let core_err = CoreError::ConfigurationError("Must set NFS_SERVER".to_string());
        let daemon_err: DaemonError = core_err.into();

        match &daemon_err {
            DaemonError::Core(inner) => assert!(inner.is_configuration()),
            other => panic!("Expected DaemonError::Core variant, got {other:?}"),
        }
        assert!(daemon_err.source().is_some());
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<u32> {
            Ok(42)
        }

        fn returns_err() -> Result<u32> {
            Err(DaemonError::ServerError("test failure".to_string()))
        }

        assert_eq!(returns_ok().unwrap(), 42);
        assert!(returns_err().is_err());
        assert!(returns_err().unwrap_err().source().is_none());
    }
}
