use crate::backup::result_error::{WithDebugObjectAndFnName, WithMsg};
use itertools::Itertools;
use std::fmt::Debug;
use std::path::{PathBuf, StripPrefixError};
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    LiblzmaStream(#[from] liblzma::stream::Error),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    ValidationError(#[from] validator::ValidationErrors),
    #[error(transparent)]
    SerdeYml(#[from] serde_yml::Error),
    #[error(transparent)]
    WalkDir(#[from] walkdir::Error),
    #[error(transparent)]
    Globset(#[from] globset::Error),
    #[error(transparent)]
    StripPrefix(#[from] StripPrefixError),
    #[error(transparent)]
    Email(#[from] lettre::error::Error),
    #[error(transparent)]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("{0}")]
    SmtpSendError(String),
    #[error("Unknown compression method: {0:?}, expected one of gzip, bzip2, xz, zip")]
    UnknownCompressionMethod(String),
    #[error("Invalid remote path {0:?}, expected user@host:/remote/path")]
    InvalidRemoteSpec(String),
    #[error("Source directory {0:?} does not exist")]
    SourceNotFound(PathBuf),
    #[error("Backup file {0:?} is missing or empty")]
    VerificationFailed(PathBuf),
    #[error("Remote host {0} is unreachable")]
    RemoteUnreachable(String),
    #[error("Failed to copy {file:?} to remote {remote}")]
    TransferFailed { file: PathBuf, remote: String },
    #[error("Command {program:?} exited with {status}")]
    CommandFailed { program: String, status: ExitStatus },
    #[error("{}:\n{}", msg, indent::indent_all_with("  ", error.to_string()))]
    WithMsg { msg: String, error: Box<Error> },
    #[error("{:?} {} failed:\n{}", obj_debug, fn_name, indent::indent_all_with("  ", error.to_string()))]
    WithDebugObjAndFnName {
        error: Box<Error>,
        obj_debug: Box<dyn Debug + Send>,
        fn_name: String,
    },
    #[error("{}", itertools::join(.0, "\n\n"))]
    LotsOfError(Vec<Error>),
}

impl<S: Into<String>, O: Debug + Send + 'static> WithDebugObjectAndFnName<S, O> for Error {
    fn with_debug_object_and_fn_name(self, obj: O, fn_name: S) -> Self {
        Error::WithDebugObjAndFnName {
            error: Box::new(self),
            obj_debug: Box::new(obj),
            fn_name: fn_name.into(),
        }
    }
}

impl<S: Into<String>> WithMsg<S> for Error {
    fn with_msg(self, msg: S) -> Self {
        Self::WithMsg {
            msg: msg.into(),
            error: Box::new(self),
        }
    }
}

impl From<Vec<Error>> for Error {
    fn from(errors: Vec<Error>) -> Self {
        Self::LotsOfError(errors.into_iter().flat_map(Error::into_iter).collect_vec())
    }
}

impl Error {
    pub fn smtp_send_error<S: Into<String>>(msg: S) -> Self {
        Self::SmtpSendError(msg.into())
    }

    pub fn command_failed<S: Into<String>>(program: S, status: ExitStatus) -> Self {
        Self::CommandFailed {
            program: program.into(),
            status,
        }
    }

    pub fn into_iter(self) -> Box<dyn Iterator<Item = Error>> {
        match self {
            Error::LotsOfError(v) => Box::new(v.into_iter().flat_map(Error::into_iter)),
            e => Box::new(std::iter::once(e)),
        }
    }

    pub fn chain(self, other: Error) -> Error {
        Error::LotsOfError(self.into_iter().chain(other.into_iter()).collect_vec())
    }

    /// Innermost error once the context wrappers are peeled off.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::WithMsg { error, .. } => error.root_cause(),
            Error::WithDebugObjAndFnName { error, .. } => error.root_cause(),
            e => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = Error::from(io_error);

        match error {
            Error::Io(_) => (),
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_error_with_msg() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = Error::from(io_error).with_msg("Custom message");

        match error {
            Error::WithMsg { msg, .. } => assert_eq!(msg, "Custom message"),
            _ => panic!("Expected WithMsg error"),
        }
    }

    #[test]
    fn test_error_with_debug_display() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = Error::from(io_error).with_debug_object_and_fn_name(42, "test_function");
        let error_str = error.to_string();

        assert!(error_str.contains("42 test_function failed"));
        assert!(error_str.contains("  file not found"));
    }

    #[test]
    fn test_error_from_vec_flattens() {
        let nested = Error::from(vec![
            Error::RemoteUnreachable("a@host".into()),
            Error::RemoteUnreachable("b@host".into()),
        ]);
        let combined = Error::from(vec![nested, Error::UnknownCompressionMethod("lz4".into())]);

        match combined {
            Error::LotsOfError(errors) => assert_eq!(errors.len(), 3),
            _ => panic!("Expected LotsOfError"),
        }
    }

    #[test]
    fn test_error_chain() {
        let error1 = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "error1"));
        let error2 = Error::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "error2"));

        let chained = error1.chain(error2);
        assert_eq!(chained.to_string(), "error1\n\nerror2");
    }

    #[test]
    fn test_root_cause_skips_context() {
        let error = Error::UnknownCompressionMethod("lz4".into())
            .with_msg("outer")
            .with_debug_object_and_fn_name("obj", "dispatch");

        assert!(matches!(
            error.root_cause(),
            Error::UnknownCompressionMethod(m) if m == "lz4"
        ));
    }

    #[test]
    fn test_unknown_method_display() {
        let error = Error::UnknownCompressionMethod("lz4".into());
        assert_eq!(
            error.to_string(),
            "Unknown compression method: \"lz4\", expected one of gzip, bzip2, xz, zip"
        );
    }
}
