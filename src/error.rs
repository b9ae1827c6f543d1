use std::io;

/// Errors produced while reading, writing or interpreting swath records.
///
/// `Comment` and `Other` are not failures of the stream. They tell the caller that an
/// accessor does not apply to the kind of record currently held.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// End of stream reached, including a short read in the middle of a record.
    #[error("end of file")]
    Eof,

    /// Short or failed write.
    #[error("write failed: {0}")]
    WriteFail(#[source] io::Error),

    /// Bad magic, record id, channel count or version combination.
    #[error("unintelligible record: {0}")]
    Unintelligible(String),

    /// A buffer sized from the stream could not be allocated.
    #[error("unable to allocate {requested} bytes")]
    MemoryFail { requested: usize },

    /// The current record is a comment.
    #[error("record is a comment")]
    Comment,

    /// The current record is neither survey data nor a comment.
    #[error("operation does not apply to this record kind")]
    Other,

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(io::Error),
}

impl Error {
    /// True when the stream cannot produce further records.
    ///
    /// An unintelligible record only spoils itself; the next read resyncs.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Eof | Error::WriteFail(_) | Error::Io(_) | Error::MemoryFail { .. }
        )
    }

    pub(crate) fn unintelligible<S: Into<String>>(msg: S) -> Self {
        Error::Unintelligible(msg.into())
    }

    pub(crate) fn write(err: io::Error) -> Self {
        Error::WriteFail(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::Eof
        } else {
            Error::Io(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_eof_maps_to_eof() {
        let err: Error = io::Error::from(io::ErrorKind::UnexpectedEof).into();
        assert!(matches!(err, Error::Eof));
        assert!(err.is_fatal());
    }

    #[test]
    fn other_io_errors_are_preserved() {
        let err: Error = io::Error::from(io::ErrorKind::PermissionDenied).into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn unintelligible_is_not_fatal() {
        assert!(!Error::unintelligible("bad magic").is_fatal());
        assert!(!Error::Comment.is_fatal());
    }
}
