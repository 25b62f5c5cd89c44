/// Error type for the schemata crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The locator or migration set is unusable as given.
    #[error("{0}")]
    Config(String),
    /// Two migrations in one set share a version.
    #[error("duplicate migration version {0}")]
    DuplicateVersion(u32),
    /// The server could not be reached, or the connection broke.
    #[error("{0}")]
    Connection(String),
    /// The server rejected a statement.
    #[error("{0}")]
    Statement(String),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    /// An [Interrupt](crate::Interrupt) was raised before the named step started.
    #[error("interrupted before {0}")]
    Interrupted(String),
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap this error with a description of what was being attempted.
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with all context layers peeled off.
    pub fn root(&self) -> &Error {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

impl From<mysql::Error> for Error {
    fn from(value: mysql::Error) -> Self {
        match value {
            mysql::Error::MySqlError(_) => Self::Statement(value.to_string()),
            mysql::Error::UrlError(_) => Self::Config(value.to_string()),
            _ => Self::Connection(value.to_string()),
        }
    }
}

// Manual PartialEq implementation because std::io::Error doesn't implement PartialEq
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Config(a), Self::Config(b)) => a == b,
            (Self::DuplicateVersion(a), Self::DuplicateVersion(b)) => a == b,
            (Self::Connection(a), Self::Connection(b)) => a == b,
            (Self::Statement(a), Self::Statement(b)) => a == b,
            (
                Self::Io {
                    context: a,
                    source: x,
                },
                Self::Io {
                    context: b,
                    source: y,
                },
            ) => a == b && x.kind() == y.kind(),
            (Self::Interrupted(a), Self::Interrupted(b)) => a == b,
            (
                Self::Context {
                    context: a,
                    source: x,
                },
                Self::Context {
                    context: b,
                    source: y,
                },
            ) => a == b && x == y,
            _ => false,
        }
    }
}
