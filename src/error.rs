//! Unified error type.

/// A boxed error raised by a handler or middleware.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by lapse's fallible operations.
///
/// Application-level outcomes (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures and failures raised inside the request pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Binding to a port or accepting a connection failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(String),

    /// A handler or middleware failed. The server answers with `500`.
    #[error("handler: {0}")]
    Handler(BoxError),
}

impl Error {
    /// Wraps a handler failure.
    ///
    /// A boxed `Error` is unwrapped instead of nested, so a failure travels
    /// through any number of stages and comes out as the value it went in as.
    pub fn handler(err: impl Into<BoxError>) -> Self {
        match err.into().downcast::<Error>() {
            Ok(inner) => *inner,
            Err(other) => Self::Handler(other),
        }
    }

    /// Returns the handler failure as its concrete type, if it is one.
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Handler(e) => e.downcast_ref::<E>(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn handler_keeps_concrete_error() {
        let err = Error::handler(Boom);
        assert_eq!(err.downcast_ref::<Boom>(), Some(&Boom));
        assert_eq!(err.to_string(), "handler: boom");
    }

    #[test]
    fn handler_does_not_nest_lapse_errors() {
        let err = Error::handler(Error::Config("bad".into()));
        assert!(matches!(err, Error::Config(ref m) if m == "bad"));
    }
}
