//! Error types for the reflection engine

/// Errors raised by registration, value handling and the text format.
///
/// Registration errors are normally fatal: the non-`try_` entry points log
/// them and panic through [`fatal`]. The `try_` variants hand them back.
#[derive(Debug, thiserror::Error)]
pub enum ReflectError {
    #[error("property `{property}` is already registered on `{ty}`")]
    DuplicateProperty { ty: String, property: String },

    #[error("method `{method}` on `{ty}` already has an overload with the same signature")]
    DuplicateSignature { ty: String, method: String },

    #[error("method `{method}` on `{ty}` mixes static and instance overloads")]
    MixedStaticness { ty: String, method: String },

    #[error("`{ty}` cannot be its own parent")]
    SelfParent { ty: String },

    #[error("`{ty}` already has a parent")]
    ParentAlreadySet { ty: String },

    #[error("`{member}` was built for `{found}` but registered on `{expected}`")]
    OwnerMismatch {
        expected: String,
        found: String,
        member: String,
    },

    #[error("`{ty}` has no {capability} capability")]
    MissingCapability {
        ty: String,
        capability: &'static str,
    },

    #[error("lifecycle table was built for `{found}` but registered as `{ty}`")]
    LifecycleMismatch { ty: String, found: &'static str },

    #[error("`{ty}` has no property named `{property}`")]
    UnknownProperty { ty: String, property: String },

    #[error("cannot read `{token}` as {expected}")]
    Parse { expected: &'static str, token: String },

    #[error("unexpected end of input while reading {expected}")]
    UnexpectedEof { expected: &'static str },

    #[error("value is empty or read-only")]
    NotWritable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for reflection operations
pub type ReflectResult<T> = Result<T, ReflectError>;

/// Report an unrecoverable metadata error and halt.
#[cold]
#[track_caller]
pub(crate) fn fatal(err: ReflectError) -> ! {
    tracing::error!("{}", err);
    panic!("{}", err)
}
