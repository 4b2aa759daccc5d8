use std::fmt;

/// Errors surfaced by registries, decoders, the scene graph and the deserializer.
///
/// Content and lookup failures are always returned to the caller. Only the
/// `must_*` conveniences turn them into panics.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Duplicate name or tag registration. Registration never overwrites.
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: &'static str, name: String },

    /// Lookup miss by name, identifier or tag.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// Entry exists but holds a different concrete kind than requested.
    #[error("'{name}' is not a {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    /// Decoded payload is malformed.
    #[error("invalid content: {0}")]
    InvalidContent(String),

    #[error("resource '{0}' is not resizable")]
    NotResizable(String),

    #[error("invalid size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    /// Structural mutation would break the forest (cycle, foreign node, wrong parent).
    #[error("hierarchy: {0}")]
    Hierarchy(String),

    #[error("object identifiers exhausted")]
    IdentifiersExhausted,

    /// GPU allocation failure reported by the allocator.
    #[error("gpu: {0}")]
    Gpu(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Deserializer failure annotated with the path of the failing node.
    #[error("build object error at '{path}': {source}")]
    Build {
        path: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn not_found(kind: &'static str, name: impl fmt::Display) -> Self {
        Self::NotFound { kind, name: name.to_string() }
    }

    pub fn already_exists(kind: &'static str, name: impl fmt::Display) -> Self {
        Self::AlreadyExists { kind, name: name.to_string() }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidContent(msg.into())
    }

    /// Wraps `self` with the path of the node being built.
    ///
    /// Nested build errors keep the innermost (deepest) path.
    pub fn at_node(self, path: &str) -> Self {
        match self {
            e @ Self::Build { .. } => e,
            other => Self::Build { path: path.to_string(), source: Box::new(other) },
        }
    }

    /// The innermost error, looking through build annotations.
    pub fn root_cause(&self) -> &Error {
        match self {
            Self::Build { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_kind_and_name() {
        let e = Error::already_exists("texture", "logo.png");
        assert_eq!(e.to_string(), "texture 'logo.png' already exists");
    }

    #[test]
    fn at_node_keeps_deepest_path() {
        let e = Error::not_found("component builder", "ui.nope")
            .at_node("root/panel/label")
            .at_node("root/panel")
            .at_node("root");
        match &e {
            Error::Build { path, .. } => assert_eq!(path, "root/panel/label"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(e.root_cause(), Error::NotFound { .. }));
    }
}
