use crate::path::{Path, PathStep};

/// The kind of failure. Kinds are stable; messages are for humans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TypeMismatch,
    BoolValidation,
    NumberValidation,
    StringValidation,
    ListValidation,
    MapValidation,
    SetValidation,
    TupleValidation,
    AttributeValidation,
    CapsuleValidation,
    TypeParse,
    Conversion,
    Serialization,
    Deserialization,
    Function,
}

impl ErrorKind {
    fn prefix(self) -> &'static str {
        match self {
            ErrorKind::BoolValidation => "Boolean validation error: ",
            ErrorKind::NumberValidation => "Number validation error: ",
            ErrorKind::StringValidation => "String validation error: ",
            _ => "",
        }
    }
}

/// A CTY error. The structural path is kept as data and only rendered by
/// `Display`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", render(.kind, .message, .path))]
pub struct CtyError {
    kind: ErrorKind,
    message: String,
    path: Path,
}

fn render(kind: &ErrorKind, message: &str, path: &Path) -> String {
    if path.is_root() {
        format!("{}{}", kind.prefix(), message)
    } else {
        format!("At {}: {}{}", path, kind.prefix(), message)
    }
}

impl CtyError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        CtyError {
            kind,
            message: message.into(),
            path: Path::root(),
        }
    }

    pub fn type_mismatch(expected: impl std::fmt::Display, actual: impl std::fmt::Display) -> Self {
        CtyError::new(
            ErrorKind::TypeMismatch,
            format!("Value type mismatch: expected {}, got {}", expected, actual),
        )
    }

    pub fn type_parse(message: impl Into<String>) -> Self {
        CtyError::new(ErrorKind::TypeParse, message)
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        CtyError::new(ErrorKind::Conversion, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        CtyError::new(ErrorKind::Serialization, message)
    }

    pub fn deserialization(message: impl Into<String>) -> Self {
        CtyError::new(ErrorKind::Deserialization, message)
    }

    pub fn function(name: &str, message: impl std::fmt::Display) -> Self {
        CtyError::new(ErrorKind::Function, format!("{}: {}", name, message))
    }

    pub fn with_path(mut self, path: Path) -> Self {
        self.path = path;
        self
    }

    /// Prefix a path step; container validators call this on errors
    /// coming out of a child.
    pub fn at(mut self, step: PathStep) -> Self {
        self.path.prepend(step);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
