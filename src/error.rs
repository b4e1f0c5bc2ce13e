//! Error taxonomy for decoding, encoding and model construction.
//!
//! Every decode/encode failure is terminal and names the path that failed,
//! the enclosing record where there is one, and what was expected vs. found.

use std::fmt;

use thiserror::Error;

use crate::registry::HookError;

// ------------------------------- Paths ----------------------------------- //

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Location inside a document, e.g. `childs.abc.count` or `data3d[1][0]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path(Vec<Segment>);

impl Path {
    pub fn segments(&self) -> &[Segment] { &self.0 }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("$");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => f.write_str(key)?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Borrowed breadcrumb kept on the stack during traversal; only turned into
/// an owned [`Path`] when an error is built.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Trail<'a> {
    Root,
    Key(&'a Trail<'a>, &'a str),
    Index(&'a Trail<'a>, usize),
}

impl<'a> Trail<'a> {
    pub(crate) fn key(&'a self, key: &'a str) -> Trail<'a> { Trail::Key(self, key) }
    pub(crate) fn index(&'a self, index: usize) -> Trail<'a> { Trail::Index(self, index) }

    pub(crate) fn depth(&self) -> usize {
        match self {
            Trail::Root => 0,
            Trail::Key(parent, _) | Trail::Index(parent, _) => parent.depth() + 1,
        }
    }

    pub(crate) fn to_path(&self) -> Path {
        let mut segments = Vec::with_capacity(self.depth());
        let mut cursor = self;
        loop {
            match cursor {
                Trail::Root => break,
                Trail::Key(parent, key) => {
                    segments.push(Segment::Key((*key).to_owned()));
                    cursor = parent;
                }
                Trail::Index(parent, index) => {
                    segments.push(Segment::Index(*index));
                    cursor = parent;
                }
            }
        }
        segments.reverse();
        Path(segments)
    }
}

impl fmt::Display for Trail<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_path())
    }
}

// ------------------------------- Errors ---------------------------------- //

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedRootType,
    NotAMapping,
    MissingRequiredField,
    NullNotAccepted,
    TypeMismatch,
    NoMatchingAlternative,
    AmbiguousAlternative,
    NoMatchingEnumMember,
    UnsupportedType,
    ConverterFailed,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("only records and mappings are supported at the root, but got {ty}")]
    UnsupportedRootType { ty: String },

    #[error("{record} needs a JSON object at `{path}`, but got {actual}")]
    NotAMapping { record: String, path: Path, actual: String },

    #[error("{record} missing required attribute `{path}` ({expected})")]
    MissingRequiredField { record: String, path: Path, expected: String },

    #[error("null is not accepted inside attribute `{path}` of {record}, expected {expected}")]
    NullNotAccepted { record: String, path: Path, expected: String },

    #[error("key `{path}` of {record} needs {expected} but got {actual}")]
    TypeMismatch { record: String, path: Path, expected: String, actual: String },

    #[error("key `{path}` of {record} matched none of {}: got {actual}", .alternatives.join(", "))]
    NoMatchingAlternative { record: String, path: Path, alternatives: Vec<String>, actual: String },

    #[error("key `{path}` of {record} matched more than one of {}", .alternatives.join(", "))]
    AmbiguousAlternative { record: String, path: Path, alternatives: Vec<String> },

    #[error("key `{path}` of {record}: {actual} is not a member of enum {enum_name}")]
    NoMatchingEnumMember { record: String, path: Path, enum_name: String, actual: String },

    #[error("unable to handle {ty} at `{path}`: got {actual}")]
    UnsupportedType { path: Path, ty: String, actual: String },

    #[error("converter for {ty} failed at `{path}`: {source}")]
    ConverterFailed {
        path: Path,
        ty: String,
        #[source]
        source: HookError,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedRootType { .. } => ErrorKind::UnsupportedRootType,
            Error::NotAMapping { .. } => ErrorKind::NotAMapping,
            Error::MissingRequiredField { .. } => ErrorKind::MissingRequiredField,
            Error::NullNotAccepted { .. } => ErrorKind::NullNotAccepted,
            Error::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Error::NoMatchingAlternative { .. } => ErrorKind::NoMatchingAlternative,
            Error::AmbiguousAlternative { .. } => ErrorKind::AmbiguousAlternative,
            Error::NoMatchingEnumMember { .. } => ErrorKind::NoMatchingEnumMember,
            Error::UnsupportedType { .. } => ErrorKind::UnsupportedType,
            Error::ConverterFailed { .. } => ErrorKind::ConverterFailed,
        }
    }

    /// `None` only for root-type errors, which happen before any traversal.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::UnsupportedRootType { .. } => None,
            Error::NotAMapping { path, .. }
            | Error::MissingRequiredField { path, .. }
            | Error::NullNotAccepted { path, .. }
            | Error::TypeMismatch { path, .. }
            | Error::NoMatchingAlternative { path, .. }
            | Error::AmbiguousAlternative { path, .. }
            | Error::NoMatchingEnumMember { path, .. }
            | Error::UnsupportedType { path, .. }
            | Error::ConverterFailed { path, .. } => Some(path),
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.path().map_or(0, Path::len)
    }
}

/// Problems with a [`TypeModel`](crate::ir::TypeModel) itself, found while
/// loading or validating it.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid type model at `{path}`: {message}")]
    Parse { path: String, message: String },

    #[error("record `{0}` is declared more than once")]
    DuplicateRecord(String),

    #[error("enum `{0}` is declared more than once")]
    DuplicateEnum(String),

    #[error("field `{field}` is declared more than once in record `{record}`")]
    DuplicateField { record: String, field: String },

    #[error("field `{field}` of `{record}` refers to unknown record `{name}`")]
    UnknownRecord { record: String, field: String, name: String },

    #[error("field `{field}` of `{record}` refers to unknown enum `{name}`")]
    UnknownEnum { record: String, field: String, name: String },

    #[error("field `{field}` of `{record}` declares a union with no alternatives")]
    EmptyUnion { record: String, field: String },

    #[error("field `{field}` of structural record `{record}` cannot declare a default")]
    DefaultOnStructuralField { record: String, field: String },

    #[error("field `{field}` of `{record}` declares a default but `{ty}` is not nullable")]
    DefaultOnRequiredField { record: String, field: String, ty: String },

    #[error("enum `{0}` has no members")]
    EmptyEnum(String),

    #[error("member `{member}` is declared more than once in enum `{name}`")]
    DuplicateMember { name: String, member: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trail_renders_keys_and_indices() {
        let root = Trail::Root;
        let data = root.key("data3d");
        let row = data.index(1);
        let cell = row.index(0);
        assert_eq!(cell.depth(), 3);
        assert_eq!(cell.to_path().to_string(), "data3d[1][0]");

        let childs = root.key("childs");
        let abc = childs.key("abc");
        assert_eq!(abc.key("count").to_string(), "childs.abc.count");
        assert_eq!(root.to_path().to_string(), "$");
    }

    #[test]
    fn kind_and_path_follow_variant() {
        let err = Error::TypeMismatch {
            record: "CountingModel".into(),
            path: Trail::Root.key("count").to_path(),
            expected: "integer".into(),
            actual: "text".into(),
        };
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(err.depth(), 1);
        assert_eq!(err.to_string(), "key `count` of CountingModel needs integer but got text");

        let root = Error::UnsupportedRootType { ty: "integer".into() };
        assert!(root.path().is_none());
    }
}
