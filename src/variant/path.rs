//! Field path and path element types.

use std::fmt;

use super::error::VariantError;

const SELECTOR_DELIMITER: char = '=';

/// PathElement represents one level of path navigation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathElement {
    /// Field name for map fields.
    FieldName(String),
    /// Selects the element of a sequence whose `key` field equals `value`.
    Selector { key: String, value: String },
    /// Position of an element in a sequence.
    Index(usize),
}

impl PathElement {
    /// Creates a new field name path element.
    pub fn field_name(name: impl Into<String>) -> Self {
        PathElement::FieldName(name.into())
    }

    /// Creates a new selector path element.
    pub fn selector(key: impl Into<String>, value: impl Into<String>) -> Self {
        PathElement::Selector {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parses a segment, treating `key=value` as a selector.
    pub fn parse(segment: &str) -> Result<Self, VariantError> {
        if !segment.contains(SELECTOR_DELIMITER) {
            return Ok(PathElement::field_name(segment));
        }
        let parts: Vec<&str> = segment.split(SELECTOR_DELIMITER).collect();
        match parts.as_slice() {
            [key, value] if !key.is_empty() => Ok(PathElement::selector(*key, *value)),
            _ => Err(VariantError::invalid_selector(segment)),
        }
    }

    /// Returns true if this is a field name element.
    pub fn is_field_name(&self) -> bool {
        matches!(self, PathElement::FieldName(_))
    }

    /// Returns the field name if this is a field name element.
    pub fn as_field_name(&self) -> Option<&str> {
        match self {
            PathElement::FieldName(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::FieldName(name) => write!(f, ".{}", name),
            PathElement::Selector { key, value } => write!(f, "[{}={}]", key, value),
            PathElement::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// FieldPath is a sequence of path elements addressing a nested field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    elements: Vec<PathElement>,
}

impl FieldPath {
    /// Creates a new empty path.
    pub fn new() -> Self {
        FieldPath { elements: Vec::new() }
    }

    /// Parses path segments, recognizing `key=value` selectors.
    pub fn parse<S: AsRef<str>>(segments: &[S]) -> Result<Self, VariantError> {
        segments
            .iter()
            .map(|s| PathElement::parse(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(|elements| FieldPath { elements })
    }

    /// Creates a path of plain field names. Segments are never treated as
    /// selectors, so map keys containing `=` can be addressed.
    pub fn fields<S: AsRef<str>>(segments: &[S]) -> Self {
        FieldPath {
            elements: segments
                .iter()
                .map(|s| PathElement::field_name(s.as_ref()))
                .collect(),
        }
    }

    /// Returns the number of elements in the path.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if the path is empty.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns an iterator over the path elements.
    pub fn iter(&self) -> impl Iterator<Item = &PathElement> {
        self.elements.iter()
    }

    /// Appends a path element.
    pub fn push(&mut self, element: PathElement) {
        self.elements.push(element);
    }

    /// Returns the last path element.
    pub fn last(&self) -> Option<&PathElement> {
        self.elements.last()
    }

    /// Creates a new path with the given element appended.
    pub fn with(&self, element: PathElement) -> Self {
        let mut new_path = self.clone();
        new_path.push(element);
        new_path
    }

    /// Returns `self` followed by the elements of `other`.
    pub fn join(&self, other: &FieldPath) -> FieldPath {
        let mut elements = self.elements.clone();
        elements.extend(other.elements.iter().cloned());
        FieldPath { elements }
    }

    /// Returns the path made of the first `n` elements.
    pub fn prefix(&self, n: usize) -> FieldPath {
        FieldPath {
            elements: self.elements[..n.min(self.elements.len())].to_vec(),
        }
    }

    /// Returns true if `self` is `other` or one of its ancestors.
    pub fn is_prefix_of(&self, other: &FieldPath) -> bool {
        other.elements.starts_with(&self.elements)
    }

    /// Returns a slice of the path elements.
    pub fn as_slice(&self) -> &[PathElement] {
        &self.elements
    }
}

impl FromIterator<PathElement> for FieldPath {
    fn from_iter<T: IntoIterator<Item = PathElement>>(iter: T) -> Self {
        FieldPath {
            elements: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FieldPath {
    type Item = &'a PathElement;
    type IntoIter = std::slice::Iter<'a, PathElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.elements.is_empty() {
            return write!(f, ".");
        }
        for element in &self.elements {
            write!(f, "{}", element)?;
        }
        Ok(())
    }
}
