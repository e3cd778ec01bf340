//! Generic structural tree used at the persistence boundary.

use crate::error::{BemError, BemResult};

/// Value of one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum AttributeValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Free-form text.
    String(String),
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<usize> for AttributeValue {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Named attribute of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Attribute {
    /// Attribute name.
    pub name: String,
    /// Attribute value.
    pub value: AttributeValue,
}

/// Node of the structural tree: a name, ordered attributes and ordered children.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ObjectState {
    name: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Vec::is_empty"))]
    attributes: Vec<Attribute>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Vec::is_empty"))]
    children: Vec<ObjectState>,
}

impl ObjectState {
    /// Creates an empty node.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Node name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets an attribute, replacing any previous value under the same name.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<AttributeValue>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|attr| attr.name == name) {
            Some(attr) => attr.value = value,
            None => self.attributes.push(Attribute {
                name: name.to_owned(),
                value,
            }),
        }
    }

    /// Builder form of [`Self::set_attribute`].
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Attributes in insertion order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Value of attribute `name`, if set.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| &attr.value)
    }

    /// Returns `true` if attribute `name` is set.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    fn required(&self, name: &str) -> BemResult<&AttributeValue> {
        self.attribute(name)
            .ok_or_else(|| BemError::load(&self.name, format!("missing attribute '{name}'")))
    }

    fn mistyped(&self, name: &str, expected: &str) -> BemError {
        BemError::load(&self.name, format!("attribute '{name}' is not {expected}"))
    }

    /// Required string attribute.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::LoadFormat`] if the attribute is missing or not a
    /// string.
    pub fn string_attribute(&self, name: &str) -> BemResult<&str> {
        match self.required(name)? {
            AttributeValue::String(value) => Ok(value),
            _ => Err(self.mistyped(name, "a string")),
        }
    }

    /// Optional string attribute.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::LoadFormat`] if the attribute is set but not a
    /// string.
    pub fn optional_string_attribute(&self, name: &str) -> BemResult<Option<&str>> {
        if self.has_attribute(name) {
            self.string_attribute(name).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Required integer attribute.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::LoadFormat`] if the attribute is missing or not an
    /// integer.
    pub fn int_attribute(&self, name: &str) -> BemResult<i64> {
        match self.required(name)? {
            AttributeValue::Int(value) => Ok(*value),
            _ => Err(self.mistyped(name, "an integer")),
        }
    }

    /// Required attribute holding a non-negative 32-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::LoadFormat`] if the attribute is missing, not an
    /// integer or out of range.
    pub fn u32_attribute(&self, name: &str) -> BemResult<u32> {
        let value = self.int_attribute(name)?;
        u32::try_from(value).map_err(|_| {
            BemError::load(&self.name, format!("attribute '{name}' value {value} is out of range"))
        })
    }

    /// Optional attribute holding a non-negative 32-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::LoadFormat`] if the attribute is set but invalid.
    pub fn optional_u32_attribute(&self, name: &str) -> BemResult<Option<u32>> {
        if self.has_attribute(name) {
            self.u32_attribute(name).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Required boolean attribute.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::LoadFormat`] if the attribute is missing or not a
    /// boolean.
    pub fn bool_attribute(&self, name: &str) -> BemResult<bool> {
        match self.required(name)? {
            AttributeValue::Bool(value) => Ok(*value),
            _ => Err(self.mistyped(name, "a boolean")),
        }
    }

    /// Appends a child node and returns it.
    pub fn add_child(&mut self, child: Self) -> &mut Self {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Children in insertion order.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// Number of children.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Child at `index`, if any.
    #[must_use]
    pub fn child(&self, index: usize) -> Option<&Self> {
        self.children.get(index)
    }

    /// Children called `name`, in order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }
}
