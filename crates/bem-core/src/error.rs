use thiserror::Error;

/// Error classes used for reporting and policy decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ErrorClass {
    /// A key or name is already taken among prospective siblings.
    Naming,
    /// A bit pattern would make decoding ambiguous.
    Encoding,
    /// Strict keyed or indexed access failed.
    Access,
    /// A persisted tree could not be restored.
    Load,
}

/// Errors raised by encoding map construction, mutation and restoration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BemError {
    /// Duplicate key among prospective siblings.
    #[error("{item} already exists in {owner}")]
    NameConflict {
        /// The rejected item, e.g. `socket 'S1'`.
        item: String,
        /// The owner that rejected it, e.g. `source field of bus 'B1'`.
        owner: String,
    },
    /// Candidate bit pattern is ambiguous with a committed one.
    #[error("encoding of {item} is ambiguous with {existing} in {owner}")]
    EncodingCollision {
        /// The rejected item.
        item: String,
        /// The committed item the candidate cannot be told apart from.
        existing: String,
        /// The shared field both live in.
        owner: String,
    },
    /// Strict keyed lookup found nothing.
    #[error("{item} not found in {owner}")]
    NotFound {
        /// The requested item.
        item: String,
        /// The owner that was searched.
        owner: String,
    },
    /// Strict indexed access outside the valid range.
    #[error("{what} index {index} out of range (count {count})")]
    OutOfRange {
        /// The indexed collection.
        what: &'static str,
        /// The requested index.
        index: usize,
        /// The number of items in the collection.
        count: usize,
    },
    /// Persisted tree is missing nodes/attributes or uses wrong names.
    #[error("cannot load '{node}': {reason}")]
    LoadFormat {
        /// Name of the offending tree node.
        node: String,
        /// Human-readable cause.
        reason: String,
    },
}

impl BemError {
    pub(crate) fn name_conflict(item: impl Into<String>, owner: impl Into<String>) -> Self {
        Self::NameConflict {
            item: item.into(),
            owner: owner.into(),
        }
    }

    pub(crate) fn collision(
        item: impl Into<String>,
        existing: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self::EncodingCollision {
            item: item.into(),
            existing: existing.into(),
            owner: owner.into(),
        }
    }

    pub(crate) fn not_found(item: impl Into<String>, owner: impl Into<String>) -> Self {
        Self::NotFound {
            item: item.into(),
            owner: owner.into(),
        }
    }

    pub(crate) const fn out_of_range(what: &'static str, index: usize, count: usize) -> Self {
        Self::OutOfRange { what, index, count }
    }

    pub(crate) fn load(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LoadFormat {
            node: node.into(),
            reason: reason.into(),
        }
    }

    /// Returns the error class for this error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::NameConflict { .. } => ErrorClass::Naming,
            Self::EncodingCollision { .. } => ErrorClass::Encoding,
            Self::NotFound { .. } | Self::OutOfRange { .. } => ErrorClass::Access,
            Self::LoadFormat { .. } => ErrorClass::Load,
        }
    }

    /// Design-time errors are the ones a toolchain user can fix by editing the map.
    #[must_use]
    pub const fn is_design_error(&self) -> bool {
        matches!(self.class(), ErrorClass::Naming | ErrorClass::Encoding)
    }
}

/// Result alias used throughout the crate.
pub type BemResult<T> = Result<T, BemError>;

#[cfg(test)]
mod tests {
    use super::{BemError, ErrorClass};

    #[test]
    fn class_mapping_matches_taxonomy() {
        assert_eq!(
            BemError::name_conflict("table 'T'", "encoding map").class(),
            ErrorClass::Naming
        );
        assert_eq!(
            BemError::collision("socket 'S2'", "socket 'S1'", "source field").class(),
            ErrorClass::Encoding
        );
        assert_eq!(
            BemError::not_found("bus 'B9'", "encoding map").class(),
            ErrorClass::Access
        );
        assert_eq!(
            BemError::out_of_range("move slot", 3, 1).class(),
            ErrorClass::Access
        );
        assert_eq!(BemError::load("bem", "bad").class(), ErrorClass::Load);
    }

    #[test]
    fn messages_name_the_offender() {
        let err = BemError::collision("socket 'S2'", "socket 'S1'", "source field of bus 'B1'");
        assert_eq!(
            err.to_string(),
            "encoding of socket 'S2' is ambiguous with socket 'S1' in source field of bus 'B1'"
        );

        let err = BemError::name_conflict("socket code table 'T'", "encoding map");
        assert_eq!(
            err.to_string(),
            "socket code table 'T' already exists in encoding map"
        );
    }

    #[test]
    fn only_naming_and_encoding_are_design_errors() {
        assert!(BemError::name_conflict("a", "b").is_design_error());
        assert!(BemError::collision("a", "b", "c").is_design_error());
        assert!(!BemError::out_of_range("x", 0, 0).is_design_error());
        assert!(!BemError::load("x", "y").is_design_error());
    }
}
