//! Move slots and their ordered sub-fields.

use tracing::{debug, trace};

use crate::error::{BemError, BemResult};
use crate::guard_field::GuardField;
use crate::order::{move_to_index, offset_of, permute};
use crate::slot_field::{DestinationField, SourceField};
use crate::socket_code_table::{SocketCodeTables, TableId};

/// Kind of a move slot sub-field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SubFieldKind {
    /// Guard field.
    Guard,
    /// Source field.
    Source,
    /// Destination field.
    Destination,
}

impl SubFieldKind {
    /// Lower-case name used in messages and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Guard => "guard field",
            Self::Source => "source field",
            Self::Destination => "destination field",
        }
    }
}

/// One sub-field of a move slot.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MoveSlotField {
    /// Guard field.
    Guard(GuardField),
    /// Source field.
    Source(SourceField),
    /// Destination field.
    Destination(DestinationField),
}

impl MoveSlotField {
    /// Kind of the sub-field.
    #[must_use]
    pub const fn kind(&self) -> SubFieldKind {
        match self {
            Self::Guard(_) => SubFieldKind::Guard,
            Self::Source(_) => SubFieldKind::Source,
            Self::Destination(_) => SubFieldKind::Destination,
        }
    }

    /// Width of the sub-field.
    #[must_use]
    pub fn width(&self, tables: &SocketCodeTables) -> u32 {
        match self {
            Self::Guard(field) => field.width(),
            Self::Source(field) => field.width(tables),
            Self::Destination(field) => field.width(tables),
        }
    }

    /// Extra bits of the sub-field.
    #[must_use]
    pub fn extra_bits(&self) -> u32 {
        match self {
            Self::Guard(field) => field.extra_bits(),
            Self::Source(field) => field.extra_bits(),
            Self::Destination(field) => field.extra_bits(),
        }
    }
}

/// Encoding of the moves executed on one bus.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MoveSlot {
    name: String,
    extra_bits: u32,
    children: Vec<MoveSlotField>,
}

impl MoveSlot {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            extra_bits: 0,
            children: Vec::new(),
        }
    }

    /// Bus name, unique among move slots.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        name.clone_into(&mut self.name);
        for child in &mut self.children {
            match child {
                MoveSlotField::Guard(field) => field.set_bus_name(name),
                MoveSlotField::Source(field) => field.set_bus_name(name),
                MoveSlotField::Destination(field) => field.set_bus_name(name),
            }
        }
    }

    /// Literal zero bits above the sub-fields.
    #[must_use]
    pub const fn extra_bits(&self) -> u32 {
        self.extra_bits
    }

    /// Sets the padding bits.
    pub const fn set_extra_bits(&mut self, bits: u32) {
        self.extra_bits = bits;
    }

    fn reject_duplicate(&self, kind: SubFieldKind) -> BemError {
        let err = BemError::name_conflict(kind.as_str(), format!("move slot '{}'", self.name));
        debug!(%err, "sub-field rejected");
        err
    }

    fn push(&mut self, field: MoveSlotField) {
        trace!(slot = %self.name, field = field.kind().as_str(), "sub-field added");
        self.children.push(field);
    }

    fn missing(&self, kind: SubFieldKind) -> BemError {
        BemError::not_found(kind.as_str(), format!("move slot '{}'", self.name))
    }

    /// Creates the guard field as the highest-ordinal sub-field.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::NameConflict`] if the slot already has one.
    pub fn add_guard_field(&mut self) -> BemResult<&mut GuardField> {
        if self.guard_field().is_some() {
            return Err(self.reject_duplicate(SubFieldKind::Guard));
        }
        let field = GuardField::new(&self.name);
        self.push(MoveSlotField::Guard(field));
        let missing = self.missing(SubFieldKind::Guard);
        self.guard_field_mut().ok_or(missing)
    }

    /// Creates the source field as the highest-ordinal sub-field.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::NameConflict`] if the slot already has one.
    pub fn add_source_field(&mut self) -> BemResult<&mut SourceField> {
        if self.source_field().is_some() {
            return Err(self.reject_duplicate(SubFieldKind::Source));
        }
        let field = SourceField::new(&self.name);
        self.push(MoveSlotField::Source(field));
        let missing = self.missing(SubFieldKind::Source);
        self.source_field_mut().ok_or(missing)
    }

    /// Creates the destination field as the highest-ordinal sub-field.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::NameConflict`] if the slot already has one.
    pub fn add_destination_field(&mut self) -> BemResult<&mut DestinationField> {
        if self.destination_field().is_some() {
            return Err(self.reject_duplicate(SubFieldKind::Destination));
        }
        let field = DestinationField::new(&self.name);
        self.push(MoveSlotField::Destination(field));
        let missing = self.missing(SubFieldKind::Destination);
        self.destination_field_mut().ok_or(missing)
    }

    /// The guard field, if any.
    #[must_use]
    pub fn guard_field(&self) -> Option<&GuardField> {
        self.children.iter().find_map(|child| match child {
            MoveSlotField::Guard(field) => Some(field),
            _ => None,
        })
    }

    /// Mutable guard field, if any.
    pub fn guard_field_mut(&mut self) -> Option<&mut GuardField> {
        self.children.iter_mut().find_map(|child| match child {
            MoveSlotField::Guard(field) => Some(field),
            _ => None,
        })
    }

    /// The source field, if any.
    #[must_use]
    pub fn source_field(&self) -> Option<&SourceField> {
        self.children.iter().find_map(|child| match child {
            MoveSlotField::Source(field) => Some(field),
            _ => None,
        })
    }

    /// Mutable source field, if any.
    pub fn source_field_mut(&mut self) -> Option<&mut SourceField> {
        self.children.iter_mut().find_map(|child| match child {
            MoveSlotField::Source(field) => Some(field),
            _ => None,
        })
    }

    /// The destination field, if any.
    #[must_use]
    pub fn destination_field(&self) -> Option<&DestinationField> {
        self.children.iter().find_map(|child| match child {
            MoveSlotField::Destination(field) => Some(field),
            _ => None,
        })
    }

    /// Mutable destination field, if any.
    pub fn destination_field_mut(&mut self) -> Option<&mut DestinationField> {
        self.children.iter_mut().find_map(|child| match child {
            MoveSlotField::Destination(field) => Some(field),
            _ => None,
        })
    }

    /// Removes and returns the sub-field of `kind`.
    pub fn remove_field(&mut self, kind: SubFieldKind) -> Option<MoveSlotField> {
        let index = self.position(kind)?;
        Some(self.children.remove(index))
    }

    /// Number of sub-fields.
    #[must_use]
    pub fn child_field_count(&self) -> usize {
        self.children.len()
    }

    /// Sub-field at `ordinal`, 0 being the rightmost.
    #[must_use]
    pub fn child_field(&self, ordinal: usize) -> Option<&MoveSlotField> {
        self.children.get(ordinal)
    }

    /// Sub-fields in ordinal order.
    #[must_use]
    pub fn child_fields(&self) -> &[MoveSlotField] {
        &self.children
    }

    /// Ordinal of the sub-field of `kind`.
    #[must_use]
    pub fn position(&self, kind: SubFieldKind) -> Option<usize> {
        self.children.iter().position(|child| child.kind() == kind)
    }

    /// Moves the sub-field of `kind` to ordinal `to`, clamped to the end.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::NotFound`] if the slot has no such sub-field.
    pub fn set_position(&mut self, kind: SubFieldKind, to: usize) -> BemResult<()> {
        let from = self.position(kind).ok_or_else(|| self.missing(kind))?;
        move_to_index(&mut self.children, from, to);
        Ok(())
    }

    /// Bit offset of the sub-field of `kind` inside the slot.
    #[must_use]
    pub fn bit_position(&self, kind: SubFieldKind, tables: &SocketCodeTables) -> Option<u32> {
        let ordinal = self.position(kind)?;
        Some(offset_of(
            self.children.iter().map(|child| child.width(tables)),
            ordinal,
        ))
    }

    /// Sum of the sub-field widths plus extra bits.
    #[must_use]
    pub fn width(&self, tables: &SocketCodeTables) -> u32 {
        self.children
            .iter()
            .map(|child| child.width(tables))
            .fold(self.extra_bits, u32::saturating_add)
    }

    pub(crate) fn reorder_children(&mut self, order: &[usize]) {
        permute(&mut self.children, order);
    }

    pub(crate) fn detach_table(&mut self, table: TableId) {
        for child in &mut self.children {
            match child {
                MoveSlotField::Source(field) => field.detach_table(table),
                MoveSlotField::Destination(field) => field.detach_table(table),
                MoveSlotField::Guard(_) => {}
            }
        }
    }
}
