//! The binary encoding map root.
//!
//! [`BinaryEncoding`] owns every top-level instruction field in ordinal order
//! (ordinal 0 occupies the least significant bits) and the socket code tables
//! the slot fields refer to. Widths and bit positions are always recomputed
//! from the tree, never cached.

use tracing::{debug, trace};

use crate::error::{BemError, BemResult};
use crate::fields::{ImmediateControlField, ImmediateSlotField, LImmDstRegisterField};
use crate::move_slot::MoveSlot;
use crate::order::{move_to_index, offset_of, permute};
use crate::slot_field::{SlotField, SlotSide, SocketEncoding};
use crate::socket_code_table::{SocketCodeTable, SocketCodeTables, TableId};

/// Kind of a top-level instruction field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FieldKind {
    /// Move slot of one bus.
    MoveSlot,
    /// Long immediate slot.
    ImmediateSlot,
    /// Instruction template selector.
    ImmediateControl,
    /// Long immediate destination register index.
    LImmDstRegister,
}

impl FieldKind {
    /// Lower-case name used in messages and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MoveSlot => "move slot",
            Self::ImmediateSlot => "immediate slot",
            Self::ImmediateControl => "immediate control field",
            Self::LImmDstRegister => "long immediate destination register field",
        }
    }
}

/// Identifies one top-level field independent of its ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKey<'a> {
    /// Move slot by bus name.
    MoveSlot(&'a str),
    /// Immediate slot by name.
    ImmediateSlot(&'a str),
    /// The immediate control field.
    ImmediateControl,
    /// The n-th long immediate destination register field in ordinal order.
    LImmDstRegister(usize),
}

impl FieldKey<'_> {
    fn describe(&self) -> String {
        match self {
            Self::MoveSlot(name) => format!("move slot '{name}'"),
            Self::ImmediateSlot(name) => format!("immediate slot '{name}'"),
            Self::ImmediateControl => FieldKind::ImmediateControl.as_str().to_owned(),
            Self::LImmDstRegister(index) => format!(
                "{} #{index}",
                FieldKind::LImmDstRegister.as_str()
            ),
        }
    }
}

/// A top-level instruction field.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum InstructionField {
    /// Move slot.
    MoveSlot(MoveSlot),
    /// Long immediate slot.
    ImmediateSlot(ImmediateSlotField),
    /// Instruction template selector.
    ImmediateControl(ImmediateControlField),
    /// Long immediate destination register index.
    LImmDstRegister(LImmDstRegisterField),
}

impl InstructionField {
    /// Kind of the field.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        match self {
            Self::MoveSlot(_) => FieldKind::MoveSlot,
            Self::ImmediateSlot(_) => FieldKind::ImmediateSlot,
            Self::ImmediateControl(_) => FieldKind::ImmediateControl,
            Self::LImmDstRegister(_) => FieldKind::LImmDstRegister,
        }
    }

    /// Name of a named field.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::MoveSlot(slot) => Some(slot.name()),
            Self::ImmediateSlot(slot) => Some(slot.name()),
            Self::ImmediateControl(_) | Self::LImmDstRegister(_) => None,
        }
    }

    /// Width of the field.
    #[must_use]
    pub fn width(&self, tables: &SocketCodeTables) -> u32 {
        match self {
            Self::MoveSlot(slot) => slot.width(tables),
            Self::ImmediateSlot(slot) => slot.width(),
            Self::ImmediateControl(field) => field.width(),
            Self::LImmDstRegister(field) => field.width(),
        }
    }

    /// Extra bits of the field.
    #[must_use]
    pub const fn extra_bits(&self) -> u32 {
        match self {
            Self::MoveSlot(slot) => slot.extra_bits(),
            Self::ImmediateSlot(slot) => slot.extra_bits(),
            Self::ImmediateControl(field) => field.extra_bits(),
            Self::LImmDstRegister(field) => field.extra_bits(),
        }
    }
}

/// Root of the binary encoding map.
///
/// Two maps compare equal when they save to the same structural tree, so
/// table handles take no part in equality.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BinaryEncoding {
    extra_bits: u32,
    tables: SocketCodeTables,
    fields: Vec<InstructionField>,
}

impl PartialEq for BinaryEncoding {
    fn eq(&self, other: &Self) -> bool {
        self.save_state() == other.save_state()
    }
}

impl Eq for BinaryEncoding {}

const OWNER: &str = "encoding map";

impl BinaryEncoding {
    /// Creates an empty encoding map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Literal zero bits above every field.
    #[must_use]
    pub const fn extra_bits(&self) -> u32 {
        self.extra_bits
    }

    /// Sets the padding bits.
    pub const fn set_extra_bits(&mut self, bits: u32) {
        self.extra_bits = bits;
    }

    /// Total instruction width: every top-level field plus extra bits.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.fields
            .iter()
            .map(|field| field.width(&self.tables))
            .fold(self.extra_bits, u32::saturating_add)
    }

    // Field tree.

    /// Number of top-level fields.
    #[must_use]
    pub fn child_field_count(&self) -> usize {
        self.fields.len()
    }

    /// Top-level field at `ordinal`, 0 being the rightmost.
    #[must_use]
    pub fn child_field(&self, ordinal: usize) -> Option<&InstructionField> {
        self.fields.get(ordinal)
    }

    /// Top-level fields in ordinal order.
    #[must_use]
    pub fn child_fields(&self) -> &[InstructionField] {
        &self.fields
    }

    /// Ordinal of the field identified by `key`.
    #[must_use]
    pub fn position(&self, key: FieldKey<'_>) -> Option<usize> {
        match key {
            FieldKey::MoveSlot(name) => self.fields.iter().position(
                |field| matches!(field, InstructionField::MoveSlot(slot) if slot.name() == name),
            ),
            FieldKey::ImmediateSlot(name) => self.fields.iter().position(
                |field| matches!(field, InstructionField::ImmediateSlot(slot) if slot.name() == name),
            ),
            FieldKey::ImmediateControl => self
                .fields
                .iter()
                .position(|field| matches!(field, InstructionField::ImmediateControl(_))),
            FieldKey::LImmDstRegister(index) => self
                .fields
                .iter()
                .enumerate()
                .filter(|(_, field)| matches!(field, InstructionField::LImmDstRegister(_)))
                .nth(index)
                .map(|(ordinal, _)| ordinal),
        }
    }

    /// Moves the field identified by `key` to ordinal `to`.
    ///
    /// The field is removed first and `to` is clamped to the remaining field
    /// count.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::NotFound`] if no field matches `key`.
    pub fn set_position(&mut self, key: FieldKey<'_>, to: usize) -> BemResult<()> {
        let from = self
            .position(key)
            .ok_or_else(|| BemError::not_found(key.describe(), OWNER))?;
        move_to_index(&mut self.fields, from, to);
        trace!(field = %key.describe(), from, to, "field moved");
        Ok(())
    }

    /// Bit offset of the field identified by `key`.
    #[must_use]
    pub fn bit_position(&self, key: FieldKey<'_>) -> Option<u32> {
        let ordinal = self.position(key)?;
        Some(offset_of(
            self.fields.iter().map(|field| field.width(&self.tables)),
            ordinal,
        ))
    }

    fn push_field(&mut self, field: InstructionField) {
        trace!(kind = field.kind().as_str(), name = field.name(), "field added");
        self.fields.push(field);
    }

    pub(crate) fn reorder_fields(&mut self, order: &[usize]) {
        permute(&mut self.fields, order);
    }

    fn reject(item: String) -> BemError {
        let err = BemError::name_conflict(item, OWNER);
        debug!(%err, "field rejected");
        err
    }

    // Move slots.

    /// Creates a move slot for bus `name` as the highest-ordinal field.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::NameConflict`] if the bus already has a slot.
    pub fn add_move_slot(&mut self, name: &str) -> BemResult<&mut MoveSlot> {
        if self.move_slot(name).is_some() {
            return Err(Self::reject(format!("move slot '{name}'")));
        }
        self.push_field(InstructionField::MoveSlot(MoveSlot::new(name)));
        self.move_slot_mut(name)
            .ok_or_else(|| BemError::not_found(format!("move slot '{name}'"), OWNER))
    }

    /// Move slot of bus `name`.
    #[must_use]
    pub fn move_slot(&self, name: &str) -> Option<&MoveSlot> {
        self.move_slots().find(|slot| slot.name() == name)
    }

    /// Mutable move slot of bus `name`.
    pub fn move_slot_mut(&mut self, name: &str) -> Option<&mut MoveSlot> {
        self.fields.iter_mut().find_map(|field| match field {
            InstructionField::MoveSlot(slot) if slot.name() == name => Some(slot),
            _ => None,
        })
    }

    /// Move slots in ordinal order.
    pub fn move_slots(&self) -> impl Iterator<Item = &MoveSlot> {
        self.fields.iter().filter_map(|field| match field {
            InstructionField::MoveSlot(slot) => Some(slot),
            _ => None,
        })
    }

    /// Number of move slots.
    #[must_use]
    pub fn move_slot_count(&self) -> usize {
        self.move_slots().count()
    }

    /// The `index`-th move slot in ordinal order.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::OutOfRange`] if `index` is past the end.
    pub fn move_slot_at(&self, index: usize) -> BemResult<&MoveSlot> {
        self.move_slots()
            .nth(index)
            .ok_or_else(|| BemError::out_of_range("move slot", index, self.move_slot_count()))
    }

    /// Removes and returns the move slot of bus `name`.
    pub fn remove_move_slot(&mut self, name: &str) -> Option<MoveSlot> {
        let ordinal = self.position(FieldKey::MoveSlot(name))?;
        match self.fields.remove(ordinal) {
            InstructionField::MoveSlot(slot) => Some(slot),
            _ => None,
        }
    }

    /// Renames a move slot.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::NotFound`] if `name` has no slot and
    /// [`BemError::NameConflict`] if `new_name` already has one.
    pub fn rename_move_slot(&mut self, name: &str, new_name: &str) -> BemResult<()> {
        if name == new_name {
            return Ok(());
        }
        if self.move_slot(new_name).is_some() {
            return Err(Self::reject(format!("move slot '{new_name}'")));
        }
        let slot = self
            .move_slot_mut(name)
            .ok_or_else(|| BemError::not_found(format!("move slot '{name}'"), OWNER))?;
        slot.set_name(new_name);
        Ok(())
    }

    // Immediate slots.

    /// Creates a long immediate slot as the highest-ordinal field.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::NameConflict`] if the name is taken.
    pub fn add_immediate_slot(&mut self, name: &str, bit_width: u32) -> BemResult<&mut ImmediateSlotField> {
        if self.immediate_slot(name).is_some() {
            return Err(Self::reject(format!("immediate slot '{name}'")));
        }
        self.push_field(InstructionField::ImmediateSlot(ImmediateSlotField::new(name, bit_width)));
        self.immediate_slot_mut(name)
            .ok_or_else(|| BemError::not_found(format!("immediate slot '{name}'"), OWNER))
    }

    /// Immediate slot called `name`.
    #[must_use]
    pub fn immediate_slot(&self, name: &str) -> Option<&ImmediateSlotField> {
        self.immediate_slots().find(|slot| slot.name() == name)
    }

    /// Mutable immediate slot called `name`.
    pub fn immediate_slot_mut(&mut self, name: &str) -> Option<&mut ImmediateSlotField> {
        self.fields.iter_mut().find_map(|field| match field {
            InstructionField::ImmediateSlot(slot) if slot.name() == name => Some(slot),
            _ => None,
        })
    }

    /// Immediate slots in ordinal order.
    pub fn immediate_slots(&self) -> impl Iterator<Item = &ImmediateSlotField> {
        self.fields.iter().filter_map(|field| match field {
            InstructionField::ImmediateSlot(slot) => Some(slot),
            _ => None,
        })
    }

    /// Removes and returns the immediate slot called `name`.
    pub fn remove_immediate_slot(&mut self, name: &str) -> Option<ImmediateSlotField> {
        let ordinal = self.position(FieldKey::ImmediateSlot(name))?;
        match self.fields.remove(ordinal) {
            InstructionField::ImmediateSlot(slot) => Some(slot),
            _ => None,
        }
    }

    /// Renames an immediate slot.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::NotFound`] if `name` does not exist and
    /// [`BemError::NameConflict`] if `new_name` is taken.
    pub fn rename_immediate_slot(&mut self, name: &str, new_name: &str) -> BemResult<()> {
        if name == new_name {
            return Ok(());
        }
        if self.immediate_slot(new_name).is_some() {
            return Err(Self::reject(format!("immediate slot '{new_name}'")));
        }
        let slot = self
            .immediate_slot_mut(name)
            .ok_or_else(|| BemError::not_found(format!("immediate slot '{name}'"), OWNER))?;
        slot.set_name(new_name);
        Ok(())
    }

    // Immediate control field.

    /// Creates the immediate control field as the highest-ordinal field.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::NameConflict`] if the map already has one.
    pub fn add_immediate_control_field(&mut self) -> BemResult<&mut ImmediateControlField> {
        if self.immediate_control_field().is_some() {
            return Err(Self::reject(FieldKind::ImmediateControl.as_str().to_owned()));
        }
        self.push_field(InstructionField::ImmediateControl(ImmediateControlField::default()));
        self.immediate_control_field_mut()
            .ok_or_else(|| BemError::not_found(FieldKind::ImmediateControl.as_str(), OWNER))
    }

    /// The immediate control field, if any.
    #[must_use]
    pub fn immediate_control_field(&self) -> Option<&ImmediateControlField> {
        self.fields.iter().find_map(|field| match field {
            InstructionField::ImmediateControl(field) => Some(field),
            _ => None,
        })
    }

    /// Mutable immediate control field, if any.
    pub fn immediate_control_field_mut(&mut self) -> Option<&mut ImmediateControlField> {
        self.fields.iter_mut().find_map(|field| match field {
            InstructionField::ImmediateControl(field) => Some(field),
            _ => None,
        })
    }

    /// Removes and returns the immediate control field.
    pub fn remove_immediate_control_field(&mut self) -> Option<ImmediateControlField> {
        let ordinal = self.position(FieldKey::ImmediateControl)?;
        match self.fields.remove(ordinal) {
            InstructionField::ImmediateControl(field) => Some(field),
            _ => None,
        }
    }

    // Long immediate destination register fields.

    /// Creates a long immediate destination register field as the
    /// highest-ordinal field.
    ///
    /// These fields are unnamed, so creation never conflicts.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the other field constructors.
    pub fn add_long_imm_dst_register_field(&mut self, bit_width: u32) -> BemResult<&mut LImmDstRegisterField> {
        self.push_field(InstructionField::LImmDstRegister(LImmDstRegisterField::new(bit_width)));
        let index = self.long_imm_dst_register_field_count() - 1;
        self.long_imm_dst_register_field_mut(index).ok_or_else(|| {
            BemError::not_found(FieldKind::LImmDstRegister.as_str(), OWNER)
        })
    }

    /// Long immediate destination register fields in ordinal order.
    pub fn long_imm_dst_register_fields(&self) -> impl Iterator<Item = &LImmDstRegisterField> {
        self.fields.iter().filter_map(|field| match field {
            InstructionField::LImmDstRegister(field) => Some(field),
            _ => None,
        })
    }

    /// Number of long immediate destination register fields.
    #[must_use]
    pub fn long_imm_dst_register_field_count(&self) -> usize {
        self.long_imm_dst_register_fields().count()
    }

    /// The `index`-th long immediate destination register field.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::OutOfRange`] if `index` is past the end.
    pub fn long_imm_dst_register_field_at(&self, index: usize) -> BemResult<&LImmDstRegisterField> {
        self.long_imm_dst_register_fields().nth(index).ok_or_else(|| {
            BemError::out_of_range(
                "long immediate destination register field",
                index,
                self.long_imm_dst_register_field_count(),
            )
        })
    }

    /// Mutable `index`-th long immediate destination register field.
    pub fn long_imm_dst_register_field_mut(&mut self, index: usize) -> Option<&mut LImmDstRegisterField> {
        self.fields
            .iter_mut()
            .filter_map(|field| match field {
                InstructionField::LImmDstRegister(field) => Some(field),
                _ => None,
            })
            .nth(index)
    }

    /// Field through which `template` writes its long immediate to `unit`.
    #[must_use]
    pub fn long_imm_dst_register_field(&self, template: &str, unit: &str) -> Option<&LImmDstRegisterField> {
        self.long_imm_dst_register_fields()
            .find(|field| field.immediate_unit(template) == Some(unit))
    }

    /// Removes and returns the `index`-th long immediate destination register
    /// field.
    pub fn remove_long_imm_dst_register_field(&mut self, index: usize) -> Option<LImmDstRegisterField> {
        let ordinal = self.position(FieldKey::LImmDstRegister(index))?;
        match self.fields.remove(ordinal) {
            InstructionField::LImmDstRegister(field) => Some(field),
            _ => None,
        }
    }

    // Socket code tables.

    /// Creates an empty socket code table.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::NameConflict`] if the name is taken.
    pub fn add_socket_code_table(&mut self, name: &str) -> BemResult<TableId> {
        self.tables.insert(name)
    }

    /// All socket code tables.
    #[must_use]
    pub const fn socket_code_tables(&self) -> &SocketCodeTables {
        &self.tables
    }

    /// Table called `name`, if any.
    #[must_use]
    pub fn socket_code_table(&self, name: &str) -> Option<&SocketCodeTable> {
        self.tables.id_of(name).and_then(|id| self.tables.get(id))
    }

    /// Mutable table called `name`, if any.
    pub fn socket_code_table_mut(&mut self, name: &str) -> Option<&mut SocketCodeTable> {
        let id = self.tables.id_of(name)?;
        self.tables.get_mut(id)
    }

    /// Table behind a handle, if it is still alive.
    #[must_use]
    pub fn socket_code_table_by_id(&self, id: TableId) -> Option<&SocketCodeTable> {
        self.tables.get(id)
    }

    /// Mutable table behind a handle, if it is still alive.
    pub fn socket_code_table_by_id_mut(&mut self, id: TableId) -> Option<&mut SocketCodeTable> {
        self.tables.get_mut(id)
    }

    /// Table attached to `encoding`, if any and still alive.
    #[must_use]
    pub fn socket_codes_of(&self, encoding: &SocketEncoding) -> Option<&SocketCodeTable> {
        encoding.socket_codes().and_then(|id| self.tables.get(id))
    }

    /// Renames a table.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::NotFound`] if `name` does not exist and
    /// [`BemError::NameConflict`] if `new_name` is taken.
    pub fn rename_socket_code_table(&mut self, name: &str, new_name: &str) -> BemResult<()> {
        let id = self
            .tables
            .id_of(name)
            .ok_or_else(|| BemError::not_found(format!("socket code table '{name}'"), OWNER))?;
        self.tables.rename(id, new_name)
    }

    /// Removes a table and detaches every socket encoding that used it.
    pub fn remove_socket_code_table(&mut self, name: &str) -> Option<SocketCodeTable> {
        let id = self.tables.id_of(name)?;
        for field in &mut self.fields {
            if let InstructionField::MoveSlot(slot) = field {
                slot.detach_table(id);
            }
        }
        trace!(table = name, "table removed");
        self.tables.remove(id)
    }

    /// Slot field of `bus` on `side`, if present.
    #[must_use]
    pub fn slot_field(&self, bus: &str, side: SlotSide) -> Option<&SlotField> {
        let slot = self.move_slot(bus)?;
        match side {
            SlotSide::Source => slot.source_field().map(|field| &**field),
            SlotSide::Destination => slot.destination_field().map(|field| &**field),
        }
    }

    /// Attaches table `table` to the encoding of `socket` in the `side` field
    /// of bus `bus`.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::NotFound`] if the table, slot, field or socket
    /// encoding does not exist.
    pub fn set_socket_codes(&mut self, bus: &str, side: SlotSide, socket: &str, table: &str) -> BemResult<()> {
        let id = self
            .tables
            .id_of(table)
            .ok_or_else(|| BemError::not_found(format!("socket code table '{table}'"), OWNER))?;
        let slot = self
            .move_slot_mut(bus)
            .ok_or_else(|| BemError::not_found(format!("move slot '{bus}'"), OWNER))?;
        let field: Option<&mut SlotField> = match side {
            SlotSide::Source => slot.source_field_mut().map(|field| &mut **field),
            SlotSide::Destination => slot.destination_field_mut().map(|field| &mut **field),
        };
        let field = field.ok_or_else(|| {
            BemError::not_found(format!("{} field", side.as_str()), format!("move slot '{bus}'"))
        })?;
        let encoding = field.socket_encoding_mut(socket).ok_or_else(|| {
            BemError::not_found(
                format!("socket '{socket}'"),
                format!("{} field of bus '{bus}'", side.as_str()),
            )
        })?;
        encoding.set_socket_codes(id);
        trace!(bus, socket, table, "socket codes attached");
        Ok(())
    }
}
