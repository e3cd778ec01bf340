//! Source and destination fields of a move slot.
//!
//! A slot field holds a set of components (sockets, bridges, a short
//! immediate and a NOP code), each identified by a fixed ID pattern aligned
//! at the field's component-ID end. The remaining bits of a component carry
//! its socket code table, immediate value or nothing.

use std::ops::{Deref, DerefMut};

use tracing::{debug, trace};

use crate::bits::{Alignment, Encoding};
use crate::collision::{can_add_component_encoding, find_ambiguous};
use crate::error::{BemError, BemResult};
use crate::socket_code_table::{SocketCodeTables, TableId};

/// Which side of a move a slot field encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SlotSide {
    /// Source field: the value read by the move.
    Source,
    /// Destination field: the port written by the move.
    Destination,
}

impl SlotSide {
    /// Lower-case side name used in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Destination => "destination",
        }
    }
}

/// Encoding of one socket in a slot field.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SocketEncoding {
    socket_name: String,
    id: Encoding,
    socket_codes: Option<TableId>,
}

impl SocketEncoding {
    /// Creates a socket encoding with the given socket ID pattern.
    #[must_use]
    pub fn new(socket_name: impl Into<String>, encoding: u32, extra_bits: u32) -> Self {
        Self {
            socket_name: socket_name.into(),
            id: Encoding::new(encoding, extra_bits),
            socket_codes: None,
        }
    }

    /// Socket name.
    #[must_use]
    pub fn socket_name(&self) -> &str {
        &self.socket_name
    }

    /// Socket ID pattern.
    #[must_use]
    pub const fn id(&self) -> Encoding {
        self.id
    }

    /// Width of the socket ID: required bits of the value plus extra bits.
    #[must_use]
    pub const fn socket_id_width(&self) -> u32 {
        self.id.width()
    }

    /// Handle of the attached socket code table, if any.
    #[must_use]
    pub const fn socket_codes(&self) -> Option<TableId> {
        self.socket_codes
    }

    /// Returns `true` if a table is attached.
    #[must_use]
    pub const fn has_socket_codes(&self) -> bool {
        self.socket_codes.is_some()
    }

    /// Attaches a socket code table. The table stays owned by the map.
    pub(crate) const fn set_socket_codes(&mut self, table: TableId) {
        self.socket_codes = Some(table);
    }

    /// Detaches the socket code table, if any.
    pub const fn unset_socket_codes(&mut self) {
        self.socket_codes = None;
    }

    /// ID width plus the width of the attached table.
    #[must_use]
    pub fn width(&self, tables: &SocketCodeTables) -> u32 {
        self.socket_id_width()
            .saturating_add(tables.width_of(self.socket_codes))
    }
}

/// Encoding of a bridge as a move source.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BridgeEncoding {
    bridge_name: String,
    id: Encoding,
}

impl BridgeEncoding {
    /// Creates a bridge encoding.
    #[must_use]
    pub fn new(bridge_name: impl Into<String>, encoding: u32, extra_bits: u32) -> Self {
        Self {
            bridge_name: bridge_name.into(),
            id: Encoding::new(encoding, extra_bits),
        }
    }

    /// Bridge name.
    #[must_use]
    pub fn bridge_name(&self) -> &str {
        &self.bridge_name
    }

    /// Bridge ID pattern.
    #[must_use]
    pub const fn id(&self) -> Encoding {
        self.id
    }

    /// Component width; bridges carry no payload.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.id.width()
    }
}

/// Encoding of an inline short immediate in a source field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ImmediateEncoding {
    id: Encoding,
    immediate_width: u32,
}

impl ImmediateEncoding {
    /// Creates a short immediate encoding.
    #[must_use]
    pub const fn new(encoding: u32, extra_bits: u32, immediate_width: u32) -> Self {
        Self {
            id: Encoding::new(encoding, extra_bits),
            immediate_width,
        }
    }

    /// Immediate ID pattern.
    #[must_use]
    pub const fn id(&self) -> Encoding {
        self.id
    }

    /// Bits of the inline immediate value.
    #[must_use]
    pub const fn immediate_width(&self) -> u32 {
        self.immediate_width
    }

    /// ID width plus immediate width.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.id.width().saturating_add(self.immediate_width)
    }
}

/// Encoding of the no-operation move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct NopEncoding {
    id: Encoding,
}

impl NopEncoding {
    /// Creates a NOP encoding.
    #[must_use]
    pub const fn new(encoding: u32, extra_bits: u32) -> Self {
        Self {
            id: Encoding::new(encoding, extra_bits),
        }
    }

    /// NOP ID pattern.
    #[must_use]
    pub const fn id(&self) -> Encoding {
        self.id
    }

    /// Component width.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.id.width()
    }
}

/// State and checks shared by source and destination fields.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SlotField {
    side: SlotSide,
    bus_name: String,
    extra_bits: u32,
    id_position: Alignment,
    sockets: Vec<SocketEncoding>,
    bridges: Vec<BridgeEncoding>,
    immediate: Option<ImmediateEncoding>,
    nop: Option<NopEncoding>,
}

impl SlotField {
    fn new(side: SlotSide, bus_name: &str) -> Self {
        Self {
            side,
            bus_name: bus_name.to_owned(),
            extra_bits: 0,
            id_position: Alignment::default(),
            sockets: Vec::new(),
            bridges: Vec::new(),
            immediate: None,
            nop: None,
        }
    }

    /// Side of the move this field encodes.
    #[must_use]
    pub const fn side(&self) -> SlotSide {
        self.side
    }

    /// Name of the bus of the owning move slot.
    #[must_use]
    pub fn bus_name(&self) -> &str {
        &self.bus_name
    }

    pub(crate) fn set_bus_name(&mut self, name: &str) {
        name.clone_into(&mut self.bus_name);
    }

    fn owner(&self) -> String {
        format!("{} field of bus '{}'", self.side.as_str(), self.bus_name)
    }

    /// Literal zero bits above the widest component.
    #[must_use]
    pub const fn extra_bits(&self) -> u32 {
        self.extra_bits
    }

    /// Sets the padding bits.
    pub const fn set_extra_bits(&mut self, bits: u32) {
        self.extra_bits = bits;
    }

    /// End of the field where component IDs are aligned.
    #[must_use]
    pub const fn component_id_position(&self) -> Alignment {
        self.id_position
    }

    /// Moves component IDs to the other end of the field.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::EncodingCollision`] if the committed IDs are not
    /// prefix-free under `position`; the field is left unchanged.
    pub fn set_component_id_position(&mut self, position: Alignment) -> BemResult<()> {
        let ids: Vec<(String, Encoding)> = self.component_ids().collect();
        for (index, (item, id)) in ids.iter().enumerate() {
            let clash = find_ambiguous(*id, ids[index + 1..].iter().cloned(), position);
            if let Some(existing) = clash {
                let err = BemError::collision(item, existing, self.owner());
                debug!(%err, ?position, "component ID position rejected");
                return Err(err);
            }
        }
        self.id_position = position;
        Ok(())
    }

    /// Labelled IDs of every component in the field.
    pub(crate) fn component_ids(&self) -> impl Iterator<Item = (String, Encoding)> + '_ {
        let sockets = self
            .sockets
            .iter()
            .map(|enc| (format!("socket '{}'", enc.socket_name), enc.id));
        let bridges = self
            .bridges
            .iter()
            .map(|enc| (format!("bridge '{}'", enc.bridge_name), enc.id));
        let immediate = self
            .immediate
            .iter()
            .map(|enc| ("short immediate".to_owned(), enc.id));
        let nop = self.nop.iter().map(|enc| ("NOP".to_owned(), enc.id));
        sockets.chain(bridges).chain(immediate).chain(nop)
    }

    /// Number of components of all kinds.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.sockets.len()
            + self.bridges.len()
            + usize::from(self.immediate.is_some())
            + usize::from(self.nop.is_some())
    }

    fn check_id(&self, item: &str, id: Encoding) -> BemResult<()> {
        if can_add_component_encoding(self, id) {
            return Ok(());
        }
        let existing = find_ambiguous(id, self.component_ids(), self.id_position).unwrap_or_default();
        let err = BemError::collision(item, existing, self.owner());
        debug!(%err, "component rejected");
        Err(err)
    }

    fn reject_name(&self, item: &str) -> BemError {
        let err = BemError::name_conflict(item, self.owner());
        debug!(%err, "component rejected");
        err
    }

    /// Adds a socket encoding.
    ///
    /// The encoding arrives without a socket code table; attach one through
    /// [`BinaryEncoding::set_socket_codes`](crate::BinaryEncoding::set_socket_codes).
    ///
    /// # Errors
    ///
    /// Returns [`BemError::NameConflict`] if the socket already has an
    /// encoding here and [`BemError::EncodingCollision`] if its ID is
    /// ambiguous with another component ID.
    pub fn add_socket_encoding(&mut self, mut encoding: SocketEncoding) -> BemResult<&mut SocketEncoding> {
        encoding.unset_socket_codes();
        let item = format!("socket '{}'", encoding.socket_name);
        if self.has_socket_encoding(&encoding.socket_name) {
            return Err(self.reject_name(&item));
        }
        self.check_id(&item, encoding.id)?;
        trace!(field = %self.owner(), %item, "component added");
        self.sockets.push(encoding);
        let last = self.sockets.len() - 1;
        Ok(&mut self.sockets[last])
    }

    /// Removes and returns the encoding of `socket`.
    pub fn remove_socket_encoding(&mut self, socket: &str) -> Option<SocketEncoding> {
        let index = self.sockets.iter().position(|enc| enc.socket_name == socket)?;
        Some(self.sockets.remove(index))
    }

    /// Encoding of `socket`, if present.
    #[must_use]
    pub fn socket_encoding(&self, socket: &str) -> Option<&SocketEncoding> {
        self.sockets.iter().find(|enc| enc.socket_name == socket)
    }

    /// Mutable encoding of `socket`, if present.
    pub fn socket_encoding_mut(&mut self, socket: &str) -> Option<&mut SocketEncoding> {
        self.sockets.iter_mut().find(|enc| enc.socket_name == socket)
    }

    /// Returns `true` if `socket` has an encoding in this field.
    #[must_use]
    pub fn has_socket_encoding(&self, socket: &str) -> bool {
        self.socket_encoding(socket).is_some()
    }

    /// Socket encodings in insertion order.
    #[must_use]
    pub fn socket_encodings(&self) -> &[SocketEncoding] {
        &self.sockets
    }

    /// Socket encoding by index.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::OutOfRange`] if `index` is past the end.
    pub fn socket_encoding_at(&self, index: usize) -> BemResult<&SocketEncoding> {
        self.sockets
            .get(index)
            .ok_or_else(|| BemError::out_of_range("socket encoding", index, self.sockets.len()))
    }

    pub(crate) fn detach_table(&mut self, table: TableId) {
        for enc in &mut self.sockets {
            if enc.socket_codes == Some(table) {
                enc.unset_socket_codes();
            }
        }
    }

    /// Sets the NOP encoding.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::NameConflict`] if the field already has one and
    /// [`BemError::EncodingCollision`] for an ambiguous ID.
    pub fn set_nop_encoding(&mut self, encoding: NopEncoding) -> BemResult<&NopEncoding> {
        if self.nop.is_some() {
            return Err(self.reject_name("NOP"));
        }
        self.check_id("NOP", encoding.id)?;
        trace!(field = %self.owner(), "NOP encoding added");
        Ok(self.nop.insert(encoding))
    }

    /// Removes and returns the NOP encoding.
    pub fn unset_nop_encoding(&mut self) -> Option<NopEncoding> {
        self.nop.take()
    }

    /// The NOP encoding, if any.
    #[must_use]
    pub const fn nop_encoding(&self) -> Option<&NopEncoding> {
        self.nop.as_ref()
    }

    /// Bridge encodings in insertion order; empty for destination fields.
    #[must_use]
    pub fn bridge_encodings(&self) -> &[BridgeEncoding] {
        &self.bridges
    }

    /// Encoding of `bridge`, if present.
    #[must_use]
    pub fn bridge_encoding(&self, bridge: &str) -> Option<&BridgeEncoding> {
        self.bridges.iter().find(|enc| enc.bridge_name == bridge)
    }

    /// The short immediate encoding, if any; always `None` for destinations.
    #[must_use]
    pub const fn immediate_encoding(&self) -> Option<&ImmediateEncoding> {
        self.immediate.as_ref()
    }

    /// Widest component plus extra bits.
    #[must_use]
    pub fn width(&self, tables: &SocketCodeTables) -> u32 {
        let sockets = self.sockets.iter().map(|enc| enc.width(tables));
        let bridges = self.bridges.iter().map(BridgeEncoding::width);
        let immediate = self.immediate.iter().map(ImmediateEncoding::width);
        let nop = self.nop.iter().map(NopEncoding::width);
        let widest = sockets.chain(bridges).chain(immediate).chain(nop).max().unwrap_or(0);
        widest.saturating_add(self.extra_bits)
    }

    /// Offset of a component ID of `id_width` bits inside the field.
    ///
    /// Right-aligned IDs start at bit 0. Left-aligned IDs end just below the
    /// extra bits.
    #[must_use]
    pub fn component_id_offset(&self, id_width: u32, tables: &SocketCodeTables) -> u32 {
        match self.id_position {
            Alignment::Right => 0,
            Alignment::Left => {
                self.width(tables)
                    .saturating_sub(self.extra_bits)
                    .saturating_sub(id_width)
            }
        }
    }

    /// Bit offset of the ID of `socket` inside the field.
    #[must_use]
    pub fn socket_id_position(&self, socket: &str, tables: &SocketCodeTables) -> Option<u32> {
        let enc = self.socket_encoding(socket)?;
        Some(self.component_id_offset(enc.socket_id_width(), tables))
    }
}

/// Source field of a move slot.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SourceField(SlotField);

impl SourceField {
    pub(crate) fn new(bus_name: &str) -> Self {
        Self(SlotField::new(SlotSide::Source, bus_name))
    }

    /// Adds a bridge encoding.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::NameConflict`] for a duplicate bridge and
    /// [`BemError::EncodingCollision`] for an ambiguous ID.
    pub fn add_bridge_encoding(&mut self, encoding: BridgeEncoding) -> BemResult<&BridgeEncoding> {
        let item = format!("bridge '{}'", encoding.bridge_name);
        if self.0.bridge_encoding(&encoding.bridge_name).is_some() {
            return Err(self.0.reject_name(&item));
        }
        self.0.check_id(&item, encoding.id)?;
        trace!(field = %self.0.owner(), %item, "component added");
        self.0.bridges.push(encoding);
        Ok(&self.0.bridges[self.0.bridges.len() - 1])
    }

    /// Removes and returns the encoding of `bridge`.
    pub fn remove_bridge_encoding(&mut self, bridge: &str) -> Option<BridgeEncoding> {
        let index = self.0.bridges.iter().position(|enc| enc.bridge_name == bridge)?;
        Some(self.0.bridges.remove(index))
    }

    /// Sets the short immediate encoding.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::NameConflict`] if the field already has one and
    /// [`BemError::EncodingCollision`] for an ambiguous ID.
    pub fn set_immediate_encoding(&mut self, encoding: ImmediateEncoding) -> BemResult<&ImmediateEncoding> {
        if self.0.immediate.is_some() {
            return Err(self.0.reject_name("short immediate"));
        }
        self.0.check_id("short immediate", encoding.id)?;
        trace!(field = %self.0.owner(), "short immediate encoding added");
        Ok(self.0.immediate.insert(encoding))
    }

    /// Removes and returns the short immediate encoding.
    pub fn unset_immediate_encoding(&mut self) -> Option<ImmediateEncoding> {
        self.0.immediate.take()
    }
}

impl Deref for SourceField {
    type Target = SlotField;

    fn deref(&self) -> &SlotField {
        &self.0
    }
}

impl DerefMut for SourceField {
    fn deref_mut(&mut self) -> &mut SlotField {
        &mut self.0
    }
}

/// Destination field of a move slot.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DestinationField(SlotField);

impl DestinationField {
    pub(crate) fn new(bus_name: &str) -> Self {
        Self(SlotField::new(SlotSide::Destination, bus_name))
    }
}

impl Deref for DestinationField {
    type Target = SlotField;

    fn deref(&self) -> &SlotField {
        &self.0
    }
}

impl DerefMut for DestinationField {
    fn deref_mut(&mut self) -> &mut SlotField {
        &mut self.0
    }
}
