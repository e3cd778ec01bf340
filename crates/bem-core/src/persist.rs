//! Conversion between [`BinaryEncoding`] and the structural [`ObjectState`] tree.
//!
//! Saving writes every socket code table first and then the top-level fields
//! in ordinal order, each tagged with its `position`. Loading restores the
//! tables in a first pass so socket encodings can resolve their `sc_table`
//! references, then recreates the fields and moves each one to its persisted
//! position in ascending position order.

use tracing::debug;

use crate::bits::{Alignment, Encoding, MAX_WIDTH};
use crate::encoding_map::{BinaryEncoding, InstructionField};
use crate::error::{BemError, BemResult, ErrorClass};
use crate::fields::{ImmediateControlField, ImmediateSlotField, LImmDstRegisterField};
use crate::guard_field::{FuGuardEncoding, GprGuardEncoding, GuardField, UnconditionalGuardEncoding};
use crate::move_slot::{MoveSlot, MoveSlotField};
use crate::object_state::ObjectState;
use crate::order::restore_order;
use crate::port_code::{FuPortCode, IuPortCode, PortCode, RfPortCode};
use crate::slot_field::{
    BridgeEncoding, DestinationField, ImmediateEncoding, NopEncoding, SlotField, SocketEncoding,
    SourceField,
};
use crate::socket_code_table::{SocketCodeTable, TableId};

/// Name of the root node.
pub const TAG_BEM: &str = "bem";
const TAG_SC_TABLE: &str = "sc_table";
const TAG_FU_PORT_CODE: &str = "fu_port_code";
const TAG_RF_PORT_CODE: &str = "rf_port_code";
const TAG_IU_PORT_CODE: &str = "iu_port_code";
const TAG_MOVE_SLOT: &str = "move_slot";
const TAG_GUARD_FIELD: &str = "guard_field";
const TAG_GPR_GUARD: &str = "gpr_guard_encoding";
const TAG_FU_GUARD: &str = "fu_guard_encoding";
const TAG_UNCONDITIONAL_GUARD: &str = "unconditional_guard_encoding";
const TAG_SOURCE_FIELD: &str = "source_field";
const TAG_DESTINATION_FIELD: &str = "destination_field";
const TAG_SOCKET_ENCODING: &str = "socket_encoding";
const TAG_BRIDGE_ENCODING: &str = "bridge_encoding";
const TAG_IMMEDIATE_ENCODING: &str = "immediate_encoding";
const TAG_NOP_ENCODING: &str = "nop_encoding";
const TAG_IMMEDIATE_SLOT: &str = "immediate_slot";
const TAG_IMM_CONTROL_FIELD: &str = "imm_control_field";
const TAG_TEMPLATE_MAP: &str = "template_map";
const TAG_LIMM_DST_REGISTER_FIELD: &str = "limm_dst_register_field";
const TAG_IU_DESTINATION: &str = "iu_destination";

const ATTR_NAME: &str = "name";
const ATTR_EXTRA_BITS: &str = "extra_bits";
const ATTR_POSITION: &str = "position";
const ATTR_ENCODING: &str = "encoding";
const ATTR_WIDTH: &str = "width";
const ATTR_UNIT_NAME: &str = "unit_name";
const ATTR_PORT: &str = "port";
const ATTR_OPERATION: &str = "operation";
const ATTR_INDEX_WIDTH: &str = "index_width";
const ATTR_BUS_NAME: &str = "bus_name";
const ATTR_RF_NAME: &str = "rf_name";
const ATTR_REGISTER_INDEX: &str = "register_index";
const ATTR_FU_NAME: &str = "fu_name";
const ATTR_PORT_NAME: &str = "port_name";
const ATTR_INVERTED: &str = "inverted";
const ATTR_COMPONENT_ID_POSITION: &str = "component_id_position";
const ATTR_SOCKET_NAME: &str = "socket_name";
const ATTR_SC_TABLE: &str = "sc_table";
const ATTR_BRIDGE_NAME: &str = "bridge_name";
const ATTR_IMMEDIATE_WIDTH: &str = "immediate_width";
const ATTR_TEMPLATE_NAME: &str = "template_name";
const ATTR_DST_IU: &str = "dst_iu";

impl BinaryEncoding {
    /// Writes the map into a structural tree rooted at a `bem` node.
    #[must_use]
    pub fn save_state(&self) -> ObjectState {
        let mut root = ObjectState::new(TAG_BEM).with_attribute(ATTR_EXTRA_BITS, self.extra_bits());
        for (_, table) in self.socket_code_tables().iter() {
            root.add_child(save_table(table));
        }
        for (position, field) in self.child_fields().iter().enumerate() {
            let node = match field {
                InstructionField::MoveSlot(slot) => self.save_move_slot(slot, position),
                InstructionField::ImmediateSlot(slot) => save_immediate_slot(slot, position),
                InstructionField::ImmediateControl(field) => save_control_field(field, position),
                InstructionField::LImmDstRegister(field) => save_dst_register_field(field, position),
            };
            root.add_child(node);
        }
        root
    }

    /// Restores a map from a structural tree.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::LoadFormat`] if the root is not a `bem` node, a
    /// required node or attribute is missing or malformed, a socket encoding
    /// names an unknown table, a bit count or the total width exceeds
    /// [`MAX_WIDTH`], or the contents break a naming or encoding invariant.
    pub fn load_state(state: &ObjectState) -> BemResult<Self> {
        if state.name() != TAG_BEM {
            return Err(BemError::load(
                state.name(),
                format!("expected root node '{TAG_BEM}'"),
            ));
        }
        let mut bem = Self::new();
        bem.set_extra_bits(bits_of(state, ATTR_EXTRA_BITS)?);

        for node in state.children_named(TAG_SC_TABLE) {
            load_table(&mut bem, node)?;
        }
        let tables: Vec<(String, TableId)> = bem
            .socket_code_tables()
            .iter()
            .map(|(id, table)| (table.name().to_owned(), id))
            .collect();

        let mut positions = Vec::new();
        for node in state.children() {
            match node.name() {
                TAG_SC_TABLE => continue,
                TAG_MOVE_SLOT => load_move_slot(&mut bem, node, &tables)?,
                TAG_IMMEDIATE_SLOT => load_immediate_slot(&mut bem, node)?,
                TAG_IMM_CONTROL_FIELD => load_control_field(&mut bem, node)?,
                TAG_LIMM_DST_REGISTER_FIELD => load_dst_register_field(&mut bem, node)?,
                other => return Err(unexpected(other, TAG_BEM)),
            }
            positions.push(position_of(node)?);
        }
        bem.reorder_fields(&restore_order(&positions));
        let width = bem.width();
        if width > MAX_WIDTH {
            return Err(BemError::load(
                TAG_BEM,
                format!("instruction width {width} exceeds {MAX_WIDTH} bits"),
            ));
        }

        debug!(
            fields = bem.child_field_count(),
            tables = bem.socket_code_tables().len(),
            width = bem.width(),
            "encoding map loaded"
        );
        Ok(bem)
    }

    fn save_move_slot(&self, slot: &MoveSlot, position: usize) -> ObjectState {
        let mut node = ObjectState::new(TAG_MOVE_SLOT)
            .with_attribute(ATTR_BUS_NAME, slot.name())
            .with_attribute(ATTR_POSITION, position)
            .with_attribute(ATTR_EXTRA_BITS, slot.extra_bits());
        for (position, child) in slot.child_fields().iter().enumerate() {
            let child = match child {
                MoveSlotField::Guard(field) => save_guard_field(field, position),
                MoveSlotField::Source(field) => self.save_source_field(field, position),
                MoveSlotField::Destination(field) => {
                    self.save_slot_field(TAG_DESTINATION_FIELD, field, position)
                }
            };
            node.add_child(child);
        }
        node
    }

    fn save_source_field(&self, field: &SourceField, position: usize) -> ObjectState {
        let mut node = self.save_slot_field(TAG_SOURCE_FIELD, field, position);
        for bridge in field.bridge_encodings() {
            node.add_child(
                with_id(ObjectState::new(TAG_BRIDGE_ENCODING), bridge.id())
                    .with_attribute(ATTR_BRIDGE_NAME, bridge.bridge_name()),
            );
        }
        if let Some(immediate) = field.immediate_encoding() {
            node.add_child(
                with_id(ObjectState::new(TAG_IMMEDIATE_ENCODING), immediate.id())
                    .with_attribute(ATTR_IMMEDIATE_WIDTH, immediate.immediate_width()),
            );
        }
        node
    }

    fn save_slot_field(&self, tag: &str, field: &SlotField, position: usize) -> ObjectState {
        let mut node = ObjectState::new(tag)
            .with_attribute(ATTR_POSITION, position)
            .with_attribute(ATTR_EXTRA_BITS, field.extra_bits())
            .with_attribute(ATTR_COMPONENT_ID_POSITION, field.component_id_position().as_str());
        for socket in field.socket_encodings() {
            let mut child = with_id(
                ObjectState::new(TAG_SOCKET_ENCODING).with_attribute(ATTR_SOCKET_NAME, socket.socket_name()),
                socket.id(),
            );
            if let Some(table) = self.socket_codes_of(socket) {
                child.set_attribute(ATTR_SC_TABLE, table.name());
            }
            node.add_child(child);
        }
        if let Some(nop) = field.nop_encoding() {
            node.add_child(with_id(ObjectState::new(TAG_NOP_ENCODING), nop.id()));
        }
        node
    }
}

fn with_id(node: ObjectState, id: Encoding) -> ObjectState {
    node.with_attribute(ATTR_ENCODING, id.value())
        .with_attribute(ATTR_EXTRA_BITS, id.extra_bits())
}

fn save_port_code(tag: &str, code: &PortCode) -> ObjectState {
    let mut node = ObjectState::new(tag).with_attribute(ATTR_UNIT_NAME, code.unit_name());
    if let Some(encoding) = code.encoding() {
        node = with_id(node, encoding);
    }
    node.with_attribute(ATTR_INDEX_WIDTH, code.index_width())
}

fn save_table(table: &SocketCodeTable) -> ObjectState {
    let mut node = ObjectState::new(TAG_SC_TABLE)
        .with_attribute(ATTR_NAME, table.name())
        .with_attribute(ATTR_EXTRA_BITS, table.extra_bits());
    for code in table.fu_port_codes() {
        let mut child = save_port_code(TAG_FU_PORT_CODE, code.code())
            .with_attribute(ATTR_PORT, code.port_name());
        if let Some(operation) = code.operation_name() {
            child.set_attribute(ATTR_OPERATION, operation);
        }
        node.add_child(child);
    }
    for code in table.rf_port_codes() {
        node.add_child(save_port_code(TAG_RF_PORT_CODE, code.code()));
    }
    for code in table.iu_port_codes() {
        node.add_child(save_port_code(TAG_IU_PORT_CODE, code.code()));
    }
    node
}

fn save_guard_field(field: &GuardField, position: usize) -> ObjectState {
    let mut node = ObjectState::new(TAG_GUARD_FIELD)
        .with_attribute(ATTR_POSITION, position)
        .with_attribute(ATTR_EXTRA_BITS, field.extra_bits());
    for guard in field.gpr_guard_encodings() {
        node.add_child(
            ObjectState::new(TAG_GPR_GUARD)
                .with_attribute(ATTR_RF_NAME, guard.register_file())
                .with_attribute(ATTR_REGISTER_INDEX, guard.register_index())
                .with_attribute(ATTR_INVERTED, guard.is_inverted())
                .with_attribute(ATTR_ENCODING, guard.encoding()),
        );
    }
    for guard in field.fu_guard_encodings() {
        node.add_child(
            ObjectState::new(TAG_FU_GUARD)
                .with_attribute(ATTR_FU_NAME, guard.unit_name())
                .with_attribute(ATTR_PORT_NAME, guard.port_name())
                .with_attribute(ATTR_INVERTED, guard.is_inverted())
                .with_attribute(ATTR_ENCODING, guard.encoding()),
        );
    }
    for inverted in [false, true] {
        if let Some(guard) = field.unconditional_guard_encoding(inverted) {
            node.add_child(
                ObjectState::new(TAG_UNCONDITIONAL_GUARD)
                    .with_attribute(ATTR_INVERTED, guard.is_inverted())
                    .with_attribute(ATTR_ENCODING, guard.encoding()),
            );
        }
    }
    node
}

fn save_immediate_slot(slot: &ImmediateSlotField, position: usize) -> ObjectState {
    ObjectState::new(TAG_IMMEDIATE_SLOT)
        .with_attribute(ATTR_NAME, slot.name())
        .with_attribute(ATTR_POSITION, position)
        .with_attribute(ATTR_EXTRA_BITS, slot.extra_bits())
        .with_attribute(ATTR_WIDTH, slot.bit_width())
}

fn save_control_field(field: &ImmediateControlField, position: usize) -> ObjectState {
    let mut node = ObjectState::new(TAG_IMM_CONTROL_FIELD)
        .with_attribute(ATTR_POSITION, position)
        .with_attribute(ATTR_EXTRA_BITS, field.extra_bits());
    for (template, encoding) in field.template_encodings() {
        node.add_child(
            ObjectState::new(TAG_TEMPLATE_MAP)
                .with_attribute(ATTR_TEMPLATE_NAME, template)
                .with_attribute(ATTR_ENCODING, encoding),
        );
    }
    node
}

fn save_dst_register_field(field: &LImmDstRegisterField, position: usize) -> ObjectState {
    let mut node = ObjectState::new(TAG_LIMM_DST_REGISTER_FIELD)
        .with_attribute(ATTR_POSITION, position)
        .with_attribute(ATTR_EXTRA_BITS, field.extra_bits())
        .with_attribute(ATTR_WIDTH, field.bit_width());
    for (template, unit) in field.immediate_destinations() {
        node.add_child(
            ObjectState::new(TAG_IU_DESTINATION)
                .with_attribute(ATTR_TEMPLATE_NAME, template)
                .with_attribute(ATTR_DST_IU, unit),
        );
    }
    node
}

/// Converts a rejection raised while rebuilding `node` into a load error.
fn reject(node: &ObjectState) -> impl Fn(BemError) -> BemError + '_ {
    move |err| {
        if err.class() == ErrorClass::Load {
            err
        } else {
            BemError::load(node.name(), err.to_string())
        }
    }
}

fn unexpected(child: &str, parent: &str) -> BemError {
    BemError::load(child, format!("unexpected node under '{parent}'"))
}

fn position_of(node: &ObjectState) -> BemResult<usize> {
    let position = node.u32_attribute(ATTR_POSITION)?;
    Ok(usize::try_from(position).unwrap_or(usize::MAX))
}

/// Reads a bit count, rejecting values above [`MAX_WIDTH`].
fn bits_of(node: &ObjectState, name: &str) -> BemResult<u32> {
    let bits = node.u32_attribute(name)?;
    if bits > MAX_WIDTH {
        return Err(BemError::load(
            node.name(),
            format!("attribute '{name}' value {bits} exceeds {MAX_WIDTH} bits"),
        ));
    }
    Ok(bits)
}

fn id_of(node: &ObjectState) -> BemResult<(u32, u32)> {
    Ok((
        node.u32_attribute(ATTR_ENCODING)?,
        bits_of(node, ATTR_EXTRA_BITS)?,
    ))
}

fn load_table(bem: &mut BinaryEncoding, node: &ObjectState) -> BemResult<()> {
    let id = bem
        .add_socket_code_table(node.string_attribute(ATTR_NAME)?)
        .map_err(reject(node))?;
    let extra_bits = bits_of(node, ATTR_EXTRA_BITS)?;
    let Some(table) = bem.socket_code_table_by_id_mut(id) else {
        return Err(BemError::load(node.name(), "table vanished while loading"));
    };
    table.set_extra_bits(extra_bits);

    for child in node.children() {
        let unit = child.string_attribute(ATTR_UNIT_NAME)?;
        let encoding = if child.has_attribute(ATTR_ENCODING) {
            Some(id_of(child)?)
        } else {
            None
        };
        let index_width = bits_of(child, ATTR_INDEX_WIDTH)?;
        let added = match child.name() {
            TAG_FU_PORT_CODE => {
                let port = child.string_attribute(ATTR_PORT)?;
                let operation = child.optional_string_attribute(ATTR_OPERATION)?;
                let code = match (encoding, operation) {
                    (Some((value, extra)), Some(operation)) => {
                        FuPortCode::with_operation(unit, port, operation, value, extra)
                    }
                    (Some((value, extra)), None) => FuPortCode::new(unit, port, value, extra),
                    (None, _) => {
                        return Err(BemError::load(
                            child.name(),
                            "function unit port code requires an encoding",
                        ))
                    }
                };
                table.add_fu_port_code(code).map(|_| ())
            }
            TAG_RF_PORT_CODE => {
                let code = encoding.map_or_else(
                    || RfPortCode::index_only(unit, index_width),
                    |(value, extra)| RfPortCode::new(unit, value, extra, index_width),
                );
                table.add_rf_port_code(code).map(|_| ())
            }
            TAG_IU_PORT_CODE => {
                let code = encoding.map_or_else(
                    || IuPortCode::index_only(unit, index_width),
                    |(value, extra)| IuPortCode::new(unit, value, extra, index_width),
                );
                table.add_iu_port_code(code).map(|_| ())
            }
            other => return Err(unexpected(other, TAG_SC_TABLE)),
        };
        added.map_err(reject(child))?;
    }
    Ok(())
}

fn load_move_slot(bem: &mut BinaryEncoding, node: &ObjectState, tables: &[(String, TableId)]) -> BemResult<()> {
    let slot = bem
        .add_move_slot(node.string_attribute(ATTR_BUS_NAME)?)
        .map_err(reject(node))?;
    slot.set_extra_bits(bits_of(node, ATTR_EXTRA_BITS)?);

    let mut positions = Vec::new();
    for child in node.children() {
        match child.name() {
            TAG_GUARD_FIELD => {
                let field = slot.add_guard_field().map_err(reject(child))?;
                load_guard_field(field, child)?;
            }
            TAG_SOURCE_FIELD => {
                let field = slot.add_source_field().map_err(reject(child))?;
                load_source_field(field, child, tables)?;
            }
            TAG_DESTINATION_FIELD => {
                let field = slot.add_destination_field().map_err(reject(child))?;
                load_destination_field(field, child, tables)?;
            }
            other => return Err(unexpected(other, TAG_MOVE_SLOT)),
        }
        positions.push(position_of(child)?);
    }
    slot.reorder_children(&restore_order(&positions));
    Ok(())
}

fn load_guard_field(field: &mut GuardField, node: &ObjectState) -> BemResult<()> {
    field.set_extra_bits(bits_of(node, ATTR_EXTRA_BITS)?);
    for child in node.children() {
        let inverted = child.bool_attribute(ATTR_INVERTED)?;
        let encoding = child.u32_attribute(ATTR_ENCODING)?;
        let added = match child.name() {
            TAG_GPR_GUARD => field
                .add_gpr_guard_encoding(GprGuardEncoding::new(
                    child.string_attribute(ATTR_RF_NAME)?,
                    child.u32_attribute(ATTR_REGISTER_INDEX)?,
                    inverted,
                    encoding,
                ))
                .map(|_| ()),
            TAG_FU_GUARD => field
                .add_fu_guard_encoding(FuGuardEncoding::new(
                    child.string_attribute(ATTR_FU_NAME)?,
                    child.string_attribute(ATTR_PORT_NAME)?,
                    inverted,
                    encoding,
                ))
                .map(|_| ()),
            TAG_UNCONDITIONAL_GUARD => field
                .add_unconditional_guard_encoding(UnconditionalGuardEncoding::new(inverted, encoding))
                .map(|_| ()),
            other => return Err(unexpected(other, TAG_GUARD_FIELD)),
        };
        added.map_err(reject(child))?;
    }
    Ok(())
}

fn load_slot_field_header(field: &mut SlotField, node: &ObjectState) -> BemResult<()> {
    field.set_extra_bits(bits_of(node, ATTR_EXTRA_BITS)?);
    let position = node.string_attribute(ATTR_COMPONENT_ID_POSITION)?;
    let position = Alignment::parse(position).ok_or_else(|| {
        BemError::load(
            node.name(),
            format!("unknown component ID position '{position}'"),
        )
    })?;
    field.set_component_id_position(position).map_err(reject(node))
}

fn load_common_component(
    field: &mut SlotField,
    node: &ObjectState,
    parent: &str,
    tables: &[(String, TableId)],
) -> BemResult<()> {
    let (value, extra) = id_of(node)?;
    match node.name() {
        TAG_SOCKET_ENCODING => {
            let table = match node.optional_string_attribute(ATTR_SC_TABLE)? {
                Some(name) => Some(
                    tables
                        .iter()
                        .find(|(table, _)| table == name)
                        .map(|(_, id)| *id)
                        .ok_or_else(|| {
                            BemError::load(node.name(), format!("unknown socket code table '{name}'"))
                        })?,
                ),
                None => None,
            };
            let socket = field
                .add_socket_encoding(SocketEncoding::new(
                    node.string_attribute(ATTR_SOCKET_NAME)?,
                    value,
                    extra,
                ))
                .map_err(reject(node))?;
            if let Some(id) = table {
                socket.set_socket_codes(id);
            }
            Ok(())
        }
        TAG_NOP_ENCODING => field
            .set_nop_encoding(NopEncoding::new(value, extra))
            .map(|_| ())
            .map_err(reject(node)),
        other => Err(unexpected(other, parent)),
    }
}

fn load_source_field(field: &mut SourceField, node: &ObjectState, tables: &[(String, TableId)]) -> BemResult<()> {
    load_slot_field_header(field, node)?;
    for child in node.children() {
        match child.name() {
            TAG_BRIDGE_ENCODING => {
                let (value, extra) = id_of(child)?;
                let bridge = BridgeEncoding::new(child.string_attribute(ATTR_BRIDGE_NAME)?, value, extra);
                field.add_bridge_encoding(bridge).map_err(reject(child))?;
            }
            TAG_IMMEDIATE_ENCODING => {
                let (value, extra) = id_of(child)?;
                let width = bits_of(child, ATTR_IMMEDIATE_WIDTH)?;
                field
                    .set_immediate_encoding(ImmediateEncoding::new(value, extra, width))
                    .map_err(reject(child))?;
            }
            _ => load_common_component(field, child, TAG_SOURCE_FIELD, tables)?,
        }
    }
    Ok(())
}

fn load_destination_field(
    field: &mut DestinationField,
    node: &ObjectState,
    tables: &[(String, TableId)],
) -> BemResult<()> {
    load_slot_field_header(field, node)?;
    for child in node.children() {
        load_common_component(field, child, TAG_DESTINATION_FIELD, tables)?;
    }
    Ok(())
}

fn load_immediate_slot(bem: &mut BinaryEncoding, node: &ObjectState) -> BemResult<()> {
    let slot = bem
        .add_immediate_slot(
            node.string_attribute(ATTR_NAME)?,
            bits_of(node, ATTR_WIDTH)?,
        )
        .map_err(reject(node))?;
    slot.set_extra_bits(bits_of(node, ATTR_EXTRA_BITS)?);
    Ok(())
}

fn load_control_field(bem: &mut BinaryEncoding, node: &ObjectState) -> BemResult<()> {
    let field = bem.add_immediate_control_field().map_err(reject(node))?;
    field.set_extra_bits(bits_of(node, ATTR_EXTRA_BITS)?);
    for child in node.children() {
        if child.name() != TAG_TEMPLATE_MAP {
            return Err(unexpected(child.name(), TAG_IMM_CONTROL_FIELD));
        }
        field
            .add_template_encoding(
                child.string_attribute(ATTR_TEMPLATE_NAME)?,
                child.u32_attribute(ATTR_ENCODING)?,
            )
            .map_err(reject(child))?;
    }
    Ok(())
}

fn load_dst_register_field(bem: &mut BinaryEncoding, node: &ObjectState) -> BemResult<()> {
    let field = bem
        .add_long_imm_dst_register_field(bits_of(node, ATTR_WIDTH)?)
        .map_err(reject(node))?;
    field.set_extra_bits(bits_of(node, ATTR_EXTRA_BITS)?);
    for child in node.children() {
        if child.name() != TAG_IU_DESTINATION {
            return Err(unexpected(child.name(), TAG_LIMM_DST_REGISTER_FIELD));
        }
        field
            .add_immediate_destination(
                child.string_attribute(ATTR_TEMPLATE_NAME)?,
                child.string_attribute(ATTR_DST_IU)?,
            )
            .map_err(reject(child))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::encoding_map::{BinaryEncoding, FieldKey};
    use crate::error::{BemError, ErrorClass};
    use crate::move_slot::SubFieldKind;
    use crate::object_state::ObjectState;
    use crate::port_code::{FuPortCode, RfPortCode};
    use crate::slot_field::{SlotSide, SocketEncoding};

    fn sample() -> BinaryEncoding {
        let mut bem = BinaryEncoding::new();
        let id = bem.add_socket_code_table("rf_codes").expect("new table");
        let table = bem.socket_code_table_by_id_mut(id).expect("live table");
        table.set_extra_bits(1);
        table
            .add_rf_port_code(RfPortCode::new("RF", 0, 0, 4))
            .expect("rf code");
        table
            .add_fu_port_code(FuPortCode::with_operation("ALU", "in1t", "add", 1, 0))
            .expect("fu code");

        let slot = bem.add_move_slot("B1").expect("new slot");
        slot.add_destination_field()
            .expect("first destination field")
            .add_socket_encoding(SocketEncoding::new("S1", 0, 0))
            .expect("socket");
        slot.add_guard_field().expect("first guard field");
        bem.set_socket_codes("B1", SlotSide::Destination, "S1", "rf_codes")
            .expect("everything exists");
        bem.add_immediate_slot("imm", 8).expect("new slot");
        bem.add_move_slot("B2").expect("new slot");
        bem.set_position(FieldKey::MoveSlot("B2"), 0).expect("slot exists");
        bem
    }

    #[test]
    fn save_then_load_preserves_order_and_width() {
        let bem = sample();
        let state = bem.save_state();
        let loaded = BinaryEncoding::load_state(&state).expect("saved state loads");
        assert_eq!(loaded, bem);
        assert_eq!(loaded.width(), bem.width());
        assert_eq!(loaded.position(FieldKey::MoveSlot("B2")), Some(0));
        assert_eq!(
            loaded
                .move_slot("B1")
                .and_then(|slot| slot.position(SubFieldKind::Guard)),
            Some(1)
        );
    }

    #[test]
    fn tables_are_written_before_fields() {
        let state = sample().save_state();
        assert_eq!(state.child(0).map(ObjectState::name), Some("sc_table"));
        let names: Vec<&str> = state.children().iter().map(ObjectState::name).collect();
        assert_eq!(names, ["sc_table", "move_slot", "move_slot", "immediate_slot"]);
    }

    #[test]
    fn wrong_root_is_a_load_error() {
        let err = BinaryEncoding::load_state(&ObjectState::new("adf")).expect_err("not a bem");
        assert!(matches!(err, BemError::LoadFormat { .. }));
    }

    #[test]
    fn unknown_table_reference_is_a_load_error() {
        let mut state = sample().save_state();
        let mut slot = ObjectState::new("move_slot")
            .with_attribute("bus_name", "B3")
            .with_attribute("position", 9_u32)
            .with_attribute("extra_bits", 0_u32);
        slot.add_child(
            ObjectState::new("source_field")
                .with_attribute("position", 0_u32)
                .with_attribute("extra_bits", 0_u32)
                .with_attribute("component_id_position", "left"),
        )
        .add_child(
            ObjectState::new("socket_encoding")
                .with_attribute("socket_name", "S9")
                .with_attribute("encoding", 0_u32)
                .with_attribute("extra_bits", 0_u32)
                .with_attribute("sc_table", "missing"),
        );
        state.add_child(slot);
        let err = BinaryEncoding::load_state(&state).expect_err("dangling reference");
        assert_eq!(
            err.to_string(),
            "cannot load 'socket_encoding': unknown socket code table 'missing'"
        );
    }

    #[test]
    fn invariant_violations_become_load_errors() {
        let mut state = ObjectState::new("bem").with_attribute("extra_bits", 0_u32);
        for _ in 0..2 {
            state.add_child(
                ObjectState::new("sc_table")
                    .with_attribute("name", "T")
                    .with_attribute("extra_bits", 0_u32),
            );
        }
        let err = BinaryEncoding::load_state(&state).expect_err("duplicate table");
        assert_eq!(err.class(), ErrorClass::Load);
        assert!(err.to_string().contains("already exists"));
    }
}
