//! Human-readable encoding map report.
//!
//! Bit patterns are printed most significant bit first: `X` marks an unused
//! bit, `I` a short immediate bit, `S` a socket code bit and `R` a register
//! index bit.

use std::fmt::{self, Write};

use bem_core::{
    to_binary, Alignment, BinaryEncoding, FieldKey, GuardField, InstructionField,
    LImmDstRegisterField, MoveSlot, MoveSlotField, PortCode, SlotField, SocketCodeTable,
    SourceField,
};

/// Report switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOptions {
    /// Print the bit legend after the title.
    pub legend: bool,
    /// List the port codes below every socket that has a code table.
    pub port_codes: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            legend: true,
            port_codes: true,
        }
    }
}

const SEPARATOR: &str = "------------------------------------------------------------";

/// Renders the report for `bem`, titled with `file_name`.
#[must_use]
pub fn render(bem: &BinaryEncoding, file_name: &str, options: &ViewOptions) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_report(&mut out, bem, file_name, options);
    out
}

/// Writes the report for `bem` into `out`.
///
/// # Errors
///
/// Propagates errors of the underlying writer.
pub fn write_report(
    out: &mut impl Write,
    bem: &BinaryEncoding,
    file_name: &str,
    options: &ViewOptions,
) -> fmt::Result {
    writeln!(out, "Binary Encoding Map: {file_name}")?;
    writeln!(out)?;
    if options.legend {
        writeln!(out, "X = unused bit")?;
        writeln!(out, "I = immediate bit")?;
        writeln!(out, "S = socket code bit")?;
        writeln!(out, "R = register index bit")?;
        writeln!(out)?;
    }
    writeln!(out, "Total instruction width: {}", bem.width())?;
    writeln!(out)?;

    write_instruction_layout(out, bem)?;
    writeln!(out)?;
    if bem.immediate_control_field().is_some() {
        write_control_field(out, bem)?;
        writeln!(out)?;
    }
    for (index, field) in bem.long_imm_dst_register_fields().enumerate() {
        let position = bem.bit_position(FieldKey::LImmDstRegister(index)).unwrap_or(0);
        write_dst_register_field(out, field, position)?;
        writeln!(out)?;
    }
    for slot in bem.move_slots() {
        write_move_slot(out, bem, slot, options)?;
        writeln!(out)?;
    }
    Ok(())
}

fn pattern(symbol: char, times: u32) -> String {
    (0..times).map(|_| symbol).collect()
}

fn write_instruction_layout(out: &mut impl Write, bem: &BinaryEncoding) -> fmt::Result {
    if bem.child_field_count() == 0 {
        return Ok(());
    }
    let tables = bem.socket_code_tables();
    write!(out, "|")?;
    for field in bem.child_fields().iter().rev() {
        let width = field.width(tables);
        match field {
            InstructionField::ImmediateControl(_) => write!(out, " limm cntrl: {width}")?,
            InstructionField::MoveSlot(slot) => write!(out, " move slot {}: {width}", slot.name())?,
            InstructionField::ImmediateSlot(slot) => {
                write!(out, " limm slot {}: {width}", slot.name())?;
            }
            InstructionField::LImmDstRegister(_) => write!(out, " dst reg field: {width}")?,
        }
        write!(out, " |")?;
    }
    writeln!(out)
}

fn write_control_field(out: &mut impl Write, bem: &BinaryEncoding) -> fmt::Result {
    let Some(field) = bem.immediate_control_field() else {
        return Ok(());
    };
    writeln!(out, "{SEPARATOR}")?;
    writeln!(out, "Immediate Control Field")?;
    writeln!(out)?;
    let position = bem.bit_position(FieldKey::ImmediateControl).unwrap_or(0);
    writeln!(out, "Position: {position}")?;
    writeln!(out, "Width: {}", field.width())?;
    writeln!(out, "Encodings:")?;
    let extra = pattern('X', field.extra_bits());
    let width = field.width().saturating_sub(field.extra_bits());
    for (template, encoding) in field.template_encodings() {
        writeln!(out, "{extra}{} : {template}", to_binary(encoding, width))?;
    }
    Ok(())
}

fn write_dst_register_field(
    out: &mut impl Write,
    field: &LImmDstRegisterField,
    position: u32,
) -> fmt::Result {
    writeln!(out, "{SEPARATOR}")?;
    writeln!(out, "Long Immediate Destination Register Field")?;
    writeln!(out)?;
    writeln!(out, "Position: {position}")?;
    writeln!(out, "Width: {}", field.width())?;
    writeln!(out)?;
    writeln!(out, "Usage")?;
    for (template, unit) in field.immediate_destinations() {
        writeln!(out, "{template}: {unit}")?;
    }
    Ok(())
}

fn write_move_slot(
    out: &mut impl Write,
    bem: &BinaryEncoding,
    slot: &MoveSlot,
    options: &ViewOptions,
) -> fmt::Result {
    let tables = bem.socket_code_tables();
    writeln!(out, "{SEPARATOR}")?;
    writeln!(out, "Move Slot: {}", slot.name())?;
    writeln!(out)?;
    let position = bem.bit_position(FieldKey::MoveSlot(slot.name())).unwrap_or(0);
    writeln!(out, "Position: {position}")?;
    writeln!(out, "Width: {}", slot.width(tables))?;
    writeln!(out)?;

    write!(out, "|")?;
    for child in slot.child_fields().iter().rev() {
        let width = child.width(tables);
        match child {
            MoveSlotField::Guard(_) => write!(out, " grd field: {width}")?,
            MoveSlotField::Source(_) => write!(out, " src field: {width}")?,
            MoveSlotField::Destination(_) => write!(out, " dst field: {width}")?,
        }
        write!(out, " |")?;
    }
    writeln!(out)?;
    writeln!(out)?;

    if let Some(guard) = slot.guard_field() {
        write_guard_field(out, guard)?;
        writeln!(out)?;
    }
    if let Some(source) = slot.source_field() {
        writeln!(out, "Source field encodings:")?;
        write_slot_field(out, bem, source, options)?;
        write_source_extras(out, bem, source)?;
        writeln!(out)?;
    }
    if let Some(destination) = slot.destination_field() {
        writeln!(out, "Destination field encodings:")?;
        write_slot_field(out, bem, destination, options)?;
    }
    Ok(())
}

fn write_guard_field(out: &mut impl Write, field: &GuardField) -> fmt::Result {
    let extra = pattern('X', field.extra_bits());
    let width = field.width().saturating_sub(field.extra_bits());
    writeln!(out, "Guard field encodings:")?;
    for (inverted, label) in [(false, "always-true"), (true, "always-false")] {
        if let Some(guard) = field.unconditional_guard_encoding(inverted) {
            writeln!(out, "{extra}{} : {label}", to_binary(guard.encoding(), width))?;
        }
    }
    let sense = |inverted: bool| if inverted { "inverted" } else { "non-inverted" };
    for guard in field.gpr_guard_encodings() {
        writeln!(
            out,
            "{extra}{} : {} GPR {} of RF {}",
            to_binary(guard.encoding(), width),
            sense(guard.is_inverted()),
            guard.register_index(),
            guard.register_file()
        )?;
    }
    for guard in field.fu_guard_encodings() {
        writeln!(
            out,
            "{extra}{} : {} port {} of FU {}",
            to_binary(guard.encoding(), width),
            sense(guard.is_inverted()),
            guard.port_name(),
            guard.unit_name()
        )?;
    }
    Ok(())
}

/// Writes `id` and `payload` inside the field's component area, the ID at the
/// aligned end and unused bits in between.
fn component_row(field: &SlotField, body_width: u32, id: &str, payload: &str) -> String {
    let used = u32::try_from(id.len() + payload.len()).unwrap_or(u32::MAX);
    let gap = pattern('X', body_width.saturating_sub(used));
    let extra = pattern('X', field.extra_bits());
    match field.component_id_position() {
        Alignment::Left => format!("{extra}{id}{gap}{payload}"),
        Alignment::Right => format!("{extra}{payload}{gap}{id}"),
    }
}

fn write_slot_field(
    out: &mut impl Write,
    bem: &BinaryEncoding,
    field: &SlotField,
    options: &ViewOptions,
) -> fmt::Result {
    let tables = bem.socket_code_tables();
    let body_width = field.width(tables).saturating_sub(field.extra_bits());

    if let Some(nop) = field.nop_encoding() {
        let row = component_row(field, body_width, &nop.id().to_binary(), "");
        writeln!(out, "{row} : NOP")?;
    }
    for socket in field.socket_encodings() {
        let table = bem.socket_codes_of(socket);
        let codes = table.map_or_else(String::new, |table| pattern('S', table.width()));
        let row = component_row(field, body_width, &socket.id().to_binary(), &codes);
        writeln!(out, "{row} : socket {}", socket.socket_name())?;
        if let Some(table) = table.filter(|_| options.port_codes) {
            write_port_codes(out, field, body_width, table)?;
        }
    }
    Ok(())
}

fn write_port_codes(
    out: &mut impl Write,
    field: &SlotField,
    body_width: u32,
    table: &SocketCodeTable,
) -> fmt::Result {
    let indent = match field.component_id_position() {
        Alignment::Left => pattern(
            ' ',
            field
                .extra_bits()
                .saturating_add(body_width)
                .saturating_sub(table.width()),
        ),
        Alignment::Right => pattern(' ', field.extra_bits()),
    };
    let trailer = match field.component_id_position() {
        Alignment::Left => String::new(),
        Alignment::Right => pattern(' ', body_width.saturating_sub(table.width())),
    };
    for code in table.rf_port_codes() {
        let bits = port_code_bits(table, code.code());
        writeln!(out, "{indent}{bits}{trailer} : RF: {}", code.unit_name())?;
    }
    for code in table.iu_port_codes() {
        let bits = port_code_bits(table, code.code());
        writeln!(out, "{indent}{bits}{trailer} : IU: {}", code.unit_name())?;
    }
    for code in table.fu_port_codes() {
        let bits = port_code_bits(table, code.code());
        write!(out, "{indent}{bits}{trailer} : FU port: {}, {}", code.unit_name(), code.port_name())?;
        if let Some(operation) = code.operation_name() {
            write!(out, ", {operation}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Encoding bits, unused bits up to the table width, then index bits.
fn port_code_bits(table: &SocketCodeTable, code: &PortCode) -> String {
    let encoding = code.encoding().map_or_else(String::new, |enc| enc.to_binary());
    format!(
        "{encoding}{}{}",
        pattern('X', table.width().saturating_sub(code.width())),
        pattern('R', code.index_width())
    )
}

fn write_source_extras(out: &mut impl Write, bem: &BinaryEncoding, field: &SourceField) -> fmt::Result {
    let body_width = field
        .width(bem.socket_code_tables())
        .saturating_sub(field.extra_bits());
    if let Some(immediate) = field.immediate_encoding() {
        let bits = pattern('I', immediate.immediate_width());
        let row = component_row(field, body_width, &immediate.id().to_binary(), &bits);
        writeln!(out, "{row} : short immediate")?;
    }
    for bridge in field.bridge_encodings() {
        let row = component_row(field, body_width, &bridge.id().to_binary(), "");
        writeln!(out, "{row} : bridge {}", bridge.bridge_name())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use bem_core::{
        Alignment, BinaryEncoding, GprGuardEncoding, ImmediateEncoding, RfPortCode, SlotSide,
        SocketEncoding, UnconditionalGuardEncoding,
    };

    use super::{render, ViewOptions};

    fn sample() -> BinaryEncoding {
        let mut bem = BinaryEncoding::new();
        let id = bem.add_socket_code_table("rf").expect("new table");
        bem.socket_code_table_by_id_mut(id)
            .expect("live table")
            .add_rf_port_code(RfPortCode::new("RF", 1, 0, 3))
            .expect("first code");
        let slot = bem.add_move_slot("B1").expect("new slot");
        let guard = slot.add_guard_field().expect("first guard field");
        guard
            .add_unconditional_guard_encoding(UnconditionalGuardEncoding::new(false, 0))
            .expect("always-true");
        guard
            .add_gpr_guard_encoding(GprGuardEncoding::new("BOOL", 1, true, 2))
            .expect("register guard");
        let source = slot.add_source_field().expect("first source field");
        source
            .add_socket_encoding(SocketEncoding::new("S1", 0, 0))
            .expect("first socket");
        source
            .set_immediate_encoding(ImmediateEncoding::new(1, 0, 4))
            .expect("short immediate");
        bem.set_socket_codes("B1", SlotSide::Source, "S1", "rf")
            .expect("everything exists");
        bem.add_immediate_slot("imm", 8).expect("new slot");
        bem
    }

    #[test]
    fn report_lists_layout_and_encodings() {
        let report = render(&sample(), "sample.json", &ViewOptions::default());
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "Binary Encoding Map: sample.json");
        assert!(lines.contains(&"Total instruction width: 15"));
        assert!(lines.contains(&"| limm slot imm: 8 | move slot B1: 7 |"));
        assert!(lines.contains(&"| src field: 5 | grd field: 2 |"));
        assert!(lines.contains(&"00 : always-true"));
        assert!(lines.contains(&"10 : inverted GPR 1 of RF BOOL"));
        assert!(lines.contains(&"0SSSS : socket S1"));
        assert!(lines.contains(&" 1RRR : RF: RF"));
        assert!(lines.contains(&"1IIII : short immediate"));
    }

    #[test]
    fn right_aligned_ids_end_the_row() {
        let mut bem = sample();
        let options = ViewOptions {
            legend: false,
            port_codes: false,
        };
        let source = bem
            .move_slot_mut("B1")
            .and_then(|slot| slot.source_field_mut())
            .expect("source field exists");
        source
            .set_component_id_position(Alignment::Right)
            .expect("0 and 1 differ in the last bit");
        let report = render(&bem, "sample.json", &options);
        assert!(report.contains("SSSS0 : socket S1\n"));
        assert!(report.contains("IIII1 : short immediate\n"));
        assert!(!report.contains("X = unused bit"));
        assert!(!report.contains("RF: RF"));
    }
}
