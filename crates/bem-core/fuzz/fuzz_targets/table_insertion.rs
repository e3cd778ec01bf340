#![no_main]

use bem_core::{
    is_prefix_free, Alignment, BinaryEncoding, Encoding, FieldKey, FuPortCode, RfPortCode,
    SlotSide, SocketEncoding,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let alignment = if data[0] & 1 == 0 { Alignment::Left } else { Alignment::Right };
    let mut bem = BinaryEncoding::new();
    let _ = bem.add_socket_code_table("T");
    if let Ok(slot) = bem.add_move_slot("B") {
        if let Ok(field) = slot.add_destination_field() {
            let _ = field.set_component_id_position(alignment);
        }
    }

    for (index, chunk) in data[1..].chunks(2).enumerate() {
        let value = u32::from(chunk[0] >> 2);
        let extra = u32::from(chunk[0] & 0b11);
        let index_width = chunk.get(1).map_or(0, |byte| u32::from(byte & 0b111));
        if let Some(table) = bem.socket_code_table_mut("T") {
            let _ = if chunk.get(1).is_some_and(|byte| byte & 0x80 != 0) {
                table
                    .add_fu_port_code(FuPortCode::new("FU", format!("p{index}"), value, extra))
                    .map(|_| ())
            } else {
                table
                    .add_rf_port_code(RfPortCode::new(format!("RF{index}"), value, extra, index_width))
                    .map(|_| ())
            };
        }
        if let Some(field) = bem
            .move_slot_mut("B")
            .and_then(|slot| slot.destination_field_mut())
        {
            let _ = field.add_socket_encoding(SocketEncoding::new(format!("S{index}"), value, extra));
        }
    }
    let _ = bem.set_socket_codes("B", SlotSide::Destination, "S0", "T");
    let _ = bem.set_position(FieldKey::MoveSlot("B"), usize::from(data[0]));

    if let Some(table) = bem.socket_code_table("T") {
        let codes: Vec<Encoding> = table.port_codes().filter_map(|code| code.encoding()).collect();
        assert!(is_prefix_free(&codes, Alignment::Left));
    }
    if let Some(field) = bem.slot_field("B", SlotSide::Destination) {
        let ids: Vec<Encoding> = field.socket_encodings().iter().map(SocketEncoding::id).collect();
        assert!(is_prefix_free(&ids, alignment));
    }

    let restored = BinaryEncoding::load_state(&bem.save_state());
    assert_eq!(restored.as_ref().map(BinaryEncoding::width).ok(), Some(bem.width()));
});
