//! Encoding map construction, ordering and collision suite.

#![allow(clippy::pedantic, clippy::nursery)]

use bem_core::{
    is_prefix_free, Alignment, BemError, BinaryEncoding, Encoding, ErrorClass, FieldKey,
    FuGuardEncoding, FuPortCode, GprGuardEncoding, RfPortCode, SlotSide, SocketEncoding, SpanKind,
    SubFieldKind,
};
use proptest::prelude::*;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

fn names(bem: &BinaryEncoding) -> Vec<String> {
    bem.child_fields()
        .iter()
        .map(|field| field.name().unwrap_or_default().to_owned())
        .collect()
}

fn four_slots() -> BinaryEncoding {
    let mut bem = BinaryEncoding::new();
    for name in ["A", "B", "C", "D"] {
        bem.add_immediate_slot(name, 1).expect("distinct names");
    }
    bem
}

#[rstest]
#[case(Encoding::new(1, 0), Encoding::new(3, 0), Alignment::Left, true)]
#[case(Encoding::new(1, 0), Encoding::new(3, 0), Alignment::Right, true)]
#[case(Encoding::new(2, 0), Encoding::new(3, 0), Alignment::Left, false)]
#[case(Encoding::new(2, 0), Encoding::new(1, 0), Alignment::Left, true)]
#[case(Encoding::new(2, 0), Encoding::new(1, 0), Alignment::Right, false)]
#[case(Encoding::new(1, 1), Encoding::new(1, 0), Alignment::Left, false)]
#[case(Encoding::new(1, 1), Encoding::new(1, 0), Alignment::Right, true)]
fn ambiguity_depends_on_alignment(
    #[case] a: Encoding,
    #[case] b: Encoding,
    #[case] alignment: Alignment,
    #[case] ambiguous: bool,
) {
    assert_eq!(a.is_ambiguous_with(b, alignment), ambiguous);
    assert_eq!(b.is_ambiguous_with(a, alignment), ambiguous);
}

#[rstest]
#[case("A", 2, &["B", "C", "A", "D"])]
#[case("D", 0, &["D", "A", "B", "C"])]
#[case("B", 99, &["A", "C", "D", "B"])]
fn set_position_moves_to_index(#[case] name: &str, #[case] to: usize, #[case] expected: &[&str]) {
    let mut bem = four_slots();
    bem.set_position(FieldKey::ImmediateSlot(name), to).expect("slot exists");
    assert_eq!(names(&bem), expected);
}

#[test]
fn consecutive_moves_follow_remove_then_insert() {
    let mut bem = four_slots();
    bem.set_position(FieldKey::ImmediateSlot("A"), 2).expect("slot exists");
    bem.set_position(FieldKey::ImmediateSlot("D"), 1).expect("slot exists");
    assert_eq!(names(&bem), ["B", "D", "C", "A"]);
    assert!(matches!(
        bem.set_position(FieldKey::ImmediateSlot("E"), 0),
        Err(BemError::NotFound { .. })
    ));
}

#[test]
fn sibling_names_are_unique_per_kind() {
    let mut bem = BinaryEncoding::new();
    bem.add_move_slot("B1").expect("first slot");
    bem.add_immediate_slot("B1", 4).expect("other kind may share the name");
    assert_eq!(
        bem.add_move_slot("B1").map(|_| ()).map_err(|err| err.class()),
        Err(ErrorClass::Naming)
    );
    bem.add_move_slot("B2").expect("second slot");
    assert!(matches!(
        bem.rename_move_slot("B2", "B1"),
        Err(BemError::NameConflict { .. })
    ));
    bem.add_socket_code_table("T").expect("first table");
    assert!(bem.add_socket_code_table("T").is_err());
    assert_eq!(bem.move_slot_count(), 2);
}

#[test]
fn width_sums_fields_and_extra_bits() {
    let mut bem = BinaryEncoding::new();
    bem.add_immediate_slot("imm", 8).expect("new slot");
    let control = bem.add_immediate_control_field().expect("first control field");
    control.add_template_encoding("limm", 0).expect("first template");
    control.add_template_encoding("no_limm", 1).expect("second template");
    bem.add_long_imm_dst_register_field(3).expect("unnamed field");
    bem.set_extra_bits(2);
    assert_eq!(bem.width(), 8 + 1 + 3 + 2);
    assert_eq!(bem.bit_position(FieldKey::ImmediateControl), Some(8));
    assert_eq!(bem.bit_position(FieldKey::LImmDstRegister(0)), Some(9));
    assert!(matches!(
        bem.add_immediate_control_field(),
        Err(BemError::NameConflict { .. })
    ));
}

#[test]
fn removing_a_shared_table_detaches_every_socket() {
    let mut bem = BinaryEncoding::new();
    let id = bem.add_socket_code_table("rf").expect("new table");
    bem.socket_code_table_by_id_mut(id)
        .expect("live table")
        .add_rf_port_code(RfPortCode::new("RF", 1, 0, 5))
        .expect("first code");
    for bus in ["B1", "B2"] {
        bem.add_move_slot(bus)
            .expect("new slot")
            .add_destination_field()
            .expect("first destination field")
            .add_socket_encoding(SocketEncoding::new("S", 0, 0))
            .expect("first socket");
        bem.set_socket_codes(bus, SlotSide::Destination, "S", "rf")
            .expect("everything exists");
    }
    assert_eq!(bem.width(), 2 * (1 + 6));

    let removed = bem.remove_socket_code_table("rf").expect("table exists");
    assert_eq!(removed.rf_port_code("RF").map(|code| code.code().width()), Some(6));
    for bus in ["B1", "B2"] {
        let field = bem.slot_field(bus, SlotSide::Destination).expect("field exists");
        assert!(!field.socket_encoding("S").is_some_and(|enc| enc.has_socket_codes()));
    }
    assert_eq!(bem.width(), 2);
    assert!(bem.socket_code_table("rf").is_none());
}

#[test]
fn table_handles_only_attach_through_the_owning_map() {
    let mut first = BinaryEncoding::new();
    first.add_socket_code_table("T").expect("new table");
    first
        .add_move_slot("B1")
        .expect("new slot")
        .add_destination_field()
        .expect("first destination field")
        .add_socket_encoding(SocketEncoding::new("S", 0, 0))
        .expect("first socket");
    first
        .set_socket_codes("B1", SlotSide::Destination, "S", "T")
        .expect("everything exists");
    let attached = first
        .slot_field("B1", SlotSide::Destination)
        .and_then(|field| field.socket_encoding("S"))
        .cloned()
        .expect("socket exists");
    assert!(attached.has_socket_codes());

    first.remove_socket_code_table("T").expect("table exists");
    assert!(matches!(
        first.set_socket_codes("B1", SlotSide::Destination, "S", "T"),
        Err(BemError::NotFound { .. })
    ));

    let mut second = BinaryEncoding::new();
    second.add_socket_code_table("U").expect("new table");
    let added = second
        .add_move_slot("B1")
        .expect("new slot")
        .add_destination_field()
        .expect("first destination field")
        .add_socket_encoding(attached)
        .expect("first socket");
    assert!(!added.has_socket_codes());

    for bem in [&first, &second] {
        let loaded = BinaryEncoding::load_state(&bem.save_state()).expect("saved state loads");
        assert_eq!(&loaded, bem);
    }
}

#[test]
fn third_unit_with_a_committed_one_bit_code_collides() {
    let mut bem = BinaryEncoding::new();
    let id = bem.add_socket_code_table("rf").expect("new table");
    let table = bem.socket_code_table_by_id_mut(id).expect("live table");
    table
        .add_rf_port_code(RfPortCode::new("RF0", 0, 0, 4))
        .expect("first code");
    table
        .add_rf_port_code(RfPortCode::new("RF1", 1, 0, 4))
        .expect("'1' differs from '0'");
    assert!(matches!(
        table.add_rf_port_code(RfPortCode::new("RF2", 0, 0, 4)),
        Err(BemError::EncodingCollision { .. })
    ));
    assert_eq!(table.port_code_count(), 2);
    assert!(!table.has_rf_port_code("RF2"));
}

#[test]
fn removed_field_frees_its_name() {
    let mut bem = BinaryEncoding::new();
    bem.add_move_slot("B1").expect("first slot");
    bem.add_immediate_slot("imm", 4).expect("first slot");
    assert!(matches!(
        bem.add_move_slot("B1"),
        Err(BemError::NameConflict { .. })
    ));

    bem.remove_move_slot("B1").expect("slot exists");
    bem.add_move_slot("B1").expect("name is free again");
    assert_eq!(names(&bem), ["imm", "B1"]);

    bem.remove_immediate_slot("imm").expect("slot exists");
    bem.add_immediate_slot("imm", 8).expect("name is free again");
    assert_eq!(bem.child_field_count(), 2);
    assert_eq!(bem.width(), 8);
}

#[test]
fn widths_saturate_at_the_word_limit() {
    let mut bem = BinaryEncoding::new();
    bem.set_extra_bits(u32::MAX);
    bem.add_immediate_slot("imm", 1).expect("new slot");
    bem.add_move_slot("B1")
        .expect("new slot")
        .set_extra_bits(u32::MAX);
    assert_eq!(bem.width(), u32::MAX);
    assert_eq!(Encoding::new(1, u32::MAX).width(), u32::MAX);
    let spans = bem.layout();
    assert_eq!(spans.last().map(|span| span.end()), Some(u32::MAX));
}

#[test]
fn encoding_less_code_must_be_alone() {
    let mut bem = BinaryEncoding::new();
    bem.add_socket_code_table("T").expect("new table");
    let table = bem.socket_code_table_mut("T").expect("table exists");
    table
        .add_rf_port_code(RfPortCode::index_only("RF", 4))
        .expect("sole entry");
    assert!(matches!(
        table.add_fu_port_code(FuPortCode::new("ALU", "in1t", 1, 0)),
        Err(BemError::NameConflict { .. })
    ));
    table.remove_rf_port_code("RF").expect("code exists");
    table
        .add_fu_port_code(FuPortCode::new("ALU", "in1t", 1, 0))
        .expect("table is empty again");
    assert!(matches!(
        table.add_rf_port_code(RfPortCode::index_only("RF", 4)),
        Err(BemError::NameConflict { .. })
    ));
    assert_eq!(table.port_code_count(), 1);
}

#[test]
fn guard_duplicates_and_value_collisions() {
    let mut bem = BinaryEncoding::new();
    let guard = bem
        .add_move_slot("B1")
        .expect("new slot")
        .add_guard_field()
        .expect("first guard field");
    guard
        .add_gpr_guard_encoding(GprGuardEncoding::new("BOOL", 0, false, 0))
        .expect("first guard");
    assert!(matches!(
        guard.add_gpr_guard_encoding(GprGuardEncoding::new("BOOL", 0, false, 1)),
        Err(BemError::NameConflict { .. })
    ));
    assert!(matches!(
        guard.add_fu_guard_encoding(FuGuardEncoding::new("LSU", "o1", false, 0)),
        Err(BemError::EncodingCollision { .. })
    ));
    guard
        .add_gpr_guard_encoding(GprGuardEncoding::new("BOOL", 0, true, 1))
        .expect("inverted guard is a distinct key");
    assert_eq!(guard.width(), 1);
}

#[test]
fn component_id_position_change_is_checked() {
    let mut bem = BinaryEncoding::new();
    let field = bem
        .add_move_slot("B1")
        .expect("new slot")
        .add_source_field()
        .expect("first source field");
    field
        .add_socket_encoding(SocketEncoding::new("S1", 2, 0))
        .expect("first socket");
    field
        .add_socket_encoding(SocketEncoding::new("S2", 0, 0))
        .expect("differs in the leading bit");
    assert!(matches!(
        field.set_component_id_position(Alignment::Right),
        Err(BemError::EncodingCollision { .. })
    ));
    assert_eq!(field.component_id_position(), Alignment::Left);
}

#[test]
fn sub_field_bit_positions_follow_ordinals() {
    let mut bem = BinaryEncoding::new();
    let slot = bem.add_move_slot("B1").expect("new slot");
    slot.add_source_field()
        .expect("first source field")
        .add_socket_encoding(SocketEncoding::new("S1", 3, 0))
        .expect("first socket");
    slot.add_destination_field()
        .expect("first destination field")
        .add_socket_encoding(SocketEncoding::new("S2", 1, 2))
        .expect("first socket");
    let tables = bem.socket_code_tables();
    let slot = bem.move_slot("B1").expect("slot exists");
    assert_eq!(slot.bit_position(SubFieldKind::Source, tables), Some(0));
    assert_eq!(slot.bit_position(SubFieldKind::Destination, tables), Some(2));
    assert_eq!(slot.bit_position(SubFieldKind::Guard, tables), None);
}

proptest! {
    #[test]
    fn property_table_codes_stay_prefix_free(
        codes in proptest::collection::vec((0u32..64, 0u32..3, 0u32..4), 1..24)
    ) {
        let mut bem = BinaryEncoding::new();
        bem.add_socket_code_table("T").expect("new table");
        let table = bem.socket_code_table_mut("T").expect("table exists");
        for (index, (value, extra, index_width)) in codes.into_iter().enumerate() {
            let _ = table.add_rf_port_code(RfPortCode::new(format!("RF{index}"), value, extra, index_width));
        }
        let committed: Vec<Encoding> = table
            .rf_port_codes()
            .iter()
            .filter_map(|code| code.code().encoding())
            .collect();
        prop_assert!(!committed.is_empty());
        prop_assert!(is_prefix_free(&committed, Alignment::Left));
    }

    #[test]
    fn property_slot_ids_stay_prefix_free(
        ids in proptest::collection::vec((0u32..32, 0u32..3), 1..16),
        right in any::<bool>()
    ) {
        let alignment = if right { Alignment::Right } else { Alignment::Left };
        let mut bem = BinaryEncoding::new();
        let field = bem
            .add_move_slot("B")
            .expect("new slot")
            .add_destination_field()
            .expect("first destination field");
        field.set_component_id_position(alignment).expect("empty field accepts any position");
        for (index, (value, extra)) in ids.into_iter().enumerate() {
            let _ = field.add_socket_encoding(SocketEncoding::new(format!("S{index}"), value, extra));
        }
        let committed: Vec<Encoding> = field.socket_encodings().iter().map(SocketEncoding::id).collect();
        prop_assert!(is_prefix_free(&committed, alignment));
    }

    #[test]
    fn property_reorder_matches_remove_then_insert(
        moves in proptest::collection::vec((0usize..6, 0usize..8), 0..16)
    ) {
        let mut bem = BinaryEncoding::new();
        let mut model: Vec<String> = (0..6).map(|index| format!("I{index}")).collect();
        for name in &model {
            bem.add_immediate_slot(name, 1).expect("distinct names");
        }
        for (from, to) in moves {
            let name = model.remove(from);
            model.insert(to.min(model.len()), name.clone());
            bem.set_position(FieldKey::ImmediateSlot(&name), to).expect("slot exists");
        }
        prop_assert_eq!(names(&bem), model);
    }

    #[test]
    fn property_layout_tiles_the_word(
        widths in proptest::collection::vec(0u32..16, 0..8),
        slot_extra in 0u32..4,
        root_extra in 0u32..4
    ) {
        let mut bem = BinaryEncoding::new();
        for (index, width) in widths.iter().enumerate() {
            bem.add_immediate_slot(&format!("I{index}"), *width).expect("distinct names");
        }
        let slot = bem.add_move_slot("B").expect("new slot");
        slot.set_extra_bits(slot_extra);
        slot.add_guard_field()
            .expect("first guard field")
            .add_gpr_guard_encoding(GprGuardEncoding::new("BOOL", 0, false, 3))
            .expect("first guard");
        bem.set_extra_bits(root_extra);

        let spans = bem.layout();
        let mut next = 0;
        for span in spans.iter().filter(|span| span.kind.is_top_level()) {
            prop_assert_eq!(span.start, next);
            next = span.end();
        }
        prop_assert_eq!(next + root_extra, bem.width());
        prop_assert_eq!(
            spans.iter().filter(|span| span.kind == SpanKind::SubField(SubFieldKind::Guard)).count(),
            1
        );
        prop_assert_eq!(next, widths.iter().sum::<u32>() + 2 + slot_extra);
    }
}
