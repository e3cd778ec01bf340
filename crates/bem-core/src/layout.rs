//! Flat bit-span listing of the instruction word.

use crate::encoding_map::{BinaryEncoding, FieldKind, InstructionField};
use crate::move_slot::SubFieldKind;

/// What a [`FieldSpan`] covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SpanKind {
    /// A top-level field.
    Field(FieldKind),
    /// A sub-field of the move slot listed just before it.
    SubField(SubFieldKind),
}

impl SpanKind {
    /// Lower-case name used in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Field(kind) => kind.as_str(),
            Self::SubField(kind) => kind.as_str(),
        }
    }

    /// Returns `true` for top-level fields.
    #[must_use]
    pub const fn is_top_level(self) -> bool {
        matches!(self, Self::Field(_))
    }
}

/// Bits `[start, start + width)` of the instruction word.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct FieldSpan {
    /// Kind of the covered field.
    pub kind: SpanKind,
    /// Field name; sub-fields carry the bus name of their slot.
    pub name: Option<String>,
    /// Least significant bit, counted from bit 0 of the word.
    pub start: u32,
    /// Number of bits.
    pub width: u32,
}

impl FieldSpan {
    /// One past the most significant bit.
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.start.saturating_add(self.width)
    }
}

impl BinaryEncoding {
    /// Lists every top-level field in ordinal order, each move slot followed
    /// by its sub-fields in their own ordinal order.
    ///
    /// Starts are absolute. Top-level spans tile `[0, width - extra_bits)`.
    #[must_use]
    pub fn layout(&self) -> Vec<FieldSpan> {
        let tables = self.socket_code_tables();
        let mut spans = Vec::new();
        let mut start = 0;
        for field in self.child_fields() {
            let width = field.width(tables);
            spans.push(FieldSpan {
                kind: SpanKind::Field(field.kind()),
                name: field.name().map(str::to_owned),
                start,
                width,
            });
            if let InstructionField::MoveSlot(slot) = field {
                let mut sub_start = start;
                for child in slot.child_fields() {
                    let sub_width = child.width(tables);
                    spans.push(FieldSpan {
                        kind: SpanKind::SubField(child.kind()),
                        name: Some(slot.name().to_owned()),
                        start: sub_start,
                        width: sub_width,
                    });
                    sub_start = sub_start.saturating_add(sub_width);
                }
            }
            start = start.saturating_add(width);
        }
        spans
    }
}

#[cfg(test)]
mod tests {
    use super::SpanKind;
    use crate::encoding_map::{BinaryEncoding, FieldKind};
    use crate::guard_field::UnconditionalGuardEncoding;
    use crate::move_slot::SubFieldKind;
    use crate::slot_field::SocketEncoding;

    #[test]
    fn move_slot_spans_nest_inside_their_slot() {
        let mut bem = BinaryEncoding::new();
        bem.add_immediate_slot("imm", 4).expect("new slot");
        let slot = bem.add_move_slot("B1").expect("new slot");
        slot.add_guard_field()
            .expect("first guard field")
            .add_unconditional_guard_encoding(UnconditionalGuardEncoding::new(false, 2))
            .expect("first guard");
        slot.add_destination_field()
            .expect("first destination field")
            .add_socket_encoding(SocketEncoding::new("S1", 5, 1))
            .expect("first socket");
        slot.set_extra_bits(1);

        let spans = bem.layout();
        let kinds: Vec<SpanKind> = spans.iter().map(|span| span.kind).collect();
        assert_eq!(
            kinds,
            [
                SpanKind::Field(FieldKind::ImmediateSlot),
                SpanKind::Field(FieldKind::MoveSlot),
                SpanKind::SubField(SubFieldKind::Guard),
                SpanKind::SubField(SubFieldKind::Destination),
            ]
        );
        let bounds: Vec<(u32, u32)> = spans.iter().map(|span| (span.start, span.width)).collect();
        assert_eq!(bounds, [(0, 4), (4, 7), (4, 2), (6, 4)]);
        assert_eq!(spans[3].name.as_deref(), Some("B1"));
        assert_eq!(spans[1].end(), bem.width());
    }

    #[test]
    fn empty_map_has_no_spans() {
        assert!(BinaryEncoding::new().layout().is_empty());
    }
}
