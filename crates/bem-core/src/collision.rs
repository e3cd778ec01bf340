//! Ambiguity checks for bit patterns sharing one field.
//!
//! Every fixed pattern committed to a socket code table or a slot field must
//! stay distinguishable from its siblings: after aligning two patterns at the
//! field's fixed end, at least one bit they both define has to differ. The
//! committed set is therefore prefix-free and decodes unambiguously.

use crate::bits::{Alignment, Encoding};
use crate::port_code::PortCode;
use crate::slot_field::SlotField;
use crate::socket_code_table::SocketCodeTable;

/// Returns the label of the first existing pattern ambiguous with `candidate`.
pub(crate) fn find_ambiguous<L, I>(candidate: Encoding, existing: I, alignment: Alignment) -> Option<L>
where
    I: IntoIterator<Item = (L, Encoding)>,
{
    existing
        .into_iter()
        .find(|(_, code)| candidate.is_ambiguous_with(*code, alignment))
        .map(|(label, _)| label)
}

/// Returns `true` if no two of `codes` are ambiguous under `alignment`.
#[must_use]
pub fn is_prefix_free(codes: &[Encoding], alignment: Alignment) -> bool {
    codes.iter().enumerate().all(|(index, code)| {
        codes[index + 1..]
            .iter()
            .all(|other| !code.is_ambiguous_with(*other, alignment))
    })
}

/// Decides whether `code` may join `table` without an ambiguous port pattern.
///
/// Port-identifying patterns are left-aligned; register index bits never take
/// part. Index-only codes carry no pattern and always pass this check.
#[must_use]
pub fn can_add_port_encoding(table: &SocketCodeTable, code: &PortCode) -> bool {
    code.encoding().is_none_or(|candidate| {
        find_ambiguous(candidate, table.port_encodings(), Alignment::Left).is_none()
    })
}

/// Decides whether a component with ID `id` may join `field`.
///
/// The ID is compared against every component ID already in the field,
/// aligned at the field's component-ID position.
#[must_use]
pub fn can_add_component_encoding(field: &SlotField, id: Encoding) -> bool {
    find_ambiguous(id, field.component_ids(), field.component_id_position()).is_none()
}
