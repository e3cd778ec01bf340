//! Binary encoding map model for transport-triggered processors.

/// Error taxonomy shared by every encoding map operation.
pub mod error;
pub use error::{BemError, BemResult, ErrorClass};

/// Bit-pattern primitives: required widths, alignments and encodings.
pub mod bits;
pub use bits::{required_bits, to_binary, Alignment, Encoding, MAX_WIDTH};

/// Prefix-freedom checks guarding every insertion into a shared field.
pub mod collision;
pub use collision::{can_add_component_encoding, can_add_port_encoding, is_prefix_free};

mod order;

/// Function unit, register file and immediate unit port codes.
pub mod port_code;
pub use port_code::{FuPortCode, IuPortCode, PortCode, RfPortCode};

/// Socket code tables and the table arena owned by the encoding map.
pub mod socket_code_table;
pub use socket_code_table::{SocketCodeTable, SocketCodeTables, TableId};

/// Source and destination fields of a move slot.
pub mod slot_field;
pub use slot_field::{
    BridgeEncoding, DestinationField, ImmediateEncoding, NopEncoding, SlotField, SlotSide,
    SocketEncoding, SourceField,
};

/// Guard field of a move slot.
pub mod guard_field;
pub use guard_field::{FuGuardEncoding, GprGuardEncoding, GuardField, UnconditionalGuardEncoding};

/// Move slots and their sub-field ordering.
pub mod move_slot;
pub use move_slot::{MoveSlot, MoveSlotField, SubFieldKind};

/// Immediate slot, immediate control and long immediate destination fields.
pub mod fields;
pub use fields::{ImmediateControlField, ImmediateSlotField, LImmDstRegisterField};

/// The encoding map root and its top-level field tree.
pub mod encoding_map;
pub use encoding_map::{BinaryEncoding, FieldKey, FieldKind, InstructionField};

/// Bit-span listing of the instruction word.
pub mod layout;
pub use layout::{FieldSpan, SpanKind};

/// Structural tree used at the persistence boundary.
pub mod object_state;
pub use object_state::{Attribute, AttributeValue, ObjectState};

/// Saving to and restoring from [`ObjectState`] trees.
pub mod persist;
pub use persist::TAG_BEM;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
