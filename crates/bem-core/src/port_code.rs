//! Port codes stored in socket code tables.

use crate::bits::Encoding;

/// Fields shared by every port code kind.
///
/// A code with an encoding identifies its port by a fixed, left-aligned bit
/// pattern followed by `index_width` register index bits. A code without an
/// encoding is index-only and must be the sole entry of its table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PortCode {
    unit_name: String,
    encoding: Option<Encoding>,
    index_width: u32,
}

impl PortCode {
    /// Creates a code with a fixed encoding.
    #[must_use]
    pub fn new(unit_name: impl Into<String>, encoding: u32, extra_bits: u32, index_width: u32) -> Self {
        Self {
            unit_name: unit_name.into(),
            encoding: Some(Encoding::new(encoding, extra_bits)),
            index_width,
        }
    }

    /// Creates an index-only code without an encoding.
    #[must_use]
    pub fn index_only(unit_name: impl Into<String>, index_width: u32) -> Self {
        Self {
            unit_name: unit_name.into(),
            encoding: None,
            index_width,
        }
    }

    /// Name of the unit the code addresses.
    #[must_use]
    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }

    /// Fixed port-identifying pattern, if any.
    #[must_use]
    pub const fn encoding(&self) -> Option<Encoding> {
        self.encoding
    }

    /// Returns `true` if the code has a fixed encoding.
    #[must_use]
    pub const fn has_encoding(&self) -> bool {
        self.encoding.is_some()
    }

    /// Literal zero bits above the encoding value.
    #[must_use]
    pub fn extra_bits(&self) -> u32 {
        self.encoding.map_or(0, Encoding::extra_bits)
    }

    /// Bits of the encoding value; zero for index-only codes.
    #[must_use]
    pub fn encoding_width(&self) -> u32 {
        self.encoding.map_or(0, Encoding::value_width)
    }

    /// Register index bits to the right of the encoding.
    #[must_use]
    pub const fn index_width(&self) -> u32 {
        self.index_width
    }

    /// Total width: encoding, padding and index bits.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.encoding
            .map_or(0, Encoding::width)
            .saturating_add(self.index_width)
    }
}

/// Port code of a function unit port, optionally bound to an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct FuPortCode {
    code: PortCode,
    port_name: String,
    operation_name: Option<String>,
}

impl FuPortCode {
    /// Code for a port that does not select an operation.
    #[must_use]
    pub fn new(
        unit_name: impl Into<String>,
        port_name: impl Into<String>,
        encoding: u32,
        extra_bits: u32,
    ) -> Self {
        Self {
            code: PortCode::new(unit_name, encoding, extra_bits, 0),
            port_name: port_name.into(),
            operation_name: None,
        }
    }

    /// Code for an opcode-setting port bound to `operation_name`.
    #[must_use]
    pub fn with_operation(
        unit_name: impl Into<String>,
        port_name: impl Into<String>,
        operation_name: impl Into<String>,
        encoding: u32,
        extra_bits: u32,
    ) -> Self {
        Self {
            code: PortCode::new(unit_name, encoding, extra_bits, 0),
            port_name: port_name.into(),
            operation_name: Some(operation_name.into()),
        }
    }

    /// Common port code fields.
    #[must_use]
    pub const fn code(&self) -> &PortCode {
        &self.code
    }

    /// Function unit name.
    #[must_use]
    pub fn unit_name(&self) -> &str {
        self.code.unit_name()
    }

    /// Port name.
    #[must_use]
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Bound operation, if the port selects one.
    #[must_use]
    pub fn operation_name(&self) -> Option<&str> {
        self.operation_name.as_deref()
    }

    /// Returns `true` if the code is keyed by `unit`, `port` and `operation`.
    ///
    /// Operation names compare case-insensitively.
    #[must_use]
    pub fn matches(&self, unit: &str, port: &str, operation: Option<&str>) -> bool {
        self.unit_name() == unit
            && self.port_name == port
            && match (self.operation_name.as_deref(), operation) {
                (None, None) => true,
                (Some(own), Some(other)) => own.eq_ignore_ascii_case(other),
                _ => false,
            }
    }

    /// Human-readable key used in error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.operation_name {
            Some(operation) => format!(
                "FU port code '{}.{}' operation '{operation}'",
                self.unit_name(),
                self.port_name
            ),
            None => format!("FU port code '{}.{}'", self.unit_name(), self.port_name),
        }
    }
}

/// Port code of a register file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RfPortCode(PortCode);

impl RfPortCode {
    /// Code with a fixed encoding followed by `index_width` index bits.
    #[must_use]
    pub fn new(unit_name: impl Into<String>, encoding: u32, extra_bits: u32, index_width: u32) -> Self {
        Self(PortCode::new(unit_name, encoding, extra_bits, index_width))
    }

    /// Index-only code; the table may hold nothing else.
    #[must_use]
    pub fn index_only(unit_name: impl Into<String>, index_width: u32) -> Self {
        Self(PortCode::index_only(unit_name, index_width))
    }

    /// Common port code fields.
    #[must_use]
    pub const fn code(&self) -> &PortCode {
        &self.0
    }

    /// Register file name.
    #[must_use]
    pub fn unit_name(&self) -> &str {
        self.0.unit_name()
    }

    /// Human-readable key used in error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        format!("RF port code '{}'", self.unit_name())
    }
}

/// Port code of an immediate unit.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct IuPortCode(PortCode);

impl IuPortCode {
    /// Code with a fixed encoding followed by `index_width` index bits.
    #[must_use]
    pub fn new(unit_name: impl Into<String>, encoding: u32, extra_bits: u32, index_width: u32) -> Self {
        Self(PortCode::new(unit_name, encoding, extra_bits, index_width))
    }

    /// Index-only code; the table may hold nothing else.
    #[must_use]
    pub fn index_only(unit_name: impl Into<String>, index_width: u32) -> Self {
        Self(PortCode::index_only(unit_name, index_width))
    }

    /// Common port code fields.
    #[must_use]
    pub const fn code(&self) -> &PortCode {
        &self.0
    }

    /// Immediate unit name.
    #[must_use]
    pub fn unit_name(&self) -> &str {
        self.0.unit_name()
    }

    /// Human-readable key used in error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        format!("IU port code '{}'", self.unit_name())
    }
}

#[cfg(test)]
mod tests {
    use super::{FuPortCode, IuPortCode, PortCode, RfPortCode};

    #[test]
    fn width_adds_encoding_padding_and_index() {
        let code = PortCode::new("RF", 5, 1, 4);
        assert_eq!(code.encoding_width(), 3);
        assert_eq!(code.extra_bits(), 1);
        assert_eq!(code.width(), 8);
        assert_eq!(PortCode::new("RF", 0, 0, 0).width(), 1);
    }

    #[test]
    fn index_only_code_has_no_fixed_bits() {
        let code = RfPortCode::index_only("RF", 5);
        assert!(!code.code().has_encoding());
        assert_eq!(code.code().encoding_width(), 0);
        assert_eq!(code.code().width(), 5);
        assert_eq!(IuPortCode::index_only("IU", 0).code().width(), 0);
    }

    #[test]
    fn fu_operation_keys_ignore_case() {
        let code = FuPortCode::with_operation("ALU", "in1t", "ADD", 2, 0);
        assert!(code.matches("ALU", "in1t", Some("add")));
        assert!(!code.matches("ALU", "in1t", None));
        assert!(!code.matches("ALU", "in2", Some("add")));

        let plain = FuPortCode::new("ALU", "in2", 1, 0);
        assert!(plain.matches("ALU", "in2", None));
        assert!(!plain.matches("ALU", "in2", Some("add")));
    }

    #[test]
    fn descriptions_name_the_key() {
        assert_eq!(
            FuPortCode::with_operation("ALU", "in1t", "add", 2, 0).describe(),
            "FU port code 'ALU.in1t' operation 'add'"
        );
        assert_eq!(RfPortCode::new("RF", 1, 0, 3).describe(), "RF port code 'RF'");
        assert_eq!(IuPortCode::new("IU", 1, 0, 3).describe(), "IU port code 'IU'");
    }
}
