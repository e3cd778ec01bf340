//! Guard field of a move slot.

use tracing::{debug, trace};

use crate::bits::required_bits;
use crate::error::{BemError, BemResult};

/// Guard on a general-purpose register.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct GprGuardEncoding {
    register_file: String,
    register_index: u32,
    inverted: bool,
    encoding: u32,
}

impl GprGuardEncoding {
    /// Creates a register guard encoding.
    #[must_use]
    pub fn new(register_file: impl Into<String>, register_index: u32, inverted: bool, encoding: u32) -> Self {
        Self {
            register_file: register_file.into(),
            register_index,
            inverted,
            encoding,
        }
    }

    /// Register file name.
    #[must_use]
    pub fn register_file(&self) -> &str {
        &self.register_file
    }

    /// Guarded register index.
    #[must_use]
    pub const fn register_index(&self) -> u32 {
        self.register_index
    }

    /// Whether the guard is inverted.
    #[must_use]
    pub const fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// Guard field value selecting this guard.
    #[must_use]
    pub const fn encoding(&self) -> u32 {
        self.encoding
    }

    fn describe(&self) -> String {
        format!(
            "{}guard on register {}.{}",
            inversion(self.inverted),
            self.register_file,
            self.register_index
        )
    }
}

/// Guard on a function unit output port.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct FuGuardEncoding {
    unit_name: String,
    port_name: String,
    inverted: bool,
    encoding: u32,
}

impl FuGuardEncoding {
    /// Creates a port guard encoding.
    #[must_use]
    pub fn new(unit_name: impl Into<String>, port_name: impl Into<String>, inverted: bool, encoding: u32) -> Self {
        Self {
            unit_name: unit_name.into(),
            port_name: port_name.into(),
            inverted,
            encoding,
        }
    }

    /// Function unit name.
    #[must_use]
    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }

    /// Guarded port name.
    #[must_use]
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Whether the guard is inverted.
    #[must_use]
    pub const fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// Guard field value selecting this guard.
    #[must_use]
    pub const fn encoding(&self) -> u32 {
        self.encoding
    }

    fn describe(&self) -> String {
        format!(
            "{}guard on port {}.{}",
            inversion(self.inverted),
            self.unit_name,
            self.port_name
        )
    }
}

/// Always-true (non-inverted) or always-false (inverted) guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct UnconditionalGuardEncoding {
    inverted: bool,
    encoding: u32,
}

impl UnconditionalGuardEncoding {
    /// Creates an unconditional guard encoding.
    #[must_use]
    pub const fn new(inverted: bool, encoding: u32) -> Self {
        Self { inverted, encoding }
    }

    /// `true` for the always-false guard.
    #[must_use]
    pub const fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// Guard field value selecting this guard.
    #[must_use]
    pub const fn encoding(&self) -> u32 {
        self.encoding
    }

    fn describe(self) -> String {
        if self.inverted {
            "always-false guard".to_owned()
        } else {
            "always-true guard".to_owned()
        }
    }
}

const fn inversion(inverted: bool) -> &'static str {
    if inverted {
        "inverted "
    } else {
        ""
    }
}

/// Guard field: the whole field value selects one guard expression.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct GuardField {
    bus_name: String,
    extra_bits: u32,
    gpr: Vec<GprGuardEncoding>,
    fu: Vec<FuGuardEncoding>,
    unconditional: Vec<UnconditionalGuardEncoding>,
}

impl GuardField {
    pub(crate) fn new(bus_name: &str) -> Self {
        Self {
            bus_name: bus_name.to_owned(),
            extra_bits: 0,
            gpr: Vec::new(),
            fu: Vec::new(),
            unconditional: Vec::new(),
        }
    }

    pub(crate) fn set_bus_name(&mut self, name: &str) {
        name.clone_into(&mut self.bus_name);
    }

    fn owner(&self) -> String {
        format!("guard field of bus '{}'", self.bus_name)
    }

    /// Literal zero bits above the widest guard value.
    #[must_use]
    pub const fn extra_bits(&self) -> u32 {
        self.extra_bits
    }

    /// Sets the padding bits.
    pub const fn set_extra_bits(&mut self, bits: u32) {
        self.extra_bits = bits;
    }

    /// Labelled values of every committed guard.
    fn assigned(&self) -> impl Iterator<Item = (String, u32)> + '_ {
        let gpr = self.gpr.iter().map(|enc| (enc.describe(), enc.encoding));
        let fu = self.fu.iter().map(|enc| (enc.describe(), enc.encoding));
        let unconditional = self
            .unconditional
            .iter()
            .map(|enc| (enc.describe(), enc.encoding));
        gpr.chain(fu).chain(unconditional)
    }

    /// Returns `true` if some guard already uses `encoding`.
    #[must_use]
    pub fn is_assigned(&self, encoding: u32) -> bool {
        self.assigned().any(|(_, value)| value == encoding)
    }

    fn check(&self, item: &str, duplicate: bool, encoding: u32) -> BemResult<()> {
        let err = if duplicate {
            BemError::name_conflict(item, self.owner())
        } else if let Some((existing, _)) = self.assigned().find(|(_, value)| *value == encoding) {
            BemError::collision(item, existing, self.owner())
        } else {
            return Ok(());
        };
        debug!(%err, "guard encoding rejected");
        Err(err)
    }

    /// Adds a register guard.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::NameConflict`] if the guard expression is already
    /// encoded and [`BemError::EncodingCollision`] if the value is taken.
    pub fn add_gpr_guard_encoding(&mut self, encoding: GprGuardEncoding) -> BemResult<&GprGuardEncoding> {
        let duplicate = self.has_gpr_guard_encoding(
            &encoding.register_file,
            encoding.register_index,
            encoding.inverted,
        );
        self.check(&encoding.describe(), duplicate, encoding.encoding)?;
        trace!(field = %self.owner(), guard = %encoding.describe(), "guard encoding added");
        self.gpr.push(encoding);
        Ok(&self.gpr[self.gpr.len() - 1])
    }

    /// Adds a port guard.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_gpr_guard_encoding`].
    pub fn add_fu_guard_encoding(&mut self, encoding: FuGuardEncoding) -> BemResult<&FuGuardEncoding> {
        let duplicate =
            self.has_fu_guard_encoding(&encoding.unit_name, &encoding.port_name, encoding.inverted);
        self.check(&encoding.describe(), duplicate, encoding.encoding)?;
        trace!(field = %self.owner(), guard = %encoding.describe(), "guard encoding added");
        self.fu.push(encoding);
        Ok(&self.fu[self.fu.len() - 1])
    }

    /// Adds the always-true or always-false guard.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_gpr_guard_encoding`]; at most one unconditional
    /// guard exists per inversion flag.
    pub fn add_unconditional_guard_encoding(
        &mut self,
        encoding: UnconditionalGuardEncoding,
    ) -> BemResult<UnconditionalGuardEncoding> {
        let duplicate = self.unconditional_guard_encoding(encoding.inverted).is_some();
        self.check(&encoding.describe(), duplicate, encoding.encoding)?;
        trace!(field = %self.owner(), guard = %encoding.describe(), "guard encoding added");
        self.unconditional.push(encoding);
        Ok(encoding)
    }

    /// Register guard for the key, if encoded.
    #[must_use]
    pub fn gpr_guard_encoding(&self, register_file: &str, index: u32, inverted: bool) -> Option<&GprGuardEncoding> {
        self.gpr.iter().find(|enc| {
            enc.register_file == register_file && enc.register_index == index && enc.inverted == inverted
        })
    }

    /// Returns `true` if the register guard is encoded.
    #[must_use]
    pub fn has_gpr_guard_encoding(&self, register_file: &str, index: u32, inverted: bool) -> bool {
        self.gpr_guard_encoding(register_file, index, inverted).is_some()
    }

    /// Port guard for the key, if encoded.
    #[must_use]
    pub fn fu_guard_encoding(&self, unit: &str, port: &str, inverted: bool) -> Option<&FuGuardEncoding> {
        self.fu
            .iter()
            .find(|enc| enc.unit_name == unit && enc.port_name == port && enc.inverted == inverted)
    }

    /// Returns `true` if the port guard is encoded.
    #[must_use]
    pub fn has_fu_guard_encoding(&self, unit: &str, port: &str, inverted: bool) -> bool {
        self.fu_guard_encoding(unit, port, inverted).is_some()
    }

    /// Unconditional guard with the given inversion, if encoded.
    #[must_use]
    pub fn unconditional_guard_encoding(&self, inverted: bool) -> Option<UnconditionalGuardEncoding> {
        self.unconditional
            .iter()
            .copied()
            .find(|enc| enc.inverted == inverted)
    }

    /// Removes and returns a register guard.
    pub fn remove_gpr_guard_encoding(
        &mut self,
        register_file: &str,
        index: u32,
        inverted: bool,
    ) -> Option<GprGuardEncoding> {
        let position = self.gpr.iter().position(|enc| {
            enc.register_file == register_file && enc.register_index == index && enc.inverted == inverted
        })?;
        Some(self.gpr.remove(position))
    }

    /// Removes and returns a port guard.
    pub fn remove_fu_guard_encoding(&mut self, unit: &str, port: &str, inverted: bool) -> Option<FuGuardEncoding> {
        let position = self
            .fu
            .iter()
            .position(|enc| enc.unit_name == unit && enc.port_name == port && enc.inverted == inverted)?;
        Some(self.fu.remove(position))
    }

    /// Removes and returns an unconditional guard.
    pub fn remove_unconditional_guard_encoding(&mut self, inverted: bool) -> Option<UnconditionalGuardEncoding> {
        let position = self.unconditional.iter().position(|enc| enc.inverted == inverted)?;
        Some(self.unconditional.remove(position))
    }

    /// Register guards in insertion order.
    #[must_use]
    pub fn gpr_guard_encodings(&self) -> &[GprGuardEncoding] {
        &self.gpr
    }

    /// Port guards in insertion order.
    #[must_use]
    pub fn fu_guard_encodings(&self) -> &[FuGuardEncoding] {
        &self.fu
    }

    /// Register guard by index.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::OutOfRange`] if `index` is past the end.
    pub fn gpr_guard_encoding_at(&self, index: usize) -> BemResult<&GprGuardEncoding> {
        self.gpr
            .get(index)
            .ok_or_else(|| BemError::out_of_range("GPR guard encoding", index, self.gpr.len()))
    }

    /// Port guard by index.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::OutOfRange`] if `index` is past the end.
    pub fn fu_guard_encoding_at(&self, index: usize) -> BemResult<&FuGuardEncoding> {
        self.fu
            .get(index)
            .ok_or_else(|| BemError::out_of_range("FU guard encoding", index, self.fu.len()))
    }

    /// Widest guard value plus extra bits.
    #[must_use]
    pub fn width(&self) -> u32 {
        let widest = self
            .assigned()
            .map(|(_, value)| required_bits(value))
            .max()
            .unwrap_or(0);
        widest.saturating_add(self.extra_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::{FuGuardEncoding, GprGuardEncoding, GuardField, UnconditionalGuardEncoding};
    use crate::error::BemError;

    #[test]
    fn duplicate_expression_conflicts_and_duplicate_value_collides() {
        let mut field = GuardField::new("B1");
        field
            .add_gpr_guard_encoding(GprGuardEncoding::new("BOOL", 0, false, 1))
            .expect("first guard");
        assert!(matches!(
            field.add_gpr_guard_encoding(GprGuardEncoding::new("BOOL", 0, false, 2)),
            Err(BemError::NameConflict { .. })
        ));
        let err = field
            .add_fu_guard_encoding(FuGuardEncoding::new("ALU", "out", true, 1))
            .expect_err("value 1 is taken");
        assert_eq!(
            err.to_string(),
            "encoding of inverted guard on port ALU.out is ambiguous with guard on register BOOL.0 in guard field of bus 'B1'"
        );
        field
            .add_gpr_guard_encoding(GprGuardEncoding::new("BOOL", 0, true, 2))
            .expect("inverted guard is a different expression");
    }

    #[test]
    fn one_unconditional_guard_per_inversion() {
        let mut field = GuardField::new("B1");
        field
            .add_unconditional_guard_encoding(UnconditionalGuardEncoding::new(false, 0))
            .expect("always-true");
        assert!(matches!(
            field.add_unconditional_guard_encoding(UnconditionalGuardEncoding::new(false, 3)),
            Err(BemError::NameConflict { .. })
        ));
        field
            .add_unconditional_guard_encoding(UnconditionalGuardEncoding::new(true, 3))
            .expect("always-false");
        assert_eq!(
            field.unconditional_guard_encoding(true).map(|enc| enc.encoding()),
            Some(3)
        );
        assert!(field.remove_unconditional_guard_encoding(false).is_some());
        assert!(!field.is_assigned(0));
    }

    #[test]
    fn width_is_widest_value_plus_extra_bits() {
        let mut field = GuardField::new("B1");
        assert_eq!(field.width(), 0);
        field.set_extra_bits(1);
        field
            .add_unconditional_guard_encoding(UnconditionalGuardEncoding::new(false, 0))
            .expect("always-true");
        field
            .add_gpr_guard_encoding(GprGuardEncoding::new("BOOL", 1, false, 5))
            .expect("register guard");
        assert_eq!(field.width(), 4);
        assert!(field.gpr_guard_encoding_at(1).is_err());
    }
}
