//! Socket code tables and the arena that owns them.

use tracing::{debug, trace};

use crate::bits::{Alignment, Encoding};
use crate::collision::{can_add_port_encoding, find_ambiguous};
use crate::error::{BemError, BemResult};
use crate::port_code::{FuPortCode, IuPortCode, PortCode, RfPortCode};

/// Stable handle of a socket code table inside one encoding map.
///
/// Identifiers are never reused, so a handle to a removed table stays dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TableId(u32);

impl TableId {
    /// Raw identifier value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Named set of port codes shared by any number of socket encodings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SocketCodeTable {
    name: String,
    extra_bits: u32,
    fu_codes: Vec<FuPortCode>,
    rf_codes: Vec<RfPortCode>,
    iu_codes: Vec<IuPortCode>,
}

impl SocketCodeTable {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra_bits: 0,
            fu_codes: Vec::new(),
            rf_codes: Vec::new(),
            iu_codes: Vec::new(),
        }
    }

    /// Table name, unique within its encoding map.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Literal zero bits above the widest code.
    #[must_use]
    pub const fn extra_bits(&self) -> u32 {
        self.extra_bits
    }

    /// Sets the padding bits.
    pub const fn set_extra_bits(&mut self, bits: u32) {
        self.extra_bits = bits;
    }

    /// Width of the table: extra bits plus the widest port code.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.extra_bits.saturating_add(self.max_code_width())
    }

    /// Width of the widest port code; zero for an empty table.
    #[must_use]
    pub fn max_code_width(&self) -> u32 {
        self.port_codes().map(PortCode::width).max().unwrap_or(0)
    }

    /// Total number of port codes of all kinds.
    #[must_use]
    pub fn port_code_count(&self) -> usize {
        self.fu_codes.len() + self.rf_codes.len() + self.iu_codes.len()
    }

    /// Common fields of every port code, FU codes first.
    pub fn port_codes(&self) -> impl Iterator<Item = &PortCode> {
        self.fu_codes
            .iter()
            .map(FuPortCode::code)
            .chain(self.rf_codes.iter().map(RfPortCode::code))
            .chain(self.iu_codes.iter().map(IuPortCode::code))
    }

    /// Labelled port-identifying patterns of the committed codes.
    pub(crate) fn port_encodings(&self) -> impl Iterator<Item = (String, Encoding)> + '_ {
        let fu = self
            .fu_codes
            .iter()
            .filter_map(|code| code.code().encoding().map(|enc| (code.describe(), enc)));
        let rf = self
            .rf_codes
            .iter()
            .filter_map(|code| code.code().encoding().map(|enc| (code.describe(), enc)));
        let iu = self
            .iu_codes
            .iter()
            .filter_map(|code| code.code().encoding().map(|enc| (code.describe(), enc)));
        fu.chain(rf).chain(iu)
    }

    fn owner(&self) -> String {
        format!("socket code table '{}'", self.name)
    }

    /// Validates the parts of a candidate common to every code kind.
    fn check_candidate(&self, code: &PortCode, item: &str, duplicate: bool) -> BemResult<()> {
        let error = if self.port_codes().any(|existing| !existing.has_encoding()) {
            Some(BemError::name_conflict(
                item,
                format!("{} (table holds an encoding-less code)", self.owner()),
            ))
        } else if !code.has_encoding() && self.port_code_count() > 0 {
            Some(BemError::name_conflict(
                item,
                format!("{} (encoding-less code must be the only entry)", self.owner()),
            ))
        } else if duplicate {
            Some(BemError::name_conflict(item, self.owner()))
        } else if !can_add_port_encoding(self, code) {
            let existing = code
                .encoding()
                .and_then(|enc| find_ambiguous(enc, self.port_encodings(), Alignment::Left))
                .unwrap_or_default();
            Some(BemError::collision(item, existing, self.owner()))
        } else {
            None
        };
        match error {
            Some(err) => {
                debug!(table = %self.name, %err, "port code rejected");
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Adds a function unit port code.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::NameConflict`] for a duplicate key or an
    /// encoding-less conflict and [`BemError::EncodingCollision`] when the
    /// encoding is ambiguous with an existing code.
    pub fn add_fu_port_code(&mut self, code: FuPortCode) -> BemResult<&FuPortCode> {
        let duplicate = self.has_fu_port_code(code.unit_name(), code.port_name(), code.operation_name());
        self.check_candidate(code.code(), &code.describe(), duplicate)?;
        trace!(table = %self.name, code = %code.describe(), "port code added");
        self.fu_codes.push(code);
        Ok(&self.fu_codes[self.fu_codes.len() - 1])
    }

    /// Adds a register file port code.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_fu_port_code`]; RF codes are keyed by unit name.
    pub fn add_rf_port_code(&mut self, code: RfPortCode) -> BemResult<&RfPortCode> {
        let duplicate = self.has_rf_port_code(code.unit_name());
        self.check_candidate(code.code(), &code.describe(), duplicate)?;
        trace!(table = %self.name, code = %code.describe(), "port code added");
        self.rf_codes.push(code);
        Ok(&self.rf_codes[self.rf_codes.len() - 1])
    }

    /// Adds an immediate unit port code.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_fu_port_code`]; IU codes are keyed by unit name.
    pub fn add_iu_port_code(&mut self, code: IuPortCode) -> BemResult<&IuPortCode> {
        let duplicate = self.has_iu_port_code(code.unit_name());
        self.check_candidate(code.code(), &code.describe(), duplicate)?;
        trace!(table = %self.name, code = %code.describe(), "port code added");
        self.iu_codes.push(code);
        Ok(&self.iu_codes[self.iu_codes.len() - 1])
    }

    /// Removes and returns the FU port code keyed by unit, port and operation.
    pub fn remove_fu_port_code(
        &mut self,
        unit: &str,
        port: &str,
        operation: Option<&str>,
    ) -> Option<FuPortCode> {
        let index = self
            .fu_codes
            .iter()
            .position(|code| code.matches(unit, port, operation))?;
        Some(self.fu_codes.remove(index))
    }

    /// Removes and returns the RF port code of `unit`.
    pub fn remove_rf_port_code(&mut self, unit: &str) -> Option<RfPortCode> {
        let index = self.rf_codes.iter().position(|code| code.unit_name() == unit)?;
        Some(self.rf_codes.remove(index))
    }

    /// Removes and returns the IU port code of `unit`.
    pub fn remove_iu_port_code(&mut self, unit: &str) -> Option<IuPortCode> {
        let index = self.iu_codes.iter().position(|code| code.unit_name() == unit)?;
        Some(self.iu_codes.remove(index))
    }

    /// Looks up an FU port code; operation names compare case-insensitively.
    #[must_use]
    pub fn fu_port_code(&self, unit: &str, port: &str, operation: Option<&str>) -> Option<&FuPortCode> {
        self.fu_codes
            .iter()
            .find(|code| code.matches(unit, port, operation))
    }

    /// Returns `true` if an FU port code exists for the key.
    #[must_use]
    pub fn has_fu_port_code(&self, unit: &str, port: &str, operation: Option<&str>) -> bool {
        self.fu_port_code(unit, port, operation).is_some()
    }

    /// Looks up the RF port code of `unit`.
    #[must_use]
    pub fn rf_port_code(&self, unit: &str) -> Option<&RfPortCode> {
        self.rf_codes.iter().find(|code| code.unit_name() == unit)
    }

    /// Returns `true` if an RF port code exists for `unit`.
    #[must_use]
    pub fn has_rf_port_code(&self, unit: &str) -> bool {
        self.rf_port_code(unit).is_some()
    }

    /// Looks up the IU port code of `unit`.
    #[must_use]
    pub fn iu_port_code(&self, unit: &str) -> Option<&IuPortCode> {
        self.iu_codes.iter().find(|code| code.unit_name() == unit)
    }

    /// Returns `true` if an IU port code exists for `unit`.
    #[must_use]
    pub fn has_iu_port_code(&self, unit: &str) -> bool {
        self.iu_port_code(unit).is_some()
    }

    /// FU port codes in insertion order.
    #[must_use]
    pub fn fu_port_codes(&self) -> &[FuPortCode] {
        &self.fu_codes
    }

    /// RF port codes in insertion order.
    #[must_use]
    pub fn rf_port_codes(&self) -> &[RfPortCode] {
        &self.rf_codes
    }

    /// IU port codes in insertion order.
    #[must_use]
    pub fn iu_port_codes(&self) -> &[IuPortCode] {
        &self.iu_codes
    }

    /// FU port code by index.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::OutOfRange`] if `index` is past the end.
    pub fn fu_port_code_at(&self, index: usize) -> BemResult<&FuPortCode> {
        self.fu_codes
            .get(index)
            .ok_or_else(|| BemError::out_of_range("FU port code", index, self.fu_codes.len()))
    }

    /// RF port code by index.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::OutOfRange`] if `index` is past the end.
    pub fn rf_port_code_at(&self, index: usize) -> BemResult<&RfPortCode> {
        self.rf_codes
            .get(index)
            .ok_or_else(|| BemError::out_of_range("RF port code", index, self.rf_codes.len()))
    }

    /// IU port code by index.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::OutOfRange`] if `index` is past the end.
    pub fn iu_port_code_at(&self, index: usize) -> BemResult<&IuPortCode> {
        self.iu_codes
            .get(index)
            .ok_or_else(|| BemError::out_of_range("IU port code", index, self.iu_codes.len()))
    }
}

/// Arena of the socket code tables owned by one encoding map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SocketCodeTables {
    entries: Vec<(TableId, SocketCodeTable)>,
    next_id: u32,
}

impl SocketCodeTables {
    pub(crate) fn insert(&mut self, name: &str) -> BemResult<TableId> {
        if self.id_of(name).is_some() {
            let err = BemError::name_conflict(format!("socket code table '{name}'"), "encoding map");
            debug!(%err, "table rejected");
            return Err(err);
        }
        let id = TableId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, SocketCodeTable::new(name)));
        trace!(table = name, id = id.get(), "table added");
        Ok(id)
    }

    pub(crate) fn remove(&mut self, id: TableId) -> Option<SocketCodeTable> {
        let index = self.entries.iter().position(|(entry, _)| *entry == id)?;
        Some(self.entries.remove(index).1)
    }

    pub(crate) fn rename(&mut self, id: TableId, name: &str) -> BemResult<()> {
        match self.id_of(name) {
            Some(existing) if existing == id => return Ok(()),
            Some(_) => {
                return Err(BemError::name_conflict(
                    format!("socket code table '{name}'"),
                    "encoding map",
                ))
            }
            None => {}
        }
        let table = self
            .get_mut(id)
            .ok_or_else(|| BemError::not_found(format!("socket code table #{}", id.get()), "encoding map"))?;
        table.set_name(name.to_owned());
        Ok(())
    }

    /// Resolves a handle; `None` once the table has been removed.
    #[must_use]
    pub fn get(&self, id: TableId) -> Option<&SocketCodeTable> {
        self.entries
            .iter()
            .find(|(entry, _)| *entry == id)
            .map(|(_, table)| table)
    }

    /// Mutable access through a handle.
    pub fn get_mut(&mut self, id: TableId) -> Option<&mut SocketCodeTable> {
        self.entries
            .iter_mut()
            .find(|(entry, _)| *entry == id)
            .map(|(_, table)| table)
    }

    /// Handle of the table called `name`.
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<TableId> {
        self.entries
            .iter()
            .find(|(_, table)| table.name() == name)
            .map(|(id, _)| *id)
    }

    /// Number of live tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no table exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live tables with their handles, in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (TableId, &SocketCodeTable)> {
        self.entries.iter().map(|(id, table)| (*id, table))
    }

    /// Width of the table behind `id`; zero for a dead handle.
    #[must_use]
    pub fn width_of(&self, id: Option<TableId>) -> u32 {
        id.and_then(|id| self.get(id)).map_or(0, SocketCodeTable::width)
    }
}

#[cfg(test)]
mod tests {
    use super::{SocketCodeTable, SocketCodeTables};
    use crate::error::{BemError, ErrorClass};
    use crate::port_code::{FuPortCode, IuPortCode, RfPortCode};

    fn table() -> SocketCodeTable {
        SocketCodeTable::new("T")
    }

    #[test]
    fn width_is_extra_bits_plus_widest_code() {
        let mut table = table();
        assert_eq!(table.width(), 0);
        table.set_extra_bits(2);
        table
            .add_rf_port_code(RfPortCode::new("RF", 0, 0, 5))
            .expect("rf code fits");
        table
            .add_iu_port_code(IuPortCode::new("IU", 2, 1, 3))
            .expect("iu code fits");
        assert_eq!(table.max_code_width(), 6);
        assert_eq!(table.width(), 8);
    }

    #[test]
    fn encoding_less_code_must_be_alone() {
        let mut table = table();
        table
            .add_rf_port_code(RfPortCode::index_only("RF", 5))
            .expect("first code");
        let err = table
            .add_iu_port_code(IuPortCode::new("IU", 1, 0, 2))
            .expect_err("table already holds an encoding-less code");
        assert_eq!(err.class(), ErrorClass::Naming);

        let mut table = SocketCodeTable::new("U");
        table
            .add_rf_port_code(RfPortCode::new("RF", 1, 0, 5))
            .expect("first code");
        let err = table
            .add_iu_port_code(IuPortCode::index_only("IU", 2))
            .expect_err("encoding-less code needs an empty table");
        assert!(matches!(err, BemError::NameConflict { .. }));
    }

    #[test]
    fn duplicate_keys_conflict() {
        let mut table = table();
        table
            .add_fu_port_code(FuPortCode::with_operation("ALU", "in1t", "add", 0, 1))
            .expect("first code");
        let err = table
            .add_fu_port_code(FuPortCode::with_operation("ALU", "in1t", "ADD", 3, 0))
            .expect_err("operation names ignore case");
        assert!(matches!(err, BemError::NameConflict { .. }));
        table
            .add_fu_port_code(FuPortCode::with_operation("ALU", "in1t", "sub", 1, 1))
            .expect("distinct operation");
    }

    #[test]
    fn ambiguous_port_patterns_collide() {
        let mut table = table();
        table
            .add_rf_port_code(RfPortCode::new("RF1", 1, 0, 4))
            .expect("first code");
        let err = table
            .add_rf_port_code(RfPortCode::new("RF2", 3, 0, 2))
            .expect_err("'1' is a prefix of '11'");
        assert_eq!(
            err.to_string(),
            "encoding of RF port code 'RF2' is ambiguous with RF port code 'RF1' in socket code table 'T'"
        );
        assert_eq!(table.port_code_count(), 1);
        table
            .add_rf_port_code(RfPortCode::new("RF2", 1, 1, 2))
            .expect("'01' differs from '1'");
    }

    #[test]
    fn removal_and_indexed_access() {
        let mut table = table();
        table
            .add_fu_port_code(FuPortCode::new("LSU", "in1t", 0, 0))
            .expect("first code");
        assert!(table.fu_port_code_at(0).is_ok());
        assert!(matches!(
            table.fu_port_code_at(1),
            Err(BemError::OutOfRange { index: 1, count: 1, .. })
        ));
        assert!(table.remove_fu_port_code("LSU", "in1t", None).is_some());
        assert!(table.remove_fu_port_code("LSU", "in1t", None).is_none());
        assert_eq!(table.port_code_count(), 0);
    }

    #[test]
    fn arena_never_reuses_ids() {
        let mut tables = SocketCodeTables::default();
        let first = tables.insert("A").expect("new name");
        assert!(tables.insert("A").is_err());
        assert!(tables.remove(first).is_some());
        let second = tables.insert("A").expect("name is free again");
        assert_ne!(first, second);
        assert!(tables.get(first).is_none());
        assert_eq!(tables.get(second).map(SocketCodeTable::name), Some("A"));
    }

    #[test]
    fn rename_checks_uniqueness() {
        let mut tables = SocketCodeTables::default();
        let a = tables.insert("A").expect("new name");
        tables.insert("B").expect("new name");
        assert!(tables.rename(a, "B").is_err());
        tables.rename(a, "A").expect("same name");
        tables.rename(a, "C").expect("free name");
        assert_eq!(tables.id_of("C"), Some(a));
    }
}
