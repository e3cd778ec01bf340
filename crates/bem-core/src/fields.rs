//! Long-immediate related top-level fields.

use tracing::{debug, trace};

use crate::bits::required_bits;
use crate::error::{BemError, BemResult};

/// Field carrying (part of) a long immediate value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ImmediateSlotField {
    name: String,
    extra_bits: u32,
    bit_width: u32,
}

impl ImmediateSlotField {
    pub(crate) fn new(name: &str, bit_width: u32) -> Self {
        Self {
            name: name.to_owned(),
            extra_bits: 0,
            bit_width,
        }
    }

    /// Immediate slot name, unique among immediate slots.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        name.clone_into(&mut self.name);
    }

    /// Bits reserved for the immediate value.
    #[must_use]
    pub const fn bit_width(&self) -> u32 {
        self.bit_width
    }

    /// Sets the bits reserved for the immediate value.
    pub const fn set_bit_width(&mut self, width: u32) {
        self.bit_width = width;
    }

    /// Literal zero bits above the value.
    #[must_use]
    pub const fn extra_bits(&self) -> u32 {
        self.extra_bits
    }

    /// Sets the padding bits.
    pub const fn set_extra_bits(&mut self, bits: u32) {
        self.extra_bits = bits;
    }

    /// Value bits plus extra bits.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.bit_width.saturating_add(self.extra_bits)
    }
}

/// Field selecting the instruction template of an instruction word.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ImmediateControlField {
    extra_bits: u32,
    templates: Vec<(String, u32)>,
}

impl ImmediateControlField {
    const OWNER: &'static str = "immediate control field";

    /// Literal zero bits above the widest encoding.
    #[must_use]
    pub const fn extra_bits(&self) -> u32 {
        self.extra_bits
    }

    /// Sets the padding bits.
    pub const fn set_extra_bits(&mut self, bits: u32) {
        self.extra_bits = bits;
    }

    /// Assigns `encoding` to instruction template `template`.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::NameConflict`] if the template already has an
    /// encoding and [`BemError::EncodingCollision`] if another template uses
    /// the same value.
    pub fn add_template_encoding(&mut self, template: &str, encoding: u32) -> BemResult<()> {
        let item = format!("template '{template}'");
        let err = if self.has_template_encoding(template) {
            BemError::name_conflict(item, Self::OWNER)
        } else if let Some((existing, _)) = self.templates.iter().find(|(_, value)| *value == encoding) {
            BemError::collision(item, format!("template '{existing}'"), Self::OWNER)
        } else {
            trace!(template, encoding, "template encoding added");
            self.templates.push((template.to_owned(), encoding));
            return Ok(());
        };
        debug!(%err, "template encoding rejected");
        Err(err)
    }

    /// Removes the encoding of `template` and returns it.
    pub fn remove_template_encoding(&mut self, template: &str) -> Option<u32> {
        let index = self.templates.iter().position(|(name, _)| name == template)?;
        Some(self.templates.remove(index).1)
    }

    /// Encoding of `template`, if assigned.
    #[must_use]
    pub fn template_encoding(&self, template: &str) -> Option<u32> {
        self.templates
            .iter()
            .find(|(name, _)| name == template)
            .map(|(_, value)| *value)
    }

    /// Returns `true` if `template` has an encoding.
    #[must_use]
    pub fn has_template_encoding(&self, template: &str) -> bool {
        self.template_encoding(template).is_some()
    }

    /// Templates and their encodings in insertion order.
    pub fn template_encodings(&self) -> impl Iterator<Item = (&str, u32)> {
        self.templates.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Number of encoded templates.
    #[must_use]
    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    /// Widest encoding plus extra bits; extra bits only when empty.
    #[must_use]
    pub fn width(&self) -> u32 {
        let widest = self
            .templates
            .iter()
            .map(|(_, value)| required_bits(*value))
            .max()
            .unwrap_or(0);
        widest.saturating_add(self.extra_bits)
    }
}

/// Field naming the destination register of a long immediate.
///
/// Each instruction template using the field maps to the immediate unit the
/// register index refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct LImmDstRegisterField {
    extra_bits: u32,
    bit_width: u32,
    destinations: Vec<(String, String)>,
}

impl LImmDstRegisterField {
    const OWNER: &'static str = "long immediate destination register field";

    pub(crate) const fn new(bit_width: u32) -> Self {
        Self {
            extra_bits: 0,
            bit_width,
            destinations: Vec::new(),
        }
    }

    /// Bits of the register index.
    #[must_use]
    pub const fn bit_width(&self) -> u32 {
        self.bit_width
    }

    /// Sets the bits of the register index.
    pub const fn set_bit_width(&mut self, width: u32) {
        self.bit_width = width;
    }

    /// Literal zero bits above the index.
    #[must_use]
    pub const fn extra_bits(&self) -> u32 {
        self.extra_bits
    }

    /// Sets the padding bits.
    pub const fn set_extra_bits(&mut self, bits: u32) {
        self.extra_bits = bits;
    }

    /// Records that `template` writes its long immediate to `unit`.
    ///
    /// # Errors
    ///
    /// Returns [`BemError::NameConflict`] if `template` already has a
    /// destination in this field.
    pub fn add_immediate_destination(&mut self, template: &str, unit: &str) -> BemResult<()> {
        if self.uses_template(template) {
            let err = BemError::name_conflict(format!("template '{template}'"), Self::OWNER);
            debug!(%err, "immediate destination rejected");
            return Err(err);
        }
        trace!(template, unit, "immediate destination added");
        self.destinations.push((template.to_owned(), unit.to_owned()));
        Ok(())
    }

    /// Removes the destination of `template` and returns the unit name.
    pub fn remove_immediate_destination(&mut self, template: &str) -> Option<String> {
        let index = self.destinations.iter().position(|(name, _)| name == template)?;
        Some(self.destinations.remove(index).1)
    }

    /// Returns `true` if `template` uses this field.
    #[must_use]
    pub fn uses_template(&self, template: &str) -> bool {
        self.immediate_unit(template).is_some()
    }

    /// Destination immediate unit of `template`.
    #[must_use]
    pub fn immediate_unit(&self, template: &str) -> Option<&str> {
        self.destinations
            .iter()
            .find(|(name, _)| name == template)
            .map(|(_, unit)| unit.as_str())
    }

    /// Templates and their destination units in insertion order.
    pub fn immediate_destinations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.destinations
            .iter()
            .map(|(template, unit)| (template.as_str(), unit.as_str()))
    }

    /// Index bits plus extra bits.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.bit_width.saturating_add(self.extra_bits)
    }
}
