//! Schema-driven parameter set
//!
//! A [`ParameterSet`] stores one optional value per row of its schema table.
//! `None` means "absent": inherit from the next source in the compose chain.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use super::schema::{FieldSpec, BASELINE_FIELDS, DEGRADATION_FIELDS};
use crate::{Error, Result};

/// Flat external record: unit-annotated key to value (`None` = absent).
pub type ParameterRecord = BTreeMap<String, Option<f64>>;

/// A static schema table a [`ParameterSet`] is laid out against.
pub trait Schema: 'static {
    /// Human-readable name used in log lines
    const NAME: &'static str;

    /// Ordered schema rows
    fn fields() -> &'static [FieldSpec];

    /// Position of a field, looked up by internal name or external key.
    fn position(name_or_key: &str) -> Option<usize> {
        Self::fields()
            .iter()
            .position(|f| f.name == name_or_key || f.key == name_or_key)
    }
}

/// Marker for the baseline (non-degradation) schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Baseline {}

impl Schema for Baseline {
    const NAME: &'static str = "non-degradation";

    fn fields() -> &'static [FieldSpec] {
        BASELINE_FIELDS
    }
}

/// Marker for the degradation overlay schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degradation {}

impl Schema for Degradation {
    const NAME: &'static str = "degradation";

    fn fields() -> &'static [FieldSpec] {
        DEGRADATION_FIELDS
    }
}

/// Baseline parameters (required in every run).
pub type BaselineParameters = ParameterSet<Baseline>;

/// Degradation overlay (presence switches the run into degradation mode).
pub type DegradationOverlay = ParameterSet<Degradation>;

/// Positional set of optional values for one schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet<S: Schema> {
    values: Vec<Option<f64>>,
    _schema: PhantomData<S>,
}

impl<S: Schema> ParameterSet<S> {
    /// Set with every field absent.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            values: vec![None; S::fields().len()],
            _schema: PhantomData,
        }
    }

    /// Set with every field at its documented default.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            values: S::fields().iter().map(|f| Some(f.default)).collect(),
            _schema: PhantomData,
        }
    }

    /// Whether `name_or_key` belongs to this schema.
    #[must_use]
    pub fn knows(name_or_key: &str) -> bool {
        S::position(name_or_key).is_some()
    }

    /// Value of a field, `None` if absent or unknown.
    #[must_use]
    pub fn get(&self, name_or_key: &str) -> Option<f64> {
        S::position(name_or_key).and_then(|i| self.values[i])
    }

    /// Set (or clear, with `None`) a field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownParameter`] if the field is not in the schema.
    /// The value itself is not validated here; see [`Self::validate`].
    pub fn set(&mut self, name_or_key: &str, value: Option<f64>) -> Result<()> {
        let index = S::position(name_or_key)
            .ok_or_else(|| Error::UnknownParameter(name_or_key.to_string()))?;
        self.values[index] = value;
        Ok(())
    }

    /// True when every field is absent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    /// Iterate over present fields in schema order.
    pub fn present(&self) -> impl Iterator<Item = (&'static FieldSpec, f64)> + '_ {
        S::fields()
            .iter()
            .zip(&self.values)
            .filter_map(|(spec, value)| value.map(|v| (spec, v)))
    }

    /// Per-field precedence: `overrides`, then `saved`, then the default.
    #[must_use]
    pub fn compose(saved: Option<&Self>, overrides: Option<&Self>) -> Self {
        let values = S::fields()
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                overrides
                    .and_then(|o| o.values[i])
                    .or_else(|| saved.and_then(|s| s.values[i]))
                    .or(Some(spec.default))
            })
            .collect();
        Self {
            values,
            _schema: PhantomData,
        }
    }

    /// Check that every present value is finite and non-negative.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        for (spec, value) in self.present() {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Validation {
                    field: spec.name.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }

    /// Map every schema field to its external key.
    #[must_use]
    pub fn to_record(&self) -> ParameterRecord {
        S::fields()
            .iter()
            .zip(&self.values)
            .map(|(spec, value)| (spec.key.to_string(), *value))
            .collect()
    }

    /// Exact inverse of [`Self::to_record`]. Keys outside the table are ignored.
    #[must_use]
    pub fn from_record(record: &ParameterRecord) -> Self {
        let values = S::fields()
            .iter()
            .map(|spec| record.get(spec.key).copied().flatten())
            .collect();
        Self {
            values,
            _schema: PhantomData,
        }
    }
}

impl<S: Schema> Default for ParameterSet<S> {
    fn default() -> Self {
        Self::empty()
    }
}

// Serialized as a flat map in schema order, absent values as null.
impl<S: Schema> Serialize for ParameterSet<S> {
    fn serialize<Z: Serializer>(&self, serializer: Z) -> std::result::Result<Z::Ok, Z::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (spec, value) in S::fields().iter().zip(&self.values) {
            map.serialize_entry(spec.key, value)?;
        }
        map.end()
    }
}

impl<'de, S: Schema> Deserialize<'de> for ParameterSet<S> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RecordVisitor<S>(PhantomData<S>);

        impl<'de, S: Schema> Visitor<'de> for RecordVisitor<S> {
            type Value = ParameterSet<S>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a map of {} parameter keys to numbers or null", S::NAME)
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut set = ParameterSet::<S>::empty();
                while let Some(key) = access.next_key::<String>()? {
                    let value: Option<f64> = access.next_value()?;
                    if let Some(index) = S::fields().iter().position(|f| f.key == key) {
                        set.values[index] = value;
                    }
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(RecordVisitor(PhantomData))
    }
}
