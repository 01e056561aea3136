//! Parameter Store
//!
//! Composes, validates and (de)serializes the two parameter sets of a run:
//!
//! ```text
//! ModelParameters
//!   ├── baseline: BaselineParameters        (always present)
//!   └── overlay:  Option<DegradationOverlay> (Some => degradation mode)
//! ```
//!
//! Precedence when composing, per field: command overrides, then the saved
//! parameter file, then the documented default from the schema table.
//!
//! ## Usage
//!
//! ```rust
//! use cyclefit::params::ModelParameters;
//!
//! let overrides = ModelParameters::from_assignments([
//!     ("electrode_height", 0.07),
//!     ("Lithium plating transfer coefficient", 0.6),
//! ])?;
//! let params = ModelParameters::compose(None, Some(&overrides))?;
//!
//! assert!(params.is_degradation_mode());
//! assert_eq!(params.baseline().get("electrode_height"), Some(0.07));
//! # Ok::<(), cyclefit::Error>(())
//! ```

mod schema;
mod set;

pub use schema::{FieldSpec, BASELINE_FIELDS, DEGRADATION_FIELDS};
pub use set::{
    Baseline, BaselineParameters, Degradation, DegradationOverlay, ParameterRecord,
    ParameterSet, Schema,
};

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{Error, Result};

/// Both parameter sets of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    #[serde(rename = "non_degradation_parameters")]
    baseline: BaselineParameters,
    #[serde(rename = "degradation_parameters", default)]
    overlay: Option<DegradationOverlay>,
}

impl ModelParameters {
    /// Build from explicit sets, validating every present field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if a present value is negative or not finite.
    pub fn new(baseline: BaselineParameters, overlay: Option<DegradationOverlay>) -> Result<Self> {
        let params = Self { baseline, overlay };
        params.validate()?;
        Ok(params)
    }

    /// Baseline defaults, no degradation overlay.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            baseline: BaselineParameters::defaults(),
            overlay: None,
        }
    }

    /// Compose saved and override parameters.
    ///
    /// Applied independently to the baseline and the overlay. The overlay exists
    /// in the result only if either source carries a non-empty overlay.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the composed result is invalid.
    pub fn compose(saved: Option<&Self>, overrides: Option<&Self>) -> Result<Self> {
        if saved.is_some() {
            info!("Composing command overrides over saved parameter file");
        } else {
            info!("Using command parameters over schema defaults");
        }

        let baseline = BaselineParameters::compose(
            saved.map(|s| &s.baseline),
            overrides.map(|o| &o.baseline),
        );

        let saved_overlay = saved
            .and_then(|s| s.overlay.as_ref())
            .filter(|o| !o.is_empty());
        let override_overlay = overrides
            .and_then(|o| o.overlay.as_ref())
            .filter(|o| !o.is_empty());
        let overlay = if saved_overlay.is_some() || override_overlay.is_some() {
            Some(DegradationOverlay::compose(saved_overlay, override_overlay))
        } else {
            None
        };

        Self::new(baseline, overlay)
    }

    /// Build an overrides set from `(name, value)` pairs.
    ///
    /// Each name is routed to the baseline or overlay schema by internal name
    /// or external key. Values are not defaulted; absent fields stay absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownParameter`] for a name in neither schema.
    pub fn from_assignments<I, K>(assignments: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let mut baseline = BaselineParameters::empty();
        let mut overlay = DegradationOverlay::empty();
        for (name, value) in assignments {
            let name = name.as_ref();
            if BaselineParameters::knows(name) {
                baseline.set(name, Some(value))?;
            } else if DegradationOverlay::knows(name) {
                overlay.set(name, Some(value))?;
            } else {
                return Err(Error::UnknownParameter(name.to_string()));
            }
        }
        let overlay = (!overlay.is_empty()).then_some(overlay);
        Ok(Self { baseline, overlay })
    }

    /// Parse one `NAME=VALUE` assignment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the text has no `=` or the value is not a number.
    pub fn parse_assignment(text: &str) -> Result<(String, f64)> {
        let (name, value) = text
            .split_once('=')
            .ok_or_else(|| Error::Config(format!("Expected NAME=VALUE, got '{text}'")))?;
        let value: f64 = value.trim().parse().map_err(|e| {
            Error::Config(format!("Parameter '{}' has a non-numeric value: {e}", name.trim()))
        })?;
        Ok((name.trim().to_string(), value))
    }

    /// Validate both sets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the offending field and value.
    pub fn validate(&self) -> Result<()> {
        self.baseline.validate()?;
        if let Some(overlay) = &self.overlay {
            overlay.validate()?;
        }
        Ok(())
    }

    /// Baseline parameters.
    #[must_use]
    pub const fn baseline(&self) -> &BaselineParameters {
        &self.baseline
    }

    /// Degradation overlay, if present.
    #[must_use]
    pub const fn overlay(&self) -> Option<&DegradationOverlay> {
        self.overlay.as_ref()
    }

    /// Whether degradation physics are modelled (overlay present).
    #[must_use]
    pub const fn is_degradation_mode(&self) -> bool {
        self.overlay.is_some()
    }

    /// Update one baseline field.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown field or an invalid value; the set is
    /// left unchanged in that case.
    pub fn update_baseline(&mut self, name: &str, value: f64) -> Result<()> {
        let mut next = self.baseline.clone();
        next.set(name, Some(value))?;
        next.validate()?;
        self.baseline = next;
        Ok(())
    }

    /// Update one overlay field. Returns `false` (and logs) when the run has
    /// no overlay; updates never switch a run into degradation mode.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown field or an invalid value.
    pub fn update_overlay(&mut self, name: &str, value: f64) -> Result<bool> {
        let Some(overlay) = &self.overlay else {
            warn!(field = name, "Degradation update ignored: no degradation parameters set");
            return Ok(false);
        };
        let mut next = overlay.clone();
        next.set(name, Some(value))?;
        next.validate()?;
        self.overlay = Some(next);
        Ok(true)
    }

    /// Present values of both sets merged into one key-value record, the form
    /// handed to the simulation engine.
    #[must_use]
    pub fn to_flat_record(&self) -> BTreeMap<String, f64> {
        let overlay = self.overlay.iter().flat_map(ParameterSet::present);
        self.baseline
            .present()
            .chain(overlay)
            .map(|(spec, value)| (spec.key.to_string(), value))
            .collect()
    }

    /// Serialize to the namespaced JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] on serialization failure.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from the namespaced JSON document (not validated).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a parameter file. `Ok(None)` when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(json) => {
                info!(path = %path.display(), "Parameter file found");
                Self::from_json(&json).map(Some)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "Parameter file not found");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write the parameter file only if nothing exists at `path` yet.
    ///
    /// Returns `true` when the file was written, `false` when a file was
    /// already present (it is never overwritten).
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub fn save_once_if_absent<P: AsRef<Path>>(&self, path: P) -> Result<bool> {
        let path = path.as_ref();
        if path.exists() {
            info!(path = %path.display(), "Parameter file already exists, not overwriting");
            return Ok(false);
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = self.to_json()?;
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        info!(path = %path.display(), "Model parameters saved");
        Ok(true)
    }
}
