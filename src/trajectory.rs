//! Trajectory data model
//!
//! A [`Trajectory`] is a column-oriented, time-ordered table of samples for one
//! simulated or measured cycle. Columns always have equal length.
//!
//! Arrow conversion follows the storage layout used for reference files:
//! `relative_time, current, voltage, discharge_capacity: Float64`,
//! `step: Int64`. Any numeric Arrow type is accepted on read and cast.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, RecordBatch};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Step label of the constant-current discharge step (capacity tests, capacity metric).
pub const DISCHARGE_STEP: i64 = 4;

/// Step label of the drive-cycle step (linear-trend fit).
pub const DRIVE_CYCLE_STEP: i64 = 5;

/// One sample row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Seconds since cycle start
    pub relative_time: f64,
    /// Current [A]
    pub current: f64,
    /// Terminal voltage [V]
    pub voltage: f64,
    /// Cumulative discharge capacity [A.h]
    pub discharge_capacity: f64,
    /// Protocol step label
    pub step: i64,
}

/// Column-oriented cycle trajectory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Columns", into = "Columns")]
pub struct Trajectory {
    relative_time: Vec<f64>,
    current: Vec<f64>,
    voltage: Vec<f64>,
    discharge_capacity: Vec<f64>,
    step: Vec<i64>,
}

// Wire form; lengths are checked on the way in.
#[derive(Serialize, Deserialize)]
struct Columns {
    relative_time: Vec<f64>,
    current: Vec<f64>,
    voltage: Vec<f64>,
    discharge_capacity: Vec<f64>,
    step: Vec<i64>,
}

impl TryFrom<Columns> for Trajectory {
    type Error = Error;

    fn try_from(c: Columns) -> Result<Self> {
        Self::new(c.relative_time, c.current, c.voltage, c.discharge_capacity, c.step)
    }
}

impl From<Trajectory> for Columns {
    fn from(t: Trajectory) -> Self {
        Self {
            relative_time: t.relative_time,
            current: t.current,
            voltage: t.voltage,
            discharge_capacity: t.discharge_capacity,
            step: t.step,
        }
    }
}

impl Trajectory {
    /// Build from columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTrajectory`] if the columns differ in length.
    pub fn new(
        relative_time: Vec<f64>,
        current: Vec<f64>,
        voltage: Vec<f64>,
        discharge_capacity: Vec<f64>,
        step: Vec<i64>,
    ) -> Result<Self> {
        let n = relative_time.len();
        let lengths = [current.len(), voltage.len(), discharge_capacity.len(), step.len()];
        if lengths.iter().any(|&len| len != n) {
            return Err(Error::InvalidTrajectory(format!(
                "column lengths differ: relative_time={n}, current={}, voltage={}, discharge_capacity={}, step={}",
                lengths[0], lengths[1], lengths[2], lengths[3]
            )));
        }
        Ok(Self {
            relative_time,
            current,
            voltage,
            discharge_capacity,
            step,
        })
    }

    /// Build from rows.
    #[must_use]
    pub fn from_samples<I: IntoIterator<Item = Sample>>(samples: I) -> Self {
        let mut t = Self::default();
        for s in samples {
            t.relative_time.push(s.relative_time);
            t.current.push(s.current);
            t.voltage.push(s.voltage);
            t.discharge_capacity.push(s.discharge_capacity);
            t.step.push(s.step);
        }
        t
    }

    /// Number of samples
    #[must_use]
    pub fn len(&self) -> usize {
        self.relative_time.len()
    }

    /// True when there are no samples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.relative_time.is_empty()
    }

    /// Relative time column
    #[must_use]
    pub fn relative_time(&self) -> &[f64] {
        &self.relative_time
    }

    /// Current column
    #[must_use]
    pub fn current(&self) -> &[f64] {
        &self.current
    }

    /// Voltage column
    #[must_use]
    pub fn voltage(&self) -> &[f64] {
        &self.voltage
    }

    /// Discharge capacity column
    #[must_use]
    pub fn discharge_capacity(&self) -> &[f64] {
        &self.discharge_capacity
    }

    /// Step label column
    #[must_use]
    pub fn step(&self) -> &[i64] {
        &self.step
    }

    /// Rows whose step label equals `step`, in original order.
    #[must_use]
    pub fn filter_step(&self, step: i64) -> Self {
        let keep: Vec<usize> = (0..self.len()).filter(|&i| self.step[i] == step).collect();
        let pick = |col: &[f64]| keep.iter().map(|&i| col[i]).collect::<Vec<_>>();
        Self {
            relative_time: pick(&self.relative_time),
            current: pick(&self.current),
            voltage: pick(&self.voltage),
            discharge_capacity: pick(&self.discharge_capacity),
            step: vec![step; keep.len()],
        }
    }

    /// Copy with relative time shifted so the earliest sample is at zero.
    #[must_use]
    pub fn rebased(&self) -> Self {
        let start = self
            .relative_time
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        let mut out = self.clone();
        if start.is_finite() {
            for t in &mut out.relative_time {
                *t -= start;
            }
        }
        out
    }

    /// Arrow schema used for trajectory storage.
    #[must_use]
    pub fn arrow_schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("relative_time", DataType::Float64, false),
            Field::new("current", DataType::Float64, false),
            Field::new("voltage", DataType::Float64, false),
            Field::new("discharge_capacity", DataType::Float64, false),
            Field::new("step", DataType::Int64, false),
        ]))
    }

    /// Convert into a single record batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Arrow`] if the batch cannot be assembled.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Float64Array::from(self.relative_time.clone())),
            Arc::new(Float64Array::from(self.current.clone())),
            Arc::new(Float64Array::from(self.voltage.clone())),
            Arc::new(Float64Array::from(self.discharge_capacity.clone())),
            Arc::new(Int64Array::from(self.step.clone())),
        ];
        Ok(RecordBatch::try_new(Self::arrow_schema(), columns)?)
    }

    /// Read a trajectory from a record batch, looking columns up by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTrajectory`] if a column is missing or holds
    /// nulls, and [`Error::Arrow`] if a column cannot be cast.
    pub fn from_record_batch(batch: &RecordBatch) -> Result<Self> {
        Self::new(
            float_column(batch, "relative_time")?,
            float_column(batch, "current")?,
            float_column(batch, "voltage")?,
            float_column(batch, "discharge_capacity")?,
            step_column(batch)?,
        )
    }
}

fn named_column(batch: &RecordBatch, name: &str, to: &DataType) -> Result<ArrayRef> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| Error::InvalidTrajectory(format!("missing column '{name}'")))?;
    if column.null_count() > 0 {
        return Err(Error::InvalidTrajectory(format!(
            "column '{name}' contains {} null values",
            column.null_count()
        )));
    }
    Ok(cast(column, to)?)
}

fn float_column(batch: &RecordBatch, name: &str) -> Result<Vec<f64>> {
    let array = named_column(batch, name, &DataType::Float64)?;
    let values = array
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| Error::InvalidTrajectory(format!("column '{name}' is not numeric")))?;
    Ok(values.values().to_vec())
}

fn step_column(batch: &RecordBatch) -> Result<Vec<i64>> {
    let array = named_column(batch, "step", &DataType::Int64)?;
    let values = array
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| Error::InvalidTrajectory("column 'step' is not integral".to_string()))?;
    Ok(values.values().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float32Array, Int32Array};

    fn sample(t: f64, step: i64) -> Sample {
        Sample {
            relative_time: t,
            current: -1.0,
            voltage: 3.7,
            discharge_capacity: t / 3600.0,
            step,
        }
    }

    #[test]
    fn test_new_rejects_ragged_columns() {
        let err = Trajectory::new(
            vec![0.0, 1.0],
            vec![0.0],
            vec![0.0, 0.0],
            vec![0.0, 0.0],
            vec![1, 1],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidTrajectory(_)));
    }

    #[test]
    fn test_filter_step_and_rebase() {
        let t = Trajectory::from_samples([
            sample(0.0, 1),
            sample(10.0, 2),
            sample(20.0, 2),
            sample(30.0, 3),
        ]);
        let step2 = t.filter_step(2);
        assert_eq!(step2.len(), 2);
        assert_eq!(step2.relative_time(), &[10.0, 20.0]);
        assert_eq!(step2.rebased().relative_time(), &[0.0, 10.0]);
        assert!(t.filter_step(9).is_empty());
    }

    #[test]
    fn test_rebase_empty_is_noop() {
        assert!(Trajectory::default().rebased().is_empty());
    }

    #[test]
    fn test_serde_rejects_ragged_json() {
        let json = r#"{"relative_time":[0.0],"current":[],"voltage":[0.0],"discharge_capacity":[0.0],"step":[1]}"#;
        assert!(serde_json::from_str::<Trajectory>(json).is_err());
    }

    #[test]
    fn test_record_batch_round_trip() {
        let t = Trajectory::from_samples([sample(0.0, 4), sample(5.0, 5)]);
        let batch = t.to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(Trajectory::from_record_batch(&batch).unwrap(), t);
    }

    #[test]
    fn test_from_record_batch_casts_narrow_types() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("relative_time", DataType::Float32, false),
            Field::new("current", DataType::Float64, false),
            Field::new("voltage", DataType::Float64, false),
            Field::new("discharge_capacity", DataType::Float64, false),
            Field::new("step", DataType::Int32, false),
            Field::new("temperature", DataType::Float64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Float32Array::from(vec![0.0_f32, 0.5])),
                Arc::new(Float64Array::from(vec![1.0, 1.0])),
                Arc::new(Float64Array::from(vec![3.9, 3.8])),
                Arc::new(Float64Array::from(vec![0.0, 0.1])),
                Arc::new(Int32Array::from(vec![4, 4])),
                Arc::new(Float64Array::from(vec![298.0, 298.1])),
            ],
        )
        .unwrap();
        let t = Trajectory::from_record_batch(&batch).unwrap();
        assert_eq!(t.relative_time(), &[0.0, 0.5]);
        assert_eq!(t.step(), &[4, 4]);
    }

    #[test]
    fn test_from_record_batch_missing_column() {
        let schema = Arc::new(Schema::new(vec![Field::new(
            "relative_time",
            DataType::Float64,
            false,
        )]));
        let batch =
            RecordBatch::try_new(schema, vec![Arc::new(Float64Array::from(vec![0.0]))]).unwrap();
        let err = Trajectory::from_record_batch(&batch).unwrap_err();
        assert!(err.to_string().contains("current"));
    }
}
