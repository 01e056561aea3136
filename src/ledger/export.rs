//! Tabular ledger export (Parquet, one row per cycle)

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, RecordBatch, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use chrono::SecondsFormat;
use parquet::arrow::ArrowWriter;

use super::CycleRecord;
use crate::{Error, Result};

/// Arrow schema of the export.
#[must_use]
pub fn records_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("cycle_index", DataType::UInt32, false),
        Field::new("non_degradation_score", DataType::Float64, true),
        Field::new("degradation_score", DataType::Float64, true),
        Field::new("capacity_score", DataType::Float64, true),
        Field::new("experimental_capacity", DataType::Float64, true),
        Field::new("real_capacity", DataType::Float64, true),
        Field::new("completed_at", DataType::Utf8, false),
    ]))
}

/// Records as a single batch.
///
/// # Errors
///
/// Returns [`Error::Arrow`] if the batch cannot be assembled.
pub fn records_to_batch(records: &[CycleRecord]) -> Result<RecordBatch> {
    let float = |get: fn(&CycleRecord) -> Option<f64>| -> ArrayRef {
        Arc::new(records.iter().map(get).collect::<Float64Array>())
    };
    let columns: Vec<ArrayRef> = vec![
        Arc::new(
            records
                .iter()
                .map(|r| Some(r.cycle_index()))
                .collect::<UInt32Array>(),
        ),
        float(CycleRecord::non_degradation_score),
        float(CycleRecord::degradation_score),
        float(CycleRecord::capacity_score),
        float(CycleRecord::experimental_capacity),
        float(CycleRecord::real_capacity),
        Arc::new(
            records
                .iter()
                .map(|r| Some(r.completed_at().to_rfc3339_opts(SecondsFormat::Millis, true)))
                .collect::<StringArray>(),
        ),
    ];
    Ok(RecordBatch::try_new(records_schema(), columns)?)
}

/// Records encoded as a Parquet file image.
///
/// # Errors
///
/// Returns [`Error::StorageError`] if encoding fails.
pub fn records_to_parquet(records: &[CycleRecord]) -> Result<Vec<u8>> {
    let batch = records_to_batch(records)?;
    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), None)
        .map_err(|e| Error::StorageError(format!("Failed to create Parquet writer: {e}")))?;
    writer
        .write(&batch)
        .map_err(|e| Error::StorageError(format!("Failed to write ledger export: {e}")))?;
    writer
        .close()
        .map_err(|e| Error::StorageError(format!("Failed to finalize ledger export: {e}")))?;
    Ok(buf)
}
