//! Text-oriented access to Arrow tables.
//!
//! Both input sources arrive as Arrow record batches (from DuckDB). Every
//! value is read through a cast to `Utf8`, so numeric, text and mixed columns
//! are handled the same way and parsed leniently afterwards.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, SchemaRef};
use arrow::record_batch::RecordBatch;

use crate::error::Result;

/// A schema plus the batches that carry it.
///
/// The schema is kept separately so header-only inputs (zero batches) can
/// still be validated.
#[derive(Debug, Clone)]
pub struct Table {
    pub schema: SchemaRef,
    pub batches: Vec<RecordBatch>,
}

impl Table {
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self { schema, batches }
    }

    /// Build from batches alone; fails with no batches to take a schema from.
    pub fn from_batches(batches: Vec<RecordBatch>) -> Option<Self> {
        let schema = batches.first()?.schema();
        Some(Self { schema, batches })
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect()
    }
}

/// Resolve the first alias present among `names`, matching case-insensitively.
///
/// Aliases are tried in order, so earlier spellings win when a source carries
/// several.
pub fn resolve_alias<'n>(names: &[&'n str], aliases: &[&str]) -> Option<&'n str> {
    aliases.iter().find_map(|alias| {
        names
            .iter()
            .find(|name| name.eq_ignore_ascii_case(alias))
            .copied()
    })
}

/// A batch column viewed as text.
pub struct TextColumn {
    values: StringArray,
}

impl TextColumn {
    /// Cast the named column of `batch` to text; `None` when absent.
    pub fn from_batch(batch: &RecordBatch, name: &str) -> Result<Option<Self>> {
        let Some(col) = batch.column_by_name(name) else {
            return Ok(None);
        };
        Ok(Some(Self::from_array(col)?))
    }

    pub fn from_array(col: &ArrayRef) -> Result<Self> {
        let utf8: ArrayRef = if col.data_type() == &DataType::Utf8 {
            Arc::clone(col)
        } else {
            cast(col.as_ref(), &DataType::Utf8)?
        };
        let values = utf8
            .as_any()
            .downcast_ref::<StringArray>()
            .cloned()
            .ok_or_else(|| {
                arrow::error::ArrowError::CastError("column did not cast to Utf8".into())
            })?;
        Ok(Self { values })
    }

    /// Raw text at `row`; null yields `None`.
    pub fn get(&self, row: usize) -> Option<&str> {
        if self.values.is_null(row) {
            None
        } else {
            Some(self.values.value(row))
        }
    }

    /// Trimmed, non-empty text at `row`.
    pub fn text(&self, row: usize) -> Option<String> {
        self.get(row)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Finite number at `row`; anything unparsable is absent.
    pub fn number(&self, row: usize) -> Option<f64> {
        self.get(row).and_then(parse_number)
    }
}

/// Lenient numeric parse: trimmed, finite values only.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Lenient integer parse accepting integral floats such as `"81.0"`.
pub fn parse_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(v);
    }
    parse_number(trimmed)
        .filter(|v| v.fract() == 0.0 && v.abs() < 9.0e15)
        .map(|v| v as i64)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use arrow::array::{ArrayRef, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;

    /// Build an all-text batch; `None` cells become nulls.
    pub fn text_batch(columns: &[&str], rows: &[Vec<Option<&str>>]) -> RecordBatch {
        let fields: Vec<Field> = columns
            .iter()
            .map(|c| Field::new(*c, DataType::Utf8, true))
            .collect();
        let arrays: Vec<ArrayRef> = (0..columns.len())
            .map(|i| {
                let values: Vec<Option<&str>> = rows.iter().map(|r| r[i]).collect();
                Arc::new(StringArray::from(values)) as ArrayRef
            })
            .collect();
        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
    }
}
