//! Typed table assembly

use crate::error::{EtlError, Result};
use crate::record::RecordSet;
use crate::schema::{FieldSchema, FieldType};

/// Values of one column, already coerced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnValues {
    Int64(Vec<i64>),
    String(Vec<String>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Int64(v) => v.len(),
            ColumnValues::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Text form of one cell, as written to CSV
    pub fn render(&self, row: usize) -> Option<String> {
        match self {
            ColumnValues::Int64(v) => v.get(row).map(i64::to_string),
            ColumnValues::String(v) => v.get(row).cloned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

/// Records projected into schema-ordered, typed columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Project `records` onto `schema` and coerce every column
    ///
    /// Integer columns accept surrounding whitespace; anything else that is
    /// not a base-10 integer (including an empty value) fails the build.
    pub fn build(records: &RecordSet, schema: &FieldSchema) -> Result<Self> {
        let columns = schema
            .fields()
            .iter()
            .map(|field| {
                let raw = records.iter().map(|r| r.get(&field.name).unwrap_or(""));
                let values = match field.field_type {
                    FieldType::String => ColumnValues::String(raw.map(str::to_string).collect()),
                    FieldType::Int64 => ColumnValues::Int64(
                        raw.enumerate()
                            .map(|(row, value)| coerce_int64(&field.name, row, value))
                            .collect::<Result<_>>()?,
                    ),
                };
                Ok(Column {
                    name: field.name.clone(),
                    values,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            columns,
            row_count: records.len(),
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Cells of one row in column order
    pub fn row(&self, row: usize) -> Option<Vec<String>> {
        if row >= self.row_count {
            return None;
        }
        self.columns.iter().map(|c| c.values.render(row)).collect()
    }
}

fn coerce_int64(column: &str, row: usize, value: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| EtlError::TypeCoercion {
            column: column.to_string(),
            row,
            value: value.to_string(),
            expected: FieldType::Int64.as_str(),
        })
}
