use crate::access::value::{DataType, Value};
use crate::catalog::{TableId, TableSchema};
use crate::storage::error::{StorageError, StorageResult};

/// Record id meaning "not assigned yet"; insertion replaces it.
pub const UNSET_RECORD_ID: u64 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordField {
    pub data_type: DataType,
    pub value: Value,
}

impl RecordField {
    pub fn new(data_type: DataType, value: Value) -> Self {
        Self { data_type, value }
    }

    pub fn null(data_type: DataType) -> Self {
        Self::new(data_type, Value::Null)
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }
}

/// A row of one table. Fields follow the table's column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub record_id: u64,
    pub table_id: TableId,
    pub fields: Vec<RecordField>,
}

impl Record {
    pub fn new(table_id: TableId, fields: Vec<RecordField>) -> Self {
        Self {
            record_id: UNSET_RECORD_ID,
            table_id,
            fields,
        }
    }

    /// Build a record for `schema`, taking each field's type from its column.
    pub fn from_values(schema: &TableSchema, values: Vec<Value>) -> StorageResult<Self> {
        if values.len() != schema.columns.len() {
            return Err(StorageError::FieldCountMismatch {
                expected: schema.columns.len(),
                actual: values.len(),
            });
        }

        let fields = schema
            .columns
            .iter()
            .zip(values)
            .map(|(column, value)| RecordField::new(column.data_type, value))
            .collect();

        Ok(Self::new(schema.table_id, fields))
    }

    pub fn with_record_id(mut self, record_id: u64) -> Self {
        self.record_id = record_id;
        self
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.fields.get(index).map(|f| &f.value)
    }
}
