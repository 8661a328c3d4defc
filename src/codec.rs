//! Binary encoding of schema and record entries.
//!
//! Entries are self-describing and little-endian:
//!
//! ```text
//! schema: table_id u16 | column_count u16 | root_page u32 | next_record_id u64
//!         | name_len u16 | name | { type u8 | nullable u8 | name_len u16 | name }*
//! record: record_id u64 | table_id u16 | field_count u16
//!         | { type u8 | is_null u8 | value }*
//! value:  INT i32 | BOOL u8 | TEXT len u16 + bytes   (absent when null)
//! ```
//!
//! Decoding never reads past the supplied slice. Missing bytes read as zero,
//! oversized counts are clamped, and oversized strings are truncated, so a
//! damaged page degrades instead of panicking.

use crate::access::record::{Record, RecordField};
use crate::access::value::{DataType, Value, MAX_TEXT_LEN};
use crate::catalog::{SchemaColumn, TableId, TableSchema, MAX_COLUMNS, MAX_NAME_LEN};
use crate::storage::error::StorageError;
use crate::storage::page::PageId;
use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

const SCHEMA_FIXED_SIZE: usize = 18;
const COLUMN_FIXED_SIZE: usize = 4;
const RECORD_FIXED_SIZE: usize = 12;
const FIELD_FIXED_SIZE: usize = 2;
const TEXT_PREFIX_SIZE: usize = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unknown data type tag: {0}")]
    UnknownDataType(u8),
}

impl DecodeError {
    /// Report the failure as a corrupted entry on `page_id`.
    pub fn at_page(self, page_id: PageId) -> StorageError {
        StorageError::CorruptedEntry {
            page_id,
            reason: self.to_string(),
        }
    }
}

pub type DecodeResult<T> = Result<(T, usize), DecodeError>;

/// Bytes of a string that actually get written, bounded by the u16 prefix.
fn stored_bytes(s: &str) -> &[u8] {
    let bytes = s.as_bytes();
    &bytes[..bytes.len().min(u16::MAX as usize)]
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    let bytes = stored_bytes(s);
    buf.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
    buf.extend_from_slice(bytes);
}

pub fn schema_encoded_len(schema: &TableSchema) -> usize {
    SCHEMA_FIXED_SIZE
        + stored_bytes(&schema.table_name).len()
        + schema
            .columns
            .iter()
            .map(|c| COLUMN_FIXED_SIZE + stored_bytes(&c.name).len())
            .sum::<usize>()
}

pub fn encode_schema(schema: &TableSchema) -> Vec<u8> {
    let mut buf = Vec::with_capacity(schema_encoded_len(schema));

    buf.extend_from_slice(&schema.table_id.0.to_le_bytes());
    buf.extend_from_slice(&(schema.columns.len() as u16).to_le_bytes());
    buf.extend_from_slice(&PageId::to_link(schema.root_page).to_le_bytes());
    buf.extend_from_slice(&schema.next_record_id.to_le_bytes());
    put_str(&mut buf, &schema.table_name);

    for column in &schema.columns {
        buf.push(column.data_type as u8);
        buf.push(column.nullable as u8);
        put_str(&mut buf, &column.name);
    }

    buf
}

/// Decode one schema entry from the front of `data`, returning it with the
/// number of bytes consumed.
pub fn decode_schema(data: &[u8]) -> DecodeResult<TableSchema> {
    let mut reader = Reader::new(data);

    let table_id = TableId(reader.read_u16());
    let column_count = (reader.read_u16() as usize).min(MAX_COLUMNS);
    let root_page = PageId::from_link(reader.read_u32());
    let next_record_id = reader.read_u64();
    let table_name = reader.read_str(MAX_NAME_LEN);

    let mut columns = Vec::with_capacity(column_count);
    for _ in 0..column_count {
        let data_type = reader.read_data_type()?;
        let nullable = reader.read_u8() != 0;
        let name = reader.read_str(MAX_NAME_LEN);
        columns.push(SchemaColumn::new(name, data_type, nullable));
    }

    let schema = TableSchema {
        table_id,
        table_name,
        root_page,
        next_record_id,
        columns,
    };
    Ok((schema, reader.position()))
}

fn value_encoded_len(value: &Value) -> usize {
    match value {
        Value::Null => 0,
        Value::Int(_) => 4,
        Value::Bool(_) => 1,
        Value::Text(s) => TEXT_PREFIX_SIZE + stored_bytes(s).len(),
    }
}

pub fn record_encoded_len(record: &Record) -> usize {
    RECORD_FIXED_SIZE
        + record
            .fields
            .iter()
            .map(|f| FIELD_FIXED_SIZE + value_encoded_len(&f.value))
            .sum::<usize>()
}

/// Encode a record. Each non-null value is written in the layout of its own
/// variant, so fields are expected to hold values matching their data type.
pub fn encode_record(record: &Record) -> Vec<u8> {
    let mut buf = Vec::with_capacity(record_encoded_len(record));

    buf.extend_from_slice(&record.record_id.to_le_bytes());
    buf.extend_from_slice(&record.table_id.0.to_le_bytes());
    buf.extend_from_slice(&(record.fields.len() as u16).to_le_bytes());

    for field in &record.fields {
        buf.push(field.data_type as u8);
        buf.push(field.is_null() as u8);

        match &field.value {
            Value::Null => {}
            Value::Int(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Value::Bool(v) => buf.push(*v as u8),
            Value::Text(s) => put_str(&mut buf, s),
        }
    }

    buf
}

/// Decode one record entry from the front of `data`. A field count above
/// the column limit is treated as corrupt and yields a record with no fields.
pub fn decode_record(data: &[u8]) -> DecodeResult<Record> {
    let mut reader = Reader::new(data);

    let record_id = reader.read_u64();
    let table_id = TableId(reader.read_u16());
    let field_count = reader.read_u16() as usize;

    let mut record = Record::new(table_id, Vec::new()).with_record_id(record_id);
    if field_count > MAX_COLUMNS {
        return Ok((record, reader.position()));
    }

    record.fields.reserve(field_count);
    for _ in 0..field_count {
        let data_type = reader.read_data_type()?;
        let is_null = reader.read_u8() != 0;

        let value = if is_null {
            Value::Null
        } else {
            match data_type {
                DataType::Int => Value::Int(reader.read_i32()),
                DataType::Bool => Value::Bool(reader.read_u8() != 0),
                DataType::Text => Value::Text(reader.read_str(MAX_TEXT_LEN)),
            }
        };
        record.fields.push(RecordField::new(data_type, value));
    }

    Ok((record, reader.position()))
}

/// Bounds-checked cursor. Reads past the end yield zeros and leave the
/// position at the end of the slice.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, n: usize) -> &'a [u8] {
        let end = self.pos.saturating_add(n).min(self.data.len());
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        bytes
    }

    fn take_exact(&mut self, n: usize) -> Option<&'a [u8]> {
        let bytes = self.take(n);
        (bytes.len() == n).then_some(bytes)
    }

    fn read_u8(&mut self) -> u8 {
        self.take_exact(1).map_or(0, |b| b[0])
    }

    fn read_u16(&mut self) -> u16 {
        self.take_exact(2).map_or(0, LittleEndian::read_u16)
    }

    fn read_u32(&mut self) -> u32 {
        self.take_exact(4).map_or(0, LittleEndian::read_u32)
    }

    fn read_i32(&mut self) -> i32 {
        self.take_exact(4).map_or(0, LittleEndian::read_i32)
    }

    fn read_u64(&mut self) -> u64 {
        self.take_exact(8).map_or(0, LittleEndian::read_u64)
    }

    /// Read a length-prefixed string, keeping at most `max` bytes of it. The
    /// cursor still advances past the full stored length.
    fn read_str(&mut self, max: usize) -> String {
        let len = self.read_u16() as usize;
        let bytes = self.take(len);
        String::from_utf8_lossy(&bytes[..bytes.len().min(max)]).into_owned()
    }

    fn read_data_type(&mut self) -> Result<DataType, DecodeError> {
        let tag = self.read_u8();
        DataType::from_u8(tag).ok_or(DecodeError::UnknownDataType(tag))
    }
}
