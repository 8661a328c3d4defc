//! Access layer for record-oriented operations.
//!
//! - **RecordHeap**: Insert, read, update and delete records in a table's
//!   page chain
//! - **Record**: One row, its fields in column order
//! - **Value**: Type-safe representation of column values
//! - **DataType**: Column types and their on-disk tags
//!
//! Records are resolved against their table's schema in the catalog, which
//! also holds each table's root page and record id counter.

pub mod heap;
pub mod record;
pub mod value;

pub use heap::RecordHeap;
pub use record::{Record, RecordField, UNSET_RECORD_ID};
pub use value::{DataType, Value, MAX_TEXT_LEN};
