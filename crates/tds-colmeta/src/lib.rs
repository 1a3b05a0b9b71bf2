//! # tds-colmeta
//!
//! Result-set column metadata for TDS (Tabular Data Stream) connections.
//!
//! The older TDS generations describe a result set's columns across
//! several distinct token fragments received over separate round-trips: a
//! name fragment, a type fragment, an attribute fragment. Each fragment
//! carries a disjoint subset of per-column attributes, so the pieces must
//! be merged before the metadata can back a result-set description.
//!
//! ## Example
//!
//! ```rust
//! use tds_colmeta::{ColumnSet, Nullability};
//!
//! let mut names = ColumnSet::new();
//! names.set_name(1, "id");
//!
//! let mut types = ColumnSet::new();
//! types.set_native_type(1, 0x38);
//! types.set_nullable(1, Nullability::NotNull);
//!
//! let merged = names.merge(types)?;
//! assert_eq!(merged.column(1).and_then(|c| c.name.as_deref()), Some("id"));
//! # Ok::<(), tds_colmeta::MetaError>(())
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod column;
pub mod error;
pub mod set;

pub use column::{Column, Nullability};
pub use error::MetaError;
pub use set::ColumnSet;
