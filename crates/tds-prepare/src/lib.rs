//! # tds-prepare
//!
//! SQL translation and parameter marshalling for TDS (Tabular Data Stream)
//! connections to Microsoft SQL Server and Sybase.
//!
//! Servers speaking the older TDS generations (4.2, 5.0, 7.0) have no wire
//! concept of a prepared statement, so a parameterized statement is executed
//! by generating a temporary stored procedure: placeholders become formal
//! parameters, bound values are marshalled against inferred native types,
//! and the procedure is cached for reuse. Portable escape sequences
//! (`{d ...}`, `{fn ...}`, `{call ...}`, `{oj ...}`, `{escape '...'}`) are
//! rewritten into native SQL before submission.
//!
//! ## Design Philosophy
//!
//! This crate is intentionally IO-agnostic. It performs all text analysis
//! and type inference locally and never touches the network; higher-level
//! crates submit the generated `create proc` / `exec` batches.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tds_prepare::{
//!     BoundValue, CharsetCodec, EscapeTranslator, ParamType,
//!     ParameterDescriptor, Procedure, TdsVersion, next_temp_proc_name,
//! };
//!
//! let sql = EscapeTranslator::new().translate("{call sp_who(?)}")?;
//! let codec = CharsetCodec::for_server_charset("iso_1")?;
//! let mut params = vec![ParameterDescriptor::input(
//!     ParamType::VarChar,
//!     BoundValue::Text("sa".into()),
//! )];
//! let proc = Procedure::build(&sql, &next_temp_proc_name(), &mut params,
//!     TdsVersion::V7_0, &codec)?;
//! # Ok::<(), tds_prepare::PrepareError>(())
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cache;
pub mod charset;
pub mod error;
pub mod escape;
pub mod params;
pub mod procedure;
pub mod typemap;
pub mod version;

pub use cache::{hash_sql, ProcedureCache, DEFAULT_MAX_PROCEDURES};
pub use charset::CharsetCodec;
pub use error::PrepareError;
pub use escape::{Dialect, EscapeTranslator, SqlServerDialect, SybaseDialect};
pub use params::{
    count_placeholders, verify_all_set, BoundValue, ParamType, ParameterDescriptor,
};
pub use procedure::{next_temp_proc_name, Procedure};
pub use typemap::{assign_formal_types, UNBOUNDED};
pub use version::TdsVersion;
