//! Statement preparation error types.

use thiserror::Error;

use crate::params::ParamType;

/// Errors that can occur while translating SQL text or marshalling
/// parameters into a temporary stored procedure.
///
/// Escape and literal errors indicate bad input SQL and surface as a
/// statement-preparation failure. Parameter errors indicate a caller
/// programming error. None of these are retried; retry policy belongs to
/// the transport layer.
#[derive(Debug, Error)]
pub enum PrepareError {
    /// An escape body did not match its expected grammar.
    #[error("malformed escape sequence: {escape}")]
    MalformedEscape {
        /// The offending escape body.
        escape: String,
    },

    /// A `{d ...}` or `{ts ...}` date portion was not `YYYY-MM-DD`.
    #[error("malformed date literal: {literal}")]
    MalformedDateLiteral {
        /// The offending literal body.
        literal: String,
    },

    /// A `{t ...}` or `{ts ...}` time portion was not `HH:MM:SS`.
    #[error("malformed time literal: {literal}")]
    MalformedTimeLiteral {
        /// The offending literal body.
        literal: String,
    },

    /// An escape body started with an unknown marker.
    #[error("unrecognized escape sequence: {escape}")]
    UnrecognizedEscape {
        /// The offending escape body.
        escape: String,
    },

    /// Brace or quote nesting never closed before the end of the statement.
    #[error("unterminated escape sequence in statement")]
    UnterminatedEscape,

    /// The statement text was empty.
    #[error("no statement")]
    NoStatement,

    /// The number of `?` placeholders does not match the parameter list.
    #[error("statement has {placeholders} placeholders but {parameters} parameters were supplied")]
    ParameterCountMismatch {
        /// Placeholders counted in the statement text.
        placeholders: usize,
        /// Parameters supplied by the caller.
        parameters: usize,
    },

    /// An input parameter was never given a value.
    #[error("parameter #{index} has not been set")]
    ParameterNotSet {
        /// 1-based position of the unset parameter.
        index: usize,
    },

    /// The declared parameter type has no native formal type.
    #[error("parameter type {param_type:?} is not supported")]
    UnsupportedParameterType {
        /// The unsupported declared type.
        param_type: ParamType,
    },

    /// A bound value does not match its declared parameter type.
    #[error("internal error: value of parameter #{index} does not match its declared type")]
    InternalTypeError {
        /// 1-based position of the inconsistent parameter.
        index: usize,
    },

    /// The server reported a charset this driver has no codec for.
    #[error("unknown server charset: {name}")]
    UnknownCharset {
        /// The charset name as reported by the server.
        name: String,
    },

    /// Byte data could not be decoded in the server charset.
    #[error("invalid {charset} data")]
    InvalidEncoding {
        /// Name of the charset the data failed to decode in.
        charset: String,
    },
}
