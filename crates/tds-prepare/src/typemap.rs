//! Actual-to-formal parameter type mapping.
//!
//! Maps each declared parameter type (plus, for character data, the bound
//! value) to the native formal type used in the generated procedure
//! declaration. The mapping is protocol-version-sensitive: TDS 7.0 servers
//! understand Unicode formals, older generations do not.

use crate::charset::CharsetCodec;
use crate::error::PrepareError;
use crate::params::{BoundValue, ParamType, ParameterDescriptor};
use crate::version::TdsVersion;

/// Maximum length marker for unbounded (`text`/`ntext`/`image`) formals.
pub const UNBOUNDED: usize = usize::MAX;

/// Assign a native formal type and maximum length to every descriptor.
///
/// Mutates `formal_type` and, for character formals, `max_length` in place.
///
/// # Errors
///
/// Returns [`PrepareError::UnsupportedParameterType`] for declared types
/// with no native formal type, and [`PrepareError::InternalTypeError`] if a
/// bound value contradicts its declared type.
pub fn assign_formal_types(
    params: &mut [ParameterDescriptor],
    version: TdsVersion,
    codec: &CharsetCodec,
) -> Result<(), PrepareError> {
    for (i, param) in params.iter_mut().enumerate() {
        match param.param_type {
            ParamType::Char | ParamType::VarChar => {
                character_formal(param, i, version, codec)?;
            }
            ParamType::LongVarChar => {
                param.formal_type = Some(if version.supports_unicode() {
                    "ntext".to_string()
                } else {
                    "text".to_string()
                });
                param.max_length = Some(UNBOUNDED);
            }
            ParamType::Integer => param.formal_type = Some("integer".to_string()),
            ParamType::Float | ParamType::Real => param.formal_type = Some("real".to_string()),
            ParamType::Double => param.formal_type = Some("float".to_string()),
            ParamType::Timestamp | ParamType::Date | ParamType::Time => {
                param.formal_type = Some("datetime".to_string());
            }
            ParamType::LongVarBinary | ParamType::VarBinary => {
                param.formal_type = Some("image".to_string());
            }
            ParamType::Bit => param.formal_type = Some("bit".to_string()),
            ParamType::BigInt | ParamType::Decimal | ParamType::Numeric => {
                param.formal_type = Some("decimal(28,10)".to_string());
            }
            ParamType::SmallInt => param.formal_type = Some("smallint".to_string()),
            ParamType::TinyInt => param.formal_type = Some("tinyint".to_string()),
            ParamType::Binary | ParamType::Null | ParamType::Other => {
                return Err(PrepareError::UnsupportedParameterType {
                    param_type: param.param_type,
                });
            }
        }
    }
    Ok(())
}

/// Character formals bucket into a small set of sizes so that a generated
/// procedure can be reused for later bindings of the same class.
fn character_formal(
    param: &mut ParameterDescriptor,
    index: usize,
    version: TdsVersion,
    codec: &CharsetCodec,
) -> Result<(), PrepareError> {
    let value = match &param.value {
        BoundValue::Null => None,
        BoundValue::Text(s) => Some(s.as_str()),
        BoundValue::Opaque => {
            return Err(PrepareError::InternalTypeError { index: index + 1 });
        }
    };

    if version.supports_unicode() {
        // TDS 7.0 can handle Unicode, so prefer it wherever possible.
        match value {
            None => {
                param.formal_type = Some("nvarchar(4000)".to_string());
                param.max_length = Some(4000);
            }
            Some(s) if s.chars().count() <= 4000 => {
                param.formal_type = Some("nvarchar(4000)".to_string());
                param.max_length = Some(4000);
            }
            Some(s)
                if s.chars().count() <= 8000
                    && !codec.is_multi_byte()
                    && codec.is_representable(s) =>
            {
                param.formal_type = Some("varchar(8000)".to_string());
                param.max_length = Some(8000);
            }
            Some(_) => {
                param.formal_type = Some("ntext".to_string());
                param.max_length = Some(UNBOUNDED);
            }
        }
    } else if let Some(s) = value {
        let mut len = s.chars().count();
        // A string that fits in 255 characters may still exceed 255 bytes
        // in a double-byte charset; re-measure in bytes near the boundary.
        if codec.is_multi_byte() && len > 127 && len < 256 {
            len = codec.byte_length(s);
        }
        if len < 256 {
            param.formal_type = Some("varchar(255)".to_string());
            param.max_length = Some(255);
        } else {
            param.formal_type = Some("text".to_string());
            param.max_length = Some(UNBOUNDED);
        }
    } else {
        // Use the smallest class possible for nulls.
        param.formal_type = Some("varchar(255)".to_string());
        param.max_length = Some(255);
    }
    Ok(())
}
