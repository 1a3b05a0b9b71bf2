//! Parameter descriptors and placeholder counting.
//!
//! A parameterized statement is executed as a temporary stored procedure,
//! so every `?` placeholder in the raw SQL must be matched to a descriptor
//! carrying both the *actual* binding (declared type, bound value) and the
//! *formal* half generated during procedure creation (formal name, native
//! formal type, maximum length).

use crate::error::PrepareError;

/// Declared type of an actual parameter.
///
/// This is the type vocabulary the caller binds values under; each entry
/// maps to a native formal type during procedure generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// Fixed-length character data.
    Char,
    /// Variable-length character data.
    VarChar,
    /// Long character data.
    LongVarChar,
    /// 32-bit integer.
    Integer,
    /// Floating point (single precision on the server).
    Float,
    /// Single-precision floating point.
    Real,
    /// Double-precision floating point.
    Double,
    /// Date and time of day.
    Timestamp,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Long binary data.
    LongVarBinary,
    /// Variable-length binary data.
    VarBinary,
    /// Single bit.
    Bit,
    /// 64-bit integer.
    BigInt,
    /// 16-bit integer.
    SmallInt,
    /// 8-bit integer.
    TinyInt,
    /// Exact fixed-point numeric.
    Decimal,
    /// Exact fixed-point numeric.
    Numeric,
    /// Fixed-length binary data (no native formal type).
    Binary,
    /// No type declared yet.
    Null,
    /// Driver-specific type (no native formal type).
    Other,
}

impl ParamType {
    /// Is this one of the character types that participate in
    /// length-based formal compatibility?
    #[must_use]
    pub const fn is_character(self) -> bool {
        matches!(self, Self::Char | Self::VarChar | Self::LongVarChar)
    }
}

/// Value bound to a placeholder.
///
/// Only character data influences formal type inference, so non-character
/// values are carried opaquely.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BoundValue {
    /// SQL NULL.
    #[default]
    Null,
    /// Character data.
    Text(String),
    /// Any non-character value; the formal type depends only on the
    /// declared parameter type.
    Opaque,
}

/// Binding for one `?` placeholder.
///
/// Created empty per statement, reset with [`clear`](Self::clear) between
/// reuses of a prepared statement, and never shared across statements.
/// Procedure generation works on a private copy and writes only the formal
/// type back, so a caller's descriptor keeps its actual binding intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    /// Maximum length allowed for the procedure's formal parameter, in
    /// characters. For a `P1 varchar(25)` formal this is 25. On an actual
    /// binding it is the bound character length, which is what the
    /// compatibility test compares against a cached formal.
    pub max_length: Option<usize>,
    /// Formal name of the stored procedure parameter, e.g. `P1`.
    pub formal_name: Option<String>,
    /// Native type of the formal parameter, e.g. `varchar(255)`.
    pub formal_type: Option<String>,
    /// Declared type of the actual parameter.
    pub param_type: ParamType,
    /// Whether a value has been bound. All input parameters must be set
    /// before a procedure can be generated.
    pub is_set: bool,
    /// The bound value.
    pub value: BoundValue,
    /// Whether this is an input parameter.
    pub is_input: bool,
    /// Whether this is an output parameter.
    pub is_output: bool,
}

impl Default for ParameterDescriptor {
    fn default() -> Self {
        Self {
            max_length: None,
            formal_name: None,
            formal_type: None,
            param_type: ParamType::Null,
            is_set: false,
            value: BoundValue::Null,
            is_input: true,
            is_output: false,
        }
    }
}

impl ParameterDescriptor {
    /// Create an empty, unset descriptor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a set input descriptor for the given declared type and value.
    ///
    /// For text values the maximum length is recorded as the bound
    /// character length, which feeds the procedure compatibility test.
    #[must_use]
    pub fn input(param_type: ParamType, value: BoundValue) -> Self {
        let max_length = match &value {
            BoundValue::Text(s) => Some(s.chars().count()),
            _ => None,
        };
        Self {
            max_length,
            param_type,
            is_set: true,
            value,
            ..Self::default()
        }
    }

    /// Create an output descriptor for the given declared type.
    #[must_use]
    pub fn output(param_type: ParamType) -> Self {
        Self {
            param_type,
            is_input: false,
            is_output: true,
            ..Self::default()
        }
    }

    /// Unset all information about the parameter, formal and actual.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Count the number of `?` placeholders in a statement.
///
/// Placeholders inside string literals are not counted; a backslash inside
/// a string escapes the following character.
///
/// # Errors
///
/// Returns [`PrepareError::NoStatement`] for empty input.
pub fn count_placeholders(sql: &str) -> Result<usize, PrepareError> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Normal,
        InString,
        InStringEscaped,
    }

    if sql.is_empty() {
        return Err(PrepareError::NoStatement);
    }

    let mut state = State::Normal;
    let mut count = 0;
    for ch in sql.chars() {
        state = match state {
            State::Normal => match ch {
                '?' => {
                    count += 1;
                    State::Normal
                }
                '\'' => State::InString,
                _ => State::Normal,
            },
            State::InString => match ch {
                '\'' => State::Normal,
                '\\' => State::InStringEscaped,
                _ => State::InString,
            },
            State::InStringEscaped => State::InString,
        };
    }
    Ok(count)
}

/// Check that every parameter has been given a value.
///
/// Output parameters are allowed to be unset and are marked set here.
///
/// # Errors
///
/// Returns [`PrepareError::ParameterNotSet`] with the 1-based position of
/// the first unset input parameter.
pub fn verify_all_set(params: &mut [ParameterDescriptor]) -> Result<(), PrepareError> {
    for (i, param) in params.iter_mut().enumerate() {
        if param.is_output {
            param.is_set = true;
        }
        if !param.is_set {
            return Err(PrepareError::ParameterNotSet { index: i + 1 });
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_count_simple() {
        assert_eq!(count_placeholders("select * from t where a=?").unwrap(), 1);
        assert_eq!(count_placeholders("insert into t values(?,?,?)").unwrap(), 3);
        assert_eq!(count_placeholders("select 1").unwrap(), 0);
    }

    #[test]
    fn test_count_ignores_string_literals() {
        assert_eq!(
            count_placeholders("select * from t where a=? and b='x?y'").unwrap(),
            1
        );
        assert_eq!(count_placeholders("select '???'").unwrap(), 0);
    }

    #[test]
    fn test_count_honors_backslash_escape() {
        // The escaped quote does not close the string, so the trailing ?
        // is still inside the literal.
        assert_eq!(count_placeholders(r"select 'a\'? ' , ?").unwrap(), 1);
    }

    #[test]
    fn test_count_empty_statement() {
        assert!(matches!(
            count_placeholders(""),
            Err(PrepareError::NoStatement)
        ));
    }

    #[test]
    fn test_verify_all_set() {
        let mut params = vec![
            ParameterDescriptor::input(ParamType::Integer, BoundValue::Opaque),
            ParameterDescriptor::new(),
        ];
        let err = verify_all_set(&mut params).unwrap_err();
        assert!(matches!(err, PrepareError::ParameterNotSet { index: 2 }));
    }

    #[test]
    fn test_verify_marks_output_parameters_set() {
        let mut params = vec![ParameterDescriptor::output(ParamType::Integer)];
        verify_all_set(&mut params).unwrap();
        assert!(params[0].is_set);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut param = ParameterDescriptor::input(
            ParamType::VarChar,
            BoundValue::Text("hello".to_string()),
        );
        param.formal_name = Some("P1".to_string());
        param.formal_type = Some("varchar(255)".to_string());
        param.clear();
        assert_eq!(param, ParameterDescriptor::new());
    }

    #[test]
    fn test_input_records_text_length() {
        let param =
            ParameterDescriptor::input(ParamType::Char, BoundValue::Text("héllo".to_string()));
        assert_eq!(param.max_length, Some(5));
    }

    proptest! {
        #[test]
        fn count_matches_question_marks_outside_quotes(sql in "[a-zA-Z0-9 ,=.*?()]*") {
            // No quote characters, so every ? is a placeholder.
            let expected = sql.matches('?').count();
            if sql.is_empty() {
                prop_assert!(count_placeholders(&sql).is_err());
            } else {
                prop_assert_eq!(count_placeholders(&sql).unwrap(), expected);
            }
        }
    }
}
