//! Temporary stored procedure generation.
//!
//! The protocol has no direct parameterized-statement operation; a prepared
//! statement is implemented by creating a temporary stored procedure whose
//! formal parameters mirror the actual bindings, then executing it. Because
//! the formal types must be declared up front, procedure creation is
//! deferred until every parameter has a value.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::charset::CharsetCodec;
use crate::error::PrepareError;
use crate::params::{self, ParameterDescriptor};
use crate::typemap;
use crate::version::TdsVersion;

/// Formal type prefixes that participate in length-based compatibility.
const CHARACTER_CLASSES: [&str; 6] = ["char", "varchar", "text", "nchar", "nvarchar", "ntext"];

/// One generated temporary stored procedure, bound to a specific raw SQL
/// text and formal parameter signature.
///
/// The procedure owns a private copy of the descriptor list with the formal
/// half filled in; the caller's descriptors are only read from, apart from
/// receiving the computed formal types back.
#[derive(Debug, Clone)]
pub struct Procedure {
    raw_sql: String,
    name: String,
    source: String,
    parameters: Vec<ParameterDescriptor>,
    has_lob_parameters: bool,
}

impl Procedure {
    /// Generate the procedure for a raw statement and its parameter list.
    ///
    /// The descriptor slice is copied before any formal information is
    /// assigned; the caller's descriptors receive only the computed
    /// `formal_type` back, so their actual bindings (including the bound
    /// length used by the compatibility test) stay intact.
    ///
    /// # Errors
    ///
    /// Fails with [`PrepareError::ParameterNotSet`] if an input parameter
    /// has no value, [`PrepareError::ParameterCountMismatch`] if the
    /// placeholder count disagrees with the parameter list, or a type
    /// mapping error from the formal type assignment.
    pub fn build(
        raw_sql: &str,
        name: &str,
        parameters: &mut [ParameterDescriptor],
        version: TdsVersion,
        codec: &CharsetCodec,
    ) -> Result<Self, PrepareError> {
        // Private copy: formal assignment must not disturb the caller's
        // actual bindings.
        let mut formals: Vec<ParameterDescriptor> = parameters.to_vec();

        params::verify_all_set(&mut formals)?;

        let placeholders = params::count_placeholders(raw_sql)?;
        if placeholders != formals.len() {
            return Err(PrepareError::ParameterCountMismatch {
                placeholders,
                parameters: formals.len(),
            });
        }

        assign_formal_names(raw_sql, &mut formals);
        typemap::assign_formal_types(&mut formals, version, codec)?;

        // Copy the formal types back so the caller can run the
        // compatibility test against a cached procedure later.
        for (original, formal) in parameters.iter_mut().zip(formals.iter()) {
            original.formal_type = formal.formal_type.clone();
        }

        let has_lob_parameters = formals.iter().any(|p| {
            matches!(
                p.formal_type.as_deref(),
                Some(t) if t.eq_ignore_ascii_case("image")
                    || t.eq_ignore_ascii_case("text")
                    || t.eq_ignore_ascii_case("ntext")
            )
        });

        let source = render_source(raw_sql, name, &formals);
        tracing::debug!(
            procedure = name,
            parameters = formals.len(),
            has_lob_parameters,
            "generated temporary procedure"
        );

        Ok(Self {
            raw_sql: raw_sql.to_string(),
            name: name.to_string(),
            source,
            parameters: formals,
            has_lob_parameters,
        })
    }

    /// The raw SQL text this procedure was generated from.
    #[must_use]
    pub fn raw_sql(&self) -> &str {
        &self.raw_sql
    }

    /// The server-visible procedure name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The generated `create proc ...` source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The formal parameter list, with names, types and lengths assigned.
    #[must_use]
    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    /// Does the formal parameter list include LOB (`image`/`text`/`ntext`)
    /// parameters?
    #[must_use]
    pub fn has_lob_parameters(&self) -> bool {
        self.has_lob_parameters
    }

    /// Check whether a new set of actual parameters is compatible with this
    /// procedure's formal parameters, i.e. whether the procedure can be
    /// reused instead of creating a fresh one.
    ///
    /// Character formals accept any character actual whose bound length
    /// fits the formal's maximum; all other formals require an identical
    /// formal type on the actual.
    #[must_use]
    pub fn compatible_parameters(&self, actuals: &[ParameterDescriptor]) -> bool {
        if self.parameters.len() != actuals.len() {
            return false;
        }

        self.parameters.iter().zip(actuals).all(|(formal, actual)| {
            let Some(formal_type) = formal.formal_type.as_deref() else {
                return false;
            };
            let character_class = CHARACTER_CLASSES
                .iter()
                .any(|class| formal_type.starts_with(class));

            if character_class && actual.param_type.is_character() {
                formal.max_length.unwrap_or(0) >= actual.max_length.unwrap_or(0)
            } else {
                match actual.formal_type.as_deref() {
                    Some(actual_type) => formal_type.eq_ignore_ascii_case(actual_type),
                    None => false,
                }
            }
        })
    }
}

/// Assign formal names `P1, P2, ...`, skipping any `P<n>` that already
/// appears verbatim in the raw SQL so a formal name never collides with
/// literal statement text.
fn assign_formal_names(raw_sql: &str, params: &mut [ParameterDescriptor]) {
    let mut next = 0usize;
    for param in params.iter_mut() {
        let name = loop {
            next += 1;
            let candidate = format!("P{next}");
            if !raw_sql.contains(&candidate) {
                break candidate;
            }
        };
        param.formal_name = Some(name);
    }
}

/// Render the full `create proc` source: formal declaration list, then the
/// raw SQL with each `?` placeholder replaced by its formal name. The
/// substitution uses the same string-aware lexer as placeholder counting so
/// a `?` inside a string literal is never replaced.
fn render_source(raw_sql: &str, name: &str, formals: &[ParameterDescriptor]) -> String {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Normal,
        InString,
        InStringEscaped,
    }

    let mut source = format!("create proc {name}");

    if !formals.is_empty() {
        source.push('(');
        for (i, param) in formals.iter().enumerate() {
            if i > 0 {
                source.push_str(", ");
            }
            source.push('@');
            source.push_str(param.formal_name.as_deref().unwrap_or_default());
            source.push(' ');
            source.push_str(param.formal_type.as_deref().unwrap_or_default());
            if param.is_output {
                source.push_str(" output");
            }
        }
        source.push(')');
    }
    source.push_str(" as ");

    let mut state = State::Normal;
    let mut next_param = formals.iter();
    for ch in raw_sql.chars() {
        match state {
            State::Normal => {
                if ch == '?' {
                    source.push('@');
                    let formal_name = next_param
                        .next()
                        .and_then(|p| p.formal_name.as_deref())
                        .unwrap_or_default();
                    source.push_str(formal_name);
                } else {
                    source.push(ch);
                    if ch == '\'' {
                        state = State::InString;
                    }
                }
            }
            State::InString => {
                source.push(ch);
                if ch == '\'' {
                    state = State::Normal;
                } else if ch == '\\' {
                    state = State::InStringEscaped;
                }
            }
            State::InStringEscaped => {
                source.push(ch);
                state = State::InString;
            }
        }
    }
    source
}

/// Process-wide counter for temporary procedure names.
static NEXT_PROC_ID: AtomicU64 = AtomicU64::new(1);

/// Generate a unique temporary procedure name of the form `#jdbc#<n>`.
///
/// The leading `#` makes the procedure temporary on the server; it is
/// dropped with the owning session.
#[must_use]
pub fn next_temp_proc_name() -> String {
    format!("#jdbc#{}", NEXT_PROC_ID.fetch_add(1, Ordering::Relaxed))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::params::{BoundValue, ParamType};

    fn codec() -> CharsetCodec {
        CharsetCodec::for_server_charset("cp1252").unwrap()
    }

    fn text_param(value: &str) -> ParameterDescriptor {
        ParameterDescriptor::input(ParamType::Char, BoundValue::Text(value.to_string()))
    }

    #[test]
    fn test_build_single_parameter() {
        let mut params = vec![text_param("hi")];
        let proc = Procedure::build(
            "select * from t where a=?",
            "#jdbc#1",
            &mut params,
            TdsVersion::V7_0,
            &codec(),
        )
        .unwrap();

        assert_eq!(
            proc.source(),
            "create proc #jdbc#1(@P1 nvarchar(4000)) as select * from t where a=@P1"
        );
        assert_eq!(proc.parameters()[0].formal_type.as_deref(), Some("nvarchar(4000)"));
        assert!(!proc.has_lob_parameters());
        // The caller's descriptor got the formal type back but kept its
        // actual bound length.
        assert_eq!(params[0].formal_type.as_deref(), Some("nvarchar(4000)"));
        assert_eq!(params[0].max_length, Some(2));
    }

    #[test]
    fn test_build_no_parameters() {
        let mut params = vec![];
        let proc = Procedure::build(
            "select 1",
            "#jdbc#2",
            &mut params,
            TdsVersion::V7_0,
            &codec(),
        )
        .unwrap();
        assert_eq!(proc.source(), "create proc #jdbc#2 as select 1");
    }

    #[test]
    fn test_build_multiple_parameters() {
        let mut params = vec![
            text_param("a"),
            ParameterDescriptor::input(ParamType::Integer, BoundValue::Opaque),
        ];
        let proc = Procedure::build(
            "insert into t values(?, ?)",
            "#jdbc#3",
            &mut params,
            TdsVersion::V5_0,
            &codec(),
        )
        .unwrap();
        assert_eq!(
            proc.source(),
            "create proc #jdbc#3(@P1 varchar(255), @P2 integer) as insert into t values(@P1, @P2)"
        );
    }

    #[test]
    fn test_placeholder_inside_string_not_substituted() {
        let mut params = vec![text_param("a")];
        let proc = Procedure::build(
            "select * from t where a=? and b='x?y'",
            "#jdbc#4",
            &mut params,
            TdsVersion::V7_0,
            &codec(),
        )
        .unwrap();
        assert!(proc.source().ends_with("as select * from t where a=@P1 and b='x?y'"));
    }

    #[test]
    fn test_formal_name_skips_literal_collision() {
        let mut params = vec![text_param("a")];
        let proc = Procedure::build(
            "select 'P1' from t where a=?",
            "#jdbc#5",
            &mut params,
            TdsVersion::V7_0,
            &codec(),
        )
        .unwrap();
        assert_eq!(proc.parameters()[0].formal_name.as_deref(), Some("P2"));
        assert!(proc.source().ends_with("as select 'P1' from t where a=@P2"));
    }

    #[test]
    fn test_output_parameter_renders_output() {
        let mut params = vec![ParameterDescriptor::output(ParamType::Integer)];
        let proc = Procedure::build(
            "select ?",
            "#jdbc#6",
            &mut params,
            TdsVersion::V7_0,
            &codec(),
        )
        .unwrap();
        assert_eq!(
            proc.source(),
            "create proc #jdbc#6(@P1 integer output) as select @P1"
        );
    }

    #[test]
    fn test_parameter_count_mismatch() {
        let mut params = vec![text_param("a"), text_param("b")];
        let err = Procedure::build(
            "select * from t where a=?",
            "#jdbc#7",
            &mut params,
            TdsVersion::V7_0,
            &codec(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PrepareError::ParameterCountMismatch {
                placeholders: 1,
                parameters: 2
            }
        ));
    }

    #[test]
    fn test_unset_parameter_rejected() {
        let mut params = vec![ParameterDescriptor::new()];
        let err = Procedure::build(
            "select * from t where a=?",
            "#jdbc#8",
            &mut params,
            TdsVersion::V7_0,
            &codec(),
        )
        .unwrap_err();
        assert!(matches!(err, PrepareError::ParameterNotSet { index: 1 }));
    }

    #[test]
    fn test_lob_parameters_flagged() {
        let mut params = vec![ParameterDescriptor::input(
            ParamType::VarBinary,
            BoundValue::Opaque,
        )];
        let proc = Procedure::build(
            "insert into t values(?)",
            "#jdbc#9",
            &mut params,
            TdsVersion::V7_0,
            &codec(),
        )
        .unwrap();
        assert!(proc.has_lob_parameters());
    }

    #[test]
    fn test_compatible_same_class_shorter_value() {
        let mut params = vec![text_param("hello")];
        let proc = Procedure::build(
            "select * from t where a=?",
            "#jdbc#10",
            &mut params,
            TdsVersion::V7_0,
            &codec(),
        )
        .unwrap();

        // A later call binding a 10-character value of the same class fits
        // the cached nvarchar(4000) formal.
        let candidate = vec![text_param("0123456789")];
        assert!(proc.compatible_parameters(&candidate));
    }

    #[test]
    fn test_incompatible_when_length_exceeds_formal() {
        let mut params = vec![text_param("short")];
        let proc = Procedure::build(
            "select * from t where a=?",
            "#jdbc#11",
            &mut params,
            TdsVersion::V5_0,
            &codec(),
        )
        .unwrap();
        assert_eq!(proc.parameters()[0].max_length, Some(255));

        let candidate = vec![text_param(&"x".repeat(300))];
        assert!(!proc.compatible_parameters(&candidate));
    }

    #[test]
    fn test_incompatible_on_count_mismatch() {
        let mut params = vec![text_param("a")];
        let proc = Procedure::build(
            "select * from t where a=?",
            "#jdbc#12",
            &mut params,
            TdsVersion::V7_0,
            &codec(),
        )
        .unwrap();
        assert!(!proc.compatible_parameters(&[]));
    }

    #[test]
    fn test_compatible_non_character_requires_equal_formal_type() {
        let mut params = vec![ParameterDescriptor::input(
            ParamType::Integer,
            BoundValue::Opaque,
        )];
        let proc = Procedure::build(
            "select * from t where a=?",
            "#jdbc#13",
            &mut params,
            TdsVersion::V7_0,
            &codec(),
        )
        .unwrap();

        // The caller's list carries the formal type copied back by build.
        assert!(proc.compatible_parameters(&params));

        let other = vec![ParameterDescriptor::input(
            ParamType::SmallInt,
            BoundValue::Opaque,
        )];
        // Fresh descriptors with no formal type assigned are incompatible.
        assert!(!proc.compatible_parameters(&other));
    }

    #[test]
    fn test_unique_proc_names() {
        let a = next_temp_proc_name();
        let b = next_temp_proc_name();
        assert!(a.starts_with("#jdbc#"));
        assert_ne!(a, b);
    }
}
