//! JDBC escape sequence translation.
//!
//! Statements may contain vendor-neutral `{...}` escape sequences — date,
//! time and timestamp literals, scalar function calls, procedure calls and
//! outer joins — that must be rewritten into the server's native dialect
//! before transmission. Translation is a single-pass character scan with an
//! explicit state machine; it is lexical, not grammatical, and tolerates
//! only the escape grammar described here.
//!
//! A trailing `{escape 'c'}` clause changes the LIKE-wildcard escape
//! character: the whole statement is re-scanned from the beginning with `c`
//! in place of the default backslash. Inside string literals the escape
//! character passes a following `_` or `%` through unchanged so the server
//! sees the wildcard escaped rather than a fresh token.

use crate::error::PrepareError;

/// Vendor-specific scalar function rewrites.
///
/// The common rewrites (`user` → `user_name`, `now` → `getdate`) apply to
/// every dialect; a dialect may add its own on top. Returning `None` passes
/// the function body through unchanged.
pub trait Dialect {
    /// Rewrite a `{fn ...}` body (marker already stripped) into native SQL.
    fn rewrite_function(&self, body: &str) -> Option<String>;
}

/// Microsoft SQL Server dialect.
///
/// No rewrites beyond the common set; unknown functions are passed through
/// and left to the server to resolve.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDialect;

impl Dialect for SqlServerDialect {
    fn rewrite_function(&self, _body: &str) -> Option<String> {
        None
    }
}

/// Sybase dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SybaseDialect;

impl Dialect for SybaseDialect {
    fn rewrite_function(&self, _body: &str) -> Option<String> {
        None
    }
}

/// Scanner state.
///
/// The `Escaped` states consume exactly one character after a backslash
/// inside a string literal, so an escaped quote does not terminate the
/// string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    InString,
    InStringEscaped,
    InEscape,
    InEscapeInString,
    InEscapeInStringEscaped,
}

/// Translates `{...}` escape sequences into native SQL.
#[derive(Debug, Clone, Default)]
pub struct EscapeTranslator<D: Dialect = SqlServerDialect> {
    dialect: D,
}

impl EscapeTranslator<SqlServerDialect> {
    /// Create a translator for the SQL Server dialect.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dialect: SqlServerDialect,
        }
    }
}

impl<D: Dialect> EscapeTranslator<D> {
    /// Create a translator for a specific dialect.
    #[must_use]
    pub fn with_dialect(dialect: D) -> Self {
        Self { dialect }
    }

    /// Rewrite a statement's escape sequences into native SQL.
    ///
    /// Statements without `{` are returned unchanged.
    ///
    /// # Errors
    ///
    /// Fails with [`PrepareError::MalformedEscape`],
    /// [`PrepareError::MalformedDateLiteral`],
    /// [`PrepareError::MalformedTimeLiteral`] or
    /// [`PrepareError::UnrecognizedEscape`] when an escape body does not
    /// match its grammar, and [`PrepareError::UnterminatedEscape`] when
    /// brace or quote nesting never closes.
    pub fn translate(&self, sql: &str) -> Result<String, PrepareError> {
        self.scan(sql, '\\')
    }

    fn scan(&self, sql: &str, escape_char: char) -> Result<String, PrepareError> {
        let chars: Vec<char> = sql.chars().collect();
        let mut result = String::with_capacity(sql.len());
        let mut escape = String::new();
        let mut escape_started_at = 0usize;
        let mut state = ScanState::Normal;
        let mut i = 0usize;

        while i < chars.len() {
            let ch = chars[i];
            match state {
                ScanState::Normal => {
                    if ch == '{' {
                        escape_started_at = i;
                        escape.clear();
                        state = ScanState::InEscape;
                    } else {
                        result.push(ch);
                        if ch == '\'' {
                            state = ScanState::InString;
                        }
                    }
                }
                ScanState::InString | ScanState::InStringEscaped => {
                    if ch == escape_char
                        && i + 1 < chars.len()
                        && matches!(chars[i + 1], '_' | '%')
                    {
                        // Escaped LIKE wildcard: pass both characters
                        // through so the server sees the wildcard escaped.
                        i += 1;
                        result.push('\\');
                        result.push(chars[i]);
                    } else {
                        result.push(ch);
                        if state == ScanState::InStringEscaped {
                            state = ScanState::InString;
                        } else {
                            if ch == '\\' {
                                state = ScanState::InStringEscaped;
                            }
                            if ch == '\'' {
                                state = ScanState::Normal;
                            }
                        }
                    }
                }
                ScanState::InEscape => {
                    if ch == '}' {
                        if escape.trim_start().starts_with("escape ") {
                            // An escape-character declarator must be the
                            // last thing in the statement. Re-scan the
                            // whole prefix with the declared character.
                            if i + 1 != chars.len() {
                                return Err(PrepareError::MalformedEscape {
                                    escape: escape.clone(),
                                });
                            }
                            let declared: String = chars[escape_started_at..].iter().collect();
                            let c = find_escape_character(&declared)?;
                            let prefix: String = chars[..escape_started_at].iter().collect();
                            result = self.scan(&prefix, c)?;
                            state = ScanState::Normal;
                        } else {
                            result.push_str(&self.expand_escape(&escape)?);
                            state = ScanState::Normal;
                        }
                    } else {
                        escape.push(ch);
                        if ch == '\'' {
                            state = ScanState::InEscapeInString;
                        }
                    }
                }
                ScanState::InEscapeInString | ScanState::InEscapeInStringEscaped => {
                    escape.push(ch);
                    if state == ScanState::InEscapeInStringEscaped {
                        state = ScanState::InEscapeInString;
                    } else {
                        if ch == '\\' {
                            state = ScanState::InEscapeInStringEscaped;
                        }
                        if ch == '\'' {
                            state = ScanState::InEscape;
                        }
                    }
                }
            }
            i += 1;
        }

        if state != ScanState::Normal && state != ScanState::InString {
            return Err(PrepareError::UnterminatedEscape);
        }
        Ok(result)
    }

    /// Expand one escape body (the text between `{` and `}`).
    fn expand_escape(&self, body: &str) -> Result<String, PrepareError> {
        let body = body.trim();

        if let Some(rest) = body.strip_prefix("fn ") {
            if let Some(result) = expand_common_function(rest)? {
                return Ok(result);
            }
            if let Some(result) = self.dialect.rewrite_function(rest) {
                return Ok(result);
            }
            return Ok(rest.to_string());
        }

        let call = body.strip_prefix("call ").map(|_| false).or_else(|| {
            body.strip_prefix("?=")
                .filter(|rest| rest.trim_start().starts_with("call "))
                .map(|_| true)
        });
        if let Some(returns_value) = call {
            return expand_call(body, returns_value);
        }

        if body.starts_with("d ") {
            return expand_date(body);
        }
        if body.starts_with("t ") {
            return expand_time(body);
        }
        if body.starts_with("ts ") {
            return expand_timestamp(body);
        }
        if let Some(join) = body.strip_prefix("oj ") {
            return Ok(join.trim().to_string());
        }

        Err(PrepareError::UnrecognizedEscape {
            escape: body.to_string(),
        })
    }
}

/// Expand scalar functions common to SQL Server and Sybase.
fn expand_common_function(body: &str) -> Result<Option<String>, PrepareError> {
    let Some(paren) = body.find('(') else {
        return Err(PrepareError::MalformedEscape {
            escape: body.to_string(),
        });
    };
    let name = body[..paren].trim();

    if name.eq_ignore_ascii_case("user") {
        return Ok(Some(format!("user_name{}", &body[paren..])));
    }
    if name.eq_ignore_ascii_case("now") {
        return Ok(Some(format!("getdate{}", &body[paren..])));
    }
    Ok(None)
}

/// Rewrite a `{call proc(a, b)}` body into native `exec proc a, b` syntax.
fn expand_call(body: &str, returns_value: bool) -> Result<String, PrepareError> {
    // Past the "call" keyword, whichever form introduced it.
    let after_call = match body.find("call") {
        Some(pos) => body[pos + 4..].trim(),
        None => body,
    };
    let prefix = if returns_value { "?=" } else { "" };

    match after_call.find('(') {
        Some(paren) => {
            if !after_call.ends_with(')') {
                return Err(PrepareError::MalformedEscape {
                    escape: body.to_string(),
                });
            }
            let name = &after_call[..paren];
            let args = &after_call[paren + 1..after_call.len() - 1];
            Ok(format!("exec {prefix}{name} {args}"))
        }
        None => Ok(format!("exec {prefix}{after_call}")),
    }
}

/// Is the slice made up only of digits? Leading or trailing signs and
/// spaces do not count as digits.
fn all_digits(chars: &[char]) -> bool {
    !chars.is_empty() && chars.iter().all(|c| c.is_ascii_digit())
}

fn skip_whitespace(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    i
}

/// Advance past a single leading quote, if present.
fn skip_quote(chars: &[char], i: usize) -> usize {
    if i < chars.len() && (chars[i] == '\'' || chars[i] == '"') {
        i + 1
    } else {
        i
    }
}

/// Parse the date digits at `i`, returning the native `YYYYMMDD` text and
/// the index past the date.
fn date_at(chars: &[char], i: usize, body: &str) -> Result<(String, usize), PrepareError> {
    if chars.len() - i < 10 || chars[i + 4] != '-' || chars[i + 7] != '-' {
        return Err(PrepareError::MalformedDateLiteral {
            literal: body.to_string(),
        });
    }
    let year = &chars[i..i + 4];
    let month = &chars[i + 5..i + 7];
    let day = &chars[i + 8..i + 10];
    if !all_digits(year) || !all_digits(month) || !all_digits(day) {
        return Err(PrepareError::MalformedDateLiteral {
            literal: body.to_string(),
        });
    }
    let mut text = String::with_capacity(8);
    text.extend(year);
    text.extend(month);
    text.extend(day);
    Ok((text, i + 10))
}

/// Parse the time digits at `i`, returning the native `HH:MM:SS` text and
/// the index past the time.
fn time_at(chars: &[char], i: usize, body: &str) -> Result<(String, usize), PrepareError> {
    if chars.len() - i < 8 || chars[i + 2] != ':' || chars[i + 5] != ':' {
        return Err(PrepareError::MalformedTimeLiteral {
            literal: body.to_string(),
        });
    }
    let hour = &chars[i..i + 2];
    let minute = &chars[i + 3..i + 5];
    let second = &chars[i + 6..i + 8];
    if !all_digits(hour) || !all_digits(minute) || !all_digits(second) {
        return Err(PrepareError::MalformedTimeLiteral {
            literal: body.to_string(),
        });
    }
    let mut text = String::with_capacity(8);
    text.extend(hour);
    text.push(':');
    text.extend(minute);
    text.push(':');
    text.extend(second);
    Ok((text, i + 8))
}

/// Reject anything but whitespace and an optional closing quote after a
/// literal.
fn require_literal_end(chars: &[char], i: usize) -> bool {
    let i = skip_whitespace(chars, i);
    let i = skip_quote(chars, i);
    let i = skip_whitespace(chars, i);
    i >= chars.len()
}

/// Convert a `{d 'YYYY-MM-DD'}` body into a native date string.
fn expand_date(body: &str) -> Result<String, PrepareError> {
    let chars: Vec<char> = body.chars().collect();
    // Past the "d " marker, any further whitespace, and a leading quote.
    let i = skip_whitespace(&chars, 2);
    let i = skip_quote(&chars, i);

    let (date, i) = date_at(&chars, i, body)?;
    if !require_literal_end(&chars, i) {
        return Err(PrepareError::MalformedDateLiteral {
            literal: body.to_string(),
        });
    }
    Ok(format!("'{date}'"))
}

/// Convert a `{t 'HH:MM:SS'}` body into a native time string.
fn expand_time(body: &str) -> Result<String, PrepareError> {
    let chars: Vec<char> = body.chars().collect();
    let i = skip_whitespace(&chars, 2);
    let i = skip_quote(&chars, i);

    let (time, i) = time_at(&chars, i, body)?;
    if !require_literal_end(&chars, i) {
        return Err(PrepareError::MalformedTimeLiteral {
            literal: body.to_string(),
        });
    }
    Ok(format!("'{time}'"))
}

/// Convert a `{ts 'YYYY-MM-DD HH:MM:SS[.f...]'}` body into a native
/// date-time string with the fraction normalized to milliseconds.
fn expand_timestamp(body: &str) -> Result<String, PrepareError> {
    let chars: Vec<char> = body.chars().collect();
    let i = skip_whitespace(&chars, 2);
    let i = skip_quote(&chars, i);

    if chars.len() - i < 19 {
        return Err(PrepareError::MalformedDateLiteral {
            literal: body.to_string(),
        });
    }
    let (date, i) = date_at(&chars, i, body)?;

    // At least one whitespace character between date and time.
    if !chars[i].is_whitespace() {
        return Err(PrepareError::MalformedDateLiteral {
            literal: body.to_string(),
        });
    }
    let i = skip_whitespace(&chars, i);

    let (time, mut i) = time_at(&chars, i, body)?;

    // Normalize the fraction to exactly three digits.
    let mut fraction = String::from("000");
    if i < chars.len() && chars[i] == '.' {
        fraction.clear();
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            if fraction.len() < 3 {
                fraction.push(chars[i]);
            }
            i += 1;
        }
        while fraction.len() < 3 {
            fraction.push('0');
        }
    }

    if !require_literal_end(&chars, i) {
        return Err(PrepareError::MalformedDateLiteral {
            literal: body.to_string(),
        });
    }
    Ok(format!("'{date} {time}.{fraction}'"))
}

/// Extract the declared character from a `{escape 'c'}` clause.
fn find_escape_character(clause: &str) -> Result<char, PrepareError> {
    let malformed = || PrepareError::MalformedEscape {
        escape: clause.to_string(),
    };

    let s = clause.trim();
    if !s.starts_with('{') || !s.ends_with('}') || s.len() < 12 {
        return Err(malformed());
    }
    let s = s[1..s.len() - 1].trim();
    let Some(rest) = s.strip_prefix("escape") else {
        return Err(malformed());
    };
    let quoted: Vec<char> = rest.trim().chars().collect();
    if quoted.len() != 3 || quoted[0] != '\'' || quoted[2] != '\'' {
        return Err(malformed());
    }
    Ok(quoted[1])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn translate(sql: &str) -> Result<String, PrepareError> {
        EscapeTranslator::new().translate(sql)
    }

    #[test]
    fn test_identity_without_escapes() {
        let sql = "select * from t where a = ? and b = 'x'";
        assert_eq!(translate(sql).unwrap(), sql);
    }

    #[test]
    fn test_braces_inside_string_pass_through() {
        let sql = "select '{d ''literal''}' from t";
        assert_eq!(translate(sql).unwrap(), sql);
    }

    #[test]
    fn test_date_literal() {
        assert_eq!(translate("{d '2024-01-05'}").unwrap(), "'20240105'");
    }

    #[test]
    fn test_date_literal_in_context() {
        assert_eq!(
            translate("select * from t where d = {d '2024-01-05'}").unwrap(),
            "select * from t where d = '20240105'"
        );
    }

    #[test]
    fn test_date_digits_not_range_checked() {
        // Digit validation only; range checking belongs downstream.
        assert_eq!(translate("{d '2024-13-05'}").unwrap(), "'20241305'");
    }

    #[test]
    fn test_date_wrong_width_fails() {
        let err = translate("{d '24-01-05'}").unwrap_err();
        assert!(matches!(err, PrepareError::MalformedDateLiteral { .. }));
    }

    #[test]
    fn test_date_trailing_garbage_fails() {
        let err = translate("{d '2024-01-05' x}").unwrap_err();
        assert!(matches!(err, PrepareError::MalformedDateLiteral { .. }));
    }

    #[test]
    fn test_time_literal() {
        assert_eq!(translate("{t '13:05:09'}").unwrap(), "'13:05:09'");
    }

    #[test]
    fn test_time_wrong_separator_fails() {
        let err = translate("{t '13-05-09'}").unwrap_err();
        assert!(matches!(err, PrepareError::MalformedTimeLiteral { .. }));
    }

    #[test]
    fn test_timestamp_literal_pads_fraction() {
        assert_eq!(
            translate("{ts '2024-01-05 13:05:09.4'}").unwrap(),
            "'20240105 13:05:09.400'"
        );
    }

    #[test]
    fn test_timestamp_literal_truncates_fraction() {
        assert_eq!(
            translate("{ts '2024-01-05 13:05:09.123456'}").unwrap(),
            "'20240105 13:05:09.123'"
        );
    }

    #[test]
    fn test_timestamp_without_fraction() {
        assert_eq!(
            translate("{ts '2024-01-05 13:05:09'}").unwrap(),
            "'20240105 13:05:09.000'"
        );
    }

    #[test]
    fn test_timestamp_without_time_fails() {
        let err = translate("{ts '2024-01-05'}").unwrap_err();
        assert!(matches!(err, PrepareError::MalformedDateLiteral { .. }));
    }

    #[test]
    fn test_fn_now() {
        assert_eq!(translate("{fn now()}").unwrap(), "getdate()");
    }

    #[test]
    fn test_fn_user() {
        assert_eq!(translate("{fn user()}").unwrap(), "user_name()");
    }

    #[test]
    fn test_fn_unknown_passes_through() {
        assert_eq!(translate("{fn dayname(d)}").unwrap(), "dayname(d)");
    }

    #[test]
    fn test_fn_without_parenthesis_fails() {
        let err = translate("{fn now}").unwrap_err();
        assert!(matches!(err, PrepareError::MalformedEscape { .. }));
    }

    #[test]
    fn test_call() {
        assert_eq!(translate("{call foo(?,?)}").unwrap(), "exec foo ?,?");
    }

    #[test]
    fn test_call_without_arguments() {
        assert_eq!(translate("{call foo}").unwrap(), "exec foo");
    }

    #[test]
    fn test_call_with_return_value() {
        assert_eq!(translate("{?= call foo(?)}").unwrap(), "exec ?=foo ?");
    }

    #[test]
    fn test_call_unclosed_parenthesis_fails() {
        let err = translate("{call foo(?,?}").unwrap_err();
        assert!(matches!(err, PrepareError::MalformedEscape { .. }));
    }

    #[test]
    fn test_outer_join_passes_through() {
        assert_eq!(
            translate("select * from {oj t1 left outer join t2 on t1.a = t2.a}").unwrap(),
            "select * from t1 left outer join t2 on t1.a = t2.a"
        );
    }

    #[test]
    fn test_unrecognized_escape() {
        let err = translate("{bogus thing}").unwrap_err();
        assert!(matches!(err, PrepareError::UnrecognizedEscape { .. }));
    }

    #[test]
    fn test_unterminated_escape() {
        let err = translate("select {d '2024-01-05'").unwrap_err();
        assert!(matches!(err, PrepareError::UnterminatedEscape));
    }

    #[test]
    fn test_unterminated_string_is_allowed() {
        // An open string literal at end of scan is tolerated; the server
        // reports the syntax error.
        assert_eq!(translate("select 'abc").unwrap(), "select 'abc");
    }

    #[test]
    fn test_default_escape_character_in_string() {
        assert_eq!(
            translate(r"select * from t where a like '10\%'").unwrap(),
            r"select * from t where a like '10\%'"
        );
    }

    #[test]
    fn test_custom_escape_character() {
        assert_eq!(
            translate("select * from t where a like '10~%' {escape '~'}").unwrap(),
            r"select * from t where a like '10\%' "
        );
    }

    #[test]
    fn test_custom_escape_character_underscore() {
        assert_eq!(
            translate("select * from t where a like 'x~_y' {escape '~'}").unwrap(),
            r"select * from t where a like 'x\_y' "
        );
    }

    #[test]
    fn test_escape_declarator_not_last_fails() {
        let err = translate("select * from t where a like '10~%' {escape '~'} order by a")
            .unwrap_err();
        assert!(matches!(err, PrepareError::MalformedEscape { .. }));
    }

    #[test]
    fn test_escape_declarator_composes_with_earlier_escapes() {
        // The prefix is re-scanned with the custom character, so the date
        // escape before the declarator still expands.
        assert_eq!(
            translate("select {d '2024-01-05'} where a like 'x~%' {escape '~'}").unwrap(),
            r"select '20240105' where a like 'x\%' "
        );
    }

    #[test]
    fn test_escape_declarator_malformed_quote_fails() {
        let err = translate("select 'a' {escape ~}").unwrap_err();
        assert!(matches!(err, PrepareError::MalformedEscape { .. }));
    }

    proptest! {
        #[test]
        fn translate_is_identity_without_braces(sql in r"[^{\\]*") {
            prop_assert_eq!(translate(&sql).unwrap(), sql);
        }
    }
}
