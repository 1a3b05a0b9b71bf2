//! Descriptive attributes of a single result-set column.

/// Whether a column accepts NULL values.
///
/// The wire protocol reports nullability explicitly, so `Unknown` means
/// the attribute has not been reported yet rather than "not nullable".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Nullability {
    /// Nullability has not been reported.
    #[default]
    Unknown,
    /// The column rejects NULL values.
    NotNull,
    /// The column accepts NULL values.
    Nullable,
}

impl Nullability {
    /// Has nullability been reported?
    #[must_use]
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Information about one column in a result set.
///
/// Every field starts out unknown. The protocol describes a column across
/// several token fragments, each carrying a disjoint subset of fields, so
/// `None` (or [`Nullability::Unknown`]) always means "not yet reported",
/// never "known to be absent".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Column {
    /// Catalog (database) the column belongs to.
    pub catalog: Option<String>,
    /// Schema (owner) the column belongs to.
    pub schema: Option<String>,
    /// Base table name.
    pub table: Option<String>,
    /// Column name in the base table.
    pub name: Option<String>,
    /// Display label, which may differ from the name for aliased columns.
    pub label: Option<String>,
    /// Maximum display width in characters.
    pub display_size: Option<i32>,
    /// Size of the column's on-wire buffer in bytes.
    pub buffer_size: Option<i32>,
    /// Native server type tag.
    pub native_type: Option<i32>,
    /// Numeric precision.
    pub precision: Option<i32>,
    /// Numeric scale.
    pub scale: Option<i32>,
    /// Whether the column accepts NULLs.
    pub nullable: Nullability,
    /// Whether the column is read-only.
    pub read_only: Option<bool>,
    /// Whether the column is an identity (auto-increment) column.
    pub auto_increment: Option<bool>,
    /// Whether comparisons on the column are case-sensitive.
    pub case_sensitive: Option<bool>,
}

impl Column {
    /// Create a column with every attribute unknown.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
