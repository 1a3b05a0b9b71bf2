//! Ordered collections of column descriptors.

use crate::column::{Column, Nullability};
use crate::error::MetaError;

/// Information about the columns in a result set.
///
/// Columns are addressed 1-based, matching their wire ordinals, and the
/// set grows automatically on first reference to a column number.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnSet {
    columns: Vec<Column>,
    column_count: usize,
}

impl ColumnSet {
    /// Create an empty column set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of columns referenced so far.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Get the column at a 1-based position, if it has been referenced.
    #[must_use]
    pub fn column(&self, number: usize) -> Option<&Column> {
        number
            .checked_sub(1)
            .and_then(|i| self.columns.get(i))
    }

    /// Get the column at a 1-based position, growing the set as needed.
    ///
    /// # Panics
    ///
    /// Panics if `number` is zero; column numbers start at 1.
    pub fn column_mut(&mut self, number: usize) -> &mut Column {
        assert!(number > 0, "column numbers are 1-based");
        if number > self.column_count {
            self.column_count = number;
        }
        if self.columns.len() < number {
            self.columns.resize_with(number, Column::default);
        }
        &mut self.columns[number - 1]
    }

    /// Set the base-table column name.
    pub fn set_name(&mut self, number: usize, value: impl Into<String>) {
        self.column_mut(number).name = Some(value.into());
    }

    /// Set the display label.
    pub fn set_label(&mut self, number: usize, value: impl Into<String>) {
        self.column_mut(number).label = Some(value.into());
    }

    /// Set the maximum display width.
    pub fn set_display_size(&mut self, number: usize, value: i32) {
        self.column_mut(number).display_size = Some(value);
    }

    /// Set the on-wire buffer size.
    pub fn set_buffer_size(&mut self, number: usize, value: i32) {
        self.column_mut(number).buffer_size = Some(value);
    }

    /// Set the native server type tag.
    pub fn set_native_type(&mut self, number: usize, value: i32) {
        self.column_mut(number).native_type = Some(value);
    }

    /// Set the numeric precision.
    pub fn set_precision(&mut self, number: usize, value: i32) {
        self.column_mut(number).precision = Some(value);
    }

    /// Set the numeric scale.
    pub fn set_scale(&mut self, number: usize, value: i32) {
        self.column_mut(number).scale = Some(value);
    }

    /// Set the nullability attribute.
    pub fn set_nullable(&mut self, number: usize, value: Nullability) {
        self.column_mut(number).nullable = value;
    }

    /// Set the read-only attribute.
    pub fn set_read_only(&mut self, number: usize, value: bool) {
        self.column_mut(number).read_only = Some(value);
    }

    /// Set the identity (auto-increment) attribute.
    pub fn set_auto_increment(&mut self, number: usize, value: bool) {
        self.column_mut(number).auto_increment = Some(value);
    }

    /// Set the case-sensitivity attribute.
    pub fn set_case_sensitive(&mut self, number: usize, value: bool) {
        self.column_mut(number).case_sensitive = Some(value);
    }

    /// Merge the data from two column sets describing one result set.
    ///
    /// Older protocol generations deliver column information in multiple
    /// pieces, each giving a specific attribute subset for every column in
    /// the result set; those pieces must be joined together before the
    /// metadata is usable. For each column and attribute, the merged set
    /// takes whichever side knows the value.
    ///
    /// # Errors
    ///
    /// Returns [`MetaError::ColumnCountMismatch`] if the sets have
    /// different column counts, or [`MetaError::ConflictingColumnData`]
    /// if both sides know the same attribute. A conflict means the two
    /// fragments were not disjoint, which indicates the caller has lost
    /// track of the wire stream.
    pub fn merge(mut self, other: ColumnSet) -> Result<ColumnSet, MetaError> {
        if self.column_count != other.column_count {
            return Err(MetaError::ColumnCountMismatch {
                left: self.column_count,
                right: other.column_count,
            });
        }

        for (i, theirs) in other.columns.into_iter().enumerate() {
            let number = i + 1;
            let mine = self.column_mut(number);

            merge_field(&mut mine.name, theirs.name, number, "name")?;
            merge_field(&mut mine.display_size, theirs.display_size, number, "display_size")?;
            merge_field(&mut mine.label, theirs.label, number, "label")?;
            merge_field(&mut mine.native_type, theirs.native_type, number, "native_type")?;
            merge_field(&mut mine.precision, theirs.precision, number, "precision")?;
            merge_field(&mut mine.scale, theirs.scale, number, "scale")?;
            merge_field(&mut mine.read_only, theirs.read_only, number, "read_only")?;
            merge_field(
                &mut mine.auto_increment,
                theirs.auto_increment,
                number,
                "auto_increment",
            )?;

            if theirs.nullable.is_known() {
                if mine.nullable.is_known() {
                    return Err(MetaError::ConflictingColumnData {
                        column: number,
                        field: "nullable",
                    });
                }
                mine.nullable = theirs.nullable;
            }
        }
        Ok(self)
    }
}

/// Take the incoming value when ours is unknown; fail when both are known.
fn merge_field<T>(
    mine: &mut Option<T>,
    theirs: Option<T>,
    column: usize,
    field: &'static str,
) -> Result<(), MetaError> {
    match (mine.is_some(), theirs) {
        (true, Some(_)) => Err(MetaError::ConflictingColumnData { column, field }),
        (false, theirs @ Some(_)) => {
            *mine = theirs;
            Ok(())
        }
        (_, None) => Ok(()),
    }
}
