//! TDS protocol version definitions.

use core::fmt;

/// TDS protocol generation.
///
/// The formal parameter types generated for a temporary stored procedure
/// depend on the protocol generation: TDS 7.0 servers accept Unicode
/// (`nvarchar`/`ntext`) formals, older generations do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TdsVersion {
    /// TDS 4.2 (legacy SQL Server and Sybase).
    V4_2,
    /// TDS 5.0 (Sybase).
    V5_0,
    /// TDS 7.0 (SQL Server 7.0).
    V7_0,
}

impl TdsVersion {
    /// Check if this version is TDS 7.0.
    #[must_use]
    pub const fn is_7_0(self) -> bool {
        matches!(self, Self::V7_0)
    }

    /// Check if this version supports Unicode (`nvarchar`/`ntext`) formal
    /// parameter types.
    #[must_use]
    pub const fn supports_unicode(self) -> bool {
        self.is_7_0()
    }
}

impl fmt::Display for TdsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::V4_2 => "4.2",
            Self::V5_0 => "5.0",
            Self::V7_0 => "7.0",
        };
        f.write_str(s)
    }
}
