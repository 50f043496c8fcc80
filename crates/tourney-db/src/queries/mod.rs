//! Query functions, one module per table.

pub mod matches;
pub mod plannings;
pub mod pools;
pub mod teams;
pub mod tournaments;

/// PostgreSQL rejects statements with more bind parameters than this.
pub(crate) const MAX_BIND_PARAMS: usize = 65_535;

/// Rows of `columns` bind parameters each that fit in one statement.
pub(crate) const fn rows_per_statement(columns: usize) -> usize {
    MAX_BIND_PARAMS / columns
}
