//! Named query parameters and row mapping.

use rusqlite::types::Value;
use rusqlite::{Row, Statement};

/// Maps one result row onto an entity.
///
/// Implementations read columns by name or index, the same way a
/// `query_row` closure would:
///
/// ```rust,ignore
/// impl FromRow for Depot {
///     fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
///         Ok(Self { id: row.get("id")?, name: row.get("name")? })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// Builds `Self` from the current row.
    ///
    /// # Errors
    ///
    /// Returns the driver error if a column is missing or has the wrong type.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

macro_rules! impl_scalar_from_row {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromRow for $ty {
                fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
                    row.get(0)
                }
            }
        )*
    };
}

// Single-column results read the first column.
impl_scalar_from_row!(i64, i32, f64, bool, String, Vec<u8>, Value);

/// An ordered set of named parameters.
///
/// Names may carry their SQLite prefix (`:id`, `@id`, `$id` or `?1`). A bare
/// name such as `id` binds to whichever of `:id`, `@id` and `$id` the
/// statement uses. A parameter is bound only to statements that reference
/// it; the rest are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    values: Vec<(String, Value)>,
}

impl QueryParams {
    /// An empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, replacing any earlier value with the same name.
    #[must_use]
    pub fn add(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
        self
    }

    /// Number of parameters in the set.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the set holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Binds every parameter the statement references.
    ///
    /// # Errors
    ///
    /// Returns the driver error if a value cannot be bound.
    pub(crate) fn bind_to(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<()> {
        for (name, value) in &self.values {
            if has_prefix(name) {
                if let Some(index) = stmt.parameter_index(name)? {
                    stmt.raw_bind_parameter(index, value)?;
                }
                continue;
            }
            for prefix in NAMED_PREFIXES {
                if let Some(index) = stmt.parameter_index(&format!("{prefix}{name}"))? {
                    stmt.raw_bind_parameter(index, value)?;
                }
            }
        }
        Ok(())
    }
}

const NAMED_PREFIXES: [char; 3] = [':', '@', '$'];

fn has_prefix(name: &str) -> bool {
    name.starts_with(|c| matches!(c, ':' | '@' | '$' | '?'))
}
