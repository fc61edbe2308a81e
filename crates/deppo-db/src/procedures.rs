//! Named SQL scripts standing in for stored procedures.
//!
//! SQLite has no server-side procedures. A [`ProcedureCatalog`] maps a
//! procedure name to the script it runs, so callers keep addressing
//! procedures by name the way they would on a full database server.

use std::collections::HashMap;
use std::sync::Arc;

use crate::DbError;

/// Immutable map of procedure name to SQL script.
///
/// Cloning is cheap; the scripts are shared.
#[derive(Debug, Clone, Default)]
pub struct ProcedureCatalog {
    scripts: Arc<HashMap<String, String>>,
}

impl ProcedureCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a catalog with `name` registered to `script`.
    #[must_use]
    pub fn with_procedure(self, name: impl Into<String>, script: impl Into<String>) -> Self {
        let mut scripts = Arc::unwrap_or_clone(self.scripts);
        scripts.insert(name.into(), script.into());
        Self {
            scripts: Arc::new(scripts),
        }
    }

    /// Looks up the script registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnknownProcedure`] if no script has that name.
    pub fn script(&self, name: &str) -> Result<&str, DbError> {
        self.scripts
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| DbError::UnknownProcedure(name.to_owned()))
    }

    /// Number of registered procedures.
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

impl From<HashMap<String, String>> for ProcedureCatalog {
    fn from(scripts: HashMap<String, String>) -> Self {
        Self {
            scripts: Arc::new(scripts),
        }
    }
}
