use rusqlite::ToSql;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};
use crate::field_names::field_names;

/// One column of a record's table: the field name and its SQL definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub definition: &'static str,
}

impl Column {
    pub const fn new(name: &'static str, definition: &'static str) -> Self {
        Self { name, definition }
    }
}

/// A type stored as one row of one table.
///
/// `COLUMNS` must list exactly the serialized fields of the type, in the
/// order the table declares them. Rows are marshaled with serde_rusqlite, so
/// the serde field names are the column names.
pub trait Record: Serialize + DeserializeOwned {
    const TABLE: &'static str;
    const COLUMNS: &'static [Column];
    /// Table level constraints (composite keys, foreign keys).
    const CONSTRAINTS: &'static [&'static str] = &[];

    fn create_table_sql() -> String {
        let defs = Self::COLUMNS
            .iter()
            .map(|c| format!("{} {}", c.name, c.definition))
            .chain(Self::CONSTRAINTS.iter().map(|c| c.to_string()))
            .collect::<Vec<_>>()
            .join(",\n    ");
        format!("CREATE TABLE IF NOT EXISTS {} (\n    {}\n)", Self::TABLE, defs)
    }

    fn column_list() -> String {
        Self::COLUMNS
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn check_column(name: &'static str) -> Result<()> {
        if Self::COLUMNS.iter().any(|c| c.name == name) {
            Ok(())
        } else {
            Err(Error::UnknownField {
                table: Self::TABLE,
                field: name,
            })
        }
    }

    /// Fails unless the serialized fields are exactly `COLUMNS`, in order.
    fn check_fields(&self) -> Result<()> {
        let fields = field_names(self).map_err(|_| Error::FieldMismatch {
            table: Self::TABLE,
            fields: Vec::new(),
        })?;
        let columns = Self::COLUMNS.iter().map(|c| c.name);
        if fields.iter().copied().eq(columns) {
            Ok(())
        } else {
            Err(Error::FieldMismatch {
                table: Self::TABLE,
                fields,
            })
        }
    }
}

/// A record with an identity, possibly composite.
pub trait Keyed: Record {
    type Key;

    fn key(&self) -> Self::Key;
    fn key_filter(key: &Self::Key) -> Filter;
}

/// A record whose identity is a single integer column handed out by
/// `Exclusive::next_id`.
pub trait Allocated: Keyed<Key = i64> {
    const ID_COLUMN: &'static str = "id";
}

enum Term {
    Eq(&'static str, Box<dyn ToSql>),
    In(&'static str, Vec<Box<dyn ToSql>>),
}

/// Conjunction of equality and membership predicates over named columns.
#[derive(Default)]
pub struct Filter {
    terms: Vec<Term>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by<V: ToSql + 'static>(column: &'static str, value: V) -> Self {
        Self::new().eq(column, value)
    }

    pub fn eq<V: ToSql + 'static>(mut self, column: &'static str, value: V) -> Self {
        self.terms.push(Term::Eq(column, Box::new(value)));
        self
    }

    pub fn any_of<V, I>(mut self, column: &'static str, values: I) -> Self
    where
        V: ToSql + 'static,
        I: IntoIterator<Item = V>,
    {
        let values = values
            .into_iter()
            .map(|v| Box::new(v) as Box<dyn ToSql>)
            .collect();
        self.terms.push(Term::In(column, values));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Renders ` WHERE ...` (or nothing) and appends the bound values.
    pub(crate) fn where_clause<'a, R: Record>(
        &'a self,
        values: &mut Vec<&'a dyn ToSql>,
    ) -> Result<String> {
        if self.terms.is_empty() {
            return Ok(String::new());
        }

        let mut clauses = Vec::with_capacity(self.terms.len());
        for term in &self.terms {
            match term {
                Term::Eq(column, value) => {
                    R::check_column(*column)?;
                    clauses.push(format!("{} = ?", column));
                    values.push(value.as_ref());
                }
                Term::In(column, set) => {
                    R::check_column(*column)?;
                    let placeholders = vec!["?"; set.len()].join(", ");
                    clauses.push(format!("{} IN ({})", column, placeholders));
                    for value in set {
                        values.push(value.as_ref());
                    }
                }
            }
        }

        Ok(format!(" WHERE {}", clauses.join(" AND ")))
    }
}

/// Column assignments for a partial update.
#[derive(Default)]
pub struct Changes {
    assignments: Vec<(&'static str, Box<dyn ToSql>)>,
}

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<V: ToSql + 'static>(mut self, column: &'static str, value: V) -> Self {
        self.assignments.push((column, Box::new(value)));
        self
    }

    pub(crate) fn set_clause<'a, R: Record>(
        &'a self,
        values: &mut Vec<&'a dyn ToSql>,
    ) -> Result<String> {
        if self.assignments.is_empty() {
            return Err(Error::EmptyUpdate { table: R::TABLE });
        }

        let mut clauses = Vec::with_capacity(self.assignments.len());
        for (column, value) in &self.assignments {
            R::check_column(*column)?;
            clauses.push(format!("{} = ?", column));
            values.push(value.as_ref());
        }
        Ok(clauses.join(", "))
    }
}
