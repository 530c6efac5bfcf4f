use std::collections::BTreeSet;

use crate::table::{Error, Table};

/// Values a predicate column accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accepted {
    Value(String),
    AnyOf(BTreeSet<String>),
}

impl Accepted {
    pub fn any_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Accepted::AnyOf(values.into_iter().map(Into::into).collect())
    }

    pub fn accepts(&self, cell: &str) -> bool {
        match self {
            Accepted::Value(value) => value == cell,
            Accepted::AnyOf(values) => values.contains(cell),
        }
    }
}

/// Column equality/membership clauses, all of which a row must satisfy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    clauses: Vec<(String, Accepted)>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, accepted: Accepted) -> Self {
        self.clauses.push((column.into(), accepted));
        self
    }
}

/// Keeps the rows matching `predicate`, in their original order.
///
/// Predicate columns missing from the header fail with `KeyError` before
/// any row is looked at.
pub fn filter(table: &Table, predicate: &Predicate) -> Result<Table, Error> {
    let mut resolved = Vec::with_capacity(predicate.clauses.len());
    for (column, accepted) in &predicate.clauses {
        resolved.push((table.require_column(column)?, accepted));
    }

    let rows = table
        .rows()
        .iter()
        .filter(|row| {
            resolved
                .iter()
                .all(|(idx, accepted)| accepted.accepts(&row[*idx]))
        })
        .cloned()
        .collect();

    return Ok(Table::from_checked(table.headers().to_vec(), rows));
}

#[cfg(test)]
mod tests {
    use super::filter;
    use super::Accepted;
    use super::Predicate;
    use crate::table::{parse, Delimiter, Error, Table};

    fn sample_table() -> Table {
        parse(
            "\
region     arch    ami
us-east-1  x86_64  ami-111
us-east-1  arm64   ami-222
eu-west-1  x86_64  ami-333
ap-south-1 x86_64  ami-444
",
            Delimiter::Whitespace,
        )
        .unwrap()
    }

    #[test]
    fn empty_predicate_keeps_every_row() {
        let table = sample_table();

        let out = filter(&table, &Predicate::new()).unwrap();
        assert_eq!(table, out);
    }

    #[test]
    fn equality_clause() {
        let table = sample_table();
        let predicate = Predicate::new().with("arch", Accepted::Value(String::from("x86_64")));

        let out = filter(&table, &predicate).unwrap();
        let amis: Vec<&str> = out.rows().iter().map(|row| row[2].as_str()).collect();
        assert_eq!(vec!["ami-111", "ami-333", "ami-444"], amis);
    }

    #[test]
    fn membership_and_equality_combine() {
        let table = sample_table();
        let predicate = Predicate::new()
            .with("region", Accepted::any_of(["ap-south-1", "us-east-1"]))
            .with("arch", Accepted::Value(String::from("x86_64")));

        let out = filter(&table, &predicate).unwrap();
        let amis: Vec<&str> = out.rows().iter().map(|row| row[2].as_str()).collect();
        assert_eq!(vec!["ami-111", "ami-444"], amis);
    }

    #[test]
    fn no_match_is_not_an_error() {
        let table = sample_table();
        let predicate = Predicate::new().with("arch", Accepted::Value(String::from("riscv")));

        let out = filter(&table, &predicate).unwrap();
        assert_eq!(0, out.row_count());
        assert_eq!(table.headers(), out.headers());
    }

    #[test]
    fn unknown_column_is_key_error() {
        let table = sample_table();
        let predicate = Predicate::new().with("owner", Accepted::Value(String::from("amazon")));

        assert_eq!(
            Err(Error::KeyError(String::from("owner"))),
            filter(&table, &predicate)
        );
    }
}
