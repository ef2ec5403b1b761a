//! Builder for the report query language accepted as the `tq` parameter.

use chrono::NaiveDate;
use longboard_types::LongboardError;
use thiserror::Error;

/// A query that cannot be serialized yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("no fields specified")]
    NoFields,
    #[error("no where conditions specified")]
    NoConditions,
}

impl From<QueryError> for LongboardError {
    fn from(e: QueryError) -> Self {
        Self::Validation(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conjunction {
    And,
    Or,
}

/// Accumulates selected columns and `WHERE` clauses.
///
/// Column names are lower-cased and de-duplicated, keeping first-seen order.
/// The first clause is emitted bare; later ones are joined with `AND` or `OR`
/// according to the method that added them.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    fields: Vec<String>,
    wheres: Vec<(Conjunction, String)>,
}

impl QueryBuilder {
    /// Start a query selecting `fields`.
    pub fn get<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::default().field(fields)
    }

    /// Add columns; blank names are ignored.
    #[must_use]
    pub fn field<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for f in fields {
            let f = f.as_ref().trim();
            if f.is_empty() {
                continue;
            }
            let f = f.to_lowercase();
            if !self.fields.contains(&f) {
                self.fields.push(f);
            }
        }
        self
    }

    /// `<field> <comparator> '<value>'`, joined with `AND`.
    #[must_use]
    pub fn and_where(self, field: &str, comparator: &str, value: &str) -> Self {
        self.and_where_condition(format!("{field} {comparator} '{value}'"))
    }

    /// Like [`and_where`](Self::and_where), with the date in ISO-8601 form.
    #[must_use]
    pub fn and_where_date(self, field: &str, comparator: &str, date: NaiveDate) -> Self {
        self.and_where(field, comparator, &date.format("%Y-%m-%d").to_string())
    }

    #[must_use]
    pub fn and_where_condition(mut self, condition: impl Into<String>) -> Self {
        self.wheres.push((Conjunction::And, condition.into()));
        self
    }

    #[must_use]
    pub fn or_where_condition(mut self, condition: impl Into<String>) -> Self {
        self.wheres.push((Conjunction::Or, condition.into()));
        self
    }

    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Serialize to `SELECT f1,f2 WHERE c1 AND c2 ...`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::NoFields`] or [`QueryError::NoConditions`] when
    /// either part was never added.
    pub fn build(&self) -> Result<String, QueryError> {
        if self.fields.is_empty() {
            return Err(QueryError::NoFields);
        }
        if self.wheres.is_empty() {
            return Err(QueryError::NoConditions);
        }
        let mut clause = String::new();
        for (i, (conj, cond)) in self.wheres.iter().enumerate() {
            if i > 0 {
                clause.push_str(match conj {
                    Conjunction::And => " AND ",
                    Conjunction::Or => " OR ",
                });
            }
            clause.push_str(cond);
        }
        Ok(format!("SELECT {} WHERE {clause}", self.fields.join(",")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_FIELDS: [&str; 0] = [];

    #[test]
    fn test_fields_deduplicated_case_insensitive() {
        let q = QueryBuilder::get(["a", "A", "b"])
            .and_where("date", ">=", "2023-01-01")
            .or_where_condition("x=1")
            .build()
            .unwrap();
        assert_eq!(q, "SELECT a,b WHERE date >= '2023-01-01' OR x=1");
    }

    #[test]
    fn test_first_clause_is_bare() {
        let q = QueryBuilder::get(["hours"])
            .or_where_condition("a=1")
            .and_where_condition("b=2")
            .build()
            .unwrap();
        assert_eq!(q, "SELECT hours WHERE a=1 AND b=2");
    }

    #[test]
    fn test_conjunction_follows_method() {
        let q = QueryBuilder::get(["x"])
            .and_where_condition("a=1")
            .or_where_condition("b=2")
            .and_where_condition("c=3")
            .build()
            .unwrap();
        assert_eq!(q, "SELECT x WHERE a=1 OR b=2 AND c=3");
    }

    #[test]
    fn test_dates_are_iso() {
        let from = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let q = QueryBuilder::get(["Worked_On", "hours"])
            .and_where_date("worked_on", ">=", from)
            .and_where_date("worked_on", "<=", to)
            .build()
            .unwrap();
        assert_eq!(
            q,
            "SELECT worked_on,hours WHERE worked_on >= '2024-03-05' AND worked_on <= '2024-12-31'"
        );
    }

    #[test]
    fn test_blank_fields_ignored() {
        let b = QueryBuilder::get(["", "  ", "a"]).field(["B", "a"]);
        assert_eq!(b.fields(), ["a", "b"]);
    }

    #[test]
    fn test_build_without_fields() {
        let err = QueryBuilder::get(NO_FIELDS)
            .and_where_condition("a=1")
            .build()
            .unwrap_err();
        assert_eq!(err, QueryError::NoFields);
    }

    #[test]
    fn test_build_without_conditions() {
        assert_eq!(
            QueryBuilder::get(["a"]).build().unwrap_err(),
            QueryError::NoConditions
        );
    }

    #[test]
    fn test_query_error_is_validation() {
        let err: LongboardError = QueryError::NoFields.into();
        assert!(matches!(err, LongboardError::Validation(_)));
    }
}
