//! Field filters for caption listings.
//!
//! A `FilterOptions` is an ordered conjunction of `field <op> value`
//! conditions. Storage backends either evaluate it in memory
//! ([`FilterOptions::matches`]) or translate it into a `WHERE` clause.

use crate::caption::{Caption, UserId};

/// Comparison operator of a single condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
}

impl Operator {
    pub fn as_sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "<>",
        }
    }
}

/// Caption fields that may be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionField {
    Text,
    AuthorId,
    Approved,
}

impl CaptionField {
    /// Column name in the `caption` table.
    pub fn column(self) -> &'static str {
        match self {
            CaptionField::Text => "text",
            CaptionField::AuthorId => "author_id",
            CaptionField::Approved => "approved",
        }
    }
}

/// Right-hand side of a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<UserId> for FilterValue {
    fn from(value: UserId) -> Self {
        FilterValue::Int(value.0)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub field: CaptionField,
    pub value: FilterValue,
    pub operator: Operator,
}

impl Condition {
    fn matches(&self, caption: &Caption) -> bool {
        let equal = match (&self.field, &self.value) {
            (CaptionField::Text, FilterValue::Text(text)) => caption.text == *text,
            (CaptionField::AuthorId, FilterValue::Int(id)) => caption.author_id.0 == *id,
            (CaptionField::Approved, FilterValue::Bool(flag)) => caption.approved == *flag,
            // Mismatched types never compare equal.
            _ => false,
        };
        match self.operator {
            Operator::Eq => equal,
            Operator::NotEq => !equal,
        }
    }
}

/// Ordered list of conditions, all of which must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    conditions: Vec<Condition>,
}

impl FilterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a condition. Builder-style so filters read left to right.
    pub fn add(
        mut self,
        field: CaptionField,
        value: impl Into<FilterValue>,
        operator: Operator,
    ) -> Self {
        self.conditions.push(Condition {
            field,
            value: value.into(),
            operator,
        });
        self
    }

    /// `approved = false`
    pub fn pending() -> Self {
        Self::new().add(CaptionField::Approved, false, Operator::Eq)
    }

    /// `approved = true`
    pub fn approved() -> Self {
        Self::new().add(CaptionField::Approved, true, Operator::Eq)
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, caption: &Caption) -> bool {
        self.conditions.iter().all(|c| c.matches(caption))
    }
}
