use serde_json::Value;

/// Comparison operators available to field filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

/// A single comparison against a top-level document field.
#[derive(Clone, Debug)]
pub struct FieldFilter {
    field: String,
    operator: FilterOperator,
    value: Value,
}

impl FieldFilter {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Conjunction of field filters, forwarded opaquely to the store.
///
/// The ORM never interprets predicates; evaluation is entirely the store's
/// concern.
#[derive(Clone, Debug, Default)]
pub struct Predicate {
    filters: Vec<FieldFilter>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a filter, returning the predicate for chaining.
    pub fn filter(
        mut self,
        field: impl Into<String>,
        operator: FilterOperator,
        value: Value,
    ) -> Self {
        self.filters.push(FieldFilter::new(field, operator, value));
        self
    }

    /// Shorthand for a single equality predicate.
    pub fn field_equals(field: impl Into<String>, value: Value) -> Self {
        Self::new().filter(field, FilterOperator::Equal, value)
    }

    pub fn filters(&self) -> &[FieldFilter] {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}
