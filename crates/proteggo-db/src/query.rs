//! Query model shared by every document store backend.

use std::cmp::Ordering;

use serde_json::Value;

/// Document body: a JSON object.
pub type Fields = serde_json::Map<String, Value>;

/// One stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals the value.
    Eq(String, Value),
    /// Field equals one of the values.
    In(String, Vec<Value>),
    /// Field is absent or null.
    IsNull(String),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn is_in(field: &str, values: Vec<Value>) -> Self {
        Filter::In(field.to_string(), values)
    }

    pub fn is_null(field: &str) -> Self {
        Filter::IsNull(field.to_string())
    }

    pub fn field(&self) -> &str {
        match self {
            Filter::Eq(f, _) | Filter::In(f, _) | Filter::IsNull(f) => f,
        }
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        match self {
            Filter::Eq(field, expected) => fields.get(field) == Some(expected),
            Filter::In(field, candidates) => fields
                .get(field)
                .map(|v| candidates.contains(v))
                .unwrap_or(false),
            Filter::IsNull(field) => matches!(fields.get(field), None | Some(Value::Null)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Filtered, ordered and paginated query over one collection.
///
/// Results are ordered by the order-by field (if any) and then by document id.
/// `start_after` names the id of the last document of the previous page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
    pub start_after: Option<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_after(mut self, id: impl Into<String>) -> Self {
        self.start_after = Some(id.into());
        self
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters.iter().all(|f| f.matches(fields))
    }

    /// Ordering of two documents under this query, ties broken by id.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let by_field = match &self.order_by {
            Some(order) => {
                let ordering = compare_values(a.fields.get(&order.field), b.fields.get(&order.field));
                match order.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            }
            None => Ordering::Equal,
        };
        let by_id = match self.order_by.as_ref().map(|o| o.direction) {
            Some(Direction::Desc) => b.id.cmp(&a.id),
            _ => a.id.cmp(&b.id),
        };
        by_field.then(by_id)
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Total order over JSON values: null < bool < number < string < array < object.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
