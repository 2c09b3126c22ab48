use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value of a single form field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(Value),
    /// Same field submitted more than once
    Multiple(Vec<Value>),
}

impl FieldValue {
    /// First submitted value
    pub fn first(&self) -> Option<&Value> {
        match self {
            FieldValue::Single(value) => Some(value),
            FieldValue::Multiple(values) => values.first(),
        }
    }

    pub fn into_json(self) -> Value {
        match self {
            FieldValue::Single(value) => value,
            FieldValue::Multiple(values) => Value::Array(values),
        }
    }
}

/// Accumulated form submission, in the order fields were added
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldData {
    fields: Vec<(String, FieldValue)>,
}

impl FieldData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value for `name`. A repeated name accumulates into a
    /// multi-value field instead of replacing the earlier value.
    pub fn add_field_data(&mut self, name: &str, value: Value) {
        match self.fields.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => {
                let current = std::mem::replace(existing, FieldValue::Multiple(Vec::new()));
                *existing = match current {
                    FieldValue::Single(first) => FieldValue::Multiple(vec![first, value]),
                    FieldValue::Multiple(mut values) => {
                        values.push(value);
                        FieldValue::Multiple(values)
                    }
                };
            }
            None => self.fields.push((name.to_string(), FieldValue::Single(value))),
        }
    }

    pub fn get_field_data(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn contains_field(&self, name: &str) -> bool {
        self.get_field_data(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Caller supplied identification of the item being saved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemIdentity {
    pub kind: String,
    pub id: String,
}

impl ItemIdentity {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// True when the id is already a full node reference
    pub fn is_qualified(&self) -> bool {
        self.id.contains("://")
    }
}

/// A decoded form post, ready to be saved
#[derive(Debug, Clone, PartialEq)]
pub struct FormSubmission {
    pub item: ItemIdentity,
    pub fields: FieldData,
    pub redirect: Option<Value>,
}
