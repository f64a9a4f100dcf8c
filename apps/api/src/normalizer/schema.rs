//! Schema descriptors: the per-call-site contract a model reply is coerced into.
//!
//! Schemas are owned by callers (see `crate::contracts`) and may also arrive over
//! HTTP, so every type here is serde-deserializable.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Describes the fields a use case expects back from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectedSchema {
    pub name: String,
    #[serde(default)]
    pub shape: SchemaShape,
    pub fields: Vec<FieldSpec>,
}

/// Top-level shape of the reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchemaShape {
    /// A JSON object. A top-level array is a shape mismatch.
    #[default]
    Object,
    /// A JSON object, or a bare top-level array bound to the named list field.
    ListRoot { field: String },
    /// Free text. The whole reply (fences stripped) is the named string field.
    Text { field: String },
}

/// A single declared output field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// A missing required field is reported through the `repaired` flag.
    #[serde(default)]
    pub required: bool,
    /// Alternative keys or dotted paths consulted when `name` is absent.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Number {
        min: f64,
        max: f64,
        /// Values in (0, 1] are read as a fraction of the range (0.38 → 38).
        #[serde(default)]
        fraction_scale: bool,
    },
    Bool,
    /// Short string; eligible for salvage.
    String,
    /// Long free text; never salvaged.
    Text,
    StringList,
    ObjectList {
        keys: Vec<ItemKey>,
        /// Bare string entries are wrapped into an object under this key.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        wrap_key: Option<String>,
        /// Entries whose value for this key is empty are dropped.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        required_key: Option<String>,
    },
    StringMap,
}

/// One key of an object-list entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemKey {
    pub name: String,
    #[serde(default)]
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    #[default]
    String,
    StringList,
}

impl ExpectedSchema {
    pub fn object(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            shape: SchemaShape::Object,
            fields,
        }
    }

    pub fn with_shape(mut self, shape: SchemaShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// A result made entirely of field defaults.
    pub fn defaults(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.default_value()))
            .collect()
    }
}

impl FieldSpec {
    fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            required: false,
            aliases: Vec::new(),
        }
    }

    pub fn number(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self::new(
            name,
            FieldKind::Number {
                min,
                max,
                fraction_scale: false,
            },
        )
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn string_list(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::StringList)
    }

    pub fn string_map(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::StringMap)
    }

    pub fn object_list(name: impl Into<String>, keys: Vec<ItemKey>) -> Self {
        Self::new(
            name,
            FieldKind::ObjectList {
                keys,
                wrap_key: None,
                required_key: None,
            },
        )
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Only meaningful on `Number` fields.
    pub fn fraction_scaled(mut self) -> Self {
        if let FieldKind::Number { fraction_scale, .. } = &mut self.kind {
            *fraction_scale = true;
        }
        self
    }

    /// Only meaningful on `ObjectList` fields.
    pub fn wrapping_strings_as(mut self, key: &str) -> Self {
        if let FieldKind::ObjectList { wrap_key, .. } = &mut self.kind {
            *wrap_key = Some(key.to_string());
        }
        self
    }

    /// Only meaningful on `ObjectList` fields.
    pub fn dropping_entries_without(mut self, key: &str) -> Self {
        if let FieldKind::ObjectList { required_key, .. } = &mut self.kind {
            *required_key = Some(key.to_string());
        }
        self
    }

    /// The declared default when it fits the field's type, else the kind's zero value.
    pub fn default_value(&self) -> Value {
        match &self.default {
            Some(value) if self.kind.accepts(value) => value.clone(),
            _ => self.kind.zero_value(),
        }
    }

    /// Whether tier-4 salvage may fill this field from loose text.
    pub fn salvageable(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::Number { .. } | FieldKind::Bool | FieldKind::String | FieldKind::StringList
        )
    }
}

impl FieldKind {
    pub fn zero_value(&self) -> Value {
        match self {
            FieldKind::Number { min, max, .. } => {
                let (lo, hi) = number_bounds(*min, *max);
                if lo <= 0.0 && 0.0 <= hi {
                    json!(0)
                } else {
                    number_value(lo)
                }
            }
            FieldKind::Bool => Value::Bool(false),
            FieldKind::String | FieldKind::Text => Value::String(String::new()),
            FieldKind::StringList | FieldKind::ObjectList { .. } => Value::Array(Vec::new()),
            FieldKind::StringMap => Value::Object(Map::new()),
        }
    }

    /// Whether `value` already has this kind's type (and range, for numbers).
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldKind::Number { min, max, .. } => {
                let (lo, hi) = number_bounds(*min, *max);
                value.as_f64().map(|n| n >= lo && n <= hi).unwrap_or(false)
            }
            FieldKind::Bool => value.is_boolean(),
            FieldKind::String | FieldKind::Text => value.is_string(),
            FieldKind::StringList => value
                .as_array()
                .map(|items| items.iter().all(Value::is_string))
                .unwrap_or(false),
            FieldKind::ObjectList { .. } => value
                .as_array()
                .map(|items| items.iter().all(Value::is_object))
                .unwrap_or(false),
            FieldKind::StringMap => value
                .as_object()
                .map(|map| map.values().all(Value::is_string))
                .unwrap_or(false),
        }
    }
}

impl ItemKey {
    pub fn string(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ItemKind::String,
            default: None,
        }
    }

    pub fn string_list(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ItemKind::StringList,
            default: None,
        }
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }
}

/// `(min, max)` as a usable range: swapped when inverted, NaN widened to infinity.
/// Schemas arrive from callers unvalidated, so every range check goes through this.
pub(crate) fn number_bounds(min: f64, max: f64) -> (f64, f64) {
    let min = if min.is_nan() { f64::NEG_INFINITY } else { min };
    let max = if max.is_nan() { f64::INFINITY } else { max };
    if min <= max {
        (min, max)
    } else {
        (max, min)
    }
}

/// Whole numbers are stored as JSON integers so that `85` and `85.0` compare equal
/// to what a direct parse would have produced.
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        json!(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or_else(|| json!(0))
    }
}
