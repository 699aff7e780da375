use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

/// Root of a declarative panel document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub components: Vec<UiSpecNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiSpecNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<UiSpecNode>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl UiSpec {
    /// Gives every node without an explicit id a path-derived one
    /// (`node-0`, `node-0-2`, ...). Stable for identical documents.
    pub fn assign_ids(&mut self) {
        for (index, node) in self.components.iter_mut().enumerate() {
            node.assign_ids(&format!("node-{index}"));
        }
    }

    /// Ids of every node in the tree, depth first.
    pub fn node_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        for node in &self.components {
            node.collect_ids(&mut ids);
        }
        ids
    }
}

impl UiSpecNode {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            id: None,
            node_type: node_type.into(),
            properties: Map::new(),
            children: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_property(mut self, key: &str, value: Value) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }

    pub fn with_children(mut self, children: Vec<UiSpecNode>) -> Self {
        self.children = children;
        self
    }

    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    fn assign_ids(&mut self, path: &str) {
        if self.id.as_deref().map_or(true, |id| id.trim().is_empty()) {
            self.id = Some(path.to_string());
        }
        for (index, child) in self.children.iter_mut().enumerate() {
            child.assign_ids(&format!("{path}-{index}"));
        }
    }

    fn collect_ids<'a>(&'a self, out: &mut Vec<&'a str>) {
        out.push(self.id());
        for child in &self.children {
            child.collect_ids(out);
        }
    }

    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.properties.get(key).filter(|value| !value.is_null())
    }

    /// String-ish property; numbers and booleans are stringified.
    pub fn prop_str(&self, key: &str) -> Option<String> {
        match self.prop(key)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
    }

    /// First present string property among `keys`.
    pub fn prop_str_any(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.prop_str(key))
    }

    pub fn prop_f64(&self, key: &str) -> Option<f64> {
        value_as_f64(self.prop(key)?)
    }

    pub fn prop_bool(&self, key: &str) -> Option<bool> {
        match self.prop(key)? {
            Value::Bool(flag) => Some(*flag),
            Value::String(text) => crate::util::parse_bool_str(text),
            _ => None,
        }
    }

    pub fn prop_array(&self, key: &str) -> Option<&Vec<Value>> {
        self.prop(key)?.as_array()
    }
}

/// Lenient numeric read: accepts JSON numbers and numeric strings.
pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    }
    .filter(|number| number.is_finite())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Positive,
    Negative,
}

impl Feedback {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "positive" | "up" | "yes" => Some(Self::Positive),
            "negative" | "down" | "no" => Some(Self::Negative),
            _ => None,
        }
    }
}

/// Event emitted by a rendered node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiAction {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

pub const EXPAND_ACTION: &str = "expand";
pub const FEEDBACK_ACTION: &str = "feedback";
pub const FOLLOW_UP_ACTION: &str = "followUpQuery";

impl UiAction {
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            payload: None,
            label: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// `expanded` is the state to apply, not a toggle request.
    pub fn expand(node_id: &str, expanded: bool) -> Self {
        Self::new(EXPAND_ACTION).with_payload(json!({ "id": node_id, "expanded": expanded }))
    }

    pub fn feedback(node_id: &str, value: Feedback) -> Self {
        Self::new(FEEDBACK_ACTION).with_payload(json!({ "id": node_id, "value": value.as_str() }))
    }

    pub fn follow_up(message: &str) -> Self {
        Self::new(FOLLOW_UP_ACTION).with_payload(json!({ "message": message }))
    }

    /// Reads an action declared inside node properties, e.g.
    /// `{"type": "followUpQuery", "payload": {...}}` or a bare type string.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(action_type) if !action_type.trim().is_empty() => {
                Some(Self::new(action_type.trim()))
            }
            Value::Object(_) => serde_json::from_value::<Self>(value.clone())
                .ok()
                .filter(|action| !action.action_type.trim().is_empty()),
            _ => None,
        }
    }

    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.as_ref()?.get(key)?.as_str()
    }

    /// Query text carried by a continuation action: `payload.message`,
    /// `payload.query`, or a plain string payload.
    pub fn follow_up_message(&self) -> Option<String> {
        let message = match self.payload.as_ref()? {
            Value::String(text) => Some(text.as_str()),
            Value::Object(_) => self
                .payload_str("message")
                .or_else(|| self.payload_str("query"))
                .or_else(|| self.payload_str("prompt")),
            _ => None,
        }?;
        let trimmed = message.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}
