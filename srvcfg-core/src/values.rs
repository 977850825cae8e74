use serde_json::{Map, Value};

/// A set of named attribute values, as passed to `add` or embedded as a
/// compound attribute.
///
/// A name that was never added is *omitted*: the other side leaves it alone
/// (or applies its default). A name mapped to [`Value::Null`] is an *explicit
/// undefine*. The two are kept apart throughout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Values {
    entries: Map<String, Value>,
}

impl Values {
    pub fn empty() -> Self {
        Values::default()
    }

    pub fn of(name: &str, value: impl Into<Value>) -> Self {
        Values::empty().and(name, value)
    }

    /// A required value. Undefining goes through [`Values::and_undefined`].
    pub fn and(mut self, name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        debug_assert!(
            !value.is_null(),
            "{} set to null, use and_undefined instead",
            name
        );
        self.entries.insert(name.to_string(), value);
        self
    }

    /// Adds `name` only if a value was supplied.
    pub fn and_optional<V: Into<Value>>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.and(name, value),
            None => self,
        }
    }

    pub fn and_undefined(mut self, name: &str) -> Self {
        self.entries.insert(name.to_string(), Value::Null);
        self
    }

    pub fn and_list<V: Into<Value>>(self, name: &str, items: impl IntoIterator<Item = V>) -> Self {
        let list: Vec<Value> = items.into_iter().map(Into::into).collect();
        self.and(name, Value::Array(list))
    }

    /// `None` leaves the attribute alone; `Some` of an empty list undefines it.
    pub fn and_list_optional<V: Into<Value>>(self, name: &str, items: Option<Vec<V>>) -> Self {
        match items {
            None => self,
            Some(items) if items.is_empty() => self.and_undefined(name),
            Some(items) => self.and_list(name, items),
        }
    }

    pub fn and_object(self, name: &str, nested: Values) -> Self {
        self.and(name, Value::Object(nested.entries))
    }

    pub fn and_object_optional(self, name: &str, nested: Option<Values>) -> Self {
        match nested {
            Some(nested) => self.and_object(name, nested),
            None => self,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.entries
    }
}

impl From<Values> for Value {
    fn from(values: Values) -> Self {
        Value::Object(values.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "use and_undefined instead")]
    fn null_through_and_is_a_bug() {
        Values::of("level", Value::Null);
    }

    #[test]
    fn optional_none_is_omitted() {
        let values = Values::empty()
            .and("level", "WARN")
            .and_optional::<String>("encoding", None)
            .and_optional("autoflush", Some(true));
        assert_eq!(values.len(), 2);
        assert!(!values.contains("encoding"));
        assert_eq!(values.get("autoflush"), Some(&json!(true)));
    }

    #[test]
    fn omitted_and_undefined_differ() {
        let omitted = Values::empty();
        let undefined = Values::empty().and_undefined("level");
        assert_ne!(omitted, undefined);
        assert_eq!(undefined.get("level"), Some(&Value::Null));
    }

    #[test]
    fn empty_list_is_an_explicit_undefine() {
        let values = Values::empty()
            .and_list_optional::<String>("handlers", Some(vec![]))
            .and_list_optional::<String>("untouched", None)
            .and_list_optional("filters", Some(vec!["a", "b"]));
        assert_eq!(values.get("handlers"), Some(&Value::Null));
        assert!(!values.contains("untouched"));
        assert_eq!(values.get("filters"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn nested_objects() {
        let file = Values::of("path", "server.log").and("relative-to", "jboss.server.log.dir");
        let values = Values::of("suffix", ".yyyy-MM-dd")
            .and_object("file", file)
            .and_object_optional("unused", None);
        assert_eq!(
            Value::from(values),
            json!({
                "suffix": ".yyyy-MM-dd",
                "file": { "path": "server.log", "relative-to": "jboss.server.log.dir" }
            })
        );
    }
}
