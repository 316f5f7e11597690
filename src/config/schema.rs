//! Declarative document schema
//!
//! A [`Schema`] describes the shape of a JSON document; [`validate`] walks a
//! document against it and reports the first violation together with its
//! path (`rtsp_streams.cam1.network`).

use serde_json::Value;

use super::ConfigError;

/// Expected shape of a JSON value
#[derive(Debug, Clone)]
pub enum Schema {
    /// String, number or boolean
    Scalar,
    /// Object with a fixed set of keys
    Object(ObjectSchema),
    /// Non-empty object or array whose members all match the inner schema
    Collection(Box<Schema>),
}

impl Schema {
    pub fn scalar() -> Self {
        Schema::Scalar
    }

    pub fn collection(member: impl Into<Schema>) -> Self {
        Schema::Collection(Box::new(member.into()))
    }
}

impl From<ObjectSchema> for Schema {
    fn from(object: ObjectSchema) -> Self {
        Schema::Object(object)
    }
}

/// How an object treats keys it does not list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownKeys {
    /// Violation
    Reject,
    /// Warning, key ignored
    Warn,
}

#[derive(Debug, Clone)]
struct Field {
    name: &'static str,
    schema: Schema,
    /// `None` for required fields, the warning text for optional ones
    missing_warning: Option<&'static str>,
}

/// Keys of an object schema
#[derive(Debug, Clone)]
pub struct ObjectSchema {
    fields: Vec<Field>,
    unknown_keys: UnknownKeys,
}

impl ObjectSchema {
    /// Object rejecting unknown keys
    pub fn strict() -> Self {
        Self {
            fields: Vec::new(),
            unknown_keys: UnknownKeys::Reject,
        }
    }

    /// Object warning about unknown keys
    pub fn lenient() -> Self {
        Self {
            fields: Vec::new(),
            unknown_keys: UnknownKeys::Warn,
        }
    }

    /// Add a key that must be present
    pub fn required(mut self, name: &'static str, schema: impl Into<Schema>) -> Self {
        self.fields.push(Field {
            name,
            schema: schema.into(),
            missing_warning: None,
        });
        self
    }

    /// Add a key that may be absent; its absence produces `warning`
    pub fn optional(
        mut self,
        name: &'static str,
        schema: impl Into<Schema>,
        warning: &'static str,
    ) -> Self {
        self.fields.push(Field {
            name,
            schema: schema.into(),
            missing_warning: Some(warning),
        });
        self
    }

    /// Add several required scalar keys
    pub fn scalars(self, names: &[&'static str]) -> Self {
        names
            .iter()
            .fold(self, |object, &name| object.required(name, Schema::scalar()))
    }

    fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Check `value` against `schema`
///
/// Returns the warnings collected on the way, or the first violation.
pub fn validate(value: &Value, schema: &Schema) -> Result<Vec<String>, ConfigError> {
    let mut warnings = Vec::new();
    validate_at(value, schema, "", &mut warnings)?;
    Ok(warnings)
}

fn validate_at(
    value: &Value,
    schema: &Schema,
    path: &str,
    warnings: &mut Vec<String>,
) -> Result<(), ConfigError> {
    match schema {
        Schema::Scalar => match value {
            Value::String(_) | Value::Number(_) | Value::Bool(_) => Ok(()),
            other => Err(violation(
                path,
                format!("expected a string, number or boolean, found {}", kind(other)),
            )),
        },

        Schema::Object(object) => {
            let Value::Object(map) = value else {
                return Err(violation(
                    path,
                    format!("expected an object, found {}", kind(value)),
                ));
            };

            for key in map.keys() {
                if object.field(key).is_some() {
                    continue;
                }
                match object.unknown_keys {
                    UnknownKeys::Reject => {
                        return Err(violation(path, format!("unknown key \"{}\"", key)));
                    }
                    UnknownKeys::Warn => {
                        warnings.push(format!(
                            "unknown option \"{}\" in {} is ignored",
                            key,
                            display_path(path)
                        ));
                    }
                }
            }

            for field in &object.fields {
                match (map.get(field.name), field.missing_warning) {
                    (Some(child), _) => {
                        validate_at(child, &field.schema, &join(path, field.name), warnings)?;
                    }
                    (None, Some(warning)) => warnings.push(warning.to_string()),
                    (None, None) => {
                        return Err(violation(
                            path,
                            format!("missing key \"{}\"", field.name),
                        ));
                    }
                }
            }
            Ok(())
        }

        Schema::Collection(member) => match value {
            Value::Object(map) if !map.is_empty() => {
                for (key, child) in map {
                    validate_at(child, member, &join(path, key), warnings)?;
                }
                Ok(())
            }
            Value::Array(items) if !items.is_empty() => {
                for (index, child) in items.iter().enumerate() {
                    validate_at(child, member, &format!("{}[{}]", path, index), warnings)?;
                }
                Ok(())
            }
            Value::Object(_) | Value::Array(_) => {
                Err(violation(path, "expected at least one entry".to_string()))
            }
            other => Err(violation(
                path,
                format!("expected an object or array, found {}", kind(other)),
            )),
        },
    }
}

fn violation(path: &str, reason: String) -> ConfigError {
    ConfigError::Structure {
        path: display_path(path).to_string(),
        reason,
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn point_schema() -> Schema {
        ObjectSchema::strict().scalars(&["x", "y"]).into()
    }

    fn structure_error(result: Result<Vec<String>, ConfigError>) -> (String, String) {
        match result {
            Err(ConfigError::Structure { path, reason }) => (path, reason),
            other => panic!("expected a structure error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_object() {
        let warnings = validate(&json!({"x": 1, "y": "2"}), &point_schema()).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_missing_key() {
        let (path, reason) = structure_error(validate(&json!({"x": 1}), &point_schema()));
        assert_eq!(path, "<root>");
        assert_eq!(reason, "missing key \"y\"");
    }

    #[test]
    fn test_unknown_key_rejected_with_path() {
        let schema = ObjectSchema::strict().required("points", Schema::collection(point_schema()));
        let doc = json!({"points": {"a": {"x": 1, "y": 2}, "b": {"x": 1, "y": 2, "z": 3}}});

        let (path, reason) = structure_error(validate(&doc, &schema.into()));
        assert_eq!(path, "points.b");
        assert_eq!(reason, "unknown key \"z\"");
    }

    #[test]
    fn test_array_collection_path() {
        let schema = Schema::collection(point_schema());
        let doc = json!([{"x": 1, "y": 2}, {"x": [1], "y": 2}]);

        let (path, reason) = structure_error(validate(&doc, &schema));
        assert_eq!(path, "[1].x");
        assert!(reason.contains("found an array"));
    }

    #[test]
    fn test_empty_collection() {
        let (_, reason) = structure_error(validate(&json!({}), &Schema::collection(point_schema())));
        assert_eq!(reason, "expected at least one entry");
    }

    #[test]
    fn test_lenient_object_warns() {
        let schema = ObjectSchema::lenient()
            .required("p", point_schema())
            .optional("q", point_schema(), "no q block");
        let doc = json!({"p": {"x": 1, "y": 2}, "extra": true});

        let warnings = validate(&doc, &schema.into()).unwrap();
        assert_eq!(
            warnings,
            vec![
                "unknown option \"extra\" in <root> is ignored".to_string(),
                "no q block".to_string()
            ]
        );
    }
}
