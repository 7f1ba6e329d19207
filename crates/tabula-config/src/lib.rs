//! Facet types for the tabula entity model.
//!
//! The model describes the *desired* database: entities (tables) with their
//! fields, plus relation declarations that expand into foreign key columns
//! and junction tables during normalization. It is usually read from a
//! `tabula.json` file:
//!
//! ```json
//! {
//!   "entities": {
//!     "user": { "name": { "type": "word" }, "timestamp": {} },
//!     "post": { "title": { "type": "sentence", "required": false } }
//!   },
//!   "relations": {
//!     "oneToMany": [{ "one": "user", "many": "post" }]
//!   }
//! }
//! ```

use facet::Facet;
pub use facet_value::Value;
use indexmap::IndexMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Name of the model file searched for by [`load`].
pub const MODEL_FILE: &str = "tabula.json";

/// The declarative entity model.
#[derive(Debug, Clone, Default, Facet)]
pub struct Model {
    /// Entity name -> field name -> field spec.
    #[facet(default)]
    pub entities: IndexMap<String, Entity>,

    /// Relation declarations between entities.
    #[facet(default)]
    pub relations: Relations,
}

/// Fields of a single entity, in declaration order.
pub type Entity = IndexMap<String, Field>;

/// A field as written in the model.
#[derive(Debug, Clone, Default, Facet)]
pub struct Field {
    /// Friendly type (`word`, `sentence`, `text`, `integer`) or a raw SQL type.
    /// May be empty for the `timestamp` pseudo-field.
    #[facet(rename = "type", default)]
    pub type_name: String,

    /// Expected to be a boolean. Anything else is rejected during normalization.
    #[facet(default)]
    pub required: Option<Value>,

    /// Any JSON scalar. Compared as text against the database default.
    #[facet(default)]
    pub default: Option<Scalar>,
}

/// A scalar default value as written in the model.
#[derive(Debug, Clone, PartialEq, Facet)]
#[facet(untagged)]
#[repr(u8)]
pub enum Scalar {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(true) => f.write_str("1"),
            Scalar::Bool(false) => Ok(()),
            Scalar::Integer(n) => write!(f, "{}", n),
            Scalar::Float(n) => write!(f, "{}", n),
            Scalar::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for Scalar {
    fn from(text: &str) -> Self {
        Scalar::Text(text.to_string())
    }
}

impl From<String> for Scalar {
    fn from(text: String) -> Self {
        Scalar::Text(text)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Integer(n)
    }
}

impl Field {
    /// A field of the given type with no `required` flag and no default.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    /// Set the raw `required` flag.
    pub fn required(mut self, value: impl Into<Value>) -> Self {
        self.required = Some(value.into());
        self
    }

    /// Set the default value.
    pub fn default_value(mut self, value: impl Into<Scalar>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Interpret the raw `required` flag.
    pub fn requirement(&self) -> Requirement {
        Requirement::from_value(self.required.as_ref())
    }

    /// The default rendered as text, `None` for a null default.
    pub fn default_text(&self) -> Option<String> {
        self.default.as_ref().map(Scalar::to_string)
    }
}

/// Relation declarations, grouped by kind.
#[derive(Debug, Clone, Default, Facet)]
pub struct Relations {
    #[facet(rename = "oneToOne", default)]
    pub one_to_one: Vec<OneToOne>,

    #[facet(rename = "oneToMany", default)]
    pub one_to_many: Vec<OneToMany>,

    #[facet(rename = "manyToMany", default)]
    pub many_to_many: Vec<ManyToMany>,
}

impl Relations {
    pub fn is_empty(&self) -> bool {
        self.one_to_one.is_empty() && self.one_to_many.is_empty() && self.many_to_many.is_empty()
    }
}

/// Each side holds a foreign key to the other.
#[derive(Debug, Clone, Facet)]
pub struct OneToOne {
    #[facet(rename = "entityA")]
    pub entity_a: String,

    #[facet(rename = "entityB")]
    pub entity_b: String,

    /// Applies to both generated columns.
    #[facet(default)]
    pub required: Option<Value>,
}

/// The `many` side holds a foreign key to the `one` side.
#[derive(Debug, Clone, Facet)]
pub struct OneToMany {
    pub one: String,

    pub many: String,

    #[facet(default)]
    pub required: Option<Value>,
}

/// Expands into a junction table named `{entityA}_{entityB}`.
#[derive(Debug, Clone, Facet)]
pub struct ManyToMany {
    #[facet(rename = "entityA")]
    pub entity_a: String,

    #[facet(rename = "entityB")]
    pub entity_b: String,
}

/// Interpretation of a raw `required` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// The flag was omitted. Treated like `true`.
    Unspecified,
    Required,
    Optional,
    /// Not a boolean; carries a rendering of the offending value.
    Invalid(String),
}

impl Requirement {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None => Requirement::Unspecified,
            Some(value) => match value.as_bool() {
                Some(true) => Requirement::Required,
                Some(false) => Requirement::Optional,
                None => Requirement::Invalid(format!("{:?}", value)),
            },
        }
    }

    /// Whether the column must be NOT NULL. An invalid flag yields the
    /// rendering of the offending value.
    pub fn is_required(&self) -> Result<bool, &str> {
        match self {
            Requirement::Unspecified | Requirement::Required => Ok(true),
            Requirement::Optional => Ok(false),
            Requirement::Invalid(value) => Err(value),
        }
    }
}

impl OneToOne {
    pub fn requirement(&self) -> Requirement {
        Requirement::from_value(self.required.as_ref())
    }
}

impl OneToMany {
    pub fn requirement(&self) -> Requirement {
        Requirement::from_value(self.required.as_ref())
    }
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity with the given fields.
    pub fn entity<'a>(
        mut self,
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (&'a str, Field)>,
    ) -> Self {
        let entity = fields
            .into_iter()
            .map(|(name, field)| (name.to_string(), field))
            .collect();
        self.entities.insert(name.into(), entity);
        self
    }

    pub fn one_to_one(
        mut self,
        entity_a: impl Into<String>,
        entity_b: impl Into<String>,
        required: Option<Value>,
    ) -> Self {
        self.relations.one_to_one.push(OneToOne {
            entity_a: entity_a.into(),
            entity_b: entity_b.into(),
            required,
        });
        self
    }

    pub fn one_to_many(
        mut self,
        one: impl Into<String>,
        many: impl Into<String>,
        required: Option<Value>,
    ) -> Self {
        self.relations.one_to_many.push(OneToMany {
            one: one.into(),
            many: many.into(),
            required,
        });
        self
    }

    pub fn many_to_many(mut self, entity_a: impl Into<String>, entity_b: impl Into<String>) -> Self {
        self.relations.many_to_many.push(ManyToMany {
            entity_a: entity_a.into(),
            entity_b: entity_b.into(),
        });
        self
    }
}

/// Parse a model from JSON source.
///
/// An explicit `"required": null` is kept, so that it is rejected during
/// normalization instead of reading as an omitted flag.
pub fn from_str(source: &str) -> Result<Model, ConfigError> {
    let mut model: Model =
        facet_json::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
    let raw: RawModel =
        facet_json::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
    raw.restore_required(&mut model);
    Ok(model)
}

const REQUIRED_KEY: &str = "required";

/// Untyped view of the model, used to tell an absent `required` key from a
/// null one. `Option<Value>` collapses both to `None`.
#[derive(Default, Facet)]
struct RawModel {
    #[facet(default)]
    entities: IndexMap<String, IndexMap<String, RawObject>>,

    #[facet(default)]
    relations: RawRelations,
}

#[derive(Default, Facet)]
struct RawRelations {
    #[facet(rename = "oneToOne", default)]
    one_to_one: Vec<RawObject>,

    #[facet(rename = "oneToMany", default)]
    one_to_many: Vec<RawObject>,
}

type RawObject = IndexMap<String, Value>;

impl RawModel {
    fn restore_required(&self, model: &mut Model) {
        for (entity, fields) in model.entities.iter_mut() {
            let Some(raw_fields) = self.entities.get(entity) else {
                continue;
            };
            for (name, field) in fields.iter_mut() {
                if let Some(value) = raw_fields.get(name).and_then(|raw| raw.get(REQUIRED_KEY)) {
                    field.required = Some(value.clone());
                }
            }
        }

        for (rel, raw) in model
            .relations
            .one_to_one
            .iter_mut()
            .zip(&self.relations.one_to_one)
        {
            if let Some(value) = raw.get(REQUIRED_KEY) {
                rel.required = Some(value.clone());
            }
        }

        for (rel, raw) in model
            .relations
            .one_to_many
            .iter_mut()
            .zip(&self.relations.one_to_many)
        {
            if let Some(value) = raw.get(REQUIRED_KEY) {
                rel.required = Some(value.clone());
            }
        }
    }
}

/// Load the model from `tabula.json`, searching up from the current directory.
pub fn load() -> Result<(Model, PathBuf), ConfigError> {
    let cwd = std::env::current_dir()?;
    load_from(&cwd)
}

/// Load the model starting from a specific directory.
pub fn load_from(start: &Path) -> Result<(Model, PathBuf), ConfigError> {
    let path = find_model_file(start)?;
    let content = std::fs::read_to_string(&path)?;
    let model = from_str(&content)?;
    Ok((model, path))
}

/// Find `tabula.json` by searching up the directory tree.
fn find_model_file(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = start.to_path_buf();

    loop {
        let path = current.join(MODEL_FILE);
        if path.exists() {
            return Ok(path);
        }

        if !current.pop() {
            return Err(ConfigError::NotFound);
        }
    }
}

/// Errors that can occur when loading the model.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no {} found in current directory or any parent", MODEL_FILE)]
    NotFound,

    #[error("failed to read {}: {0}", MODEL_FILE)]
    Io(#[from] std::io::Error),

    #[error("failed to parse {}: {0}", MODEL_FILE)]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_model() {
        let model = from_str(
            r#"{
                "entities": {
                    "user": {
                        "name": { "type": "word", "required": true },
                        "bio": { "type": "text", "required": false, "default": "none" },
                        "timestamp": {}
                    },
                    "post": { "title": { "type": "sentence" } }
                },
                "relations": {
                    "oneToOne": [{ "entityA": "user", "entityB": "profile", "required": false }],
                    "oneToMany": [{ "one": "user", "many": "post" }],
                    "manyToMany": [{ "entityA": "post", "entityB": "tag" }]
                }
            }"#,
        )
        .unwrap();

        let names: Vec<_> = model.entities.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["user", "post"]);

        let user = &model.entities["user"];
        let fields: Vec<_> = user.keys().map(String::as_str).collect();
        assert_eq!(fields, vec!["name", "bio", "timestamp"]);
        assert_eq!(user["name"].requirement(), Requirement::Required);
        assert_eq!(user["bio"].requirement(), Requirement::Optional);
        assert_eq!(user["bio"].default_text().as_deref(), Some("none"));
        assert_eq!(user["timestamp"].type_name, "");

        assert_eq!(model.relations.one_to_one[0].entity_b, "profile");
        assert_eq!(
            model.relations.one_to_one[0].requirement(),
            Requirement::Optional
        );
        assert_eq!(
            model.relations.one_to_many[0].requirement(),
            Requirement::Unspecified
        );
        assert_eq!(model.relations.many_to_many[0].entity_a, "post");
    }

    #[test]
    fn test_parse_without_relations() {
        let model = from_str(r#"{"entities": {"tag": {"label": {"type": "word"}}}}"#).unwrap();
        assert!(model.relations.is_empty());
        assert_eq!(model.entities["tag"]["label"].requirement(), Requirement::Unspecified);
    }

    #[test]
    fn test_non_boolean_required_is_invalid() {
        let model =
            from_str(r#"{"entities": {"user": {"name": {"type": "word", "required": "yes"}}}}"#)
                .unwrap();
        let requirement = model.entities["user"]["name"].requirement();
        assert!(matches!(requirement, Requirement::Invalid(_)));
        assert!(requirement.is_required().is_err());
    }

    #[test]
    fn test_null_required_is_not_omitted() {
        let model = from_str(
            r#"{
                "entities": {
                    "user": {
                        "name": { "type": "word", "required": null },
                        "bio": { "type": "text" }
                    }
                },
                "relations": {
                    "oneToOne": [{ "entityA": "user", "entityB": "profile", "required": null }],
                    "oneToMany": [
                        { "one": "user", "many": "post" },
                        { "one": "user", "many": "comment", "required": null }
                    ]
                }
            }"#,
        )
        .unwrap();

        let user = &model.entities["user"];
        assert!(matches!(user["name"].requirement(), Requirement::Invalid(_)));
        assert_eq!(user["bio"].requirement(), Requirement::Unspecified);

        let relations = &model.relations;
        assert!(matches!(
            relations.one_to_one[0].requirement(),
            Requirement::Invalid(_)
        ));
        assert_eq!(relations.one_to_many[0].requirement(), Requirement::Unspecified);
        assert!(matches!(
            relations.one_to_many[1].requirement(),
            Requirement::Invalid(_)
        ));
    }

    #[test]
    fn test_scalar_defaults() {
        let model = from_str(
            r#"{
                "entities": {
                    "counter": {
                        "hits": { "type": "integer", "default": 0 },
                        "ratio": { "type": "float", "default": 0.5 },
                        "active": { "type": "tinyint(1)", "default": true },
                        "label": { "type": "word", "default": "none" },
                        "note": { "type": "text", "default": null }
                    }
                }
            }"#,
        )
        .unwrap();

        let counter = &model.entities["counter"];
        assert_eq!(counter["hits"].default, Some(Scalar::Integer(0)));
        assert_eq!(counter["hits"].default_text().as_deref(), Some("0"));
        assert_eq!(counter["ratio"].default_text().as_deref(), Some("0.5"));
        assert_eq!(counter["active"].default_text().as_deref(), Some("1"));
        assert_eq!(counter["label"].default_text().as_deref(), Some("none"));
        assert_eq!(counter["note"].default_text(), None);
    }

    #[test]
    fn test_parse_error() {
        let err = from_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_builder() {
        let model = Model::new()
            .entity("user", [("name", Field::new("word").required(false))])
            .one_to_many("user", "post", None)
            .many_to_many("post", "tag");
        assert_eq!(
            model.entities["user"]["name"].requirement(),
            Requirement::Optional
        );
        assert_eq!(model.relations.one_to_many.len(), 1);
        assert_eq!(model.relations.many_to_many.len(), 1);
    }

    #[test]
    fn test_load_from_searches_parents() {
        let root = std::env::temp_dir().join(format!("tabula-config-{}", std::process::id()));
        let nested = root.join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            root.join(MODEL_FILE),
            r#"{"entities": {"user": {"name": {"type": "word"}}}}"#,
        )
        .unwrap();

        let (model, path) = load_from(&nested).unwrap();
        assert_eq!(path, root.join(MODEL_FILE));
        assert!(model.entities.contains_key("user"));

        std::fs::remove_dir_all(&root).unwrap();
    }
}
