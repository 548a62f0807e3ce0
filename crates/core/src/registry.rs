//! Command Schema Registry
//!
//! The registry maps wire tags (and declaration-style aliases) to a decode
//! function per variant. Decoding is strict: an unknown tag, a tag that
//! disagrees with the payload's own `command` field, a missing required field
//! or an out-of-range value all produce a [`DecodeError`]. New variants are
//! added by registering them here; the normalizer never needs to change.

use crate::command::{
    AddButton, AddDatePicker, AddDropdown, AddSlider, AddText, AddTextInput, ClearContainer,
    CommandVariant, DEFAULT_CONTAINER_ID, UiCommand,
};
use crate::error::DecodeError;
use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};
use schemars::generate::SchemaSettings;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::warn;

/// Settings the registry is constructed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Filled into `container_id` when a variant allows it to be omitted.
    pub default_container_id: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_container_id: DEFAULT_CONTAINER_ID.to_string(),
        }
    }
}

type DecodeFn = fn(Map<String, Value>) -> Result<UiCommand, String>;

/// Everything the registry knows about one variant.
#[derive(Clone)]
pub struct CommandSchema {
    pub tag: &'static str,
    pub alias: &'static str,
    pub description: &'static str,
    pub has_default_container: bool,
    /// JSON schema of the variant's fields, without the `command` tag.
    pub parameters: Value,
    decode: DecodeFn,
}

impl std::fmt::Debug for CommandSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSchema")
            .field("tag", &self.tag)
            .field("alias", &self.alias)
            .field("has_default_container", &self.has_default_container)
            .finish_non_exhaustive()
    }
}

impl CommandSchema {
    /// Builds the schema entry for a statically known variant.
    pub fn of<T: CommandVariant>() -> Self {
        Self {
            tag: T::TAG,
            alias: T::ALIAS,
            description: T::DESCRIPTION,
            has_default_container: T::HAS_DEFAULT_CONTAINER,
            parameters: parameters_schema::<T>(),
            decode: decode_variant::<T>,
        }
    }
}

fn decode_variant<T: CommandVariant>(fields: Map<String, Value>) -> Result<UiCommand, String> {
    let command: T = serde_json::from_value(Value::Object(fields)).map_err(|e| e.to_string())?;
    command.validate()?;
    Ok(command.into())
}

/// Inlined draft-07 schema for `T`, stripped of document-level keys.
fn parameters_schema<T: CommandVariant>() -> Value {
    let generator = SchemaSettings::draft07()
        .with(|settings| settings.inline_subschemas = true)
        .into_generator();
    let schema = generator.into_root_schema_for::<T>();
    let mut value = serde_json::to_value(&schema).unwrap_or(Value::Null);
    if let Some(object) = value.as_object_mut() {
        object.remove("$schema");
        object.remove("title");
    }
    value
}

/// A tool/function declaration handed to a model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// The set of commands the renderer understands.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    config: RegistryConfig,
    schemas: Vec<CommandSchema>,
    /// Tag or alias to index in `schemas`.
    names: HashMap<String, usize>,
}

impl CommandRegistry {
    /// An empty registry.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            schemas: Vec::new(),
            names: HashMap::new(),
        }
    }

    /// A registry holding the full built-in instruction set.
    pub fn with_default_commands(config: RegistryConfig) -> Self {
        let mut registry = Self::new(config);
        registry.register_variant::<AddText>();
        registry.register_variant::<AddButton>();
        registry.register_variant::<AddSlider>();
        registry.register_variant::<AddDropdown>();
        registry.register_variant::<AddTextInput>();
        registry.register_variant::<AddDatePicker>();
        registry.register_variant::<ClearContainer>();
        registry
    }

    /// Registers `schema` under `variant_name` and the schema's alias.
    /// Re-registering a name replaces the earlier entry.
    pub fn register(&mut self, variant_name: &str, schema: CommandSchema) {
        let alias = schema.alias;
        let index = match self.names.get(variant_name) {
            Some(&existing) => {
                warn!(tag = %variant_name, "Replacing previously registered command");
                self.schemas[existing] = schema;
                existing
            }
            None => {
                self.schemas.push(schema);
                self.schemas.len() - 1
            }
        };
        self.names.insert(variant_name.to_string(), index);
        if !alias.is_empty() {
            self.names.insert(alias.to_string(), index);
        }
    }

    pub fn register_variant<T: CommandVariant>(&mut self) {
        self.register(T::TAG, CommandSchema::of::<T>());
    }

    /// Looks a variant up by tag or alias. Tags also match case-insensitively
    /// (`add_text` resolves to `ADD_TEXT`).
    pub fn resolve(&self, name: &str) -> Option<&CommandSchema> {
        self.names
            .get(name)
            .or_else(|| self.names.get(&name.to_ascii_uppercase()))
            .map(|&index| &self.schemas[index])
    }

    /// Registered tags in registration order.
    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.schemas.iter().map(|schema| schema.tag)
    }

    /// Decodes one raw command into its typed variant.
    pub fn decode(&self, raw_tag: &str, raw_fields: Value) -> Result<UiCommand, DecodeError> {
        let schema = self
            .resolve(raw_tag)
            .ok_or_else(|| DecodeError::UnknownCommand {
                tag: raw_tag.to_string(),
                suggestion: self.suggest(raw_tag),
            })?;

        let mut fields = match raw_fields {
            Value::Object(fields) => fields,
            Value::Null => Map::new(),
            other => {
                return Err(DecodeError::invalid(
                    schema.tag,
                    format!("expected an object of fields, got {}", json_kind(&other)),
                ));
            }
        };

        if let Some(embedded) = fields.remove("command") {
            let agrees = embedded
                .as_str()
                .and_then(|name| self.resolve(name))
                .is_some_and(|other| other.tag == schema.tag);
            if !agrees {
                return Err(DecodeError::invalid(
                    schema.tag,
                    format!("`command` field {} does not match the variant", embedded),
                ));
            }
        }

        if schema.has_default_container {
            let missing = matches!(fields.get("container_id"), None | Some(Value::Null));
            if missing {
                fields.insert(
                    "container_id".to_string(),
                    Value::String(self.config.default_container_id.clone()),
                );
            }
        }

        (schema.decode)(fields).map_err(|reason| DecodeError::invalid(schema.tag, reason))
    }

    /// One declaration per registered variant, named by its tag.
    pub fn function_declarations(&self) -> Vec<FunctionDeclaration> {
        self.schemas
            .iter()
            .map(|schema| FunctionDeclaration {
                name: schema.tag.to_string(),
                description: schema.description.to_string(),
                parameters: schema.parameters.clone(),
            })
            .collect()
    }

    /// Closest registered tag. Candidates are scored in registration order,
    /// tag before alias, and a tie keeps the earliest one.
    fn suggest(&self, raw_tag: &str) -> Option<String> {
        let matcher = SkimMatcherV2::default().ignore_case();
        let mut best: Option<(i64, &'static str)> = None;
        for schema in &self.schemas {
            for name in [schema.tag, schema.alias] {
                if name.is_empty() {
                    continue;
                }
                let Some(score) = matcher.fuzzy_match(name, raw_tag) else {
                    continue;
                };
                if best.is_none_or(|(top, _)| score > top) {
                    best = Some((score, schema.tag));
                }
            }
        }
        best.map(|(_, tag)| tag.to_string())
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_default_commands(RegistryConfig::default())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
