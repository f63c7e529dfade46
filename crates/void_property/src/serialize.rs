//! Export/import of property state
//!
//! Properties never pick a format. They hand named [`Any`] values to an
//! [`ExportContext`] and ask an [`ImportContext`] for them back. A property
//! writes two keys: `"default"` (always) and `"value"` (only when the
//! property was explicitly set).
//!
//! [`JsonExportContext`] / [`JsonImportContext`] map the values to a JSON
//! object through the registry's JSON codecs.

use std::sync::Arc;

use serde_json::{Map, Value as Json};
use thiserror::Error;
use void_core::{ReturnValue, TypeUid};

use crate::any::Any;
use crate::object::MetaObject;
use crate::property::StackProperty;
use crate::registry::ObjectRegistry;

const DEFAULT_KEY: &str = "default";
const VALUE_KEY: &str = "value";

/// Export/import errors
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("no JSON codec registered for type '{0}'")]
    UnsupportedType(String),
    #[error("expected a JSON object")]
    NotAnObject,
    #[error("'{name}' rejected the value: {code}")]
    Rejected { name: String, code: ReturnValue },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Receives named values
pub trait ExportContext {
    fn export_value(&mut self, name: &str, value: &Any) -> Result<(), SerializeError>;
}

/// Supplies named values of an expected type
pub trait ImportContext {
    /// `Ok(None)` when the name is absent
    fn import_value(&mut self, name: &str, uid: TypeUid) -> Result<Option<Any>, SerializeError>;
}

/// Writes values into a JSON object
pub struct JsonExportContext {
    registry: Arc<ObjectRegistry>,
    object: Map<String, Json>,
}

impl JsonExportContext {
    pub fn new(registry: Arc<ObjectRegistry>) -> Self {
        Self {
            registry,
            object: Map::new(),
        }
    }

    /// The object written so far
    pub fn into_json(self) -> Json {
        Json::Object(self.object)
    }
}

impl ExportContext for JsonExportContext {
    fn export_value(&mut self, name: &str, value: &Any) -> Result<(), SerializeError> {
        let unsupported = || SerializeError::UnsupportedType(value.type_name().to_string());
        let codec = self.registry.json_codec(value.type_uid()).ok_or_else(unsupported)?;
        let json = codec.to_json(value).ok_or_else(unsupported)??;
        self.object.insert(name.to_string(), json);
        Ok(())
    }
}

/// Reads values from a JSON object
pub struct JsonImportContext {
    registry: Arc<ObjectRegistry>,
    object: Map<String, Json>,
}

impl JsonImportContext {
    pub fn new(registry: Arc<ObjectRegistry>, json: Json) -> Result<Self, SerializeError> {
        match json {
            Json::Object(object) => Ok(Self { registry, object }),
            _ => Err(SerializeError::NotAnObject),
        }
    }
}

impl ImportContext for JsonImportContext {
    fn import_value(&mut self, name: &str, uid: TypeUid) -> Result<Option<Any>, SerializeError> {
        let Some(json) = self.object.get(name) else {
            return Ok(None);
        };
        let codec = self.registry.json_codec(uid).ok_or_else(|| {
            let name = self.registry.type_info(uid).map(|info| info.name).unwrap_or_else(|| format!("{:?}", uid));
            SerializeError::UnsupportedType(name)
        })?;
        Ok(Some(codec.from_json(json)?))
    }
}

impl StackProperty {
    /// Write the default value, and the evaluated value if the property
    /// was explicitly set
    pub fn export(&self, ctx: &mut dyn ExportContext) -> Result<(), SerializeError> {
        ctx.export_value(DEFAULT_KEY, &self.default_value())?;
        if !self.is_default_value() {
            let value = self.get_value().map_err(|code| SerializeError::Rejected {
                name: self.name().to_string(),
                code,
            })?;
            ctx.export_value(VALUE_KEY, &value)?;
        }
        Ok(())
    }

    /// Restore state written by [`export`](Self::export). A missing
    /// `"value"` leaves the property at its default.
    pub fn import(&self, ctx: &mut dyn ImportContext) -> Result<ReturnValue, SerializeError> {
        let rejected = |code: ReturnValue| SerializeError::Rejected {
            name: self.name().to_string(),
            code,
        };
        let mut result = ReturnValue::NothingToDo;
        if let Some(default) = ctx.import_value(DEFAULT_KEY, self.type_uid())? {
            let code = self.set_default_value(&default);
            if code.is_err() {
                return Err(rejected(code));
            }
            if code.changed() {
                result = ReturnValue::Success;
            }
        }
        if let Some(value) = ctx.import_value(VALUE_KEY, self.type_uid())? {
            let code = self.set_value(&value);
            if code.is_err() {
                return Err(rejected(code));
            }
            if code.changed() {
                result = ReturnValue::Success;
            }
        }
        Ok(result)
    }
}

/// JSON object with one entry per property of `object`
pub fn export_object(object: &MetaObject, registry: &Arc<ObjectRegistry>) -> Result<Json, SerializeError> {
    let mut out = Map::new();
    for property in object.properties() {
        let mut ctx = JsonExportContext::new(registry.clone());
        property.export(&mut ctx)?;
        out.insert(property.name().to_string(), ctx.into_json());
    }
    Ok(Json::Object(out))
}

/// Restore properties of `object` from [`export_object`] output.
/// Entries without a matching property are skipped.
pub fn import_object(object: &MetaObject, registry: &Arc<ObjectRegistry>, json: Json) -> Result<ReturnValue, SerializeError> {
    let Json::Object(entries) = json else {
        return Err(SerializeError::NotAnObject);
    };
    let mut result = ReturnValue::NothingToDo;
    for (name, entry) in entries {
        let Some(property) = object.property(&name) else {
            log::debug!("serialize: '{}' has no property '{}'", object.name(), name);
            continue;
        };
        let mut ctx = JsonImportContext::new(registry.clone(), entry)?;
        if property.import(&mut ctx)?.changed() {
            result = ReturnValue::Success;
        }
    }
    Ok(result)
}
