use std::borrow::Cow;
use std::path::PathBuf;

use hashlink::LinkedHashMap;
use saphyr::{Scalar, Yaml};

use crate::config::ConfigCreationError;
use crate::entries::{Node, NodeOwner, Resource};

pub(super) type Mapping<'a> = LinkedHashMap<Yaml<'a>, Yaml<'a>>;

/// Looks up `name`, treating an explicit `null` like an absent key.
pub(super) fn field<'m, 'a>(map: &'m Mapping<'a>, name: &'static str) -> Option<&'m Yaml<'a>> {
    map.get(&Yaml::Value(Scalar::String(Cow::Borrowed(name))))
        .filter(|value| !matches!(value, Yaml::Value(Scalar::Null)))
}

fn invalid(entry: &str, field: &'static str, expected: &'static str) -> ConfigCreationError {
    ConfigCreationError::InvalidField {
        entry: entry.to_string(),
        field,
        expected,
    }
}

pub(super) fn string_field(
    map: &Mapping,
    name: &'static str,
    entry: &str,
) -> Result<Option<String>, ConfigCreationError> {
    match field(map, name) {
        None => Ok(None),
        Some(Yaml::Value(Scalar::String(value))) => Ok(Some(value.to_string())),
        Some(_) => Err(invalid(entry, name, "a string")),
    }
}

pub(super) fn bool_field(
    map: &Mapping,
    name: &'static str,
    entry: &str,
) -> Result<Option<bool>, ConfigCreationError> {
    match field(map, name) {
        None => Ok(None),
        Some(Yaml::Value(Scalar::Boolean(value))) => Ok(Some(*value)),
        Some(_) => Err(invalid(entry, name, "a boolean")),
    }
}

fn id_field(map: &Mapping, name: &'static str, entry: &str) -> Result<Option<u32>, ConfigCreationError> {
    match field(map, name) {
        None => Ok(None),
        Some(Yaml::Value(Scalar::Integer(value))) => u32::try_from(*value)
            .map(Some)
            .map_err(|_| invalid(entry, name, "a non-negative 32-bit id")),
        Some(_) => Err(invalid(entry, name, "an integer id")),
    }
}

/// Accepts a plain integer (`420`) or an octal string (`"0644"`, `"0o644"`).
pub(super) fn mode_field(map: &Mapping, entry: &str) -> Result<Option<u32>, ConfigCreationError> {
    let mode = match field(map, "mode") {
        None => return Ok(None),
        Some(Yaml::Value(Scalar::Integer(value))) => u32::try_from(*value).ok(),
        Some(Yaml::Value(Scalar::String(value))) => {
            let value: &str = value;
            let digits = value.strip_prefix("0o").unwrap_or(value);
            u32::from_str_radix(digits, 8).ok()
        }
        Some(_) => None,
    };

    mode.filter(|mode| *mode <= 0o7777)
        .map(Some)
        .ok_or_else(|| invalid(entry, "mode", "a permission mode no larger than 0o7777"))
}

fn owner_field(map: &Mapping, name: &'static str, entry: &str) -> Result<NodeOwner, ConfigCreationError> {
    match field(map, name) {
        None => Ok(NodeOwner::default()),
        Some(Yaml::Mapping(owner)) => {
            let context = format!("{entry}.{name}");
            Ok(NodeOwner {
                id: id_field(owner, "id", &context)?,
                name: string_field(owner, "name", &context)?,
            })
        }
        Some(_) => Err(invalid(entry, name, "a mapping with 'id' or 'name'")),
    }
}

pub(super) fn node(map: &Mapping, entry: &str) -> Result<Node, ConfigCreationError> {
    let path = string_field(map, "path", entry)?.ok_or_else(|| {
        ConfigCreationError::MissingField {
            entry: entry.to_string(),
            field: "path",
        }
    })?;
    if !path.starts_with('/') {
        return Err(ConfigCreationError::RelativePath {
            entry: entry.to_string(),
            path,
        });
    }

    Ok(Node {
        path: PathBuf::from(path),
        declared: None,
        overwrite: bool_field(map, "overwrite", entry)?,
        user: owner_field(map, "user", entry)?,
        group: owner_field(map, "group", entry)?,
    })
}

pub(super) fn resource(value: &Yaml, entry: &str) -> Result<Resource, ConfigCreationError> {
    let Yaml::Mapping(map) = value else {
        return Err(ConfigCreationError::EntryNotMap {
            entry: entry.to_string(),
        });
    };

    let verification = match field(map, "verification") {
        None => None,
        Some(Yaml::Mapping(verification)) => {
            string_field(verification, "hash", &format!("{entry}.verification"))?
        }
        Some(_) => return Err(invalid(entry, "verification", "a mapping with 'hash'")),
    };

    Ok(Resource {
        source: string_field(map, "source", entry)?,
        compression: string_field(map, "compression", entry)?,
        verification,
    })
}
