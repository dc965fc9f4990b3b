//! Output shapes for metadata records.
//!
//! Which shape a caller gets is a table lookup on the requested standard
//! and, when none was requested, on the record's declared format tags.

use serde_json::{json, Map, Value};

use crate::metadata::{FormatTag, MetadataRecord};

/// Standard requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standard {
    Erc721,
    Erc1155,
    /// The record exactly as the network returned it.
    Native,
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Erc721,
    Erc1155,
    Raw,
}

/// Tag → shape, in preference order for unspecified requests.
const TAG_SHAPES: [(FormatTag, Shape); 2] = [
    (FormatTag::Erc721, Shape::Erc721),
    (FormatTag::Erc1155, Shape::Erc1155),
];

const ERC721_FIELDS: [&str; 8] = [
    "description",
    "image",
    "image_data",
    "external_url",
    "background_color",
    "animation_url",
    "youtube_url",
    "name",
];

const ERC1155_LIFTED: [&str; 3] = ["description", "image", "localization"];

impl Standard {
    pub fn shape_for(self, record: &MetadataRecord) -> Shape {
        match self {
            Self::Erc721 => Shape::Erc721,
            Self::Erc1155 => Shape::Erc1155,
            Self::Native => Shape::Raw,
            Self::Unspecified => TAG_SHAPES
                .iter()
                .find(|(tag, _)| record.supports(tag))
                .map(|(_, shape)| *shape)
                .unwrap_or(Shape::Raw),
        }
    }
}

/// Render `record` in the shape selected for `standard`. `full` appends the
/// token section under `yours`.
pub fn render(record: &MetadataRecord, standard: Standard, full: bool) -> Value {
    match standard.shape_for(record) {
        Shape::Erc721 => to_erc721(record, full),
        Shape::Erc1155 => to_erc1155(record, full),
        Shape::Raw => serde_json::to_value(record).unwrap_or(Value::Null),
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn as_text(value: &Value) -> Value {
    match value {
        Value::String(_) => value.clone(),
        other => Value::String(other.to_string()),
    }
}

fn append_token_section(out: &mut Map<String, Value>, record: &MetadataRecord, full: bool) {
    if full {
        if let Ok(section) = serde_json::to_value(&record.token) {
            out.insert("yours".into(), section);
        }
    }
}

pub fn to_erc721(record: &MetadataRecord, full: bool) -> Value {
    let mut out = Map::new();
    out.insert("name".into(), Value::String(record.name.clone()));
    let mut attributes = Vec::new();

    let erc721 = record
        .properties
        .get(FormatTag::Erc721.as_str())
        .filter(|_| record.supports(&FormatTag::Erc721))
        .and_then(Value::as_object);

    if let Some(group) = erc721 {
        for field in ERC721_FIELDS {
            if let Some(value) = group.get(field).filter(|v| is_present(v)) {
                out.insert(field.into(), as_text(value));
            }
        }
        if let Some(Value::Array(items)) = group.get("attributes") {
            for item in items {
                attributes.push(json!({
                    "trait_type": item.get("trait_type").cloned().unwrap_or(Value::Null),
                    "value": item.get("value").cloned().unwrap_or(Value::Null),
                }));
            }
        }
    }

    for (module, value) in &record.properties {
        if module == FormatTag::Erc721.as_str() {
            continue;
        }
        match value.as_object() {
            Some(group) => {
                for (key, v) in group {
                    attributes.push(json!({
                        "trait_type": format!("{module}.{key}"),
                        "value": v,
                    }));
                }
            }
            None => attributes.push(json!({ "trait_type": module, "value": value })),
        }
    }

    out.insert("attributes".into(), Value::Array(attributes));
    append_token_section(&mut out, record, full);
    Value::Object(out)
}

pub fn to_erc1155(record: &MetadataRecord, full: bool) -> Value {
    let properties: Map<String, Value> = record
        .properties
        .iter()
        .filter(|(key, _)| !ERC1155_LIFTED.contains(&key.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let mut out = Map::new();
    out.insert("name".into(), Value::String(record.name.clone()));
    out.insert("properties".into(), Value::Object(properties));

    for key in ["description", "image"] {
        if let Some(value) = record.properties.get(key).filter(|v| is_present(v)) {
            out.insert(key.into(), as_text(value));
        }
    }
    if let Some(localization) = record.properties.get("localization").filter(|v| is_present(v)) {
        out.insert("localization".into(), localization.clone());
    }

    append_token_section(&mut out, record, full);
    Value::Object(out)
}
