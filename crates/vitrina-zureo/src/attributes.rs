//! Color and size extraction for Zureo varieties.
//!
//! Structured attributes are authoritative. When a variety carries neither a
//! color nor a size attribute, both are guessed from the variety name and the
//! result is flagged as inferred. A `None` means "unknown", never "no color".

use std::sync::LazyLock;

use regex::Regex;

use crate::types::ZureoVariety;

/// Whole-token size match. Unicode word boundaries keep `s` in "remeras" or
/// "básica" from matching.
static SIZE_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:xxl|xl|xs|s|m|l|\d+)\b").expect("valid regex"));

const COLOR_ATTRIBUTE_NAMES: &[&str] = &["color", "colour"];
const SIZE_ATTRIBUTE_NAMES: &[&str] = &["talle", "size", "talla"];

/// Spanish and English color words recognized in variety names.
const COLOR_VOCABULARY: &[&str] = &[
    "negro", "blanco", "rojo", "azul", "verde", "amarillo", "gris", "rosa", "rosado", "violeta",
    "morado", "lila", "naranja", "marron", "marrón", "beige", "celeste", "bordo", "bordó",
    "dorado", "plateado", "crudo", "natural", "fucsia", "turquesa", "coral", "mostaza", "camel",
    "black", "white", "red", "blue", "green", "yellow", "grey", "gray", "pink", "purple",
    "orange", "brown", "navy", "silver", "gold",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedAttributes {
    pub color: Option<String>,
    pub size: Option<String>,
    /// `true` when the values were guessed from the variety name.
    pub inferred: bool,
}

/// Extracts color and size from a variety.
///
/// Structured values are trimmed and keep their source casing; the last
/// matching attribute wins. Inferred values are lowercase.
#[must_use]
pub fn extract_attributes(variety: &ZureoVariety) -> ExtractedAttributes {
    let mut color = None;
    let mut size = None;

    for attribute in &variety.attributes {
        let Some(name) = attribute.name.as_deref() else {
            continue;
        };
        let Some(value) = non_empty(attribute.value.as_deref()) else {
            continue;
        };
        let name = name.to_lowercase();

        if COLOR_ATTRIBUTE_NAMES.iter().any(|n| name.contains(n)) {
            color = Some(value.to_owned());
        }
        if SIZE_ATTRIBUTE_NAMES.iter().any(|n| name.contains(n)) {
            size = Some(value.to_owned());
        }
    }

    if color.is_some() || size.is_some() {
        return ExtractedAttributes {
            color,
            size,
            inferred: false,
        };
    }

    match non_empty(variety.name.as_deref()) {
        Some(name) => infer_from_name(name),
        None => ExtractedAttributes::default(),
    }
}

fn infer_from_name(name: &str) -> ExtractedAttributes {
    let lowered = name.to_lowercase();

    let size = SIZE_TOKEN_RE
        .find_iter(&lowered)
        .last()
        .map(|m| m.as_str().to_owned());

    let color = lowered
        .split(|c: char| !c.is_alphanumeric())
        .find(|token| COLOR_VOCABULARY.contains(token))
        .map(str::to_owned);

    let inferred = color.is_some() || size.is_some();
    ExtractedAttributes {
        color,
        size,
        inferred,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
