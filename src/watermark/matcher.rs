//! Watermark variants and their resource predicates

use std::fmt;

use lopdf::{Dictionary, Object};

use crate::pdf::{Resource, ResourceKind};

/// Image XObjects stamped by the "QQAPIm" watermarker
pub const DEFAULT_IMAGE_PREFIX: &str = "QQAPIm";
/// Graphics states applied before watermark text
pub const DEFAULT_GRAPHICS_STATE_PREFIX: &str = "Xi";
/// Optional content group that marks watermark forms
pub const DEFAULT_GROUP_NAME: &str = "Watermark";

/// One watermark variant.
///
/// Each variant inspects a single resource kind and decides whether a named
/// entry belongs to the watermark. Matching never fails: anything missing or
/// of the wrong shape is simply not a watermark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Image XObject whose resource name starts with `prefix`
    Image { prefix: String },
    /// Graphics state whose resource name starts with `prefix`
    GraphicsState { prefix: String },
    /// Form XObject whose optional content group is named `group_name`
    /// (ASCII case-insensitive)
    Form { group_name: String },
}

impl Matcher {
    pub fn image(prefix: impl Into<String>) -> Self {
        Matcher::Image { prefix: prefix.into() }
    }

    pub fn graphics_state(prefix: impl Into<String>) -> Self {
        Matcher::GraphicsState { prefix: prefix.into() }
    }

    pub fn form(group_name: impl Into<String>) -> Self {
        Matcher::Form { group_name: group_name.into() }
    }

    /// Short label used in logs, reports and on the command line
    pub fn label(&self) -> &'static str {
        match self {
            Matcher::Image { .. } => "image",
            Matcher::GraphicsState { .. } => "gstate",
            Matcher::Form { .. } => "form",
        }
    }

    /// The resource sub-dictionary this variant looks at
    pub fn resource_kind(&self) -> ResourceKind {
        match self {
            Matcher::Image { .. } | Matcher::Form { .. } => ResourceKind::XObject,
            Matcher::GraphicsState { .. } => ResourceKind::ExtGState,
        }
    }

    /// Whether the resource `name` resolving to `resource` is a watermark of this variant
    pub fn matches(&self, name: &[u8], resource: &Resource) -> bool {
        match (self, resource) {
            (Matcher::Image { prefix }, Resource::Image(_)) => name.starts_with(prefix.as_bytes()),
            (Matcher::GraphicsState { prefix }, Resource::GraphicsState(_)) => {
                name.starts_with(prefix.as_bytes())
            }
            (Matcher::Form { group_name }, Resource::Form(form)) => optional_content_names(form)
                .iter()
                .any(|name| name.eq_ignore_ascii_case(group_name)),
            _ => false,
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Image { prefix } => write!(f, "image XObject /{}*", prefix),
            Matcher::GraphicsState { prefix } => write!(f, "graphics state /{}*", prefix),
            Matcher::Form { group_name } => write!(f, "form XObject in group \"{}\"", group_name),
        }
    }
}

/// The built-in variants, in processing order
pub fn default_registry() -> Vec<Matcher> {
    vec![
        Matcher::image(DEFAULT_IMAGE_PREFIX),
        Matcher::graphics_state(DEFAULT_GRAPHICS_STATE_PREFIX),
        Matcher::form(DEFAULT_GROUP_NAME),
    ]
}

/// Names of the optional content groups a form belongs to.
///
/// `/OC` is either a membership dictionary whose `/OCGs` holds one group or
/// an array of groups, or a group itself.
fn optional_content_names(form: &Dictionary) -> Vec<String> {
    let Ok(oc) = form.get(b"OC").and_then(Object::as_dict) else {
        return Vec::new();
    };

    match oc.get(b"OCGs") {
        Ok(Object::Dictionary(group)) => group_name(group).into_iter().collect(),
        Ok(Object::Array(groups)) => groups
            .iter()
            .filter_map(|group| group.as_dict().ok())
            .filter_map(group_name)
            .collect(),
        Ok(_) => Vec::new(),
        Err(_) if is_group(oc) => group_name(oc).into_iter().collect(),
        Err(_) => Vec::new(),
    }
}

fn is_group(dict: &Dictionary) -> bool {
    matches!(dict.get(b"Type").and_then(Object::as_name), Ok(b"OCG"))
}

fn group_name(group: &Dictionary) -> Option<String> {
    group
        .get(b"Name")
        .and_then(Object::as_str)
        .ok()
        .map(decode_text_string)
}

/// Decode a PDF text string: UTF-16BE with a byte order mark, otherwise bytes as-is
fn decode_text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn form_with_oc(oc: Dictionary) -> Resource {
        Resource::Form(dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "OC" => oc,
        })
    }

    #[test]
    fn test_image_matches_prefix() {
        let matcher = Matcher::image(DEFAULT_IMAGE_PREFIX);
        let image = Resource::Image(dictionary! { "Subtype" => "Image" });

        assert!(matcher.matches(b"QQAPIm0", &image));
        assert!(!matcher.matches(b"Im0", &image));
    }

    #[test]
    fn test_image_prefix_ignores_forms() {
        let matcher = Matcher::image(DEFAULT_IMAGE_PREFIX);
        let form = Resource::Form(dictionary! { "Subtype" => "Form" });

        assert!(!matcher.matches(b"QQAPIm0", &form));
    }

    #[test]
    fn test_graphics_state_matches_prefix_only() {
        let matcher = Matcher::graphics_state(DEFAULT_GRAPHICS_STATE_PREFIX);
        let state = Resource::GraphicsState(Dictionary::new());

        assert!(matcher.matches(b"Xi12", &state));
        assert!(!matcher.matches(b"GS0", &state));
        assert!(!matcher.matches(b"Xi12", &Resource::Other));
    }

    #[test]
    fn test_form_matches_group_name_case_insensitively() {
        let matcher = Matcher::form(DEFAULT_GROUP_NAME);
        let form = form_with_oc(dictionary! {
            "Type" => "OCMD",
            "OCGs" => dictionary! {
                "Type" => "OCG",
                "Name" => Object::string_literal("WATERMARK"),
            },
        });

        assert!(matcher.matches(b"Fm0", &form));
    }

    #[test]
    fn test_form_matches_any_group_in_array() {
        let matcher = Matcher::form(DEFAULT_GROUP_NAME);
        let form = form_with_oc(dictionary! {
            "Type" => "OCMD",
            "OCGs" => vec![
                Object::Dictionary(dictionary! { "Name" => Object::string_literal("Print") }),
                Object::Dictionary(dictionary! { "Name" => Object::string_literal("watermark") }),
            ],
        });

        assert!(matcher.matches(b"Fm1", &form));
    }

    #[test]
    fn test_form_accepts_group_as_oc_entry() {
        let matcher = Matcher::form(DEFAULT_GROUP_NAME);
        let mut name = vec![0xFE, 0xFF];
        name.extend("Watermark".encode_utf16().flat_map(u16::to_be_bytes));
        let form = form_with_oc(dictionary! {
            "Type" => "OCG",
            "Name" => Object::String(name, lopdf::StringFormat::Hexadecimal),
        });

        assert!(matcher.matches(b"Fm2", &form));
    }

    #[test]
    fn test_form_with_missing_structure_is_not_a_match() {
        let matcher = Matcher::form(DEFAULT_GROUP_NAME);

        assert!(!matcher.matches(b"Fm0", &Resource::Form(Dictionary::new())));
        assert!(!matcher.matches(b"Fm0", &form_with_oc(dictionary! { "Type" => "OCMD" })));
        assert!(!matcher.matches(
            b"Fm0",
            &form_with_oc(dictionary! { "OCGs" => dictionary! { "Type" => "OCG" } })
        ));
        assert!(!matcher.matches(
            b"Fm0",
            &form_with_oc(dictionary! { "OCGs" => Object::Integer(7) })
        ));
    }

    #[test]
    fn test_default_registry_order() {
        let labels: Vec<_> = default_registry().iter().map(Matcher::label).collect();

        assert_eq!(labels, vec!["image", "gstate", "form"]);
    }
}
