use serde::{Deserialize, Serialize};

/// Settings key holding the ordered department list.
pub const DEPARTMENTS_KEY: &str = "departments";
/// Settings key holding the ordered font catalog.
pub const FONTS_KEY: &str = "fonts";

/// An organizational unit; selecting one picks its branding template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: String,
    pub name: String,
    /// Overlay image: a path, or a `file://`, `http(s)://` or `data:` URL.
    pub template_url: String,
}

impl Department {
    pub fn new(name: impl Into<String>, template_url: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: department_id_from_name(&name),
            name,
            template_url: template_url.into(),
        }
    }
}

/// Partial update for a [`Department`]. The id is never changed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DepartmentPatch {
    pub name: Option<String>,
    pub template_url: Option<String>,
}

impl DepartmentPatch {
    pub fn apply(&self, dept: &mut Department) {
        if let Some(n) = &self.name {
            dept.name = n.clone();
        }
        if let Some(t) = &self.template_url {
            dept.template_url = t.clone();
        }
    }
}

/// A font family offered in the text style picker.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontCatalogEntry {
    pub name: String,
    /// `data:` URL, `http(s)://` URL, or font file path relative to the settings file. `None` for
    /// faces served by the default font.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_default: bool,
}

/// Lowercase the name and collapse whitespace runs into `-`.
pub fn department_id_from_name(name: &str) -> String {
    name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-")
}
