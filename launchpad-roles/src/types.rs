//! Core types shared by the resolution components

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// CRM object type on either side of an association
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    /// Person records
    Contacts,
    /// Organization records
    Companies,
}

impl ObjectType {
    /// Path segment used by the CRM API
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Contacts => "contacts",
            ObjectType::Companies => "companies",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who registered an association label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelCategory {
    /// Built into the CRM platform
    #[serde(
        rename = "SYSTEM_DEFINED",
        alias = "HUBSPOT_DEFINED",
        alias = "INTEGRATOR_DEFINED"
    )]
    SystemDefined,
    /// Created by an operator
    #[serde(rename = "USER_DEFINED")]
    UserDefined,
}

impl LabelCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelCategory::SystemDefined => "SYSTEM_DEFINED",
            LabelCategory::UserDefined => "USER_DEFINED",
        }
    }
}

impl fmt::Display for LabelCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered association label
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDefinition {
    /// Label name in its canonical casing
    pub name: String,
    /// Label category
    pub category: LabelCategory,
    /// Numeric association type id
    pub type_id: u64,
}

impl LabelDefinition {
    pub fn new(name: impl Into<String>, category: LabelCategory, type_id: u64) -> Self {
        Self {
            name: name.into(),
            category,
            type_id,
        }
    }

    /// Case-insensitive name comparison
    pub fn is_named(&self, name: &str) -> bool {
        names_match(&self.name, name)
    }
}

/// Label definition resolved for a role name
pub type RoleDescriptor = LabelDefinition;

/// Label metadata attached to one link.
///
/// Every field is optional: unlabeled associations carry no name, and the
/// batch lookup does not report a category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelTag {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<LabelCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_id: Option<u64>,
}

impl LabelTag {
    /// Tag with full metadata
    pub fn new(name: impl Into<String>, category: LabelCategory, type_id: u64) -> Self {
        Self {
            name: Some(name.into()),
            category: Some(category),
            type_id: Some(type_id),
        }
    }

    /// Tag carrying only a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Name matches case-insensitively and the label is operator-created
    pub fn is_user_label(&self, role_name: &str) -> bool {
        self.category == Some(LabelCategory::UserDefined)
            && self
                .name
                .as_deref()
                .map(|n| names_match(n, role_name))
                .unwrap_or(false)
    }

    /// Human-readable `name (CATEGORY)` form for diagnostics
    pub fn describe(&self) -> String {
        let name = self.name.as_deref().unwrap_or("<unlabeled>");
        match self.category {
            Some(category) => format!("{} ({})", name, category),
            None => name.to_string(),
        }
    }
}

/// An association from the queried record to one target record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    /// Id of the associated record
    pub target_id: String,
    /// Labels in the order the CRM reported them
    pub labels: Vec<LabelTag>,
}

impl Link {
    pub fn new(target_id: impl Into<String>, labels: Vec<LabelTag>) -> Self {
        Self {
            target_id: target_id.into(),
            labels,
        }
    }
}

/// A single attribute value on a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    Number(serde_json::Number),
}

impl AttributeValue {
    /// Display form, `None` when the value is blank
    pub fn as_display(&self) -> Option<String> {
        match self {
            AttributeValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            AttributeValue::Number(n) => Some(n.to_string()),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Text(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(n: i64) -> Self {
        AttributeValue::Number(n.into())
    }
}

/// A CRM record as read by the engine. Never mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    /// Attribute values keyed by CRM property name; `None` is an explicit null
    #[serde(default)]
    pub attributes: BTreeMap<String, Option<AttributeValue>>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), Some(value.into()));
        self
    }

    /// Builder-style explicit null
    pub fn with_null(mut self, key: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), None);
        self
    }

    /// Display text for an attribute; `None` when missing, null or blank
    pub fn text(&self, key: &str) -> Option<String> {
        self.attributes
            .get(key)
            .and_then(|v| v.as_ref())
            .and_then(AttributeValue::as_display)
    }
}

/// Case-insensitive, whitespace-trimmed name comparison
pub fn names_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}
