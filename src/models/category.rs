use serde::{Deserialize, Serialize};

/// A medical specialty with a denormalized count of matching doctors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub icon_name: String,
    pub color: String,
    pub specialist_count: u32,
}

/// Category as stored in the categories collection.
#[derive(Debug, Deserialize)]
pub(crate) struct CategoryDocument {
    #[serde(rename = "$id")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    icon_name: String,
    #[serde(default)]
    color: String,
    #[serde(default)]
    specialist_count: Option<u32>,
}

impl From<CategoryDocument> for Category {
    fn from(doc: CategoryDocument) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            icon_name: doc.icon_name,
            color: doc.color,
            specialist_count: doc.specialist_count.unwrap_or(0),
        }
    }
}
