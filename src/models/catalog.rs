use serde::{Deserialize, Serialize};

/// A billable exam type from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamCatalogItem {
    pub id: String,
    pub name: String,
    /// Price in reais, converted from the backend's integer cents.
    pub price: f64,
    pub category_id: String,
}

/// Catalog items grouped under one category.
///
/// The title comes from the first item seen for the category; section
/// order follows first appearance in the flat backend list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamCatalogSection {
    pub id: String,
    pub title: String,
    pub items: Vec<ExamCatalogItem>,
}
