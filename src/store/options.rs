use crate::graph::DEFAULT_BRAND_LABEL;

/// Settings shared by a [`Store`](super::Store) and its owner.
#[derive(Clone, Debug)]
pub struct CatalogOptions {
    /// Label of the graph's root node.
    pub brand_label: String,
    /// Fail a reload when a model has no technology instead of logging it.
    pub strict_reload: bool,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            brand_label: DEFAULT_BRAND_LABEL.to_string(),
            strict_reload: false,
        }
    }
}
