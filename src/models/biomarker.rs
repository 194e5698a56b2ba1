use serde::{Deserialize, Serialize};

/// A named group of markers, e.g. "Lever" with its enzyme list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryGroup {
    pub category: String,
    #[serde(default)]
    pub markers: Vec<String>,
}

/// Biomarkers as found on a product page.
///
/// Some pages list markers flat, others segment them by physiological
/// category. Both shapes serialize to a plain JSON array, so consumers see
/// either `["Glucose", ...]` or `[{"category": ..., "markers": [...]}, ...]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum BiomarkerSet {
    Flat(Vec<String>),
    Categorized(Vec<CategoryGroup>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BiomarkerCount {
    pub total: usize,
    /// Only reported for categorized sets.
    pub categories: Option<usize>,
}

impl BiomarkerSet {
    pub fn empty() -> Self {
        BiomarkerSet::Flat(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            BiomarkerSet::Flat(markers) => markers.is_empty(),
            BiomarkerSet::Categorized(groups) => groups.is_empty(),
        }
    }

    pub fn count(&self) -> BiomarkerCount {
        match self {
            BiomarkerSet::Categorized(groups) if !groups.is_empty() => BiomarkerCount {
                total: groups.iter().map(|g| g.markers.len()).sum(),
                categories: Some(groups.len()),
            },
            BiomarkerSet::Categorized(_) => BiomarkerCount {
                total: 0,
                categories: None,
            },
            BiomarkerSet::Flat(markers) => BiomarkerCount {
                total: markers.len(),
                categories: None,
            },
        }
    }

    /// Flatten to a single ordered list of marker names.
    pub fn flatten(&self) -> BiomarkerSet {
        match self {
            BiomarkerSet::Flat(markers) => BiomarkerSet::Flat(markers.clone()),
            BiomarkerSet::Categorized(groups) => BiomarkerSet::Flat(
                groups
                    .iter()
                    .flat_map(|g| g.markers.iter().cloned())
                    .collect(),
            ),
        }
    }

    pub fn marker_names(&self) -> Vec<&str> {
        match self {
            BiomarkerSet::Flat(markers) => markers.iter().map(String::as_str).collect(),
            BiomarkerSet::Categorized(groups) => groups
                .iter()
                .flat_map(|g| g.markers.iter().map(String::as_str))
                .collect(),
        }
    }
}

impl Default for BiomarkerSet {
    fn default() -> Self {
        Self::empty()
    }
}
