use std::path::{Component, Path};

/// Marker used when no other is configured. Folders of shared photos carry
/// it in their names and are left out of sorting.
pub const DEFAULT_SHARED_MARKER: &str = "общие";

/// Decides whether a directory name excludes its contents from sorting.
pub trait NameFilter {
    fn excludes(&self, name: &str) -> bool;
}

/// Excludes names containing a marker substring, compared case-insensitively
/// after Unicode lowercasing. An empty marker excludes nothing.
#[derive(Debug, Clone)]
pub struct MarkerFilter {
    marker: String,
}

impl MarkerFilter {
    pub fn new(marker: impl AsRef<str>) -> Self {
        Self {
            marker: marker.as_ref().to_lowercase(),
        }
    }
}

impl Default for MarkerFilter {
    fn default() -> Self {
        Self::new(DEFAULT_SHARED_MARKER)
    }
}

impl NameFilter for MarkerFilter {
    fn excludes(&self, name: &str) -> bool {
        !self.marker.is_empty() && name.to_lowercase().contains(&self.marker)
    }
}

/// Reports whether any component of `dir` is excluded.
pub fn has_excluded_component(filter: &dyn NameFilter, dir: &Path) -> bool {
    dir.components().any(|c| match c {
        Component::Normal(name) => filter.excludes(&name.to_string_lossy()),
        _ => false,
    })
}

/// Reports whether any ancestor directory of `path` is excluded, all the
/// way up to the filesystem root. The file name itself never counts.
pub fn has_excluded_ancestor(filter: &dyn NameFilter, path: &Path) -> bool {
    path.parent()
        .is_some_and(|parent| has_excluded_component(filter, parent))
}
