//! Match instances and the document-wide match table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::geometry::Quad;

/// One located occurrence of a quote on a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchInstance {
    /// 0-based page index
    pub page: usize,

    /// Normalized quote key that produced this occurrence
    pub key: String,

    /// One quad per visual line covered by the occurrence
    pub quads: Vec<Quad>,
}

/// All match instances collected over one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchTable {
    instances: Vec<MatchInstance>,
}

impl MatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, instance: MatchInstance) {
        self.instances.push(instance);
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatchInstance> {
        self.instances.iter()
    }

    /// Instances grouped by page index, pages ascending
    pub fn by_page(&self) -> BTreeMap<usize, Vec<&MatchInstance>> {
        let mut pages: BTreeMap<usize, Vec<&MatchInstance>> = BTreeMap::new();
        for instance in &self.instances {
            pages.entry(instance.page).or_default().push(instance);
        }
        pages
    }

    /// Lowest page index holding an instance of `key`
    pub fn min_page_for(&self, key: &str) -> Option<usize> {
        self.instances
            .iter()
            .filter(|i| i.key == key)
            .map(|i| i.page)
            .min()
    }
}

impl FromIterator<MatchInstance> for MatchTable {
    fn from_iter<T: IntoIterator<Item = MatchInstance>>(iter: T) -> Self {
        Self {
            instances: iter.into_iter().collect(),
        }
    }
}
