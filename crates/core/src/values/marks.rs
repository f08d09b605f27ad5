use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// An opaque tag attached to a value, e.g. `sensitive`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mark {
    name: String,
    details: BTreeMap<String, String>,
}

impl Mark {
    pub fn new(name: impl Into<String>) -> Self {
        Mark {
            name: name.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn details(&self) -> &BTreeMap<String, String> {
        &self.details
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl From<&str> for Mark {
    fn from(name: &str) -> Self {
        Mark::new(name)
    }
}

/// Deduplicated set of marks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Marks(BTreeSet<Mark>);

impl Marks {
    pub fn new() -> Self {
        Marks::default()
    }

    pub fn insert(&mut self, mark: Mark) -> bool {
        self.0.insert(mark)
    }

    pub fn contains(&self, mark: &Mark) -> bool {
        self.0.contains(mark)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.0.iter().any(|m| m.name == name)
    }

    pub fn union(&self, other: &Marks) -> Marks {
        Marks(self.0.union(&other.0).cloned().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mark> {
        self.0.iter()
    }
}

impl FromIterator<Mark> for Marks {
    fn from_iter<I: IntoIterator<Item = Mark>>(iter: I) -> Self {
        Marks(iter.into_iter().collect())
    }
}

impl Extend<Mark> for Marks {
    fn extend<I: IntoIterator<Item = Mark>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

impl IntoIterator for Marks {
    type Item = Mark;
    type IntoIter = std::collections::btree_set::IntoIter<Mark>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
