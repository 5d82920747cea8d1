use crate::NBT;

/// Named tags in the order they were read or inserted. Keys are unique.
///
/// Lookups are linear, compounds in practice hold a handful of keys.
#[derive(Clone, PartialEq, Default)]
pub struct NBTCompound {
    entries: Vec<(String, NBT)>,
}

impl std::fmt::Debug for NBTCompound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(key, value)| (key, value)))
            .finish()
    }
}

impl NBTCompound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&NBT> {
        self.position(key).map(|index| &self.entries[index].1)
    }

    /// Replaces an existing value in place, keeping its position, and returns the old one.
    pub fn insert(&mut self, key: impl Into<String>, value: NBT) -> Option<NBT> {
        let key = key.into();
        match self.position(&key) {
            Some(index) => Some(std::mem::replace(&mut self.entries[index].1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Appends without checking for an existing key, the reader checks before calling this.
    pub(crate) fn push_unchecked(&mut self, key: String, value: NBT) {
        self.entries.push((key, value));
    }

    pub fn remove(&mut self, key: &str) -> Option<NBT> {
        self.position(key)
            .map(|index| self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NBT)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }
}

impl IntoIterator for NBTCompound {
    type Item = (String, NBT);
    type IntoIter = std::vec::IntoIter<Self::Item>;
    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Later duplicates overwrite earlier ones.
impl FromIterator<(String, NBT)> for NBTCompound {
    fn from_iter<T: IntoIterator<Item = (String, NBT)>>(iter: T) -> Self {
        let mut compound = NBTCompound::new();
        iter.into_iter().for_each(|(key, value)| {
            compound.insert(key, value);
        });
        compound
    }
}
