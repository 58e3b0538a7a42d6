use core::fmt;
use std::ops::Index;

use indexmap::{IndexMap, map::Entry};

use crate::resource::{ResId, Resource};

/// Resources keyed by id. Iteration follows insertion order, and removal keeps the order of
/// the remaining entries.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ResourceMap {
    resources: IndexMap<ResId, Resource>,
}

impl fmt::Debug for ResourceMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.resources.values()).finish()
    }
}

impl fmt::Display for ResourceMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for resource in self.iter() {
            if self.len() > 1 {
                writeln!(f, "---")?;
            }
            let yaml = serde_yaml::to_string(resource).map_err(|_| fmt::Error)?;
            write!(f, "{yaml}")?;
        }

        Ok(())
    }
}

impl ResourceMap {
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn insert(&mut self, resource: Resource) -> Result<(), Conflict> {
        match self.resources.entry(resource.id().clone()) {
            Entry::Occupied(_) => Err(Conflict { resource }),
            Entry::Vacant(entry) => {
                entry.insert(resource);
                Ok(())
            }
        }
    }

    pub fn get(&self, id: &ResId) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn contains(&self, id: &ResId) -> bool {
        self.resources.contains_key(id)
    }

    pub fn remove(&mut self, id: &ResId) -> Option<Resource> {
        self.resources.shift_remove(id)
    }

    pub fn ids(&self) -> impl ExactSizeIterator<Item = &ResId> + DoubleEndedIterator {
        self.resources.keys()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Resource> + DoubleEndedIterator {
        self.resources.values()
    }

    pub fn iter_mut(
        &mut self,
    ) -> impl ExactSizeIterator<Item = &mut Resource> + DoubleEndedIterator {
        self.resources.values_mut()
    }

    /// In-place merge of two `ResourceMap`s, any conflicting resources will be an error
    pub fn merge(&mut self, other: ResourceMap) -> Result<(), Conflict> {
        for (_, resource) in other.resources {
            self.insert(resource)?;
        }
        Ok(())
    }
}

impl Index<&ResId> for ResourceMap {
    type Output = Resource;

    fn index(&self, id: &ResId) -> &Self::Output {
        self.resources
            .get(id)
            .unwrap_or_else(|| panic!("resource with id `{id}` not in ResourceMap"))
    }
}

impl TryFrom<Vec<Resource>> for ResourceMap {
    type Error = Conflict;

    fn try_from(resources: Vec<Resource>) -> Result<Self, Self::Error> {
        let mut map = ResourceMap::default();
        for resource in resources {
            map.insert(resource)?;
        }
        Ok(map)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub resource: Resource,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "may not add resource with an already registered id `{}`",
            self.resource.id()
        )
    }
}

impl std::error::Error for Conflict {}
