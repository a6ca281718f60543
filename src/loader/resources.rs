//! Named resources and the restartable sequences that merge them.

use std::fmt;
use std::sync::Arc;

use super::CodeSource;

/// A named blob of bytes found in a code source.
#[derive(Clone, PartialEq, Eq)]
pub struct Resource {
    name: String,
    origin: String,
    data: Arc<[u8]>,
}

impl Resource {
    /// Create a resource.
    pub fn new(name: impl Into<String>, origin: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            origin: origin.into(),
            data: data.into(),
        }
    }

    /// Resource name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the source that produced it.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Raw contents.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Contents as UTF-8, if valid.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Every resource with one name across an ordered list of sources.
///
/// Finite and restartable: each call to [`iter`](Self::iter) starts over
/// from the first source and queries the sources again.
#[derive(Clone)]
pub struct Resources {
    name: String,
    sources: Vec<Arc<dyn CodeSource>>,
}

impl Resources {
    pub(crate) fn new(name: impl Into<String>, sources: Vec<Arc<dyn CodeSource>>) -> Self {
        Self {
            name: name.into(),
            sources,
        }
    }

    /// Resource name being looked up.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Iterate from the first source.
    pub fn iter(&self) -> impl Iterator<Item = Resource> + '_ {
        self.sources
            .iter()
            .flat_map(move |source| source.find_resources(&self.name))
    }

    /// First match, if any.
    pub fn first(&self) -> Option<Resource> {
        self.iter().next()
    }
}

impl<'a> IntoIterator for &'a Resources {
    type Item = Resource;
    type IntoIter = Box<dyn Iterator<Item = Resource> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl fmt::Debug for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resources")
            .field("name", &self.name)
            .field("sources", &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish()
    }
}
