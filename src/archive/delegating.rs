//! One lookup surface over an archive and its dependencies

use super::{ArchiveReader, Entry};

/// Readers consulted in order; the first one holding a name wins
pub struct DelegatingArchiveReader<'a> {
    readers: Vec<&'a dyn ArchiveReader>,
}

impl<'a> DelegatingArchiveReader<'a> {
    pub fn new(readers: Vec<&'a dyn ArchiveReader>) -> Self {
        Self { readers }
    }

    /// `primary` first, then each dependency in order
    pub fn with_dependencies(primary: &'a dyn ArchiveReader, dependencies: &'a [&'a dyn ArchiveReader]) -> Self {
        let mut readers = Vec::with_capacity(dependencies.len() + 1);
        readers.push(primary);
        readers.extend(dependencies.iter().copied());
        Self { readers }
    }

    /// The dependency readers alone, without the primary archive
    pub fn dependencies(&self) -> &[&'a dyn ArchiveReader] {
        self.readers.get(1..).unwrap_or(&[])
    }
}

impl ArchiveReader for DelegatingArchiveReader<'_> {
    fn of(&self, name: &str) -> Option<Entry> {
        self.readers.iter().find_map(|reader| reader.of(name))
    }

    fn entries(&self) -> Box<dyn Iterator<Item = Entry> + '_> {
        Box::new(self.readers.iter().flat_map(|reader| reader.entries()))
    }
}
