//! Physical access to a slide-deck package (ZIP archive).
//!
//! A [`Package`] holds the whole archive in memory: an ordered collection of
//! named parts plus the original ZIP bytes, which the writer later uses to
//! raw-copy untouched entries without recompression. No part is ever
//! partially streamed; a package is opened fully, mutated in place, and
//! consumed exactly once by the repackager.

use crate::error::{Result, TemplateError};
use crate::opc::packuri::{CONTENT_TYPES_URI, PackURI};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::CompressionMethod;
use zip::ZipArchive;

/// A single named entry inside a package.
///
/// Keeps the decompressed payload together with the entry's original
/// compression mode so the repackager can re-emit mutated parts the same way
/// they were stored.
#[derive(Debug)]
pub struct PackagePart {
    /// The partname (URI) of this part
    partname: PackURI,

    /// The decompressed content of this part
    blob: Vec<u8>,

    /// Compression method the entry used in the source archive
    compression: CompressionMethod,

    /// Whether this part's bytes were mutated since the package was opened
    dirty: bool,
}

impl PackagePart {
    /// Get the partname of this part.
    #[inline]
    pub fn partname(&self) -> &PackURI {
        &self.partname
    }

    /// Get the decompressed content of this part.
    #[inline]
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// Compression method the entry used in the source archive.
    #[inline]
    pub fn compression(&self) -> CompressionMethod {
        self.compression
    }

    /// Whether this part was mutated since the package was opened.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// A slide-deck package held fully in memory.
///
/// Part order matches the source archive's entry order and is preserved
/// through repackaging. A `Package` instance is exclusively owned by one
/// generation run; concurrent runs must each open their own copy.
#[derive(Debug)]
pub struct Package {
    /// The original archive bytes, retained for raw-copy passthrough
    source: Vec<u8>,

    /// All parts, in source archive entry order
    parts: Vec<PackagePart>,

    /// Partname -> index into `parts`
    index: HashMap<String, usize>,
}

impl Package {
    /// Open a package from a file path.
    ///
    /// # Errors
    /// Returns `ArchiveNotFound` if the file does not exist and
    /// `ArchiveCorrupt` if it is not a valid OPC package.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(TemplateError::ArchiveNotFound(path.display().to_string()));
        }

        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    /// Load a package from a reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(data)
    }

    /// Load a package from owned archive bytes.
    ///
    /// Rejects non-ZIP input, packages missing `[Content_Types].xml`, and
    /// packages with no relationship parts — none of these can produce a
    /// valid output document.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(&data))
            .map_err(|e| TemplateError::ArchiveCorrupt(e.to_string()))?;

        let mut parts = Vec::with_capacity(archive.len());
        let mut index = HashMap::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| TemplateError::ArchiveCorrupt(e.to_string()))?;
            if file.is_dir() {
                continue;
            }

            let partname = PackURI::new(format!("/{}", file.name()))?;
            let compression = file.compression();

            let mut blob = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut blob)
                .map_err(|e| TemplateError::ArchiveCorrupt(e.to_string()))?;

            index.insert(partname.as_str().to_string(), parts.len());
            parts.push(PackagePart {
                partname,
                blob,
                compression,
                dirty: false,
            });
        }

        let package = Self {
            source: data,
            parts,
            index,
        };

        if !package.contains(CONTENT_TYPES_URI) {
            return Err(TemplateError::ArchiveCorrupt(
                "package has no [Content_Types].xml part".to_string(),
            ));
        }
        if !package
            .parts
            .iter()
            .any(|p| p.partname.rels_owner().is_some())
        {
            return Err(TemplateError::ArchiveCorrupt(
                "package has no relationship parts".to_string(),
            ));
        }

        Ok(package)
    }

    /// Check if a part exists in the package.
    pub fn contains(&self, partname: &str) -> bool {
        self.index.contains_key(partname)
    }

    /// Get a part by its partname.
    pub fn part(&self, partname: &PackURI) -> Option<&PackagePart> {
        self.index
            .get(partname.as_str())
            .map(|&i| &self.parts[i])
    }

    /// Get the decompressed content for a part.
    pub fn part_blob(&self, partname: &PackURI) -> Result<&[u8]> {
        self.part(partname)
            .map(|p| p.blob())
            .ok_or_else(|| TemplateError::PartNotFound(partname.to_string()))
    }

    /// Replace a part's bytes, marking the part as mutated.
    ///
    /// The part's name and declared content type are left unchanged; only
    /// its payload is swapped.
    pub fn set_part_blob(&mut self, partname: &PackURI, blob: Vec<u8>) -> Result<()> {
        let &i = self
            .index
            .get(partname.as_str())
            .ok_or_else(|| TemplateError::PartNotFound(partname.to_string()))?;
        self.parts[i].blob = blob;
        self.parts[i].dirty = true;
        Ok(())
    }

    /// Iterate over all parts in source archive entry order.
    pub fn iter_parts(&self) -> impl Iterator<Item = &PackagePart> {
        self.parts.iter()
    }

    /// Get the number of parts in the package.
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Check whether any part has been mutated since open.
    pub fn is_dirty(&self) -> bool {
        self.parts.iter().any(|p| p.dirty)
    }

    /// The original archive bytes this package was opened from.
    pub(crate) fn source_bytes(&self) -> &[u8] {
        &self.source
    }
}
