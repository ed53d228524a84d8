//! Part catalog: classifies package parts by role.
//!
//! Roles are derived from path conventions plus the package's declared
//! content types: slide markup under `ppt/slides/slideN.xml` with an XML
//! content type, media under `ppt/media/`, relationship tables in `_rels`
//! sibling directories named after their owner. Slide order comes from the
//! numeric index in each slide's filename — archive entry order is not
//! guaranteed to match presentation order.

use crate::error::{Result, TemplateError};
use crate::opc::archive::Package;
use crate::opc::packuri::{CONTENT_TYPES_URI, PackURI};
use crate::opc::rel::RelationshipTable;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;

/// The role a part plays in the package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartRole {
    /// Slide markup XML (`ppt/slides/slideN.xml`)
    SlideMarkup,
    /// Opaque binary media (`ppt/media/*`)
    MediaAsset,
    /// A `.rels` relationship table
    RelationshipTable,
    /// Anything else (layouts, masters, themes, props, ...)
    Other,
}

/// Content type map built from `[Content_Types].xml`.
///
/// Implements the OPC content type discovery algorithm using Default and
/// Override elements.
pub struct ContentTypeMap {
    /// Maps file extensions to default content types
    defaults: HashMap<String, String>,

    /// Maps specific partnames to override content types
    overrides: HashMap<String, String>,
}

impl ContentTypeMap {
    /// Parse content types from `[Content_Types].xml`.
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut map = Self {
            defaults: HashMap::new(),
            overrides: HashMap::new(),
        };
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => match e.local_name().as_ref()
                {
                    b"Default" => {
                        let mut extension = None;
                        let mut content_type = None;

                        for attr in e.attributes() {
                            let attr = attr?;
                            match attr.key.as_ref() {
                                b"Extension" => {
                                    extension = Some(attr.unescape_value()?.to_string());
                                },
                                b"ContentType" => {
                                    content_type = Some(attr.unescape_value()?.to_string());
                                },
                                _ => {},
                            }
                        }

                        if let (Some(ext), Some(ct)) = (extension, content_type) {
                            map.defaults.insert(ext.to_lowercase(), ct);
                        }
                    },
                    b"Override" => {
                        let mut partname = None;
                        let mut content_type = None;

                        for attr in e.attributes() {
                            let attr = attr?;
                            match attr.key.as_ref() {
                                b"PartName" => {
                                    partname = Some(attr.unescape_value()?.to_string());
                                },
                                b"ContentType" => {
                                    content_type = Some(attr.unescape_value()?.to_string());
                                },
                                _ => {},
                            }
                        }

                        if let (Some(pn), Some(ct)) = (partname, content_type) {
                            map.overrides.insert(pn, ct);
                        }
                    },
                    _ => {},
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(TemplateError::Xml(format!(
                        "content types parse error: {}",
                        e
                    )));
                },
                _ => {},
            }
            buf.clear();
        }

        Ok(map)
    }

    /// Get the content type for a partname, checking overrides first and
    /// falling back to the extension default.
    pub fn get(&self, partname: &PackURI) -> Option<&str> {
        if let Some(ct) = self.overrides.get(partname.as_str()) {
            return Some(ct);
        }
        self.defaults.get(partname.ext()).map(String::as_str)
    }
}

/// A classified package, ready for substitution and media replacement.
///
/// Owns the underlying [`Package`]; one catalog corresponds to exactly one
/// generation run.
#[derive(Debug)]
pub struct Catalog {
    package: Package,

    /// Slide markup parts, ordered by the numeric index in their filename
    slides: Vec<PackURI>,

    /// Media asset parts, in archive order
    media: Vec<PackURI>,

    /// Parsed relationship tables, keyed by the owning part's URI string
    rels: HashMap<String, RelationshipTable>,
}

impl Catalog {
    /// Classify a package's parts.
    ///
    /// Fails with `CatalogIncomplete` when the package holds no slide
    /// markup parts — no valid output is possible for such input.
    pub fn classify(package: Package) -> Result<Self> {
        let content_types = ContentTypeMap::from_xml(
            package.part_blob(&PackURI::new(CONTENT_TYPES_URI)?)?,
        )?;

        let mut slides = Vec::new();
        let mut media = Vec::new();
        let mut rels_parts = Vec::new();

        for part in package.iter_parts() {
            let partname = part.partname();
            match Self::role_of(partname, &content_types) {
                PartRole::SlideMarkup => slides.push(partname.clone()),
                PartRole::MediaAsset => media.push(partname.clone()),
                PartRole::RelationshipTable => rels_parts.push(partname.clone()),
                PartRole::Other => {},
            }
        }

        if slides.is_empty() {
            return Err(TemplateError::CatalogIncomplete);
        }

        // Presentation order is the numeric filename index, not archive order
        slides.sort_by_key(|p| p.idx().unwrap_or(u32::MAX));

        let mut rels = HashMap::with_capacity(rels_parts.len());
        for rels_uri in rels_parts {
            // role_of guarantees the owner derivation succeeds
            let owner = match rels_uri.rels_owner() {
                Some(owner) => owner,
                None => continue,
            };
            let table =
                RelationshipTable::from_xml(package.part_blob(&rels_uri)?, owner.base_uri())?;
            rels.insert(owner.as_str().to_string(), table);
        }

        Ok(Self {
            package,
            slides,
            media,
            rels,
        })
    }

    /// Determine the role of a single part.
    fn role_of(partname: &PackURI, content_types: &ContentTypeMap) -> PartRole {
        if partname.rels_owner().is_some() {
            return PartRole::RelationshipTable;
        }

        let name = partname.as_str();
        if name.starts_with("/ppt/slides/")
            && partname.filename().starts_with("slide")
            && partname.idx().is_some()
            && content_types
                .get(partname)
                .is_some_and(|ct| ct.ends_with("+xml") || ct.ends_with("/xml"))
        {
            return PartRole::SlideMarkup;
        }

        if name.starts_with("/ppt/media/") {
            return PartRole::MediaAsset;
        }

        PartRole::Other
    }

    /// Slide markup parts in presentation order.
    pub fn slides(&self) -> &[PackURI] {
        &self.slides
    }

    /// Media asset parts, in archive order.
    pub fn media(&self) -> &[PackURI] {
        &self.media
    }

    /// The relationship table owned by a part, if it has one.
    pub fn rels_for(&self, owner: &PackURI) -> Option<&RelationshipTable> {
        self.rels.get(owner.as_str())
    }

    /// The underlying package.
    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Mutable access to the underlying package.
    pub fn package_mut(&mut self) -> &mut Package {
        &mut self.package
    }

    /// Consume the catalog, returning the (possibly mutated) package.
    pub fn into_package(self) -> Package {
        self.package
    }
}
