//! Relationship tables for OPC packages.
//!
//! A `.rels` part is an XML table of `(rId, type, target)` triples scoped to
//! one owning part. Table order is preserved: the media resolver's tie-break
//! is source position, so a hash-keyed collection would lose information the
//! engine depends on.

use crate::error::{Result, TemplateError};
use crate::opc::constants::target_mode;
use crate::opc::packuri::PackURI;
use quick_xml::Reader;
use quick_xml::events::Event;
use smallvec::SmallVec;

/// A single relationship from an owning part to a target.
#[derive(Debug, Clone)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1", "rId2")
    r_id: String,

    /// Relationship type URI
    reltype: String,

    /// Target reference - either a relative part URI or an external URL
    target_ref: String,

    /// Base URI for resolving relative references
    base_uri: String,

    /// Whether this is an external relationship
    is_external: bool,
}

impl Relationship {
    /// Get the relationship ID.
    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    /// Get the relationship type URI.
    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    /// Get the target reference.
    ///
    /// For internal relationships this is a relative part reference; for
    /// external relationships an absolute URL.
    #[inline]
    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    /// Check if this is an external relationship.
    #[inline]
    pub fn is_external(&self) -> bool {
        self.is_external
    }

    /// Get the absolute target partname for internal relationships.
    pub fn target_partname(&self) -> Result<PackURI> {
        if self.is_external {
            return Err(TemplateError::InvalidPartName(
                "cannot resolve partname for external relationship".to_string(),
            ));
        }
        PackURI::from_rel_ref(&self.base_uri, &self.target_ref)
    }
}

/// An ordered relationship table scoped to one owning part.
#[derive(Debug, Default)]
pub struct RelationshipTable {
    /// Relationships in source document order
    rels: SmallVec<[Relationship; 8]>,
}

impl RelationshipTable {
    /// Parse a relationship table from `.rels` XML.
    ///
    /// # Arguments
    /// * `rels_xml` - The raw XML of the `.rels` part
    /// * `base_uri` - Base URI of the owning part, used to resolve relative
    ///   targets (e.g. "/ppt/slides" for a slide's relationships)
    pub fn from_xml(rels_xml: &[u8], base_uri: &str) -> Result<Self> {
        let mut rels = SmallVec::new();
        let mut reader = Reader::from_reader(rels_xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    if e.local_name().as_ref() == b"Relationship" {
                        let mut r_id = None;
                        let mut reltype = None;
                        let mut target_ref = None;
                        let mut mode = target_mode::INTERNAL.to_string();

                        for attr in e.attributes() {
                            let attr = attr?;
                            match attr.key.as_ref() {
                                b"Id" => r_id = Some(attr.unescape_value()?.to_string()),
                                b"Type" => reltype = Some(attr.unescape_value()?.to_string()),
                                b"Target" => target_ref = Some(attr.unescape_value()?.to_string()),
                                b"TargetMode" => mode = attr.unescape_value()?.to_string(),
                                _ => {},
                            }
                        }

                        if let (Some(r_id), Some(reltype), Some(target_ref)) =
                            (r_id, reltype, target_ref)
                        {
                            rels.push(Relationship {
                                r_id,
                                reltype,
                                target_ref,
                                base_uri: base_uri.to_string(),
                                is_external: mode == target_mode::EXTERNAL,
                            });
                        }
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(TemplateError::Xml(format!("rels parse error: {}", e)));
                },
                _ => {},
            }
            buf.clear();
        }

        Ok(Self { rels })
    }

    /// Get a relationship by its ID.
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.iter().find(|rel| rel.r_id == r_id)
    }

    /// Iterate over relationships in source document order.
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.iter()
    }

    /// Iterate over internal relationships of a given type, preserving
    /// source document order.
    pub fn iter_reltype<'a>(
        &'a self,
        reltype: &'a str,
    ) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.rels
            .iter()
            .filter(move |rel| rel.reltype == reltype && !rel.is_external)
    }

    /// Get the number of relationships in the table.
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::constants::relationship_type;

    const SLIDE_RELS: &[u8] = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image2.png"/>
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image1.png"/>
  <Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/>
</Relationships>"#;

    #[test]
    fn test_parse_preserves_table_order() {
        let table = RelationshipTable::from_xml(SLIDE_RELS, "/ppt/slides").unwrap();
        let ids: Vec<&str> = table.iter().map(|r| r.r_id()).collect();
        assert_eq!(ids, vec!["rId2", "rId1", "rId3", "rId4"]);
    }

    #[test]
    fn test_iter_reltype_in_source_order() {
        let table = RelationshipTable::from_xml(SLIDE_RELS, "/ppt/slides").unwrap();
        let images: Vec<&str> = table
            .iter_reltype(relationship_type::IMAGE)
            .map(|r| r.target_ref())
            .collect();
        // rId2 comes before rId3 in the table even though its target sorts later
        assert_eq!(images, vec!["../media/image2.png", "../media/image1.png"]);
    }

    #[test]
    fn test_target_partname_resolution() {
        let table = RelationshipTable::from_xml(SLIDE_RELS, "/ppt/slides").unwrap();
        let rel = table.get("rId2").unwrap();
        assert_eq!(
            rel.target_partname().unwrap().as_str(),
            "/ppt/media/image2.png"
        );
    }

    #[test]
    fn test_external_relationship_has_no_partname() {
        let table = RelationshipTable::from_xml(SLIDE_RELS, "/ppt/slides").unwrap();
        let rel = table.get("rId4").unwrap();
        assert!(rel.is_external());
        assert!(rel.target_partname().is_err());
    }
}
