//! Media resolver: relationship-driven image replacement.
//!
//! The part to replace is found by walking each slide's relationship table
//! for image-typed entries, never by matching media filenames. Part names
//! like `image1.png` are arbitrary labels; only the relationship graph says
//! which asset a slide actually displays.

use crate::error::{Result, TemplateError};
use crate::opc::constants::relationship_type;
use crate::opc::packuri::PackURI;
use crate::template::catalog::Catalog;

/// The slide→media edge a replacement was applied through.
#[derive(Debug, Clone)]
pub struct MediaBinding {
    /// The slide whose relationship table references the replaced asset
    slide: PackURI,

    /// The relationship ID of the image edge
    r_id: String,

    /// The media part whose bytes were replaced
    media_part: PackURI,
}

impl MediaBinding {
    /// The slide whose relationship table references the replaced asset.
    pub fn slide(&self) -> &PackURI {
        &self.slide
    }

    /// The relationship ID of the image edge.
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    /// The media part whose bytes were replaced.
    pub fn media_part(&self) -> &PackURI {
        &self.media_part
    }
}

/// Replace the primary image of the deck with new bytes.
///
/// Candidate selection walks slides in presentation order and, within each
/// slide's relationship table, image relationships in source order; the
/// first edge whose target exists in the package wins. The replaced part
/// keeps its partname and declared content type, so the new bytes must be
/// the same image format the template shipped with.
///
/// Fails with `NoMediaCandidate` when no slide references an image; the
/// package is left untouched in that case.
pub fn replace_image(catalog: &mut Catalog, image: &[u8]) -> Result<MediaBinding> {
    let binding = find_primary_image(catalog)?;
    catalog
        .package_mut()
        .set_part_blob(&binding.media_part, image.to_vec())?;
    Ok(binding)
}

/// Locate the primary image edge without mutating anything.
pub fn find_primary_image(catalog: &Catalog) -> Result<MediaBinding> {
    for slide in catalog.slides() {
        let Some(table) = catalog.rels_for(slide) else {
            continue;
        };
        for rel in table.iter_reltype(relationship_type::IMAGE) {
            let Ok(target) = rel.target_partname() else {
                continue;
            };
            // A dangling relationship target is skipped, not fatal
            if catalog.package().part(&target).is_some() {
                return Ok(MediaBinding {
                    slide: slide.clone(),
                    r_id: rel.r_id().to_string(),
                    media_part: target,
                });
            }
        }
    }

    Err(TemplateError::NoMediaCandidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::archive::Package;
    use std::io::{Cursor, Write};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    const CONTENT_TYPES: &[u8] = br#"<?xml version="1.0"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="png" ContentType="image/png"/>
  <Override PartName="/ppt/slides/slide1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>
  <Override PartName="/ppt/slides/slide2.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>
</Types>"#;

    fn build_catalog(entries: &[(&str, &[u8])]) -> Catalog {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(CONTENT_TYPES).unwrap();
        zip.start_file("_rels/.rels", options).unwrap();
        zip.write_all(br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"/>"#).unwrap();
        for (name, bytes) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(bytes).unwrap();
        }
        let bytes = zip.finish().unwrap().into_inner();
        Catalog::classify(Package::from_bytes(bytes).unwrap()).unwrap()
    }

    #[test]
    fn test_replaces_relationship_target_not_name_lookalike() {
        // "image99.png" sorts after "photo.png" by name, but the slide's
        // relationship points at photo.png; the name must not matter
        let mut catalog = build_catalog(&[
            ("ppt/slides/slide1.xml", br#"<p:sld/>"#),
            (
                "ppt/slides/_rels/slide1.xml.rels",
                br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/photo.png"/></Relationships>"#,
            ),
            ("ppt/media/image99.png", b"decoy"),
            ("ppt/media/photo.png", b"original"),
        ]);

        let binding = replace_image(&mut catalog, b"fresh").unwrap();
        assert_eq!(binding.media_part().as_str(), "/ppt/media/photo.png");
        assert_eq!(binding.slide().as_str(), "/ppt/slides/slide1.xml");
        assert_eq!(binding.r_id(), "rId7");

        let replaced = PackURI::new("/ppt/media/photo.png").unwrap();
        assert_eq!(catalog.package().part_blob(&replaced).unwrap(), b"fresh");
        let decoy = PackURI::new("/ppt/media/image99.png").unwrap();
        assert_eq!(catalog.package().part_blob(&decoy).unwrap(), b"decoy");
    }

    #[test]
    fn test_first_slide_in_presentation_order_wins() {
        // slide2 enumerates first in the archive but slide1 comes first in
        // presentation order
        let mut catalog = build_catalog(&[
            ("ppt/slides/slide2.xml", br#"<p:sld/>"#),
            (
                "ppt/slides/_rels/slide2.xml.rels",
                br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/second.png"/></Relationships>"#,
            ),
            ("ppt/slides/slide1.xml", br#"<p:sld/>"#),
            (
                "ppt/slides/_rels/slide1.xml.rels",
                br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/first.png"/></Relationships>"#,
            ),
            ("ppt/media/first.png", b"one"),
            ("ppt/media/second.png", b"two"),
        ]);

        let binding = replace_image(&mut catalog, b"new").unwrap();
        assert_eq!(binding.slide().as_str(), "/ppt/slides/slide1.xml");
        assert_eq!(binding.media_part().as_str(), "/ppt/media/first.png");
    }

    #[test]
    fn test_dangling_target_skipped() {
        let mut catalog = build_catalog(&[
            ("ppt/slides/slide1.xml", br#"<p:sld/>"#),
            (
                "ppt/slides/_rels/slide1.xml.rels",
                br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/gone.png"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/here.png"/></Relationships>"#,
            ),
            ("ppt/media/here.png", b"present"),
        ]);

        let binding = replace_image(&mut catalog, b"new").unwrap();
        assert_eq!(binding.r_id(), "rId2");
        assert_eq!(binding.media_part().as_str(), "/ppt/media/here.png");
    }

    #[test]
    fn test_no_candidate_leaves_package_untouched() {
        let mut catalog = build_catalog(&[
            ("ppt/slides/slide1.xml", br#"<p:sld/>"#),
            (
                "ppt/slides/_rels/slide1.xml.rels",
                br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/></Relationships>"#,
            ),
            ("ppt/media/orphan.png", b"never referenced"),
        ]);

        let err = replace_image(&mut catalog, b"new").unwrap_err();
        assert!(matches!(err, TemplateError::NoMediaCandidate));
        assert!(!catalog.package().is_dirty());

        // Orphaned media stays exactly as shipped
        let orphan = PackURI::new("/ppt/media/orphan.png").unwrap();
        assert_eq!(
            catalog.package().part_blob(&orphan).unwrap(),
            b"never referenced"
        );
    }
}
