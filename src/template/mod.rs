//! Template generation: scanning, substitution, and media replacement.
//!
//! [`TemplateEngine`] is the high-level entry point: it opens a template
//! archive, classifies its parts, applies a replacement record to every
//! slide, optionally swaps the deck's primary image, and repackages the
//! result. Each generation run works on a fresh in-memory copy of the
//! template, so one engine can serve any number of runs.

pub mod catalog;
pub mod engine;
pub mod media;
pub mod scanner;
pub mod tokens;

pub use catalog::{Catalog, ContentTypeMap, PartRole};
pub use engine::{ReplacementRecord, SlideReport, SubstitutionReport};
pub use media::MediaBinding;
pub use scanner::{RunSpan, SlideScan, TokenMatch};
pub use tokens::{PlaceholderToken, STANDARD_FIELDS, TokenSet};

use crate::error::{Result, TemplateError};
use crate::opc::archive::Package;
use crate::opc::writer::PackageWriter;
use std::collections::BTreeMap;
use std::path::Path;

/// Output of one generation run.
#[derive(Debug)]
pub struct GenerationResult {
    /// The finished archive bytes
    pub bytes: Vec<u8>,

    /// Per-slide substitution outcome
    pub report: SubstitutionReport,

    /// The image edge that was replaced; `None` when no image was supplied,
    /// or when one was supplied but no slide references an image part
    pub media: Option<MediaBinding>,
}

/// Outcome of one record in a batch run.
#[derive(Debug)]
pub enum RunOutcome {
    /// The record produced a finished archive
    Completed(GenerationResult),

    /// The record's run failed; other records are unaffected
    Failed(TemplateError),
}

/// What a template's slides contain in the way of placeholders.
#[derive(Debug, Default)]
pub struct PlaceholderSurvey {
    /// Recognized token names with their occurrence counts across all slides
    pub tokens: BTreeMap<String, usize>,

    /// Distinct delimiter-pair bodies matching no recognized token, in
    /// order of first appearance
    pub unknown: Vec<String>,
}

/// High-level template generation engine.
///
/// Holds the token configuration; template archives and replacement records
/// are supplied per call.
#[derive(Debug, Clone, Default)]
pub struct TemplateEngine {
    tokens: TokenSet,
}

impl TemplateEngine {
    /// Engine with the standard `{{FIELD}}` token set.
    pub fn standard() -> Self {
        Self {
            tokens: TokenSet::standard(),
        }
    }

    /// Engine with an explicit token set.
    pub fn new(tokens: TokenSet) -> Self {
        Self { tokens }
    }

    /// The token set this engine recognizes.
    pub fn tokens(&self) -> &TokenSet {
        &self.tokens
    }

    /// Generate a document from a template file.
    pub fn generate<P: AsRef<Path>>(
        &self,
        template: P,
        record: &ReplacementRecord,
        image: Option<&[u8]>,
    ) -> Result<GenerationResult> {
        let package = Package::open(template)?;
        self.run(package, record, image)
    }

    /// Generate a document from template archive bytes.
    pub fn generate_from_bytes(
        &self,
        template: &[u8],
        record: &ReplacementRecord,
        image: Option<&[u8]>,
    ) -> Result<GenerationResult> {
        let package = Package::from_bytes(template.to_vec())?;
        self.run(package, record, image)
    }

    /// Generate a document from a template file and write it to `out`.
    pub fn generate_to_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        template: P,
        out: Q,
        record: &ReplacementRecord,
        image: Option<&[u8]>,
    ) -> Result<GenerationResult> {
        let result = self.generate(template, record, image)?;
        std::fs::write(out, &result.bytes)?;
        Ok(result)
    }

    /// Generate one document per record from the same template bytes.
    ///
    /// Records are processed independently: a failing record yields a
    /// [`RunOutcome::Failed`] in its slot and the batch continues. Outcomes
    /// are returned in record order.
    pub fn generate_batch(
        &self,
        template: &[u8],
        records: &[ReplacementRecord],
        image: Option<&[u8]>,
    ) -> Vec<RunOutcome> {
        records
            .iter()
            .map(|record| {
                match self.generate_from_bytes(template, record, image) {
                    Ok(result) => RunOutcome::Completed(result),
                    Err(err) => RunOutcome::Failed(err),
                }
            })
            .collect()
    }

    /// Inventory the placeholders a template's slides contain, without
    /// generating anything.
    pub fn scan_placeholders(&self, template: &[u8]) -> Result<PlaceholderSurvey> {
        let package = Package::from_bytes(template.to_vec())?;
        let cat = Catalog::classify(package)?;

        let mut survey = PlaceholderSurvey::default();
        for slide in cat.slides() {
            let scan = scanner::scan(cat.package().part_blob(slide)?, &self.tokens)?;
            for m in scan.matches() {
                *survey.tokens.entry(m.name.clone()).or_insert(0) += 1;
            }
            for body in scan.unknown() {
                if !survey.unknown.contains(body) {
                    survey.unknown.push(body.clone());
                }
            }
        }
        Ok(survey)
    }

    fn run(
        &self,
        package: Package,
        record: &ReplacementRecord,
        image: Option<&[u8]>,
    ) -> Result<GenerationResult> {
        let mut cat = Catalog::classify(package)?;
        let report = engine::apply(&mut cat, record, &self.tokens)?;

        let media = match image {
            Some(bytes) => match media::replace_image(&mut cat, bytes) {
                Ok(binding) => Some(binding),
                // Text-only output is still a valid document
                Err(TemplateError::NoMediaCandidate) => None,
                Err(e) => return Err(e),
            },
            None => None,
        };

        let package = cat.into_package();
        let bytes = PackageWriter::to_bytes(&package)?;

        Ok(GenerationResult {
            bytes,
            report,
            media,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read, Write};
    use zip::CompressionMethod;
    use zip::write::SimpleFileOptions;
    use zip::{ZipArchive, ZipWriter};

    const CONTENT_TYPES: &[u8] = br#"<?xml version="1.0"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Default Extension="png" ContentType="image/png"/>
  <Override PartName="/ppt/slides/slide1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>
</Types>"#;

    const SLIDE1: &[u8] = br#"<?xml version="1.0"?><p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:sp><p:txBody><a:bodyPr/><a:p><a:r><a:rPr lang="en-US" b="1"/><a:t>Hello {{NAME</a:t></a:r><a:r><a:rPr lang="en-US"/><a:t>}}, {{ROLE}} at {{COMPANY}}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#;

    const SLIDE1_RELS: &[u8] = br#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image1.png"/></Relationships>"#;

    const PNG_STUB: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn build_template(with_image_rel: bool) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let deflated =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        zip.start_file("[Content_Types].xml", deflated).unwrap();
        zip.write_all(CONTENT_TYPES).unwrap();
        zip.start_file("_rels/.rels", deflated).unwrap();
        zip.write_all(br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#).unwrap();
        zip.start_file("ppt/slides/slide1.xml", deflated).unwrap();
        zip.write_all(SLIDE1).unwrap();
        zip.start_file("ppt/slides/_rels/slide1.xml.rels", deflated)
            .unwrap();
        if with_image_rel {
            zip.write_all(SLIDE1_RELS).unwrap();
        } else {
            zip.write_all(br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"/>"#).unwrap();
        }
        zip.start_file("ppt/media/image1.png", stored).unwrap();
        zip.write_all(PNG_STUB).unwrap();
        zip.start_file("ppt/theme/theme1.xml", deflated).unwrap();
        zip.write_all(br#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"/>"#).unwrap();
        zip.finish().unwrap().into_inner()
    }

    fn entry(bytes: &[u8], name: &str) -> Vec<u8> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut out = Vec::new();
        file.read_to_end(&mut out).unwrap();
        out
    }

    fn record() -> ReplacementRecord {
        ReplacementRecord::new()
            .set("NAME", "Ana Souza")
            .set("ROLE", "Engineer")
            .set("COMPANY", "Acme")
    }

    #[test]
    fn test_generate_substitutes_and_replaces_media() {
        let template = build_template(true);
        let engine = TemplateEngine::standard();

        let result = engine
            .generate_from_bytes(&template, &record(), Some(b"new image bytes"))
            .unwrap();

        assert!(result.report.is_clean());
        assert_eq!(result.report.total_resolved(), 3);
        let binding = result.media.as_ref().unwrap();
        assert_eq!(binding.media_part().as_str(), "/ppt/media/image1.png");

        // The output is itself a readable template archive
        let slide = entry(&result.bytes, "ppt/slides/slide1.xml");
        let scan = scanner::scan(&slide, engine.tokens()).unwrap();
        assert_eq!(scan.rendered_text(), "Hello Ana Souza, Engineer at Acme");

        assert_eq!(entry(&result.bytes, "ppt/media/image1.png"), b"new image bytes");
        // Untouched parts survive byte-for-byte
        assert_eq!(
            entry(&result.bytes, "ppt/theme/theme1.xml"),
            entry(&template, "ppt/theme/theme1.xml")
        );
        assert_eq!(
            entry(&result.bytes, "[Content_Types].xml"),
            entry(&template, "[Content_Types].xml")
        );
    }

    #[test]
    fn test_image_without_candidate_is_recoverable() {
        let template = build_template(false);
        let engine = TemplateEngine::standard();

        let result = engine
            .generate_from_bytes(&template, &record(), Some(b"unused"))
            .unwrap();

        assert!(result.media.is_none());
        // Text substitution still happened
        assert_eq!(result.report.total_resolved(), 3);
        assert_eq!(entry(&result.bytes, "ppt/media/image1.png"), PNG_STUB);
    }

    #[test]
    fn test_generate_batch_isolates_failures() {
        let template = build_template(true);
        let engine = TemplateEngine::standard();

        let records = vec![
            record(),
            ReplacementRecord::new().set("NAME", "Bruno Lima"),
        ];
        let outcomes = engine.generate_batch(&template, &records, None);

        assert_eq!(outcomes.len(), 2);
        let RunOutcome::Completed(first) = &outcomes[0] else {
            panic!("first record should complete");
        };
        assert!(first.report.is_clean());

        // A sparse record completes too; missing fields just go unresolved
        let RunOutcome::Completed(second) = &outcomes[1] else {
            panic!("second record should complete");
        };
        assert_eq!(second.report.total_resolved(), 1);
        assert_eq!(second.report.total_unresolved(), 2);
    }

    #[test]
    fn test_batch_runs_are_independent() {
        let template = build_template(true);
        let engine = TemplateEngine::standard();

        let records = vec![
            ReplacementRecord::new()
                .set("NAME", "Ana")
                .set("ROLE", "Engineer")
                .set("COMPANY", "Acme"),
            ReplacementRecord::new()
                .set("NAME", "Bruno")
                .set("ROLE", "Designer")
                .set("COMPANY", "Initech"),
        ];
        let outcomes = engine.generate_batch(&template, &records, None);

        let texts: Vec<String> = outcomes
            .iter()
            .map(|o| {
                let RunOutcome::Completed(r) = o else {
                    panic!("both records should complete");
                };
                let slide = entry(&r.bytes, "ppt/slides/slide1.xml");
                scanner::scan(&slide, engine.tokens())
                    .unwrap()
                    .rendered_text()
                    .to_string()
            })
            .collect();

        assert_eq!(texts[0], "Hello Ana, Engineer at Acme");
        assert_eq!(texts[1], "Hello Bruno, Designer at Initech");
    }

    #[test]
    fn test_scan_placeholders_inventories_template() {
        let template = build_template(true);
        let engine = TemplateEngine::standard();

        let survey = engine.scan_placeholders(&template).unwrap();
        assert_eq!(survey.tokens.get("NAME").copied(), Some(1));
        assert_eq!(survey.tokens.get("ROLE").copied(), Some(1));
        assert_eq!(survey.tokens.get("COMPANY").copied(), Some(1));
        assert!(survey.unknown.is_empty());
    }

    #[test]
    fn test_empty_record_round_trips_every_part() {
        let template = build_template(true);
        let engine = TemplateEngine::standard();

        let result = engine
            .generate_from_bytes(&template, &ReplacementRecord::new(), None)
            .unwrap();

        let mut before = ZipArchive::new(Cursor::new(template.as_slice())).unwrap();
        let mut after = ZipArchive::new(Cursor::new(result.bytes.as_slice())).unwrap();
        assert_eq!(before.len(), after.len());
        for i in 0..before.len() {
            let (name, blob_a) = {
                let mut f = before.by_index(i).unwrap();
                let mut blob = Vec::new();
                f.read_to_end(&mut blob).unwrap();
                (f.name().to_string(), blob)
            };
            let mut f = after.by_index(i).unwrap();
            assert_eq!(f.name(), name);
            let mut blob_b = Vec::new();
            f.read_to_end(&mut blob_b).unwrap();
            assert_eq!(blob_a, blob_b, "entry {name} must survive byte-for-byte");
        }
    }

    #[test]
    fn test_corrupt_template_is_fatal() {
        let engine = TemplateEngine::standard();
        let err = engine
            .generate_from_bytes(b"not a zip", &record(), None)
            .unwrap_err();
        assert!(matches!(err, TemplateError::ArchiveCorrupt(_)));
    }

    #[test]
    fn test_generate_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("template.pptx");
        let out_path = dir.path().join("out.pptx");
        std::fs::write(&template_path, build_template(true)).unwrap();

        let engine = TemplateEngine::standard();
        let result = engine
            .generate_to_file(&template_path, &out_path, &record(), None)
            .unwrap();

        let written = std::fs::read(&out_path).unwrap();
        assert_eq!(written, result.bytes);
    }
}
