//! Repackager: serializes a mutated [`Package`] back into a valid archive.
//!
//! Every part is written in the original archive's entry order. Untouched
//! entries are raw-copied from the retained source bytes, skipping the
//! decompress/recompress pass entirely, so their stored bytes survive
//! byte-for-byte. Mutated entries are rewritten with the compression method
//! their entry used in the source archive.

use crate::error::Result;
use crate::opc::archive::Package;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Package writer that serializes a package to a ZIP archive.
pub struct PackageWriter;

impl PackageWriter {
    /// Write a package to a file.
    ///
    /// # Arguments
    /// * `path` - Path where the archive should be written
    /// * `package` - The package to write
    pub fn write<P: AsRef<Path>>(path: P, package: &Package) -> Result<()> {
        let bytes = Self::to_bytes(package)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Write a package to a stream.
    pub fn write_to_stream<W: Write>(mut writer: W, package: &Package) -> Result<()> {
        let bytes = Self::to_bytes(package)?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// Serialize a package to archive bytes.
    ///
    /// Walks the source archive entry by entry so nothing is invented,
    /// reordered, or dropped.
    pub fn to_bytes(package: &Package) -> Result<Vec<u8>> {
        let mut archive = ZipArchive::new(Cursor::new(package.source_bytes()))?;
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        for i in 0..archive.len() {
            let file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }

            let partname = format!("/{}", file.name());
            let mutated = package
                .iter_parts()
                .find(|p| p.partname().as_str() == partname && p.is_dirty());

            match mutated {
                Some(part) => {
                    let method = Self::writable_method(file.compression());
                    drop(file);
                    let options = SimpleFileOptions::default().compression_method(method);
                    zip.start_file(part.partname().membername(), options)?;
                    zip.write_all(part.blob())?;
                },
                None => {
                    // Raw copy preserves the stored bytes exactly and avoids
                    // a decompression/recompression pass.
                    zip.raw_copy_file(file)?;
                },
            }
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }

    /// Map a source compression method onto one this writer can produce.
    ///
    /// Only stored and deflated entries can be re-emitted as-is; anything
    /// exotic falls back to deflate, which every OOXML consumer accepts.
    fn writable_method(method: CompressionMethod) -> CompressionMethod {
        match method {
            CompressionMethod::Stored | CompressionMethod::Deflated => method,
            _ => CompressionMethod::Deflated,
        }
    }
}
