/// Open Packaging Conventions (OPC) layer.
///
/// Physical access to a slide-deck archive: part naming, the in-memory
/// package, relationship tables, and byte-preserving repackaging.
pub mod archive;
pub mod constants;
pub mod packuri;
pub mod rel;
pub mod writer;

// Re-export commonly used types
pub use archive::{Package, PackagePart};
pub use packuri::PackURI;
pub use rel::{Relationship, RelationshipTable};
pub use writer::PackageWriter;
