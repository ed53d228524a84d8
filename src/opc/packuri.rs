/// Provides the PackURI value type for part names within an OPC package.
///
/// A PackURI is a partname following the URI format defined by the Open
/// Packaging Conventions: it always begins with a forward slash and uses
/// forward slashes as path separators.
use crate::error::{Result, TemplateError};

/// The package pseudo-partname, representing the package itself
pub const PACKAGE_URI: &str = "/";

/// The URI for the [Content_Types].xml part
pub const CONTENT_TYPES_URI: &str = "/[Content_Types].xml";

/// A partname within an OPC package.
///
/// Provides access to the components the catalog and media resolver need:
/// the base URI (directory), filename, extension, numeric index (for slide
/// ordering), and the derived `.rels` partner URIs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackURI {
    /// The full pack URI string (e.g., "/ppt/slides/slide1.xml")
    uri: String,
}

impl PackURI {
    /// Create a new PackURI from a string.
    ///
    /// The URI must begin with a forward slash.
    pub fn new<S: Into<String>>(uri: S) -> Result<Self> {
        let uri = uri.into();
        if !uri.starts_with('/') {
            return Err(TemplateError::InvalidPartName(format!(
                "partname must begin with slash, got '{}'",
                uri
            )));
        }
        Ok(PackURI { uri })
    }

    /// Create a PackURI from a relative reference and a base URI.
    ///
    /// Translates a relative reference (like "../media/image1.png") onto a
    /// base URI (like "/ppt/slides") to produce an absolute PackURI
    /// (like "/ppt/media/image1.png").
    pub fn from_rel_ref(base_uri: &str, relative_ref: &str) -> Result<Self> {
        let joined = Self::join_paths(base_uri, relative_ref);
        let normalized = Self::normalize_path(&joined);
        Self::new(normalized)
    }

    /// Get the base URI (directory portion) of this PackURI.
    ///
    /// For example, "/ppt/slides" for "/ppt/slides/slide1.xml".
    pub fn base_uri(&self) -> &str {
        if self.uri == "/" {
            return "/";
        }

        match self.uri.rfind('/') {
            Some(0) => "/",
            Some(pos) => &self.uri[..pos],
            None => "/",
        }
    }

    /// Get the filename portion of this PackURI.
    ///
    /// For example, "slide1.xml" for "/ppt/slides/slide1.xml".
    pub fn filename(&self) -> &str {
        match self.uri.rfind('/') {
            Some(pos) => &self.uri[pos + 1..],
            None => "",
        }
    }

    /// Get the extension portion of this PackURI, without the leading period.
    pub fn ext(&self) -> &str {
        let filename = self.filename();
        match filename.rfind('.') {
            Some(pos) => &filename[pos + 1..],
            None => "",
        }
    }

    /// Get the partname index for tuple partnames, or None for singletons.
    ///
    /// Returns 21 for "/ppt/slides/slide21.xml" and None for
    /// "/ppt/presentation.xml". Slide ordering is derived from this index,
    /// never from archive enumeration order.
    pub fn idx(&self) -> Option<u32> {
        let filename = self.filename();
        let name_part = match filename.rfind('.') {
            Some(pos) => &filename[..pos],
            None => filename,
        };

        // Numeric suffix only: "slide21" -> 21, "image" -> None
        let digits_start = name_part
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(i, _)| i)?;
        if digits_start == 0 {
            return None;
        }
        name_part[digits_start..].parse::<u32>().ok()
    }

    /// Get the membername (URI with the leading slash stripped).
    ///
    /// This is the form used as the ZIP membername for the package item.
    pub fn membername(&self) -> &str {
        if self.uri == "/" { "" } else { &self.uri[1..] }
    }

    /// Get the PackURI of the .rels part corresponding to this PackURI.
    ///
    /// For example, "/ppt/slides/_rels/slide1.xml.rels" for
    /// "/ppt/slides/slide1.xml", and "/_rels/.rels" for the package itself.
    pub fn rels_uri(&self) -> Result<PackURI> {
        let base_uri = self.base_uri();
        let rels_filename = format!("{}.rels", self.filename());
        let rels_uri_str = if base_uri == "/" {
            format!("/_rels/{}", rels_filename)
        } else {
            format!("{}/_rels/{}", base_uri, rels_filename)
        };
        Self::new(rels_uri_str)
    }

    /// Derive the owning part's URI when this PackURI names a `.rels` part.
    ///
    /// Relationship parts live in a `_rels` sibling directory and are named
    /// after their owner, so "/ppt/slides/_rels/slide1.xml.rels" owns
    /// "/ppt/slides/slide1.xml" and "/_rels/.rels" owns the package "/".
    /// Returns None when this URI does not follow the relationship-storage
    /// convention.
    pub fn rels_owner(&self) -> Option<PackURI> {
        let base = self.base_uri();
        let dir = base.strip_suffix("_rels")?;
        // "_rels" must be a whole path segment, not a directory-name suffix
        if !dir.ends_with('/') {
            return None;
        }
        let owner_name = self.filename().strip_suffix(".rels")?;

        if owner_name.is_empty() {
            // "/_rels/.rels" owns the package itself
            return (dir == "/").then(|| PackURI {
                uri: PACKAGE_URI.to_string(),
            });
        }
        // dir keeps its trailing slash after stripping "_rels"
        PackURI::new(format!("{}{}", dir, owner_name)).ok()
    }

    /// Get the full URI string.
    pub fn as_str(&self) -> &str {
        &self.uri
    }

    fn join_paths(base: &str, rel: &str) -> String {
        if base.ends_with('/') {
            format!("{}{}", base, rel)
        } else {
            format!("{}/{}", base, rel)
        }
    }

    /// Normalize a path, resolving ".." and "." segments.
    fn normalize_path(path: &str) -> String {
        let mut parts: Vec<&str> = Vec::new();

        for part in path.split('/') {
            match part {
                "" | "." => {
                    if parts.is_empty() {
                        // Keep leading slash
                        parts.push("");
                    }
                },
                ".." => {
                    if parts.len() > 1 {
                        parts.pop();
                    }
                },
                _ => parts.push(part),
            }
        }

        if parts.is_empty() || (parts.len() == 1 && parts[0].is_empty()) {
            return "/".to_string();
        }
        parts.join("/")
    }
}

impl std::fmt::Display for PackURI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uri)
    }
}

impl AsRef<str> for PackURI {
    fn as_ref(&self) -> &str {
        &self.uri
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packuri_new() {
        assert!(PackURI::new("/ppt/slides/slide1.xml").is_ok());
        assert!(PackURI::new("ppt/slides/slide1.xml").is_err());
    }

    #[test]
    fn test_base_uri() {
        let uri = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        assert_eq!(uri.base_uri(), "/ppt/slides");

        let root = PackURI::new("/").unwrap();
        assert_eq!(root.base_uri(), "/");
    }

    #[test]
    fn test_filename_and_ext() {
        let uri = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        assert_eq!(uri.filename(), "slide1.xml");
        assert_eq!(uri.ext(), "xml");

        let root = PackURI::new("/").unwrap();
        assert_eq!(root.filename(), "");
    }

    #[test]
    fn test_idx() {
        let uri = PackURI::new("/ppt/slides/slide21.xml").unwrap();
        assert_eq!(uri.idx(), Some(21));

        let uri = PackURI::new("/ppt/presentation.xml").unwrap();
        assert_eq!(uri.idx(), None);

        let uri = PackURI::new("/ppt/media/image3.png").unwrap();
        assert_eq!(uri.idx(), Some(3));
    }

    #[test]
    fn test_membername() {
        let uri = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        assert_eq!(uri.membername(), "ppt/slides/slide1.xml");

        let root = PackURI::new("/").unwrap();
        assert_eq!(root.membername(), "");
    }

    #[test]
    fn test_rels_uri() {
        let uri = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        assert_eq!(
            uri.rels_uri().unwrap().as_str(),
            "/ppt/slides/_rels/slide1.xml.rels"
        );

        let root = PackURI::new("/").unwrap();
        assert_eq!(root.rels_uri().unwrap().as_str(), "/_rels/.rels");
    }

    #[test]
    fn test_rels_owner() {
        let rels = PackURI::new("/ppt/slides/_rels/slide1.xml.rels").unwrap();
        assert_eq!(
            rels.rels_owner().unwrap().as_str(),
            "/ppt/slides/slide1.xml"
        );

        let pkg_rels = PackURI::new("/_rels/.rels").unwrap();
        assert_eq!(pkg_rels.rels_owner().unwrap().as_str(), "/");

        let not_rels = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        assert!(not_rels.rels_owner().is_none());
    }

    #[test]
    fn test_from_rel_ref() {
        let uri = PackURI::from_rel_ref("/ppt/slides", "../media/image1.png").unwrap();
        assert_eq!(uri.as_str(), "/ppt/media/image1.png");

        let uri = PackURI::from_rel_ref("/", "ppt/presentation.xml").unwrap();
        assert_eq!(uri.as_str(), "/ppt/presentation.xml");
    }
}
