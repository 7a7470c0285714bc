//! Package filename decomposition.
//!
//! Uploaded files follow a loose `<package>_<version>.<extension>` convention.
//! Vendors are inconsistent, so parsing never fails on an odd name: fields
//! that cannot be recovered are reported as absent instead.

/// Suffixes that form a single two-segment extension.
///
/// The `img.*` entries carry no leading dot, so `diskimg.xz` also matches;
/// see [`PackageFilename::parse`] for how that case is handled.
pub const COMPOUND_SUFFIXES: [&str; 6] = [
    ".tar.gz", ".tar.bz2", ".tar.xz", "img.gz", "img.bz2", "img.xz",
];

/// Separator between the package name and the version in a base name.
pub const VERSION_SEPARATOR: char = '_';

/// Errors produced when a string cannot name a package file at all.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FilenameError {
    /// The final path component is empty (e.g. `""` or `"pkg/"`).
    #[error("Empty filename: '{0}'")]
    Empty(String),
}

/// A filename split into package name, version, and extension.
///
/// Derived on demand from the raw filename; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageFilename {
    /// Package name. Never empty.
    pub package: String,
    /// Version, present only when the base name holds exactly one separator.
    pub version: Option<String>,
    /// Extension without its leading dot (`tar.gz`, `img.xz`, `respkg`).
    pub extension: Option<String>,
}

impl PackageFilename {
    /// Split a filename into `(package, version, extension)`.
    ///
    /// Only the final path component is considered. A base name with zero or
    /// several `_` separators keeps the whole base name as the package and
    /// drops the version: `a_b_c.img.xz` yields `("a_b_c", None, "img.xz")`.
    ///
    /// # Errors
    ///
    /// Returns [`FilenameError::Empty`] if the final path component is empty.
    ///
    /// # Example
    ///
    /// ```
    /// use shelf_schema::PackageFilename;
    ///
    /// let parsed = PackageFilename::parse("foo_1.2.tar.gz").unwrap();
    /// assert_eq!(parsed.package, "foo");
    /// assert_eq!(parsed.version.as_deref(), Some("1.2"));
    /// assert_eq!(parsed.extension.as_deref(), Some("tar.gz"));
    /// ```
    pub fn parse(filename: &str) -> Result<Self, FilenameError> {
        let name = basename(filename);
        if name.is_empty() {
            return Err(FilenameError::Empty(filename.to_string()));
        }

        let (base, extension) = split_extension(name);
        let (package, version) = split_version(base);

        // `_1.0.tar.gz` or `.respkg` leave nothing to call the package.
        let package = if package.is_empty() { name } else { package };

        Ok(Self {
            package: package.to_string(),
            version: version.map(str::to_string),
            extension: extension.map(str::to_string),
        })
    }
}

fn basename(filename: &str) -> &str {
    filename.rsplit(['/', '\\']).next().unwrap_or(filename)
}

fn split_extension(name: &str) -> (&str, Option<&str>) {
    if COMPOUND_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
        let mut parts = name.rsplitn(3, '.');
        if let (Some(_), Some(_), Some(base)) = (parts.next(), parts.next(), parts.next()) {
            // The two trailing segments, dot included, as one slice.
            return (base, Some(&name[base.len() + 1..]));
        }
    }

    match name.rsplit_once('.') {
        Some((base, ext)) if !ext.is_empty() => (base, Some(ext)),
        Some((base, _)) => (base, None),
        None => (name, None),
    }
}

fn split_version(base: &str) -> (&str, Option<&str>) {
    let mut parts = base.split(VERSION_SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(package), Some(version), None) if !package.is_empty() => {
            (package, Some(version).filter(|v| !v.is_empty()))
        }
        _ => (base, None),
    }
}
