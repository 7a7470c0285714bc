//! Semantic package categories.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Wire value of the generic placeholder hint sent by the upload agent.
pub const GENERIC_HINT: &str = "rsc";

/// Ordered suffix table consulted when the hint is generic.
///
/// The first category whose suffix matches the filename tail wins.
const SUFFIX_TABLE: [(PackageType, &[&str]); 3] = [
    (PackageType::Tar, &[".tar.gz", ".tar.bz2", ".tar.xz"]),
    (PackageType::Image, &["img.gz", "img.bz2", "img.xz"]),
    (PackageType::Respkg, &["respkg"]),
];

/// The resolved type of a registered package file.
///
/// Serialized as its wire string (`rsc`, `tar`, `image`, `respkg`, or the
/// explicit hint verbatim).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum PackageType {
    /// Generic placeholder; carries no information about the file.
    #[default]
    Resource,
    /// Compressed tar archive.
    Tar,
    /// Compressed disk image.
    Image,
    /// Resource package.
    Respkg,
    /// Any explicit hint outside the closed set, kept verbatim.
    Other(String),
}

impl PackageType {
    /// Resolve the type of `filename` given the uploader's hint.
    ///
    /// Explicit hints always win. A generic hint is refined from the filename
    /// suffix, and stays generic when no rule matches.
    ///
    /// # Example
    ///
    /// ```
    /// use shelf_schema::PackageType;
    ///
    /// assert_eq!(PackageType::classify(&PackageType::Resource, "foo.respkg"), PackageType::Respkg);
    /// assert_eq!(PackageType::classify(&PackageType::Resource, "notes.txt"), PackageType::Resource);
    /// ```
    pub fn classify(hint: &PackageType, filename: &str) -> PackageType {
        if *hint != PackageType::Resource {
            return hint.clone();
        }

        SUFFIX_TABLE
            .iter()
            .find(|(_, suffixes)| suffixes.iter().any(|s| filename.ends_with(s)))
            .map_or_else(|| hint.clone(), |(kind, _)| kind.clone())
    }

    /// Wire string for this type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Resource => GENERIC_HINT,
            Self::Tar => "tar",
            Self::Image => "image",
            Self::Respkg => "respkg",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for PackageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for PackageType {
    fn from(s: &str) -> Self {
        match s {
            GENERIC_HINT => Self::Resource,
            "tar" => Self::Tar,
            "image" => Self::Image,
            "respkg" => Self::Respkg,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for PackageType {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl Serialize for PackageType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PackageType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_hint_wins() {
        let hint = PackageType::from("deb");
        assert_eq!(PackageType::classify(&hint, "foo_1.0.tar.gz"), hint);
        assert_eq!(
            PackageType::classify(&PackageType::Image, "foo.respkg"),
            PackageType::Image
        );
    }

    #[test]
    fn test_generic_hint_refined_by_suffix() {
        let generic = PackageType::Resource;
        assert_eq!(
            PackageType::classify(&generic, "foo_1.2.tar.gz"),
            PackageType::Tar
        );
        assert_eq!(
            PackageType::classify(&generic, "foo_1.2.tar.xz"),
            PackageType::Tar
        );
        assert_eq!(
            PackageType::classify(&generic, "a_b_c.img.xz"),
            PackageType::Image
        );
        assert_eq!(
            PackageType::classify(&generic, "foo.respkg"),
            PackageType::Respkg
        );
    }

    #[test]
    fn test_unmatched_stays_generic() {
        let generic = PackageType::Resource;
        assert_eq!(PackageType::classify(&generic, "foo.zip"), generic);
        assert_eq!(PackageType::classify(&generic, "foo.tar"), generic);
        assert_eq!(PackageType::classify(&generic, "README"), generic);
    }

    #[test]
    fn test_wire_strings() {
        for s in ["rsc", "tar", "image", "respkg", "python"] {
            assert_eq!(PackageType::from(s).as_str(), s);
        }
        assert_eq!(
            serde_json::to_string(&PackageType::Tar).unwrap(),
            "\"tar\""
        );
        let parsed: PackageType = serde_json::from_str("\"docker\"").unwrap();
        assert_eq!(parsed, PackageType::Other("docker".to_string()));
    }
}
