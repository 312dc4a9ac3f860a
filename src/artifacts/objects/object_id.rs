//! Commit and object hashes
//!
//! Object IDs are 40-character lowercase hexadecimal SHA-1 hashes. Besides the
//! full form, the log engine works with *partial* hashes typed by users, so this
//! module also knows how to validate and match hash prefixes.
//!
//! ## Storage
//!
//! Loose objects live in `.git/objects/<first-2-chars>/<remaining-38-chars>`.

use crate::artifacts::objects::{MIN_PREFIX_LENGTH, OBJECT_ID_LENGTH};
use std::io;
use std::path::PathBuf;

/// SHA-1 object identifier, always stored in lowercase
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse and validate a full 40-character object ID
    ///
    /// Uppercase digits are accepted and normalized to lowercase.
    pub fn try_parse(id: String) -> anyhow::Result<Self> {
        if id.len() != OBJECT_ID_LENGTH {
            anyhow::bail!("Invalid object ID length: {}", id.len());
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            anyhow::bail!("Invalid object ID characters: {}", id);
        }
        Ok(Self(id.to_ascii_lowercase()))
    }

    /// Normalize a user-supplied hash prefix
    ///
    /// Returns the lowercase prefix, or `None` when it is too short, too long,
    /// or contains non-hex characters.
    pub fn normalize_prefix(prefix: &str) -> Option<String> {
        let prefix = prefix.trim();
        let valid = (MIN_PREFIX_LENGTH..=OBJECT_ID_LENGTH).contains(&prefix.len())
            && prefix.chars().all(|c| c.is_ascii_hexdigit());

        valid.then(|| prefix.to_ascii_lowercase())
    }

    /// Check whether this ID starts with an already normalized prefix
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    /// Write the object ID as 20 raw bytes (tree entry encoding)
    pub fn write_h40_to<W: io::Write>(&self, writer: &mut W) -> anyhow::Result<()> {
        let bytes = (0..OBJECT_ID_LENGTH)
            .step_by(2)
            .map(|i| u8::from_str_radix(&self.0[i..i + 2], 16))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "Invalid hex digit"))?;

        writer.write_all(&bytes)?;
        Ok(())
    }

    /// Read an object ID from 20 raw bytes (tree entry encoding)
    pub fn read_h40_from<R: io::Read + ?Sized>(reader: &mut R) -> anyhow::Result<Self> {
        let mut raw = [0u8; OBJECT_ID_LENGTH / 2];
        reader.read_exact(&mut raw)?;

        let hex40 = raw.iter().map(|byte| format!("{byte:02x}")).collect();
        Self::try_parse(hex40)
    }

    /// Relative path of the loose object file, e.g. `ab/c123...`
    pub fn to_path(&self) -> PathBuf {
        let (dir, file) = self.0.split_at(2);
        PathBuf::from(dir).join(file)
    }

    /// First 7 characters, the usual abbreviation
    pub fn to_short_oid(&self) -> String {
        self.0[..7].to_string()
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    const OID: &str = "abc123de0123456789abcdef0123456789abcdef";

    #[test]
    fn try_parse_normalizes_to_lowercase() {
        let oid = ObjectId::try_parse(OID.to_uppercase()).unwrap();
        assert_eq!(oid.as_ref(), OID);
    }

    #[rstest]
    #[case("abc")]
    #[case("abc123de0123456789abcdef0123456789abcdef00")]
    #[case("xyz123")]
    #[case("")]
    fn normalize_prefix_rejects_invalid_input(#[case] prefix: &str) {
        assert_eq!(ObjectId::normalize_prefix(prefix), None);
    }

    #[test]
    fn normalize_prefix_accepts_mixed_case() {
        assert_eq!(
            ObjectId::normalize_prefix(" ABC123de "),
            Some("abc123de".to_string())
        );
    }

    #[test]
    fn to_path_splits_fan_out_directory() {
        let oid = ObjectId::try_parse(OID.to_string()).unwrap();
        assert_eq!(
            oid.to_path(),
            PathBuf::from("ab").join("c123de0123456789abcdef0123456789abcdef")
        );
    }

    proptest! {
        #[test]
        fn raw_encoding_preserves_the_hash(hex in "[0-9a-f]{40}") {
            let oid = ObjectId::try_parse(hex.clone()).unwrap();
            let mut raw = Vec::new();
            oid.write_h40_to(&mut raw).unwrap();

            prop_assert_eq!(raw.len(), 20);
            let decoded = ObjectId::read_h40_from(&mut raw.as_slice()).unwrap();
            prop_assert_eq!(decoded.as_ref(), hex.as_str());
        }

        #[test]
        fn every_prefix_of_a_hash_matches_it(hex in "[0-9a-f]{40}", len in 4usize..=40) {
            let oid = ObjectId::try_parse(hex.clone()).unwrap();
            let prefix = ObjectId::normalize_prefix(&hex[..len]).unwrap();
            prop_assert!(oid.starts_with(&prefix));
        }
    }
}
