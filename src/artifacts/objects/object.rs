use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Result;
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::io::BufRead;
use std::path::PathBuf;

/// Serialize an object body (without the loose object header)
pub trait Packable {
    fn content(&self) -> Result<Bytes>;
}

/// Parse an object body (the header has already been consumed)
pub trait Unpackable {
    fn deserialize(reader: impl BufRead) -> Result<Self>
    where
        Self: Sized;
}

pub trait Object: Packable {
    fn object_type(&self) -> ObjectType;

    /// Full loose object bytes: header followed by the body
    fn serialize(&self) -> Result<Bytes> {
        let content = self.content()?;
        let mut bytes = self.object_type().header(content.len()).into_bytes();
        bytes.extend_from_slice(&content);

        Ok(Bytes::from(bytes))
    }

    fn object_id(&self) -> Result<ObjectId> {
        let mut hasher = Sha1::new();
        hasher.update(self.serialize()?);

        ObjectId::try_parse(format!("{:x}", hasher.finalize()))
    }

    fn object_path(&self) -> Result<PathBuf> {
        Ok(self.object_id()?.to_path())
    }
}
