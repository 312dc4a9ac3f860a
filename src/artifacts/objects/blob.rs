use crate::artifacts::objects::object::{Object, Packable};
use crate::artifacts::objects::object_type::ObjectType;
use bytes::Bytes;
use derive_new::new;

/// File content
///
/// The log engine never reads blobs back; they only need stable IDs so that
/// tree diffs can tell whether a file changed.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Blob {
    data: Bytes,
}

impl Packable for Blob {
    fn content(&self) -> anyhow::Result<Bytes> {
        Ok(self.data.clone())
    }
}

impl Object for Blob {
    fn object_type(&self) -> ObjectType {
        ObjectType::Blob
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_id_matches_git_hash_object() {
        // echo -n "hello" | git hash-object --stdin
        let blob = Blob::new(Bytes::from_static(b"hello"));
        assert_eq!(
            blob.object_id().unwrap().as_ref(),
            "b6fc4c620b67d95f953a5c1c1230aaab5db5a1b0"
        );
    }
}
