/// Full or partial commit hashes to show, overriding every other filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashFilter {
    hashes: Vec<String>,
}

impl HashFilter {
    pub fn new(hashes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        HashFilter {
            hashes: hashes
                .into_iter()
                .map(Into::into)
                .map(|hash| hash.trim().to_string())
                .filter(|hash| !hash.is_empty())
                .collect(),
        }
    }

    pub fn hashes(&self) -> &[String] {
        &self.hashes
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
