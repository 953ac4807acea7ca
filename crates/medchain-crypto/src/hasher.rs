use medchain_types::Digest;

/// BLAKE3 under a fixed domain tag.
///
/// The tag and a `:` separator are hashed ahead of the data, so a block and
/// an exported file with identical bytes never share a digest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentHasher {
    /// Chain blocks: `medchain-block-v1`.
    Block,
    /// Whole-snapshot checksums: `medchain-snapshot-v1`.
    Snapshot,
}

impl ContentHasher {
    pub const BLOCK: Self = Self::Block;
    pub const SNAPSHOT: Self = Self::Snapshot;

    fn tag(self) -> &'static [u8] {
        match self {
            Self::Block => b"medchain-block-v1:",
            Self::Snapshot => b"medchain-snapshot-v1:",
        }
    }

    pub fn hash(self, data: &[u8]) -> Digest {
        self.hash_parts(&[data])
    }

    /// Hash `parts` as one concatenated message.
    pub fn hash_parts(self, parts: &[&[u8]]) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.tag());
        for part in parts {
            hasher.update(part);
        }
        Digest::from_hash(*hasher.finalize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domains_separate_identical_bytes() {
        let data = b"{\"format_version\":1,\"blocks\":[]}";
        assert_eq!(ContentHasher::BLOCK.hash(data), ContentHasher::BLOCK.hash(data));
        assert_ne!(
            ContentHasher::BLOCK.hash(data),
            ContentHasher::SNAPSHOT.hash(data)
        );
    }

    #[test]
    fn parts_hash_like_concatenation() {
        let whole = ContentHasher::BLOCK.hash(b"abcdef");
        let parts = ContentHasher::BLOCK.hash_parts(&[b"ab", b"cd", b"ef"]);
        assert_eq!(whole, parts);
    }

    #[test]
    fn tag_is_prefixed_to_plain_blake3() {
        let expected = blake3::hash(b"medchain-snapshot-v1:payload");
        assert_eq!(
            ContentHasher::SNAPSHOT.hash(b"payload"),
            Digest::from_hash(*expected.as_bytes())
        );
    }
}
