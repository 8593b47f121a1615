use std::io::{self, Read};

use lode_types::ContentHash;

const CHUNK: usize = 64 * 1024;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"lode-value-v1"`) that is
/// prepended to every hash computation, so hashes from different families
/// never collide even for identical bytes.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for stored values.
    pub const VALUE: Self = Self {
        domain: "lode-value-v1",
    };

    fn start(&self) -> blake3::Hasher {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> ContentHash {
        let mut hasher = self.start();
        hasher.update(data);
        ContentHash::from_digest(*hasher.finalize().as_bytes())
    }

    /// Drain `reader`, hashing and buffering it in a single pass.
    ///
    /// Returns the hash together with every byte read, so the caller can
    /// write the content out after deciding whether it changed.
    pub fn hash_reader(&self, reader: &mut dyn Read) -> Result<(ContentHash, Vec<u8>), HasherError> {
        let mut hasher = self.start();
        let mut buf = Vec::new();
        let mut chunk = vec![0u8; CHUNK];
        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HasherError::Io(e)),
            };
            hasher.update(&chunk[..n]);
            buf.extend_from_slice(&chunk[..n]);
        }
        Ok((ContentHash::from_digest(*hasher.finalize().as_bytes()), buf))
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error)]
pub enum HasherError {
    #[error("read failed while hashing: {0}")]
    Io(#[from] io::Error),
}
