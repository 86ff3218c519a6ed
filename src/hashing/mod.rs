//! Content hashing and deterministic-seed derivation.
//!
//! Every hash in this module is BLAKE3-based. None of it is used for
//! authentication or integrity verification — only for fast indexing,
//! probabilistic deduplication, and deriving reproducible PRNG seeds.

use blake3::Hasher;

/// Full 256-bit content hash of a memory's text, used as `content_hash` in
/// the Memory Store.
#[inline]
pub fn hash_content(content: &str) -> [u8; 32] {
    *blake3::hash(content.as_bytes()).as_bytes()
}

/// Computes a 64-bit hash of the input data using BLAKE3, truncated from 256 bits.
///
/// # Collision Probability
///
/// With 64 bits of entropy, the birthday paradox gives us the following collision probabilities:
///
/// | Number of Items | Collision Probability |
/// |-----------------|----------------------|
/// | 1 million       | ~0.00003% (negligible) |
/// | 10 million      | ~0.003% (very low) |
/// | 100 million     | ~0.3% (low) |
/// | 1 billion       | ~3% (noticeable) |
/// | ~4.3 billion    | ~50% (birthday bound) |
///
/// Callers that need a PRNG seed or a cache key tolerate this; callers that
/// need collision-proof identity (content hashes persisted to the store)
/// should use [`hash_content`] instead, which keeps the full 32 bytes.
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}

/// Derives the deterministic RNG seed for a user's cluster run from the
/// user id and the corpus digest, so re-clustering identical input produces
/// identical cluster assignments.
#[inline]
pub fn cluster_seed(user_id: i64, digest: u64) -> u64 {
    let mut hasher = Hasher::new();
    hasher.update(&user_id.to_le_bytes());
    hasher.update(b"|");
    hasher.update(&digest.to_le_bytes());
    let hash = hasher.finalize();
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}

/// Folds a memory id's content hash into a running, order-independent
/// `EmbeddingDigest` for a user's corpus. XOR-fold is commutative and
/// self-inverse, so inserting or deleting a single memory updates the
/// digest without replaying the whole corpus.
#[inline]
pub fn fold_digest(digest: u64, memory_id: &str, embedding_version: u32) -> u64 {
    let mut hasher = Hasher::new();
    hasher.update(memory_id.as_bytes());
    hasher.update(&embedding_version.to_le_bytes());
    digest ^ hash_to_u64(hasher.finalize().as_bytes())
}
