//! Hashing, merkle commitments, and order-signature verification.
//!
//! Identifier derivation and resolution commitments use domain-tagged
//! SHA-256. Signature verification is deliberately behind the
//! [`OrderVerifier`] trait: the settlement engine treats "who signed this
//! order" as an external capability, and the bundled [`Ed25519Verifier`] is
//! one implementation of it.

use std::fmt;

use ed25519_dalek::{Signature, Signer as _, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{SignedOrder, UserId};
use crate::error::LedgerError;

/// A 32-byte hash value. Serializes as its hex string.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash32([u8; 32]);

impl Serialize for Hash32 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash32 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl Hash32 {
    /// The zero hash, used as a sentinel.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create a hash from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex encoding of the full hash.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({}..)", &self.to_hex()[..8])
    }
}

/// Domain-tagged SHA-256 over length-prefixed parts.
///
/// Each part is prefixed with its u32-le length so that different splits of
/// the same byte stream hash differently.
#[must_use]
pub fn tagged_hash(tag: &str, parts: &[&[u8]]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update((tag.len() as u32).to_le_bytes());
    hasher.update(tag.as_bytes());
    for part in parts {
        hasher.update((part.len() as u32).to_le_bytes());
        hasher.update(part);
    }
    Hash32(hasher.finalize().into())
}

/// Commutative pair hash: the pair is sorted before hashing, so proof
/// verification needs no left/right direction flags.
#[must_use]
pub fn hash_pair(a: Hash32, b: Hash32) -> Hash32 {
    let (lo, hi) = if a.0 <= b.0 { (a, b) } else { (b, a) };
    let mut hasher = Sha256::new();
    hasher.update(lo.0);
    hasher.update(hi.0);
    Hash32(hasher.finalize().into())
}

pub mod merkle {
    //! Sorted-pair merkle commitments over 32-byte leaves.

    use super::{hash_pair, Hash32};

    /// Verify a merkle proof against a root.
    ///
    /// Returns false for a bad proof; never errors, so callers can cleanly
    /// distinguish "unresolved" from "proof invalid".
    #[must_use]
    pub fn verify(proof: &[Hash32], root: Hash32, leaf: Hash32) -> bool {
        let mut acc = leaf;
        for sibling in proof {
            acc = hash_pair(acc, *sibling);
        }
        acc == root
    }

    /// A merkle tree built over a fixed leaf set, with proof extraction.
    ///
    /// Odd levels duplicate their last node. Used by the oracle side when
    /// committing a resolution and by tests; the engine itself only verifies.
    #[derive(Debug, Clone)]
    pub struct MerkleTree {
        levels: Vec<Vec<Hash32>>,
    }

    impl MerkleTree {
        /// Build a tree from leaves. Returns `None` for an empty leaf set.
        #[must_use]
        pub fn from_leaves(leaves: Vec<Hash32>) -> Option<Self> {
            if leaves.is_empty() {
                return None;
            }
            let mut levels = vec![leaves];
            while levels.last().map(Vec::len) > Some(1) {
                let prev = levels.last().expect("levels is non-empty");
                let mut next = Vec::with_capacity(prev.len().div_ceil(2));
                for pair in prev.chunks(2) {
                    let right = pair.get(1).copied().unwrap_or(pair[0]);
                    next.push(hash_pair(pair[0], right));
                }
                levels.push(next);
            }
            Some(Self { levels })
        }

        /// The committed root.
        #[must_use]
        pub fn root(&self) -> Hash32 {
            self.levels.last().expect("levels is non-empty")[0]
        }

        /// Proof for the leaf at `index`, or `None` if out of range.
        #[must_use]
        pub fn proof(&self, index: usize) -> Option<Vec<Hash32>> {
            if index >= self.levels[0].len() {
                return None;
            }
            let mut proof = Vec::new();
            let mut idx = index;
            for level in &self.levels[..self.levels.len() - 1] {
                let sibling = idx ^ 1;
                let node = level.get(sibling).copied().unwrap_or(level[idx]);
                proof.push(node);
                idx /= 2;
            }
            Some(proof)
        }
    }
}

/// Opaque order-signature verification capability.
///
/// Returns the verified signer identity; the engine then requires that
/// identity to match the order's stated maker.
pub trait OrderVerifier: Send + Sync {
    /// Verify the signature and return the signer's identity.
    fn verify(&self, signed: &SignedOrder) -> Result<UserId, LedgerError>;
}

/// Ed25519 verification; a user's identity is the hex of their verifying key.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Verifier;

impl Ed25519Verifier {
    /// Derive the user identity for a verifying key.
    #[must_use]
    pub fn identity(key: &VerifyingKey) -> UserId {
        UserId::new(hex::encode(key.to_bytes()))
    }
}

impl OrderVerifier for Ed25519Verifier {
    fn verify(&self, signed: &SignedOrder) -> Result<UserId, LedgerError> {
        let key = VerifyingKey::from_bytes(&signed.public_key)
            .map_err(|_| LedgerError::InvalidSignature)?;
        let signature = Signature::from_slice(&signed.signature)
            .map_err(|_| LedgerError::InvalidSignature)?;
        let digest = signed.order.digest();
        key.verify_strict(digest.as_bytes(), &signature)
            .map_err(|_| LedgerError::InvalidSignature)?;

        let identity = Self::identity(&key);
        if identity != signed.order.maker {
            return Err(LedgerError::InvalidSignature);
        }
        Ok(identity)
    }
}

/// Ed25519 signing half, for order producers (CLI demo, tests).
pub struct Ed25519Signer {
    key: SigningKey,
}

impl Ed25519Signer {
    /// Generate a fresh keypair.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::rngs::OsRng;
        Self {
            key: SigningKey::generate(&mut rng),
        }
    }

    /// Restore a signer from secret key bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(bytes),
        }
    }

    /// The identity this signer produces orders for.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        Ed25519Verifier::identity(&self.key.verifying_key())
    }

    /// Sign an order's canonical digest.
    #[must_use]
    pub fn sign(&self, order: crate::domain::Order) -> SignedOrder {
        let digest = order.digest();
        let signature = self.key.sign(digest.as_bytes());
        SignedOrder {
            order,
            public_key: self.key.verifying_key().to_bytes(),
            signature: signature.to_bytes().to_vec(),
        }
    }
}

impl fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("user_id", &self.user_id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::merkle::{verify, MerkleTree};
    use super::*;

    fn leaf(n: u8) -> Hash32 {
        tagged_hash("test/leaf", &[&[n]])
    }

    #[test]
    fn tagged_hash_is_deterministic_and_tag_sensitive() {
        let a = tagged_hash("tag-a", &[b"hello"]);
        let b = tagged_hash("tag-a", &[b"hello"]);
        let c = tagged_hash("tag-b", &[b"hello"]);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn tagged_hash_length_prefix_prevents_resplitting() {
        let joined = tagged_hash("tag", &[b"ab"]);
        let split = tagged_hash("tag", &[b"a", b"b"]);
        assert_ne!(joined, split);
    }

    #[test]
    fn hash_pair_is_commutative() {
        let a = leaf(1);
        let b = leaf(2);
        assert_eq!(hash_pair(a, b), hash_pair(b, a));
    }

    #[test]
    fn hash32_hex_round_trip() {
        let h = leaf(7);
        assert_eq!(Hash32::from_hex(&h.to_hex()).unwrap(), h);
        assert!(Hash32::from_hex("abcd").is_err());
    }

    #[test]
    fn hash32_serializes_as_hex() {
        let h = leaf(7);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", h.to_hex()));
        assert_eq!(serde_json::from_str::<Hash32>(&json).unwrap(), h);
    }

    #[test]
    fn merkle_single_leaf_root_is_leaf() {
        let tree = MerkleTree::from_leaves(vec![leaf(1)]).unwrap();
        assert_eq!(tree.root(), leaf(1));
        assert_eq!(tree.proof(0).unwrap(), Vec::<Hash32>::new());
    }

    #[test]
    fn merkle_proofs_verify_for_all_leaves() {
        for n in 1..=9usize {
            let leaves: Vec<_> = (0..n as u8).map(leaf).collect();
            let tree = MerkleTree::from_leaves(leaves.clone()).unwrap();
            for (i, l) in leaves.iter().enumerate() {
                let proof = tree.proof(i).unwrap();
                assert!(verify(&proof, tree.root(), *l), "leaf {i} of {n}");
            }
        }
    }

    #[test]
    fn merkle_rejects_wrong_leaf() {
        let leaves: Vec<_> = (0..4u8).map(leaf).collect();
        let tree = MerkleTree::from_leaves(leaves).unwrap();
        let proof = tree.proof(0).unwrap();
        assert!(!verify(&proof, tree.root(), leaf(42)));
    }

    #[test]
    fn merkle_empty_and_out_of_range() {
        assert!(MerkleTree::from_leaves(vec![]).is_none());
        let tree = MerkleTree::from_leaves(vec![leaf(0)]).unwrap();
        assert!(tree.proof(1).is_none());
    }
}
