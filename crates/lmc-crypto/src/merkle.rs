use lmc_types::{Digest, TypeError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::hasher::{HashPrimitive, Sha256Hasher};

/// Side of a sibling in a Merkle proof path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Where the sibling of the node at `index` sits.
    fn of_sibling(index: usize) -> Self {
        if index % 2 == 0 {
            Side::Right
        } else {
            Side::Left
        }
    }
}

/// One layer of an inclusion proof.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ProofStep {
    /// A real sibling digest, and the side it is combined on.
    Sibling { digest: Digest, side: Side },
    /// The running node was the unpaired last entry of an odd-length layer
    /// and is combined with itself.
    Duplicate,
}

impl ProofStep {
    /// Build a sibling step from a hex digest, rejecting anything that is not
    /// exactly one digest long.
    pub fn sibling_from_hex(hex: &str, side: Side) -> MerkleResult<Self> {
        let digest = Digest::from_hex(hex)?;
        Ok(ProofStep::Sibling { digest, side })
    }
}

/// Number of proof steps for a tree with `leaf_count` leaves:
/// `ceil(log2(leaf_count))`, and 0 for empty or single-leaf trees.
pub fn tree_height(leaf_count: usize) -> usize {
    let mut height = 0;
    let mut len = leaf_count;
    while len > 1 {
        len = len.div_ceil(2);
        height += 1;
    }
    height
}

/// Binary Merkle tree for efficient proof of inclusion.
///
/// Leaves are hashed with the tree's [`HashPrimitive`] and combined pairwise,
/// left to right. The last entry of an odd-length layer is combined with
/// itself. Every layer is kept so proofs can be generated on demand.
#[derive(Clone, Debug)]
pub struct MerkleTree<H: HashPrimitive = Sha256Hasher> {
    hasher: H,
    /// Layer 0 = leaf digests, last layer = `[root]`. Empty for zero leaves.
    layers: Vec<Vec<Digest>>,
}

impl MerkleTree<Sha256Hasher> {
    /// Build a tree over raw leaf values using SHA-256.
    pub fn build<I, L>(leaves: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: AsRef<[u8]>,
    {
        Self::build_with(Sha256Hasher, leaves)
    }
}

impl<H: HashPrimitive> MerkleTree<H> {
    /// Build a tree over raw leaf values with the given hash primitive.
    ///
    /// An empty list produces a tree with no root. A single leaf's digest is
    /// its own root.
    pub fn build_with<I, L>(hasher: H, leaves: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: AsRef<[u8]>,
    {
        let digests = leaves
            .into_iter()
            .map(|leaf| hasher.digest(leaf.as_ref()))
            .collect();
        Self::from_leaf_digests(hasher, digests)
    }

    /// Build a tree from leaves that are already digests.
    pub fn from_leaf_digests(hasher: H, leaves: Vec<Digest>) -> Self {
        if leaves.is_empty() {
            debug!("built empty merkle tree");
            return Self {
                hasher,
                layers: vec![],
            };
        }

        let mut layers = vec![leaves];
        loop {
            let current = &layers[layers.len() - 1];
            if current.len() <= 1 {
                break;
            }
            let mut next = Vec::with_capacity(current.len().div_ceil(2));
            for pair in current.chunks(2) {
                let hash = if pair.len() == 2 {
                    hasher.combine(&pair[0], &pair[1])
                } else {
                    hasher.combine(&pair[0], &pair[0])
                };
                next.push(hash);
            }
            layers.push(next);
        }

        let tree = Self { hasher, layers };
        debug!(
            leaf_count = tree.leaf_count(),
            height = tree.height(),
            root = %tree.root().map(|r| r.short_hex()).unwrap_or_default(),
            algorithm = %tree.hasher.algorithm(),
            "built merkle tree"
        );
        tree
    }

    /// The root digest, or `None` for a tree with no leaves.
    pub fn root(&self) -> Option<Digest> {
        self.layers.last().and_then(|layer| layer.first()).copied()
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.layers.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Number of layers above the leaves; also the length of every proof.
    pub fn height(&self) -> usize {
        self.layers.len().saturating_sub(1)
    }

    /// All layers, leaf digests first.
    pub fn layers(&self) -> &[Vec<Digest>] {
        &self.layers
    }

    /// Digest of the leaf at `index`.
    pub fn leaf_digest(&self, index: usize) -> Option<Digest> {
        self.layers.first().and_then(|leaves| leaves.get(index)).copied()
    }

    /// The hash primitive the tree was built with.
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Generate an inclusion proof for the leaf at `index`.
    ///
    /// The proof has exactly [`height`](Self::height) steps.
    pub fn generate_proof(&self, index: usize) -> MerkleResult<MerkleProof> {
        let leaf_count = self.leaf_count();
        if index >= leaf_count {
            return Err(MerkleError::InvalidIndex { index, leaf_count });
        }

        let mut steps = Vec::with_capacity(self.height());
        let mut idx = index;
        for layer in &self.layers[..self.layers.len() - 1] {
            let step = match layer.get(idx ^ 1) {
                Some(sibling) => ProofStep::Sibling {
                    digest: *sibling,
                    side: Side::of_sibling(idx),
                },
                None => ProofStep::Duplicate,
            };
            steps.push(step);
            idx /= 2;
        }

        debug!(index, steps = steps.len(), "generated merkle proof");
        Ok(MerkleProof {
            leaf_index: index,
            leaf_count,
            steps,
        })
    }

    /// Verify `proof` for `leaf_value` at `index` against this tree's root.
    ///
    /// An empty tree proves nothing and always yields `Ok(false)`. So does a
    /// proof whose leaf count differs from this tree's.
    pub fn verify_proof(
        &self,
        leaf_value: &[u8],
        index: usize,
        proof: &MerkleProof,
    ) -> MerkleResult<bool> {
        if proof.leaf_count != self.leaf_count() {
            debug!(
                index,
                reason = "leaf count mismatch",
                proof_leaf_count = proof.leaf_count,
                leaf_count = self.leaf_count(),
                "proof rejected"
            );
            return Ok(false);
        }
        match self.root() {
            Some(root) => verify_proof(&self.hasher, leaf_value, index, proof, &root),
            None => Ok(false),
        }
    }
}

/// Merkle inclusion proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Index of the leaf the proof was generated for.
    leaf_index: usize,
    /// Leaf count of the tree the proof was generated from.
    leaf_count: usize,
    /// One step per non-root layer, leaf layer first.
    steps: Vec<ProofStep>,
}

impl MerkleProof {
    pub fn new(leaf_index: usize, leaf_count: usize, steps: Vec<ProofStep>) -> Self {
        Self {
            leaf_index,
            leaf_count,
            steps,
        }
    }

    /// Decode a proof from JSON. Digests of the wrong size are reported as
    /// [`MerkleError::MalformedProof`].
    pub fn from_json(json: &str) -> MerkleResult<Self> {
        serde_json::from_str(json).map_err(|e| MerkleError::MalformedProof(e.to_string()))
    }

    pub fn leaf_index(&self) -> usize {
        self.leaf_index
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub fn steps(&self) -> &[ProofStep] {
        &self.steps
    }

    /// Verify the proof for `leaf_value` at the index it was generated for.
    pub fn verify<H: HashPrimitive + ?Sized>(
        &self,
        hasher: &H,
        leaf_value: &[u8],
        expected_root: &Digest,
    ) -> MerkleResult<bool> {
        verify_proof(hasher, leaf_value, self.leaf_index, self, expected_root)
    }
}

/// Recompute the root from `leaf_value` at `index` and the proof steps, and
/// compare it with `expected_root`.
///
/// Layer lengths are rederived from the proof's leaf count, so at every step
/// the verifier knows whether the running node must have a sibling (and on
/// which side) or must be combined with itself. A step that disagrees with
/// that shape, an out-of-range index, or a different root all yield
/// `Ok(false)`. A proof whose step count does not match its own leaf count
/// is malformed.
///
/// The proof's leaf count is trusted. A caller holding only a root must check
/// it against the committed leaf count, or a proof claiming a larger tree can
/// reach the real root from an index past the last leaf.
/// [`MerkleTree::verify_proof`] does this check itself.
pub fn verify_proof<H: HashPrimitive + ?Sized>(
    hasher: &H,
    leaf_value: &[u8],
    index: usize,
    proof: &MerkleProof,
    expected_root: &Digest,
) -> MerkleResult<bool> {
    let leaf_count = proof.leaf_count;
    if leaf_count == 0 {
        return Err(MerkleError::MalformedProof(
            "proof claims a tree with no leaves".into(),
        ));
    }
    let expected_steps = tree_height(leaf_count);
    if proof.steps.len() != expected_steps {
        return Err(MerkleError::MalformedProof(format!(
            "expected {expected_steps} steps for {leaf_count} leaves, got {}",
            proof.steps.len()
        )));
    }
    if index >= leaf_count {
        debug!(index, leaf_count, reason = "index out of range", "proof rejected");
        return Ok(false);
    }

    let mut current = hasher.digest(leaf_value);
    let mut idx = index;
    let mut layer_len = leaf_count;
    for (depth, step) in proof.steps.iter().enumerate() {
        let unpaired = idx % 2 == 0 && idx + 1 == layer_len;
        current = match (step, unpaired) {
            (ProofStep::Duplicate, true) => hasher.combine(&current, &current),
            (ProofStep::Sibling { digest, side }, false) if *side == Side::of_sibling(idx) => {
                match side {
                    Side::Left => hasher.combine(digest, &current),
                    Side::Right => hasher.combine(&current, digest),
                }
            }
            _ => {
                debug!(
                    index,
                    depth,
                    reason = "step does not fit leaf position",
                    "proof rejected"
                );
                return Ok(false);
            }
        };
        idx /= 2;
        layer_len = layer_len.div_ceil(2);
    }

    Ok(current == *expected_root)
}

/// Errors from Merkle tree operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MerkleError {
    #[error("leaf index {index} out of range for tree with {leaf_count} leaves")]
    InvalidIndex { index: usize, leaf_count: usize },

    #[error("malformed proof: {0}")]
    MalformedProof(String),
}

impl From<TypeError> for MerkleError {
    fn from(err: TypeError) -> Self {
        MerkleError::MalformedProof(err.to_string())
    }
}

pub type MerkleResult<T> = Result<T, MerkleError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::Blake3Hasher;

    fn h(data: &[u8]) -> Digest {
        Sha256Hasher.digest(data)
    }

    fn pair(left: &Digest, right: &Digest) -> Digest {
        Sha256Hasher.combine(left, right)
    }

    fn leaves(count: usize) -> Vec<Vec<u8>> {
        (0..count).map(|i| format!("leaf-{i}").into_bytes()).collect()
    }

    #[test]
    fn empty_tree_has_no_root() {
        let tree = MerkleTree::build(Vec::<Vec<u8>>::new());
        assert!(tree.root().is_none());
        assert!(tree.is_empty());
        assert_eq!(tree.leaf_count(), 0);
        assert_eq!(tree.height(), 0);
        assert!(tree.layers().is_empty());
    }

    #[test]
    fn empty_tree_rejects_every_index() {
        let tree = MerkleTree::build(Vec::<Vec<u8>>::new());
        assert_eq!(
            tree.generate_proof(0).unwrap_err(),
            MerkleError::InvalidIndex {
                index: 0,
                leaf_count: 0
            }
        );
    }

    #[test]
    fn single_leaf_is_root() {
        let tree = MerkleTree::build([b"only"]);
        assert_eq!(tree.root(), Some(h(b"only")));
        assert_eq!(tree.layers().len(), 1);

        let proof = tree.generate_proof(0).unwrap();
        assert!(proof.steps().is_empty());
        assert_eq!(tree.verify_proof(b"only", 0, &proof), Ok(true));
    }

    #[test]
    fn two_leaves_produce_parent() {
        let tree = MerkleTree::build(["left", "right"]);
        assert_eq!(tree.root(), Some(pair(&h(b"left"), &h(b"right"))));
    }

    #[test]
    fn odd_layer_duplicates_last_entry() {
        let tree = MerkleTree::build(["a", "b", "c"]);
        let (a, b, c) = (h(b"a"), h(b"b"), h(b"c"));
        let left = pair(&a, &b);
        let right = pair(&c, &c);

        assert_eq!(tree.layers()[0], vec![a, b, c]);
        assert_eq!(tree.layers()[1], vec![left, right]);
        assert_eq!(tree.root(), Some(pair(&left, &right)));
    }

    #[test]
    fn proof_for_unpaired_leaf_uses_duplicate_marker() {
        let tree = MerkleTree::build(["a", "b", "c"]);
        let left = pair(&h(b"a"), &h(b"b"));

        let proof = tree.generate_proof(2).unwrap();
        assert_eq!(
            proof.steps(),
            &[
                ProofStep::Duplicate,
                ProofStep::Sibling {
                    digest: left,
                    side: Side::Left
                },
            ]
        );
        assert_eq!(tree.verify_proof(b"c", 2, &proof), Ok(true));
    }

    #[test]
    fn proof_length_equals_height_for_every_leaf() {
        for count in 1..=17 {
            let tree = MerkleTree::build(leaves(count));
            assert_eq!(tree.height(), tree_height(count));
            for i in 0..count {
                assert_eq!(tree.generate_proof(i).unwrap().steps().len(), tree.height());
            }
        }
    }

    #[test]
    fn tree_height_is_ceil_log2() {
        assert_eq!(tree_height(0), 0);
        assert_eq!(tree_height(1), 0);
        assert_eq!(tree_height(2), 1);
        assert_eq!(tree_height(3), 2);
        assert_eq!(tree_height(4), 2);
        assert_eq!(tree_height(5), 3);
        assert_eq!(tree_height(8), 3);
        assert_eq!(tree_height(9), 4);
    }

    #[test]
    fn proof_verifies_for_all_leaves() {
        let values = leaves(7);
        let tree = MerkleTree::build(&values);

        for (i, value) in values.iter().enumerate() {
            let proof = tree.generate_proof(i).expect("proof should exist");
            assert_eq!(proof.leaf_index(), i);
            assert_eq!(proof.leaf_count(), 7);
            assert_eq!(
                tree.verify_proof(value, i, &proof),
                Ok(true),
                "proof for leaf {i} should verify"
            );
        }
    }

    #[test]
    fn proof_out_of_bounds_is_invalid_index() {
        let tree = MerkleTree::build(["a", "b"]);
        assert_eq!(
            tree.generate_proof(2).unwrap_err(),
            MerkleError::InvalidIndex {
                index: 2,
                leaf_count: 2
            }
        );
        assert!(matches!(
            tree.generate_proof(usize::MAX),
            Err(MerkleError::InvalidIndex { .. })
        ));
    }

    #[test]
    fn wrong_leaf_fails_verification() {
        let tree = MerkleTree::build(["a", "b", "c", "d"]);
        let proof = tree.generate_proof(0).unwrap();
        assert_eq!(tree.verify_proof(b"b", 0, &proof), Ok(false));
    }

    #[test]
    fn wrong_index_fails_verification() {
        let tree = MerkleTree::build(["a", "b", "c", "d", "e"]);
        let proof = tree.generate_proof(1).unwrap();
        for index in [0, 2, 3, 4, 5, 99] {
            assert_eq!(tree.verify_proof(b"b", index, &proof), Ok(false));
        }
    }

    #[test]
    fn tampered_sibling_fails_verification() {
        let tree = MerkleTree::build(leaves(6));
        let mut proof = tree.generate_proof(3).unwrap();
        if let ProofStep::Sibling { digest, side } = proof.steps[1] {
            let mut bytes = *digest.as_bytes();
            bytes[0] ^= 0x01;
            proof.steps[1] = ProofStep::Sibling {
                digest: Digest::from_hash(bytes),
                side,
            };
        } else {
            panic!("leaf 3 has a real sibling on layer 1");
        }
        assert_eq!(tree.verify_proof(b"leaf-3", 3, &proof), Ok(false));
    }

    #[test]
    fn flipped_side_fails_verification() {
        let tree = MerkleTree::build(["a", "b"]);
        let mut proof = tree.generate_proof(0).unwrap();
        proof.steps[0] = match proof.steps[0] {
            ProofStep::Sibling { digest, .. } => ProofStep::Sibling {
                digest,
                side: Side::Left,
            },
            ProofStep::Duplicate => panic!("leaf 0 has a sibling"),
        };
        assert_eq!(tree.verify_proof(b"a", 0, &proof), Ok(false));
    }

    #[test]
    fn duplicate_marker_where_sibling_exists_fails() {
        let tree = MerkleTree::build(["a", "b"]);
        let proof = MerkleProof::new(0, 2, vec![ProofStep::Duplicate]);
        assert_eq!(tree.verify_proof(b"a", 0, &proof), Ok(false));
    }

    #[test]
    fn inflated_leaf_count_fails_verification() {
        let tree = MerkleTree::build(["a", "b", "c"]);
        let left = pair(&h(b"a"), &h(b"b"));
        let forged = MerkleProof::new(
            3,
            4,
            vec![
                ProofStep::Sibling {
                    digest: h(b"c"),
                    side: Side::Left,
                },
                ProofStep::Sibling {
                    digest: left,
                    side: Side::Left,
                },
            ],
        );
        let root = tree.root().unwrap();

        // Trusting the claimed count, the replay reaches the real root.
        assert_eq!(verify_proof(&Sha256Hasher, b"c", 3, &forged, &root), Ok(true));
        assert_eq!(tree.verify_proof(b"c", 3, &forged), Ok(false));
    }

    #[test]
    fn wrong_step_count_is_malformed() {
        let tree = MerkleTree::build(["a", "b", "c"]);
        let mut proof = tree.generate_proof(0).unwrap();
        proof.steps.pop();
        assert!(matches!(
            tree.verify_proof(b"a", 0, &proof),
            Err(MerkleError::MalformedProof(_))
        ));
    }

    #[test]
    fn zero_leaf_count_is_malformed() {
        let proof = MerkleProof::new(0, 0, vec![]);
        let root = h(b"a");
        assert!(matches!(
            verify_proof(&Sha256Hasher, b"a", 0, &proof, &root),
            Err(MerkleError::MalformedProof(_))
        ));
    }

    #[test]
    fn wrong_root_fails_verification() {
        let tree = MerkleTree::build(["a", "b", "c"]);
        let other = MerkleTree::build(["x", "y", "z"]);
        let proof = tree.generate_proof(1).unwrap();
        let other_root = other.root().unwrap();
        assert_eq!(proof.verify(&Sha256Hasher, b"b", &other_root), Ok(false));
    }

    #[test]
    fn root_is_order_sensitive() {
        let forward = MerkleTree::build(["a", "b", "c", "d"]);
        let reversed = MerkleTree::build(["d", "c", "b", "a"]);
        assert_ne!(forward.root(), reversed.root());
    }

    #[test]
    fn deterministic_root() {
        let tree1 = MerkleTree::build(leaves(10));
        let tree2 = MerkleTree::build(leaves(10));
        assert_eq!(tree1.root(), tree2.root());
    }

    #[test]
    fn hasher_is_injected() {
        let sha = MerkleTree::build(["a", "b", "c"]);
        let blake = MerkleTree::build_with(Blake3Hasher, ["a", "b", "c"]);
        assert_ne!(sha.root(), blake.root());

        let proof = blake.generate_proof(2).unwrap();
        assert_eq!(blake.verify_proof(b"c", 2, &proof), Ok(true));
        let root = blake.root().unwrap();
        assert_eq!(proof.verify(&Sha256Hasher, b"c", &root), Ok(false));
        assert_eq!(proof.verify(&Blake3Hasher, b"c", &root), Ok(true));
    }

    #[test]
    fn from_leaf_digests_matches_build() {
        let values = leaves(5);
        let digests = values.iter().map(|v| h(v)).collect();
        let prehashed = MerkleTree::from_leaf_digests(Sha256Hasher, digests);
        assert_eq!(prehashed.root(), MerkleTree::build(&values).root());
        assert_eq!(prehashed.leaf_digest(4), Some(h(b"leaf-4")));
        assert_eq!(prehashed.leaf_digest(5), None);
    }

    #[test]
    fn sibling_from_hex_rejects_short_digest() {
        let err = ProofStep::sibling_from_hex("abcd", Side::Left).unwrap_err();
        assert!(matches!(err, MerkleError::MalformedProof(_)));

        let ok = ProofStep::sibling_from_hex(&h(b"a").to_hex(), Side::Right).unwrap();
        assert_eq!(
            ok,
            ProofStep::Sibling {
                digest: h(b"a"),
                side: Side::Right
            }
        );
    }

    #[test]
    fn proof_serde_roundtrip() {
        let tree = MerkleTree::build(["a", "b", "c", "d", "e"]);
        let proof = tree.generate_proof(4).unwrap();
        let json = serde_json::to_string(&proof).unwrap();
        let parsed = MerkleProof::from_json(&json).unwrap();
        assert_eq!(proof, parsed);
        assert_eq!(tree.verify_proof(b"e", 4, &parsed), Ok(true));
    }

    #[test]
    fn from_json_rejects_truncated_digest() {
        let json = r#"{"leaf_index":0,"leaf_count":2,"steps":[{"kind":"sibling","digest":"abcd","side":"right"}]}"#;
        assert!(matches!(
            MerkleProof::from_json(json),
            Err(MerkleError::MalformedProof(_))
        ));
    }
}
