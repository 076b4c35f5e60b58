use reward_models::MerkleLeaf;
use sp_core::H256;

/// Bytes per encoded leaf field (`uint256`).
pub const WORD_SIZE: usize = 32;
pub const ENCODED_LEAF_SIZE: usize = 3 * WORD_SIZE;

pub struct CryptoUtils;

impl CryptoUtils {
    /// `abi.encode(uint256 groupId, uint256 validatorCount, uint256 amount)`:
    /// three big-endian words, left padded.
    pub fn encode_leaf(leaf: &MerkleLeaf) -> [u8; ENCODED_LEAF_SIZE] {
        let mut out = [0u8; ENCODED_LEAF_SIZE];
        out[WORD_SIZE - 8..WORD_SIZE].copy_from_slice(&leaf.group_id.to_be_bytes());
        out[2 * WORD_SIZE - 8..2 * WORD_SIZE].copy_from_slice(&leaf.validator_count.to_be_bytes());
        out[3 * WORD_SIZE - 16..].copy_from_slice(&leaf.amount.0.to_be_bytes());
        out
    }

    /// Leaf hash is `keccak256(keccak256(encoded))`; the double hash keeps a leaf from
    /// ever colliding with an inner node.
    pub fn hash_leaf(leaf: &MerkleLeaf) -> H256 {
        let inner = sp_core::keccak_256(&Self::encode_leaf(leaf));
        sp_core::keccak_256(&inner).into()
    }

    /// Commutative node hash: the smaller child goes first.
    pub fn hash_pair(a: &H256, b: &H256) -> H256 {
        let (left, right) = if a <= b { (a, b) } else { (b, a) };
        let mut input = Vec::with_capacity(2 * WORD_SIZE);
        input.extend_from_slice(left.as_bytes());
        input.extend_from_slice(right.as_bytes());

        sp_core::keccak_256(&input).into()
    }

    pub fn verify_merkle_proof(root: H256, proof: &[H256], leaf: H256) -> bool {
        let computed = proof
            .iter()
            .fold(leaf, |current, sibling| Self::hash_pair(&current, sibling));

        computed == root
    }

    pub fn to_hex(hash: &H256) -> String {
        format!("0x{}", hex::encode(hash.as_bytes()))
    }

    pub fn parse_hash(s: &str) -> Option<H256> {
        let bytes = hex::decode(s.trim_start_matches("0x")).ok()?;
        (bytes.len() == WORD_SIZE).then(|| H256::from_slice(&bytes))
    }
}
