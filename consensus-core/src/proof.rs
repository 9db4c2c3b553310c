use alloy_primitives::B256;
use sha2::{Digest, Sha256};
use tree_hash::TreeHash;

use crate::types::{Header, SyncCommittee};

/// Proves that the finalized header is committed to inside the attested
/// header's state at generalized index 41.
pub fn is_finality_proof_valid(
    attested_header: &Header,
    finalized_header: &Header,
    finality_branch: &[B256],
) -> bool {
    is_proof_valid(
        attested_header,
        finalized_header.tree_hash_root(),
        finality_branch,
        6,
        41,
    )
}

/// Proves the current sync committee at generalized index 22. Only used
/// while bootstrapping.
pub fn is_current_committee_proof_valid(
    attested_header: &Header,
    current_committee: &SyncCommittee,
    current_committee_branch: &[B256],
) -> bool {
    is_proof_valid(
        attested_header,
        current_committee.tree_hash_root(),
        current_committee_branch,
        5,
        22,
    )
}

/// Proves the next sync committee at generalized index 23.
pub fn is_next_committee_proof_valid(
    attested_header: &Header,
    next_committee: &SyncCommittee,
    next_committee_branch: &[B256],
) -> bool {
    is_proof_valid(
        attested_header,
        next_committee.tree_hash_root(),
        next_committee_branch,
        5,
        23,
    )
}

/// Folds the branch into the leaf root, left or right at each level
/// according to the bits of the generalized index, and compares the result
/// against the attested state root. Branches of the wrong length fail
/// immediately.
fn is_proof_valid(
    attested_header: &Header,
    leaf_root: B256,
    branch: &[B256],
    depth: usize,
    index: usize,
) -> bool {
    if branch.len() != depth {
        return false;
    }

    let mut derived_root = leaf_root;
    let mut hasher = Sha256::new();

    for (i, node) in branch.iter().enumerate() {
        if (index / 2usize.pow(i as u32)) % 2 != 0 {
            hasher.update(node);
            hasher.update(derived_root);
        } else {
            hasher.update(derived_root);
            hasher.update(node);
        }

        derived_root = B256::from_slice(&hasher.finalize_reset());
    }

    derived_root == attested_header.state_root
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Computes the root a branch folds to, mirroring the verification walk.
    fn fold_branch(leaf_root: B256, branch: &[B256], index: usize) -> B256 {
        let mut derived = leaf_root;
        for (i, node) in branch.iter().enumerate() {
            let mut hasher = Sha256::new();
            if (index / 2usize.pow(i as u32)) % 2 != 0 {
                hasher.update(node);
                hasher.update(derived);
            } else {
                hasher.update(derived);
                hasher.update(node);
            }
            derived = B256::from_slice(&hasher.finalize());
        }
        derived
    }

    fn branch_of(len: usize) -> Vec<B256> {
        (0..len).map(|i| B256::repeat_byte(i as u8 + 1)).collect()
    }

    #[test]
    fn finality_proof_round_trip() {
        let finalized_header = Header {
            slot: 8192,
            ..Default::default()
        };
        let branch = branch_of(6);
        let state_root = fold_branch(finalized_header.tree_hash_root(), &branch, 41);
        let attested_header = Header {
            slot: 8300,
            state_root,
            ..Default::default()
        };

        assert!(is_finality_proof_valid(
            &attested_header,
            &finalized_header,
            &branch
        ));
    }

    #[test]
    fn mutated_branch_fails() {
        let finalized_header = Header::default();
        let branch = branch_of(6);
        let state_root = fold_branch(finalized_header.tree_hash_root(), &branch, 41);
        let attested_header = Header {
            state_root,
            ..Default::default()
        };

        for i in 0..branch.len() {
            let mut tampered = branch.clone();
            let mut bytes = tampered[i].0;
            bytes[7] ^= 0x01;
            tampered[i] = B256::from(bytes);

            assert!(!is_finality_proof_valid(
                &attested_header,
                &finalized_header,
                &tampered
            ));
        }
    }

    #[test]
    fn mutated_leaf_fails() {
        let finalized_header = Header::default();
        let branch = branch_of(6);
        let state_root = fold_branch(finalized_header.tree_hash_root(), &branch, 41);
        let attested_header = Header {
            state_root,
            ..Default::default()
        };

        let tampered_leaf = Header {
            slot: 1,
            ..finalized_header
        };
        assert!(!is_finality_proof_valid(
            &attested_header,
            &tampered_leaf,
            &branch
        ));
    }

    #[test]
    fn wrong_branch_length_fails() {
        let committee = SyncCommittee::default();
        let branch = branch_of(6);
        let state_root = fold_branch(committee.tree_hash_root(), &branch, 22);
        let attested_header = Header {
            state_root,
            ..Default::default()
        };

        // current committee proofs are depth 5
        assert!(!is_current_committee_proof_valid(
            &attested_header,
            &committee,
            &branch
        ));
    }

    #[test]
    fn committee_proofs_use_distinct_indices() {
        let committee = SyncCommittee::default();
        let branch = branch_of(5);

        let current_root = fold_branch(committee.tree_hash_root(), &branch, 22);
        let next_root = fold_branch(committee.tree_hash_root(), &branch, 23);
        assert_ne!(current_root, next_root);

        let header_for_current = Header {
            state_root: current_root,
            ..Default::default()
        };
        assert!(is_current_committee_proof_valid(
            &header_for_current,
            &committee,
            &branch
        ));
        assert!(!is_next_committee_proof_valid(
            &header_for_current,
            &committee,
            &branch
        ));

        let header_for_next = Header {
            state_root: next_root,
            ..Default::default()
        };
        assert!(is_next_committee_proof_valid(
            &header_for_next,
            &committee,
            &branch
        ));
    }
}
