use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::{aliases::B32, B256};
use config::Forks;
use ssz_types::typenum::U512;
use ssz_types::BitVector;
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

use crate::constants::{
    DOMAIN_SYNC_COMMITTEE, EPOCHS_PER_SYNC_COMMITTEE_PERIOD, SLOTS_PER_EPOCH, SLOT_DURATION,
};
use crate::types::{BLSPubKey, SyncCommittee};

#[derive(TreeHash)]
struct ForkData {
    current_version: B32,
    genesis_validators_root: B256,
}

#[derive(TreeHash)]
struct SigningData {
    object_root: B256,
    domain: B256,
}

pub fn calc_sync_period(slot: u64) -> u64 {
    // 8192 slots per sync committee period
    slot / (SLOTS_PER_EPOCH * EPOCHS_PER_SYNC_COMMITTEE_PERIOD)
}

pub fn expected_current_slot(now: SystemTime, genesis_time: u64) -> u64 {
    let now = now
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| panic!("unreachable"))
        .as_secs();

    let since_genesis = now.saturating_sub(genesis_time);
    since_genesis / SLOT_DURATION
}

pub fn get_bits(bitfield: &BitVector<U512>) -> u64 {
    bitfield.iter().filter(|bit| *bit).count() as u64
}

/// Collects the public keys of the committee members whose participation bit
/// is set, in committee order.
pub fn get_participating_keys(
    committee: &SyncCommittee,
    bitfield: &BitVector<U512>,
) -> Vec<BLSPubKey> {
    bitfield
        .iter()
        .zip(committee.pubkeys.iter())
        .filter(|(bit, _)| *bit)
        .map(|(_, pubkey)| *pubkey)
        .collect()
}

/// Selects the latest fork whose activation epoch is not after the slot's
/// epoch.
pub fn calculate_fork_version(forks: &Forks, slot: u64) -> B32 {
    let epoch = slot / SLOTS_PER_EPOCH;

    if epoch >= forks.deneb.epoch {
        forks.deneb.fork_version
    } else if epoch >= forks.capella.epoch {
        forks.capella.fork_version
    } else if epoch >= forks.bellatrix.epoch {
        forks.bellatrix.fork_version
    } else if epoch >= forks.altair.epoch {
        forks.altair.fork_version
    } else {
        forks.genesis.fork_version
    }
}

pub fn compute_fork_data_root(current_version: B32, genesis_validators_root: B256) -> B256 {
    ForkData {
        current_version,
        genesis_validators_root,
    }
    .tree_hash_root()
}

/// The signing domain is the 4-byte domain type followed by the first 28
/// bytes of the fork data root.
pub fn compute_domain(domain_type: [u8; 4], fork_data_root: B256) -> B256 {
    let mut domain = [0u8; 32];
    domain[..4].copy_from_slice(&domain_type);
    domain[4..].copy_from_slice(&fork_data_root[..28]);
    B256::from(domain)
}

pub fn compute_signing_root(object_root: B256, domain: B256) -> B256 {
    SigningData {
        object_root,
        domain,
    }
    .tree_hash_root()
}

pub fn compute_committee_sign_root(header_root: B256, fork_data_root: B256) -> B256 {
    let domain = compute_domain(DOMAIN_SYNC_COMMITTEE, fork_data_root);
    compute_signing_root(header_root, domain)
}

#[cfg(test)]
mod tests {
    use alloy_primitives::fixed_bytes;
    use config::Fork;

    use super::*;

    fn forks() -> Forks {
        Forks {
            genesis: Fork {
                epoch: 0,
                fork_version: fixed_bytes!("00000000"),
            },
            altair: Fork {
                epoch: 10,
                fork_version: fixed_bytes!("01000000"),
            },
            bellatrix: Fork {
                epoch: 20,
                fork_version: fixed_bytes!("02000000"),
            },
            capella: Fork {
                epoch: 30,
                fork_version: fixed_bytes!("03000000"),
            },
            deneb: Fork {
                epoch: 40,
                fork_version: fixed_bytes!("04000000"),
            },
        }
    }

    #[test]
    fn sync_period_boundaries() {
        assert_eq!(calc_sync_period(0), 0);
        assert_eq!(calc_sync_period(8191), 0);
        assert_eq!(calc_sync_period(8192), 1);
        assert_eq!(calc_sync_period(16383), 1);
        assert_eq!(calc_sync_period(16384), 2);
    }

    #[test]
    fn fork_version_selection() {
        let forks = forks();
        // slot 0 -> epoch 0 -> genesis
        assert_eq!(calculate_fork_version(&forks, 0), forks.genesis.fork_version);
        // last slot of epoch 9 is still genesis
        assert_eq!(
            calculate_fork_version(&forks, 10 * 32 - 1),
            forks.genesis.fork_version
        );
        // first slot of epoch 10 activates altair
        assert_eq!(
            calculate_fork_version(&forks, 10 * 32),
            forks.altair.fork_version
        );
        assert_eq!(
            calculate_fork_version(&forks, 25 * 32),
            forks.bellatrix.fork_version
        );
        assert_eq!(
            calculate_fork_version(&forks, 1_000_000),
            forks.deneb.fork_version
        );
    }

    #[test]
    fn domain_layout() {
        let fork_data_root = B256::repeat_byte(0xab);
        let domain = compute_domain(DOMAIN_SYNC_COMMITTEE, fork_data_root);

        assert_eq!(domain.len(), 32);
        assert_eq!(&domain[..4], &DOMAIN_SYNC_COMMITTEE);
        assert_eq!(&domain[4..], &fork_data_root[..28]);
    }

    #[test]
    fn fork_data_root_is_version_sensitive() {
        let genesis_root = B256::repeat_byte(0x11);
        let a = compute_fork_data_root(fixed_bytes!("00000000"), genesis_root);
        let b = compute_fork_data_root(fixed_bytes!("01000000"), genesis_root);
        assert_ne!(a, b);
        assert_eq!(
            a,
            compute_fork_data_root(fixed_bytes!("00000000"), genesis_root)
        );
    }

    #[test]
    fn signing_root_changes_with_domain() {
        let object_root = B256::repeat_byte(0x22);
        let a = compute_signing_root(object_root, B256::repeat_byte(0x01));
        let b = compute_signing_root(object_root, B256::repeat_byte(0x02));
        assert_ne!(a, b);
    }

    #[test]
    fn participating_keys_follow_bit_order() {
        let mut pubkeys = Vec::new();
        for i in 0..512u64 {
            let mut bytes = [0u8; 48];
            bytes[..8].copy_from_slice(&i.to_le_bytes());
            pubkeys.push(BLSPubKey::from_slice(&bytes));
        }
        let committee = SyncCommittee {
            pubkeys: pubkeys.clone().into(),
            aggregate_pubkey: BLSPubKey::ZERO,
        };

        let mut bits: BitVector<U512> = BitVector::new();
        // bit 0 of byte 0, bit 3 of byte 1, bit 7 of byte 63
        bits.set(0, true).unwrap();
        bits.set(11, true).unwrap();
        bits.set(511, true).unwrap();

        assert_eq!(get_bits(&bits), 3);

        let keys = get_participating_keys(&committee, &bits);
        assert_eq!(keys, vec![pubkeys[0], pubkeys[11], pubkeys[511]]);
    }

    #[test]
    fn expected_slot_matches_wall_clock() {
        let genesis_time = 1_600_000_000;
        let now = UNIX_EPOCH + std::time::Duration::from_secs(genesis_time + 10 * SLOT_DURATION + 3);
        assert_eq!(expected_current_slot(now, genesis_time), 10);
    }
}
