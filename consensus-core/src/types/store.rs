use super::committee::SyncCommittee;
use super::header::Header;

/// The authenticated view a light client maintains between updates.
///
/// Committees rotate by moving the `next` slot into `current`; they are
/// never mutated in place.
#[derive(Debug, Clone, Default)]
pub struct LightClientStore {
    pub finalized_header: Header,
    pub current_sync_committee: SyncCommittee,
    pub next_sync_committee: Option<SyncCommittee>,
    pub optimistic_header: Header,
    pub previous_max_active_participants: u64,
    pub current_max_active_participants: u64,
}
