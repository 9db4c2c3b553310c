use blst::min_pk::{PublicKey, Signature};
use blst::BLST_ERROR;

use crate::types::{BLSPubKey, SignatureBytes};

/// Domain separation tag for BLS12-381 signatures over G2, as used by the
/// beacon chain.
pub const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// Verifies one aggregate signature over one 32-byte signing root for an
/// unordered set of public keys. An empty key set never verifies.
pub fn is_aggregate_valid(signature: &SignatureBytes, msg: &[u8], pubkeys: &[BLSPubKey]) -> bool {
    if pubkeys.is_empty() {
        return false;
    }

    let Ok(signature) = Signature::from_bytes(signature.as_slice()) else {
        return false;
    };

    let pubkeys = pubkeys
        .iter()
        .map(|pubkey| PublicKey::from_bytes(pubkey.as_slice()))
        .collect::<Result<Vec<_>, _>>();
    let Ok(pubkeys) = pubkeys else {
        return false;
    };

    let pubkey_refs = pubkeys.iter().collect::<Vec<_>>();
    signature.fast_aggregate_verify(true, msg, DST, &pubkey_refs) == BLST_ERROR::BLST_SUCCESS
}
