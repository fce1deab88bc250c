use sha3::{Digest, Keccak256};

use crate::H256;

/// Keccak256 over the concatenation of all parts.
pub fn keccak256_concat<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> H256 {
    let hasher = parts
        .into_iter()
        .fold(Keccak256::new(), |hasher, part| hasher.chain_update(part));
    H256::from_slice(hasher.finalize().as_slice())
}

/// Current unix time in seconds, saturating into the 4 byte wire timestamp.
pub fn unix_now() -> u32 {
    u32::try_from(chrono::Utc::now().timestamp().max(0)).unwrap_or(u32::MAX)
}

/// Shortcut for many-to-one match statements that get very redundant. Flips the
/// order such that the thing which is mapped to is listed first.
///
/// ```ignore
/// match self {
///   V1 => A,
///   V2 => A,
///   V3 => B,
///   V4 => B,
/// }
///
/// // becomes
///
/// many_to_one!(match self {
///     A: [V1, V2],
///     B: [V3, V4],
/// })
/// ```
macro_rules! many_to_one {
    (match $target:ident {
        $($output:path: [$($input:path),* $(,)?]),* $(,)?
    }) => {
        match $target {
            $($($input)|* => $output,)*
        }
    };
}

pub(crate) use many_to_one;
