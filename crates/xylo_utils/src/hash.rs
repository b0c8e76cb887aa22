//! Hash states and container aliases, re-exports *hashbrown* and *foldhash*.
//!
//! [`FixedHashState`] is based on the `foldhash` crate with a fixed seed, so
//! hash results depend only on the input and stay stable across runs.
//!
//! [`PassHashState`] forwards the key bits unmodified; it is meant for keys
//! that are already high-entropy, such as `TypeId`.

use core::hash::{BuildHasher, Hasher};

use foldhash::fast::{FixedState, FoldHasher};

// -----------------------------------------------------------------------------
// FixedHashState

const FIXED_SEED: FixedState = FixedState::with_seed(0xD1B5_4A32_D192_ED03);

/// Hasher produced by [`FixedHashState`].
pub type FixedHasher = FoldHasher<'static>;

/// A seedless hash state whose results depend only on the hashed input.
///
/// # Examples
///
/// ```
/// use core::hash::{BuildHasher, Hash, Hasher};
/// use xylo_utils::hash::FixedHashState;
///
/// let mut a = FixedHashState.build_hasher();
/// let mut b = FixedHashState.build_hasher();
/// "tag".hash(&mut a);
/// "tag".hash(&mut b);
/// assert_eq!(a.finish(), b.finish());
/// ```
#[derive(Copy, Clone, Default, Debug)]
pub struct FixedHashState;

impl BuildHasher for FixedHashState {
    type Hasher = FixedHasher;

    #[inline(always)]
    fn build_hasher(&self) -> Self::Hasher {
        FIXED_SEED.build_hasher()
    }
}

// -----------------------------------------------------------------------------
// PassHashState

/// A hasher that passes a single `u64` write through as the hash value.
///
/// Multi-byte writes fold bytes into the accumulator; a lone `write_u64`
/// reproduces its input exactly.
#[derive(Copy, Clone, Default, Debug)]
pub struct PassHasher {
    hash: u64,
}

impl Hasher for PassHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.hash
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes.iter().rev() {
            self.hash = self.hash.rotate_left(8).wrapping_add(u64::from(*byte));
        }
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.hash = i;
    }
}

/// Hash state for keys that are already well distributed (e.g. `TypeId`).
#[derive(Copy, Clone, Default, Debug)]
pub struct PassHashState;

impl BuildHasher for PassHashState {
    type Hasher = PassHasher;

    #[inline(always)]
    fn build_hasher(&self) -> Self::Hasher {
        PassHasher { hash: 0 }
    }
}

// -----------------------------------------------------------------------------
// Container aliases

/// A [`hashbrown::HashMap`] using [`FixedHashState`].
pub type HashMap<K, V, S = FixedHashState> = hashbrown::HashMap<K, V, S>;

/// A [`hashbrown::HashSet`] using [`FixedHashState`].
pub type HashSet<T, S = FixedHashState> = hashbrown::HashSet<T, S>;

// -----------------------------------------------------------------------------
// Re-export crates

pub use foldhash;
pub use hashbrown;

#[cfg(test)]
mod tests {
    use super::*;
    use core::hash::{BuildHasher, Hash, Hasher};

    #[test]
    fn pass_hasher_forwards_u64() {
        let mut hasher = PassHashState.build_hasher();
        17_u64.hash(&mut hasher);
        assert_eq!(hasher.finish(), 17);
    }

    #[test]
    fn fixed_state_is_reproducible() {
        let one = FixedHashState.hash_one("body");
        let two = FixedHashState.hash_one("body");
        assert_eq!(one, two);
    }
}
