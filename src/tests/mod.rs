mod equality;
mod shape;

/// Keys and a hasher with fully controlled 32-bit trie hashes.
pub(crate) mod support {
    use std::hash::{BuildHasher, Hash, Hasher};

    /// Key whose trie hash is exactly the XOR-fold of the wrapped value:
    /// pick a value below 2^32 and that value *is* the 32-bit hash.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DirectKey(pub u64);

    impl Hash for DirectKey {
        fn hash<H: Hasher>(&self, state: &mut H) {
            state.write_u64(self.0);
        }
    }

    /// Build-hasher whose hasher passes a written `u64` through unchanged.
    #[derive(Debug, Default, Clone)]
    pub struct Passthrough;

    pub struct PassthroughHasher(u64);

    impl BuildHasher for Passthrough {
        type Hasher = PassthroughHasher;

        fn build_hasher(&self) -> PassthroughHasher {
            PassthroughHasher(0)
        }
    }

    impl Hasher for PassthroughHasher {
        fn finish(&self) -> u64 {
            self.0
        }

        fn write(&mut self, bytes: &[u8]) {
            for &b in bytes {
                self.0 = self.0.rotate_left(8) ^ u64::from(b);
            }
        }

        fn write_u64(&mut self, n: u64) {
            self.0 = n;
        }
    }

    pub type DirectMap<V> = crate::HamtMap<DirectKey, V, Passthrough>;

    /// Two distinct keys whose folded 32-bit hashes are both 1.
    pub fn colliding_pair() -> (DirectKey, DirectKey) {
        (DirectKey(1), DirectKey((5 << 32) | 4))
    }
}
