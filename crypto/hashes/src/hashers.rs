use crate::Hash;
use sha2::{Digest, Sha384};

pub trait HasherBase {
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self;
}

pub trait Hasher: HasherBase + Clone + Default {
    fn finalize(self) -> Hash;
    fn reset(&mut self);
    #[inline(always)]
    fn hash<A: AsRef<[u8]>>(data: A) -> Hash {
        let mut hasher = Self::default();
        hasher.update(data);
        hasher.finalize()
    }
}

/// Incremental SHA-384 hasher
#[derive(Clone, Default)]
pub struct Sha384Hasher(Sha384);

impl Sha384Hasher {
    #[inline]
    pub fn new() -> Self {
        Self(Sha384::new())
    }
}

impl HasherBase for Sha384Hasher {
    #[inline(always)]
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
        self.0.update(data.as_ref());
        self
    }
}

impl Hasher for Sha384Hasher {
    #[inline(always)]
    fn finalize(self) -> Hash {
        let mut bytes = [0u8; crate::HASH_SIZE];
        bytes.copy_from_slice(&self.0.finalize());
        Hash::from_bytes(bytes)
    }

    #[inline(always)]
    fn reset(&mut self) {
        self.0.reset();
    }
}
