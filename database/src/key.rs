use crate::registry::DatabaseStorePrefixes;
use num_traits::FromPrimitive;
use std::fmt::{Debug, Display};

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DbKey {
    path: Vec<u8>,
    prefix_len: usize,
}

impl DbKey {
    pub fn new<TKey: AsRef<[u8]>>(prefix: &[u8], key: TKey) -> Self {
        Self { path: prefix.iter().chain(key.as_ref().iter()).copied().collect(), prefix_len: prefix.len() }
    }

    pub fn prefix_only(prefix: &[u8]) -> Self {
        Self { path: prefix.to_vec(), prefix_len: prefix.len() }
    }

    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }
}

impl AsRef<[u8]> for DbKey {
    fn as_ref(&self) -> &[u8] {
        &self.path
    }
}

impl Display for DbKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (prefix, key) = self.path.split_at(self.prefix_len);
        match prefix.first().copied().and_then(DatabaseStorePrefixes::from_u8) {
            Some(store) if prefix.len() == 1 => write!(f, "{:?}", store)?,
            _ => f.write_str(&faster_hex::hex_string(prefix))?,
        }
        if !key.is_empty() {
            write!(f, "/{}", faster_hex::hex_string(key))?;
        }
        Ok(())
    }
}

impl Debug for DbKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}
