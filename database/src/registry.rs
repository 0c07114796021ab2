use enum_primitive_derive::Primitive;

/// Reserved as a separator between nested key parts, never used as a store prefix
pub const SEPARATOR: u8 = u8::MAX;

#[derive(Primitive, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DatabaseStorePrefixes {
    // ---- Block stream ----
    BlockStreamInfo = 1,

    // ---- Separator ----
    /// Reserved as a separator
    Separator = SEPARATOR,
}

impl From<DatabaseStorePrefixes> for Vec<u8> {
    fn from(value: DatabaseStorePrefixes) -> Self {
        [value as u8].to_vec()
    }
}

impl From<DatabaseStorePrefixes> for u8 {
    fn from(value: DatabaseStorePrefixes) -> Self {
        value as u8
    }
}

impl AsRef<[u8]> for DatabaseStorePrefixes {
    fn as_ref(&self) -> &[u8] {
        // SAFETY: enum has repr(u8)
        std::slice::from_ref(unsafe { &*(self as *const Self as *const u8) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn test_as_ref() {
        let prefix = DatabaseStorePrefixes::BlockStreamInfo;
        assert_eq!(&[prefix as u8], prefix.as_ref());
        assert_eq!(size_of::<u8>(), size_of::<DatabaseStorePrefixes>());
        assert_eq!(DatabaseStorePrefixes::from_u8(SEPARATOR), Some(DatabaseStorePrefixes::Separator));
        assert_eq!(DatabaseStorePrefixes::from_u8(0), None);
    }
}
