use cavern_base::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelFlags(u8);

impl LabelFlags {
    pub const ENTRANCE: Self = Self(0x01);
    pub const FIXED: Self = Self(0x02);
    pub const EXPORTED: Self = Self(0x04);
    pub const SURFACE: Self = Self(0x08);
    pub const UNDERGROUND: Self = Self(0x10);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_entrance(self) -> bool {
        self.contains(Self::ENTRANCE)
    }

    pub fn is_fixed(self) -> bool {
        self.contains(Self::FIXED)
    }

    pub fn is_exported(self) -> bool {
        self.contains(Self::EXPORTED)
    }

    pub fn is_surface(self) -> bool {
        self.contains(Self::SURFACE)
    }

    pub fn is_underground(self) -> bool {
        self.contains(Self::UNDERGROUND)
    }
}

impl std::ops::BitOr for LabelFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A named station.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub pos: Vec3,
    pub text: String,
    #[serde(default)]
    pub flags: LabelFlags,
}

impl LabelRecord {
    pub fn new(pos: Vec3, text: impl Into<String>, flags: LabelFlags) -> Self {
        Self {
            pos,
            text: text.into(),
            flags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_combine() {
        let flags = LabelFlags::ENTRANCE | LabelFlags::FIXED;
        assert!(flags.is_entrance());
        assert!(flags.is_fixed());
        assert!(!flags.is_exported());
        assert_eq!(flags.bits(), 0x03);
    }
}
