use std::fmt::{self, Debug, Display, Formatter};

use ecow::EcoString;

use crate::diag::{bail, StrResult};

/// The name of the distinguished ground tag.
pub const GROUND: &str = "ground";

/// The name of the blockage tag.
pub const BLOCKAGE: &str = "blockage";

/// The region of the die a rectangle belongs to.
#[derive(Default, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Free die area, usable by any module.
    #[default]
    Ground,
    /// Area no module may occupy.
    Blockage,
    /// A user-defined region.
    Named(EcoString),
}

impl Tag {
    /// Parse a tag from its textual name.
    ///
    /// `ground` and `blockage` are reserved and map to the corresponding
    /// variants; anything else must be a valid identifier.
    pub fn parse(name: &str) -> StrResult<Self> {
        match name {
            GROUND => Ok(Self::Ground),
            BLOCKAGE => Ok(Self::Blockage),
            _ if is_identifier(name) => Ok(Self::Named(name.into())),
            _ => bail!("invalid region tag: {name:?}"),
        }
    }

    /// The textual name of the tag.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ground => GROUND,
            Self::Blockage => BLOCKAGE,
            Self::Named(name) => name,
        }
    }

    /// Whether this is the ground tag.
    pub fn is_ground(&self) -> bool {
        matches!(self, Self::Ground)
    }

    /// Whether this is the blockage tag.
    pub fn is_blockage(&self) -> bool {
        matches!(self, Self::Blockage)
    }
}

impl Debug for Tag {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Tag({})", self.as_str())
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a string is a valid identifier: a letter or underscore followed
/// by letters, digits or underscores.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reserved_tags() {
        assert_eq!(Tag::parse("ground").unwrap(), Tag::Ground);
        assert_eq!(Tag::parse("blockage").unwrap(), Tag::Blockage);
        assert_eq!(Tag::parse("sram_1").unwrap(), Tag::Named("sram_1".into()));
        assert!(Tag::parse("1sram").is_err());
        assert!(Tag::parse("").is_err());
        assert!(Tag::parse("a-b").is_err());
    }
}
