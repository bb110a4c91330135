//! Per-version structural differences
//!
//! Known versions:
//! - 2: 20-byte header (4 extra reserved bytes)
//! - 3: 16-byte header, passes carry an "unknown children" collection
//! - 4+: sub-objects gain an 88-byte leading block, techniques an 8-byte
//!   trailer, and passes drop the unknown children and shrink structure C

use crate::schema::EntityKind;

/// Format version stored in the library header
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormatVersion(pub u32);

impl FormatVersion {
    pub const V2: Self = Self(2);
    pub const V3: Self = Self(3);
    pub const V4: Self = Self(4);

    /// Look up the structural policy for this version
    pub fn policy(self) -> VersionPolicy {
        let modern = self.0 >= 4;
        VersionPolicy {
            header_size: if self.0 == 2 { 20 } else { 16 },
            header_extra: self.0 == 2,
            pass_unknown_children: !modern,
            sub_object_prefix: modern,
            technique_trailer: modern,
            pass_tail_len: if modern { 32 } else { 40 },
        }
    }
}

impl Default for FormatVersion {
    fn default() -> Self {
        Self::V4
    }
}

impl std::fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Structural switches selected by a [`FormatVersion`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionPolicy {
    /// Size of the file header in bytes
    pub header_size: u32,
    /// Whether the header carries 4 extra reserved bytes
    pub header_extra: bool,
    /// Whether passes store the 26-byte unknown child collection
    pub pass_unknown_children: bool,
    /// Whether each sub-object starts with an 88-byte reserved block
    pub sub_object_prefix: bool,
    /// Whether techniques end with an 8-byte reserved block
    pub technique_trailer: bool,
    /// Size of the trailing reserved pass structure
    pub pass_tail_len: usize,
}

impl VersionPolicy {
    pub const SUB_OBJECT_PREFIX_LEN: usize = 88;
    pub const TECHNIQUE_TRAILER_LEN: usize = 8;

    /// Fixed header size of an entity kind under this policy
    pub fn record_size(&self, kind: EntityKind) -> u32 {
        match kind {
            EntityKind::Template => 0x28,
            EntityKind::Technique => {
                let trailer = if self.technique_trailer {
                    Self::TECHNIQUE_TRAILER_LEN as u32
                } else {
                    0
                };
                80 + 5 * self.record_size(EntityKind::SubObject) + trailer
            }
            EntityKind::SubObject => {
                if self.sub_object_prefix {
                    72 + Self::SUB_OBJECT_PREFIX_LEN as u32
                } else {
                    72
                }
            }
            EntityKind::Pass => {
                let children = if self.pass_unknown_children { 8 } else { 0 };
                128 + children + self.pass_tail_len as u32
            }
            EntityKind::ShaderProperty => 0x34,
            EntityKind::UiProperty => 20,
            EntityKind::RenderState => 8,
            EntityKind::UnknownChild => 26,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_size() {
        assert_eq!(FormatVersion::V2.policy().header_size, 20);
        assert_eq!(FormatVersion::V3.policy().header_size, 16);
        assert_eq!(FormatVersion::V4.policy().header_size, 16);
        assert!(FormatVersion::V2.policy().header_extra);
        assert!(!FormatVersion::V4.policy().header_extra);
    }

    #[test]
    fn test_legacy_record_sizes() {
        let policy = FormatVersion::V3.policy();
        assert_eq!(policy.record_size(EntityKind::Template), 0x28);
        assert_eq!(policy.record_size(EntityKind::Technique), 0x1B8);
        assert_eq!(policy.record_size(EntityKind::Pass), 0xB0);
        assert_eq!(policy.record_size(EntityKind::ShaderProperty), 0x34);
        assert_eq!(policy.record_size(EntityKind::UiProperty), 20);
        assert_eq!(policy.record_size(EntityKind::RenderState), 8);
        assert_eq!(policy.record_size(EntityKind::UnknownChild), 26);
    }

    #[test]
    fn test_modern_record_sizes() {
        let policy = FormatVersion::V4.policy();
        // 80 fixed + 5 × (72 + 88) + 8 trailer
        assert_eq!(policy.record_size(EntityKind::Technique), 888);
        assert_eq!(policy.record_size(EntityKind::SubObject), 160);
        // no unknown children, 32-byte structure C
        assert_eq!(policy.record_size(EntityKind::Pass), 0xA0);
    }

    #[test]
    fn test_policy_switches() {
        let legacy = FormatVersion::V3.policy();
        assert!(legacy.pass_unknown_children);
        assert!(!legacy.sub_object_prefix);
        assert_eq!(legacy.pass_tail_len, 40);

        let modern = FormatVersion(7).policy();
        assert!(!modern.pass_unknown_children);
        assert!(modern.sub_object_prefix);
        assert!(modern.technique_trailer);
        assert_eq!(modern.pass_tail_len, 32);
    }
}
