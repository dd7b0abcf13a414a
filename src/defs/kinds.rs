//! Thing type ids that the clipping rules single out by name.
//!
//! Numbering follows the vanilla `mobjtype_t` order so ids coming from a
//! DeHackEd-style thing table can be used unchanged.

/// Index into the thing-type table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct MobjKind(pub u16);

impl MobjKind {
    pub const PLAYER: MobjKind = MobjKind(0);
    pub const BRUISER: MobjKind = MobjKind(15);
    pub const KNIGHT: MobjKind = MobjKind(17);
    pub const SKULL: MobjKind = MobjKind(18);
    pub const PAIN: MobjKind = MobjKind(22);
    pub const BARREL: MobjKind = MobjKind(30);
    pub const BLOOD: MobjKind = MobjKind(38);

    /// Missile pass-through rule: a projectile never hurts things of its
    /// shooter's species.  Hell knights and barons share one species.
    #[inline]
    pub fn same_species(self, other: MobjKind) -> bool {
        self == other
            || (self == Self::KNIGHT && other == Self::BRUISER)
            || (self == Self::BRUISER && other == Self::KNIGHT)
    }

    /// Touch-death rule: pain elementals and lost souls count as one kind
    /// when one of them touches a touchy version of the other.
    #[inline]
    pub fn pe_skull_pair(touchy: MobjKind, toucher: MobjKind) -> bool {
        (touchy == Self::PAIN && toucher == Self::SKULL)
            || (touchy == Self::SKULL && toucher == Self::PAIN)
    }
}

#[cfg(test)]
mod tests {
    use super::MobjKind;

    #[test]
    fn knights_and_barons_share_species() {
        assert!(MobjKind::KNIGHT.same_species(MobjKind::BRUISER));
        assert!(MobjKind::BRUISER.same_species(MobjKind::KNIGHT));
        assert!(MobjKind::SKULL.same_species(MobjKind::SKULL));
        assert!(!MobjKind::SKULL.same_species(MobjKind::PAIN));
    }

    #[test]
    fn pain_and_skull_pair_is_symmetric() {
        assert!(MobjKind::pe_skull_pair(MobjKind::PAIN, MobjKind::SKULL));
        assert!(MobjKind::pe_skull_pair(MobjKind::SKULL, MobjKind::PAIN));
        assert!(!MobjKind::pe_skull_pair(MobjKind::PAIN, MobjKind::PAIN));
    }
}
