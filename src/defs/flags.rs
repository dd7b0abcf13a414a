use bitflags::bitflags;

bitflags! {
    /// Behaviour / collision flags carried by every **mobj** at runtime.
    ///
    /// The low bits are copied 1-for-1 from `doom/info.h`; TOUCHY, BOUNCES
    /// and FRIEND are the MBF additions in the top nibble.
    #[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
    pub struct MobjFlags: u32 {
        // Call the pickup collaborator when touched.
        const SPECIAL        = 0x0000_0001;
        // Blocks movement.
        const SOLID          = 0x0000_0002;
        // Can be hit by bullets/projectiles.
        const SHOOTABLE      = 0x0000_0004;
        // Not linked into sector thing lists.
        const NOSECTOR       = 0x0000_0008;
        // Not linked into the blockmap.
        const NOBLOCKMAP     = 0x0000_0010;

        // AI / spawn modifiers
        const AMBUSH         = 0x0000_0020;
        const JUSTHIT        = 0x0000_0040;
        const JUSTATTACKED   = 0x0000_0080;
        const SPAWNCEILING   = 0x0000_0100;
        const NOGRAVITY      = 0x0000_0200;

        // Movement-related
        const DROPOFF        = 0x0000_0400;
        const PICKUP         = 0x0000_0800;
        const NOCLIP         = 0x0000_1000;
        const SLIDE          = 0x0000_2000;
        const FLOAT          = 0x0000_4000;
        const TELEPORT       = 0x0000_8000;

        // Projectiles / drops
        const MISSILE        = 0x0001_0000;
        const DROPPED        = 0x0002_0000;

        const SHADOW         = 0x0004_0000;
        const NOBLOOD        = 0x0008_0000;
        const CORPSE         = 0x0010_0000;
        const INFLOAT        = 0x0020_0000;

        const COUNTKILL      = 0x0040_0000;
        const COUNTITEM      = 0x0080_0000;

        const SKULLFLY       = 0x0100_0000;
        const NOTDMATCH      = 0x0200_0000;
        const TRANSLATION    = 0x0C00_0000;

        // MBF: dies on contact with solids (mines).
        const TOUCHY         = 0x1000_0000;
        // MBF: bounces off floors, ceilings and walls.
        const BOUNCES        = 0x2000_0000;
        // MBF: friendly to players, ignores monster blockers.
        const FRIEND         = 0x4000_0000;
    }
}

bitflags! {
    /// Engine extension flags, second word.
    #[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
    pub struct MobjFlags2: u32 {
        const FLOATBOB          = 0x0000_0001;
        const PUSHABLE          = 0x0000_0002;
        const CANTLEAVEFLOORPIC = 0x0000_0004;
        const INVULNERABLE      = 0x0000_0008;
        const DORMANT           = 0x0000_0010;
    }
}

bitflags! {
    /// Engine extension flags, third word.
    #[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
    pub struct MobjFlags3: u32 {
        // Telefrags whatever it lands on, on every map.
        const TELESTOMP      = 0x0000_0001;
        const FLOORMISSILE   = 0x0000_0002;
        // Can pass over / under other things.
        const PASSMOBJ       = 0x0000_0004;
        const DONTOVERLAP    = 0x0000_0008;
        // May step onto other things like a COUNTKILL monster.
        const KILLABLE       = 0x0000_0010;
        const GHOST          = 0x0000_0020;
        const THRUGHOST      = 0x0000_0040;
        // Ripper projectile.
        const RIP            = 0x0000_0080;
        const CANNOTPUSH     = 0x0000_0100;
        // Decorations that clip missiles with their spawn height.
        const DECORATION3D   = 0x0000_0200;
        // Not stopped by monster-blocking lines.
        const MONSTERPASS    = 0x0000_0400;
    }
}

bitflags! {
    /// Engine-internal state bits, never set by thing definitions.
    #[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
    pub struct MobjIntFlags: u32 {
        // Armed touchy thing.
        const ARMED   = 0x0000_0001;
        // Torque-driven fall off a ledge in progress.
        const FALLING = 0x0000_0002;
        // Standing on another thing.
        const ONMOBJ  = 0x0000_0004;
        // Hypothetical position check: do not detonate touchies.
        const NOTOUCH = 0x0000_0008;
    }
}
