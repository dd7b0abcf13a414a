use glam::{Vec2, Vec3};
use hecs::Entity;

use crate::defs::{MobjFlags, MobjFlags2, MobjFlags3, MobjIntFlags, MobjKind};
use crate::world::{Bam, GroupId, ORIG_FRICTION, ORIG_FRICTION_FACTOR, SectorId};

/// Per-player data the clipping code touches.
#[derive(Debug, Clone, Copy)]
pub struct PlayerState {
    /// Set on voodoo dolls: a player body that is not the player's view.
    pub voodoo: bool,
    pub view_height: f32,
    pub view_z: f32,
    /// View-bob momentum, clamped to the body's momentum after a slide.
    pub bob_mom: Vec2,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            voodoo: false,
            view_height: 41.0, // vanilla VIEWHEIGHT
            view_z: 0.0,
            bob_mom: Vec2::ZERO,
        }
    }
}

/// The single hecs component carried by every map object.
///
/// Position is the centre of the bottom of the thing's cylinder. The
/// `*z` caches hold the last committed clip result.
#[derive(Debug, Clone, Copy)]
pub struct Mobj {
    pub kind: MobjKind,
    pub pos: Vec3,
    pub mom: Vec3,
    pub angle: Bam,

    pub radius: f32,
    pub height: f32,
    /// Spawn height from the thing table.
    pub info_height: f32,
    pub mass: i32,
    pub damage: i32,
    pub health: i32,
    /// Has a chase state, i.e. it can act on its own.
    pub has_seestate: bool,

    pub flags: MobjFlags,
    pub flags2: MobjFlags2,
    pub flags3: MobjFlags3,
    pub intflags: MobjIntFlags,

    /// Torque gear, 0..=MAXGEAR.
    pub gear: u32,
    pub floatbob: u32,
    pub target: Option<Entity>,
    pub player: Option<PlayerState>,

    pub sector: SectorId,
    pub group_id: GroupId,

    pub floorz: f32,
    pub ceilingz: f32,
    pub dropoffz: f32,
    pub secfloorz: f32,
    pub secceilz: f32,
    pub passfloorz: f32,
    pub passceilz: f32,

    /// Friction picked up while moving, vanilla scale. Old demos only.
    pub friction: i32,
    pub movefactor: i32,
}

impl Mobj {
    /// A thing of `kind` with the given footprint; everything else zeroed.
    pub fn new(kind: MobjKind, pos: Vec3, radius: f32, height: f32, flags: MobjFlags) -> Self {
        Self {
            kind,
            pos,
            mom: Vec3::ZERO,
            angle: 0,
            radius,
            height,
            info_height: height,
            mass: 100,
            damage: 0,
            health: 1000,
            has_seestate: false,
            flags,
            flags2: MobjFlags2::empty(),
            flags3: MobjFlags3::empty(),
            intflags: MobjIntFlags::empty(),
            gear: 0,
            floatbob: 0,
            target: None,
            player: None,
            sector: 0,
            group_id: 0,
            floorz: pos.z,
            ceilingz: pos.z + height,
            dropoffz: pos.z,
            secfloorz: pos.z,
            secceilz: pos.z + height,
            passfloorz: pos.z,
            passceilz: pos.z + height,
            friction: ORIG_FRICTION,
            movefactor: ORIG_FRICTION_FACTOR,
        }
    }

    /// Player body: solid, shootable, 16×56, telestomps, not a voodoo doll.
    pub fn player(pos: Vec3) -> Self {
        let mut mo = Self::new(
            MobjKind::PLAYER,
            pos,
            16.0,
            56.0,
            MobjFlags::SOLID | MobjFlags::SHOOTABLE | MobjFlags::DROPOFF | MobjFlags::PICKUP,
        );
        mo.health = 100;
        mo.flags3 = MobjFlags3::TELESTOMP;
        mo.player = Some(PlayerState {
            view_z: pos.z + 41.0,
            ..PlayerState::default()
        });
        mo
    }

    #[inline]
    pub fn xy(&self) -> Vec2 {
        self.pos.truncate()
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.pos.z + self.height
    }

    /// Alive and able to act.
    #[inline]
    pub fn sentient(&self) -> bool {
        self.health > 0 && self.has_seestate
    }

    /// A player's own body (voodoo dolls excluded).
    #[inline]
    pub fn is_real_player(&self) -> bool {
        self.player.is_some_and(|p| !p.voodoo)
    }

    /// Monster-blocking lines stop this thing.
    #[inline]
    pub fn blocked_as_monster(&self) -> bool {
        !self.flags.contains(MobjFlags::FRIEND)
            && self.player.is_none()
            && !self.flags3.contains(MobjFlags3::MONSTERPASS)
    }
}
