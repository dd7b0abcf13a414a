//! Vertical gap through a two-sided line.

use super::{MapSim, Mobj};
use crate::defs::MobjFlags;
use crate::world::{LinedefFlags, LinedefId, NO_TEXTURE, TextureId};

/// Offset applied to heights behind a linked floor or ceiling portal so
/// that they never clip anything on this side.
pub(crate) const PORTAL_BIAS: f32 = 1024.0;

/// Step a walker can take without jumping.
pub(crate) const STEPSIZE: f32 = 24.0;

/// Result of [`MapSim::line_opening`].
///
/// `range <= 0` means the line is closed for the mover.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LineOpening {
    pub top: f32,
    pub bottom: f32,
    pub range: f32,
    /// The lower of the two floors.
    pub lowfloor: f32,
    /// Opening from sector heights alone, before mid textures.
    pub sec_floor: f32,
    pub sec_ceil: f32,
    /// Floor flat of the higher side.
    pub floorpic: TextureId,
    /// The mover stands on (or within a step of) a 3D mid texture.
    pub touch3dside: bool,
}

impl MapSim {
    /// Opening of `line` as seen by `mover`.
    ///
    /// Without a mover the 3D mid texture and portal adjustments are
    /// skipped: those only make sense for something with a position.
    pub fn line_opening(&self, line: LinedefId, mover: Option<&Mobj>) -> LineOpening {
        let ld = &self.level.linedefs[line as usize];
        let Some(back) = ld.back_sector else {
            return LineOpening::default();
        };
        let front = &self.level.sectors[ld.front_sector as usize];
        let back = &self.level.sectors[back as usize];

        let (mut fceil, mut bceil) = (front.ceil_h, back.ceil_h);
        let (mut ffloor, mut bfloor) = (front.floor_h, back.floor_h);

        if self.compat.linked_portals() && mover.is_some() && self.portals.enabled() {
            if front.ceiling_portal.is_some() && front.ceiling_portal == back.ceiling_portal {
                fceil = front.ceil_h + PORTAL_BIAS;
                bceil = fceil;
            }
            if front.floor_portal.is_some() && front.floor_portal == back.floor_portal {
                ffloor = front.floor_h - PORTAL_BIAS;
                bfloor = ffloor;
            }
        }

        let mut op = LineOpening {
            top: fceil.min(bceil),
            ..LineOpening::default()
        };
        if ffloor > bfloor {
            op.bottom = ffloor;
            op.lowfloor = bfloor;
            op.floorpic = front.floor_pic;
        } else {
            op.bottom = bfloor;
            op.lowfloor = ffloor;
            op.floorpic = back.floor_pic;
        }
        op.sec_floor = op.bottom;
        op.sec_ceil = op.top;

        if let Some(mo) = mover {
            if self.compat.demo_version >= 331 && ld.flags.contains(LinedefFlags::MIDTEX_3D) {
                let side = ld.right_sidedef.map(|s| &self.level.sidedefs[s as usize]);
                if let Some(sd) = side.filter(|sd| sd.middle != NO_TEXTURE) {
                    // raw sector heights; portal bias does not move textures
                    let otop = front.ceil_h.min(back.ceil_h);
                    let obot = front.floor_h.max(back.floor_h);
                    let (textop, texbot) = if ld.flags.contains(LinedefFlags::LOWER_UNPEGGED) {
                        let bot = obot + sd.y_off;
                        (bot + sd.middle_height, bot)
                    } else {
                        let top = otop + sd.y_off;
                        (top, top - sd.middle_height)
                    };
                    let texmid = texbot + (textop - texbot) / 2.0;

                    if ld.flags.contains(LinedefFlags::BLOCK_MONSTERS)
                        && !mo.flags.intersects(MobjFlags::FLOAT | MobjFlags::DROPOFF)
                        && (mo.pos.z - textop).abs() <= STEPSIZE
                    {
                        op.top = op.bottom;
                        op.range = 0.0;
                        return op;
                    }

                    if mo.pos.z + mo.info_height / 2.0 < texmid {
                        op.top = op.top.min(texbot);
                    } else {
                        op.bottom = op.bottom.max(textop);
                        if (mo.pos.z - textop).abs() <= STEPSIZE {
                            op.touch3dside = true;
                        }
                    }
                }
            }
        }

        op.range = op.top - op.bottom;
        op
    }
}
