//! Linked-portal groups.
//!
//! Sectors that touch through shared lines form a *group*: one connected
//! piece of map space. Linked portals join groups that are the same space
//! shifted by a fixed offset. [`PortalGroupTable`] stores the offset for
//! every ordered pair of groups, direct and transitive, so that a
//! position in group `a` maps to group `b` as `pos - link(a, b)`.
//!
//! Any inconsistency while building disables linked portals for the
//! whole level; movement then behaves as if no portal existed.

use glam::Vec3;
use log::{debug, warn};
use thiserror::Error;

use super::geometry::{GroupId, Level, PortalId, SectorId};

/*──────────────────────────── Error type ───────────────────────────*/

#[derive(Error, Debug, PartialEq)]
pub enum PortalError {
    #[error("sector {sector} portal {portal} references its own group {group}")]
    SelfReference {
        sector: SectorId,
        portal: PortalId,
        group: GroupId,
    },

    #[error("sector {sector} portal {portal} has a group out of range")]
    GroupOutOfRange { sector: SectorId, portal: PortalId },

    #[error("portal group {from} has two different links to group {to}")]
    Inconsistent { from: GroupId, to: GroupId },

    #[error("portal groups {from} and {to} link and backlink do not agree")]
    Asymmetric { from: GroupId, to: GroupId },

    #[error("portal group {from} links to {to} but {to} has no way back")]
    NoBacklink { from: GroupId, to: GroupId },
}

/*──────────────────────────── Table ────────────────────────────────*/

#[derive(Clone, Debug, Default)]
pub struct PortalGroupTable {
    groups: usize,
    /// Row-major `groups × groups`; `None` means "no path".
    links: Vec<Option<Vec3>>,
    enabled: bool,
}

impl PortalGroupTable {
    /// Table that answers zero for every query.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Assigns `group_id` to every sector and resolves portal targets,
    /// then builds the link table.
    ///
    /// Errors leave the sectors grouped but the table unusable.
    pub fn try_build(level: &mut Level) -> Result<Self, PortalError> {
        let groups = gather_groups(level);
        for p in level.portals.iter_mut() {
            p.target_group = level
                .sectors
                .get(p.target_sector as usize)
                .map(|s| s.group_id);
        }

        let mut table = Self {
            groups,
            links: vec![None; groups * groups],
            enabled: false,
        };

        if level.portals.is_empty() {
            debug!("{}: no linked portals, {groups} group(s)", level.name);
            return Ok(table);
        }

        /*----- 1. direct links from every sector --------------------*/
        for (si, sector) in level.sectors.iter().enumerate() {
            let portals = sector
                .ceiling_portal
                .into_iter()
                .chain(sector.floor_portal)
                .chain(
                    sector
                        .lines
                        .iter()
                        .filter_map(|&l| level.linedefs[l as usize].portal),
                );
            for pid in portals {
                table.add_direct(level, si as SectorId, pid)?;
            }
        }

        /*----- 2. every direct link must come back ------------------*/
        for a in 0..groups {
            for b in 0..groups {
                if a == b {
                    continue;
                }
                let Some(there) = table.get(a, b) else {
                    continue;
                };
                match table.get(b, a) {
                    None => return Err(PortalError::NoBacklink { from: a, to: b }),
                    Some(back) if back != -there => {
                        return Err(PortalError::Asymmetric { from: a, to: b });
                    }
                    Some(_) => {}
                }
            }
        }

        /*----- 3. transitive closure --------------------------------*/
        for g in 0..groups {
            table.gather_links(g);
        }

        table.enabled = true;
        debug!(
            "{}: linked portals enabled across {groups} group(s)",
            level.name
        );
        Ok(table)
    }

    /// Like [`try_build`](Self::try_build) but fails soft: a broken
    /// setup logs a warning and yields a disabled table.
    pub fn build(level: &mut Level) -> Self {
        match Self::try_build(level) {
            Ok(t) => t,
            Err(e) => {
                warn!("{e}; linked portals are disabled");
                Self::disabled()
            }
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn group_count(&self) -> usize {
        self.groups
    }

    /// Offset from group `a` to group `b`, or `None` for the same group,
    /// unrelated groups, out-of-range ids or a disabled table.
    pub fn get_link_offset(&self, a: GroupId, b: GroupId) -> Option<Vec3> {
        if !self.enabled || a == b {
            return None;
        }
        self.get(a, b)
    }

    /// Same as [`get_link_offset`](Self::get_link_offset) with zero for
    /// every missing entry.
    pub fn link_or_zero(&self, a: GroupId, b: GroupId) -> Vec3 {
        self.get_link_offset(a, b).unwrap_or(Vec3::ZERO)
    }

    fn get(&self, a: GroupId, b: GroupId) -> Option<Vec3> {
        if a >= self.groups || b >= self.groups {
            return None;
        }
        self.links[a * self.groups + b]
    }

    fn set(&mut self, a: GroupId, b: GroupId, v: Vec3) {
        self.links[a * self.groups + b] = Some(v);
    }

    fn add_direct(
        &mut self,
        level: &Level,
        sector: SectorId,
        pid: PortalId,
    ) -> Result<(), PortalError> {
        let from = level.sectors[sector as usize].group_id;
        let portal = level
            .portals
            .get(pid as usize)
            .ok_or(PortalError::GroupOutOfRange { sector, portal: pid })?;
        let to = match portal.target_group {
            Some(g) if g < self.groups => g,
            _ => return Err(PortalError::GroupOutOfRange { sector, portal: pid }),
        };
        if to == from {
            return Err(PortalError::SelfReference {
                sector,
                portal: pid,
                group: from,
            });
        }
        match self.get(from, to) {
            None => self.set(from, to, portal.delta),
            Some(v) if v != portal.delta => {
                return Err(PortalError::Inconsistent { from, to });
            }
            Some(_) => {}
        }
        Ok(())
    }

    /// Depth-first walk from `start` adding `start → p` for every group
    /// reachable through direct links. Existing entries win.
    fn gather_links(&mut self, start: GroupId) {
        let mut stack: Vec<(GroupId, Vec3)> = (0..self.groups)
            .filter(|&g| g != start)
            .filter_map(|g| self.get(start, g).map(|d| (g, d)))
            .collect();

        while let Some((via, acc)) = stack.pop() {
            for p in 0..self.groups {
                if p == start || p == via || self.get(start, p).is_some() {
                    continue;
                }
                let Some(step) = self.get(via, p) else {
                    continue;
                };
                let total = acc + step;
                self.set(start, p, total);
                stack.push((p, total));
            }
        }
    }
}

/// Flood fill over shared lines; linked line portals sever groups.
/// Returns the number of groups.
fn gather_groups(level: &mut Level) -> usize {
    let n = level.sectors.len();
    let mut assigned = vec![false; n];
    let mut groups = 0;
    let mut queue = Vec::new();

    for seed in 0..n {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;
        queue.push(seed);
        while let Some(si) = queue.pop() {
            level.sectors[si].group_id = groups;
            for &li in &level.sectors[si].lines {
                let ld = &level.linedefs[li as usize];
                if ld.portal.is_some() {
                    continue;
                }
                for s in std::iter::once(ld.front_sector).chain(ld.back_sector) {
                    let s = s as usize;
                    if s < n && !assigned[s] {
                        assigned[s] = true;
                        queue.push(s);
                    }
                }
            }
        }
        groups += 1;
    }
    groups.max(1)
}
