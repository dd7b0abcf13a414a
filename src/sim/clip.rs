//! Clip frames.
//!
//! A [`ClipContext`] is the scratch record of one position query. The
//! [`ClipStack`] keeps one frame per nesting level: a collaborator that
//! moves things from inside a query runs on a fresh frame so the outer
//! query's results survive.

use glam::Vec2;
use hecs::Entity;
use log::debug;

use super::opening::LineOpening;
use crate::world::{Aabb, LinedefId, TextureId};

/// State of one in-flight position check.
#[derive(Clone, Debug, Default)]
pub struct ClipContext {
    pub thing: Option<Entity>,
    pub x: f32,
    pub y: f32,
    pub bbox: Aabb,

    pub floorz: f32,
    pub ceilingz: f32,
    pub dropoffz: f32,
    /// Sector-only heights, ignoring 3D mid textures.
    pub secfloorz: f32,
    pub secceilz: f32,
    /// Heights missiles pass through.
    pub passfloorz: f32,
    pub passceilz: f32,
    pub floorpic: TextureId,

    pub floorline: Option<LinedefId>,
    pub ceilingline: Option<LinedefId>,
    pub blockline: Option<LinedefId>,
    pub blocking_mobj: Option<Entity>,

    /// Special and portal lines touched by this query, in contact order.
    pub spechit: Vec<LinedefId>,

    pub unstuck: bool,
    pub felldown: bool,
    pub floatok: bool,
    pub touch3dside: bool,

    /// Last line opening computed in this frame.
    pub open: LineOpening,
}

impl ClipContext {
    #[inline]
    pub fn pos(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub fn numspechit(&self) -> usize {
        self.spechit.len()
    }

    /// Zero the frame but keep the spechit allocation.
    fn reset(&mut self) {
        let mut spechit = std::mem::take(&mut self.spechit);
        spechit.clear();
        *self = ClipContext {
            spechit,
            ..ClipContext::default()
        };
    }
}

/// Pooled stack of frames. Index 0 is the base frame and is never popped.
#[derive(Debug)]
pub struct ClipStack {
    frames: Vec<ClipContext>,
    depth: usize,
}

impl Default for ClipStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipStack {
    pub fn new() -> Self {
        Self {
            frames: vec![ClipContext::default()],
            depth: 0,
        }
    }

    #[inline]
    pub fn current(&self) -> &ClipContext {
        &self.frames[self.depth]
    }

    #[inline]
    pub fn current_mut(&mut self) -> &mut ClipContext {
        &mut self.frames[self.depth]
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Enter a nested query on a zeroed frame.
    pub fn push(&mut self) -> &mut ClipContext {
        self.depth += 1;
        if self.depth == self.frames.len() {
            self.frames.push(ClipContext::default());
            debug!("clip stack grew to {} frames", self.frames.len());
        } else {
            self.frames[self.depth].reset();
        }
        &mut self.frames[self.depth]
    }

    /// Return to the caller's frame.
    ///
    /// # Panics
    /// When called on the base frame; that is a bookkeeping bug.
    pub fn pop(&mut self) {
        if self.depth == 0 {
            panic!("pop of the base clip frame");
        }
        self.depth -= 1;
    }
}
