use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::model::{Block, BlockId};
use crate::time::MINUTES_PER_DAY;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Pixel height of one hour on the timeline.
    pub hour_height: f64,
    /// Blocks never render shorter than this many pixels.
    pub min_pixel_height: f64,
    /// Visual minimum duration in minutes; the block itself is not changed.
    pub min_visual_minutes: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            hour_height: 60.0,
            min_pixel_height: 20.0,
            min_visual_minutes: 5,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.hour_height.is_finite() && self.hour_height > 0.0,
            "hour_height must be a positive number"
        );
        ensure!(
            self.min_pixel_height.is_finite() && self.min_pixel_height >= 0.0,
            "min_pixel_height must be >= 0"
        );
        ensure!(
            self.min_visual_minutes >= 1,
            "min_visual_minutes must be at least 1"
        );
        Ok(())
    }

    pub fn day_height(&self) -> f64 {
        self.hour_height * 24.0
    }

    pub fn pixels_per_minute(&self) -> f64 {
        self.hour_height / 60.0
    }
}

/// Render-time projection of one block. Rebuilt on every layout pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutEvent {
    pub block_id: BlockId,
    /// Absolute minutes; `end` is expanded past 1440 for overnight blocks.
    pub start: u32,
    pub end: u32,
    pub lane: usize,
    pub lane_count: usize,
    /// Fractions of the 24-hour axis.
    pub top: f64,
    pub height: f64,
    pub top_px: f64,
    pub height_px: f64,
    pub left_pct: f64,
    pub width_pct: f64,
}

impl LayoutEvent {
    pub fn duration(&self) -> u32 {
        self.end - self.start
    }

    pub fn intersects(&self, other: &LayoutEvent) -> bool {
        !(self.end <= other.start || self.start >= other.end)
    }
}

/// Packs overlapping blocks into side-by-side lanes.
///
/// Events are swept in start order and join the overlap group they
/// intersect. Lanes follow the interval-coloring rule: an event takes the
/// lowest lane not held by a group member it actually intersects, so a lane
/// is reused as soon as its previous occupant has ended. This can give fewer
/// lanes than reserving every lane already used anywhere in the group. All
/// members of a group share the group's lane count so columns are equal width.
pub fn compute_layout(blocks: &[Block], config: &LayoutConfig) -> Vec<LayoutEvent> {
    let day = f64::from(MINUTES_PER_DAY);
    let min_visual = config.min_visual_minutes.max(1);

    let mut events: Vec<LayoutEvent> = blocks
        .iter()
        .map(|block| {
            let start = block.absolute_start();
            let end = block.absolute_end().max(start + min_visual);
            LayoutEvent {
                block_id: block.id,
                start,
                end,
                lane: 0,
                lane_count: 1,
                top: f64::from(start) / day,
                height: f64::from(end - start) / day,
                top_px: 0.0,
                height_px: 0.0,
                left_pct: 0.0,
                width_pct: 100.0,
            }
        })
        .collect();

    events.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| a.duration().cmp(&b.duration()))
    });

    // Indices into `events`, one list per overlap group.
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for idx in 0..events.len() {
        let joined = groups.iter().position(|members| {
            members
                .iter()
                .any(|&other| events[other].intersects(&events[idx]))
        });

        match joined {
            Some(group_idx) => {
                let members = &groups[group_idx];
                let taken: Vec<usize> = members
                    .iter()
                    .filter(|&&other| events[other].intersects(&events[idx]))
                    .map(|&other| events[other].lane)
                    .collect();
                let lane = (0..).find(|lane| !taken.contains(lane)).unwrap_or(0);
                events[idx].lane = lane;
                groups[group_idx].push(idx);
            }
            None => {
                events[idx].lane = 0;
                groups.push(vec![idx]);
            }
        }
    }

    for members in &groups {
        let lane_count = members
            .iter()
            .map(|&idx| events[idx].lane)
            .max()
            .map(|lane| lane + 1)
            .unwrap_or(1);
        for &idx in members {
            events[idx].lane_count = lane_count;
        }
    }

    let day_height = config.day_height();
    for event in &mut events {
        let width = 100.0 / event.lane_count as f64;
        event.width_pct = width;
        event.left_pct = event.lane as f64 * width;
        event.top_px = event.top * day_height;
        event.height_px = (f64::from(event.duration()) / 60.0 * config.hour_height)
            .max(config.min_pixel_height);
    }

    events
}

/// Widest overlap group in a layout pass.
pub fn max_lane_count(events: &[LayoutEvent]) -> usize {
    events.iter().map(|e| e.lane_count).max().unwrap_or(0)
}
