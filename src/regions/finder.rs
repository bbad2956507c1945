use std::sync::atomic::{AtomicBool, Ordering};

use crate::foundation::core::{Dimensions, Region};
use crate::foundation::error::{CompositorError, CompositorResult};

/// Alpha values strictly below this count as transparent.
pub const ALPHA_THRESHOLD: u8 = 128;

/// Capacity of the flood-fill stack, in points.
pub const MAX_STACK_ENTRIES: usize = 1024 * 1024;

/// Stack pops between two looks at the cancel flag.
const CANCEL_CHECK_INTERVAL: u32 = 4096;

/// Tuning knobs for [`find_regions`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionFinderOpts {
    /// Regions must be strictly wider and taller than this many pixels.
    pub min_region_size: u32,
    /// Seed sampling stride on both axes. Zero is treated as one.
    pub block_size: u32,
}

impl Default for RegionFinderOpts {
    fn default() -> Self {
        Self {
            min_region_size: 10,
            block_size: 4,
        }
    }
}

/// Find every connected transparent area of an RGBA8 buffer.
///
/// Seeds are sampled every `block_size` pixels in row-major order, and each unvisited transparent
/// seed is flood-filled with 4-connectivity at single-pixel resolution. The result order follows
/// the seed scan, so it is deterministic for a given buffer.
pub fn find_regions(
    rgba: &[u8],
    width: u32,
    height: u32,
    opts: RegionFinderOpts,
) -> CompositorResult<Vec<Region>> {
    find_regions_cancellable(rgba, width, height, opts, &AtomicBool::new(false))
}

/// [`find_regions`] that gives up with a `RegionAnalysis` error soon after `cancel` is set.
pub fn find_regions_cancellable(
    rgba: &[u8],
    width: u32,
    height: u32,
    opts: RegionFinderOpts,
    cancel: &AtomicBool,
) -> CompositorResult<Vec<Region>> {
    let expected_len = Dimensions::new(width, height)
        .rgba8_len()
        .ok_or_else(|| CompositorError::region_analysis("pixel buffer size overflow"))?;
    if rgba.len() != expected_len {
        return Err(CompositorError::region_analysis(format!(
            "pixel buffer has {} bytes, expected {expected_len} for {width}x{height}",
            rgba.len()
        )));
    }

    let mut finder = RegionFinder::new(rgba, width, height);
    finder.find(opts, cancel)
}

struct RegionFinder<'a> {
    rgba: &'a [u8],
    width: u32,
    height: u32,
    visited: Vec<bool>,
    stack: FillStack,
}

impl<'a> RegionFinder<'a> {
    fn new(rgba: &'a [u8], width: u32, height: u32) -> Self {
        Self {
            rgba,
            width,
            height,
            visited: vec![false; (width as usize) * (height as usize)],
            stack: FillStack::with_capacity(MAX_STACK_ENTRIES),
        }
    }

    fn find(
        &mut self,
        opts: RegionFinderOpts,
        cancel: &AtomicBool,
    ) -> CompositorResult<Vec<Region>> {
        let step = opts.block_size.max(1) as usize;
        let mut regions = Vec::new();

        for y in (0..self.height).step_by(step) {
            if cancel.load(Ordering::Relaxed) {
                return Err(cancelled());
            }
            for x in (0..self.width).step_by(step) {
                if self.visited[self.pos(x, y)] || !self.is_transparent(x, y) {
                    continue;
                }
                let region = self.flood_fill(x, y, cancel).ok_or_else(cancelled)?;
                if region.exceeds(opts.min_region_size) {
                    regions.push(region);
                }
            }
        }
        Ok(regions)
    }

    /// Returns `None` when cancelled mid-fill.
    fn flood_fill(&mut self, seed_x: u32, seed_y: u32, cancel: &AtomicBool) -> Option<Region> {
        let mut region = Region::point(seed_x, seed_y);
        self.stack.clear();
        self.stack.push(seed_x, seed_y);

        let mut pops = 0u32;
        while let Some((x, y)) = self.stack.pop() {
            pops = pops.wrapping_add(1);
            if pops % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
                return None;
            }
            let pos = self.pos(x, y);
            if self.visited[pos] || !self.is_transparent(x, y) {
                continue;
            }
            self.visited[pos] = true;
            region.include(x, y);

            if x + 1 < self.width {
                self.stack.push(x + 1, y);
            }
            if x > 0 {
                self.stack.push(x - 1, y);
            }
            if y + 1 < self.height {
                self.stack.push(x, y + 1);
            }
            if y > 0 {
                self.stack.push(x, y - 1);
            }
        }
        Some(region)
    }

    fn pos(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    fn is_transparent(&self, x: u32, y: u32) -> bool {
        self.rgba[self.pos(x, y) * 4 + 3] < ALPHA_THRESHOLD
    }
}

fn cancelled() -> CompositorError {
    CompositorError::region_analysis("analysis cancelled")
}

/// Fixed-capacity point stack. Pushes past capacity are dropped.
struct FillStack {
    points: Vec<(u32, u32)>,
    cap: usize,
    dropped: u64,
}

impl FillStack {
    fn with_capacity(cap: usize) -> Self {
        Self {
            points: Vec::new(),
            cap,
            dropped: 0,
        }
    }

    fn push(&mut self, x: u32, y: u32) {
        if self.points.len() >= self.cap {
            self.dropped = self.dropped.saturating_add(1);
            return;
        }
        self.points.push((x, y));
    }

    fn pop(&mut self) -> Option<(u32, u32)> {
        self.points.pop()
    }

    fn clear(&mut self) {
        if self.dropped > 0 {
            tracing::debug!(
                dropped = self.dropped,
                "flood-fill stack overflowed; region truncated"
            );
        }
        self.points.clear();
        self.dropped = 0;
    }
}
