//! The frame compositor: owns a frame image and an ordered list of photos, finds the frame's
//! transparent windows on a worker thread and paints the photos into them.
//!
//! Rendering is split in two halves. Every setter that changes what should be shown dispatches a
//! region analysis and returns; [`FrameCompositor::poll`] or [`FrameCompositor::wait`] then
//! receive the worker's answer and paint the canvas. Only the newest dispatch is ever painted.

use std::time::{Duration, Instant};

use crate::assets::Bitmap;
use crate::assets::loader::{ImageLoader, ImageSource};
use crate::foundation::core::{
    DEFAULT_QUALITY, Dimensions, OutputFormat, Region, calculate_scaled_dimensions,
};
use crate::foundation::error::{CompositorError, CompositorResult};
use crate::regions::protocol::{FindRegionsRequest, WorkerRequest, WorkerResponse};
use crate::regions::worker::{Envelope, RegionWorker};
use crate::render::export::{encode_surface, surface_data_url};
use crate::render::surface::{ClipRect, DrawRect, Surface};

pub mod layout;

/// Completion handler, called with the PNG data URL of every painted render.
pub type RenderCompleteHandler = Box<dyn FnMut(&str) + Send>;

/// Construction options for [`FrameCompositor`].
pub struct CompositorOpts {
    /// Frames wider than this are downscaled to it.
    pub max_width: u32,
    /// Transparent areas must be strictly wider and taller than this to count as windows.
    pub min_region_size: u32,
    /// Seed sampling stride of the region finder.
    pub block_size: u32,
    /// How long [`FrameCompositor::wait`] waits for the worker.
    pub analysis_timeout: Duration,
    /// Optional completion handler.
    pub on_render_complete: Option<RenderCompleteHandler>,
}

impl Default for CompositorOpts {
    fn default() -> Self {
        Self {
            max_width: 800,
            min_region_size: 10,
            block_size: 4,
            analysis_timeout: Duration::from_secs(5),
            on_render_complete: None,
        }
    }
}

impl std::fmt::Debug for CompositorOpts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositorOpts")
            .field("max_width", &self.max_width)
            .field("min_region_size", &self.min_region_size)
            .field("block_size", &self.block_size)
            .field("analysis_timeout", &self.analysis_timeout)
            .field("on_render_complete", &self.on_render_complete.is_some())
            .finish()
    }
}

/// Counters describing the compositor's render traffic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompositorStats {
    /// Region analyses sent to the worker.
    pub requests_dispatched: u64,
    /// Responses that were painted onto the canvas.
    pub renders_painted: u64,
    /// Responses dropped because a newer render had been dispatched.
    pub stale_discarded: u64,
    /// Worker failures, timeouts and malformed responses.
    pub analysis_failures: u64,
}

/// Summary of one painted render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderReport {
    /// Generation of the dispatch that was painted.
    pub generation: u64,
    /// Number of windows that received a photo.
    pub regions: usize,
}

/// A dispatched analysis and the canvas size it was rasterized at.
#[derive(Clone, Copy, Debug)]
struct PendingRender {
    generation: u64,
    dims: Dimensions,
}

pub struct FrameCompositor {
    max_width: u32,
    min_region_size: u32,
    block_size: u32,
    analysis_timeout: Duration,
    on_render_complete: Option<RenderCompleteHandler>,

    loader: ImageLoader,
    canvas: Surface,
    frame: Option<Bitmap>,
    content: Vec<Bitmap>,
    regions: Vec<Region>,

    worker: RegionWorker,
    generation: u64,
    pending: Option<PendingRender>,
    destroyed: bool,
    stats: CompositorStats,
}

impl FrameCompositor {
    pub fn new(opts: CompositorOpts) -> CompositorResult<Self> {
        Self::with_loader(opts, ImageLoader::new())
    }

    /// Build a compositor that resolves sources through `loader`.
    pub fn with_loader(opts: CompositorOpts, loader: ImageLoader) -> CompositorResult<Self> {
        if opts.max_width == 0 {
            return Err(CompositorError::invalid_source("max_width must be > 0"));
        }
        if opts.block_size == 0 {
            return Err(CompositorError::invalid_source("block_size must be > 0"));
        }

        Ok(Self {
            max_width: opts.max_width,
            min_region_size: opts.min_region_size,
            block_size: opts.block_size,
            analysis_timeout: opts.analysis_timeout,
            on_render_complete: opts.on_render_complete,
            loader,
            canvas: Surface::new(Dimensions::new(0, 0)),
            frame: None,
            content: Vec::new(),
            regions: Vec::new(),
            worker: RegionWorker::spawn()?,
            generation: 0,
            pending: None,
            destroyed: false,
            stats: CompositorStats::default(),
        })
    }

    pub fn set_on_render_complete(&mut self, handler: Option<RenderCompleteHandler>) {
        self.on_render_complete = handler;
    }

    /// Load and install a new frame, then dispatch a render.
    ///
    /// A load failure keeps the previous frame and canvas.
    #[tracing::instrument(skip_all)]
    pub fn set_frame_image(&mut self, source: impl Into<ImageSource>) -> CompositorResult<()> {
        self.ensure_alive()?;
        let frame = self.loader.load(source.into()).inspect_err(|e| {
            tracing::warn!(error = %e, "failed to set frame image");
        })?;

        tracing::debug!(
            width = frame.width(),
            height = frame.height(),
            "frame image loaded"
        );
        self.frame = Some(frame);
        self.dispatch_render()?;
        Ok(())
    }

    /// Load all photos in parallel and replace the content list, then dispatch a render.
    ///
    /// All-or-nothing: if any source fails the previous list stays installed.
    #[tracing::instrument(skip_all)]
    pub fn set_content_images<I, S>(&mut self, sources: I) -> CompositorResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<ImageSource>,
    {
        self.ensure_alive()?;
        let sources: Vec<ImageSource> = sources.into_iter().map(Into::into).collect();
        let content = self.loader.load_all(sources).inspect_err(|e| {
            tracing::warn!(error = %e, "failed to set content images");
        })?;

        tracing::debug!(count = content.len(), "content images loaded");
        self.content = content;
        self.dispatch_render()?;
        Ok(())
    }

    /// Single-photo convenience for [`Self::set_content_images`].
    pub fn set_content_image(&mut self, source: impl Into<ImageSource>) -> CompositorResult<()> {
        self.set_content_images([source.into()])
    }

    /// Change the width cap. Re-renders at the new scale when a frame is set.
    pub fn set_max_width(&mut self, width: u32) -> CompositorResult<()> {
        self.ensure_alive()?;
        if width == 0 {
            return Err(CompositorError::invalid_source("max_width must be > 0"));
        }
        self.max_width = width;
        if self.frame.is_some() {
            self.dispatch_render()?;
        }
        Ok(())
    }

    pub fn max_width(&self) -> u32 {
        self.max_width
    }

    pub fn calculate_scaled_dimensions(&self, width: u32, height: u32) -> Dimensions {
        calculate_scaled_dimensions(width, height, self.max_width)
    }

    /// Receive a finished analysis without blocking and paint it.
    ///
    /// Returns `Ok(None)` when nothing is ready. Stale responses are dropped silently.
    pub fn poll(&mut self) -> CompositorResult<Option<RenderReport>> {
        self.ensure_alive()?;
        loop {
            let env = match self.worker.try_recv() {
                Ok(Some(env)) => env,
                Ok(None) => return Ok(None),
                Err(e) => return Err(self.analysis_failed(e)),
            };
            if let Some(report) = self.handle_response(env)? {
                return Ok(Some(report));
            }
        }
    }

    /// Block until the newest dispatched render is painted or the analysis timeout expires.
    ///
    /// Returns `Ok(None)` when no render is pending.
    pub fn wait(&mut self) -> CompositorResult<Option<RenderReport>> {
        self.ensure_alive()?;
        let deadline = Instant::now() + self.analysis_timeout;
        while self.pending.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let env = match self.worker.recv_timeout(remaining) {
                Ok(env) => env,
                Err(e) => return Err(self.analysis_failed(e)),
            };
            if let Some(report) = self.handle_response(env)? {
                return Ok(Some(report));
            }
        }
        Ok(None)
    }

    /// Return `true` while a dispatched render has not been painted yet.
    pub fn is_render_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn get_image_url(&self, format: OutputFormat, quality: f32) -> CompositorResult<String> {
        self.ensure_alive()?;
        surface_data_url(&self.canvas, format, quality)
    }

    pub fn get_image_blob(&self, format: OutputFormat, quality: f32) -> CompositorResult<Vec<u8>> {
        self.ensure_alive()?;
        encode_surface(&self.canvas, format, quality)
    }

    pub fn canvas(&self) -> &Surface {
        &self.canvas
    }

    /// Windows found by the most recently painted render.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn frame(&self) -> Option<&Bitmap> {
        self.frame.as_ref()
    }

    pub fn content(&self) -> &[Bitmap] {
        &self.content
    }

    pub fn stats(&self) -> CompositorStats {
        self.stats
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Stop the worker thread. Every later call fails with [`CompositorError::Destroyed`].
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.worker.terminate();
        self.destroyed = true;
        self.pending = None;
        tracing::debug!("compositor destroyed");
    }

    fn ensure_alive(&self) -> CompositorResult<()> {
        if self.destroyed {
            return Err(CompositorError::Destroyed);
        }
        Ok(())
    }

    fn scaled_frame_size(&self) -> Option<Dimensions> {
        self.frame
            .as_ref()
            .map(|f| self.calculate_scaled_dimensions(f.width(), f.height()))
    }

    /// First half of a render pass: rasterize the frame offscreen and hand its pixels to the
    /// worker. Without a frame or without photos nothing is drawn, and any render still in flight
    /// is abandoned.
    fn dispatch_render(&mut self) -> CompositorResult<bool> {
        let (Some(frame), Some(dims)) = (self.frame.as_ref(), self.scaled_frame_size()) else {
            self.pending = None;
            return Ok(false);
        };
        if self.content.is_empty() {
            self.pending = None;
            return Ok(false);
        }

        let mut offscreen = Surface::new(dims);
        offscreen.draw_image(frame, full_canvas(dims), None);

        let generation = self.generation + 1;
        let request = WorkerRequest::FindRegions(FindRegionsRequest {
            pixel_buffer: offscreen.into_pixel_buffer(),
            width: dims.width,
            height: dims.height,
            min_region_size: self.min_region_size,
            block_size: self.block_size,
        });
        if let Err(e) = self.worker.post(generation, request) {
            return Err(self.analysis_failed(e));
        }

        self.generation = generation;
        self.pending = Some(PendingRender { generation, dims });
        self.stats.requests_dispatched += 1;
        tracing::debug!(
            generation,
            width = dims.width,
            height = dims.height,
            "render dispatched"
        );
        Ok(true)
    }

    fn handle_response(
        &mut self,
        env: Envelope<WorkerResponse>,
    ) -> CompositorResult<Option<RenderReport>> {
        let Some(pending) = self.pending.filter(|p| p.generation == env.generation) else {
            self.stats.stale_discarded += 1;
            tracing::debug!(generation = env.generation, "discarding stale region analysis");
            return Ok(None);
        };
        self.pending = None;

        match env.message {
            WorkerResponse::RegionsFound(found) => Ok(Some(self.paint(pending, found.regions))),
            WorkerResponse::AnalysisFailed(failed) => Err(
                self.analysis_failed(CompositorError::region_analysis(failed.message)),
            ),
        }
    }

    /// Second half of a render pass: photos into windows, frame on top.
    ///
    /// The canvas only changes size here, so a failed analysis leaves the previous image intact.
    fn paint(&mut self, pending: PendingRender, regions: Vec<Region>) -> RenderReport {
        let PendingRender { generation, dims } = pending;
        if self.canvas.dimensions() == dims {
            self.canvas.clear();
        } else {
            self.canvas.resize(dims);
        }

        for (i, region) in regions.iter().enumerate() {
            let Some(idx) = layout::content_index(i, self.content.len()) else {
                break;
            };
            let img = &self.content[idx];
            let dest = layout::cover_placement(*region, img.dimensions());
            self.canvas
                .draw_image(img, dest, Some(ClipRect::from_region(*region)));
        }

        if let Some(frame) = self.frame.as_ref() {
            self.canvas.draw_image(frame, full_canvas(dims), None);
        }

        self.regions = regions;
        self.stats.renders_painted += 1;
        tracing::debug!(generation, regions = self.regions.len(), "render painted");

        if let Some(handler) = self.on_render_complete.as_mut() {
            match surface_data_url(&self.canvas, OutputFormat::Png, DEFAULT_QUALITY) {
                Ok(url) => handler(&url),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to export render for completion handler")
                }
            }
        }

        RenderReport {
            generation,
            regions: self.regions.len(),
        }
    }

    fn analysis_failed(&mut self, err: CompositorError) -> CompositorError {
        self.pending = None;
        self.stats.analysis_failures += 1;
        tracing::warn!(error = %err, "region analysis failed; canvas left unchanged");
        err
    }
}

fn full_canvas(dims: Dimensions) -> DrawRect {
    DrawRect {
        x: 0.0,
        y: 0.0,
        width: f64::from(dims.width),
        height: f64::from(dims.height),
    }
}
