//! photoframe composites photos into the transparent windows of a decorative frame image.
//!
//! - Load a frame and photos through an [`ImageLoader`] ([`ImageSource`] covers bytes, paths,
//!   `data:` / `file://` / `http(s)://` URLs and decoded [`Bitmap`]s)
//! - Let a [`FrameCompositor`] find the frame's windows on its worker thread
//! - Collect the painted result with [`FrameCompositor::wait`] and export it as PNG or JPEG
#![forbid(unsafe_code)]

pub mod assets;
pub mod booth;
pub mod compositor;
pub mod foundation;
pub mod regions;
pub mod render;

pub use crate::assets::Bitmap;
pub use crate::assets::loader::{ImageLoader, ImageSource};
pub use crate::booth::{Photo, PhotoSession, SessionError};
pub use crate::compositor::{
    CompositorOpts, CompositorStats, FrameCompositor, RenderCompleteHandler, RenderReport,
};
pub use crate::foundation::core::{
    DEFAULT_QUALITY, Dimensions, OutputFormat, Region, calculate_scaled_dimensions,
};
pub use crate::foundation::error::{CompositorError, CompositorResult};
pub use crate::regions::finder::{RegionFinderOpts, find_regions};
pub use crate::regions::protocol::{WorkerRequest, WorkerResponse};
