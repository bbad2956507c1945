/// Axis-aligned bounding box of one connected transparent area, in canvas pixel space.
///
/// Coordinates are the extremal pixels visited by the flood-fill, so `max_x`/`max_y` are
/// inclusive pixel positions. `width()`/`height()` follow the frame convention `max - min`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    /// Leftmost visited column.
    pub min_x: u32,
    /// Topmost visited row.
    pub min_y: u32,
    /// Rightmost visited column.
    pub max_x: u32,
    /// Bottommost visited row.
    pub max_y: u32,
}

impl Region {
    /// Degenerate region covering a single seed pixel.
    pub fn point(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    /// Grow the box so it contains `(x, y)`.
    pub fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn width(self) -> u32 {
        self.max_x - self.min_x
    }

    pub fn height(self) -> u32 {
        self.max_y - self.min_y
    }

    /// Return `true` when both extents are strictly larger than `min_size`.
    pub fn exceeds(self, min_size: u32) -> bool {
        self.width() > min_size && self.height() > min_size
    }
}

/// Canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of bytes of a tightly packed RGBA8 buffer with these dimensions.
    pub fn rgba8_len(self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|v| v.checked_mul(4))
    }
}

/// Fit `(width, height)` under `max_width`, keeping the aspect ratio.
///
/// Images at or below the cap are returned unchanged; wider ones are scaled so their width equals
/// `max_width` and their height is rounded to the nearest pixel.
pub fn calculate_scaled_dimensions(width: u32, height: u32, max_width: u32) -> Dimensions {
    if width <= max_width {
        return Dimensions::new(width, height);
    }
    let scale = f64::from(max_width) / f64::from(width);
    Dimensions::new(max_width, (f64::from(height) * scale).round() as u32)
}

/// Encoded output formats supported by canvas export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
}

impl OutputFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// Default lossy quality, matching the browser canvas default.
pub const DEFAULT_QUALITY: f32 = 0.92;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_dimensions_unchanged_at_or_below_cap() {
        assert_eq!(
            calculate_scaled_dimensions(400, 300, 400),
            Dimensions::new(400, 300)
        );
        assert_eq!(
            calculate_scaled_dimensions(10, 900, 800),
            Dimensions::new(10, 900)
        );
    }

    #[test]
    fn scaled_dimensions_downscale_to_cap() {
        assert_eq!(
            calculate_scaled_dimensions(800, 600, 400),
            Dimensions::new(400, 300)
        );
        // 333 * 100 / 1000 = 33.3
        assert_eq!(
            calculate_scaled_dimensions(1000, 333, 100),
            Dimensions::new(100, 33)
        );
        // 301 * 0.5 = 150.5 rounds up
        assert_eq!(
            calculate_scaled_dimensions(800, 301, 400),
            Dimensions::new(400, 151)
        );
    }

    #[test]
    fn region_include_and_extent() {
        let mut r = Region::point(5, 7);
        r.include(20, 3);
        r.include(1, 30);
        assert_eq!(
            r,
            Region {
                min_x: 1,
                min_y: 3,
                max_x: 20,
                max_y: 30
            }
        );
        assert_eq!(r.width(), 19);
        assert_eq!(r.height(), 27);
        assert!(r.exceeds(18));
        assert!(!r.exceeds(19));
    }

    #[test]
    fn region_serializes_camel_case() {
        let json = serde_json::to_string(&Region::point(1, 2)).unwrap();
        assert_eq!(json, r#"{"minX":1,"minY":2,"maxX":1,"maxY":2}"#);
    }

    #[test]
    fn output_format_mime_and_serde() {
        assert_eq!(OutputFormat::Png.mime_type(), "image/png");
        assert_eq!(OutputFormat::Jpeg.mime_type(), "image/jpeg");
        let f: OutputFormat = serde_json::from_str("\"jpeg\"").unwrap();
        assert_eq!(f, OutputFormat::Jpeg);
    }
}
