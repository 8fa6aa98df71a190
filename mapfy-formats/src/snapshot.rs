//! Map snapshot export to raster images.
//!
//! Renders the feature overlay over a plain background through an SVG
//! intermediate representation and the resvg/tiny-skia rasterization
//! pipeline. The snapshot carries only the viewport and the features —
//! transient UI chrome (toolbars, controls, popups) is never part of it,
//! which is what makes the capture clean by construction.

use std::fmt::Write;

use image::ImageEncoder;
use mapfy_core::{Feature, FeatureCollection, Geometry, LngLat, Viewport};

use crate::error::{FormatError, FormatResult};

/// Raster output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    /// PNG image.
    Png,
    /// JPEG image.
    Jpeg,
}

/// A renderable capture of the current view.
#[derive(Debug, Clone)]
pub struct MapSnapshot {
    /// Camera at capture time.
    pub viewport: Viewport,
    /// Features on the canvas at capture time.
    pub features: FeatureCollection,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
}

/// Configuration for snapshot rendering.
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Scale factor (2.0 for retina-quality output).
    pub scale: f32,
    /// Background color as RGBA bytes.
    pub background: [u8; 4],
    /// Overlay color for drawn geometry, as a hex string.
    pub color: String,
    /// JPEG quality 1-100.
    pub jpeg_quality: u8,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            scale: 2.0,
            background: [232, 236, 239, 255],
            color: "#3FB1CE".to_string(),
            jpeg_quality: 85,
        }
    }
}

/// Renders snapshots to raster images.
pub struct SnapshotRenderer {
    config: SnapshotConfig,
}

impl SnapshotRenderer {
    /// Create a renderer with the given configuration.
    #[must_use]
    pub fn new(config: SnapshotConfig) -> Self {
        Self { config }
    }

    /// Create a renderer with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(SnapshotConfig::default())
    }

    /// Render a snapshot to the requested format.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Empty`] when the snapshot has no features
    /// and [`FormatError::Render`] when rasterization or encoding fails.
    pub fn render(&self, snapshot: &MapSnapshot, format: SnapshotFormat) -> FormatResult<Vec<u8>> {
        match format {
            SnapshotFormat::Png => self.render_png(snapshot),
            SnapshotFormat::Jpeg => self.render_jpeg(snapshot),
        }
    }

    /// Render the snapshot to PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Render`] when rasterization or encoding
    /// fails.
    pub fn render_png(&self, snapshot: &MapSnapshot) -> FormatResult<Vec<u8>> {
        let svg = self.render_svg(snapshot)?;
        let pixmap = Self::rasterize(&svg)?;
        pixmap
            .encode_png()
            .map_err(|e| FormatError::Render(format!("PNG encoding failed: {e}")))
    }

    /// Render the snapshot to JPEG bytes (background composited under the
    /// overlay).
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Render`] when rasterization or encoding
    /// fails.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn render_jpeg(&self, snapshot: &MapSnapshot) -> FormatResult<Vec<u8>> {
        let svg = self.render_svg(snapshot)?;
        let pixmap = Self::rasterize(&svg)?;

        let (width, height) = (pixmap.width(), pixmap.height());
        let bg = &self.config.background;
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        for pixel in pixmap.data().chunks_exact(4) {
            let alpha = f32::from(pixel[3]) / 255.0;
            let inv = 1.0 - alpha;
            rgb.push((f32::from(pixel[0]).mul_add(alpha, f32::from(bg[0]) * inv)) as u8);
            rgb.push((f32::from(pixel[1]).mul_add(alpha, f32::from(bg[1]) * inv)) as u8);
            rgb.push((f32::from(pixel[2]).mul_add(alpha, f32::from(bg[2]) * inv)) as u8);
        }

        let mut buf = std::io::Cursor::new(Vec::new());
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, self.config.jpeg_quality);
        encoder
            .write_image(&rgb, width, height, image::ColorType::Rgb8.into())
            .map_err(|e| FormatError::Render(format!("JPEG encoding failed: {e}")))?;
        Ok(buf.into_inner())
    }

    /// Render the snapshot to an SVG string.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Empty`] when the snapshot has no features.
    #[allow(clippy::cast_precision_loss)]
    pub fn render_svg(&self, snapshot: &MapSnapshot) -> FormatResult<String> {
        if snapshot.features.is_empty() {
            return Err(FormatError::Empty);
        }

        let out_w = ((snapshot.width.max(1)) as f32 * self.config.scale) as u32;
        let out_h = ((snapshot.height.max(1)) as f32 * self.config.scale) as u32;
        let view_w = f64::from(snapshot.width.max(1));
        let view_h = f64::from(snapshot.height.max(1));

        let projection = Projection::new(&snapshot.viewport, view_w, view_h);

        let mut svg = String::with_capacity(4096);
        let _ = write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{out_w}\" height=\"{out_h}\" viewBox=\"0 0 {view_w} {view_h}\">",
        );

        let bg = &self.config.background;
        let bg_alpha = f32::from(bg[3]) / 255.0;
        let _ = write!(
            svg,
            "<rect width=\"100%\" height=\"100%\" fill=\"rgba({},{},{},{})\"/>",
            bg[0], bg[1], bg[2], bg_alpha,
        );

        for feature in snapshot.features.iter() {
            self.render_feature(&mut svg, feature, &projection);
        }

        svg.push_str("</svg>");
        Ok(svg)
    }

    fn render_feature(&self, svg: &mut String, feature: &Feature, projection: &Projection) {
        match &feature.geometry {
            Geometry::Point(p) => self.render_point(svg, *p, projection),
            Geometry::MultiPoint(points) => {
                for p in points {
                    self.render_point(svg, *p, projection);
                }
            }
            Geometry::LineString(points) => self.render_line(svg, points, projection),
            Geometry::MultiLineString(lines) => {
                for line in lines {
                    self.render_line(svg, line, projection);
                }
            }
            Geometry::Polygon(rings) => self.render_polygon(svg, rings, projection),
            Geometry::MultiPolygon(polygons) => {
                for rings in polygons {
                    self.render_polygon(svg, rings, projection);
                }
            }
        }
    }

    fn render_point(&self, svg: &mut String, point: LngLat, projection: &Projection) {
        let (x, y) = projection.project(point);
        let _ = write!(
            svg,
            "<circle cx=\"{x:.2}\" cy=\"{y:.2}\" r=\"7\" fill=\"{}\" stroke=\"#FFFFFF\" stroke-width=\"2\"/>",
            self.config.color,
        );
    }

    fn render_line(&self, svg: &mut String, points: &[LngLat], projection: &Projection) {
        let path = projection.path(points);
        let _ = write!(
            svg,
            "<polyline points=\"{path}\" fill=\"none\" stroke=\"{}\" stroke-width=\"4\" stroke-opacity=\"0.7\" stroke-linecap=\"round\" stroke-linejoin=\"round\"/>",
            self.config.color,
        );
    }

    fn render_polygon(&self, svg: &mut String, rings: &[Vec<LngLat>], projection: &Projection) {
        let mut d = String::new();
        for ring in rings {
            let mut first = true;
            for &point in ring {
                let (x, y) = projection.project(point);
                let command = if first { 'M' } else { 'L' };
                let _ = write!(d, "{command}{x:.2},{y:.2} ");
                first = false;
            }
            d.push_str("Z ");
        }
        let _ = write!(
            svg,
            "<path d=\"{}\" fill=\"{}\" fill-opacity=\"0.3\" fill-rule=\"evenodd\" stroke=\"{}\" stroke-width=\"3\" stroke-opacity=\"0.7\" stroke-linejoin=\"round\"/>",
            d.trim_end(),
            self.config.color,
            self.config.color,
        );
    }

    /// Rasterize an SVG string to a tiny-skia pixmap.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn rasterize(svg: &str) -> FormatResult<tiny_skia::Pixmap> {
        let opt = usvg::Options::default();
        let tree = usvg::Tree::from_str(svg, &opt)
            .map_err(|e| FormatError::Render(format!("SVG parsing failed: {e}")))?;

        let px_w = tree.size().width() as u32;
        let px_h = tree.size().height() as u32;

        let mut pixmap = tiny_skia::Pixmap::new(px_w.max(1), px_h.max(1))
            .ok_or_else(|| FormatError::Render("Failed to create pixmap".to_string()))?;

        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());
        Ok(pixmap)
    }
}

/// Web Mercator projection anchored at the snapshot viewport.
struct Projection {
    world_px: f64,
    center_x: f64,
    center_y: f64,
    half_width: f64,
    half_height: f64,
}

impl Projection {
    fn new(viewport: &Viewport, width: f64, height: f64) -> Self {
        let world_px = 256.0 * 2.0_f64.powf(viewport.zoom);
        let (center_x, center_y) =
            Self::world(viewport.longitude, viewport.latitude, world_px);
        Self {
            world_px,
            center_x,
            center_y,
            half_width: width / 2.0,
            half_height: height / 2.0,
        }
    }

    fn world(lng: f64, lat: f64, world_px: f64) -> (f64, f64) {
        let x = (lng + 180.0) / 360.0 * world_px;
        let lat_rad = lat.clamp(-85.051_13, 85.051_13).to_radians();
        let y = (1.0 - lat_rad.tan().asinh() / std::f64::consts::PI) / 2.0 * world_px;
        (x, y)
    }

    fn project(&self, point: LngLat) -> (f64, f64) {
        let (x, y) = Self::world(point[0], point[1], self.world_px);
        (
            x - self.center_x + self.half_width,
            y - self.center_y + self.half_height,
        )
    }

    fn path(&self, points: &[LngLat]) -> String {
        points
            .iter()
            .map(|&p| {
                let (x, y) = self.project(p);
                format!("{x:.2},{y:.2}")
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
