//! Composition engine: scale the photo to a fixed width and burn the
//! timestamp and caption into a translucent band along the bottom edge.
//!
//! Rendering is a pure function of the photo bytes, the overlay text and the
//! options. The same inputs always give the same pixels.

mod export;
mod text;

pub use export::{Artifact, artifact_name, download};

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use serde::Serialize;

use crate::error::Notice;
use crate::photo::Photo;
use crate::stamp::OverlaySpec;
use text::{GLYPH_SIZE, draw_text, fill_band, text_width};

/// Largest RGBA canvas `render` will allocate.
pub const MAX_CANVAS_BYTES: u64 = 256 * 1024 * 1024;

/// Layout and colour settings for the composition.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Output width; height follows the photo's aspect ratio.
    pub target_width: u32,
    /// Distance of the text from the right and bottom edges.
    pub margin: u32,
    /// Vertical space between the timestamp and caption lines.
    pub line_gap: u32,
    /// Space above the topmost line inside the band.
    pub band_padding: u32,
    pub band_color: [u8; 4],
    pub text_color: [u8; 4],
    /// Glyph scale of the timestamp line (8px per unit).
    pub timestamp_scale: u32,
    /// Glyph scale of the caption line.
    pub caption_scale: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            target_width: 800,
            margin: 20,
            line_gap: 10,
            band_padding: 12,
            band_color: [0, 0, 0, 128],
            text_color: [255, 255, 255, 255],
            timestamp_scale: 3,
            caption_scale: 2,
        }
    }
}

/// One positioned line of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextLine {
    pub text: String,
    /// Left edge; the line is right-aligned, so this depends on its width.
    pub x: i32,
    pub y: i32,
    pub scale: u32,
    pub bold: bool,
}

impl TextLine {
    pub fn width(&self) -> u32 {
        text_width(&self.text, self.scale, self.bold)
    }

    pub fn height(&self) -> u32 {
        GLYPH_SIZE * self.scale
    }
}

/// The translucent strip behind the text, spanning the full width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Band {
    pub top: u32,
    pub height: u32,
}

/// Where everything goes on the output canvas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layout {
    pub width: u32,
    pub height: u32,
    pub band: Option<Band>,
    pub timestamp: Option<TextLine>,
    pub caption: Option<TextLine>,
}

/// A composed image together with the layout that produced it.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub image: RgbaImage,
    pub layout: Layout,
}

impl Rendered {
    /// Encode the flattened canvas as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>, Notice> {
        let mut out = std::io::Cursor::new(Vec::new());
        self.image
            .write_to(&mut out, image::ImageFormat::Png)
            .map_err(|e| Notice::Encode(e.to_string()))?;
        Ok(out.into_inner())
    }
}

/// Output size for a `width`x`height` source scaled to `target_width`.
pub fn scaled_size(width: u32, height: u32, target_width: u32) -> (u32, u32) {
    let target = target_width.max(1);
    let width = u64::from(width.max(1));
    let scaled = (u64::from(height) * u64::from(target) + width / 2) / width;
    (target, scaled.clamp(1, u64::from(u32::MAX)) as u32)
}

/// Place the overlay text on a `width`x`height` canvas.
///
/// Lines stack upwards from the bottom margin: caption first, timestamp
/// above it. A missing line leaves no gap. Lines too wide for the canvas are
/// drawn at a smaller scale, down to 1.
pub fn layout(width: u32, height: u32, overlay: &OverlaySpec, options: &RenderOptions) -> Layout {
    if overlay.is_empty() {
        return Layout {
            width,
            height,
            band: None,
            timestamp: None,
            caption: None,
        };
    }

    let usable = width.saturating_sub(2 * options.margin).max(1);
    let mut bottom = height.saturating_sub(options.margin) as i32;

    let mut place = |text: &str, scale: u32, bold: bool| -> Option<TextLine> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let mut scale = scale.max(1);
        while scale > 1 && text_width(text, scale, bold) > usable {
            scale -= 1;
        }
        let y = bottom - (GLYPH_SIZE * scale) as i32;
        let x = width as i32 - options.margin as i32 - text_width(text, scale, bold) as i32;
        bottom = y - options.line_gap as i32;
        Some(TextLine {
            text: text.to_string(),
            x,
            y,
            scale,
            bold,
        })
    };

    let caption = place(&overlay.caption, options.caption_scale, false);
    let timestamp = place(&overlay.timestamp, options.timestamp_scale, true);

    let band = timestamp.as_ref().or(caption.as_ref()).map(|top_line| {
        let top = (top_line.y - options.band_padding as i32).max(0) as u32;
        Band {
            top,
            height: height - top.min(height),
        }
    });

    Layout {
        width,
        height,
        band,
        timestamp,
        caption,
    }
}

/// Compose `overlay` onto `photo`.
///
/// Fails with [`Notice::Decode`] when the photo bytes are not a readable
/// image, or when the scaled canvas would exceed [`MAX_CANVAS_BYTES`];
/// nothing is produced in that case.
pub fn render(photo: &Photo, overlay: &OverlaySpec, options: &RenderOptions) -> Result<Rendered, Notice> {
    let decoded = image::load_from_memory(photo.bytes())
        .map_err(|e| Notice::Decode(format!("{}: {e}", photo.name())))?;
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(Notice::Decode(format!("{}: image has no pixels", photo.name())));
    }

    let (width, height) = scaled_size(decoded.width(), decoded.height(), options.target_width);
    let canvas_bytes = u64::from(width) * u64::from(height) * 4;
    if canvas_bytes > MAX_CANVAS_BYTES {
        return Err(Notice::Decode(format!(
            "{}: stamped image would be {width}x{height}, too large to draw",
            photo.name()
        )));
    }
    let mut image = imageops::resize(&decoded.to_rgba8(), width, height, FilterType::Triangle);
    let layout = layout(width, height, overlay, options);

    if let Some(band) = layout.band {
        fill_band(&mut image, band.top, band.top + band.height, Rgba(options.band_color));
    }
    for line in [&layout.timestamp, &layout.caption].into_iter().flatten() {
        draw_text(
            &mut image,
            line.x,
            line.y,
            &line.text,
            Rgba(options.text_color),
            line.scale,
            line.bold,
        );
    }

    log::debug!(
        "Rendered {} at {}x{} (band: {})",
        photo.name(),
        width,
        height,
        layout.band.is_some()
    );
    Ok(Rendered { image, layout })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::stamp::{TimeFormat, compose_caption, stamp_text};

    fn photo(width: u32, height: u32) -> Photo {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 180, 255])
        });
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        Photo::from_bytes("test.png", out.into_inner())
    }

    fn overlay(timestamp: &str, caption: &str) -> OverlaySpec {
        OverlaySpec {
            timestamp: timestamp.to_string(),
            caption: caption.to_string(),
        }
    }

    // ── scaled_size ──────────────────────────────────────────────────

    #[test]
    fn scaled_size_keeps_aspect() {
        assert_eq!(scaled_size(1000, 500, 800), (800, 400));
        assert_eq!(scaled_size(400, 300, 800), (800, 600));
        assert_eq!(scaled_size(3000, 1, 800), (800, 1));
    }

    // ── layout ───────────────────────────────────────────────────────

    #[test]
    fn layout_two_lines_right_aligned() {
        let opts = RenderOptions::default();
        let l = layout(800, 400, &overlay("2024-08-23 16:30:00", "Manama, Bahrain"), &opts);

        let ts = l.timestamp.as_ref().unwrap();
        let cap = l.caption.as_ref().unwrap();
        assert_eq!(ts.x + ts.width() as i32, 780);
        assert_eq!(cap.x + cap.width() as i32, 780);
        assert_eq!(cap.y + cap.height() as i32, 380);
        assert!(ts.y + (ts.height() as i32) < cap.y);
        assert!(ts.scale > cap.scale);
        assert!(ts.bold && !cap.bold);

        let band = l.band.unwrap();
        assert_eq!(band.top as i32, ts.y - 12);
        assert_eq!(band.top + band.height, 400);
    }

    #[test]
    fn layout_without_timestamp_drops_its_line() {
        let opts = RenderOptions::default();
        let both = layout(800, 400, &overlay("12:00", "Here"), &opts);
        let only = layout(800, 400, &overlay("", "Here"), &opts);
        assert!(only.timestamp.is_none());
        assert_eq!(only.caption, both.caption);
        assert!(only.band.unwrap().top > both.band.unwrap().top);
    }

    #[test]
    fn layout_without_text_has_no_band() {
        let l = layout(800, 400, &overlay("", "  "), &RenderOptions::default());
        assert!(l.band.is_none());
        assert!(l.timestamp.is_none() && l.caption.is_none());
    }

    #[test]
    fn layout_shrinks_long_lines() {
        let long = "x".repeat(60);
        let l = layout(800, 400, &overlay("", &long), &RenderOptions::default());
        let cap = l.caption.unwrap();
        assert_eq!(cap.scale, 1);
        assert!(cap.x >= 20);
    }

    // ── render ───────────────────────────────────────────────────────

    #[test]
    fn render_is_idempotent() {
        let p = photo(120, 90);
        let spec = overlay("08/23/2024, 4:30:00 PM", "Main St, Springfield, USA");
        let opts = RenderOptions::default();
        let a = render(&p, &spec, &opts).unwrap();
        let b = render(&p, &spec, &opts).unwrap();
        assert_eq!(a.image.as_raw(), b.image.as_raw());
        assert_eq!(a.to_png().unwrap(), b.to_png().unwrap());
    }

    #[test]
    fn render_scenario_springfield() {
        let at = NaiveDate::from_ymd_opt(2024, 8, 23)
            .unwrap()
            .and_hms_opt(16, 30, 0)
            .unwrap();
        let spec = OverlaySpec {
            timestamp: TimeFormat::UsNumeric.format(&at),
            caption: compose_caption("Main St, Springfield, USA", None),
        };
        let r = render(&photo(1000, 500), &spec, &RenderOptions::default()).unwrap();

        assert_eq!((r.image.width(), r.image.height()), (800, 400));
        assert_eq!(r.layout.timestamp.unwrap().text, "08/23/2024, 4:30:00 PM");
        assert_eq!(r.layout.caption.unwrap().text, "Main St, Springfield, USA");
        let band = r.layout.band.unwrap();
        assert_eq!(band.top + band.height, 400);
    }

    #[test]
    fn render_timestamp_line_for_every_format() {
        let at = NaiveDate::from_ymd_opt(2024, 8, 23)
            .unwrap()
            .and_hms_opt(16, 30, 0)
            .unwrap();
        let p = photo(100, 50);
        for format in TimeFormat::ALL {
            let spec = OverlaySpec {
                timestamp: stamp_text(Some(&at), format),
                caption: "Manama".to_string(),
            };
            let r = render(&p, &spec, &RenderOptions::default()).unwrap();
            assert_eq!(
                r.layout.timestamp.map(|l| l.text),
                Some(format.format(&at)),
                "format {format}"
            );
        }
    }

    #[test]
    fn render_darkens_band_only() {
        let white = {
            let img = RgbaImage::from_pixel(200, 100, Rgba([255, 255, 255, 255]));
            let mut out = std::io::Cursor::new(Vec::new());
            img.write_to(&mut out, image::ImageFormat::Png).unwrap();
            Photo::from_bytes("white.png", out.into_inner())
        };
        let r = render(&white, &overlay("", "A"), &RenderOptions::default()).unwrap();
        let band = r.layout.band.unwrap();
        assert_eq!(*r.image.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
        let inside = r.image.get_pixel(0, band.top + 1);
        assert!(inside[0] < 255);
    }

    #[test]
    fn render_without_text_is_plain_scale() {
        let r = render(&photo(400, 200), &OverlaySpec::default(), &RenderOptions::default()).unwrap();
        assert!(r.layout.band.is_none());
        assert_eq!((r.image.width(), r.image.height()), (800, 400));
    }

    #[test]
    fn render_rejects_oversized_canvas() {
        // 2x60000 scales to 800x24000000
        let tall = photo(2, 60_000);
        let err = render(&tall, &overlay("x", "y"), &RenderOptions::default()).unwrap_err();
        match err {
            Notice::Decode(msg) => assert!(msg.contains("800x24000000"), "{msg}"),
            other => panic!("unexpected notice: {other:?}"),
        }
    }

    #[test]
    fn render_accepts_tall_photo_within_limit() {
        let r = render(&photo(100, 1_000), &overlay("x", "y"), &RenderOptions::default()).unwrap();
        assert_eq!((r.image.width(), r.image.height()), (800, 8_000));
    }

    #[test]
    fn render_rejects_undecodable_bytes() {
        let junk = Photo::from_bytes("broken.jpg", b"definitely not a jpeg".to_vec());
        let err = render(&junk, &overlay("x", "y"), &RenderOptions::default()).unwrap_err();
        assert!(matches!(err, Notice::Decode(_)));
    }
}
