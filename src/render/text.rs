use font8x8::{BASIC_FONTS, LATIN_FONTS, UnicodeFonts};
use image::{Rgba, RgbaImage};

/// Glyph cell edge in unscaled pixels.
pub const GLYPH_SIZE: u32 = 8;

/// Pixel width of `text` at `scale`, including the extra column a bold
/// stroke adds.
pub fn text_width(text: &str, scale: u32, bold: bool) -> u32 {
    let chars = text.chars().count() as u32;
    if chars == 0 {
        return 0;
    }
    chars * GLYPH_SIZE * scale.max(1) + u32::from(bold)
}

fn glyph(ch: char) -> Option<[u8; 8]> {
    BASIC_FONTS
        .get(ch)
        .or_else(|| LATIN_FONTS.get(ch))
        .or_else(|| BASIC_FONTS.get('?'))
}

/// Source-over blend of `src` onto `dst`.
pub fn blend_pixel(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let a = u32::from(src[3]);
    if a == 0 {
        return dst;
    }
    let inv = 255 - a;
    let mix = |d: u8, s: u8| ((u32::from(d) * inv + u32::from(s) * a + 127) / 255) as u8;
    let out_a = (u32::from(dst[3]) * inv + 255 * a + 127) / 255;
    Rgba([mix(dst[0], src[0]), mix(dst[1], src[1]), mix(dst[2], src[2]), out_a as u8])
}

/// Blend `color` over every pixel in rows `top..bottom` across the full width.
pub fn fill_band(img: &mut RgbaImage, top: u32, bottom: u32, color: Rgba<u8>) {
    let bottom = bottom.min(img.height());
    for y in top..bottom {
        for x in 0..img.width() {
            let dst = *img.get_pixel(x, y);
            img.put_pixel(x, y, blend_pixel(dst, color));
        }
    }
}

/// Draw one line of bitmap text with its top-left corner at (`x`, `y`).
///
/// Bold text is struck twice, one pixel apart. Pixels outside the image are
/// clipped.
pub fn draw_text(img: &mut RgbaImage, x: i32, y: i32, text: &str, color: Rgba<u8>, scale: u32, bold: bool) {
    let passes: &[i32] = if bold { &[0, 1] } else { &[0] };
    for &offset in passes {
        draw_pass(img, x + offset, y, text, color, scale);
    }
}

fn draw_pass(img: &mut RgbaImage, x: i32, y: i32, text: &str, color: Rgba<u8>, scale: u32) {
    let scale = scale.max(1) as i32;
    let (w, h) = (img.width() as i32, img.height() as i32);
    let mut cursor_x = x;
    for ch in text.chars() {
        if let Some(rows) = glyph(ch) {
            for (row_idx, row) in rows.into_iter().enumerate() {
                for col in 0..GLYPH_SIZE as i32 {
                    if (row >> col) & 1 == 0 {
                        continue;
                    }
                    let px = cursor_x + col * scale;
                    let py = y + row_idx as i32 * scale;
                    for sy in 0..scale {
                        for sx in 0..scale {
                            let (tx, ty) = (px + sx, py + sy);
                            if tx >= 0 && ty >= 0 && tx < w && ty < h {
                                let dst = *img.get_pixel(tx as u32, ty as u32);
                                img.put_pixel(tx as u32, ty as u32, blend_pixel(dst, color));
                            }
                        }
                    }
                }
            }
        }
        cursor_x += GLYPH_SIZE as i32 * scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    #[test]
    fn width_counts_chars_not_bytes() {
        assert_eq!(text_width("abc", 2, false), 48);
        assert_eq!(text_width("São", 1, false), 24);
        assert_eq!(text_width("ab", 3, true), 49);
        assert_eq!(text_width("", 3, true), 0);
    }

    #[test]
    fn blend_extremes() {
        let dst = Rgba([10, 20, 30, 255]);
        assert_eq!(blend_pixel(dst, Rgba([0, 0, 0, 0])), dst);
        assert_eq!(blend_pixel(dst, WHITE), WHITE);
        let half = blend_pixel(Rgba([200, 200, 200, 255]), Rgba([0, 0, 0, 128]));
        assert!(half[0] > 90 && half[0] < 110, "got {half:?}");
        assert_eq!(half[3], 255);
    }

    #[test]
    fn draw_text_marks_pixels_inside_its_box() {
        let mut img = RgbaImage::from_pixel(40, 20, Rgba([0, 0, 0, 255]));
        draw_text(&mut img, 4, 4, "H", WHITE, 1, false);
        let lit: Vec<(u32, u32)> = img
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] == 255)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!lit.is_empty());
        assert!(lit.iter().all(|&(x, y)| (4..12).contains(&x) && (4..12).contains(&y)));
    }

    #[test]
    fn draw_text_clips_at_edges() {
        let mut img = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        draw_text(&mut img, -20, -4, "WWWWW", WHITE, 2, true);
        draw_text(&mut img, 6, 6, "WWWWW", WHITE, 2, true);
    }

    #[test]
    fn fill_band_only_touches_band_rows() {
        let mut img = RgbaImage::from_pixel(4, 6, Rgba([200, 200, 200, 255]));
        fill_band(&mut img, 4, 10, Rgba([0, 0, 0, 128]));
        assert_eq!(*img.get_pixel(0, 3), Rgba([200, 200, 200, 255]));
        assert!(img.get_pixel(3, 4)[0] < 200);
        assert!(img.get_pixel(3, 5)[0] < 200);
    }
}
