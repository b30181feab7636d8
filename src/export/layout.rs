//! Pure layout calculations for exported pages.
//!
//! All functions here are pure and testable without any I/O, images or PDF
//! objects. Lengths are in PDF points.

/// An axis-aligned box with its origin at the bottom-left corner, the way PDF
/// coordinates run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn top(&self) -> f32 {
        self.y + self.height
    }
}

/// Largest size with the source's aspect ratio that fits inside `region`.
///
/// # Arguments
/// * `source` - Image dimensions in pixels (width, height)
/// * `region` - Available space (width, height)
///
/// # Returns
/// * `(width, height)` - One side matches the region, the other is at most it
///
/// # Examples
/// ```
/// # use bedtime_whys::export::layout::fit_within;
/// // Square image into a wide region → limited by height
/// assert_eq!(fit_within((1024, 1024), (500.0, 400.0)), (400.0, 400.0));
/// ```
pub fn fit_within(source: (u32, u32), region: (f32, f32)) -> (f32, f32) {
    let (src_w, src_h) = source;
    let (reg_w, reg_h) = region;
    if src_w == 0 || src_h == 0 || reg_w <= 0.0 || reg_h <= 0.0 {
        return (0.0, 0.0);
    }

    let scale = (reg_w / src_w as f32).min(reg_h / src_h as f32);
    (src_w as f32 * scale, src_h as f32 * scale)
}

/// Place a box of `size` in the middle of `outer`.
pub fn center_in(size: (f32, f32), outer: Rect) -> Rect {
    let (w, h) = size;
    Rect::new(
        outer.x + (outer.width - w) / 2.0,
        outer.y + (outer.height - h) / 2.0,
        w,
        h,
    )
}

/// Pixel size worth embedding for an image drawn at `drawn` points.
///
/// Images are never upscaled; anything larger than twice the drawn size
/// (enough for print) is brought down to that.
pub fn embed_size(source: (u32, u32), drawn: (f32, f32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let max_w = (drawn.0 * 2.0).ceil().max(1.0) as u32;
    let max_h = (drawn.1 * 2.0).ceil().max(1.0) as u32;
    if src_w <= max_w && src_h <= max_h {
        return source;
    }
    let scale = (max_w as f64 / src_w as f64).min(max_h as f64 / src_h as f64);
    (
        ((src_w as f64 * scale).round() as u32).max(1),
        ((src_h as f64 * scale).round() as u32).max(1),
    )
}

/// Greedy word wrap to at most `width` characters per line.
///
/// Words longer than `width` are split across lines. Existing whitespace,
/// including newlines, is collapsed.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_len = 0;

    for word in text.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        for piece in chars.chunks(width) {
            let piece_len = piece.len();
            let needed = if line_len == 0 {
                piece_len
            } else {
                line_len + 1 + piece_len
            };
            if needed > width && line_len > 0 {
                lines.push(std::mem::take(&mut line));
                line_len = 0;
            }
            if line_len > 0 {
                line.push(' ');
                line_len += 1;
            }
            line.extend(piece);
            line_len += piece_len;
        }
    }
    if line_len > 0 {
        lines.push(line);
    }
    lines
}
