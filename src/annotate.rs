//! Draw detected element boxes onto a screenshot for later inspection.
//!
//! Boxes are red above [`HIGH_CONFIDENCE`] and yellow otherwise, each with a
//! short `kind: description` label above its top-left corner.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use crate::element::DetectedElement;
use crate::error::Result;

/// Confidence above which a box is drawn red.
pub const HIGH_CONFIDENCE: f64 = 0.7;

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const YELLOW: Rgba<u8> = Rgba([255, 255, 0, 255]);
const BOX_THICKNESS: i64 = 3;
const LABEL_SCALE: i64 = 2;
const LABEL_CHARS: usize = 20;

pub fn box_colour(confidence: f64) -> Rgba<u8> {
    if confidence > HIGH_CONFIDENCE {
        RED
    } else {
        YELLOW
    }
}

/// Annotate PNG (or any format `image` can decode) `screenshot` with the
/// boxes of `elements`. Elements without a usable box are skipped.
/// Returns PNG bytes.
pub fn annotate_elements(screenshot: &[u8], elements: &[DetectedElement]) -> Result<Vec<u8>> {
    let mut canvas = image::load_from_memory(screenshot)?.to_rgba8();

    for element in elements.iter().filter(|e| e.is_actionable()) {
        let b = element.bounding_box;
        let (x1, y1) = (i64::from(b.x), i64::from(b.y));
        let (x2, y2) = (x1 + i64::from(b.width), y1 + i64::from(b.height));
        draw_rect(&mut canvas, x1, y1, x2, y2, box_colour(element.confidence));

        let description: String = element.description.chars().take(LABEL_CHARS).collect();
        let label = format!("{}: {description}", element.kind.as_str());
        let label_y = (y1 - 7 * LABEL_SCALE).max(0);
        draw_text(&mut canvas, x1, label_y, &label, RED);
    }

    let mut out = Vec::new();
    DynamicImage::ImageRgba8(canvas).write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
    Ok(out)
}

fn put(canvas: &mut RgbaImage, x: i64, y: i64, col: Rgba<u8>) {
    if x >= 0 && y >= 0 && x < i64::from(canvas.width()) && y < i64::from(canvas.height()) {
        canvas.put_pixel(x as u32, y as u32, col);
    }
}

/// Outline drawn inward from the box edges, clipped to the canvas.
fn draw_rect(canvas: &mut RgbaImage, x1: i64, y1: i64, x2: i64, y2: i64, col: Rgba<u8>) {
    let (w, h) = (i64::from(canvas.width()), i64::from(canvas.height()));
    let (cx1, cx2) = (x1.max(0), x2.min(w - 1));
    let (cy1, cy2) = (y1.max(0), y2.min(h - 1));

    for t in 0..BOX_THICKNESS {
        for x in cx1..=cx2 {
            put(canvas, x, y1 + t, col);
            put(canvas, x, y2 - t, col);
        }
        for y in cy1..=cy2 {
            put(canvas, x1 + t, y, col);
            put(canvas, x2 - t, y, col);
        }
    }
}

fn draw_text(canvas: &mut RgbaImage, x: i64, y: i64, text: &str, col: Rgba<u8>) {
    let advance = 6 * LABEL_SCALE;
    for (i, c) in text.to_uppercase().chars().enumerate() {
        let gx = x + i as i64 * advance;
        if gx >= i64::from(canvas.width()) {
            break;
        }
        let Some(glyph) = glyph(c) else {
            continue;
        };
        for (row, bits) in glyph.iter().enumerate() {
            for bit in 0..5i64 {
                if (bits >> (4 - bit)) & 1 == 0 {
                    continue;
                }
                for sy in 0..LABEL_SCALE {
                    for sx in 0..LABEL_SCALE {
                        put(
                            canvas,
                            gx + bit * LABEL_SCALE + sx,
                            y + row as i64 * LABEL_SCALE + sy,
                            col,
                        );
                    }
                }
            }
        }
    }
}

fn glyph(c: char) -> Option<[u8; 5]> {
    match c {
        '0'..='9' => Some(FONT[(c as u8 - b'0') as usize]),
        'A'..='Z' => Some(FONT[10 + (c as u8 - b'A') as usize]),
        ':' => Some([0b00000, 0b00100, 0b00000, 0b00100, 0b00000]),
        '-' => Some([0b00000, 0b00000, 0b01110, 0b00000, 0b00000]),
        '.' => Some([0b00000, 0b00000, 0b00000, 0b00000, 0b00100]),
        _ => None,
    }
}

/// 5×5 bitmap font: digits then capital letters.
const FONT: [[u8; 5]; 36] = [
    [0b01110, 0b10001, 0b10001, 0b10001, 0b01110],
    [0b00100, 0b01100, 0b00100, 0b00100, 0b01110],
    [0b01110, 0b10001, 0b00110, 0b01000, 0b11111],
    [0b11110, 0b00001, 0b00110, 0b00001, 0b11110],
    [0b00110, 0b01010, 0b10010, 0b11111, 0b00010],
    [0b11111, 0b10000, 0b11110, 0b00001, 0b11110],
    [0b01110, 0b10000, 0b11110, 0b10001, 0b01110],
    [0b11111, 0b00001, 0b00010, 0b00100, 0b00100],
    [0b01110, 0b10001, 0b01110, 0b10001, 0b01110],
    [0b01110, 0b10001, 0b01111, 0b00001, 0b01110],
    [0b01110, 0b10001, 0b11111, 0b10001, 0b10001],
    [0b11110, 0b10001, 0b11110, 0b10001, 0b11110],
    [0b01110, 0b10000, 0b10000, 0b10000, 0b01110],
    [0b11100, 0b10010, 0b10001, 0b10010, 0b11100],
    [0b11111, 0b10000, 0b11110, 0b10000, 0b11111],
    [0b11111, 0b10000, 0b11110, 0b10000, 0b10000],
    [0b01110, 0b10000, 0b10011, 0b10001, 0b01110],
    [0b10001, 0b10001, 0b11111, 0b10001, 0b10001],
    [0b01110, 0b00100, 0b00100, 0b00100, 0b01110],
    [0b00111, 0b00010, 0b00010, 0b10010, 0b01100],
    [0b10001, 0b10010, 0b11100, 0b10010, 0b10001],
    [0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
    [0b10001, 0b11011, 0b10101, 0b10001, 0b10001],
    [0b10001, 0b11001, 0b10101, 0b10011, 0b10001],
    [0b01110, 0b10001, 0b10001, 0b10001, 0b01110],
    [0b11110, 0b10001, 0b11110, 0b10000, 0b10000],
    [0b01110, 0b10001, 0b10101, 0b10010, 0b01101],
    [0b11110, 0b10001, 0b11110, 0b10010, 0b10001],
    [0b01111, 0b10000, 0b01110, 0b00001, 0b11110],
    [0b11111, 0b00100, 0b00100, 0b00100, 0b00100],
    [0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
    [0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
    [0b10001, 0b10001, 0b10101, 0b11011, 0b10001],
    [0b10001, 0b01010, 0b00100, 0b01010, 0b10001],
    [0b10001, 0b01010, 0b00100, 0b00100, 0b00100],
    [0b11111, 0b00010, 0b00100, 0b01000, 0b11111],
];
