//! PDF rendering with `lopdf`.
//!
//! Each book page becomes one fixed-size PDF page: the illustration scaled to
//! fit and centered in the top region, the narrative wrapped underneath. Text
//! uses a standard-14 Type1 font with WinAnsi encoding so nothing needs to be
//! embedded; characters outside that encoding are drawn as `?`.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

use super::layout::{Rect, center_in, embed_size, fit_within, wrap_text};
use crate::config::ExportConfig;
use crate::types::{Book, Page};

pub const FALLBACK_FONT: &str = "Helvetica";

/// Fonts every PDF reader provides without embedding.
pub const STANDARD_FONTS: [&str; 14] = [
    "Times-Roman",
    "Times-Bold",
    "Times-Italic",
    "Times-BoldItalic",
    "Helvetica",
    "Helvetica-Bold",
    "Helvetica-Oblique",
    "Helvetica-BoldOblique",
    "Courier",
    "Courier-Bold",
    "Courier-Oblique",
    "Courier-BoldOblique",
    "Symbol",
    "ZapfDingbats",
];

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("book \"{0}\" has no pages")]
    EmptyBook(String),
    #[error("cannot read illustration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode illustration {}: {message}", path.display())]
    Image { path: PathBuf, message: String },
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("cannot write PDF: {0}")]
    Write(#[from] std::io::Error),
}

/// The configured font if it is a standard font, otherwise [`FALLBACK_FONT`].
pub fn resolve_font(requested: &str) -> &'static str {
    match STANDARD_FONTS
        .iter()
        .copied()
        .find(|f| f.eq_ignore_ascii_case(requested.trim()))
    {
        Some(font) => font,
        None => {
            warn!(font = requested, fallback = FALLBACK_FONT, "font is not a PDF standard font");
            FALLBACK_FONT
        }
    }
}

/// Render `book` as a PDF document, one page per book page in order.
pub fn export_book(book: &Book, config: &ExportConfig) -> Result<Vec<u8>, ExportError> {
    if book.pages.is_empty() {
        return Err(ExportError::EmptyBook(book.title.clone()));
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => resolve_font(&config.font),
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids: Vec<Object> = Vec::with_capacity(book.pages.len());
    for (i, page) in book.pages.iter().enumerate() {
        let page_id = add_page(&mut doc, pages_id, font_id, page, config)?;
        debug!(page = i + 1, "exported page");
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(config.page_width),
                Object::Real(config.page_height),
            ],
        }),
    );

    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(encode_text(&book.title), StringFormat::Literal),
        "Producer" => Object::string_literal(concat!("bedtime-whys ", env!("CARGO_PKG_VERSION"))),
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    page: &Page,
    config: &ExportConfig,
) -> Result<ObjectId, ExportError> {
    let region = Rect::new(
        config.margin,
        config.page_height - config.margin - config.image_height,
        config.page_width - config.margin * 2.0,
        config.image_height,
    );

    let img = load_illustration(page)?;
    let drawn = fit_within(img.dimensions(), (region.width, region.height));
    let placed = center_in(drawn, region);
    let image_id = doc.add_object(jpeg_xobject(&img, drawn, config.jpeg_quality, page)?);

    let mut operations = vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                Object::Real(placed.width),
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(placed.height),
                Object::Real(placed.x),
                Object::Real(placed.y),
            ],
        ),
        Operation::new("Do", vec!["Im1".into()]),
        Operation::new("Q", vec![]),
    ];
    operations.extend(text_operations(&page.text, region, config));

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
            "XObject" => dictionary! { "Im1" => image_id },
        },
    }))
}

/// Wrapped narrative below the illustration region. Lines that would run into
/// the bottom margin are dropped.
fn text_operations(text: &str, region: Rect, config: &ExportConfig) -> Vec<Operation> {
    let lines = wrap_text(text, config.wrap_width);
    let first_baseline = region.y - config.margin / 2.0 - config.font_size;
    let room = ((first_baseline - config.margin) / config.line_height).floor() as usize + 1;
    if lines.len() > room {
        warn!(lines = lines.len(), room, "narrative does not fit on the page; truncating");
    }

    let mut ops = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), Object::Real(config.font_size)]),
        Operation::new(
            "Td",
            vec![Object::Real(config.margin), Object::Real(first_baseline)],
        ),
    ];
    for (i, line) in lines.iter().take(room).enumerate() {
        if i > 0 {
            ops.push(Operation::new(
                "Td",
                vec![Object::Integer(0), Object::Real(-config.line_height)],
            ));
        }
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(encode_text(line), StringFormat::Literal)],
        ));
    }
    ops.push(Operation::new("ET", vec![]));
    ops
}

fn load_illustration(page: &Page) -> Result<DynamicImage, ExportError> {
    let path = PathBuf::from(&page.image_path);
    let bytes = std::fs::read(&path).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    image::load_from_memory(&bytes).map_err(|e| ExportError::Image {
        path,
        message: e.to_string(),
    })
}

/// JPEG image XObject, downsampled to what the drawn size needs.
fn jpeg_xobject(
    img: &DynamicImage,
    drawn: (f32, f32),
    quality: u8,
    page: &Page,
) -> Result<Stream, ExportError> {
    let (w, h) = embed_size(img.dimensions(), drawn);
    let rgb = if (w, h) == img.dimensions() {
        DynamicImage::ImageRgb8(img.to_rgb8())
    } else {
        DynamicImage::ImageRgb8(img.resize_exact(w, h, FilterType::Lanczos3).to_rgb8())
    };

    let mut jpeg = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, quality))
        .map_err(|e| ExportError::Image {
            path: PathBuf::from(&page.image_path),
            message: e.to_string(),
        })?;

    let dict: Dictionary = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => w as i64,
        "Height" => h as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8_i64,
        "Filter" => "DCTDecode",
    };
    Ok(Stream::new(dict, jpeg).with_compression(false))
}

/// Text as WinAnsi bytes; anything unmappable becomes `?`.
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2026}' => 0x85,
            c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}
