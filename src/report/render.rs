//! PDF rendering of laid out reports.
//!
//! Pages are cut at every `PageBreak`/`ClosePage`. Text uses the base-14
//! Helvetica family with WinAnsi encoding, and photos are embedded as JPEG
//! (`DCTDecode`) image XObjects shared across the document.

use image::codecs::jpeg::JpegEncoder;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeSet;

use super::decode::DecodedImage;
use super::layout::{DrawInstruction, Font, ReportLayout, PAGE_HEIGHT, PAGE_WIDTH};
use super::ReportError;

const PDF_VERSION: &str = "1.5";
const JPEG_QUALITY: u8 = 85;
pub const PRODUCER: &str = concat!("cef-wifi-report-server ", env!("CARGO_PKG_VERSION"));

fn render_err(err: lopdf::Error) -> ReportError {
    ReportError::Render(err.to_string())
}

/// Renders a `ReportLayout` into PDF bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer;

impl PdfRenderer {
    pub fn render(&self, layout: &ReportLayout, title: &str) -> Result<Vec<u8>, ReportError> {
        let mut doc = Document::with_version(PDF_VERSION);
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for font in Font::ALL {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_name(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(font.resource_name(), font_id);
        }
        let fonts_id = doc.add_object(fonts);

        let image_ids = layout
            .images
            .iter()
            .map(|image| embed_image(&mut doc, image))
            .collect::<Result<Vec<_>, _>>()?;

        let mut page_ids: Vec<ObjectId> = Vec::new();
        let mut operations = Vec::new();
        let mut used_images = BTreeSet::new();

        for instruction in &layout.instructions {
            match instruction {
                DrawInstruction::Text {
                    x,
                    y,
                    font,
                    size,
                    text,
                } => {
                    operations.push(Operation::new("BT", vec![]));
                    operations.push(Operation::new(
                        "Tf",
                        vec![font.resource_name().into(), (*size).into()],
                    ));
                    operations.push(Operation::new("Td", vec![(*x).into(), (*y).into()]));
                    operations.push(Operation::new(
                        "Tj",
                        vec![Object::string_literal(encode_win_ansi(text))],
                    ));
                    operations.push(Operation::new("ET", vec![]));
                }
                DrawInstruction::Rect {
                    x,
                    y,
                    width,
                    height,
                } => {
                    operations.push(Operation::new(
                        "re",
                        vec![(*x).into(), (*y).into(), (*width).into(), (*height).into()],
                    ));
                    operations.push(Operation::new("S", vec![]));
                }
                DrawInstruction::Image {
                    x,
                    y,
                    width,
                    height,
                    image,
                } => {
                    if *image >= image_ids.len() {
                        return Err(ReportError::Render(format!(
                            "draw instruction references missing image {}",
                            image
                        )));
                    }
                    operations.push(Operation::new("q", vec![]));
                    operations.push(Operation::new(
                        "cm",
                        vec![
                            (*width).into(),
                            0.0f32.into(),
                            0.0f32.into(),
                            (*height).into(),
                            (*x).into(),
                            (*y).into(),
                        ],
                    ));
                    operations.push(Operation::new(
                        "Do",
                        vec![Object::Name(image_resource_name(*image).into_bytes())],
                    ));
                    operations.push(Operation::new("Q", vec![]));
                    used_images.insert(*image);
                }
                DrawInstruction::PageBreak | DrawInstruction::ClosePage => {
                    let page_id = add_page(
                        &mut doc,
                        pages_id,
                        fonts_id,
                        std::mem::take(&mut operations),
                        &used_images,
                        &image_ids,
                    )?;
                    page_ids.push(page_id);
                    used_images.clear();
                }
            }
        }

        // A layout always ends with ClosePage; anything after it still gets a page.
        if !operations.is_empty() {
            let page_id = add_page(
                &mut doc,
                pages_id,
                fonts_id,
                operations,
                &used_images,
                &image_ids,
            )?;
            page_ids.push(page_id);
        }

        let page_count = page_ids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.into_iter().map(Object::Reference).collect::<Vec<_>>(),
            "Count" => page_count,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                PAGE_WIDTH.into(),
                PAGE_HEIGHT.into(),
            ],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(encode_win_ansi(title)),
            "Producer" => Object::string_literal(PRODUCER),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).map_err(|e| ReportError::Render(e.to_string()))?;
        Ok(buffer)
    }
}

fn image_resource_name(index: usize) -> String {
    format!("Im{}", index)
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    fonts_id: ObjectId,
    operations: Vec<Operation>,
    used_images: &BTreeSet<usize>,
    image_ids: &[ObjectId],
) -> Result<ObjectId, ReportError> {
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(
        Dictionary::new(),
        content.encode().map_err(render_err)?,
    ));

    let mut resources = dictionary! {
        "Font" => fonts_id,
    };
    if !used_images.is_empty() {
        let mut xobjects = Dictionary::new();
        for index in used_images {
            xobjects.set(image_resource_name(*index), image_ids[*index]);
        }
        resources.set("XObject", xobjects);
    }

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources,
    }))
}

fn embed_image(doc: &mut Document, image: &DecodedImage) -> Result<ObjectId, ReportError> {
    let mut jpeg = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY);
    image
        .pixels
        .write_with_encoder(encoder)
        .map_err(|e| ReportError::Render(format!("JPEG encoding failed: {}", e)))?;

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => image.pixels.width() as i64,
        "Height" => image.pixels.height() as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8i64,
        "Filter" => "DCTDecode",
    };
    Ok(doc.add_object(Stream::new(dict, jpeg)))
}

/// Encode text for a WinAnsi (cp1252) simple font. Characters outside the
/// code page become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch {
            '\u{0000}'..='\u{007F}' => ch as u8,
            '\u{00A0}'..='\u{00FF}' => ch as u8,
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{0192}' => 0x83,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{02C6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8A,
            '\u{2039}' => 0x8B,
            '\u{0152}' => 0x8C,
            '\u{017D}' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{02DC}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9A,
            '\u{203A}' => 0x9B,
            '\u{0153}' => 0x9C,
            '\u{017E}' => 0x9E,
            '\u{0178}' => 0x9F,
            _ => b'?',
        })
        .collect()
}
