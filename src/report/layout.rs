//! Paginated report layout.
//!
//! Walks a single vertical cursor down A4 pages (PDF coordinates, origin at
//! the bottom-left corner) and emits draw instructions for the renderer: a
//! fixed header, one titled box per slot of every section, and a closing
//! conclusion block. Each slot box is either a scaled photo or a placeholder
//! rectangle; a photo that cannot be decoded degrades to the placeholder.

use chrono::NaiveDate;
use log::{debug, warn};

use super::decode::{DecodedImage, ImageDecoder};
use super::registry::{ChecklistType, SectionEntry, Slot, SlotRegistry};
use super::SlotMapping;

pub const PAGE_WIDTH: f32 = 595.0;
pub const PAGE_HEIGHT: f32 = 842.0;
pub const MARGIN: f32 = 40.0;

/// Vertical budget of one slot box, section title excluded.
pub const IMAGE_SECTION_HEIGHT: f32 = 220.0;
pub const SECTION_TITLE_STEP: f32 = 16.0;
pub const BOX_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
pub const BOX_HEIGHT: f32 = IMAGE_SECTION_HEIGHT - 24.0;
const BOX_BOTTOM_OFFSET: f32 = 8.0;
pub const BLOCK_GAP: f32 = 6.0;
pub const CONCLUSION_BUDGET: f32 = 80.0;
const PARAGRAPH_LEADING: f32 = 12.0;

pub const REPORT_TITLE: &str = "CHECKLIST – Implantação CEF Wi-Fi";
pub const REPORT_VERSION: &str = "01";
const INTEGRATOR_LINE: &str = "Integradora: TELEFONICA DATA S.A. / BRASIL S/A";
const CONTRACT_LINE: &str = "Contrato: TELEFONICA DATA - IOT BIG DATA MANUTENÇÃO";
const OBJECTIVE_LINES: [&str; 3] = [
    "Objetivo",
    "Este documento detalha a instalação do produto de prateleira Wi-Fi nas dependências",
    "do cliente descrito e atesta a funcionalidade dos equipamentos.",
];
const CONCLUSION_TITLE: &str = "Conclusão";
const CONCLUSION_LINES: [&str; 3] = [
    "Atividade conforme demonstrado anteriormente.",
    "Realizado o teste de velocidade do link (conforme prints anexados).",
    "Obs.: Os equipamentos descritos abaixo ficaram instalados na agência.",
];
pub const PLACEHOLDER_CAPTION: &str = "Imagem não fornecida para este campo";

/// Base-14 fonts used by the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Font {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
}

impl Font {
    pub const ALL: [Font; 3] = [Font::Helvetica, Font::HelveticaBold, Font::HelveticaOblique];

    pub fn base_name(&self) -> &'static str {
        match self {
            Font::Helvetica => "Helvetica",
            Font::HelveticaBold => "Helvetica-Bold",
            Font::HelveticaOblique => "Helvetica-Oblique",
        }
    }

    /// Name of the font in page resources.
    pub fn resource_name(&self) -> &'static str {
        match self {
            Font::Helvetica => "F1",
            Font::HelveticaBold => "F2",
            Font::HelveticaOblique => "F3",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawInstruction {
    Text {
        x: f32,
        y: f32,
        font: Font,
        size: f32,
        text: String,
    },
    /// Stroked rectangle outline.
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    /// Place `ReportLayout::images[image]` scaled into the given box.
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        image: usize,
    },
    /// Close the current page and continue on a fresh one.
    PageBreak,
    /// Close the last page. Always the final instruction.
    ClosePage,
}

/// Everything one generation attempt needs to lay out the report.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub ticket_number: String,
    pub installation_date: NaiveDate,
    pub checklist_type: ChecklistType,
    pub mapping: SlotMapping,
    pub force: bool,
}

/// Draw instructions plus the decoded images they reference.
#[derive(Debug, Clone, Default)]
pub struct ReportLayout {
    pub instructions: Vec<DrawInstruction>,
    pub images: Vec<DecodedImage>,
}

impl ReportLayout {
    pub fn page_count(&self) -> usize {
        self.instructions
            .iter()
            .filter(|i| matches!(i, DrawInstruction::PageBreak | DrawInstruction::ClosePage))
            .count()
    }

    pub fn placeholder_count(&self) -> usize {
        self.instructions
            .iter()
            .filter(|i| matches!(i, DrawInstruction::Rect { .. }))
            .count()
    }

    pub fn image_count(&self) -> usize {
        self.instructions
            .iter()
            .filter(|i| matches!(i, DrawInstruction::Image { .. }))
            .count()
    }
}

/// Uniform scale that fits an image into a box without ever enlarging it.
pub fn fit_scale(image_width: u32, image_height: u32, box_width: f32, box_height: f32) -> f32 {
    (box_width / image_width as f32)
        .min(box_height / image_height as f32)
        .min(1.0)
}

struct PageCursor {
    y: f32,
    instructions: Vec<DrawInstruction>,
}

impl PageCursor {
    fn new() -> Self {
        Self {
            y: PAGE_HEIGHT - MARGIN,
            instructions: Vec::new(),
        }
    }

    fn text(&mut self, x: f32, font: Font, size: f32, text: impl Into<String>) {
        self.instructions.push(DrawInstruction::Text {
            x,
            y: self.y,
            font,
            size,
            text: text.into(),
        });
    }

    /// Lines at a fixed leading, leaving the cursor one leading below the last.
    fn paragraph(&mut self, x: f32, font: Font, size: f32, lines: &[&str]) {
        for line in lines {
            self.text(x, font, size, *line);
            self.advance(PARAGRAPH_LEADING);
        }
    }

    fn advance(&mut self, dy: f32) {
        self.y -= dy;
    }

    fn ensure_room(&mut self, budget: f32) {
        if self.y - budget < MARGIN {
            self.page_break();
        }
    }

    fn page_break(&mut self) {
        self.instructions.push(DrawInstruction::PageBreak);
        self.y = PAGE_HEIGHT - MARGIN;
    }
}

/// Lays out one report. Holds only borrowed, read-only collaborators.
pub struct LayoutEngine<'a> {
    registry: &'a SlotRegistry,
    decoder: &'a dyn ImageDecoder,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(registry: &'a SlotRegistry, decoder: &'a dyn ImageDecoder) -> Self {
        Self { registry, decoder }
    }

    pub fn layout(&self, context: &ReportContext) -> ReportLayout {
        let mut cursor = PageCursor::new();
        let mut images = Vec::new();

        self.header(&mut cursor, context);
        for section in self.registry.sections() {
            self.section(&mut cursor, &mut images, section, &context.mapping);
        }
        self.conclusion(&mut cursor);
        cursor.instructions.push(DrawInstruction::ClosePage);

        let layout = ReportLayout {
            instructions: cursor.instructions,
            images,
        };
        debug!(
            "Laid out report {}: {} page(s), {} image(s), {} placeholder(s)",
            context.ticket_number,
            layout.page_count(),
            layout.image_count(),
            layout.placeholder_count()
        );
        layout
    }

    fn header(&self, cursor: &mut PageCursor, context: &ReportContext) {
        cursor.text(MARGIN, Font::HelveticaBold, 14.0, REPORT_TITLE);
        cursor.advance(24.0);

        cursor.text(
            MARGIN,
            Font::Helvetica,
            10.0,
            format!("Nº Chamado: {}", context.ticket_number),
        );
        cursor.text(
            MARGIN + 250.0,
            Font::Helvetica,
            10.0,
            format!("Versão: {}", REPORT_VERSION),
        );
        cursor.text(
            MARGIN + 390.0,
            Font::Helvetica,
            10.0,
            format!(
                "Data instalação: {}",
                context.installation_date.format("%d/%m/%Y")
            ),
        );
        cursor.advance(18.0);

        cursor.text(MARGIN, Font::Helvetica, 10.0, INTEGRATOR_LINE);
        cursor.advance(14.0);
        cursor.text(MARGIN, Font::Helvetica, 10.0, CONTRACT_LINE);
        cursor.advance(22.0);

        cursor.paragraph(MARGIN, Font::Helvetica, 10.0, &OBJECTIVE_LINES);
        cursor.advance(PARAGRAPH_LEADING + BLOCK_GAP);
    }

    fn section(
        &self,
        cursor: &mut PageCursor,
        images: &mut Vec<DecodedImage>,
        section: &SectionEntry,
        mapping: &SlotMapping,
    ) {
        cursor.ensure_room(IMAGE_SECTION_HEIGHT);
        cursor.text(MARGIN, Font::HelveticaBold, 11.0, section.label);
        cursor.advance(SECTION_TITLE_STEP);

        for (index, slot) in section.slots.iter().enumerate() {
            if index > 0 {
                cursor.ensure_room(IMAGE_SECTION_HEIGHT);
            }
            self.slot_box(cursor, images, *slot, mapping);
        }
    }

    fn slot_box(
        &self,
        cursor: &mut PageCursor,
        images: &mut Vec<DecodedImage>,
        slot: Slot,
        mapping: &SlotMapping,
    ) {
        let box_bottom = cursor.y - IMAGE_SECTION_HEIGHT + BOX_BOTTOM_OFFSET;

        match self.load_image(slot, mapping) {
            Some(image) => {
                let scale = fit_scale(image.width, image.height, BOX_WIDTH, BOX_HEIGHT);
                let width = image.width as f32 * scale;
                let height = image.height as f32 * scale;
                cursor.instructions.push(DrawInstruction::Image {
                    x: MARGIN,
                    y: box_bottom + (BOX_HEIGHT - height) / 2.0,
                    width,
                    height,
                    image: images.len(),
                });
                images.push(image);
            }
            None => {
                cursor.instructions.push(DrawInstruction::Rect {
                    x: MARGIN,
                    y: box_bottom,
                    width: BOX_WIDTH,
                    height: BOX_HEIGHT,
                });
                cursor.instructions.push(DrawInstruction::Text {
                    x: MARGIN + 8.0,
                    y: box_bottom + 10.0,
                    font: Font::HelveticaOblique,
                    size: 9.0,
                    text: format!("{} ({}).", PLACEHOLDER_CAPTION, slot),
                });
            }
        }

        cursor.advance(IMAGE_SECTION_HEIGHT + BLOCK_GAP);
    }

    fn load_image(&self, slot: Slot, mapping: &SlotMapping) -> Option<DecodedImage> {
        let file = mapping.get(slot)?;
        match self.decoder.decode(&file.content) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!(
                    "Slot '{}' file '{}' could not be decoded, using placeholder: {}",
                    slot, file.filename, e
                );
                None
            }
        }
    }

    fn conclusion(&self, cursor: &mut PageCursor) {
        cursor.ensure_room(CONCLUSION_BUDGET);
        cursor.text(MARGIN, Font::HelveticaBold, 11.0, CONCLUSION_TITLE);
        cursor.advance(SECTION_TITLE_STEP);
        cursor.paragraph(MARGIN, Font::Helvetica, 10.0, &CONCLUSION_LINES);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ReportError, UploadedFile};
    use image::RgbImage;

    /// Reads "WxH" from the file content; anything else fails to decode.
    struct SizeDecoder;

    impl ImageDecoder for SizeDecoder {
        fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, ReportError> {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| ReportError::ImageDecode(e.to_string()))?;
            let (w, h): (u32, u32) = text
                .split_once('x')
                .and_then(|(w, h)| Some((w.parse().ok()?, h.parse().ok()?)))
                .ok_or_else(|| ReportError::ImageDecode(text.to_string()))?;
            Ok(DecodedImage::from_rgb(RgbImage::new(w, h)))
        }
    }

    fn context(files: Vec<(Slot, &str)>) -> ReportContext {
        ReportContext {
            ticket_number: "20250330762".to_string(),
            installation_date: NaiveDate::from_ymd_opt(2025, 3, 30).unwrap(),
            checklist_type: ChecklistType::Produtiva,
            mapping: files
                .into_iter()
                .map(|(slot, content)| {
                    (slot, UploadedFile::new(format!("{slot}.jpg"), content.as_bytes()))
                })
                .collect(),
            force: true,
        }
    }

    fn image_placement(layout: &ReportLayout) -> (f32, f32, f32, f32) {
        layout
            .instructions
            .iter()
            .find_map(|i| match i {
                DrawInstruction::Image {
                    x, y, width, height, ..
                } => Some((*x, *y, *width, *height)),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_fit_scale_shrinks_large_images() {
        let scale = fit_scale(2000, 1000, BOX_WIDTH, BOX_HEIGHT);
        assert_eq!(scale, (BOX_WIDTH / 2000.0).min(BOX_HEIGHT / 1000.0));
        assert!(scale < 1.0);
    }

    #[test]
    fn test_fit_scale_never_upscales() {
        assert_eq!(fit_scale(100, 50, BOX_WIDTH, BOX_HEIGHT), 1.0);
    }

    #[test]
    fn test_no_files_yields_one_placeholder_per_slot() {
        let registry = SlotRegistry::standard();
        let layout = LayoutEngine::new(&registry, &SizeDecoder).layout(&context(vec![]));

        assert_eq!(layout.placeholder_count(), registry.section_slots().count());
        assert_eq!(layout.image_count(), 0);
        assert!(layout.images.is_empty());
        assert_eq!(layout.instructions.last(), Some(&DrawInstruction::ClosePage));
        assert_eq!(layout.page_count(), 6);
    }

    #[test]
    fn test_large_image_fills_box() {
        let registry = SlotRegistry::standard();
        let layout = LayoutEngine::new(&registry, &SizeDecoder)
            .layout(&context(vec![(Slot::Rack, "1030x392")]));

        // header leaves the cursor at 670; the rack title takes 16 more
        let box_bottom = 670.0 - SECTION_TITLE_STEP - IMAGE_SECTION_HEIGHT + 8.0;
        assert_eq!(image_placement(&layout), (MARGIN, box_bottom, 515.0, 196.0));
        assert_eq!(layout.placeholder_count(), registry.section_slots().count() - 1);
    }

    #[test]
    fn test_small_image_is_centered_vertically_without_upscaling() {
        let registry = SlotRegistry::standard();
        let layout = LayoutEngine::new(&registry, &SizeDecoder)
            .layout(&context(vec![(Slot::Rack, "100x50")]));

        let box_bottom = 670.0 - SECTION_TITLE_STEP - IMAGE_SECTION_HEIGHT + 8.0;
        assert_eq!(
            image_placement(&layout),
            (MARGIN, box_bottom + (BOX_HEIGHT - 50.0) / 2.0, 100.0, 50.0)
        );
    }

    #[test]
    fn test_undecodable_image_becomes_placeholder() {
        let registry = SlotRegistry::standard();
        let layout = LayoutEngine::new(&registry, &SizeDecoder)
            .layout(&context(vec![(Slot::Rack, "corrupted")]));

        assert_eq!(layout.image_count(), 0);
        assert_eq!(layout.placeholder_count(), registry.section_slots().count());
        assert!(layout.instructions.iter().any(|i| matches!(
            i,
            DrawInstruction::Text { text, .. } if text == "Imagem não fornecida para este campo (rack)."
        )));
    }

    #[test]
    fn test_header_lines() {
        let registry = SlotRegistry::standard();
        let layout = LayoutEngine::new(&registry, &SizeDecoder).layout(&context(vec![]));

        let texts: Vec<&str> = layout
            .instructions
            .iter()
            .filter_map(|i| match i {
                DrawInstruction::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts[0], REPORT_TITLE);
        assert_eq!(texts[1], "Nº Chamado: 20250330762");
        assert_eq!(texts[2], "Versão: 01");
        assert_eq!(texts[3], "Data instalação: 30/03/2025");
        assert!(texts.contains(&"Conclusão"));
    }

    #[test]
    fn test_page_break_resets_cursor_to_top() {
        let registry = SlotRegistry::standard();
        let layout = LayoutEngine::new(&registry, &SizeDecoder).layout(&context(vec![]));

        for window in layout.instructions.windows(2) {
            if window[0] == DrawInstruction::PageBreak {
                match &window[1] {
                    DrawInstruction::Text { y, .. } => assert_eq!(*y, PAGE_HEIGHT - MARGIN),
                    other => panic!("unexpected instruction after page break: {other:?}"),
                }
            }
        }
    }

    #[test]
    fn test_nothing_is_drawn_below_the_page() {
        let registry = SlotRegistry::standard();
        let layout = LayoutEngine::new(&registry, &SizeDecoder).layout(&context(vec![]));

        for instruction in &layout.instructions {
            if let DrawInstruction::Rect { y, .. } = instruction {
                assert!(*y >= MARGIN - BOX_BOTTOM_OFFSET, "box bottom at {y}");
            }
        }
    }

    #[test]
    fn test_captive_portal_section_renders_both_slots() {
        let registry = SlotRegistry::standard();
        let layout = LayoutEngine::new(&registry, &SizeDecoder).layout(&context(vec![
            (Slot::PortalLogin, "300x200"),
            (Slot::PortalLoginDepois, "300x200"),
        ]));

        assert_eq!(layout.image_count(), 2);
        assert_eq!(layout.images.len(), 2);
    }
}
