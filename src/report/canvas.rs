//! Cursor-driven drawing surface on top of `printpdf`.
//!
//! Coordinates are millimetres from the top-left corner of an A4 portrait
//! page; they are flipped to PDF's bottom-left origin at draw time. Text uses
//! the built-in Helvetica faces, so no font program is embedded.

use image::{DynamicImage, GenericImageView};
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point,
};

use super::ReportError;
use super::text;

pub const PAGE_WIDTH: f64 = 210.0;
pub const PAGE_HEIGHT: f64 = 297.0;
pub const MARGIN: f64 = 10.0;
pub const BOTTOM_MARGIN: f64 = 20.0;
/// Points per millimetre
const SCALE: f64 = 72.0 / 25.4;
const CELL_PADDING: f64 = 1.0;
const LINE_WIDTH_PT: f32 = 0.57;
const IMAGE_DPI: f64 = 300.0;
const LAYER: &str = "Contenido";

/// Helvetica advance widths (1/1000 em) for U+0020..=U+007E
const WIDTHS_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778,
    722, 667, 611, 722, 667, 944, 667, 667, 611, // 'A'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556,
    333, 500, 278, 556, 500, 722, 500, 500, 500, // 'a'..'z'
    334, 260, 334, 584, // '{'..'~'
];

/// Helvetica advance widths for U+00A0..=U+00FF
const WIDTHS_LATIN1: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];

fn glyph_width(c: char) -> u16 {
    match c as u32 {
        code @ 0x20..=0x7e => WIDTHS_ASCII[(code - 0x20) as usize],
        code @ 0xa0..=0xff => WIDTHS_LATIN1[(code - 0xa0) as usize],
        _ => WIDTHS_ASCII[usize::from(b'?' - 0x20)],
    }
}

fn mm(value: f64) -> Mm {
    Mm(value as f32)
}

fn pdf_error<E: std::fmt::Debug>(e: E) -> ReportError {
    ReportError::PdfError(format!("{e:?}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Border {
    None,
    Frame,
}

/// Where the cursor goes after a cell is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Right,
    NextLine,
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

impl Fonts {
    fn get(&self, style: FontStyle) -> &IndirectFontRef {
        match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
            FontStyle::Italic => &self.italic,
        }
    }
}

pub struct Canvas {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    fonts: Fonts,
    pages: usize,
    x: f64,
    y: f64,
    style: FontStyle,
    size_pt: f64,
    image: Option<DynamicImage>,
}

impl Canvas {
    /// The document starts with one page already allocated; the first
    /// [`Canvas::add_page`] call claims it.
    pub fn new(title: &str) -> Result<Self, ReportError> {
        let (doc, page, layer) = PdfDocument::new(title, mm(PAGE_WIDTH), mm(PAGE_HEIGHT), LAYER);
        let fonts = Fonts {
            regular: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?,
            bold: doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?,
            italic: doc.add_builtin_font(BuiltinFont::HelveticaOblique).map_err(pdf_error)?,
        };
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            fonts,
            pages: 0,
            x: MARGIN,
            y: MARGIN,
            style: FontStyle::Regular,
            size_pt: 12.0,
            image: None,
        })
    }

    pub fn add_page(&mut self) {
        if self.pages > 0 {
            let (page, layer) = self.doc.add_page(mm(PAGE_WIDTH), mm(PAGE_HEIGHT), LAYER);
            self.layer = self.doc.get_page(page).get_layer(layer);
        }
        self.layer.set_outline_thickness(LINE_WIDTH_PT);
        self.pages += 1;
        self.x = MARGIN;
        self.y = MARGIN;
    }

    pub fn page_no(&self) -> usize {
        self.pages
    }

    pub fn set_font(&mut self, style: FontStyle, size_pt: f64) {
        self.style = style;
        self.size_pt = size_pt;
    }

    /// Font size in millimetres
    fn font_size(&self) -> f64 {
        self.size_pt / SCALE
    }

    /// Move to the left margin at `y`; negative values count from the bottom edge
    pub fn set_y(&mut self, y: f64) {
        self.x = MARGIN;
        self.y = if y >= 0.0 { y } else { PAGE_HEIGHT + y };
    }

    pub fn ln(&mut self, h: f64) {
        self.x = MARGIN;
        self.y += h;
    }

    /// Whether a row of height `h` still fits above the bottom margin
    pub fn fits(&self, h: f64) -> bool {
        self.y + h <= PAGE_HEIGHT - BOTTOM_MARGIN
    }

    /// Rendered width in millimetres. Bold text is measured with the regular
    /// metrics, which only shifts centred titles slightly.
    pub fn text_width(&self, value: &str) -> f64 {
        let units: u32 = value.chars().map(|c| u32::from(glyph_width(c))).sum();
        f64::from(units) * self.font_size() / 1000.0
    }

    fn frame(&self, x: f64, y: f64, w: f64, h: f64) {
        let corner = |cx: f64, cy: f64| (Point::new(mm(cx), mm(PAGE_HEIGHT - cy)), false);
        self.layer.add_line(Line {
            points: vec![corner(x, y), corner(x + w, y), corner(x + w, y + h), corner(x, y + h)],
            is_closed: true,
        });
    }

    /// Draw one cell at the cursor. A width of zero extends to the right margin.
    pub fn cell(&mut self, w: f64, h: f64, value: &str, border: Border, advance: Advance, align: Align) {
        let w = if w == 0.0 { PAGE_WIDTH - MARGIN - self.x } else { w };

        if border == Border::Frame {
            self.frame(self.x, self.y, w, h);
        }

        if !value.is_empty() {
            let clean = text::sanitize(value);
            let dx = match align {
                Align::Left => CELL_PADDING,
                Align::Center => (w - self.text_width(&clean)) / 2.0,
            };
            let baseline = self.y + 0.5 * h + 0.3 * self.font_size();
            self.layer.use_text(
                clean,
                self.size_pt as f32,
                mm(self.x + dx),
                mm(PAGE_HEIGHT - baseline),
                self.fonts.get(self.style),
            );
        }

        match advance {
            Advance::Right => self.x += w,
            Advance::NextLine => {
                self.x = MARGIN;
                self.y += h;
            }
        }
    }

    pub fn set_image(&mut self, image: DynamicImage) {
        self.image = Some(image);
    }

    /// Place the document image with its top-left corner at (`x`, `y`) and
    /// the given width; height follows the aspect ratio.
    pub fn draw_image(&mut self, x: f64, y: f64, w: f64) -> bool {
        let Some(image) = &self.image else {
            return false;
        };
        let (px_w, px_h) = image.dimensions();
        if px_w == 0 || px_h == 0 {
            return false;
        }
        let h = w * f64::from(px_h) / f64::from(px_w);
        let scale = w / (f64::from(px_w) / IMAGE_DPI * 25.4);
        Image::from_dynamic_image(image).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(mm(x)),
                translate_y: Some(mm(PAGE_HEIGHT - (y + h))),
                scale_x: Some(scale as f32),
                scale_y: Some(scale as f32),
                dpi: Some(IMAGE_DPI as f32),
                ..Default::default()
            },
        );
        true
    }

    /// Serialize the document
    pub fn finish(self) -> Result<Vec<u8>, ReportError> {
        self.doc.save_to_bytes().map_err(pdf_error)
    }
}
