//! Printable PDF summaries of the financial and attendance tables.
//!
//! Every page carries the organization title (and logo, when configured) and
//! a `Pagina N` footer. The column heading row is printed once, on the first
//! page, followed by one framed row per record.

pub mod canvas;
pub mod text;

use chrono::NaiveDate;
use image::DynamicImage;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::config::Config;
use crate::models::{AttendanceRecord, FinancialMovement, ParseError};
use canvas::{Advance, Align, Border, Canvas, FontStyle};

const ROW_HEIGHT: f64 = 10.0;
const TITLE_GAP: f64 = 20.0;
const FOOTER_OFFSET: f64 = -15.0;
const BODY_FONT_SIZE: f64 = 10.0;
const TITLE_FONT_SIZE: f64 = 15.0;
const FOOTER_FONT_SIZE: f64 = 8.0;
const LOGO_X: f64 = 10.0;
const LOGO_Y: f64 = 8.0;
const LOGO_WIDTH: f64 = 25.0;

const CATEGORY_CHARS: usize = 18;
const MOVEMENT_NOTE_CHARS: usize = 30;
const SERVICE_CHARS: usize = 22;
const ATTENDANCE_NOTE_CHARS: usize = 40;

struct Column {
    heading: &'static str,
    width: f64,
}

const FINANCIAL_COLUMNS: [Column; 5] = [
    Column { heading: "Fecha", width: 30.0 },
    Column { heading: "Tipo", width: 30.0 },
    Column { heading: "Categoria", width: 40.0 },
    Column { heading: "Monto", width: 30.0 },
    Column { heading: "Nota", width: 60.0 },
];

const ATTENDANCE_COLUMNS: [Column; 7] = [
    Column { heading: "Fecha", width: 25.0 },
    Column { heading: "Servicio", width: 45.0 },
    Column { heading: "H", width: 10.0 },
    Column { heading: "M", width: 10.0 },
    Column { heading: "N", width: 10.0 },
    Column { heading: "Total", width: 15.0 },
    Column { heading: "Observaciones", width: 75.0 },
];

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to build PDF: {0}")]
    PdfError(String),
    #[error("Failed to write report {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Finances,
    Attendance,
}

impl ReportKind {
    fn stem(&self) -> &'static str {
        match self {
            ReportKind::Finances => "Finanzas",
            ReportKind::Attendance => "Asistencia",
        }
    }

    /// `Finanzas.pdf`, or `Finanzas_<stamp>.pdf` when a timestamp is given
    pub fn file_name(&self, timestamp: Option<&str>) -> String {
        match timestamp {
            Some(stamp) => format!("{}_{}.pdf", self.stem(), stamp),
            None => format!("{}.pdf", self.stem()),
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stem())
    }
}

impl FromStr for ReportKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "finances" | "finanzas" | "movements" => Ok(ReportKind::Finances),
            "attendance" | "asistencia" => Ok(ReportKind::Attendance),
            _ => Err(ParseError::new("report", s)),
        }
    }
}

/// Page decoration shared by all reports
#[derive(Debug, Clone, Default)]
pub struct ReportLayout {
    pub title: String,
    pub logo: Option<PathBuf>,
}

impl ReportLayout {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            logo: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            title: config.report_title(),
            logo: config.get_logo_path(),
        }
    }

    /// Decode the configured logo (PNG or JPEG). An unreadable or
    /// undecodable file is skipped so the report still renders.
    fn load_logo(&self) -> Option<DynamicImage> {
        let path = self.logo.as_ref()?;
        let decoded = image::io::Reader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(image::ImageError::IoError)
            .and_then(|reader| reader.decode());
        match decoded {
            Ok(logo) => Some(logo),
            Err(e) => {
                tracing::warn!("Skipping logo {:?}: {}", path, e);
                None
            }
        }
    }
}

/// Drives one document from open to close: header on every page, the
/// column headings once, page breaks before rows that would cross the bottom
/// margin, and a footer on every page.
struct ReportBuilder<'a> {
    doc: Canvas,
    title: &'a str,
    columns: &'a [Column],
}

impl<'a> ReportBuilder<'a> {
    fn open(layout: &'a ReportLayout, columns: &'a [Column]) -> Result<Self, ReportError> {
        let mut doc = Canvas::new(&layout.title)?;
        if let Some(logo) = layout.load_logo() {
            doc.set_image(logo);
        }
        let mut builder = Self {
            doc,
            title: &layout.title,
            columns,
        };
        builder.start_page();
        builder.column_headings();
        Ok(builder)
    }

    fn start_page(&mut self) {
        self.doc.add_page();
        self.doc.set_font(FontStyle::Bold, TITLE_FONT_SIZE);
        if self.doc.draw_image(LOGO_X, LOGO_Y, LOGO_WIDTH) {
            self.doc.cell(80.0, 0.0, "", Border::None, Advance::Right, Align::Left);
            self.doc.cell(30.0, ROW_HEIGHT, self.title, Border::None, Advance::NextLine, Align::Center);
        } else {
            self.doc.cell(0.0, ROW_HEIGHT, self.title, Border::None, Advance::NextLine, Align::Center);
        }
        self.doc.ln(TITLE_GAP);
        self.doc.set_font(FontStyle::Regular, BODY_FONT_SIZE);
    }

    fn end_page(&mut self) {
        self.doc.set_y(FOOTER_OFFSET);
        self.doc.set_font(FontStyle::Italic, FOOTER_FONT_SIZE);
        let label = format!("Pagina {}", self.doc.page_no());
        self.doc.cell(0.0, ROW_HEIGHT, &label, Border::None, Advance::Right, Align::Center);
    }

    fn column_headings(&mut self) {
        for column in self.columns {
            self.doc.cell(column.width, ROW_HEIGHT, column.heading, Border::Frame, Advance::Right, Align::Center);
        }
        self.doc.ln(ROW_HEIGHT);
    }

    fn row(&mut self, cells: &[(String, Align)]) {
        if !self.doc.fits(ROW_HEIGHT) {
            self.end_page();
            self.start_page();
        }
        for (column, (value, align)) in self.columns.iter().zip(cells) {
            self.doc.cell(column.width, ROW_HEIGHT, value, Border::Frame, Advance::Right, *align);
        }
        self.doc.ln(ROW_HEIGHT);
    }

    fn close(mut self) -> Result<Vec<u8>, ReportError> {
        self.end_page();
        tracing::debug!(pages = self.doc.page_no(), title = self.title, "Report rendered");
        self.doc.finish()
    }
}

fn date_cell(date: NaiveDate) -> (String, Align) {
    (date.format("%Y-%m-%d").to_string(), Align::Left)
}

/// Render the financial movements table
pub fn render_financial_report(rows: &[FinancialMovement], layout: &ReportLayout) -> Result<Vec<u8>, ReportError> {
    let mut builder = ReportBuilder::open(layout, &FINANCIAL_COLUMNS)?;
    for movement in rows {
        builder.row(&[
            date_cell(movement.date),
            (movement.kind.label().to_string(), Align::Left),
            (text::fit(&movement.category, CATEGORY_CHARS), Align::Left),
            (text::raw_amount(movement.amount), Align::Left),
            (text::fit(&movement.note, MOVEMENT_NOTE_CHARS), Align::Left),
        ]);
    }
    builder.close()
}

/// Render the attendance table with per-record totals
pub fn render_attendance_report(rows: &[AttendanceRecord], layout: &ReportLayout) -> Result<Vec<u8>, ReportError> {
    let mut builder = ReportBuilder::open(layout, &ATTENDANCE_COLUMNS)?;
    for record in rows {
        builder.row(&[
            date_cell(record.date),
            (text::fit(record.service.label(), SERVICE_CHARS), Align::Left),
            (record.men.to_string(), Align::Center),
            (record.women.to_string(), Align::Center),
            (record.children.to_string(), Align::Center),
            (record.total().to_string(), Align::Center),
            (text::fit(&record.note, ATTENDANCE_NOTE_CHARS), Align::Left),
        ]);
    }
    builder.close()
}

/// Write rendered bytes, creating the parent directory when needed
pub fn write_report(path: &Path, bytes: &[u8]) -> Result<(), ReportError> {
    let write_error = |source| ReportError::WriteError {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
    }
    fs::write(path, bytes).map_err(write_error)?;
    tracing::info!("Wrote {} bytes to {:?}", bytes.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ServiceType;
    use crate::test_utils::{
        attendance, date, expense, income, jpeg_bytes, pdf_operator_count, pdf_text, png_bytes, temp_dir,
    };

    fn layout() -> ReportLayout {
        ReportLayout::new("Reporte - Ministerios Vida")
    }

    fn shows(page: &[String], text: &str) -> bool {
        page.iter().any(|shown| shown == text)
    }

    #[test]
    fn test_empty_financial_report_has_only_header_and_footer() {
        let bytes = render_financial_report(&[], &layout()).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        let pages = pdf_text(&bytes);
        assert_eq!(pages.len(), 1);
        let expected: Vec<String> = ["Reporte - Ministerios Vida", "Fecha", "Tipo", "Categoria", "Monto", "Nota", "Pagina 1"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(pages[0], expected);
        // Only the five framed heading cells
        assert_eq!(pdf_operator_count(&bytes, "m"), vec![FINANCIAL_COLUMNS.len()]);
    }

    #[test]
    fn test_empty_attendance_report_renders() {
        let bytes = render_attendance_report(&[], &layout()).unwrap();
        let pages = pdf_text(&bytes);
        assert!(shows(&pages[0], "Observaciones"));
        assert_eq!(pdf_operator_count(&bytes, "m"), vec![ATTENDANCE_COLUMNS.len()]);
    }

    #[test]
    fn test_financial_rows_use_raw_amount_and_truncation() {
        let mut movement = income("Ofrendas de Amor Especiales", 100.0);
        movement.note = "Ofrenda recogida durante el culto dominical".to_string();
        let bytes = render_financial_report(&[movement, expense("Mantenimiento", 40.5)], &layout()).unwrap();

        let page = &pdf_text(&bytes)[0];
        for text in [
            "$100.0",
            "$40.5",
            "Ofrendas de Amor E",
            "Ofrenda recogida durante el cu",
            "Ingreso",
            "Gasto",
            "2026-01-04",
        ] {
            assert!(shows(page, text), "missing {text:?} in {page:?}");
        }
        assert_eq!(pdf_operator_count(&bytes, "m"), vec![FINANCIAL_COLUMNS.len() * 3]);
    }

    #[test]
    fn test_unencodable_category_is_replaced_not_rejected() {
        let bytes = render_financial_report(&[income("Ofrenda 🙏 €", 5.0)], &layout()).unwrap();
        assert!(shows(&pdf_text(&bytes)[0], "Ofrenda ? ?"));
    }

    #[test]
    fn test_attendance_rows_include_totals() {
        let mut record = attendance(date(2026, 2, 1), 12, 20, 7);
        record.service = ServiceType::MondayPrayer;
        record.note = "Noche de oración".to_string();
        let bytes = render_attendance_report(&[record], &layout()).unwrap();
        let page = &pdf_text(&bytes)[0];
        assert!(shows(page, "39"));
        assert!(shows(page, "Lunes de Oración"));
        assert!(shows(page, "Noche de oración"));
    }

    #[test]
    fn test_long_tables_break_onto_new_pages() {
        let rows: Vec<AttendanceRecord> = (0..30)
            .map(|i| attendance(date(2026, 1, 1) + chrono::Days::new(i), 1, 1, 1))
            .collect();
        let bytes = render_attendance_report(&rows, &layout()).unwrap();
        let pages = pdf_text(&bytes);
        assert_eq!(pages.len(), 2);
        // Title and footer repeat on every page, headings only on the first
        for (i, page) in pages.iter().enumerate() {
            assert!(shows(page, "Reporte - Ministerios Vida"));
            assert!(shows(page, &format!("Pagina {}", i + 1)));
        }
        assert!(shows(&pages[0], "Servicio"));
        assert!(!shows(&pages[1], "Servicio"));
        // 22 rows fit under the headings, the remaining 8 go to page two
        assert_eq!(
            pdf_operator_count(&bytes, "m"),
            vec![ATTENDANCE_COLUMNS.len() * 23, ATTENDANCE_COLUMNS.len() * 8]
        );
    }

    #[test]
    fn test_png_and_jpeg_logos_are_drawn_on_every_page() {
        let dir = temp_dir("congrega-logo");
        let png = dir.join("logo.png");
        let jpeg = dir.join("logo.jpg");
        fs::write(&png, png_bytes(200, 100)).unwrap();
        fs::write(&jpeg, jpeg_bytes(200, 100)).unwrap();

        let rows: Vec<AttendanceRecord> = (0..25)
            .map(|i| attendance(date(2026, 1, 1) + chrono::Days::new(i), 1, 0, 0))
            .collect();
        for logo in [png, jpeg] {
            let layout = ReportLayout {
                title: "Reporte - Ministerios Vida".to_string(),
                logo: Some(logo),
            };
            let bytes = render_attendance_report(&rows, &layout).unwrap();
            assert_eq!(pdf_operator_count(&bytes, "Do"), vec![1, 1]);
        }
    }

    #[test]
    fn test_missing_or_invalid_logo_is_skipped() {
        let dir = temp_dir("congrega-logo-bad");
        let bogus = dir.join("logo.jpg");
        fs::write(&bogus, b"not an image").unwrap();
        for logo in [bogus, dir.join("absent.jpg")] {
            let layout = ReportLayout {
                title: "Reporte".to_string(),
                logo: Some(logo),
            };
            let bytes = render_attendance_report(&[], &layout).unwrap();
            assert_eq!(pdf_operator_count(&bytes, "Do"), vec![0]);
            assert!(shows(&pdf_text(&bytes)[0], "Pagina 1"));
        }
    }

    #[test]
    fn test_report_file_names() {
        assert_eq!(ReportKind::Finances.file_name(None), "Finanzas.pdf");
        assert_eq!(
            ReportKind::Attendance.file_name(Some("20261018_090000")),
            "Asistencia_20261018_090000.pdf"
        );
        assert_eq!("asistencia".parse::<ReportKind>(), Ok(ReportKind::Attendance));
        assert!("activities".parse::<ReportKind>().is_err());
    }

    #[test]
    fn test_write_report_creates_directories() {
        let dir = temp_dir("congrega-report");
        let path = dir.join("out").join("Finanzas.pdf");
        write_report(&path, b"%PDF-1.3").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.3");
    }
}
