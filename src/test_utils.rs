use chrono::NaiveDate;
use image::{DynamicImage, ImageOutputFormat};
use lopdf::Object;
use lopdf::content::Content;
use std::io::Cursor;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

use crate::database::Database;
use crate::models::{AttendanceRecord, Evidence, FinancialMovement, MovementKind, ServiceType};

pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

pub(crate) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

pub(crate) fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub(crate) fn income(category: &str, amount: f64) -> FinancialMovement {
    FinancialMovement::new(date(2026, 1, 4), MovementKind::Income, category, amount, "admin")
}

pub(crate) fn expense(category: &str, amount: f64) -> FinancialMovement {
    let mut movement =
        FinancialMovement::new(date(2026, 1, 5), MovementKind::Expense, category, amount, "admin");
    movement.evidence = Some(
        Evidence::new("factura.pdf", b"%PDF-1.4 factura".to_vec()).expect("valid test evidence"),
    );
    movement
}

pub(crate) fn attendance(day: NaiveDate, men: u32, women: u32, children: u32) -> AttendanceRecord {
    AttendanceRecord::new(day, ServiceType::SundayService).with_counts(men, women, children)
}

/// In-memory store seeded with one income and one expense
pub(crate) fn seeded_db() -> Database {
    let db = Database::open_in_memory().expect("in-memory database");
    db.insert_movement(&income("Diezmos", 100.0)).expect("seed income");
    db.insert_movement(&expense("Mantenimiento", 40.0)).expect("seed expense");
    db
}

fn encode_image(width: u32, height: u32, format: ImageOutputFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::new_rgb8(width, height)
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("encode test image");
    bytes
}

pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode_image(width, height, ImageOutputFormat::Png)
}

pub(crate) fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode_image(width, height, ImageOutputFormat::Jpeg(80))
}

/// Decoded content-stream operations of every page, in page order
pub(crate) fn pdf_operations(bytes: &[u8]) -> Vec<Vec<lopdf::content::Operation>> {
    let doc = lopdf::Document::load_mem(bytes).expect("parse pdf");
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let content = doc.get_page_content(page_id).expect("page content");
            Content::decode(&content).expect("decode content").operations
        })
        .collect()
}

fn latin1(object: &Object) -> Option<String> {
    match object {
        Object::String(bytes, _) => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        _ => None,
    }
}

/// Text shown on each page, one entry per text-showing operator
pub(crate) fn pdf_text(bytes: &[u8]) -> Vec<Vec<String>> {
    pdf_operations(bytes)
        .into_iter()
        .map(|ops| {
            ops.iter()
                .filter_map(|op| match op.operator.as_str() {
                    "Tj" => op.operands.first().and_then(latin1),
                    "TJ" => match op.operands.first() {
                        Some(Object::Array(items)) => Some(items.iter().filter_map(latin1).collect()),
                        _ => None,
                    },
                    _ => None,
                })
                .collect()
        })
        .collect()
}

/// How often `operator` appears on each page
pub(crate) fn pdf_operator_count(bytes: &[u8], operator: &str) -> Vec<usize> {
    pdf_operations(bytes)
        .iter()
        .map(|ops| ops.iter().filter(|op| op.operator == operator).count())
        .collect()
}
