use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;
use thiserror::Error;

/// Suggested categories offered for income movements
pub const INCOME_CATEGORIES: &[&str] = &[
    "Ofrendas",
    "Diezmos",
    "Ofrendas de Amor",
    "Donaciones",
    "Otros",
];

/// Suggested categories offered for expense movements
pub const EXPENSE_CATEGORIES: &[&str] = &[
    "Pago de Servicios",
    "Pago de renta",
    "Ayuda Social",
    "Otros",
];

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("An expense cannot be saved without attached evidence (invoice or receipt)")]
    MissingEvidence,
    #[error("Unsupported evidence file '{0}': only png, jpg, jpeg and pdf are accepted")]
    UnsupportedEvidence(String),
    #[error("Evidence file '{0}' is empty")]
    EmptyEvidence(String),
    #[error("Amount must be a non-negative number, got {0}")]
    InvalidAmount(f64),
    #[error("Category must not be empty")]
    EmptyCategory,
    #[error("Activity name must not be empty")]
    MissingActivityName,
    #[error("Activity responsible person must not be empty")]
    MissingResponsible,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown {kind} '{value}'")]
pub struct ParseError {
    kind: &'static str,
    value: String,
}

impl ParseError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Folds a user-supplied label for loose matching: lowercase, accents
/// stripped, spaces and dashes collapsed.
fn fold_label(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter_map(|c| match c {
            'á' | 'Á' => Some('a'),
            'é' | 'É' => Some('e'),
            'í' | 'Í' => Some('i'),
            'ó' | 'Ó' => Some('o'),
            'ú' | 'Ú' | 'ü' | 'Ü' => Some('u'),
            'ñ' | 'Ñ' => Some('n'),
            ' ' | '-' | '_' => None,
            c => Some(c.to_ascii_lowercase()),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MovementKind {
    Income,
    Expense,
}

impl MovementKind {
    pub const ALL: [MovementKind; 2] = [MovementKind::Income, MovementKind::Expense];

    /// Label persisted in the store and printed on reports
    pub fn label(&self) -> &'static str {
        match self {
            MovementKind::Income => "Ingreso",
            MovementKind::Expense => "Gasto",
        }
    }

    pub fn categories(&self) -> &'static [&'static str] {
        match self {
            MovementKind::Income => INCOME_CATEGORIES,
            MovementKind::Expense => EXPENSE_CATEGORIES,
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MovementKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold_label(s).as_str() {
            "ingreso" | "income" => Ok(MovementKind::Income),
            "gasto" | "expense" | "egreso" => Ok(MovementKind::Expense),
            _ => Err(ParseError::new("movement kind", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ServiceType {
    SundayService,
    MondayPrayer,
    BibleStudy,
    Vigil,
    SpecialActivity,
}

impl ServiceType {
    pub const ALL: [ServiceType; 5] = [
        ServiceType::SundayService,
        ServiceType::MondayPrayer,
        ServiceType::BibleStudy,
        ServiceType::Vigil,
        ServiceType::SpecialActivity,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ServiceType::SundayService => "Culto Dominical",
            ServiceType::MondayPrayer => "Lunes de Oración",
            ServiceType::BibleStudy => "Estudio Biblico",
            ServiceType::Vigil => "Vigilia",
            ServiceType::SpecialActivity => "Otras Actividades Especiales",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ServiceType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = fold_label(s);
        let by_label = Self::ALL
            .into_iter()
            .find(|service| fold_label(service.label()) == folded);
        if let Some(service) = by_label {
            return Ok(service);
        }
        match folded.as_str() {
            "sunday" | "sundayservice" => Ok(ServiceType::SundayService),
            "prayer" | "mondayprayer" => Ok(ServiceType::MondayPrayer),
            "biblestudy" | "study" => Ok(ServiceType::BibleStudy),
            "vigil" => Ok(ServiceType::Vigil),
            "special" | "specialactivity" => Ok(ServiceType::SpecialActivity),
            _ => Err(ParseError::new("service type", s)),
        }
    }
}

/// The three independent tables of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Movement,
    Attendance,
    Activity,
}

impl RecordKind {
    pub fn table(&self) -> &'static str {
        match self {
            RecordKind::Movement => "movements",
            RecordKind::Attendance => "attendance",
            RecordKind::Activity => "activities",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

impl FromStr for RecordKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold_label(s).as_str() {
            "movement" | "movements" | "finances" | "finanzas" => Ok(RecordKind::Movement),
            "attendance" | "asistencia" => Ok(RecordKind::Attendance),
            "activity" | "activities" | "actividades" => Ok(RecordKind::Activity),
            _ => Err(ParseError::new("record kind", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceKind {
    Png,
    Jpeg,
    Pdf,
}

impl EvidenceKind {
    /// Resolve the kind from a filename extension (case-insensitive)
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(EvidenceKind::Png),
            "jpg" | "jpeg" => Some(EvidenceKind::Jpeg),
            "pdf" => Some(EvidenceKind::Pdf),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            EvidenceKind::Png => "image/png",
            EvidenceKind::Jpeg => "image/jpeg",
            EvidenceKind::Pdf => "application/pdf",
        }
    }

    pub fn is_image(&self) -> bool {
        !matches!(self, EvidenceKind::Pdf)
    }
}

/// Proof-of-expense attachment: the original filename plus its bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evidence {
    pub filename: String,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl Evidence {
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Result<Self, ValidationError> {
        let evidence = Self {
            filename: filename.into(),
            data,
        };
        evidence.validate()?;
        Ok(evidence)
    }

    pub fn kind(&self) -> Option<EvidenceKind> {
        EvidenceKind::from_filename(&self.filename)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.kind().is_none() {
            return Err(ValidationError::UnsupportedEvidence(self.filename.clone()));
        }
        if self.data.is_empty() {
            return Err(ValidationError::EmptyEvidence(self.filename.clone()));
        }
        Ok(())
    }

    /// Dimensions of an image attachment. `None` for PDFs and for blobs whose
    /// header cannot be read, in which case callers skip the thumbnail.
    pub fn preview(&self) -> Option<(u32, u32)> {
        if !self.kind()?.is_image() {
            return None;
        }
        image::io::Reader::new(Cursor::new(self.data.as_slice()))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FinancialMovement {
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub kind: MovementKind,
    pub category: String,
    pub amount: f64,
    pub note: String,
    pub recorded_by: String,
    pub evidence: Option<Evidence>,
}

impl FinancialMovement {
    pub fn new(
        date: NaiveDate,
        kind: MovementKind,
        category: impl Into<String>,
        amount: f64,
        recorded_by: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            date,
            kind,
            category: category.into(),
            amount,
            note: String::new(),
            recorded_by: recorded_by.into(),
            evidence: None,
        }
    }

    /// Creation-time checks; an expense must carry evidence
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(ValidationError::InvalidAmount(self.amount));
        }
        if self.category.trim().is_empty() {
            return Err(ValidationError::EmptyCategory);
        }
        match (&self.evidence, self.kind) {
            (None, MovementKind::Expense) => Err(ValidationError::MissingEvidence),
            (Some(evidence), _) => evidence.validate(),
            (None, MovementKind::Income) => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceRecord {
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub service: ServiceType,
    pub men: u32,
    pub women: u32,
    pub children: u32,
    pub note: String,
}

impl AttendanceRecord {
    pub fn new(date: NaiveDate, service: ServiceType) -> Self {
        Self {
            id: None,
            date,
            service,
            men: 0,
            women: 0,
            children: 0,
            note: String::new(),
        }
    }

    pub fn with_counts(mut self, men: u32, women: u32, children: u32) -> Self {
        self.men = men;
        self.women = women;
        self.children = children;
        self
    }

    /// Headcount across all three groups; derived, never stored
    pub fn total(&self) -> u64 {
        u64::from(self.men) + u64::from(self.women) + u64::from(self.children)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub name: String,
    pub responsible: String,
    pub description: String,
}

impl Activity {
    pub fn new(date: NaiveDate, name: impl Into<String>, responsible: impl Into<String>) -> Self {
        Self {
            id: None,
            date,
            name: name.into(),
            responsible: responsible.into(),
            description: String::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingActivityName);
        }
        if self.responsible.trim().is_empty() {
            return Err(ValidationError::MissingResponsible);
        }
        Ok(())
    }
}
