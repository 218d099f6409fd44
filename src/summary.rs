//! Dashboard aggregates. Every function here is pure and recomputes from the
//! full collection it is given.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

use crate::models::{AttendanceRecord, FinancialMovement, MovementKind};

/// Sum of amounts for one movement kind
pub fn sum_by_kind(movements: &[FinancialMovement], kind: MovementKind) -> f64 {
    movements
        .iter()
        .filter(|m| m.kind == kind)
        .map(|m| m.amount)
        .sum()
}

/// Income minus expense
pub fn balance(movements: &[FinancialMovement]) -> f64 {
    sum_by_kind(movements, MovementKind::Income) - sum_by_kind(movements, MovementKind::Expense)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FinancialSummary {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

impl FinancialSummary {
    pub fn from_movements(movements: &[FinancialMovement]) -> Self {
        let income = sum_by_kind(movements, MovementKind::Income);
        let expense = sum_by_kind(movements, MovementKind::Expense);
        Self {
            income,
            expense,
            balance: income - expense,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
    /// Percentage of the grand total across all categories
    pub share: f64,
}

/// Totals per category (both kinds pooled), largest first
pub fn category_breakdown(movements: &[FinancialMovement]) -> Vec<CategoryTotal> {
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for movement in movements {
        *totals.entry(movement.category.as_str()).or_insert(0.0) += movement.amount;
    }
    let grand_total: f64 = totals.values().sum();

    let mut breakdown: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, total)| CategoryTotal {
            category: category.to_string(),
            total,
            share: if grand_total > 0.0 {
                total / grand_total * 100.0
            } else {
                0.0
            },
        })
        .collect();
    breakdown.sort_by(|a, b| {
        b.total
            .total_cmp(&a.total)
            .then_with(|| a.category.cmp(&b.category))
    });
    breakdown
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub total: u64,
}

/// One point per record, oldest first. Same-day records keep their input order.
pub fn attendance_trend(records: &[AttendanceRecord]) -> Vec<TrendPoint> {
    let mut points: Vec<TrendPoint> = records
        .iter()
        .map(|r| TrendPoint {
            date: r.date,
            total: r.total(),
        })
        .collect();
    points.sort_by_key(|p| p.date);
    points
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub services: usize,
    pub total_attendance: u64,
    pub average: f64,
}

impl AttendanceSummary {
    pub fn from_records(records: &[AttendanceRecord]) -> Self {
        let total_attendance: u64 = records.iter().map(AttendanceRecord::total).sum();
        let average = if records.is_empty() {
            0.0
        } else {
            total_attendance as f64 / records.len() as f64
        };
        Self {
            services: records.len(),
            total_attendance,
            average,
        }
    }
}

/// On-screen money format: `$1,234.50`, `-$60.00`
pub fn format_currency(amount: f64) -> String {
    let formatted = format!("{:.2}", amount.abs());
    let (whole, cents) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    // -0.001 rounds to 0.00 and should not print a sign
    let sign = if amount < 0.0 && formatted != "0.00" { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}
