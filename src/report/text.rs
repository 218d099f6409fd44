//! Text preparation for the single-byte report fonts.

/// Stand-in for characters the WinAnsi fonts cannot show
pub const REPLACEMENT: char = '?';

/// True when the character maps to the same byte in Latin-1 and WinAnsi
pub fn is_encodable(c: char) -> bool {
    matches!(c as u32, 0x20..=0x7e | 0xa0..=0xff)
}

/// Replace everything the report fonts cannot encode. Tabs and line breaks
/// become spaces since every cell is a single line.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\t' | '\n' | '\r' => ' ',
            c if is_encodable(c) => c,
            _ => REPLACEMENT,
        })
        .collect()
}

/// Keep at most `max` characters; longer text is cut without marking
pub fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Sanitize then truncate, in that order
pub fn fit(text: &str, max: usize) -> String {
    truncate(&sanitize(text), max)
}

/// Amount as printed in report bodies: currency sign plus the value in the
/// shortest round-trip form, always with a decimal point or exponent
/// (`$100.0`, `$40.5`, `$1e-05`, `$1e+16`).
pub fn raw_amount(amount: f64) -> String {
    format!("${}", float_repr(amount))
}

/// Shortest round-trip rendering that switches to scientific notation for
/// exponents below -4 or from 16 up, with a signed two-digit exponent.
fn float_repr(value: f64) -> String {
    if !value.is_finite() {
        return if value.is_nan() {
            "nan".to_string()
        } else if value > 0.0 {
            "inf".to_string()
        } else {
            "-inf".to_string()
        };
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let scientific = format!("{value:e}");
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if (-4..16).contains(&exponent) {
        let plain = format!("{value}");
        if plain.contains('.') {
            plain
        } else {
            format!("{plain}.0")
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.abs())
    }
}
