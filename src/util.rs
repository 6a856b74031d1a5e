// Utility helpers for parsing, rounding and console number formatting.
//
// The loader and the aggregator both go through these so cell handling is
// identical everywhere: a cell is numeric if and only if `parse_f64_safe`
// accepts it.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Decimal places used by every mean-based KPI.
pub const KPI_DECIMALS: i32 = 2;

/// Parse a CSV cell into `f64`, tolerating thousands separators.
///
/// - Trims whitespace.
/// - Rejects alphabetic characters other than an exponent `e`/`E`, so
///   `NaN`/`inf` never parse.
/// - Accepts `","` only as thousands grouping (`1,250.5`); a decimal comma
///   such as `4,5` is not a number here.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }
    let owned;
    let s = if s.contains(',') {
        if !is_thousands_grouped(s) {
            return None;
        }
        owned = s.replace(',', "");
        owned.as_str()
    } else {
        s
    };
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

// `-1,234,567.89`: groups of exactly three digits after a leading 1-3.
fn is_thousands_grouped(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    let (int_part, frac) = match body.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (body, None),
    };
    if let Some(f) = frac {
        if f.is_empty() || !f.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
    }
    let mut groups = int_part.split(',');
    let lead_ok = groups
        .next()
        .map_or(false, |g| (1..=3).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_digit()));
    lead_ok && groups.all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit()))
}

/// Parse a date with the first matching format. The configured formats are
/// day-before-month, so "05/02/2025" is 5 February.
pub fn parse_date_dayfirst<S: AsRef<str>>(s: &str, formats: &[S]) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt.as_ref()).ok())
}

/// Arithmetic mean; `None` for an empty slice instead of NaN.
pub fn mean(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let sum: f64 = v.iter().copied().sum();
    Some(sum / v.len() as f64)
}

/// Round half away from zero to `decimals` places.
pub fn round_to(n: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (n * factor).round() / factor
}

pub fn round2(n: f64) -> f64 {
    round_to(n, KPI_DECIMALS)
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus `en` thousands separators, e.g. `1,234,567.89`.
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let mut res = match int_part.parse::<i64>() {
        Ok(v) => v.to_formatted_string(&Locale::en),
        // beyond i64 (or inf/NaN): print unformatted
        Err(_) => return format!("{:.*}", decimals, n),
    };
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals));
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// Signed variant used for deltas, e.g. `+1,200.00` / `-3.50`.
pub fn format_signed(n: f64, decimals: usize) -> String {
    let body = format_number(n, decimals);
    if body.starts_with('-') {
        body
    } else {
        format!("+{}", body)
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}
