// core/src/money.rs

//! Prices are fixed-point with two decimals, carried as integer cents.

/// Renders cents as `1,234.56` (no currency symbol).
pub fn format_cents(cents: i64) -> String {
  let sign = if cents < 0 { "-" } else { "" };
  let abs = cents.unsigned_abs();
  let whole = (abs / 100).to_string();
  let fraction = abs % 100;

  let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
  for (idx, ch) in whole.chars().enumerate() {
    if idx > 0 && (whole.len() - idx) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(ch);
  }

  format!("{sign}{grouped}.{fraction:02}")
}

/// Renders an integer count with thousands separators.
pub fn format_count(count: i64) -> String {
  let formatted = format_cents(count * 100);
  formatted.trim_end_matches(".00").to_string()
}
