// Rupiah and month display helpers for CLI output

use chrono::Datelike;

const MONTH_NAMES: [&str; 12] = [
    "Januari", "Februari", "Maret", "April", "Mei", "Juni", "Juli", "Agustus", "September",
    "Oktober", "November", "Desember",
];

/// "Rp 1.234.567", rounded to whole rupiah
pub fn format_rupiah(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    if rounded < 0.0 {
        format!("-Rp {}", grouped)
    } else {
        format!("Rp {}", grouped)
    }
}

/// Compact form for charts and narrow tables: "Rp 1.5 jt", "Rp 25 rb"
pub fn format_rupiah_short(amount: f64) -> String {
    const UNITS: [(f64, &str); 3] = [(1e9, "m"), (1e6, "jt"), (1e3, "rb")];

    for (scale, suffix) in UNITS {
        if amount >= scale {
            let v = amount / scale;
            let shown = if v.fract() == 0.0 {
                format!("{:.0}", v)
            } else {
                format!("{:.1}", v)
            };
            return format!("Rp {} {}", shown, suffix);
        }
    }
    format!("Rp {}", amount.round())
}

/// "2026-01" → "Januari 2026"; other input is returned as is
pub fn month_label(month_key: &str) -> String {
    chrono::NaiveDate::parse_from_str(&format!("{}-01", month_key), "%Y-%m-%d")
        .map(|d| format!("{} {}", MONTH_NAMES[d.month0() as usize], d.year()))
        .unwrap_or_else(|_| month_key.to_string())
}
