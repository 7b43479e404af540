//! Brazilian display formatting for currency, dates and timestamps

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::constants;

/// Format a value as Brazilian reais: `R$ 1.234,56`
pub fn format_currency_br(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let digits = (cents / 100).to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    // Avoid "-R$ 0,00" for values that round to zero
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("R$ {}{},{:02}", sign, grouped, cents % 100)
}

/// Format a date as `DD/MM/YYYY`
pub fn format_date_br(date: NaiveDate) -> String {
    date.format(constants::DISPLAY_DATE_FORMAT).to_string()
}

/// Format an optional date, `-` when missing
pub fn format_opt_date(date: Option<NaiveDate>) -> String {
    date.map(format_date_br).unwrap_or_else(|| "-".to_string())
}

/// Current time in the practice's civil time zone
pub fn now_local(timezone: FixedOffset) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&timezone)
}

/// Format a change-log timestamp as `DD/MM/YYYY HH:MM`
pub fn format_timestamp(at: DateTime<FixedOffset>) -> String {
    at.format(constants::TIMESTAMP_FORMAT).to_string()
}

/// Format hours with one decimal, e.g. `12.5h`
pub fn format_hours(hours: f64) -> String {
    format!("{:.1}h", hours)
}

/// Truncate string for display (char-aware, accents are common in client names)
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_currency_thousands_and_decimals() {
        assert_eq!(format_currency_br(1234.56), "R$ 1.234,56");
        assert_eq!(format_currency_br(1_234_567.8), "R$ 1.234.567,80");
        assert_eq!(format_currency_br(999.0), "R$ 999,00");
        assert_eq!(format_currency_br(0.0), "R$ 0,00");
    }

    #[test]
    fn test_currency_negative() {
        assert_eq!(format_currency_br(-1500.5), "R$ -1.500,50");
        assert_eq!(format_currency_br(-0.001), "R$ 0,00");
    }

    #[test]
    fn test_currency_rounding() {
        assert_eq!(format_currency_br(155.0049), "R$ 155,00");
        assert_eq!(format_currency_br(0.999), "R$ 1,00");
    }

    #[test]
    fn test_date_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(format_date_br(date), "01/03/2024");
        assert_eq!(format_opt_date(None), "-");
    }

    #[test]
    fn test_timestamp_uses_fixed_offset() {
        let tz = FixedOffset::west_opt(3 * 3600).unwrap();
        let utc = Utc.with_ymd_and_hms(2024, 6, 10, 2, 30, 0).unwrap();
        assert_eq!(format_timestamp(utc.with_timezone(&tz)), "09/06/2024 23:30");
    }

    #[test]
    fn test_truncate_handles_accents() {
        assert_eq!(truncate("Construção", 20), "Construção");
        assert_eq!(truncate("Reforma Apartamento São Paulo", 10), "Reforma...");
    }
}
