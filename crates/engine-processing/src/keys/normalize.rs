use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate};
use std::str::FromStr;

/// Formats with a four-digit year. Day-first wins over month-first.
const LONG_YEAR_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];
const SHORT_YEAR_FORMATS: &[&str] = &["%d/%m/%y", "%d-%m-%y", "%d.%m.%y"];

/// Parses the date part of a cell, ignoring any time component.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.trim().split(['T', ' ']).next()?;
    if date_part.is_empty() {
        return None;
    }

    if date_part.len() == 8 && date_part.bytes().all(|b| b.is_ascii_digit()) {
        let year = date_part[0..4].parse().ok()?;
        let month = date_part[4..6].parse().ok()?;
        let day = date_part[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    // `%Y` happily accepts "24" as year 24, so reject implausible years
    // before falling back to two-digit formats.
    LONG_YEAR_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
        .find(|date| date.year() >= 1000)
        .or_else(|| {
            SHORT_YEAR_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
        })
}

/// `YYYYMMDD`, or an empty segment when the date is missing or unreadable.
pub fn date_segment(raw: Option<&str>) -> String {
    raw.and_then(parse_date)
        .map(|date| date.format("%Y%m%d").to_string())
        .unwrap_or_default()
}

/// Parses amounts as they appear in bank exports: currency symbols, grouping
/// separators, decimal commas, parentheses or trailing minus for negatives.
pub fn parse_amount(raw: &str) -> Option<BigDecimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let negative = (trimmed.starts_with('(') && trimmed.ends_with(')'))
        || trimmed.starts_with('-')
        || trimmed.ends_with('-')
        || trimmed
            .trim_start_matches(|c: char| !c.is_ascii_digit() && c != '-')
            .starts_with('-');

    let digits: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if !digits.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }

    let value = BigDecimal::from_str(&normalize_separators(&digits)).ok()?;
    Some(if negative { -value } else { value })
}

fn normalize_separators(s: &str) -> String {
    let last_dot = s.rfind('.');
    let last_comma = s.rfind(',');

    match (last_dot, last_comma) {
        (Some(dot), Some(comma)) => {
            let (decimal, grouping) = if dot > comma { ('.', ',') } else { (',', '.') };
            s.chars()
                .filter(|c| *c != grouping)
                .map(|c| if c == decimal { '.' } else { c })
                .collect()
        }
        (None, Some(comma)) => {
            let decimals = s.len() - comma - 1;
            if s.matches(',').count() == 1 && decimals != 3 {
                s.replace(',', ".")
            } else {
                s.replace(',', "")
            }
        }
        (Some(_), None) if s.matches('.').count() > 1 => s.replace('.', ""),
        _ => s.to_string(),
    }
}

/// Absolute amount at two decimals with every non-digit removed
/// (`-1 234,5` → `123450`). Missing amounts count as zero.
pub fn amount_digits(amount: Option<&BigDecimal>) -> String {
    let zero = BigDecimal::from(0);
    let amount = amount.unwrap_or(&zero);
    amount
        .abs()
        .round(2)
        .with_scale(2)
        .to_string()
        .chars()
        .filter(char::is_ascii_digit)
        .collect()
}

/// Upper-cased alphanumerics only, so spacing and punctuation never split a key.
pub fn normalize_counterparty(raw: Option<&str>) -> String {
    raw.unwrap_or_default()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_uppercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        for raw in [
            "2024-01-05",
            "2024/01/05",
            "05/01/2024",
            "05-01-2024",
            "05.01.2024",
            "20240105",
            "2024-01-05T13:45:00",
            "05/01/2024 08:00",
            "05/01/24",
        ] {
            assert_eq!(parse_date(raw), Some(expected), "failed on {raw}");
        }
    }

    #[test]
    fn unreadable_dates_give_empty_segment() {
        assert_eq!(date_segment(Some("not a date")), "");
        assert_eq!(date_segment(None), "");
        assert_eq!(date_segment(Some("2024-02-30")), "");
        assert_eq!(date_segment(Some("31/12/2023")), "20231231");
    }

    #[test]
    fn parses_amount_notations() {
        let cases = [
            ("100", "100"),
            ("100.5", "100.5"),
            ("1,234.56", "1234.56"),
            ("1.234,56", "1234.56"),
            ("1 234,56", "1234.56"),
            ("12,5", "12.5"),
            ("1,234", "1234"),
            ("1.234.567", "1234567"),
            ("€ 99,90", "99.90"),
            ("-45.00", "-45.00"),
            ("(45.00)", "-45.00"),
            ("45.00-", "-45.00"),
            ("EUR -12", "-12"),
        ];
        for (raw, expected) in cases {
            assert_eq!(
                parse_amount(raw),
                Some(BigDecimal::from_str(expected).unwrap()),
                "failed on {raw}"
            );
        }
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("n/a"), None);
    }

    #[test]
    fn amount_digits_are_absolute_with_two_decimals() {
        let amount = parse_amount("-1 234,5").unwrap();
        assert_eq!(amount_digits(Some(&amount)), "123450");
        assert_eq!(amount_digits(None), "000");
        assert_eq!(
            amount_digits(Some(&BigDecimal::from_str("100").unwrap())),
            "10000"
        );
    }

    #[test]
    fn counterparty_ignores_case_and_punctuation() {
        assert_eq!(normalize_counterparty(Some("Acme S.A.")), "ACMESA");
        assert_eq!(normalize_counterparty(Some("  acme  sa ")), "ACMESA");
        assert_eq!(normalize_counterparty(None), "");
    }
}
