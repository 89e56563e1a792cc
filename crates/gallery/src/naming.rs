//! Capture file naming: `BaMIA_<name>_<yyyyMMdd_HHmmss>_<expression>.jpg`

use bms::Expression;
use chrono::NaiveDateTime;

pub const IMAGE_PREFIX: &str = "BaMIA";
const IMAGE_EXTENSION: &str = "jpg";
const SAVE_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// File name for a capture of `baby_name` taken at `captured_at`.
/// Spaces become underscores; the expression is lowercased.
pub fn file_name(baby_name: &str, captured_at: NaiveDateTime, expression: &str) -> String {
    format!(
        "{}_{}_{}_{}.{}",
        IMAGE_PREFIX,
        baby_name.replace(' ', "_"),
        captured_at.format(SAVE_TIME_FORMAT),
        expression.replace(' ', "_").to_lowercase(),
        IMAGE_EXTENSION
    )
}

/// Fields recovered from a capture file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub baby_name: String,
    pub captured_at: Option<NaiveDateTime>,
    pub expression: String,
}

/// Parse a capture file name.
///
/// The timestamp is located as the first `yyyyMMdd`/`HHmmss` part pair, so
/// names and expressions may themselves contain underscores. Names without a
/// recognisable timestamp keep the second part as the baby name.
pub fn parse_file_name(name: &str) -> ParsedName {
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    let parts: Vec<&str> = stem.split('_').collect();

    let is_digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
    let timestamp_at = (1..parts.len().saturating_sub(1))
        .find(|&i| is_digits(parts[i], 8) && is_digits(parts[i + 1], 6));

    match timestamp_at {
        Some(i) => ParsedName {
            baby_name: parts[1..i].join("_"),
            captured_at: NaiveDateTime::parse_from_str(
                &format!("{}_{}", parts[i], parts[i + 1]),
                SAVE_TIME_FORMAT,
            )
            .ok(),
            expression: parts[i + 2..].join("_"),
        },
        None => ParsedName {
            baby_name: parts.get(1).copied().unwrap_or_default().to_string(),
            captured_at: None,
            expression: String::new(),
        },
    }
}

/// Korean display name of a stored expression, as used by the gallery filter.
/// Manual captures show as `캡쳐`; anything unrecognised is returned trimmed.
pub fn korean_expression(expression: &str) -> String {
    let trimmed = expression.trim();
    match trimmed.to_lowercase().as_str() {
        "camera" | "camera_request" => "캡쳐".to_string(),
        _ => match Expression::from_label(trimmed) {
            Expression::Unknown => trimmed.to_string(),
            known => known.korean().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_file_name_format() {
        assert_eq!(
            file_name("BABY", at(9, 5, 7), "Happiness"),
            "BaMIA_BABY_20240501_090507_happiness.jpg"
        );
        assert_eq!(
            file_name("baby kim", at(23, 59, 0), "camera_request"),
            "BaMIA_baby_kim_20240501_235900_camera_request.jpg"
        );
    }

    #[test]
    fn test_parse_file_name() {
        let parsed = parse_file_name("BaMIA_BABY_20240501_090507_happiness.jpg");
        assert_eq!(parsed.baby_name, "BABY");
        assert_eq!(parsed.captured_at, Some(at(9, 5, 7)));
        assert_eq!(parsed.expression, "happiness");

        let parsed = parse_file_name("BaMIA_baby_kim_20240501_235900_camera_request.jpg");
        assert_eq!(parsed.baby_name, "baby_kim");
        assert_eq!(parsed.expression, "camera_request");
    }

    #[test]
    fn test_parse_malformed() {
        let parsed = parse_file_name("holiday.jpg");
        assert_eq!(parsed.baby_name, "");
        assert_eq!(parsed.captured_at, None);

        let parsed = parse_file_name("BaMIA_BABY_2024_happy.jpg");
        assert_eq!(parsed.baby_name, "BABY");
        assert_eq!(parsed.captured_at, None);
    }

    #[test]
    fn test_korean_expression() {
        assert_eq!(korean_expression("happiness"), "행복");
        assert_eq!(korean_expression("sad"), "슬픔");
        assert_eq!(korean_expression("camera"), "캡쳐");
        assert_eq!(korean_expression("camera_request"), "캡쳐");
        assert_eq!(korean_expression(" yawn "), "yawn");
    }
}
