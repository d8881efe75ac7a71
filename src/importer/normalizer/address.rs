// ==========================================
// 批量导入管道 - 组合地址解析
// ==========================================
// 形如 "123 Main St, Springfield, IL 62704, USA"
// 候选解析器按优先级排列，首个成功者胜出；均失败则整串归入 street
// ==========================================

use once_cell::sync::Lazy;
use regex::Regex;

// 末尾 5 位或 9 位邮编
static RE_STATE_ZIP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<state>.*?)(?:^|[\s,]+)(?P<zip>\d{5}(?:-?\d{4})?)$").expect("Invalid regex")
});

// "CA" 与加州缩写冲突，不作为国家识别
const COUNTRY_TOKENS: &[&str] = &[
    "usa",
    "us",
    "u.s.",
    "u.s.a.",
    "united states",
    "united states of america",
    "canada",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressParts {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
}

type AddressParser = fn(&[&str]) -> Option<AddressParts>;

const PARSERS: &[AddressParser] = &[parse_with_country, parse_without_country];

pub fn is_country(segment: &str) -> bool {
    let lowered = segment.trim().to_lowercase();
    COUNTRY_TOKENS.contains(&lowered.as_str())
}

/// "IL 62704" → ("IL", "62704")；无邮编时整段为州
pub fn split_state_zip(segment: &str) -> (String, String) {
    let segment = segment.trim();
    match RE_STATE_ZIP.captures(segment) {
        Some(caps) => (caps["state"].trim().to_string(), caps["zip"].to_string()),
        None => (segment.to_string(), String::new()),
    }
}

/// street, city, state[+zip], country
fn parse_with_country(segments: &[&str]) -> Option<AddressParts> {
    let n = segments.len();
    if n < 4 || !is_country(segments[n - 1]) {
        return None;
    }
    let (state, zip) = split_state_zip(segments[n - 2]);
    Some(AddressParts {
        street: segments[..n - 3].join(", "),
        city: segments[n - 3].to_string(),
        state,
        zip,
        country: segments[n - 1].to_string(),
    })
}

/// street, city, state[+zip]
fn parse_without_country(segments: &[&str]) -> Option<AddressParts> {
    let n = segments.len();
    if n < 3 || is_country(segments[n - 1]) {
        return None;
    }
    let (state, zip) = split_state_zip(segments[n - 1]);
    Some(AddressParts {
        street: segments[..n - 2].join(", "),
        city: segments[n - 2].to_string(),
        state,
        zip,
        country: String::new(),
    })
}

/// 解析组合地址，永不失败
pub fn parse_address(input: &str) -> AddressParts {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return AddressParts::default();
    }

    let segments: Vec<&str> = trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    PARSERS
        .iter()
        .find_map(|parse| parse(&segments))
        .unwrap_or_else(|| AddressParts {
            street: trimmed.to_string(),
            ..AddressParts::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_address_with_country() {
        let parts = parse_address("123 Main St, Springfield, IL 62704, USA");
        assert_eq!(
            parts,
            AddressParts {
                street: "123 Main St".to_string(),
                city: "Springfield".to_string(),
                state: "IL".to_string(),
                zip: "62704".to_string(),
                country: "USA".to_string(),
            }
        );
    }

    #[test]
    fn test_address_without_country_nine_digit_zip() {
        let parts = parse_address("500 Oak Ave, Suite 2, Austin, TX 78701-1234");
        assert_eq!(parts.street, "500 Oak Ave, Suite 2");
        assert_eq!(parts.city, "Austin");
        assert_eq!(parts.state, "TX");
        assert_eq!(parts.zip, "78701-1234");
        assert_eq!(parts.country, "");
    }

    #[test]
    fn test_california_is_not_a_country() {
        let parts = parse_address("1 Market St, San Francisco, CA");
        assert_eq!(parts.city, "San Francisco");
        assert_eq!(parts.state, "CA");
        assert_eq!(parts.country, "");
    }

    #[test]
    fn test_state_without_zip() {
        let parts = parse_address("9 Elm Rd, Portland, Oregon, United States");
        assert_eq!(parts.state, "Oregon");
        assert_eq!(parts.zip, "");
        assert_eq!(parts.country, "United States");
    }

    #[test]
    fn test_unshaped_input_falls_back_to_street() {
        let parts = parse_address("PO Box 12");
        assert_eq!(parts.street, "PO Box 12");
        assert_eq!(parts.city, "");

        let parts = parse_address("12 Elm St, Apt 4");
        assert_eq!(parts.street, "12 Elm St, Apt 4");
        assert_eq!(parts.state, "");
    }

    #[test]
    fn test_split_state_zip() {
        assert_eq!(split_state_zip("IL 62704"), ("IL".into(), "62704".into()));
        assert_eq!(split_state_zip("62704"), ("".into(), "62704".into()));
        assert_eq!(split_state_zip("New York"), ("New York".into(), "".into()));
    }
}
