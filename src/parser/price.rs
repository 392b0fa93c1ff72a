use std::sync::LazyLock;

use regex::Regex;

pub const CURRENCY_SYMBOL: &str = "₹";

static NON_NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\d.]").unwrap());
static DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d$").unwrap());

/// Parse scraped price text into a number. `0.0` means no valid price.
pub fn parse_price(text: &str) -> f64 {
    let without_separators = text.replace(',', "");
    let cleaned = NON_NUMERIC_RE.replace_all(&without_separators, "");
    let ascii: Option<String> = cleaned
        .chars()
        .map(|c| match c {
            '.' => Some('.'),
            _ => decimal_value(c).and_then(|d| char::from_digit(d, 10)),
        })
        .collect();
    ascii.and_then(|s| s.parse::<f64>().ok()).unwrap_or(0.0)
}

fn is_decimal_digit(c: char) -> bool {
    DIGIT_RE.is_match(c.encode_utf8(&mut [0; 4]))
}

/// Value of any Unicode decimal digit (`१` is 1). Decimal digits are encoded
/// as contiguous runs starting at zero, so the value is the distance back to
/// the start of the run, modulo ten.
fn decimal_value(c: char) -> Option<u32> {
    if c.is_ascii_digit() {
        return c.to_digit(10);
    }
    if !is_decimal_digit(c) {
        return None;
    }
    let mut offset = 0;
    let mut cp = c as u32;
    while let Some(prev) = cp.checked_sub(1).and_then(char::from_u32) {
        if !is_decimal_digit(prev) {
            break;
        }
        offset += 1;
        cp -= 1;
    }
    Some(offset % 10)
}

/// Price text for display, with the currency symbol added only if missing.
pub fn display_price(text: &str) -> String {
    if text.contains(CURRENCY_SYMBOL) {
        text.to_string()
    } else {
        format!("{}{}", CURRENCY_SYMBOL, text)
    }
}
