//! GS1 element strings and check digits
//!
//! Only the Application Identifiers a product label needs are understood:
//!
//! | AI   | Field        | Length          |
//! |------|--------------|-----------------|
//! | `01` | GTIN         | 14 digits       |
//! | `10` | Batch / lot  | up to 20 chars  |
//! | `17` | Expiry date  | 6 digits YYMMDD |
//! | `21` | Serial       | up to 20 chars  |
//!
//! Variable-length fields end at a group separator (FNC1), at their
//! maximum length, or at the end of the payload. An AI outside the table
//! stops parsing because its length is unknown.

use tracing::debug;

/// ASCII 29, the FNC1 group separator emitted by scanners
pub const GROUP_SEPARATOR: char = '\u{1d}';

const GTIN_LEN: usize = 14;
const DATE_LEN: usize = 6;
const MAX_VARIABLE_LEN: usize = 20;

/// Fields extracted from a GS1 element string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Gs1Fields {
    pub gtin: Option<String>,
    pub serial_number: Option<String>,
    pub batch_number: Option<String>,
    /// Converted to `YYYY-MM-DD` (century fixed at 2000)
    pub expiry_date: Option<String>,
}

/// Parse an element string such as `0109506000134352<GS>21ABC<GS>10LOT1`
pub fn parse_element_string(payload: &str) -> Gs1Fields {
    let chars: Vec<char> = payload.chars().collect();
    let mut fields = Gs1Fields::default();
    let mut pos = 0;

    while pos < chars.len() {
        if chars[pos] == GROUP_SEPARATOR {
            pos += 1;
            continue;
        }
        if pos + 2 > chars.len() {
            break;
        }
        let ai: String = chars[pos..pos + 2].iter().collect();
        pos += 2;

        match ai.as_str() {
            "01" => match take_digits(&chars, pos, GTIN_LEN) {
                Some(gtin) => {
                    fields.gtin = Some(gtin);
                    pos += GTIN_LEN;
                }
                None => break,
            },
            "17" => match take_digits(&chars, pos, DATE_LEN) {
                Some(date) => {
                    fields.expiry_date = Some(yymmdd_to_iso(&date));
                    pos += DATE_LEN;
                }
                None => break,
            },
            "10" | "21" => {
                let (value, next) = take_variable(&chars, pos);
                if value.is_empty() {
                    break;
                }
                if ai == "10" {
                    fields.batch_number = Some(value);
                } else {
                    fields.serial_number = Some(value);
                }
                pos = next;
            }
            other => {
                debug!(ai = other, "unsupported GS1 application identifier, stopping");
                break;
            }
        }
    }

    fields
}

fn take_digits(chars: &[char], start: usize, len: usize) -> Option<String> {
    let slice = chars.get(start..start + len)?;
    slice
        .iter()
        .all(|c| c.is_ascii_digit())
        .then(|| slice.iter().collect())
}

fn take_variable(chars: &[char], start: usize) -> (String, usize) {
    let mut end = start;
    while end < chars.len() && end - start < MAX_VARIABLE_LEN && chars[end] != GROUP_SEPARATOR {
        end += 1;
    }
    (chars[start..end].iter().collect(), end)
}

fn yymmdd_to_iso(date: &str) -> String {
    let year = 2000 + date[0..2].parse::<u32>().unwrap_or(0);
    format!("{}-{}-{}", year, &date[2..4], &date[4..6])
}

/// GS1 mod-10 check digit validation for GTIN-8/12/13/14
///
/// Weights alternate 3,1 starting from the digit next to the check digit,
/// which is 1,3 from the left for a GTIN-13.
pub fn gs1_check_digit_is_valid(digits: &str) -> bool {
    if !matches!(digits.len(), 8 | 12 | 13 | 14) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let values: Vec<u32> = digits.bytes().map(|b| u32::from(b - b'0')).collect();
    let (body, check) = values.split_at(values.len() - 1);
    let sum: u32 = body
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d * 3 } else { *d })
        .sum();
    (10 - sum % 10) % 10 == check[0]
}
