//! Fixed regex patterns used to convert captures into typed values.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // 2024年1月15日, tolerating spaces left by PDF text layers
    pub static ref DATE_CN: Regex = Regex::new(
        r"(\d{4})\s*年\s*(\d{1,2})\s*月\s*(\d{1,2})\s*日"
    ).unwrap();

    // 2024-01-15, 2024/01/15, 2024.01.15
    pub static ref DATE_ISO: Regex = Regex::new(
        r"(?:^|\D)(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})(?:\D|$)"
    ).unwrap();

    // 08:12 or 08:12开 (no \b: Han characters count as word characters)
    pub static ref TIME_OF_DAY: Regex = Regex::new(
        r"(?:^|\D)(\d{1,2}):(\d{2})(?:\D|$)"
    ).unwrap();

    // -1,234.56 with optional currency sign
    pub static ref AMOUNT: Regex = Regex::new(
        r"^[¥$]?\s*(-)?\s*[¥$]?\s*(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d{1,2}))?$"
    ).unwrap();

    pub static ref TAX_ID_CHARS: Regex = Regex::new(
        r"^[0-9A-Z]+$"
    ).unwrap();

    // Separators OCR leaves inside a tax ID
    pub static ref TAX_ID_SEPARATORS: Regex = Regex::new(
        r"[\s\-]"
    ).unwrap();
}
