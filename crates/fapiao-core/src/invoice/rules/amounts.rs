//! Amount parsing and pretax/tax/total reconciliation.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::AMOUNT;

/// Parse an amount such as `¥1,234.56`, `-100.00` or `143`.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let caps = AMOUNT.captures(s.trim())?;

    let integer_part = caps[2].replace(',', "");
    let amount_str = match caps.get(3) {
        Some(fraction) => format!("{}.{}", integer_part, fraction.as_str()),
        None => integer_part,
    };

    let amount = Decimal::from_str(&amount_str).ok()?;
    if caps.get(1).is_some() {
        Some(-amount)
    } else {
        Some(amount)
    }
}

/// Parse an amount written in Chinese uppercase numerals
/// (`壹万贰仟叁佰肆拾伍圆陆角柒分`, `负壹佰圆整`).
///
/// Returns `None` for unknown characters and for values too large to hold.
pub fn parse_amount_words(s: &str) -> Option<Decimal> {
    let s = s.trim();
    let (negative, s) = match s.strip_prefix('负') {
        Some(rest) => (true, rest),
        None => (false, s),
    };

    let mut result: u64 = 0;
    let mut section: u64 = 0;
    let mut number: u64 = 0;
    let mut fraction = Decimal::ZERO;
    let mut integer_done = false;
    let mut seen_digit = false;

    for c in s.chars() {
        match c {
            '零' => {
                number = 0;
                seen_digit = true;
            }
            '壹' | '贰' | '叁' | '肆' | '伍' | '陆' | '柒' | '捌' | '玖' => {
                number = upper_digit(c);
                seen_digit = true;
            }
            '拾' | '佰' | '仟' => {
                let unit = match c {
                    '拾' => 10,
                    '佰' => 100,
                    _ => 1000,
                };
                // A bare 拾 means 壹拾.
                let digit = if number == 0 && c == '拾' { 1 } else { number };
                section = section.checked_add(digit * unit)?;
                number = 0;
                seen_digit = true;
            }
            '万' => {
                let part = section.checked_add(number)?.checked_mul(10_000)?;
                result = result.checked_add(part)?;
                section = 0;
                number = 0;
            }
            '亿' => {
                result = result
                    .checked_add(section)?
                    .checked_add(number)?
                    .checked_mul(100_000_000)?;
                section = 0;
                number = 0;
            }
            '圆' | '元' => {
                result = result.checked_add(section)?.checked_add(number)?;
                section = 0;
                number = 0;
                integer_done = true;
            }
            '角' => {
                fraction += Decimal::new(number as i64, 1);
                number = 0;
            }
            '分' => {
                fraction += Decimal::new(number as i64, 2);
                number = 0;
            }
            '整' | '正' => {}
            _ => return None,
        }
    }

    if !seen_digit {
        return None;
    }
    if !integer_done {
        result = result.checked_add(section)?.checked_add(number)?;
    }

    let amount = Decimal::from(result) + fraction;
    Some(if negative { -amount } else { amount })
}

fn upper_digit(c: char) -> u64 {
    match c {
        '壹' => 1,
        '贰' => 2,
        '叁' => 3,
        '肆' => 4,
        '伍' => 5,
        '陆' => 6,
        '柒' => 7,
        '捌' => 8,
        '玖' => 9,
        _ => 0,
    }
}

/// Format an amount with thousands separators (`1,234.56`).
pub fn format_amount(amount: Decimal) -> String {
    let s = format!("{:.2}", amount.abs());
    let (integer_part, decimal_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));

    let chars: Vec<char> = integer_part.chars().collect();
    let mut formatted = String::new();
    if amount.is_sign_negative() && !amount.is_zero() {
        formatted.push('-');
    }
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(*c);
    }

    format!("{}.{}", formatted, decimal_part)
}

/// Candidates per amount considered by [`reconcile`], in document order.
pub const MAX_AMOUNT_CANDIDATES: usize = 16;

/// Whether `pretax + tax` equals `total` within `tolerance`. Sums that
/// overflow are never consistent.
pub fn is_consistent(pretax: Decimal, tax: Decimal, total: Decimal, tolerance: Decimal) -> bool {
    pretax
        .checked_add(tax)
        .and_then(|sum| sum.checked_sub(total))
        .is_some_and(|diff| diff.abs() <= tolerance)
}

/// Outcome of checking amount candidates against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountStatus {
    /// Pretax, tax and total present and adding up.
    Consistent,
    /// All three present but no combination adds up.
    Inconsistent,
    /// At least one of the three is missing; nothing to check.
    Incomplete,
}

/// Indices of the chosen candidate for each amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    pub pretax: Option<usize>,
    pub tax: Option<usize>,
    pub total: Option<usize>,
    pub status: AmountStatus,
}

/// Pick pretax, tax and total among candidates (each in document order).
///
/// The first total/pretax/tax combination that adds up within `tolerance`
/// wins. Only the first [`MAX_AMOUNT_CANDIDATES`] of each list take part.
/// Without one, the first candidate of each is returned with
/// [`AmountStatus::Inconsistent`] and the caller trusts the total.
pub fn reconcile(
    pretax: &[Decimal],
    tax: &[Decimal],
    total: &[Decimal],
    tolerance: Decimal,
) -> Reconciliation {
    let first = |values: &[Decimal]| if values.is_empty() { None } else { Some(0) };

    if pretax.is_empty() || tax.is_empty() || total.is_empty() {
        return Reconciliation {
            pretax: first(pretax),
            tax: first(tax),
            total: first(total),
            status: AmountStatus::Incomplete,
        };
    }

    let capped = |values: &[Decimal]| values.len().min(MAX_AMOUNT_CANDIDATES);
    for (ti, &t) in total[..capped(total)].iter().enumerate() {
        for (pi, &p) in pretax[..capped(pretax)].iter().enumerate() {
            for (xi, &x) in tax[..capped(tax)].iter().enumerate() {
                if is_consistent(p, x, t, tolerance) {
                    return Reconciliation {
                        pretax: Some(pi),
                        tax: Some(xi),
                        total: Some(ti),
                        status: AmountStatus::Consistent,
                    };
                }
            }
        }
    }

    Reconciliation {
        pretax: Some(0),
        tax: Some(0),
        total: Some(0),
        status: AmountStatus::Inconsistent,
    }
}
