//! Text normalization applied before template matching.

use lazy_static::lazy_static;
use regex::Regex;

/// Kangxi radicals that PDF text layers emit in place of the ordinary Han
/// character with the same glyph.
const LOOKALIKES: &[(char, char)] = &[
    ('\u{2F00}', '一'),
    ('\u{2F06}', '二'),
    ('\u{2F08}', '人'),
    ('\u{2F0A}', '入'),
    ('\u{2F0B}', '八'),
    ('\u{2F11}', '刀'),
    ('\u{2F12}', '力'),
    ('\u{2F17}', '十'),
    ('\u{2F1D}', '口'),
    ('\u{2F1F}', '土'),
    ('\u{2F20}', '士'),
    ('\u{2F24}', '大'),
    ('\u{2F25}', '女'),
    ('\u{2F26}', '子'),
    ('\u{2F28}', '寸'),
    ('\u{2F29}', '小'),
    ('\u{2F2D}', '山'),
    ('\u{2F2F}', '工'),
    ('\u{2F32}', '干'),
    ('\u{2F34}', '广'),
    ('\u{2F45}', '方'),
    ('\u{2F46}', '无'),
    ('\u{2F47}', '日'),
    ('\u{2F49}', '月'),
    ('\u{2F4A}', '木'),
    ('\u{2F54}', '水'),
    ('\u{2F55}', '火'),
    ('\u{2F63}', '生'),
    ('\u{2F64}', '用'),
    ('\u{2F6C}', '目'),
    ('\u{2F8F}', '行'),
    ('\u{2F94}', '言'),
    ('\u{2FA6}', '金'),
    ('\u{2FAF}', '面'),
    ('\u{2FBC}', '高'),
];

/// Labels printed on invoices and tickets whose characters OCR and PDF text
/// layers often space apart. Longer labels come first.
const LABELS: &[&str] = &[
    "统一社会信用代码",
    "纳税人识别号",
    "铁路电子客票",
    "增值税专用发票",
    "增值税普通发票",
    "购买方名称",
    "销售方名称",
    "电子客票号",
    "价税合计",
    "发票号码",
    "发票代码",
    "开票日期",
    "项目名称",
    "电子发票",
    "普通发票",
    "专用发票",
    "购买方",
    "销售方",
    "开票人",
    "校验码",
    "合计",
    "金额",
    "税额",
    "税率",
    "名称",
    "大写",
    "小写",
    "备注",
    "票价",
];

lazy_static! {
    static ref LABEL_RULES: Vec<(Regex, &'static str)> = LABELS
        .iter()
        .map(|label| (label_pattern(label), *label))
        .collect();
}

fn label_pattern(label: &str) -> Regex {
    let parts: Vec<String> = label
        .chars()
        .map(|c| regex::escape(&c.to_string()))
        .collect();
    // Only horizontal spaces; a newline inside a label is a layout break.
    Regex::new(&parts.join("[ \t]*")).expect("label pattern is a literal")
}

/// Normalize raw document text.
///
/// Pure and idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(raw_text: &str) -> String {
    let mut text = map_chars(raw_text);

    // Removing spaces inside one label can expose another, so repeat until
    // nothing changes. Every change shortens the text.
    loop {
        let collapsed = collapse_labels(&text);
        if collapsed == text {
            return text;
        }
        text = collapsed;
    }
}

fn map_chars(raw_text: &str) -> String {
    let mut out = String::with_capacity(raw_text.len());
    let mut chars = raw_text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            }
            '：' | '﹕' | '∶' => out.push(':'),
            '￥' => out.push('¥'),
            '（' => out.push('('),
            '）' => out.push(')'),
            '\u{3000}' | '\u{00A0}' => out.push(' '),
            // Full-width digits and Latin letters
            '０'..='９' | 'Ａ'..='Ｚ' | 'ａ'..='ｚ' => {
                let ascii = char::from_u32(c as u32 - 0xFEE0).unwrap_or(c);
                out.push(ascii);
            }
            _ => out.push(canonical_han(c)),
        }
    }

    out
}

fn canonical_han(c: char) -> char {
    LOOKALIKES
        .iter()
        .find(|(from, _)| *from == c)
        .map(|(_, to)| *to)
        .unwrap_or(c)
}

fn collapse_labels(text: &str) -> String {
    let mut current = text.to_string();
    for (pattern, label) in LABEL_RULES.iter() {
        if pattern.is_match(&current) {
            current = pattern.replace_all(&current, *label).into_owned();
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookalike_replaced() {
        assert_eq!(normalize("电\u{2F26}发票"), "电子发票");
        assert_eq!(normalize("\u{2F47}期"), "日期");
    }

    #[test]
    fn test_label_spacing_collapsed() {
        assert_eq!(normalize("发 票 号 码：12345678"), "发票号码:12345678");
        assert_eq!(normalize("开  票\t日 期:2024年"), "开票日期:2024年");
    }

    #[test]
    fn test_gap_between_names_preserved() {
        let text = "购 名称：杭州趣链科技有限公司          销 名称：湖南曾小厨餐饮管理有限公司";
        let normalized = normalize(text);
        assert!(normalized.contains("有限公司          销 名称:"));
        assert!(normalized.starts_with("购 名称:"));
    }

    #[test]
    fn test_newline_inside_label_kept() {
        assert_eq!(normalize("发票\n号码"), "发票\n号码");
    }

    #[test]
    fn test_punctuation_and_width() {
        assert_eq!(normalize("价税合计（小写）￥１２３.００"), "价税合计(小写)¥123.00");
        assert_eq!(normalize("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_nested_labels() {
        assert_eq!(normalize("价 税 合 计"), "价税合计");
        assert_eq!(normalize("合 计 金 额"), "合计 金额");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "",
            "发 票 号 码 ： 2 4 4 4",
            "购 买 方 名 称：张三\u{3000}\u{3000}销 售 方",
            "价 税 合 计 （ 大 写 ）",
            "统 一 社 会 信 用 代 码/纳 税 人 识 别 号：９１３３",
            "\u{2F26}\u{2F26} 合\t\t计 ¥ 1,000.00\r\n",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", sample);
        }
    }
}
