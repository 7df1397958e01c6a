//! 抽取文本的清洗与归一化
//!
//! 所有扫描器抽出的题干/选项文本统一走这里的清洗流程，
//! 去重键的归一化规则也集中在此，保证各来源可比。

use std::sync::LazyLock;

use regex::Regex;

/// 行首枚举符：`A)`、`1.`、`b)`、以及常见项目符号
static ENUMERATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[A-Za-z0-9][.)]|[-*•·▪◦○●◉☐☑☒\u{25CB}\u{25CF}\u{25EF}\u{26AA}\u{26AB}])\s+")
        .expect("枚举符正则非法")
});

/// 压缩连续空白为单个空格，并去除首尾空白
pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 选项/题干文本清洗：去行首枚举符 → 去首尾非字母数字 → 压缩空白
pub fn clean_text(s: &str) -> String {
    let s = collapse_ws(s);
    let s = ENUMERATOR.replace(&s, "");

    // 首尾剥离非字母数字字符（保留内部标点）
    let trimmed = s
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_string();

    collapse_ws(&trimmed)
}

/// 去重键归一化：小写，仅保留字母数字、`?` 与空格，再压缩空白
pub fn normalize_for_key(s: &str) -> String {
    let lowered = s.to_lowercase();
    let kept: String = lowered
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '?' {
                c
            } else {
                ' '
            }
        })
        .collect();

    collapse_ws(&kept)
}

/// 清洗后的文本是否为答案键残留（单个大写字母 A-D）
///
/// 这类"选项"是页面上的答案标注，不是真实选项内容。
pub fn is_answer_key_artifact(cleaned: &str) -> bool {
    let mut chars = cleaned.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => ('A'..='D').contains(&c),
        _ => false,
    }
}

/// 截取前导文本（按码点计，最多 `max_chars` 个字符）
pub fn leading_text(s: &str, max_chars: usize) -> String {
    let collapsed = collapse_ws(s);
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    collapsed.chars().take(max_chars).collect()
}
