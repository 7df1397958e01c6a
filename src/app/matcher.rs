//! 答案匹配器
//!
//! 把模型的自由文本回答对齐到固定选项集。严格分层：
//! 前一层命中则后面的层不再尝试。
//! 1. 精确匹配（忽略大小写、修剪空白）
//! 2. 双向包含（模型可能多说，也可能少说）
//! 3. 序号解码（"b" → 第 2 项，"2" → 第 2 项）
//! 4. 模糊兜底（归一化相似度，须严格超过阈值）

use regex::Regex;

use crate::app::scan::McqOption;
use crate::app::similarity::similarity;

/// 模糊层的默认相似度阈值
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.5;

/// 命中的匹配层，仅用于诊断输出
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Exact,
    Substring,
    Index,
    Fuzzy,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchTier::Exact => "exact",
            MatchTier::Substring => "substring",
            MatchTier::Index => "index",
            MatchTier::Fuzzy => "fuzzy",
        }
    }
}

/// 匹配结果：命中的选项下标（按选项列表顺序）与所在层
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub indices: Vec<usize>,
    pub tier: MatchTier,
}

/// 解析模型回答；四层全空返回 None，上游按硬失败处理
pub fn find_matching_options(
    options: &[McqOption],
    answer: &str,
    fuzzy_threshold: f64,
) -> Option<MatchOutcome> {
    let normalized = answer.trim().to_lowercase();
    if normalized.is_empty() || options.is_empty() {
        return None;
    }

    let lowered: Vec<String> = options.iter().map(|o| o.text.trim().to_lowercase()).collect();

    // 1. 精确匹配
    let exact: Vec<usize> = lowered
        .iter()
        .enumerate()
        .filter(|(_, o)| **o == normalized)
        .map(|(i, _)| i)
        .collect();
    if !exact.is_empty() {
        return Some(MatchOutcome {
            indices: exact,
            tier: MatchTier::Exact,
        });
    }

    // 2. 双向包含（整词）：裸子串会让 "b" 误中 "Lisbon"、
    //    "pariss" 误中 "paris"，把后两层全部短路掉
    let containment: Vec<usize> = lowered
        .iter()
        .enumerate()
        .filter(|(_, o)| contains_word(o, &normalized) || contains_word(&normalized, o))
        .map(|(i, _)| i)
        .collect();
    if !containment.is_empty() {
        return Some(MatchOutcome {
            indices: containment,
            tier: MatchTier::Substring,
        });
    }

    // 3. 序号解码
    let index_hits = decode_index(&normalized, options.len());
    if !index_hits.is_empty() {
        return Some(MatchOutcome {
            indices: index_hits,
            tier: MatchTier::Index,
        });
    }

    // 4. 模糊兜底：只认最高分，且须严格超过阈值
    let mut best: Option<(usize, f64)> = None;
    for (i, option) in lowered.iter().enumerate() {
        let score = similarity(option, &normalized);
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((i, score));
        }
    }
    if let Some((i, score)) = best {
        if score > fuzzy_threshold {
            return Some(MatchOutcome {
                indices: vec![i],
                tier: MatchTier::Fuzzy,
            });
        }
    }

    None
}

/// `needle` 是否以完整词的形式出现在 `haystack` 中
fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() || haystack.is_empty() {
        return false;
    }
    match Regex::new(&format!(r"\b{}\b", regex::escape(needle))) {
        Ok(re) => re.is_match(haystack),
        Err(_) => haystack.contains(needle),
    }
}

/// 把 "b" / "2" / "(c)" 这类回答解码成选项下标
///
/// 先各剥一个首尾标点/引号字符，单字母按 `字母 - 'a'`，
/// 整数按 `n - 1`，解码结果必须落在选项范围内。
fn decode_index(normalized: &str, option_count: usize) -> Vec<usize> {
    const STRIP: &[char] = &['.', ')', '(', ':', ',', ';', '"', '\'', '`', ']', '['];

    let mut s = normalized.trim();
    s = s.strip_prefix(STRIP).unwrap_or(s);
    s = s.strip_suffix(STRIP).unwrap_or(s);
    let s = s.trim();

    let mut hits = Vec::new();

    // 单字母
    let mut chars = s.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_lowercase() {
            let idx = (c as usize) - ('a' as usize);
            if idx < option_count {
                hits.push(idx);
            }
            return hits;
        }
    }

    // 整数（1 起），0 或越界丢弃
    if let Ok(n) = s.parse::<i64>() {
        if n >= 1 && (n as usize) <= option_count {
            hits.push((n - 1) as usize);
        }
    }

    hits
}
