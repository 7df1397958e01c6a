//! OCR 文本的 MCQ 抽取
//!
//! 页面内容渲染在 canvas / 图片上、没有可用 DOM 结构时的兜底路径：
//! 把整块识别文本按行启发式切出"题干 + 选项"候选。
//! 纯文本与词级包围盒两种输入走同一套行判定规则。

use std::sync::LazyLock;

use regex::Regex;

use crate::api::ocr::{BoundingBox, OcrWord};
use crate::app::driver::PointLocator;
use crate::app::scan::{Mcq, McqKind, McqOption};
use crate::app::text::clean_text;

/// 题目行之后向前扫描的默认行数上限
pub const DEFAULT_LOOKAHEAD_LINES: usize = 10;

/// 包围盒模式里同一行的纵向容差（像素）
pub const LINE_Y_TOLERANCE: f32 = 10.0;

/// 疑问词模式：行尾问号之外的题目行线索
static INTERROGATIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)what|which|when|where|why|how").expect("疑问词正则非法"));

/// 选项行模式：`A)` / `b.` / `1.` 等打头
static OPTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][.)]\s+").expect("选项行正则非法"));

fn is_question_boundary(line: &str) -> bool {
    line.ends_with('?') || INTERROGATIVE.is_match(line)
}

fn is_option_line(line: &str) -> bool {
    OPTION_LINE.is_match(line)
}

/// 纯文本模式：空输入返回空列表，不报错
pub fn extract_from_text(text: &str, lookahead: usize) -> Vec<Mcq> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut mcqs = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if !is_question_boundary(line) {
            i += 1;
            continue;
        }

        let (options, consumed_until) = collect_option_lines(&lines, i, lookahead, |_, l| {
            let text = clean_text(l);
            if text.is_empty() {
                None
            } else {
                Some(McqOption::new(text, None))
            }
        });

        if options.len() >= 2 {
            mcqs.push(Mcq::new(line.to_string(), options, McqKind::Ocr, false));
            // 游标跳过已消费的选项行，避免把它们再当题目行匹配
            i = consumed_until;
        }
        i += 1;
    }

    mcqs
}

/// 包围盒模式：先按纵向容差把词重组成行，再走同样的行判定；
/// 每个选项经 `locator` 反查页面元素，反查不到则无句柄。
pub fn extract_from_words(
    words: &[OcrWord],
    lookahead: usize,
    locator: Option<&dyn PointLocator>,
) -> Vec<Mcq> {
    let lines = group_words_into_lines(words);
    if lines.is_empty() {
        return Vec::new();
    }

    let line_texts: Vec<String> = lines
        .iter()
        .map(|line| {
            line.iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_string()
        })
        .collect();
    let line_refs: Vec<&str> = line_texts.iter().map(String::as_str).collect();

    let mut mcqs = Vec::new();
    let mut i = 0;

    while i < line_refs.len() {
        let line = line_refs[i];
        if line.is_empty() || !is_question_boundary(line) {
            i += 1;
            continue;
        }

        let (options, consumed_until) = collect_option_lines(&line_refs, i, lookahead, |j, l| {
            let text = clean_text(l);
            if text.is_empty() {
                return None;
            }
            // 整行的包围盒 = 首词到尾词，取其中心反查元素
            let line_words = &lines[j];
            let first = line_words.first()?;
            let last = line_words.last()?;
            let line_box = BoundingBox {
                x0: first.bbox.x0,
                y0: first.bbox.y0,
                x1: last.bbox.x1,
                y1: last.bbox.y1,
            };
            let (center_x, center_y) = line_box.center();

            let handle = locator.and_then(|loc| loc.element_from_point(center_x, center_y));
            Some(McqOption::new(text, handle))
        });

        if options.len() >= 2 {
            mcqs.push(Mcq::new(line.to_string(), options, McqKind::Ocr, false));
            i = consumed_until;
        }
        i += 1;
    }

    mcqs
}

/// 从题目行的下一行开始，在窗口内收集选项行
///
/// 选项开始后遇到第一个非选项行即停；碰到下一个题目行也停。
/// 返回 (收集到的选项, 最后消费的行号)。
fn collect_option_lines<F>(
    lines: &[&str],
    question_index: usize,
    lookahead: usize,
    mut build: F,
) -> (Vec<McqOption>, usize)
where
    F: FnMut(usize, &str) -> Option<McqOption>,
{
    let mut options = Vec::new();
    let mut consumed_until = question_index;

    let end = (question_index + 1 + lookahead).min(lines.len());
    for (j, line) in lines.iter().enumerate().take(end).skip(question_index + 1) {
        if is_question_boundary(line) && !is_option_line(line) {
            break;
        }
        if is_option_line(line) {
            if let Some(option) = build(j, line) {
                options.push(option);
            }
            consumed_until = j;
        } else if !options.is_empty() {
            // 选项块已经开始，断开即结束
            break;
        }
    }

    (options, consumed_until)
}

/// 纵向起点差小于容差的词归入同一行
fn group_words_into_lines(words: &[OcrWord]) -> Vec<Vec<OcrWord>> {
    let mut lines: Vec<Vec<OcrWord>> = Vec::new();
    let mut current: Vec<OcrWord> = Vec::new();
    let mut last_top: Option<f32> = None;

    for word in words {
        let same_line = match last_top {
            None => true,
            Some(top) => (word.bbox.y0 - top).abs() < LINE_Y_TOLERANCE,
        };

        if same_line {
            current.push(word.clone());
        } else {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            current.push(word.clone());
        }
        last_top = Some(word.bbox.y0);
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}
