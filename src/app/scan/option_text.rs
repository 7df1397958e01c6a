//! 选项文本抽取
//!
//! 固定优先级链：label[for] → 包裹 label（剔除控件值文本）→ 容器内同级 label
//! → 紧邻文本节点 → aria-label / title → value 属性 → 深度受限的祖先文本。
//! 图片选项另走 alt / 文件名派生。

use scraper::{ElementRef, Html};

use crate::app::dom::{self, PageDom};
use crate::app::scan::sel;
use crate::app::text::collapse_ws;

/// 祖先文本兜底能接受的最大长度，防止把整个表单吞进一个选项
const ANCESTOR_TEXT_LIMIT: usize = 120;

/// 祖先文本兜底最多向上走的层数
const ANCESTOR_DEPTH_LIMIT: usize = 2;

/// 抽取某个控件（radio/checkbox 等）的选项文本，未清洗
pub fn option_text_for_control(dom: &PageDom, scope: usize, control: ElementRef<'_>) -> String {
    let doc = match dom.scope(scope) {
        Some(doc) => doc,
        None => return String::new(),
    };

    let strategies: &[&dyn Fn() -> Option<String>] = &[
        &|| label_for(doc, control),
        &|| wrapping_label(control),
        &|| sibling_label(control),
        &|| dom::next_text_sibling(control),
        &|| attr_text(control, "aria-label"),
        &|| attr_text(control, "title"),
        &|| attr_text(control, "value"),
        &|| bounded_ancestor_text(control),
    ];

    for strategy in strategies {
        if let Some(text) = strategy() {
            let text = collapse_ws(&text);
            if !text.is_empty() {
                return text;
            }
        }
    }

    String::new()
}

/// 图片选项的派生说明：alt → 父元素文本 → src 文件名
pub fn image_option_text(img: ElementRef<'_>) -> String {
    if let Some(alt) = img.value().attr("alt") {
        let alt = collapse_ws(alt);
        if !alt.is_empty() {
            return alt;
        }
    }

    if let Some(parent) = img.parent().and_then(ElementRef::wrap) {
        let text = dom::element_text(parent);
        if !text.is_empty() && text.chars().count() <= ANCESTOR_TEXT_LIMIT {
            return text;
        }
    }

    filename_of(img.value().attr("src").unwrap_or_default())
}

/// 从图片地址取文件名（去查询串）
pub fn filename_of(src: &str) -> String {
    let last = src.rsplit('/').next().unwrap_or_default();
    last.split('?').next().unwrap_or_default().to_string()
}

fn label_for(doc: &Html, control: ElementRef<'_>) -> Option<String> {
    let id = control.value().attr("id")?;
    let label_sel = sel("label")?;
    let label = doc
        .select(&label_sel)
        .find(|l| l.value().attr("for") == Some(id))?;
    Some(dom::element_text(label))
}

/// 包裹控件的 label，剔除控件自身 value 文本
fn wrapping_label(control: ElementRef<'_>) -> Option<String> {
    let label_sel = sel("label")?;
    let label = dom::closest(control, &label_sel)?;
    let mut text = dom::element_text(label);

    if let Some(value) = control.value().attr("value") {
        if !value.trim().is_empty() {
            text = text.replace(value, "");
        }
    }
    Some(text)
}

/// 同一父容器内的 label 兄弟
fn sibling_label(control: ElementRef<'_>) -> Option<String> {
    let parent = control.parent().and_then(ElementRef::wrap)?;
    let label_sel = sel("label")?;
    let label = parent.select(&label_sel).next()?;
    Some(dom::element_text(label))
}

fn attr_text(control: ElementRef<'_>, name: &str) -> Option<String> {
    let v = control.value().attr(name)?;
    let v = collapse_ws(v);
    if v.is_empty() {
        None
    } else {
        Some(v)
    }
}

/// 深度受限的祖先文本兜底
fn bounded_ancestor_text(control: ElementRef<'_>) -> Option<String> {
    for ancestor in control
        .ancestors()
        .filter_map(ElementRef::wrap)
        .take(ANCESTOR_DEPTH_LIMIT)
    {
        let text = dom::element_text(ancestor);
        if !text.is_empty() && text.chars().count() <= ANCESTOR_TEXT_LIMIT {
            return Some(text);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::dom::PageDom;
    use scraper::Selector;

    fn first<'a>(dom: &'a PageDom, css: &str) -> ElementRef<'a> {
        let sel = Selector::parse(css).unwrap();
        dom.scope(0).unwrap().select(&sel).next().unwrap()
    }

    #[test]
    fn test_label_for_reference() {
        let dom = PageDom::parse(
            r#"<input type="radio" id="r1" name="q" value="a">
               <label for="r1">Paris</label>"#,
        );
        let input = first(&dom, "input");
        assert_eq!(option_text_for_control(&dom, 0, input), "Paris");
    }

    #[test]
    fn test_wrapping_label_strips_value() {
        let dom = PageDom::parse(r#"<label><input type="radio" name="q" value="x1">Lisbon x1</label>"#);
        let input = first(&dom, "input");
        assert_eq!(option_text_for_control(&dom, 0, input), "Lisbon");
    }

    #[test]
    fn test_value_attribute_fallback() {
        let dom = PageDom::parse(r#"<div><input type="radio" name="q" value="Madrid"></div>"#);
        let input = first(&dom, "input");
        assert_eq!(option_text_for_control(&dom, 0, input), "Madrid");
    }

    #[test]
    fn test_next_text_sibling() {
        let dom = PageDom::parse(r#"<div><input type="radio" name="q"> Rome</div>"#);
        let input = first(&dom, "input");
        assert_eq!(option_text_for_control(&dom, 0, input), "Rome");
    }

    #[test]
    fn test_image_alt_then_filename() {
        let dom = PageDom::parse(
            r#"<li><img src="/imgs/tower.png?v=2" alt="Eiffel Tower"></li>
               <li><img src="/imgs/bridge.png"></li>"#,
        );
        let sel = Selector::parse("img").unwrap();
        let doc = dom.scope(0).unwrap();
        let mut imgs = doc.select(&sel);

        assert_eq!(image_option_text(imgs.next().unwrap()), "Eiffel Tower");
        // 第二张无 alt，父元素 li 文本为空，退回文件名
        assert_eq!(image_option_text(imgs.next().unwrap()), "bridge.png");
    }

    #[test]
    fn test_filename_strips_query() {
        assert_eq!(filename_of("https://a/b/c.png?resize=1"), "c.png");
        assert_eq!(filename_of(""), "");
    }
}
