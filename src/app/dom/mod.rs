//! 页面快照的 DOM 模型
//!
//! 把一份 HTML 快照解析为「根文档 + 若干 shadow 片段」的作用域集合。
//! 声明式 shadow root（`template[shadowrootmode]`）会被递归摘出、
//! 独立解析为片段作用域，并从根树上摘除，避免同一控件被根作用域的
//! 扫描器重复分组。
//!
//! 所有扫描产物通过 [`ElementHandle`]（作用域序号 + 节点 id）回指
//! 快照中的元素：句柄可复制、可哈希，仅在本轮扫描期间有效。

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};

use crate::app::text::collapse_ws;

/// 指向快照内某个元素的不透明引用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    /// 作用域序号：0 为根文档，其后为 shadow 片段
    pub scope: usize,
    pub node: NodeId,
}

/// 解析完成的页面快照
pub struct PageDom {
    scopes: Vec<Html>,
}

impl PageDom {
    /// 解析 HTML 快照，递归展开声明式 shadow root
    pub fn parse(html: &str) -> Self {
        let mut scopes = Vec::new();
        collect_scope(Html::parse_document(html), &mut scopes);
        PageDom { scopes }
    }

    /// 作用域数量（根文档恒为 1 个）
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn scope(&self, idx: usize) -> Option<&Html> {
        self.scopes.get(idx)
    }

    /// 将某作用域内的元素包装为句柄
    pub fn handle_of(&self, scope: usize, el: ElementRef<'_>) -> ElementHandle {
        ElementHandle {
            scope,
            node: el.id(),
        }
    }

    /// 句柄解析回元素；节点已不存在时返回 None
    pub fn resolve(&self, handle: ElementHandle) -> Option<ElementRef<'_>> {
        let doc = self.scopes.get(handle.scope)?;
        let node = doc.tree.get(handle.node)?;
        ElementRef::wrap(node)
    }

    /// `<option>` 句柄 → (所属 `<select>` 句柄, 在其 option 列表中的序号)
    ///
    /// 序号按 DOM 顺序计，包含占位项；供驱动侧按索引选中使用。
    pub fn option_position(&self, option: ElementHandle) -> Option<(ElementHandle, usize)> {
        let el = self.resolve(option)?;
        if el.value().name() != "option" {
            return None;
        }

        // option 可能套在 optgroup 里，向上找最近的 select
        let select = el
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|a| a.value().name() == "select")?;

        let index = select
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|d| d.value().name() == "option")
            .position(|d| d.id() == el.id())?;

        Some((
            ElementHandle {
                scope: option.scope,
                node: select.id(),
            },
            index,
        ))
    }
}

/// 摘出声明式 shadow root 并递归解析；`doc` 本身先入作用域表
fn collect_scope(mut doc: Html, scopes: &mut Vec<Html>) {
    let mut shadow_fragments = Vec::new();

    if let Ok(template_sel) = Selector::parse("template[shadowrootmode]") {
        // 只摘本层的 template：嵌套的留给递归，免得同一片段入表两次
        let found: Vec<(NodeId, String)> = doc
            .select(&template_sel)
            .filter(|t| {
                !t.ancestors()
                    .filter_map(ElementRef::wrap)
                    .any(|a| a.value().name() == "template")
            })
            .map(|t| (t.id(), t.inner_html()))
            .collect();

        for (id, inner) in found {
            if let Some(mut node) = doc.tree.get_mut(id) {
                node.detach();
            }
            if !inner.trim().is_empty() {
                shadow_fragments.push(inner);
            }
        }
    }

    scopes.push(doc);

    for fragment in shadow_fragments {
        collect_scope(Html::parse_fragment(&fragment), scopes);
    }
}

/// 元素的全部文本内容，压缩空白
pub fn element_text(el: ElementRef<'_>) -> String {
    collapse_ws(&el.text().collect::<Vec<_>>().join(" "))
}

/// 祖先链（含自身）上第一个命中选择器的元素
pub fn closest<'a>(el: ElementRef<'a>, sel: &Selector) -> Option<ElementRef<'a>> {
    if sel.matches(&el) {
        return Some(el);
    }
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| sel.matches(a))
}

/// 往前找最近的、有实质文本的同级节点
///
/// 文本节点与元素节点都算；文本长度须超过 `min_len`。
pub fn nearest_preceding_text(el: ElementRef<'_>, min_len: usize) -> Option<String> {
    for sibling in el.prev_siblings() {
        let text = if let Some(sib_el) = ElementRef::wrap(sibling) {
            element_text(sib_el)
        } else if let Some(t) = sibling.value().as_text() {
            collapse_ws(t)
        } else {
            continue;
        };

        if text.chars().count() > min_len {
            return Some(text);
        }
    }
    None
}

/// 控件后紧邻的文本节点内容（label 缺失时的兜底）
pub fn next_text_sibling(el: ElementRef<'_>) -> Option<String> {
    let next = el.next_sibling()?;
    let text = next.value().as_text()?;
    let collapsed = collapse_ws(text);
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}
