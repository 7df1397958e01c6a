//! 页面驱动边界
//!
//! 快照是只读的；真正的页面动作（点击、设置下拉索引）通过这里
//! 交给活动页面侧的协作方去执行。核心自带两个实现：
//! 打日志的 [`LogDriver`] 与测试用的 [`RecordingDriver`]。

use anyhow::Result;
use tracing::info;

use crate::app::dom::ElementHandle;

/// 坐标 → 元素的反查能力（OCR 包围盒模式用）
///
/// 解析后的快照没有排版信息，这个查询只有活动页面侧能回答；
/// 回答不了就返回 None，对应选项退化为"仅展示、不作答"。
pub trait PointLocator {
    fn element_from_point(&self, x: f32, y: f32) -> Option<ElementHandle>;
}

/// 作答动作契约
///
/// `select_index` 的实现方必须在设置索引后派发 change 通知，
/// 不得用点击语义代替。
pub trait PageDriver: PointLocator {
    fn click(&mut self, target: ElementHandle) -> Result<()>;
    fn select_index(&mut self, select: ElementHandle, index: usize) -> Result<()>;
}

/// 只记日志、不动页面的驱动（离线快照处理用）
#[derive(Debug, Default)]
pub struct LogDriver;

impl PointLocator for LogDriver {
    fn element_from_point(&self, _x: f32, _y: f32) -> Option<ElementHandle> {
        None
    }
}

impl PageDriver for LogDriver {
    fn click(&mut self, target: ElementHandle) -> Result<()> {
        info!("作答动作: click {:?}", target);
        Ok(())
    }

    fn select_index(&mut self, select: ElementHandle, index: usize) -> Result<()> {
        info!("作答动作: select {:?} -> 索引 {}", select, index);
        Ok(())
    }
}

/// 动作记录
#[allow(dead_code)] // 测试与外部诊断用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverAction {
    Click(ElementHandle),
    SelectIndex(ElementHandle, usize),
}

/// 把动作攒进内存的驱动，供测试断言作答行为
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct RecordingDriver {
    pub actions: Vec<DriverAction>,
    /// 坐标反查的预置答案
    pub point_hits: Vec<((f32, f32), ElementHandle)>,
}

impl PointLocator for RecordingDriver {
    fn element_from_point(&self, x: f32, y: f32) -> Option<ElementHandle> {
        self.point_hits
            .iter()
            .find(|((px, py), _)| (px - x).abs() < 1.0 && (py - y).abs() < 1.0)
            .map(|(_, h)| *h)
    }
}

impl PageDriver for RecordingDriver {
    fn click(&mut self, target: ElementHandle) -> Result<()> {
        self.actions.push(DriverAction::Click(target));
        Ok(())
    }

    fn select_index(&mut self, select: ElementHandle, index: usize) -> Result<()> {
        self.actions.push(DriverAction::SelectIndex(select, index));
        Ok(())
    }
}
