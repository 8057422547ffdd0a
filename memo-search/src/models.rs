use chrono::{DateTime, Utc};
use memo_common::MemoFilter;
use memo_filter::SyncAction;
use serde::{Deserialize, Serialize};

/// 历史记录类型
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HistoryKind {
    #[serde(rename = "tag")]
    Tag,
    #[serde(rename = "content")]
    Content,
    /// 直接跳转到某条备忘录
    #[serde(rename = "memoName")]
    MemoName,
}

impl HistoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryKind::Tag => "tag",
            HistoryKind::Content => "content",
            HistoryKind::MemoName => "memoName",
        }
    }

    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "tag" => Some(HistoryKind::Tag),
            "content" => Some(HistoryKind::Content),
            "memoName" => Some(HistoryKind::MemoName),
            _ => None,
        }
    }
}

/// 历史记录项，`(type, value)` 相同视为同一条
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct HistoryItem {
    #[serde(rename = "type")]
    pub kind: HistoryKind,
    pub value: String,
}

impl HistoryItem {
    pub fn new(kind: HistoryKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// 高亮片段：匹配部分前后各保留有限的上下文
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Highlight {
    pub before: String,
    #[serde(rename = "match")]
    pub matched: String,
    pub after: String,
}

impl Highlight {
    /// 未匹配时原样返回整段文本
    pub fn unmatched(text: &str) -> Self {
        Self {
            before: text.to_string(),
            matched: String::new(),
            after: String::new(),
        }
    }

    pub fn is_match(&self) -> bool {
        !self.matched.is_empty()
    }
}

/// 匹配方式
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MatchKind {
    /// 前缀匹配
    Prefix,
    /// 包含查询
    Contains,
    /// 编辑距离近似匹配
    Approximate,
}

/// 标签建议
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TagSuggestion {
    pub tag: String,
    /// 0 为完全匹配，越大越差
    pub score: f64,
    pub kind: MatchKind,
    pub highlight: Highlight,
}

/// 备忘录内容建议
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemoSuggestion {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_time: Option<DateTime<Utc>>,
    pub highlight: Highlight,
}

/// 一次防抖计算的结果
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionResults {
    pub query: String,
    pub tags: Vec<TagSuggestion>,
    pub memos: Vec<MemoSuggestion>,
}

/// 建议面板当前应展示的内容
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SuggestionView {
    /// 查询为空，展示搜索历史
    History { items: Vec<HistoryItem> },
    /// 查询为空且没有历史
    Empty,
    /// 查询非空，标签和备忘录分组展示
    Results {
        tags: Vec<TagSuggestion>,
        memos: Vec<MemoSuggestion>,
        loading: bool,
    },
}

/// 选中一条建议后的结果
#[derive(Serialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SelectionOutcome {
    /// 新增到筛选状态中的条件
    pub added_filters: Vec<MemoFilter>,
    /// 需要跳转的路径
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigate_to: Option<String>,
    /// 历史记录写入失败时的提示
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<memo_common::Notification>,
    /// 写入条件后的对账结果
    pub sync: SyncAction,
}

/// 建议引擎的可调参数
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SuggestionConfig {
    /// 输入停止多久后重新计算（毫秒）
    pub debounce_ms: f64,
    /// 标签模糊匹配阈值，0 只接受完全匹配，1 接受任意字符串
    pub fuzzy_threshold: f64,
    /// 高亮时匹配部分前后保留的字符数
    pub highlight_context: usize,
    /// 历史记录条数上限
    pub max_history_items: usize,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: crate::debounce::DEBOUNCE_MS,
            fuzzy_threshold: crate::fuzzy::FUZZY_THRESHOLD,
            highlight_context: crate::fuzzy::HIGHLIGHT_CONTEXT,
            max_history_items: crate::history::MAX_HISTORY_ITEMS,
        }
    }
}
