use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 筛选维度 - 封闭枚举，序列化名称与地址栏中的写法一致
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterFactor {
    /// 标签
    #[serde(rename = "tagSearch")]
    TagSearch,
    /// 可见性 (PUBLIC / PROTECTED / PRIVATE)
    #[serde(rename = "visibility")]
    Visibility,
    /// 全文关键词
    #[serde(rename = "contentSearch")]
    ContentSearch,
    /// 展示日期 (本地日期 YYYY-MM-DD)
    #[serde(rename = "displayTime")]
    DisplayTime,
    /// 包含链接
    #[serde(rename = "property.hasLink")]
    HasLink,
    /// 包含待办列表
    #[serde(rename = "property.hasTaskList")]
    HasTaskList,
    /// 包含代码块
    #[serde(rename = "property.hasCode")]
    HasCode,
    /// 包含附件
    #[serde(rename = "resources")]
    Resources,
}

impl FilterFactor {
    pub const ALL: [FilterFactor; 8] = [
        FilterFactor::TagSearch,
        FilterFactor::Visibility,
        FilterFactor::ContentSearch,
        FilterFactor::DisplayTime,
        FilterFactor::HasLink,
        FilterFactor::HasTaskList,
        FilterFactor::HasCode,
        FilterFactor::Resources,
    ];

    /// 地址栏中使用的名称
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterFactor::TagSearch => "tagSearch",
            FilterFactor::Visibility => "visibility",
            FilterFactor::ContentSearch => "contentSearch",
            FilterFactor::DisplayTime => "displayTime",
            FilterFactor::HasLink => "property.hasLink",
            FilterFactor::HasTaskList => "property.hasTaskList",
            FilterFactor::HasCode => "property.hasCode",
            FilterFactor::Resources => "resources",
        }
    }

    /// 只在客户端对已拉取的列表生效，不参与后端表达式编译
    pub fn is_client_side(&self) -> bool {
        matches!(self, FilterFactor::Visibility | FilterFactor::Resources)
    }
}

impl fmt::Display for FilterFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterFactor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterFactor::ALL
            .iter()
            .copied()
            .find(|factor| factor.as_str() == s)
            .ok_or_else(|| format!("未知的筛选维度: {}", s))
    }
}

/// 单个筛选条件
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MemoFilter {
    pub factor: FilterFactor,
    pub value: String,
}

impl MemoFilter {
    pub fn new(factor: FilterFactor, value: impl Into<String>) -> Self {
        Self {
            factor,
            value: value.into(),
        }
    }

    /// 唯一键 `factor:value`
    pub fn key(&self) -> String {
        format!("{}:{}", self.factor, self.value)
    }
}

/// 评论数 / 回应数排序方向
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
    #[default]
    Default,
}

impl SortOrder {
    /// 地址栏参数值，默认值不写入地址栏
    pub fn as_param(&self) -> Option<&'static str> {
        match self {
            SortOrder::Asc => Some("asc"),
            SortOrder::Desc => Some("desc"),
            SortOrder::Default => None,
        }
    }

    /// 解析地址栏参数，未知值一律视为默认
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("asc") => SortOrder::Asc,
            Some("desc") => SortOrder::Desc,
            _ => SortOrder::Default,
        }
    }
}

/// 展示设置菜单中的六个排序选项，同一时间只有一个生效
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SortOption {
    #[default]
    TimeDesc,
    TimeAsc,
    CommentDesc,
    CommentAsc,
    ReactionsDesc,
    ReactionsAsc,
}

/// 筛选状态
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    /// 筛选条件，按插入顺序排列，按 key 去重
    #[serde(default)]
    pub filters: Vec<MemoFilter>,
    /// 按展示时间升序，false 表示默认的降序
    #[serde(default)]
    pub order_by_time_asc: bool,
    #[serde(default)]
    pub order_by_comment: SortOrder,
    #[serde(default)]
    pub order_by_reactions: SortOrder,
    /// 当前选中的快捷方式 ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<String>,
}

impl FilterState {
    /// 实际生效的排序：评论数优先，其次回应数，最后是展示时间
    pub fn effective_sort(&self) -> SortOption {
        match (self.order_by_comment, self.order_by_reactions) {
            (SortOrder::Asc, _) => SortOption::CommentAsc,
            (SortOrder::Desc, _) => SortOption::CommentDesc,
            (_, SortOrder::Asc) => SortOption::ReactionsAsc,
            (_, SortOrder::Desc) => SortOption::ReactionsDesc,
            _ if self.order_by_time_asc => SortOption::TimeAsc,
            _ => SortOption::TimeDesc,
        }
    }

    /// 是否偏离了初始状态（有筛选条件或非默认排序）
    pub fn is_applying(&self) -> bool {
        !self.filters.is_empty() || self.effective_sort() != SortOption::TimeDesc
    }
}

/// 备忘录状态
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemoState {
    #[default]
    Normal,
    Archived,
}

/// 列表中的备忘录 - 只包含筛选和建议所需的字段
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Memo {
    /// 资源名，例如 `memos/123`
    pub name: String,
    #[serde(default)]
    pub content: String,
    /// PUBLIC / PROTECTED / PRIVATE
    #[serde(default)]
    pub visibility: String,
    #[serde(default)]
    pub state: MemoState,
    #[serde(default)]
    pub pinned: bool,
    /// 展示时间，部分接口返回的备忘录没有这个字段
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resource_count: usize,
    #[serde(default)]
    pub comment_count: usize,
    #[serde(default)]
    pub reaction_count: usize,
}

/// 提示级别
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Warning,
    Error,
}

/// 交给界面展示的提示
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    /// 阻塞式提示需要用户确认后才消失
    pub blocking: bool,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
            blocking: false,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message: message.into(),
            blocking: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
            blocking: true,
        }
    }
}
