use chrono::{Local, NaiveDate, TimeZone};
use memo_common::{console_warn, FilterFactor, FilterState, MemoError, MemoFilter, Result};
use serde::Serialize;

/// 一天的秒数
pub const SECONDS_PER_DAY: i64 = 60 * 60 * 24;

/// 备忘录列表默认分页大小
pub const DEFAULT_LIST_MEMOS_PAGE_SIZE: usize = 16;

/// 列表排序方向
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Asc,
    Desc,
}

/// 发给列表服务的请求
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListMemosRequest {
    /// 所属范围，例如 `users/1`
    pub parent: String,
    pub page_size: usize,
    pub direction: Direction,
    /// 当前快捷方式的过滤表达式
    pub filter: String,
    /// 由筛选条件编译出的表达式
    pub old_filter: String,
}

/// 查询编译器 - 把筛选条件编译为后端的布尔表达式
///
/// 子句顺序固定为：内容、标签、链接、待办、代码、展示日期，与条件的插入顺序无关。
/// `visibility` 和 `resources` 不参与编译，由列表在客户端过滤。
#[derive(Clone, Debug)]
pub struct QueryCompiler<Tz: TimeZone> {
    timezone: Tz,
}

impl QueryCompiler<Local> {
    /// 使用浏览器（或系统）本地时区
    pub fn new() -> Self {
        Self { timezone: Local }
    }
}

impl Default for QueryCompiler<Local> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Tz: TimeZone> QueryCompiler<Tz> {
    pub fn with_timezone(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn compile(&self, filters: &[MemoFilter]) -> String {
        let mut content_search = Vec::new();
        let mut tag_search = Vec::new();
        let mut has_link = false;
        let mut has_task_list = false;
        let mut has_code = false;
        let mut display_time = Vec::new();

        for filter in filters.iter().filter(|f| !f.factor.is_client_side()) {
            match filter.factor {
                FilterFactor::ContentSearch => content_search.push(quote(&filter.value)),
                FilterFactor::TagSearch => tag_search.push(quote(&filter.value)),
                FilterFactor::HasLink => has_link = true,
                FilterFactor::HasTaskList => has_task_list = true,
                FilterFactor::HasCode => has_code = true,
                FilterFactor::DisplayTime => match self.local_midnight_timestamp(&filter.value) {
                    Ok(after) => {
                        display_time.push(format!("display_time_after == {}", after));
                        display_time.push(format!(
                            "display_time_before == {}",
                            after + SECONDS_PER_DAY
                        ));
                    }
                    Err(e) => console_warn!("忽略展示日期筛选: {}", e),
                },
                _ => {}
            }
        }

        let mut conditions = Vec::new();
        if !content_search.is_empty() {
            conditions.push(format!("content_search == [{}]", content_search.join(", ")));
        }
        if !tag_search.is_empty() {
            conditions.push(format!("tag_search == [{}]", tag_search.join(", ")));
        }
        if has_link {
            conditions.push("has_link == true".to_string());
        }
        if has_task_list {
            conditions.push("has_task_list == true".to_string());
        }
        if has_code {
            conditions.push("has_code == true".to_string());
        }
        conditions.extend(display_time);

        conditions.join(" && ")
    }

    /// 本地日期 `YYYY-MM-DD` 零点对应的 UTC 秒级时间戳
    pub fn local_midnight_timestamp(&self, date: &str) -> Result<i64> {
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|e| MemoError::InvalidDate(format!("{}: {}", date, e)))?;
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| MemoError::InvalidDate(date.to_string()))?;

        // 夏令时切换可能让本地零点不存在，此时取之后第一个有效时刻
        let local = self
            .timezone
            .from_local_datetime(&midnight)
            .earliest()
            .or_else(|| {
                self.timezone
                    .from_local_datetime(&(midnight + chrono::Duration::hours(1)))
                    .earliest()
            })
            .ok_or_else(|| MemoError::InvalidDate(format!("{} 在本地时区中不存在", date)))?;

        Ok(local.timestamp())
    }

    /// 根据筛选状态构造列表请求
    pub fn build_list_request(
        &self,
        state: &FilterState,
        scope: &str,
        page_size: usize,
        shortcut_filter: Option<&str>,
    ) -> ListMemosRequest {
        let filter = match (&state.shortcut, shortcut_filter) {
            (Some(_), Some(expression)) => expression.to_string(),
            _ => String::new(),
        };

        ListMemosRequest {
            parent: scope.to_string(),
            page_size,
            direction: if state.order_by_time_asc {
                Direction::Asc
            } else {
                Direction::Desc
            },
            filter,
            old_filter: self.compile(&state.filters),
        }
    }
}

/// 使用本地时区编译
pub fn compile(filters: &[MemoFilter]) -> String {
    QueryCompiler::new().compile(filters)
}

fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}
