use memo_common::{console_warn, FilterFactor, FilterState, MemoFilter, SortOrder};
use std::collections::HashSet;

/// 地址栏参数名
pub const FILTER_PARAM: &str = "filter";
pub const ORDER_BY_TIME_PARAM: &str = "orderByTime";
pub const ORDER_BY_COMMENT_PARAM: &str = "orderByComment";
pub const ORDER_BY_REACTIONS_PARAM: &str = "orderByReactions";

/// 地址栏查询参数 - 保留参数顺序，语义与 URLSearchParams 一致
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchParams {
    pairs: Vec<(String, String)>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析 `?a=1&b=2` 形式的查询串，无法解码的片段原样保留
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = form_urlencoded::parse(query.as_bytes()).into_owned().collect();
        Self { pairs }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// 设置参数：替换第一个同名参数并移除其余同名参数，不存在时追加到末尾
    pub fn set(&mut self, key: &str, value: &str) {
        match self.pairs.iter().position(|(k, _)| k == key) {
            Some(index) => {
                self.pairs[index].1 = value.to_string();
                let mut seen = false;
                self.pairs.retain(|(k, _)| {
                    if k != key {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => self.pairs.push((key.to_string(), value.to_string())),
        }
    }

    pub fn delete(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }

    /// 序列化为不带 `?` 的查询串
    pub fn to_query_string(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// 将筛选条件序列化为规范形式 `factor:encode(value)`，以逗号连接并保持顺序
pub fn stringify_filters(filters: &[MemoFilter]) -> String {
    filters
        .iter()
        .map(|filter| format!("{}:{}", filter.factor, urlencoding::encode(&filter.value)))
        .collect::<Vec<_>>()
        .join(",")
}

/// 解析 `filter` 参数
///
/// 未知维度、缺少冒号或无法解码的片段会被丢弃，其余部分照常解析；
/// 重复的条件只保留第一次出现的那一个。
pub fn parse_filter_query(query: Option<&str>) -> Vec<MemoFilter> {
    let query = match query {
        Some(q) if !q.is_empty() => q,
        _ => return Vec::new(),
    };

    let mut seen = HashSet::new();
    let mut filters = Vec::new();

    for token in query.split(',') {
        let Some((factor, raw_value)) = token.split_once(':') else {
            console_warn!("忽略格式错误的筛选条件: {}", token);
            continue;
        };
        let factor = match factor.parse::<FilterFactor>() {
            Ok(factor) => factor,
            Err(e) => {
                console_warn!("{}", e);
                continue;
            }
        };
        let value = match urlencoding::decode(raw_value) {
            Ok(value) => value.into_owned(),
            Err(e) => {
                console_warn!("筛选值解码失败 {}: {}", token, e);
                continue;
            }
        };

        let filter = MemoFilter::new(factor, value);
        if seen.insert(filter.key()) {
            filters.push(filter);
        }
    }

    filters
}

/// 地址栏与筛选状态比较时使用的规范快照
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanonicalQuery {
    pub filter: String,
    pub order_by_time_asc: bool,
    pub order_by_comment: SortOrder,
    pub order_by_reactions: SortOrder,
}

impl CanonicalQuery {
    pub fn from_params(params: &SearchParams) -> Self {
        Self {
            filter: params.get(FILTER_PARAM).unwrap_or("").to_string(),
            order_by_time_asc: params.get(ORDER_BY_TIME_PARAM) == Some("asc"),
            order_by_comment: SortOrder::from_param(params.get(ORDER_BY_COMMENT_PARAM)),
            order_by_reactions: SortOrder::from_param(params.get(ORDER_BY_REACTIONS_PARAM)),
        }
    }

    pub fn from_state(state: &FilterState) -> Self {
        Self {
            filter: stringify_filters(&state.filters),
            order_by_time_asc: state.order_by_time_asc,
            order_by_comment: state.order_by_comment,
            order_by_reactions: state.order_by_reactions,
        }
    }
}

/// 从地址栏参数构造筛选状态（快捷方式不在地址栏中）
pub fn state_from_params(params: &SearchParams) -> FilterState {
    FilterState {
        filters: parse_filter_query(params.get(FILTER_PARAM)),
        order_by_time_asc: params.get(ORDER_BY_TIME_PARAM) == Some("asc"),
        order_by_comment: SortOrder::from_param(params.get(ORDER_BY_COMMENT_PARAM)),
        order_by_reactions: SortOrder::from_param(params.get(ORDER_BY_REACTIONS_PARAM)),
        shortcut: None,
    }
}

/// 将筛选状态写入参数：与默认值相同的参数被删除，其它参数保持不变
pub fn write_state_to_params(state: &FilterState, params: &mut SearchParams) {
    apply_param(params, ORDER_BY_TIME_PARAM, state.order_by_time_asc.then_some("asc"));
    apply_param(params, ORDER_BY_COMMENT_PARAM, state.order_by_comment.as_param());
    apply_param(params, ORDER_BY_REACTIONS_PARAM, state.order_by_reactions.as_param());

    let filter = (!state.filters.is_empty()).then(|| stringify_filters(&state.filters));
    apply_param(params, FILTER_PARAM, filter.as_deref());
}

fn apply_param(params: &mut SearchParams, key: &str, value: Option<&str>) {
    match value {
        Some(value) if params.get(key) != Some(value) => params.set(key, value),
        Some(_) => {}
        None => params.delete(key),
    }
}
