use chrono::Local;
use memo_common::{FilterFactor, Memo, MemoError, MemoFilter, SortOption};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

// 导出模块
pub mod compiler;
pub mod listing;
pub mod query;
pub mod session;
pub mod stats;
pub mod store;
pub mod sync;
pub mod tags;

pub use compiler::{compile, ListMemosRequest, QueryCompiler, DEFAULT_LIST_MEMOS_PAGE_SIZE};
pub use listing::{apply_client_filters, ListOutcome};
pub use query::{parse_filter_query, stringify_filters, SearchParams};
pub use session::FilterSession;
pub use stats::{finish_tag_mutation, validate_tag_rename, TagMutation, UserStats, UserStatsStore};
pub use store::{FilterStatePatch, FilterStore, SubscriptionId, VersionClock};
pub use sync::{SyncAction, UrlSync};
pub use tags::{build_tag_tree, is_tag_active, toggle_tag_filter, TagNode};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// 初始化函数 - 设置错误处理
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

/// 版本信息
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn to_js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&format!("序列化失败: {}", e)))
}

fn parse_factor(factor: &str) -> Result<FilterFactor, JsValue> {
    factor.parse::<FilterFactor>().map_err(|e| JsValue::from_str(&e))
}

/// 批量更新参数（JS 侧传入的部分状态）
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct StatePatchParams {
    filters: Option<Vec<MemoFilter>>,
    order_by_time_asc: Option<bool>,
    order_by_comment: Option<memo_common::SortOrder>,
    order_by_reactions: Option<memo_common::SortOrder>,
    #[serde(default, with = "double_option")]
    shortcut: Option<Option<String>>,
}

mod double_option {
    use serde::{Deserialize, Deserializer};

    // 区分「未提供」和「显式设置为 null」
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer).map(Some)
    }
}

impl From<StatePatchParams> for FilterStatePatch {
    fn from(params: StatePatchParams) -> Self {
        Self {
            filters: params.filters,
            order_by_time_asc: params.order_by_time_asc,
            order_by_comment: params.order_by_comment,
            order_by_reactions: params.order_by_reactions,
            shortcut: params.shortcut,
        }
    }
}

/// 筛选模块 JS 接口 - 持有筛选会话和过滤表达式编译器
///
/// 修改筛选状态的方法都会立即对账，返回 `{kind: "none" | "updateStore" | "updateUrl", query?}`。
#[wasm_bindgen]
pub struct MemoFilterJS {
    session: FilterSession,
    compiler: QueryCompiler<Local>,
}

#[wasm_bindgen]
impl MemoFilterJS {
    /// 用当前地址栏查询串初始化
    #[wasm_bindgen(constructor)]
    pub fn new(query: &str) -> MemoFilterJS {
        console_error_panic_hook::set_once();
        MemoFilterJS {
            session: FilterSession::from_query(query),
            compiler: QueryCompiler::new(),
        }
    }

    /// 当前筛选状态
    #[wasm_bindgen]
    pub fn state(&self) -> Result<JsValue, JsValue> {
        to_js(self.session.store().state())
    }

    #[wasm_bindgen]
    pub fn add_filter(&mut self, factor: &str, value: &str) -> Result<JsValue, JsValue> {
        let factor = parse_factor(factor)?;
        to_js(&self.session.mutate(|store| store.add_filter(MemoFilter::new(factor, value))))
    }

    /// 移除一个筛选条件
    #[wasm_bindgen]
    pub fn remove_filter(&mut self, factor: &str, value: &str) -> Result<JsValue, JsValue> {
        let factor = parse_factor(factor)?;
        let action = self
            .session
            .mutate(|store| store.remove_filter(|f| f.factor == factor && f.value == value));
        to_js(&action)
    }

    /// 移除某个维度的全部筛选条件
    #[wasm_bindgen]
    pub fn remove_factor(&mut self, factor: &str) -> Result<JsValue, JsValue> {
        let factor = parse_factor(factor)?;
        to_js(&self.session.mutate(|store| store.remove_filter(|f| f.factor == factor)))
    }

    #[wasm_bindgen]
    pub fn clear_filters(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.session.mutate(FilterStore::clear_filters))
    }

    #[wasm_bindgen]
    pub fn filters_by_factor(&self, factor: &str) -> Result<JsValue, JsValue> {
        let factor = parse_factor(factor)?;
        to_js(&self.session.store().get_filters_by_factor(factor))
    }

    /// 排序选项: timeDesc / timeAsc / commentDesc / commentAsc / reactionsDesc / reactionsAsc
    #[wasm_bindgen]
    pub fn set_sort(&mut self, option: JsValue) -> Result<JsValue, JsValue> {
        let option: SortOption = serde_wasm_bindgen::from_value(option).map_err(to_js_error)?;
        to_js(&self.session.mutate(|store| store.set_sort(option)))
    }

    #[wasm_bindgen]
    pub fn effective_sort(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.store().state().effective_sort())
    }

    /// 快捷筛选不进入地址栏，对账结果总是 none
    #[wasm_bindgen]
    pub fn set_shortcut(&mut self, shortcut: Option<String>) -> Result<JsValue, JsValue> {
        to_js(&self.session.mutate(|store| store.set_shortcut(shortcut)))
    }

    /// 批量更新
    #[wasm_bindgen]
    pub fn set_state(&mut self, patch: JsValue) -> Result<JsValue, JsValue> {
        let patch: StatePatchParams = serde_wasm_bindgen::from_value(patch).map_err(to_js_error)?;
        to_js(&self.session.mutate(|store| store.set_state(patch.into())))
    }

    /// 恢复初始状态
    #[wasm_bindgen]
    pub fn reset(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.session.mutate(FilterStore::reset))
    }

    /// 订阅状态变化，回调参数为新的筛选状态
    ///
    /// 回调在修改方法返回前同步执行，回调里不能再调用本对象的方法。
    #[wasm_bindgen]
    pub fn subscribe(&mut self, callback: js_sys::Function) -> usize {
        self.session.subscribe(move |state| match serde_wasm_bindgen::to_value(state) {
            Ok(value) => {
                if let Err(e) = callback.call1(&JsValue::NULL, &value) {
                    memo_common::console_error!("筛选状态订阅回调出错: {:?}", e);
                }
            }
            Err(e) => memo_common::console_error!("序列化筛选状态失败: {}", e),
        })
    }

    #[wasm_bindgen]
    pub fn unsubscribe(&mut self, id: usize) -> bool {
        self.session.unsubscribe(id)
    }

    /// 地址栏查询串变化
    #[wasm_bindgen]
    pub fn on_url_change(&mut self, query: &str) -> Result<JsValue, JsValue> {
        to_js(&self.session.on_url_change(query))
    }

    /// 路由变化
    #[wasm_bindgen]
    pub fn on_route_change(&mut self, pathname: &str, query: &str) -> Result<JsValue, JsValue> {
        to_js(&self.session.on_route_change(pathname, query))
    }

    /// 对账
    #[wasm_bindgen]
    pub fn reconcile(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.session.reconcile())
    }

    /// 编译后端过滤表达式
    #[wasm_bindgen]
    pub fn compile(&self) -> String {
        self.compiler.compile(self.session.store().filters())
    }

    /// 构造列表请求
    #[wasm_bindgen]
    pub fn list_request(
        &self,
        scope: &str,
        page_size: Option<usize>,
        shortcut_filter: Option<String>,
    ) -> Result<JsValue, JsValue> {
        let request = self.compiler.build_list_request(
            self.session.store().state(),
            scope,
            page_size.unwrap_or(DEFAULT_LIST_MEMOS_PAGE_SIZE),
            shortcut_filter.as_deref(),
        );
        to_js(&request)
    }

    /// 对已拉取的一页备忘录做客户端过滤和排序
    #[wasm_bindgen]
    pub fn apply_client_filters(&self, memos: JsValue) -> Result<JsValue, JsValue> {
        let memos: Vec<Memo> = serde_wasm_bindgen::from_value(memos).map_err(to_js_error)?;
        to_js(&apply_client_filters(memos, self.session.store().state()))
    }

    /// 载入统计信息
    #[wasm_bindgen]
    pub fn set_user_stats(&mut self, stats: JsValue) -> Result<(), JsValue> {
        let stats: Vec<UserStats> = serde_wasm_bindgen::from_value(stats).map_err(to_js_error)?;
        self.session.stats_mut().set_stats(stats);
        Ok(())
    }

    /// 标签树
    #[wasm_bindgen]
    pub fn tag_tree(&self) -> Result<JsValue, JsValue> {
        to_js(&build_tag_tree(&self.session.stats().tag_amounts()))
    }

    #[wasm_bindgen]
    pub fn toggle_tag(&mut self, tag: &str) -> Result<JsValue, JsValue> {
        to_js(&self.session.mutate(|store| toggle_tag_filter(store, tag)))
    }

    #[wasm_bindgen]
    pub fn is_tag_active(&self, tag: &str) -> bool {
        is_tag_active(self.session.store(), tag)
    }

    #[wasm_bindgen]
    pub fn validate_tag_rename(&self, old_tag: &str, new_tag: &str) -> Result<(), JsValue> {
        validate_tag_rename(old_tag, new_tag).map_err(to_js_error)
    }

    /// 远端标签操作完成，`error` 为空表示成功；返回需要展示的提示
    #[wasm_bindgen]
    pub fn finish_tag_mutation(&mut self, mutation: JsValue, error: Option<String>) -> Result<JsValue, JsValue> {
        let mutation: TagMutation = serde_wasm_bindgen::from_value(mutation).map_err(to_js_error)?;
        let result = match error {
            Some(message) => Err(MemoError::Service(message)),
            None => Ok(()),
        };
        to_js(&finish_tag_mutation(self.session.stats_mut(), &mutation, result))
    }

    /// 统计状态 ID，变化时外部需要重新拉取统计信息
    #[wasm_bindgen]
    pub fn stats_state_id(&self) -> f64 {
        self.session.stats().state_id() as f64
    }
}

/// 供同一页面中的其它模块（搜索建议）直接操作
impl MemoFilterJS {
    pub fn session(&self) -> &FilterSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut FilterSession {
        &mut self.session
    }
}
