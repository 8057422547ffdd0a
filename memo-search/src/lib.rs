use memo_common::{KeyValueStorage, Memo, MemoError, MemoryStorage};
use memo_filter::MemoFilterJS;
use wasm_bindgen::prelude::*;

pub mod corpus;
pub mod debounce;
pub mod engine;
pub mod fuzzy;
pub mod history;
pub mod models;

pub use corpus::{MemoCorpus, PrefetchTicket};
pub use debounce::{Debouncer, DEBOUNCE_MS};
pub use engine::{split_words, SuggestionEngine};
pub use fuzzy::{fuzzy_match, highlight, rank_tags, FUZZY_THRESHOLD, HIGHLIGHT_CONTEXT};
pub use history::{SearchHistory, MAX_HISTORY_ITEMS, SEARCH_HISTORY_KEY};
pub use models::{
    Highlight, HistoryItem, HistoryKind, MemoSuggestion, SelectionOutcome, SuggestionConfig,
    SuggestionView, TagSuggestion,
};

fn to_js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&format!("序列化失败: {}", e)))
}

fn parse_kind(kind: &str) -> Result<HistoryKind, JsValue> {
    HistoryKind::parse(kind).ok_or_else(|| JsValue::from_str(&format!("未知的历史记录类型: {}", kind)))
}

/// 当前时间（毫秒）
#[cfg(target_arch = "wasm32")]
fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

#[cfg(not(target_arch = "wasm32"))]
fn now_ms() -> f64 {
    use once_cell::sync::Lazy;
    use std::time::Instant;

    static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);
    EPOCH.elapsed().as_secs_f64() * 1000.0
}

/// 优先使用 localStorage，不可用时退回内存存储
fn open_history_storage() -> Box<dyn KeyValueStorage> {
    match open_local_storage() {
        Some(storage) => storage,
        None => Box::new(MemoryStorage::new()),
    }
}

#[cfg(target_arch = "wasm32")]
fn open_local_storage() -> Option<Box<dyn KeyValueStorage>> {
    match memo_common::LocalStorage::open() {
        Ok(storage) => Some(Box::new(storage) as Box<dyn KeyValueStorage>),
        Err(e) => {
            memo_common::console_warn!("{}，搜索历史只保存在内存中", e);
            None
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn open_local_storage() -> Option<Box<dyn KeyValueStorage>> {
    None
}

/// 高亮单段文本
#[wasm_bindgen]
pub fn highlight_text(text: &str, query: &str) -> Result<JsValue, JsValue> {
    to_js(&highlight(text, query, HIGHLIGHT_CONTEXT))
}

/// 搜索建议 JS 接口
#[wasm_bindgen]
pub struct SearchSuggestionsJS {
    engine: SuggestionEngine<Box<dyn KeyValueStorage>>,
}

#[wasm_bindgen]
impl SearchSuggestionsJS {
    /// `config` 可省略，字段见 `SuggestionConfig`
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<SearchSuggestionsJS, JsValue> {
        console_error_panic_hook::set_once();
        let config: SuggestionConfig = if config.is_undefined() || config.is_null() {
            SuggestionConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config).map_err(to_js_error)?
        };
        Ok(SearchSuggestionsJS {
            engine: SuggestionEngine::with_config(open_history_storage(), config),
        })
    }

    /// 输入框内容变化，返回多少毫秒后应调用 `tick`
    #[wasm_bindgen]
    pub fn set_query(&mut self, query: &str) -> f64 {
        let now = now_ms();
        self.engine.set_query(query, now);
        self.engine.debouncer().remaining_ms(now).unwrap_or(0.0)
    }

    /// 防抖到期后调用，返回建议是否更新
    #[wasm_bindgen]
    pub fn tick(&mut self) -> bool {
        self.engine.tick(now_ms())
    }

    /// 从筛选模块同步标签和统计版本
    #[wasm_bindgen]
    pub fn sync_stats(&mut self, filter: &MemoFilterJS) {
        self.engine.sync_stats(filter.session().stats());
    }

    /// 返回需要预取的范围 `[{scope, generation}]`
    #[wasm_bindgen]
    pub fn begin_prefetch(&mut self, filter: &MemoFilterJS) -> Result<JsValue, JsValue> {
        let tickets = self.engine.begin_prefetch(filter.session().stats().scopes());
        to_js(&tickets)
    }

    /// 交回预取结果，`error` 非空表示失败；返回需要展示的提示或 undefined
    #[wasm_bindgen]
    pub fn complete_prefetch(
        &mut self,
        ticket: JsValue,
        memos: JsValue,
        error: Option<String>,
    ) -> Result<JsValue, JsValue> {
        let ticket: PrefetchTicket = serde_wasm_bindgen::from_value(ticket).map_err(to_js_error)?;
        let result = match error {
            Some(message) => Err(MemoError::Service(message)),
            None => serde_wasm_bindgen::from_value::<Vec<Memo>>(memos)
                .map_err(|e| MemoError::Service(format!("备忘录数据格式错误: {}", e))),
        };
        let notification = self.engine.complete_prefetch(&ticket, result, now_ms());
        to_js(&notification)
    }

    #[wasm_bindgen]
    pub fn view(&self) -> Result<JsValue, JsValue> {
        to_js(&self.engine.view())
    }

    /// 选中建议，`kind` 为 tag / content / memoName；结果中的 `sync` 为地址栏对账结果
    #[wasm_bindgen]
    pub fn select(&mut self, kind: &str, value: &str, filter: &mut MemoFilterJS) -> Result<JsValue, JsValue> {
        let kind = parse_kind(kind)?;
        let outcome = self.engine.select(kind, value, filter.session_mut());
        to_js(&outcome)
    }

    /// 回车提交，输入为空时返回 undefined
    #[wasm_bindgen]
    pub fn submit(&mut self, filter: &mut MemoFilterJS) -> Result<JsValue, JsValue> {
        let outcome = self.engine.submit(filter.session_mut());
        to_js(&outcome)
    }

    #[wasm_bindgen]
    pub fn history(&self) -> Result<JsValue, JsValue> {
        to_js(&self.engine.history().items())
    }

    #[wasm_bindgen]
    pub fn delete_history(&mut self, kind: &str, value: &str) -> Result<(), JsValue> {
        let item = HistoryItem::new(parse_kind(kind)?, value);
        self.engine.delete_history(&item).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn clear_history(&mut self) -> Result<(), JsValue> {
        self.engine.clear_history().map_err(to_js_error)
    }
}
