use crate::corpus::{MemoCorpus, PrefetchTicket};
use crate::debounce::Debouncer;
use crate::fuzzy::{highlight, rank_tags};
use crate::history::SearchHistory;
use crate::models::{
    HistoryItem, HistoryKind, MemoSuggestion, SelectionOutcome, SuggestionConfig, SuggestionResults,
    SuggestionView,
};
use memo_common::{console_warn, FilterFactor, KeyValueStorage, Memo, MemoFilter, Notification, Result};
use memo_filter::{FilterSession, UserStatsStore};
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// 按空白切分，忽略空片段
pub fn split_words(value: &str) -> Vec<&str> {
    WHITESPACE.split(value.trim()).filter(|w| !w.is_empty()).collect()
}

/// 搜索建议引擎
pub struct SuggestionEngine<S: KeyValueStorage> {
    config: SuggestionConfig,
    query: String,
    debouncer: Debouncer,
    tags: Vec<String>,
    corpus: MemoCorpus,
    results: Option<(u64, SuggestionResults)>,
    history: SearchHistory<S>,
}

impl<S: KeyValueStorage> SuggestionEngine<S> {
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, SuggestionConfig::default())
    }

    pub fn with_config(storage: S, config: SuggestionConfig) -> Self {
        Self {
            debouncer: Debouncer::new(config.debounce_ms),
            history: SearchHistory::load_with_limit(storage, config.max_history_items),
            config,
            query: String::new(),
            tags: Vec::new(),
            corpus: MemoCorpus::new(),
            results: None,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn history(&self) -> &SearchHistory<S> {
        &self.history
    }

    pub fn corpus(&self) -> &MemoCorpus {
        &self.corpus
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    /// 输入框内容变化，重新开始计时
    pub fn set_query(&mut self, query: &str, now_ms: f64) -> u64 {
        self.query = query.to_string();
        self.debouncer.input(query, now_ms)
    }

    /// 同步标签列表和缓存版本
    pub fn sync_stats(&mut self, stats: &UserStatsStore) {
        self.tags = stats.sorted_tags();
        self.corpus.sync_stats_version(stats.version());
    }

    /// 查询非空时返回需要预取的范围
    pub fn begin_prefetch<'a>(&mut self, scopes: impl IntoIterator<Item = &'a str>) -> Vec<PrefetchTicket> {
        if self.query.trim().is_empty() {
            return Vec::new();
        }
        self.corpus.begin_prefetch(scopes)
    }

    /// 预取完成后按当前输入重新计时
    pub fn complete_prefetch(
        &mut self,
        ticket: &PrefetchTicket,
        result: Result<Vec<Memo>>,
        now_ms: f64,
    ) -> Option<Notification> {
        let notification = self.corpus.complete_prefetch(ticket, result);
        let query = self.query.clone();
        self.debouncer.input(&query, now_ms);
        notification
    }

    /// 防抖到期时计算结果，返回结果是否更新
    pub fn tick(&mut self, now_ms: f64) -> bool {
        match self.debouncer.poll(now_ms) {
            Some(due) => {
                let results = self.compute(&due.query);
                self.apply_results(due.generation, results)
            }
            None => false,
        }
    }

    /// 计算某个查询的建议
    pub fn compute(&self, query: &str) -> SuggestionResults {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return SuggestionResults::default();
        }
        let tags = rank_tags(
            trimmed,
            &self.tags,
            self.config.fuzzy_threshold,
            self.config.highlight_context,
        );
        let memos = self
            .corpus
            .search(trimmed)
            .map(|memo| MemoSuggestion {
                name: memo.name.clone(),
                display_time: memo.display_time,
                highlight: highlight(&memo.content, trimmed, self.config.highlight_context),
            })
            .collect();
        SuggestionResults {
            query: query.to_string(),
            tags,
            memos,
        }
    }

    /// 采用计算结果；generation 不是最新时丢弃
    pub fn apply_results(&mut self, generation: u64, results: SuggestionResults) -> bool {
        if !self.debouncer.is_current(generation) {
            console_warn!("丢弃过期的搜索建议: {}", results.query);
            return false;
        }
        self.results = Some((generation, results));
        true
    }

    /// 当前应展示的内容
    pub fn view(&self) -> SuggestionView {
        if self.query.trim().is_empty() {
            return if self.history.is_empty() {
                SuggestionView::Empty
            } else {
                SuggestionView::History {
                    items: self.history.items().to_vec(),
                }
            };
        }
        let (tags, memos) = match &self.results {
            Some((_, results)) => (results.tags.clone(), results.memos.clone()),
            None => (Vec::new(), Vec::new()),
        };
        SuggestionView::Results {
            tags,
            memos,
            loading: self.corpus.is_loading(),
        }
    }

    /// 选中一条建议或历史记录
    ///
    /// 标签添加一个 tagSearch 条件；内容按空白切分，每段添加一个 contentSearch 条件；
    /// 备忘录名只跳转，不添加条件。每次选中都会写入历史并清空输入框。
    /// 新条件写入筛选会话后立即对账，地址栏的更新放在 `sync` 中返回。
    pub fn select(&mut self, kind: HistoryKind, value: &str, session: &mut FilterSession) -> SelectionOutcome {
        let mut outcome = SelectionOutcome::default();
        match kind {
            HistoryKind::Tag => {
                outcome
                    .added_filters
                    .push(MemoFilter::new(FilterFactor::TagSearch, value));
            }
            HistoryKind::Content => {
                outcome.added_filters = split_words(value)
                    .into_iter()
                    .map(|word| MemoFilter::new(FilterFactor::ContentSearch, word))
                    .collect();
            }
            HistoryKind::MemoName => {
                outcome.navigate_to = Some(format!("/{}", value));
            }
        }
        outcome.sync = session.mutate(|store| {
            for filter in &outcome.added_filters {
                store.add_filter(filter.clone());
            }
        });

        if let Err(e) = self.history.add(HistoryItem::new(kind, value)) {
            console_warn!("保存搜索历史失败: {}", e);
            outcome.notification = Some(Notification::warning(format!("保存搜索历史失败: {}", e)));
        }
        self.query.clear();
        self.debouncer.cancel();
        self.results = None;
        outcome
    }

    /// 回车提交：把输入内容当作内容搜索
    pub fn submit(&mut self, session: &mut FilterSession) -> Option<SelectionOutcome> {
        let query = self.query.trim().to_string();
        if query.is_empty() {
            return None;
        }
        Some(self.select(HistoryKind::Content, &query, session))
    }

    pub fn delete_history(&mut self, item: &HistoryItem) -> Result<()> {
        self.history.delete_one(item)
    }

    pub fn clear_history(&mut self) -> Result<()> {
        self.history.clear_all()
    }
}
