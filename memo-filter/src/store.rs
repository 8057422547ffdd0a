use crate::query::{state_from_params, SearchParams};
use memo_common::{FilterFactor, FilterState, MemoFilter, SortOption, SortOrder};
use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

/// 单调递增的逻辑时钟
///
/// 筛选状态与地址栏同步器共享同一个时钟，双方的版本号因此可以直接比较先后。
#[derive(Clone, Debug, Default)]
pub struct VersionClock(Rc<Cell<u64>>);

impl VersionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// 前进一步并返回新的版本号
    pub fn tick(&self) -> u64 {
        let next = self.0.get() + 1;
        self.0.set(next);
        next
    }

    pub fn now(&self) -> u64 {
        self.0.get()
    }
}

pub type SubscriptionId = usize;

type Listener = Box<dyn FnMut(&FilterState)>;

/// 批量更新 - 只替换给出的字段
#[derive(Clone, Debug, Default)]
pub struct FilterStatePatch {
    pub filters: Option<Vec<MemoFilter>>,
    pub order_by_time_asc: Option<bool>,
    pub order_by_comment: Option<SortOrder>,
    pub order_by_reactions: Option<SortOrder>,
    pub shortcut: Option<Option<String>>,
}

impl From<FilterState> for FilterStatePatch {
    fn from(state: FilterState) -> Self {
        Self {
            filters: Some(state.filters),
            order_by_time_asc: Some(state.order_by_time_asc),
            order_by_comment: Some(state.order_by_comment),
            order_by_reactions: Some(state.order_by_reactions),
            shortcut: Some(state.shortcut),
        }
    }
}

/// 筛选状态存储
///
/// 所有修改都是同步的：状态发生变化时版本号前进，订阅者在方法返回前收到通知。
/// 没有实际变化的修改既不改变版本号也不通知订阅者。
pub struct FilterStore {
    state: FilterState,
    version: u64,
    clock: VersionClock,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: SubscriptionId,
}

impl Default for FilterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterStore {
    pub fn new() -> Self {
        Self::from_state(FilterState::default())
    }

    pub fn from_state(state: FilterState) -> Self {
        Self::with_clock(state, VersionClock::new())
    }

    /// 页面加载时从地址栏查询串初始化
    pub fn from_query(query: &str) -> Self {
        Self::from_state(state_from_params(&SearchParams::parse(query)))
    }

    pub fn with_clock(mut state: FilterState, clock: VersionClock) -> Self {
        state.filters = dedup_filters(state.filters);
        Self {
            state,
            version: clock.now(),
            clock,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn filters(&self) -> &[MemoFilter] {
        &self.state.filters
    }

    /// 最近一次实际修改时的逻辑时钟值
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn clock(&self) -> VersionClock {
        self.clock.clone()
    }

    pub fn get_filters_by_factor(&self, factor: FilterFactor) -> Vec<&MemoFilter> {
        self.state
            .filters
            .iter()
            .filter(|f| f.factor == factor)
            .collect()
    }

    pub fn has_filter(&self, filter: &MemoFilter) -> bool {
        let key = filter.key();
        self.state.filters.iter().any(|f| f.key() == key)
    }

    /// 添加筛选条件，已存在相同 key 时不做任何事
    pub fn add_filter(&mut self, filter: MemoFilter) {
        if self.has_filter(&filter) {
            return;
        }
        let mut next = self.state.clone();
        next.filters.push(filter);
        self.commit(next);
    }

    /// 移除所有满足条件的筛选条件
    pub fn remove_filter<F>(&mut self, predicate: F)
    where
        F: Fn(&MemoFilter) -> bool,
    {
        let mut next = self.state.clone();
        next.filters.retain(|f| !predicate(f));
        self.commit(next);
    }

    pub fn clear_filters(&mut self) {
        self.remove_filter(|_| true);
    }

    pub fn set_state(&mut self, patch: FilterStatePatch) {
        let mut next = self.state.clone();
        if let Some(filters) = patch.filters {
            next.filters = dedup_filters(filters);
        }
        if let Some(asc) = patch.order_by_time_asc {
            next.order_by_time_asc = asc;
        }
        if let Some(order) = patch.order_by_comment {
            next.order_by_comment = order;
        }
        if let Some(order) = patch.order_by_reactions {
            next.order_by_reactions = order;
        }
        if let Some(shortcut) = patch.shortcut {
            next.shortcut = shortcut;
        }
        self.commit(next);
    }

    /// 选择排序方式，其余两个排序字段恢复默认
    pub fn set_sort(&mut self, option: SortOption) {
        let mut next = self.state.clone();
        next.order_by_time_asc = option == SortOption::TimeAsc;
        next.order_by_comment = match option {
            SortOption::CommentAsc => SortOrder::Asc,
            SortOption::CommentDesc => SortOrder::Desc,
            _ => SortOrder::Default,
        };
        next.order_by_reactions = match option {
            SortOption::ReactionsAsc => SortOrder::Asc,
            SortOption::ReactionsDesc => SortOrder::Desc,
            _ => SortOrder::Default,
        };
        self.commit(next);
    }

    pub fn set_order_by_time_asc(&mut self, asc: bool) {
        self.set_sort(if asc {
            SortOption::TimeAsc
        } else {
            SortOption::TimeDesc
        });
    }

    pub fn set_shortcut(&mut self, shortcut: Option<String>) {
        let mut next = self.state.clone();
        next.shortcut = shortcut;
        self.commit(next);
    }

    /// 恢复初始状态（清空筛选条件，排序回到按时间降序），保留快捷方式
    pub fn reset(&mut self) {
        let next = FilterState {
            shortcut: self.state.shortcut.clone(),
            ..FilterState::default()
        };
        self.commit(next);
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&FilterState) + 'static,
    {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    fn commit(&mut self, next: FilterState) {
        if next == self.state {
            return;
        }
        self.state = next;
        self.version = self.clock.tick();
        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.state);
        }
    }
}

fn dedup_filters(filters: Vec<MemoFilter>) -> Vec<MemoFilter> {
    let mut seen = HashSet::new();
    filters
        .into_iter()
        .filter(|f| seen.insert(f.key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn tag(value: &str) -> MemoFilter {
        MemoFilter::new(FilterFactor::TagSearch, value)
    }

    #[test]
    fn add_filter_is_unique_by_key() {
        let mut store = FilterStore::new();
        store.add_filter(tag("a"));
        store.add_filter(MemoFilter::new(FilterFactor::ContentSearch, "a"));
        store.add_filter(tag("a"));
        assert_eq!(store.filters().len(), 2);
        assert_eq!(store.get_filters_by_factor(FilterFactor::TagSearch), vec![&tag("a")]);
    }

    #[test]
    fn remove_filter_removes_all_matches() {
        let mut store = FilterStore::new();
        store.add_filter(tag("a"));
        store.add_filter(tag("b"));
        store.add_filter(MemoFilter::new(FilterFactor::HasLink, ""));
        store.remove_filter(|f| f.factor == FilterFactor::TagSearch);
        assert_eq!(store.filters(), &[MemoFilter::new(FilterFactor::HasLink, "")]);
    }

    #[test]
    fn listeners_see_state_before_mutation_returns() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut store = FilterStore::new();
        let sink = seen.clone();
        store.subscribe(move |state| sink.borrow_mut().push(state.filters.len()));

        store.add_filter(tag("a"));
        assert_eq!(*seen.borrow(), vec![1]);

        // 没有变化时不通知
        store.add_filter(tag("a"));
        store.remove_filter(|f| f.value == "missing");
        assert_eq!(*seen.borrow(), vec![1]);

        store.clear_filters();
        assert_eq!(*seen.borrow(), vec![1, 0]);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let count = Rc::new(Cell::new(0));
        let mut store = FilterStore::new();
        let counter = count.clone();
        let id = store.subscribe(move |_| counter.set(counter.get() + 1));

        store.add_filter(tag("a"));
        assert!(store.unsubscribe(id));
        store.add_filter(tag("b"));
        assert_eq!(count.get(), 1);
        assert!(!store.unsubscribe(id));
    }

    #[test]
    fn version_advances_only_on_change() {
        let mut store = FilterStore::new();
        assert_eq!(store.version(), 0);
        store.set_sort(SortOption::TimeDesc);
        assert_eq!(store.version(), 0);
        store.set_sort(SortOption::CommentAsc);
        let v = store.version();
        assert!(v > 0);
        store.set_order_by_time_asc(true);
        assert!(store.version() > v);
    }

    #[test]
    fn set_sort_keeps_fields_exclusive() {
        let mut store = FilterStore::new();
        store.set_sort(SortOption::ReactionsDesc);
        store.set_sort(SortOption::CommentAsc);
        let state = store.state();
        assert_eq!(state.order_by_comment, SortOrder::Asc);
        assert_eq!(state.order_by_reactions, SortOrder::Default);
        assert!(!state.order_by_time_asc);

        store.set_order_by_time_asc(true);
        assert_eq!(store.state().effective_sort(), SortOption::TimeAsc);
    }

    #[test]
    fn set_state_replaces_only_given_fields_and_dedups() {
        let mut store = FilterStore::new();
        store.set_shortcut(Some("s1".to_string()));
        store.set_state(FilterStatePatch {
            filters: Some(vec![tag("x"), tag("x"), tag("y")]),
            order_by_comment: Some(SortOrder::Desc),
            ..Default::default()
        });
        assert_eq!(store.filters(), &[tag("x"), tag("y")]);
        assert_eq!(store.state().order_by_comment, SortOrder::Desc);
        assert_eq!(store.state().shortcut.as_deref(), Some("s1"));
    }

    #[test]
    fn reset_restores_defaults_but_keeps_shortcut() {
        let mut store = FilterStore::from_query("filter=tagSearch%3Aa&orderByTime=asc");
        store.set_shortcut(Some("s".to_string()));
        store.reset();
        assert!(!store.state().is_applying());
        assert_eq!(store.state().shortcut.as_deref(), Some("s"));
    }

    #[test]
    fn from_query_reads_url_parameters() {
        let store = FilterStore::from_query("?filter=tagSearch%3Awork%2Cresources%3A&orderByReactions=desc");
        assert_eq!(store.filters().len(), 2);
        assert_eq!(store.state().order_by_reactions, SortOrder::Desc);
    }
}
