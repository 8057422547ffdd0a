//! 筛选会话
//!
//! 把筛选状态、地址栏同步器和标签统计放在一起。每次修改筛选状态后立即对账，
//! 在修改返回之前得到需要写入地址栏的查询串。

use crate::stats::UserStatsStore;
use crate::store::{FilterStore, SubscriptionId};
use crate::sync::{SyncAction, UrlSync};
use memo_common::FilterState;

pub struct FilterSession {
    store: FilterStore,
    sync: UrlSync,
    stats: UserStatsStore,
}

impl FilterSession {
    /// 用当前地址栏查询串初始化
    pub fn from_query(query: &str) -> Self {
        let store = FilterStore::from_query(query);
        let sync = UrlSync::new(&store, query);
        Self {
            store,
            sync,
            stats: UserStatsStore::new(),
        }
    }

    pub fn store(&self) -> &FilterStore {
        &self.store
    }

    pub fn sync(&self) -> &UrlSync {
        &self.sync
    }

    pub fn stats(&self) -> &UserStatsStore {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut UserStatsStore {
        &mut self.stats
    }

    /// 修改筛选状态并对账
    ///
    /// 订阅回调在 `f` 内同步触发，此时会话仍被借用；地址栏的更新通过返回值交给调用方。
    pub fn update<R, F>(&mut self, f: F) -> (R, SyncAction)
    where
        F: FnOnce(&mut FilterStore) -> R,
    {
        let result = f(&mut self.store);
        let action = self.reconcile();
        (result, action)
    }

    pub fn mutate<F>(&mut self, f: F) -> SyncAction
    where
        F: FnOnce(&mut FilterStore),
    {
        self.update(f).1
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&FilterState) + 'static,
    {
        self.store.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    pub fn reconcile(&mut self) -> SyncAction {
        self.sync.reconcile(&mut self.store)
    }

    /// 地址栏查询串变化
    pub fn on_url_change(&mut self, query: &str) -> SyncAction {
        if !self.sync.on_url_change(query) {
            return SyncAction::None;
        }
        self.reconcile()
    }

    /// 路由变化
    pub fn on_route_change(&mut self, pathname: &str, query: &str) -> SyncAction {
        self.sync.on_route_change(&mut self.store, pathname, query);
        self.reconcile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::toggle_tag_filter;
    use memo_common::{FilterFactor, MemoFilter, SortOption};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn mutation_returns_url_update() {
        let mut session = FilterSession::from_query("page=2");
        let action = session.mutate(|store| {
            store.add_filter(MemoFilter::new(FilterFactor::TagSearch, "work"));
        });
        assert_eq!(
            action,
            SyncAction::UpdateUrl {
                query: "page=2&filter=tagSearch%3Awork".to_string()
            }
        );

        let action = session.mutate(|store| store.set_sort(SortOption::ReactionsAsc));
        assert_eq!(
            action,
            SyncAction::UpdateUrl {
                query: "page=2&filter=tagSearch%3Awork&orderByReactions=asc".to_string()
            }
        );

        // 浏览器回传刚写入的查询串
        assert_eq!(
            session.on_url_change("page=2&filter=tagSearch%3Awork&orderByReactions=asc"),
            SyncAction::None
        );
    }

    #[test]
    fn unchanged_mutation_writes_nothing() {
        let mut session = FilterSession::from_query("filter=tagSearch%3Awork");
        let action = session.mutate(|store| {
            store.add_filter(MemoFilter::new(FilterFactor::TagSearch, "work"));
        });
        assert_eq!(action, SyncAction::None);
    }

    #[test]
    fn subscribers_see_state_before_url_is_written() {
        let mut session = FilterSession::from_query("");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        session.subscribe(move |state| sink.borrow_mut().push(state.filters.len()));

        let (active, action) = session.update(|store| {
            toggle_tag_filter(store, "rust");
            store.filters().len()
        });
        assert_eq!(active, 1);
        assert_eq!(*seen.borrow(), vec![1]);
        assert_eq!(
            action,
            SyncAction::UpdateUrl {
                query: "filter=tagSearch%3Arust".to_string()
            }
        );
    }

    #[test]
    fn url_change_updates_store_in_one_step() {
        let mut session = FilterSession::from_query("");
        assert_eq!(
            session.on_url_change("filter=contentSearch%3Ahi"),
            SyncAction::UpdateStore
        );
        assert_eq!(session.store().filters()[0].value, "hi");
    }

    #[test]
    fn route_change_clears_filters_and_settles() {
        let mut session = FilterSession::from_query("filter=tagSearch%3Aa");
        assert_eq!(session.on_route_change("/", "filter=tagSearch%3Aa"), SyncAction::None);
        assert_eq!(session.on_route_change("/archived", ""), SyncAction::None);
        assert!(session.store().filters().is_empty());
    }
}
