//! 地址栏同步
//!
//! 筛选状态和地址栏查询串双向同步。两边的修改都带有同一逻辑时钟上的版本号，
//! 对账时版本号较新的一方获胜；两边的规范形式一致时什么都不做。
//! 同步器自己写入地址栏的参数会被记为已知状态，浏览器回传同样的查询串时不会被当成外部修改。

use crate::query::{state_from_params, write_state_to_params, CanonicalQuery, SearchParams, FILTER_PARAM};
use crate::store::{FilterStatePatch, FilterStore, VersionClock};
use memo_common::console_log;
use serde::Serialize;

/// 一次对账的结果
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SyncAction {
    /// 两边已经一致
    #[default]
    None,
    /// 地址栏较新，已把地址栏参数写入筛选状态
    UpdateStore,
    /// 筛选状态较新，或地址栏写法不是规范形式；调用方需要把新的查询串写入地址栏
    UpdateUrl { query: String },
}

pub struct UrlSync {
    clock: VersionClock,
    current: SearchParams,
    url_version: u64,
    pathname: Option<String>,
}

impl UrlSync {
    /// 与筛选状态共享时钟，`query` 为当前地址栏查询串
    pub fn new(store: &FilterStore, query: &str) -> Self {
        let clock = store.clock();
        Self {
            url_version: clock.now(),
            clock,
            current: SearchParams::parse(query),
            pathname: None,
        }
    }

    pub fn params(&self) -> &SearchParams {
        &self.current
    }

    pub fn url_version(&self) -> u64 {
        self.url_version
    }

    /// 地址栏发生变化（前进后退、粘贴链接、路由跳转）
    ///
    /// 与已知查询串相同时忽略，返回是否记为一次外部修改。
    pub fn on_url_change(&mut self, query: &str) -> bool {
        let params = SearchParams::parse(query);
        if params == self.current {
            return false;
        }
        self.current = params;
        self.url_version = self.clock.tick();
        true
    }

    /// 对账
    pub fn reconcile(&mut self, store: &mut FilterStore) -> SyncAction {
        let from_url = CanonicalQuery::from_params(&self.current);
        let from_store = CanonicalQuery::from_state(store.state());
        if from_url == from_store {
            return SyncAction::None;
        }

        if self.url_version >= store.version() {
            let parsed = state_from_params(&self.current);
            console_log!("地址栏 -> 筛选状态: {:?}", from_url);
            store.set_state(FilterStatePatch {
                filters: Some(parsed.filters),
                order_by_time_asc: Some(parsed.order_by_time_asc),
                order_by_comment: Some(parsed.order_by_comment),
                order_by_reactions: Some(parsed.order_by_reactions),
                shortcut: None,
            });
            if CanonicalQuery::from_state(store.state()) == from_url {
                return SyncAction::UpdateStore;
            }
            // 地址栏里有被丢弃的片段，筛选状态已经是解析结果，接着把规范形式写回地址栏
        }

        let mut next = self.current.clone();
        write_state_to_params(store.state(), &mut next);
        self.current = next;
        let query = self.current.to_query_string();
        console_log!("筛选状态 -> 地址栏: {}", query);
        SyncAction::UpdateUrl { query }
    }

    /// 切换到新的主路由且目标地址不带 `filter` 参数时清空筛选条件
    pub fn on_route_change(&mut self, store: &mut FilterStore, pathname: &str, query: &str) {
        let previous = self.pathname.replace(pathname.to_string());
        self.on_url_change(query);

        let route_changed = previous.as_deref().is_some_and(|p| p != pathname);
        if route_changed && !self.current.has(FILTER_PARAM) {
            store.clear_filters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memo_common::{FilterFactor, MemoFilter, SortOption, SortOrder};

    fn setup(query: &str) -> (FilterStore, UrlSync) {
        let store = FilterStore::from_query(query);
        let sync = UrlSync::new(&store, query);
        (store, sync)
    }

    #[test]
    fn reconcile_without_changes_writes_nothing() {
        let (mut store, mut sync) = setup("filter=tagSearch%3Awork&orderByTime=asc");
        let version = store.version();
        assert_eq!(sync.reconcile(&mut store), SyncAction::None);
        assert_eq!(sync.reconcile(&mut store), SyncAction::None);
        assert_eq!(store.version(), version);
    }

    #[test]
    fn store_change_is_written_to_url() {
        let (mut store, mut sync) = setup("page=2");
        store.add_filter(MemoFilter::new(FilterFactor::TagSearch, "a/b"));
        store.set_sort(SortOption::CommentDesc);

        match sync.reconcile(&mut store) {
            SyncAction::UpdateUrl { query } => {
                assert_eq!(query, "page=2&orderByComment=desc&filter=tagSearch%3Aa%252Fb");
                // 浏览器回传同样的查询串，不算外部修改
                assert!(!sync.on_url_change(&query));
            }
            other => panic!("unexpected action {:?}", other),
        }
        assert_eq!(sync.reconcile(&mut store), SyncAction::None);
    }

    #[test]
    fn url_change_is_applied_to_store() {
        let (mut store, mut sync) = setup("");
        assert!(sync.on_url_change("?filter=contentSearch%3Ahello&orderByReactions=asc"));

        assert_eq!(sync.reconcile(&mut store), SyncAction::UpdateStore);
        assert_eq!(
            store.filters(),
            &[MemoFilter::new(FilterFactor::ContentSearch, "hello")]
        );
        assert_eq!(store.state().order_by_reactions, SortOrder::Asc);
        assert_eq!(sync.reconcile(&mut store), SyncAction::None);
    }

    #[test]
    fn newer_side_wins() {
        let (mut store, mut sync) = setup("");
        store.add_filter(MemoFilter::new(FilterFactor::HasLink, ""));
        sync.on_url_change("filter=tagSearch%3Afrom-url");

        assert_eq!(sync.reconcile(&mut store), SyncAction::UpdateStore);
        assert_eq!(store.filters()[0].value, "from-url");

        sync.on_url_change("filter=tagSearch%3Aolder");
        store.add_filter(MemoFilter::new(FilterFactor::HasCode, ""));
        assert!(matches!(sync.reconcile(&mut store), SyncAction::UpdateUrl { .. }));
        assert_eq!(store.filters().len(), 2);
    }

    #[test]
    fn malformed_url_is_normalised_while_applying() {
        let (mut store, mut sync) = setup("");
        sync.on_url_change("filter=tagSearch%3Aok%2Cnope%3Ax");

        assert_eq!(
            sync.reconcile(&mut store),
            SyncAction::UpdateUrl {
                query: "filter=tagSearch%3Aok".to_string()
            }
        );
        assert_eq!(
            store.filters(),
            &[MemoFilter::new(FilterFactor::TagSearch, "ok")]
        );
        assert_eq!(sync.reconcile(&mut store), SyncAction::None);
    }

    #[test]
    fn malformed_link_opened_at_load_settles() {
        let (mut store, mut sync) = setup("filter=tagSearch%3Aok%2Cnope%3Ax");
        let version = store.version();

        assert_eq!(
            sync.reconcile(&mut store),
            SyncAction::UpdateUrl {
                query: "filter=tagSearch%3Aok".to_string()
            }
        );
        assert_eq!(sync.reconcile(&mut store), SyncAction::None);
        assert_eq!(sync.reconcile(&mut store), SyncAction::None);
        assert_eq!(store.version(), version);
        assert_eq!(store.filters().len(), 1);
    }

    #[test]
    fn back_navigation_to_malformed_url_settles() {
        let (mut store, mut sync) = setup("filter=tagSearch%3Aok");
        // 地址栏解析结果与筛选状态相同，只是写法不规范
        assert!(sync.on_url_change("filter=tagSearch%3Aok%2Cjunk"));

        assert_eq!(
            sync.reconcile(&mut store),
            SyncAction::UpdateUrl {
                query: "filter=tagSearch%3Aok".to_string()
            }
        );
        assert_eq!(sync.reconcile(&mut store), SyncAction::None);
    }

    #[test]
    fn clearing_store_removes_default_params() {
        let (mut store, mut sync) = setup("filter=tagSearch%3Aa&orderByTime=asc");
        store.reset();
        assert_eq!(
            sync.reconcile(&mut store),
            SyncAction::UpdateUrl {
                query: String::new()
            }
        );
    }

    #[test]
    fn route_change_without_filter_param_clears_filters() {
        let (mut store, mut sync) = setup("filter=tagSearch%3Aa");
        sync.on_route_change(&mut store, "/", "filter=tagSearch%3Aa");
        assert_eq!(store.filters().len(), 1);

        sync.on_route_change(&mut store, "/explore", "filter=tagSearch%3Aa");
        assert_eq!(store.filters().len(), 1);

        sync.on_route_change(&mut store, "/archived", "");
        assert!(store.filters().is_empty());
        assert_eq!(sync.reconcile(&mut store), SyncAction::None);
    }
}
