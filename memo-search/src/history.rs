use crate::models::HistoryItem;
use memo_common::{console_warn, KeyValueStorage, Result};
use std::collections::HashSet;

/// 本地存储中的键名
pub const SEARCH_HISTORY_KEY: &str = "searchHistory";
/// 最多保留的历史条数
pub const MAX_HISTORY_ITEMS: usize = 10;

/// 搜索历史，最新的在前
pub struct SearchHistory<S: KeyValueStorage> {
    storage: S,
    items: Vec<HistoryItem>,
    max_items: usize,
}

impl<S: KeyValueStorage> SearchHistory<S> {
    /// 从存储中载入，数据损坏时按空历史处理
    pub fn load(storage: S) -> Self {
        Self::load_with_limit(storage, MAX_HISTORY_ITEMS)
    }

    pub fn load_with_limit(storage: S, max_items: usize) -> Self {
        let mut items = match storage.get_item(SEARCH_HISTORY_KEY) {
            Ok(Some(raw)) => parse_items(&raw),
            Ok(None) => Vec::new(),
            Err(e) => {
                console_warn!("读取搜索历史失败: {}", e);
                Vec::new()
            }
        };
        // 手工改过的存储里可能有重复记录，保留最靠前的一条
        let mut seen = HashSet::new();
        items.retain(|item| seen.insert(item.clone()));
        items.truncate(max_items);
        Self {
            storage,
            items,
            max_items,
        }
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 去掉相同的旧记录，插到最前面，超出上限的从末尾丢弃
    ///
    /// 内存中的历史总会更新；返回的错误只表示持久化失败。
    pub fn add(&mut self, item: HistoryItem) -> Result<()> {
        self.items.retain(|existing| existing != &item);
        self.items.insert(0, item);
        self.items.truncate(self.max_items);
        self.persist()
    }

    pub fn delete_one(&mut self, item: &HistoryItem) -> Result<()> {
        let before = self.items.len();
        self.items.retain(|existing| existing != item);
        if self.items.len() == before {
            return Ok(());
        }
        self.persist()
    }

    /// 清空全部历史并删除存储键
    pub fn clear_all(&mut self) -> Result<()> {
        self.items.clear();
        self.storage.remove_item(SEARCH_HISTORY_KEY)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn persist(&mut self) -> Result<()> {
        let json = serde_json::to_string(&self.items)?;
        self.storage.set_item(SEARCH_HISTORY_KEY, &json)
    }
}

// 逐条解析，跳过无法识别的记录
fn parse_items(raw: &str) -> Vec<HistoryItem> {
    match serde_json::from_str::<Vec<serde_json::Value>>(raw) {
        Ok(values) => values
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<HistoryItem>(value) {
                Ok(item) => Some(item),
                Err(e) => {
                    console_warn!("忽略无法识别的搜索历史记录: {}", e);
                    None
                }
            })
            .collect(),
        Err(e) => {
            console_warn!("搜索历史数据损坏，已忽略: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HistoryKind;
    use memo_common::{MemoError, MemoryStorage};

    fn tag(value: &str) -> HistoryItem {
        HistoryItem::new(HistoryKind::Tag, value)
    }

    #[test]
    fn add_deduplicates_and_prepends() {
        let mut history = SearchHistory::load(MemoryStorage::new());
        history.add(tag("a")).unwrap();
        history.add(HistoryItem::new(HistoryKind::Content, "a")).unwrap();
        history.add(tag("a")).unwrap();

        assert_eq!(
            history.items(),
            &[tag("a"), HistoryItem::new(HistoryKind::Content, "a")]
        );
    }

    #[test]
    fn add_evicts_oldest_beyond_limit() {
        let mut history = SearchHistory::load(MemoryStorage::new());
        for i in 0..12 {
            history.add(tag(&format!("t{}", i))).unwrap();
        }
        assert_eq!(history.items().len(), MAX_HISTORY_ITEMS);
        assert_eq!(history.items()[0], tag("t11"));
        assert_eq!(history.items()[9], tag("t2"));
    }

    #[test]
    fn history_survives_reload() {
        let mut history = SearchHistory::load(MemoryStorage::new());
        history.add(tag("work")).unwrap();
        history
            .add(HistoryItem::new(HistoryKind::MemoName, "memos/42"))
            .unwrap();

        let raw = history
            .storage()
            .get_item(SEARCH_HISTORY_KEY)
            .unwrap()
            .unwrap();
        assert_eq!(
            raw,
            r#"[{"type":"memoName","value":"memos/42"},{"type":"tag","value":"work"}]"#
        );

        let mut storage = MemoryStorage::new();
        storage.set_item(SEARCH_HISTORY_KEY, &raw).unwrap();
        let reloaded = SearchHistory::load(storage);
        assert_eq!(reloaded.items(), history.items());
    }

    #[test]
    fn malformed_storage_loads_empty() {
        let mut storage = MemoryStorage::new();
        storage.set_item(SEARCH_HISTORY_KEY, "not json").unwrap();
        assert!(SearchHistory::load(storage).is_empty());

        let mut storage = MemoryStorage::new();
        storage
            .set_item(
                SEARCH_HISTORY_KEY,
                r#"[{"type":"bogus","value":"x"},{"type":"tag","value":"ok"}]"#,
            )
            .unwrap();
        assert_eq!(SearchHistory::load(storage).items(), &[tag("ok")]);
    }

    #[test]
    fn duplicate_stored_entries_load_once() {
        let mut storage = MemoryStorage::new();
        storage
            .set_item(
                SEARCH_HISTORY_KEY,
                r#"[{"type":"tag","value":"a"},{"type":"content","value":"a"},{"type":"tag","value":"a"},{"type":"tag","value":"b"}]"#,
            )
            .unwrap();
        let mut history = SearchHistory::load_with_limit(storage, 3);
        assert_eq!(
            history.items(),
            &[tag("a"), HistoryItem::new(HistoryKind::Content, "a"), tag("b")]
        );

        history.delete_one(&tag("a")).unwrap();
        assert_eq!(history.items().len(), 2);
        assert!(!history.items().contains(&tag("a")));
    }

    #[test]
    fn delete_one_and_clear_all() {
        let mut history = SearchHistory::load(MemoryStorage::new());
        history.add(tag("a")).unwrap();
        history.add(tag("b")).unwrap();

        history.delete_one(&tag("a")).unwrap();
        assert_eq!(history.items(), &[tag("b")]);

        history.clear_all().unwrap();
        assert!(history.is_empty());
        assert_eq!(history.storage().get_item(SEARCH_HISTORY_KEY).unwrap(), None);
    }

    struct ReadOnlyStorage;

    impl KeyValueStorage for ReadOnlyStorage {
        fn get_item(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set_item(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(MemoError::Storage("quota exceeded".to_string()))
        }

        fn remove_item(&mut self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn persistence_failure_still_updates_memory() {
        let mut history = SearchHistory::load(ReadOnlyStorage);
        assert!(history.add(tag("a")).is_err());
        assert_eq!(history.items(), &[tag("a")]);
    }
}
