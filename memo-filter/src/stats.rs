use memo_common::{console_error, MemoError, Notification, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// 单个范围（用户）的统计信息
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    /// 资源名，例如 `users/1`
    pub name: String,
    #[serde(default)]
    pub tag_count: HashMap<String, i64>,
}

/// 统计信息存储
///
/// `version` 在每次载入新的统计信息时前进，用来让缓存的备忘录失效；
/// `state_id` 在标签被重命名或删除后前进，通知外部重新拉取统计信息。
#[derive(Debug, Default, Clone)]
pub struct UserStatsStore {
    stats_by_name: BTreeMap<String, UserStats>,
    version: u64,
    state_id: u64,
}

impl UserStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用新拉取的统计信息整体替换
    pub fn set_stats(&mut self, stats: Vec<UserStats>) {
        self.stats_by_name = stats
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();
        self.version += 1;
    }

    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.stats_by_name.keys().map(String::as_str)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn state_id(&self) -> u64 {
        self.state_id
    }

    pub fn bump_state_id(&mut self) -> u64 {
        self.state_id += 1;
        self.state_id
    }

    /// 所有范围的标签计数之和
    pub fn tag_amounts(&self) -> HashMap<String, i64> {
        let mut amounts = HashMap::new();
        for stats in self.stats_by_name.values() {
            for (tag, count) in &stats.tag_count {
                *amounts.entry(tag.clone()).or_insert(0) += count;
            }
        }
        amounts
    }

    /// 标签按使用次数降序排列，次数相同按名称升序
    pub fn sorted_tags(&self) -> Vec<String> {
        let mut tags: Vec<(String, i64)> = self.tag_amounts().into_iter().collect();
        tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        tags.into_iter().map(|(tag, _)| tag).collect()
    }
}

/// 交给远端执行的标签操作
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TagMutation {
    #[serde(rename_all = "camelCase")]
    Rename { old_tag: String, new_tag: String },
    Delete { tag: String },
}

/// 校验标签重命名
pub fn validate_tag_rename(old_tag: &str, new_tag: &str) -> Result<()> {
    let new_tag = new_tag.trim();
    if new_tag.is_empty() || new_tag.chars().any(char::is_whitespace) {
        return Err(MemoError::InvalidTagName(
            "标签名不能为空或包含空格".to_string(),
        ));
    }
    if new_tag == old_tag {
        return Err(MemoError::InvalidTagName(
            "新名称不能与旧名称相同".to_string(),
        ));
    }
    Ok(())
}

/// 处理远端标签操作的结果
///
/// 失败时返回阻塞式错误提示，本地标签树保持不变；成功时前进 `state_id`，
/// 由外部重新拉取标签计数，而不是在本地直接修改标签树。
pub fn finish_tag_mutation(
    stats: &mut UserStatsStore,
    mutation: &TagMutation,
    result: Result<()>,
) -> Notification {
    match result {
        Ok(()) => {
            stats.bump_state_id();
            match mutation {
                TagMutation::Rename { old_tag, new_tag } => {
                    Notification::success(format!("标签 {} 已重命名为 {}", old_tag, new_tag))
                }
                TagMutation::Delete { tag } => Notification::success(format!("标签 {} 已删除", tag)),
            }
        }
        Err(e) => {
            console_error!("标签操作失败 {:?}: {}", mutation, e);
            Notification::error(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memo_common::NotificationLevel;

    fn stats(name: &str, tags: &[(&str, i64)]) -> UserStats {
        UserStats {
            name: name.to_string(),
            tag_count: tags.iter().map(|(t, c)| (t.to_string(), *c)).collect(),
        }
    }

    #[test]
    fn tag_amounts_sum_across_scopes() {
        let mut store = UserStatsStore::new();
        store.set_stats(vec![
            stats("users/1", &[("a", 2), ("b", 1)]),
            stats("users/2", &[("a", 3), ("c", 5)]),
        ]);
        let amounts = store.tag_amounts();
        assert_eq!(amounts["a"], 5);
        assert_eq!(amounts["b"], 1);
        assert_eq!(amounts["c"], 5);
        assert_eq!(store.sorted_tags(), vec!["a", "c", "b"]);
        assert_eq!(store.scopes().collect::<Vec<_>>(), vec!["users/1", "users/2"]);
    }

    #[test]
    fn set_stats_advances_version() {
        let mut store = UserStatsStore::new();
        store.set_stats(Vec::new());
        store.set_stats(Vec::new());
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn rename_validation() {
        assert!(validate_tag_rename("old", "").is_err());
        assert!(validate_tag_rename("old", "has space").is_err());
        assert!(validate_tag_rename("old", "old").is_err());
        assert!(validate_tag_rename("old", "new/name").is_ok());
    }

    #[test]
    fn successful_mutation_bumps_state_id() {
        let mut store = UserStatsStore::new();
        let mutation = TagMutation::Delete {
            tag: "a".to_string(),
        };
        let notification = finish_tag_mutation(&mut store, &mutation, Ok(()));
        assert_eq!(notification.level, NotificationLevel::Success);
        assert_eq!(store.state_id(), 1);
    }

    #[test]
    fn failed_mutation_is_blocking_and_keeps_state() {
        let mut store = UserStatsStore::new();
        store.set_stats(vec![stats("users/1", &[("a", 2)])]);
        let mutation = TagMutation::Rename {
            old_tag: "a".to_string(),
            new_tag: "b".to_string(),
        };
        let notification = finish_tag_mutation(
            &mut store,
            &mutation,
            Err(MemoError::Service("permission denied".to_string())),
        );
        assert_eq!(notification.level, NotificationLevel::Error);
        assert!(notification.blocking);
        assert!(notification.message.contains("permission denied"));
        assert_eq!(store.state_id(), 0);
        assert_eq!(store.tag_amounts()["a"], 2);
    }
}
