use crate::fuzzy::contains_ignore_case;
use memo_common::{console_log, console_warn, Memo, Notification, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// 一次预取请求，完成时原样交回
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrefetchTicket {
    pub scope: String,
    pub generation: u64,
}

/// 本地内容搜索用的备忘录缓存
///
/// 每个范围只预取一次；统计信息的版本变化时整个缓存失效。
/// 预取由 JS 侧执行，`begin_prefetch` 给出需要拉取的范围，`complete_prefetch` 交回结果。
#[derive(Debug, Default)]
pub struct MemoCorpus {
    memos_by_scope: BTreeMap<String, Vec<Memo>>,
    requested: BTreeSet<String>,
    pending: BTreeSet<String>,
    stats_version: Option<u64>,
    generation: u64,
}

impl MemoCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 统计信息版本变化时清空缓存，返回是否发生了失效
    pub fn sync_stats_version(&mut self, version: u64) -> bool {
        if self.stats_version == Some(version) {
            return false;
        }
        let invalidated = self.stats_version.is_some();
        self.stats_version = Some(version);
        if invalidated {
            console_log!("统计信息已更新，清空备忘录缓存");
        }
        self.memos_by_scope.clear();
        self.requested.clear();
        self.pending.clear();
        self.generation += 1;
        invalidated
    }

    /// 返回尚未请求过的范围，并记为请求中
    pub fn begin_prefetch<'a>(&mut self, scopes: impl IntoIterator<Item = &'a str>) -> Vec<PrefetchTicket> {
        let mut tickets = Vec::new();
        for scope in scopes {
            if self.requested.insert(scope.to_string()) {
                self.pending.insert(scope.to_string());
                tickets.push(PrefetchTicket {
                    scope: scope.to_string(),
                    generation: self.generation,
                });
            }
        }
        tickets
    }

    /// 预取完成
    ///
    /// 失败只返回非阻塞提示，不影响其它范围。缓存已经失效后才到达的旧结果仍会被追加。
    pub fn complete_prefetch(&mut self, ticket: &PrefetchTicket, result: Result<Vec<Memo>>) -> Option<Notification> {
        if ticket.generation == self.generation {
            self.pending.remove(&ticket.scope);
        }
        match result {
            Ok(memos) => {
                if ticket.generation != self.generation {
                    console_warn!("范围 {} 的预取结果已过期，仍然追加到缓存", ticket.scope);
                }
                self.memos_by_scope
                    .entry(ticket.scope.clone())
                    .or_default()
                    .extend(memos);
                None
            }
            Err(e) => {
                console_warn!("预取 {} 的备忘录失败: {}", ticket.scope, e);
                Some(Notification::warning(format!(
                    "加载 {} 的备忘录失败: {}",
                    ticket.scope, e
                )))
            }
        }
    }

    /// 是否还有进行中的预取
    pub fn is_loading(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.memos_by_scope.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 内容中不区分大小写地包含查询的备忘录
    pub fn search<'a>(&'a self, query: &'a str) -> impl Iterator<Item = &'a Memo> + 'a {
        self.memos_by_scope
            .values()
            .flatten()
            .filter(move |memo| !query.is_empty() && contains_ignore_case(&memo.content, query))
    }
}
