use memo_common::{FilterFactor, FilterState, Memo, MemoState, SortOption};
use serde::Serialize;
use std::cmp::Ordering;

/// 客户端过滤和排序的结果
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListOutcome {
    pub memos: Vec<Memo>,
    /// 被 visibility / resources 条件隐藏的条目数
    ///
    /// 这两个条件只作用于已拉取的这一页，页面可能显示为空而后续页仍有匹配项，
    /// 调用方据此提示用户继续加载。
    pub hidden_by_client_filters: usize,
}

/// 判断备忘录是否满足只在客户端生效的条件
pub fn matches_client_filters(memo: &Memo, state: &FilterState) -> bool {
    state
        .filters
        .iter()
        .filter(|filter| filter.factor.is_client_side())
        .all(|filter| match filter.factor {
            FilterFactor::Visibility => memo.visibility == filter.value,
            FilterFactor::Resources => memo.resource_count > 0,
            _ => true,
        })
}

/// 过滤已拉取的列表并排序
///
/// 只保留正常状态的备忘录，按生效的排序方式排序后置顶的排在最前。
pub fn apply_client_filters(memos: Vec<Memo>, state: &FilterState) -> ListOutcome {
    let mut hidden_by_client_filters = 0;
    let mut kept: Vec<Memo> = memos
        .into_iter()
        .filter(|memo| memo.state == MemoState::Normal)
        .filter(|memo| {
            let keep = matches_client_filters(memo, state);
            if !keep {
                hidden_by_client_filters += 1;
            }
            keep
        })
        .collect();

    let sort = state.effective_sort();
    kept.sort_by(|a, b| compare_memos(a, b, sort));
    kept.sort_by(|a, b| b.pinned.cmp(&a.pinned));

    ListOutcome {
        memos: kept,
        hidden_by_client_filters,
    }
}

fn compare_memos(a: &Memo, b: &Memo, sort: SortOption) -> Ordering {
    match sort {
        SortOption::CommentAsc => a.comment_count.cmp(&b.comment_count),
        SortOption::CommentDesc => b.comment_count.cmp(&a.comment_count),
        SortOption::ReactionsAsc => a.reaction_count.cmp(&b.reaction_count),
        SortOption::ReactionsDesc => b.reaction_count.cmp(&a.reaction_count),
        // 没有展示时间的视为最早
        SortOption::TimeAsc => a.display_time.cmp(&b.display_time),
        SortOption::TimeDesc => b.display_time.cmp(&a.display_time),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use memo_common::{MemoFilter, SortOrder};

    fn memo(name: &str, day: u32) -> Memo {
        Memo {
            name: name.to_string(),
            content: String::new(),
            visibility: "PUBLIC".to_string(),
            state: MemoState::Normal,
            pinned: false,
            display_time: Some(Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()),
            resource_count: 0,
            comment_count: 0,
            reaction_count: 0,
        }
    }

    fn names(outcome: &ListOutcome) -> Vec<&str> {
        outcome.memos.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn default_sort_is_newest_first_with_pinned_on_top() {
        let mut pinned = memo("old-pinned", 1);
        pinned.pinned = true;
        let mut archived = memo("archived", 9);
        archived.state = MemoState::Archived;

        let outcome = apply_client_filters(
            vec![memo("a", 2), pinned, memo("b", 5), archived],
            &FilterState::default(),
        );
        assert_eq!(names(&outcome), vec!["old-pinned", "b", "a"]);
        assert_eq!(outcome.hidden_by_client_filters, 0);
    }

    #[test]
    fn visibility_and_resources_filter_locally() {
        let mut private = memo("private", 3);
        private.visibility = "PRIVATE".to_string();
        let mut with_file = memo("with-file", 4);
        with_file.resource_count = 2;

        let state = FilterState {
            filters: vec![
                MemoFilter::new(FilterFactor::Visibility, "PUBLIC"),
                MemoFilter::new(FilterFactor::Resources, ""),
                MemoFilter::new(FilterFactor::TagSearch, "ignored-here"),
            ],
            ..Default::default()
        };
        let outcome = apply_client_filters(vec![private, with_file, memo("plain", 5)], &state);
        assert_eq!(names(&outcome), vec!["with-file"]);
        assert_eq!(outcome.hidden_by_client_filters, 2);
    }

    #[test]
    fn server_side_filters_hide_nothing_locally() {
        let state = FilterState {
            filters: FilterFactor::ALL
                .iter()
                .filter(|factor| !factor.is_client_side())
                .map(|factor| MemoFilter::new(*factor, "2024-03-10"))
                .collect(),
            ..Default::default()
        };
        let outcome = apply_client_filters(vec![memo("a", 1), memo("b", 2)], &state);
        assert_eq!(outcome.memos.len(), 2);
        assert_eq!(outcome.hidden_by_client_filters, 0);
    }

    #[test]
    fn memos_without_display_time_sort_as_oldest() {
        let mut undated = memo("undated", 1);
        undated.display_time = None;

        let outcome = apply_client_filters(
            vec![undated.clone(), memo("a", 2), memo("b", 5)],
            &FilterState::default(),
        );
        assert_eq!(names(&outcome), vec!["b", "a", "undated"]);

        let state = FilterState {
            order_by_time_asc: true,
            ..Default::default()
        };
        let outcome = apply_client_filters(vec![memo("a", 2), undated], &state);
        assert_eq!(names(&outcome), vec!["undated", "a"]);
    }

    #[test]
    fn comment_sort_wins_over_time() {
        let mut busy = memo("busy", 1);
        busy.comment_count = 5;
        let mut quiet = memo("quiet", 9);
        quiet.comment_count = 1;

        let state = FilterState {
            order_by_time_asc: true,
            order_by_comment: SortOrder::Desc,
            ..Default::default()
        };
        let outcome = apply_client_filters(vec![quiet, busy], &state);
        assert_eq!(names(&outcome), vec!["busy", "quiet"]);
    }

    #[test]
    fn reactions_ascending_is_stable_for_ties() {
        let mut a = memo("a", 1);
        a.reaction_count = 2;
        let b = memo("b", 2);
        let c = memo("c", 3);

        let state = FilterState {
            order_by_reactions: SortOrder::Asc,
            ..Default::default()
        };
        let outcome = apply_client_filters(vec![a, b, c], &state);
        assert_eq!(names(&outcome), vec!["b", "c", "a"]);
    }
}
