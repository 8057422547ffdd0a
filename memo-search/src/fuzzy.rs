use crate::models::{Highlight, MatchKind, TagSuggestion};

/// 标签模糊匹配阈值（归一化后的距离）
pub const FUZZY_THRESHOLD: f64 = 0.3;
/// 高亮时匹配部分前后保留的字符数
pub const HIGHLIGHT_CONTEXT: usize = 20;
/// 匹配位置每偏离开头这么多个字符，分数增加 1
const LOCATION_DISTANCE: f64 = 100.0;

const ELLIPSIS: &str = "...";

/// 单个候选的匹配结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyMatch {
    pub score: f64,
    pub kind: MatchKind,
}

/// 模糊匹配
///
/// 分数 = 编辑距离 / 查询长度 + 匹配位置 / 100，0 为完全匹配。
/// 候选中直接包含查询时只计算位置惩罚；否则在长度与查询相近的窗口上取最小编辑距离。
/// 分数超过阈值时返回 `None`。
pub fn fuzzy_match(query: &str, candidate: &str, threshold: f64) -> Option<FuzzyMatch> {
    let query: Vec<char> = query.trim().to_lowercase().chars().collect();
    if query.is_empty() {
        return None;
    }
    let text: Vec<char> = candidate.to_lowercase().chars().collect();

    if let Some(position) = find_ignore_case(&text, &query) {
        let score = position as f64 / LOCATION_DISTANCE;
        let kind = if position == 0 {
            MatchKind::Prefix
        } else {
            MatchKind::Contains
        };
        return (score <= threshold).then_some(FuzzyMatch { score, kind });
    }

    let query_len = query.len();
    let query: String = query.into_iter().collect();
    let min_window = query_len.saturating_sub(1).max(1);

    let mut best: Option<f64> = None;
    if text.len() < min_window {
        let whole: String = text.iter().collect();
        best = Some(strsim::levenshtein(&whole, &query) as f64 / query_len as f64);
    }
    for window_len in min_window..=query_len + 1 {
        if window_len > text.len() {
            break;
        }
        for start in 0..=text.len() - window_len {
            let window: String = text[start..start + window_len].iter().collect();
            let distance = strsim::levenshtein(&window, &query);
            let score = distance as f64 / query_len as f64 + start as f64 / LOCATION_DISTANCE;
            if best.map_or(true, |b| score < b) {
                best = Some(score);
            }
        }
    }

    best.filter(|score| *score <= threshold).map(|score| FuzzyMatch {
        score,
        kind: MatchKind::Approximate,
    })
}

/// 对已排好序的标签做模糊匹配，按分数升序排列，分数相同保持输入顺序
pub fn rank_tags(query: &str, tags: &[String], threshold: f64, context: usize) -> Vec<TagSuggestion> {
    let mut suggestions: Vec<TagSuggestion> = tags
        .iter()
        .filter_map(|tag| {
            fuzzy_match(query, tag, threshold).map(|m| TagSuggestion {
                tag: tag.clone(),
                score: m.score,
                kind: m.kind,
                highlight: highlight(tag, query.trim(), context),
            })
        })
        .collect();
    // sort_by 是稳定排序
    suggestions.sort_by(|a, b| a.score.total_cmp(&b.score));
    suggestions
}

/// 高亮第一处不区分大小写的匹配
///
/// 匹配部分前后最多各保留 `context` 个字符，被截断的一侧加省略号；没有匹配时原样返回。
pub fn highlight(text: &str, query: &str, context: usize) -> Highlight {
    let query: Vec<char> = query.chars().collect();
    if query.is_empty() {
        return Highlight::unmatched(text);
    }
    let chars: Vec<char> = text.chars().collect();
    let Some(start) = find_ignore_case(&chars, &query) else {
        return Highlight::unmatched(text);
    };
    let end = start + query.len();

    let before_start = start.saturating_sub(context);
    let mut before = String::new();
    if before_start > 0 {
        before.push_str(ELLIPSIS);
    }
    before.extend(&chars[before_start..start]);

    let after_end = (end + context).min(chars.len());
    let mut after: String = chars[end..after_end].iter().collect();
    if after_end < chars.len() {
        after.push_str(ELLIPSIS);
    }

    Highlight {
        before,
        matched: chars[start..end].iter().collect(),
        after,
    }
}

/// 不区分大小写的子串判断
pub fn contains_ignore_case(text: &str, query: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let query: Vec<char> = query.chars().collect();
    find_ignore_case(&text, &query).is_some()
}

fn find_ignore_case(text: &[char], query: &[char]) -> Option<usize> {
    if query.len() > text.len() {
        return None;
    }
    (0..=text.len() - query.len()).find(|&i| {
        text[i..i + query.len()]
            .iter()
            .zip(query)
            .all(|(a, b)| chars_eq_ignore_case(*a, *b))
    })
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}
