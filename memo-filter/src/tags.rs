use crate::store::FilterStore;
use memo_common::{FilterFactor, MemoFilter};
use serde::Serialize;
use std::collections::HashMap;

/// 标签树节点
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TagNode {
    /// 当前层级的片段，例如 `rust`
    pub key: String,
    /// 完整路径，例如 `work/rust`
    pub text: String,
    /// 完整路径本身的使用次数，只有大于 1 时才显示，否则为 0
    pub amount: i64,
    /// 子标签，按首次出现的顺序排列
    pub sub_tags: Vec<TagNode>,
}

impl TagNode {
    fn new(key: &str, text: &str, amount: i64) -> Self {
        Self {
            key: key.to_string(),
            text: text.to_string(),
            amount,
            sub_tags: Vec::new(),
        }
    }
}

/// 把扁平的标签计数聚合成以 `/` 分层的标签森林
///
/// 先按路径字典序排序，保证前缀在其子路径之前被处理；每次都完整重建。
pub fn build_tag_tree(tag_amounts: &HashMap<String, i64>) -> Vec<TagNode> {
    let mut paths: Vec<&String> = tag_amounts.keys().collect();
    paths.sort();

    let mut roots: Vec<TagNode> = Vec::new();

    for path in paths {
        let mut siblings = &mut roots;
        let mut full_path = String::new();

        for segment in path.split('/') {
            if !full_path.is_empty() {
                full_path.push('/');
            }
            full_path.push_str(segment);

            let amount = match tag_amounts.get(&full_path) {
                Some(&count) if count > 1 => count,
                _ => 0,
            };

            let index = match siblings.iter().position(|node| node.text == full_path) {
                Some(index) => index,
                None => {
                    siblings.push(TagNode::new(segment, &full_path, amount));
                    siblings.len() - 1
                }
            };
            siblings = &mut siblings[index].sub_tags;
        }
    }

    roots
}

/// 标签当前是否作为筛选条件生效
pub fn is_tag_active(store: &FilterStore, tag: &str) -> bool {
    store
        .get_filters_by_factor(FilterFactor::TagSearch)
        .iter()
        .any(|f| f.value == tag)
}

/// 点击标签：已生效则移除，否则添加
pub fn toggle_tag_filter(store: &mut FilterStore, tag: &str) {
    if is_tag_active(store, tag) {
        store.remove_filter(|f| f.factor == FilterFactor::TagSearch && f.value == tag);
    } else {
        store.add_filter(MemoFilter::new(FilterFactor::TagSearch, tag));
    }
}
