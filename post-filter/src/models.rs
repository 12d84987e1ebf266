use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use utils_common::models::PostRecord;

/// 语料索引 - 索引器生成、筛选器加载的磁盘格式
#[derive(Serialize, Deserialize, Debug)]
pub struct CorpusIndex {
    /// 所有文章的元数据列表，已按发布日期降序排列
    pub posts: Vec<PostRecord>,
    /// 主题到文章位置集合的映射
    pub topic_index: HashMap<String, HashSet<usize>>,
    /// 作者名到文章位置集合的映射
    pub author_index: HashMap<String, HashSet<usize>>,
}
