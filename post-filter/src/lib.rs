use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Mutex;
use url::form_urlencoded;
use utils_common::compression as utils;
use utils_common::models::PostRecord;
use wasm_bindgen::prelude::*;
use web_sys::console;

use crate::models::CorpusIndex;

// 导出模块
pub mod builder;
pub mod models;

// 全局语料存储
static CORPUS: OnceCell<Mutex<Option<PostCorpus>>> = OnceCell::new();

// 全局筛选状态 - 归当前页面的视图独占，页面挂载时重置为空
static FILTER: OnceCell<Mutex<FilterState>> = OnceCell::new();

/// 初始化函数 - 设置错误处理
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

/// 版本信息
#[wasm_bindgen]
pub fn version() -> String {
    "1.2.0".to_string() // 筛选加作者视图，移除了分页和排序
}

//===== Models 部分 =====

/// 内存语料 - 已按日期降序排列的文章列表及派生主题
#[derive(Debug, Clone)]
pub struct PostCorpus {
    /// 所有文章，按发布日期降序。筛选只做子序列选择，保持该顺序
    pub posts: Vec<PostRecord>,
    /// 按首次出现顺序去重后的主题列表
    pub topics: Vec<String>,
}

/// 筛选状态 - 只由页面上的直接交互修改
#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct FilterState {
    /// 选中的主题集合，空集合表示不限制主题
    pub topics: HashSet<String>,
    /// 搜索文本，空字符串表示不限制文本
    pub search: String,
}

impl FilterState {
    /// 切换主题选中状态 - 已选中则移除，否则加入。
    /// 语料中不存在的主题也允许加入，它只是永远不会命中任何文章
    pub fn toggle_topic(&mut self, topic: &str) {
        if !self.topics.remove(topic) {
            self.topics.insert(topic.to_string());
        }
    }

    /// 替换搜索文本，原样保存。大小写折叠只在匹配时进行
    pub fn set_search(&mut self, text: &str) {
        self.search = text.to_string();
    }
}

/// 筛选结果 - 返回给客户端的可见文章列表
#[derive(Serialize, Debug)]
pub struct FilterResult {
    /// 筛选后的文章列表，保持语料原有顺序
    pub posts: Vec<PostRecord>,
    /// 可见文章总数
    pub total: usize,
}

//===== 纯函数部分 =====

/// 提取主题列表 - 按首次出现顺序去重
pub fn extract_topics(posts: &[PostRecord]) -> Vec<String> {
    let mut topics = Vec::new();
    for post in posts {
        if !topics.contains(&post.topic) {
            topics.push(post.topic.clone());
        }
    }
    topics
}

/// 解析URL查询字符串为键值对列表，值做百分号解码，保留重复键
pub fn parse_query(raw: &str) -> Vec<(String, String)> {
    let raw = raw.strip_prefix('?').unwrap_or(raw);
    form_urlencoded::parse(raw.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

/// 从查询字符串中提取author参数。键重复时取第一个值
pub fn author_from_query(raw: &str) -> Option<String> {
    parse_query(raw)
        .into_iter()
        .find(|(key, _)| key == "author")
        .map(|(_, value)| value)
}

/// 筛选文章 - 三个相互独立的谓词取与，保持语料顺序。
/// 空的约束一律退化为"不限制"，绝不能被当作"排除全部"
pub fn filter_posts(
    posts: &[PostRecord],
    topics: &HashSet<String>,
    search: &str,
    author: Option<&str>,
) -> Vec<PostRecord> {
    let needle = search.to_lowercase();
    posts
        .iter()
        .filter(|post| topic_matches(post, topics))
        .filter(|post| text_matches(post, &needle))
        .filter(|post| author_matches(post, author))
        .cloned()
        .collect()
}

// 主题谓词 - 精确匹配，区分大小写（主题是受控词表，不是用户输入）
fn topic_matches(post: &PostRecord, topics: &HashSet<String>) -> bool {
    topics.is_empty() || topics.contains(&post.topic)
}

// 文本谓词 - needle已折叠为小写；标题、描述、作者名任一命中即可
fn text_matches(post: &PostRecord, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    post.title.to_lowercase().contains(needle)
        || post.description.to_lowercase().contains(needle)
        || post.author.name.to_lowercase().contains(needle)
}

// 作者谓词 - 整串精确匹配，区分大小写，不做子串比较
fn author_matches(post: &PostRecord, author: Option<&str>) -> bool {
    match author {
        Some(name) if !name.is_empty() => post.author.name == name,
        _ => true,
    }
}

//===== 筛选器部分 =====

/// 文章筛选器 - 处理语料加载与筛选逻辑
pub struct PostFilter;

impl PostFilter {
    /// 加载语料索引并重置筛选状态，对应页面挂载
    pub fn load_corpus(data: &[u8]) -> Result<(), String> {
        let corpus_index = match utils::from_compressed_with_max_version::<CorpusIndex>(data, 1) {
            Ok(index) => index,
            Err(e) => {
                console::log_1(&JsValue::from_str(&format!("语料索引解析失败: {}", e)));
                return Err(format!("解析语料索引失败: {}", e));
            }
        };

        let corpus = Self::convert_index_to_corpus(corpus_index);

        // 存入全局变量并清空筛选状态
        let corpus_cell = CORPUS.get_or_init(|| Mutex::new(None));
        let mut corpus_guard = corpus_cell.lock().map_err(|_| "获取语料锁失败")?;
        *corpus_guard = Some(corpus);

        let filter_cell = FILTER.get_or_init(|| Mutex::new(FilterState::default()));
        let mut filter_guard = filter_cell.lock().map_err(|_| "获取筛选状态锁失败")?;
        *filter_guard = FilterState::default();

        Ok(())
    }

    // 将磁盘索引转换为内存语料。
    // 磁盘格式中的倒排索引只服务于构建期统计，内存筛选逐篇判定即可
    fn convert_index_to_corpus(index: CorpusIndex) -> PostCorpus {
        let topics = extract_topics(&index.posts);
        PostCorpus {
            posts: index.posts,
            topics,
        }
    }

    /// 获取全部主题，按首次出现顺序
    pub fn get_topics() -> Result<Vec<String>, String> {
        let corpus_mutex = CORPUS.get().ok_or("语料未初始化")?;
        let corpus_guard = corpus_mutex.lock().map_err(|_| "获取语料锁失败")?;
        let corpus = corpus_guard.as_ref().ok_or("语料为空")?;

        Ok(corpus.topics.clone())
    }

    /// 切换主题筛选
    pub fn toggle_topic(topic: &str) -> Result<(), String> {
        let filter_mutex = FILTER.get().ok_or("筛选状态未初始化")?;
        let mut filter_guard = filter_mutex.lock().map_err(|_| "获取筛选状态锁失败")?;
        filter_guard.toggle_topic(topic);
        Ok(())
    }

    /// 设置搜索文本
    pub fn set_search(text: &str) -> Result<(), String> {
        let filter_mutex = FILTER.get().ok_or("筛选状态未初始化")?;
        let mut filter_guard = filter_mutex.lock().map_err(|_| "获取筛选状态锁失败")?;
        filter_guard.set_search(text);
        Ok(())
    }

    /// 读取当前筛选状态快照
    pub fn get_filter_state() -> Result<FilterState, String> {
        let filter_mutex = FILTER.get().ok_or("筛选状态未初始化")?;
        let filter_guard = filter_mutex.lock().map_err(|_| "获取筛选状态锁失败")?;
        Ok(filter_guard.clone())
    }

    /// 筛选文章 - 结合当前筛选状态与URL查询串中的作者约束。
    /// query每次调用时重新解析，保证结果与触发渲染的URL同步
    pub fn visible_posts(query: &str) -> Result<FilterResult, String> {
        let corpus_mutex = CORPUS.get().ok_or("语料未初始化")?;
        let corpus_guard = corpus_mutex.lock().map_err(|_| "获取语料锁失败")?;
        let corpus = corpus_guard.as_ref().ok_or("语料为空")?;

        let state = Self::get_filter_state()?;
        let author = author_from_query(query);

        let posts = filter_posts(&corpus.posts, &state.topics, &state.search, author.as_deref());
        let total = posts.len();

        Ok(FilterResult { posts, total })
    }
}

/// 文章筛选器JS接口 - 提供给JavaScript使用的筛选API
#[wasm_bindgen]
pub struct PostFilterJS;

#[wasm_bindgen]
impl PostFilterJS {
    /// 初始化筛选器并加载语料索引
    #[wasm_bindgen]
    pub fn init(index_data: &[u8]) -> Result<(), JsValue> {
        console_error_panic_hook::set_once();

        PostFilter::load_corpus(index_data).map_err(|e| {
            console::log_1(&JsValue::from_str(&format!("初始化筛选器失败: {}", e)));
            JsValue::from_str(&e)
        })
    }

    /// 获取全部主题
    #[wasm_bindgen]
    pub fn get_topics() -> Result<JsValue, JsValue> {
        let topics = PostFilter::get_topics().map_err(|e| JsValue::from_str(&e))?;

        serde_wasm_bindgen::to_value(&topics)
            .map_err(|e| JsValue::from_str(&format!("序列化主题失败: {}", e)))
    }

    /// 切换主题选中状态
    #[wasm_bindgen]
    pub fn toggle_topic(topic: &str) -> Result<(), JsValue> {
        PostFilter::toggle_topic(topic).map_err(|e| JsValue::from_str(&e))
    }

    /// 设置搜索文本
    #[wasm_bindgen]
    pub fn set_search(text: &str) -> Result<(), JsValue> {
        PostFilter::set_search(text).map_err(|e| JsValue::from_str(&e))
    }

    /// 获取当前筛选状态，用于控件高亮
    #[wasm_bindgen]
    pub fn get_filter_state() -> Result<JsValue, JsValue> {
        let state = PostFilter::get_filter_state().map_err(|e| JsValue::from_str(&e))?;

        serde_wasm_bindgen::to_value(&state)
            .map_err(|e| JsValue::from_str(&format!("序列化筛选状态失败: {}", e)))
    }

    /// 筛选文章 - query传入当前页面的location.search
    #[wasm_bindgen]
    pub fn filter_posts(query: &str) -> Result<JsValue, JsValue> {
        let result = PostFilter::visible_posts(query).map_err(|e| JsValue::from_str(&e))?;

        serde_wasm_bindgen::to_value(&result)
            .map_err(|e| JsValue::from_str(&format!("序列化筛选结果失败: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use utils_common::models::PostAuthor;

    fn post(slug: &str, topic: &str, title: &str, description: &str, author: &str, day: u32) -> PostRecord {
        PostRecord {
            slug: slug.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            topic: topic.to_string(),
            tags: Vec::new(),
            author: PostAuthor {
                name: author.to_string(),
                website: None,
                tagline: None,
                image: None,
            },
            date: Utc.with_ymd_and_hms(2021, 3, day, 0, 0, 0).unwrap(),
            url: format!("/blog/{}", slug),
        }
    }

    // 与博客首页一致的小语料：日期降序
    fn corpus() -> Vec<PostRecord> {
        vec![
            post("a", "Tech", "Intro to Go", "A gentle introduction", "Alice", 9),
            post("b", "Life", "My Trip", "Travel notes", "Bob", 5),
            post("c", "Tech", "Parsing in Rust", "Hand-rolled parsers", "Alice", 1),
        ]
    }

    fn slugs(posts: &[PostRecord]) -> Vec<&str> {
        posts.iter().map(|p| p.slug.as_str()).collect()
    }

    fn topic_set(topics: &[&str]) -> HashSet<String> {
        topics.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn unconstrained_filter_returns_corpus_in_order() {
        let corpus = corpus();
        let result = filter_posts(&corpus, &HashSet::new(), "", None);
        assert_eq!(slugs(&result), vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_corpus_yields_empty_result() {
        let result = filter_posts(&[], &topic_set(&["Tech"]), "go", Some("Alice"));
        assert!(result.is_empty());
    }

    #[test]
    fn topic_filter_selects_matching_subsequence() {
        let corpus = corpus();
        let result = filter_posts(&corpus, &topic_set(&["Tech"]), "", None);
        assert_eq!(slugs(&result), vec!["a", "c"]);
    }

    #[test]
    fn unknown_topic_matches_nothing() {
        let corpus = corpus();
        let result = filter_posts(&corpus, &topic_set(&["Cooking"]), "", None);
        assert!(result.is_empty());
    }

    #[test]
    fn search_matches_title_description_and_author() {
        let corpus = corpus();
        assert_eq!(slugs(&filter_posts(&corpus, &HashSet::new(), "trip", None)), vec!["b"]);
        assert_eq!(slugs(&filter_posts(&corpus, &HashSet::new(), "travel", None)), vec!["b"]);
        assert_eq!(slugs(&filter_posts(&corpus, &HashSet::new(), "bob", None)), vec!["b"]);
    }

    #[test]
    fn search_is_case_insensitive() {
        let corpus = corpus();
        let upper = filter_posts(&corpus, &HashSet::new(), "ALICE", None);
        let lower = filter_posts(&corpus, &HashSet::new(), "alice", None);
        assert_eq!(slugs(&upper), vec!["a", "c"]);
        assert_eq!(slugs(&upper), slugs(&lower));
    }

    #[test]
    fn author_constraint_is_exact_and_case_sensitive() {
        let corpus = corpus();
        assert_eq!(slugs(&filter_posts(&corpus, &HashSet::new(), "", Some("Alice"))), vec!["a", "c"]);
        assert!(filter_posts(&corpus, &HashSet::new(), "", Some("alice")).is_empty());
        assert!(filter_posts(&corpus, &HashSet::new(), "", Some("Alice B"))
            .is_empty());
    }

    #[test]
    fn empty_author_constraint_means_no_constraint() {
        let corpus = corpus();
        let result = filter_posts(&corpus, &HashSet::new(), "", Some(""));
        assert_eq!(slugs(&result), vec!["a", "b", "c"]);
    }

    #[test]
    fn combined_predicates_are_anded() {
        let corpus = corpus();
        assert_eq!(slugs(&filter_posts(&corpus, &topic_set(&["Life"]), "trip", None)), vec!["b"]);
        assert!(filter_posts(&corpus, &topic_set(&["Tech"]), "trip", None).is_empty());
        assert_eq!(
            slugs(&filter_posts(&corpus, &topic_set(&["Tech"]), "parsing", Some("Alice"))),
            vec!["c"]
        );
    }

    #[test]
    fn filter_preserves_date_descending_order() {
        let corpus = corpus();
        // 命中第一篇和第三篇，顺序不变
        let result = filter_posts(&corpus, &HashSet::new(), "", Some("Alice"));
        assert_eq!(slugs(&result), vec!["a", "c"]);
    }

    #[test]
    fn extract_topics_dedupes_in_first_occurrence_order() {
        let corpus = corpus();
        assert_eq!(extract_topics(&corpus), vec!["Tech", "Life"]);
        assert!(extract_topics(&[]).is_empty());
    }

    #[test]
    fn toggle_topic_twice_restores_state() {
        let mut state = FilterState::default();
        state.toggle_topic("Tech");
        assert!(state.topics.contains("Tech"));
        state.toggle_topic("Tech");
        assert!(state.topics.is_empty());
    }

    #[test]
    fn set_search_replaces_verbatim() {
        let mut state = FilterState::default();
        state.set_search("  Rust ");
        assert_eq!(state.search, "  Rust ");
        state.set_search("");
        assert_eq!(state.search, "");
    }

    #[test]
    fn author_from_query_decodes_percent_and_plus() {
        assert_eq!(author_from_query("?author=Jane%20Doe"), Some("Jane Doe".to_string()));
        assert_eq!(author_from_query("author=Jane+Doe"), Some("Jane Doe".to_string()));
    }

    #[test]
    fn author_from_query_takes_first_value() {
        assert_eq!(author_from_query("?author=Alice&author=Bob"), Some("Alice".to_string()));
    }

    #[test]
    fn author_from_query_absent_key_means_none() {
        assert_eq!(author_from_query(""), None);
        assert_eq!(author_from_query("?topic=Tech"), None);
    }

    #[test]
    fn parse_query_keeps_repeated_keys() {
        let pairs = parse_query("?author=A&author=B&x=1");
        assert_eq!(
            pairs,
            vec![
                ("author".to_string(), "A".to_string()),
                ("author".to_string(), "B".to_string()),
                ("x".to_string(), "1".to_string()),
            ]
        );
    }
}
