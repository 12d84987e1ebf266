use crate::models::CorpusIndex;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Write;
use utils_common::compression::to_compressed;
use utils_common::models::PostRecord;

/// 语料索引构建器
pub struct CorpusBuilder {
    posts: Vec<PostRecord>,
}

impl CorpusBuilder {
    /// 创建新的语料索引构建器
    pub fn new() -> Self {
        Self { posts: Vec::new() }
    }

    /// 添加文章到索引构建器
    pub fn add_post(&mut self, post: PostRecord) {
        self.posts.push(post);
    }

    /// 构建语料索引
    pub fn build_corpus_index(&self) -> Result<CorpusIndex, String> {
        if self.posts.is_empty() {
            println!("错误: 无法构建索引，没有文章数据");
            return Err("无法构建索引: 没有文章数据".to_string());
        }

        println!("开始构建语料索引，文章数量: {}", self.posts.len());

        // 按发布日期降序排列。筛选阶段只做子序列选择，不再排序
        let mut posts = self.posts.clone();
        posts.sort_by(|a, b| b.date.cmp(&a.date));

        // 创建倒排索引
        let mut topic_index: HashMap<String, HashSet<usize>> = HashMap::new();
        let mut author_index: HashMap<String, HashSet<usize>> = HashMap::new();

        for (i, post) in posts.iter().enumerate() {
            topic_index
                .entry(post.topic.clone())
                .or_insert_with(HashSet::new)
                .insert(i);
            author_index
                .entry(post.author.name.clone())
                .or_insert_with(HashSet::new)
                .insert(i);
        }

        println!(
            "索引构建完成，主题数量: {}, 作者数量: {}",
            topic_index.len(),
            author_index.len()
        );

        Ok(CorpusIndex {
            posts,
            topic_index,
            author_index,
        })
    }

    /// 保存语料索引到文件
    pub fn save_corpus_index(&self, path: &str) -> Result<(), String> {
        println!("开始保存语料索引到文件: {}", path);

        let corpus_index = self.build_corpus_index()?;

        let mut index_file = match File::create(path) {
            Ok(file) => file,
            Err(e) => {
                println!("创建索引文件失败: {}", e);
                return Err(format!("无法创建语料索引文件: {}", e));
            }
        };

        // 当前索引格式版本号1.0
        let version = [1, 0];

        let compressed_data = match to_compressed(&corpus_index, version) {
            Ok(data) => {
                println!("数据压缩成功，压缩后大小: {} 字节", data.len());
                data
            }
            Err(e) => {
                println!("数据压缩失败: {}", e);
                return Err(format!("压缩语料索引失败: {}", e));
            }
        };

        match index_file.write_all(&compressed_data) {
            Ok(_) => {
                println!(
                    "语料索引已成功写入文件: {}，大小: {} 字节",
                    path,
                    compressed_data.len()
                );
            }
            Err(e) => {
                println!("写入语料索引文件失败: {}", e);
                return Err(format!("无法写入语料索引文件: {}", e));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use utils_common::models::PostAuthor;

    fn post(slug: &str, topic: &str, author: &str, day: u32) -> PostRecord {
        PostRecord {
            slug: slug.to_string(),
            title: format!("标题 {}", slug),
            description: String::new(),
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

    #[test]
    fn posts_are_stored_date_descending() {
        let mut builder = CorpusBuilder::new();
        builder.add_post(post("old", "Tech", "Alice", 1));
        builder.add_post(post("new", "Tech", "Alice", 9));
        builder.add_post(post("mid", "Life", "Bob", 5));

        let index = builder.build_corpus_index().unwrap();
        let slugs: Vec<&str> = index.posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["new", "mid", "old"]);
    }

    #[test]
    fn inverted_indexes_point_at_sorted_positions() {
        let mut builder = CorpusBuilder::new();
        builder.add_post(post("old", "Tech", "Alice", 1));
        builder.add_post(post("new", "Life", "Bob", 9));

        let index = builder.build_corpus_index().unwrap();
        // 排序后 new 在位置0，old 在位置1
        assert!(index.topic_index["Life"].contains(&0));
        assert!(index.topic_index["Tech"].contains(&1));
        assert!(index.author_index["Bob"].contains(&0));
        assert!(index.author_index["Alice"].contains(&1));
    }

    #[test]
    fn empty_builder_is_an_error() {
        let builder = CorpusBuilder::new();
        assert!(builder.build_corpus_index().is_err());
    }
}
