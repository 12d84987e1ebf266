use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 标签元数据 - 文章卡片上展示的标签
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PostTag {
    /// 标签名称
    pub name: String,
    /// 标签颜色（CSS颜色值）
    #[serde(default = "default_tag_color")]
    pub color: String,
}

/// 默认标签颜色为中性灰
fn default_tag_color() -> String {
    "#9ca3af".to_string()
}

/// 作者信息 - 筛选只使用name字段，其余字段仅用于展示
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PostAuthor {
    /// 作者姓名
    pub name: String,
    /// 作者个人网站
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// 作者一句话简介
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
    /// 作者头像URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// 文章元数据 - 存储筛选和展示所需的文章基本信息
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PostRecord {
    /// 文章唯一标识符，由输出路径派生，跨构建稳定
    pub slug: String,
    /// 文章标题
    pub title: String,
    /// 文章描述
    pub description: String,
    /// 文章主题，每篇文章恰好一个
    pub topic: String,
    /// 文章标签列表，仅用于展示
    #[serde(default)]
    pub tags: Vec<PostTag>,
    /// 作者信息
    pub author: PostAuthor,
    /// 发布日期
    pub date: DateTime<Utc>,
    /// 文章URL路径
    pub url: String,
}
