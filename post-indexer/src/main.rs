use std::fs;
use std::path::Path;

use chrono::{NaiveDate, Utc};
use clap::{Arg, ArgAction, Command};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use walkdir::WalkDir;

use post_filter::builder::CorpusBuilder;
use utils_common::{PostAuthor, PostRecord, PostTag};

// 标签没有声明颜色时使用的中性灰
const DEFAULT_TAG_COLOR: &str = "#9ca3af";

// 主函数
fn main() {
    // 设置命令行参数
    let matches = Command::new("博客语料索引生成器")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Jenyus")
        .about("扫描静态站点输出，生成博客筛选所需的语料索引")
        .arg(
            Arg::new("source")
                .short('s')
                .long("source")
                .value_name("SOURCE_DIR")
                .help("站点构建输出目录路径")
                .required(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("OUTPUT_DIR")
                .help("索引输出目录路径")
                .required(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("显示详细信息")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    // 获取参数值
    let source_dir = matches.get_one::<String>("source").unwrap();
    let output_dir = matches.get_one::<String>("output").unwrap();
    let verbose = matches.get_flag("verbose");

    // 检查目录
    let source_path = Path::new(source_dir);
    if !source_path.exists() || !source_path.is_dir() {
        eprintln!("错误: 源目录不存在或不是有效目录 '{}'", source_dir);
        std::process::exit(1);
    }

    // 创建输出目录
    let output_path = Path::new(output_dir);
    if !output_path.exists() {
        if let Err(e) = fs::create_dir_all(output_path) {
            eprintln!("错误: 无法创建输出目录 '{}': {}", output_dir, e);
            std::process::exit(1);
        }
    }

    println!("开始生成语料索引...");
    println!("源目录: {}", source_dir);
    println!("输出目录: {}", output_dir);

    match generate_corpus(source_dir, output_dir, verbose) {
        Ok(_) => println!("语料索引生成成功！"),
        Err(e) => {
            eprintln!("错误: 语料索引生成失败: {}", e);
            std::process::exit(1);
        }
    }
}

// 生成语料索引的主函数
fn generate_corpus(source_dir: &str, output_dir: &str, verbose: bool) -> Result<(), String> {
    // 记录开始时间
    let start_time = std::time::Instant::now();

    // 扫描HTML文件
    println!("扫描HTML文件...");
    let (posts, skipped_count) = scan_html_files(source_dir, verbose)?;

    let post_count = posts.len();
    println!(
        "扫描完成。找到 {} 篇有效文章，跳过 {} 个文件。",
        post_count, skipped_count
    );

    if post_count == 0 {
        return Err("没有找到有效文章".to_string());
    }

    // 创建语料索引构建器
    let mut builder = CorpusBuilder::new();
    for post in posts {
        builder.add_post(post);
    }

    // 保存索引
    let corpus_index_path = format!("{}/corpus_index.bin", output_dir);
    println!("正在生成和保存语料索引...");
    builder.save_corpus_index(&corpus_index_path)?;

    // 计算耗时
    let elapsed = start_time.elapsed();
    println!("索引生成完成！耗时: {:.2}秒", elapsed.as_secs_f32());

    Ok(())
}

// 扫描HTML文件并提取文章数据
fn scan_html_files(dir_path: &str, verbose: bool) -> Result<(Vec<PostRecord>, usize), String> {
    let mut posts = Vec::new();
    let dir_path = Path::new(dir_path);
    let mut skipped_files = 0;

    // 递归遍历目录
    for entry in WalkDir::new(dir_path) {
        let entry = entry.map_err(|e| format!("遍历目录时出错: {}", e))?;

        // 只处理HTML文件
        if !entry.file_type().is_file()
            || !entry.path().extension().map_or(false, |ext| ext == "html")
        {
            continue;
        }

        // 解析HTML文件
        match extract_post_from_html(entry.path(), dir_path) {
            Ok(Some(post)) => {
                if verbose {
                    println!("收录: {} ({})", post.title, post.url);
                }
                posts.push(post);
            }
            Ok(None) => {
                // 非文章页面或元数据不完整
                skipped_files += 1;
                if verbose {
                    println!("跳过: {}", entry.path().display());
                }
            }
            Err(err) => {
                skipped_files += 1;
                if verbose {
                    eprintln!("解析文件时出错 {}: {}", entry.path().display(), err);
                }
            }
        }
    }

    Ok((posts, skipped_files))
}

// 从HTML文件中提取文章数据
fn extract_post_from_html(file_path: &Path, base_dir: &Path) -> Result<Option<PostRecord>, String> {
    // 跳过已知的非内容文件
    let file_path_str = file_path.to_string_lossy().to_lowercase();
    let is_system_file = file_path_str.contains("/404.html")
        || file_path_str.contains("\\404.html")
        || file_path_str.contains("/robots.txt")
        || file_path_str.contains("/sitemap.xml");
    if is_system_file {
        return Ok(None);
    }

    // 读取文件内容
    let html = fs::read_to_string(file_path)
        .map_err(|e| format!("无法读取文件 {}: {}", file_path.display(), e))?;

    // 计算相对路径作为文章标识符
    let relative_path = file_path
        .strip_prefix(base_dir)
        .map_err(|_| "计算相对路径失败".to_string())?;
    let slug = relative_path
        .with_extension("")
        .to_string_lossy()
        .replace('\\', "/")
        .trim_end_matches("index")
        .trim_end_matches('/')
        .to_string();

    if slug.is_empty() {
        // 站点首页
        return Ok(None);
    }

    post_from_html(&html, &slug)
}

// 从HTML内容中提取文章元数据。
// 博客模板为每篇文章页输出Open Graph article元数据，这里只信任这些标签
fn post_from_html(html: &str, slug: &str) -> Result<Option<PostRecord>, String> {
    // 解析HTML
    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .map_err(|e| format!("解析HTML时出错: {}", e))?;

    // 提取元数据标签，保留重复键
    let meta_pairs = collect_meta_pairs(&dom.document);

    // 只有og:type为article的页面才进入语料
    if meta_first(&meta_pairs, "og:type") != Some("article") {
        return Ok(None);
    }

    // 提取标题：og:title带站点后缀，去掉后缀；再退回<title>和<h1>
    let title = meta_first(&meta_pairs, "og:title")
        .map(strip_site_suffix)
        .map(str::to_string)
        .or_else(|| extract_title_tag(&dom.document).map(|t| strip_site_suffix(&t).to_string()))
        .or_else(|| extract_h1_tag(&dom.document))
        .unwrap_or_default();

    // 主题和作者是筛选的必需字段，缺失则跳过该页面
    let topic = match meta_first(&meta_pairs, "article:section") {
        Some(topic) => topic.to_string(),
        None => return Ok(None),
    };
    let author_name = match meta_first(&meta_pairs, "author") {
        Some(name) => name.to_string(),
        None => return Ok(None),
    };

    if title.is_empty() {
        return Ok(None);
    }

    // 描述
    let description = meta_first(&meta_pairs, "description")
        .or_else(|| meta_first(&meta_pairs, "og:description"))
        .unwrap_or("")
        .to_string();

    // 日期：优先RFC 3339，frontmatter里的纯日期按UTC零点处理
    let date = meta_first(&meta_pairs, "article:published_time")
        .and_then(parse_published_time)
        .unwrap_or_else(Utc::now);

    // 标签：重复的article:tag标签，"名称|颜色"编码
    let tags = meta_all(&meta_pairs, "article:tag")
        .into_iter()
        .map(parse_tag)
        .collect();

    let author = PostAuthor {
        name: author_name,
        website: meta_first(&meta_pairs, "article:author").map(str::to_string),
        tagline: meta_first(&meta_pairs, "author:tagline").map(str::to_string),
        image: None,
    };

    let url = format!("/{}", slug);

    Ok(Some(PostRecord {
        slug: slug.to_string(),
        title,
        description,
        topic,
        tags,
        author,
        date,
        url,
    }))
}

// 去掉标题模板附加的" | 站点名"后缀
fn strip_site_suffix(title: &str) -> &str {
    match title.rsplit_once(" | ") {
        Some((stripped, _)) => stripped,
        None => title,
    }
}

// 解析发布时间，支持RFC 3339和纯日期两种格式
fn parse_published_time(value: &str) -> Option<chrono::DateTime<Utc>> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

// 解析"名称|颜色"编码的标签，颜色缺失时用默认灰
fn parse_tag(value: &str) -> PostTag {
    match value.split_once('|') {
        Some((name, color)) if !color.trim().is_empty() => PostTag {
            name: name.trim().to_string(),
            color: color.trim().to_string(),
        },
        _ => PostTag {
            name: value.trim().to_string(),
            color: DEFAULT_TAG_COLOR.to_string(),
        },
    }
}

// 从DOM中提取元数据标签，name和property属性都识别，重复键全部保留
fn collect_meta_pairs(handle: &Handle) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    collect_meta_pairs_internal(handle, &mut pairs);
    pairs
}

// 递归辅助函数，用于提取元数据标签
fn collect_meta_pairs_internal(handle: &Handle, pairs: &mut Vec<(String, String)>) {
    if let NodeData::Element {
        ref name,
        ref attrs,
        ..
    } = handle.data
    {
        if name.local.as_ref() == "meta" {
            let attrs = attrs.borrow();

            let key = attrs
                .iter()
                .find(|attr| {
                    let local = attr.name.local.as_ref();
                    local == "name" || local == "property"
                })
                .map(|attr| attr.value.to_string());
            let content = attrs
                .iter()
                .find(|attr| attr.name.local.as_ref() == "content")
                .map(|attr| attr.value.to_string());

            if let (Some(key), Some(content)) = (key, content) {
                pairs.push((key, content));
            }
        }
    }

    // 递归处理子节点
    for child in handle.children.borrow().iter() {
        collect_meta_pairs_internal(child, pairs);
    }
}

// 取某个键的第一个值
fn meta_first<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

// 取某个键的全部值
fn meta_all<'a>(pairs: &'a [(String, String)], key: &str) -> Vec<&'a str> {
    pairs
        .iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .collect()
}

// 从DOM中提取<title>标签内容
fn extract_title_tag(handle: &Handle) -> Option<String> {
    if let NodeData::Element { ref name, .. } = handle.data {
        if name.local.as_ref() == "title" {
            let mut text = String::new();
            extract_text_from_node(handle, &mut text);
            return Some(text.trim().to_string());
        }
    }

    // 递归查找
    for child in handle.children.borrow().iter() {
        if let Some(title) = extract_title_tag(child) {
            return Some(title);
        }
    }
    None
}

// 从DOM中提取第一个<h1>标签内容
fn extract_h1_tag(handle: &Handle) -> Option<String> {
    if let NodeData::Element { ref name, .. } = handle.data {
        if name.local.as_ref() == "h1" {
            let mut text = String::new();
            extract_text_from_node(handle, &mut text);
            return Some(text.trim().to_string());
        }
    }

    // 递归查找
    for child in handle.children.borrow().iter() {
        if let Some(h1) = extract_h1_tag(child) {
            return Some(h1);
        }
    }
    None
}

// 从节点提取文本
fn extract_text_from_node(handle: &Handle, text: &mut String) {
    match handle.data {
        NodeData::Text { ref contents } => {
            text.push_str(&contents.borrow());
            text.push(' ');
        }
        _ => {
            // 递归处理子节点
            for child in handle.children.borrow().iter() {
                extract_text_from_node(child, text);
            }
        }
    }
}
