pub mod compression;
pub mod models;

// 重新导出常用类型和函数，方便直接使用
pub use compression::{from_binary, from_compressed, from_compressed_with_max_version, to_binary, to_compressed};
pub use models::{PostAuthor, PostRecord, PostTag};
