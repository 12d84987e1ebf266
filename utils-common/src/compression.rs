use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::io::{self, Read};

/// 魔数常量 - 用于标识语料索引文件格式
pub const MAGIC_BYTES: &'static [u8] = b"JYCMP"; // Jenyus Compressed

/// 文件头长度：魔数 + 2字节版本号 + 4字节原始数据大小
const HEADER_LEN: usize = MAGIC_BYTES.len() + 2 + 4;

/// 将对象序列化为二进制格式
pub fn to_binary<T: serde::Serialize>(obj: &T) -> Result<Vec<u8>, io::Error> {
    // 使用bincode标准配置序列化
    bincode::serde::encode_to_vec(obj, bincode::config::standard())
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("序列化失败: {}", e)))
}

/// 从二进制格式反序列化对象
pub fn from_binary<T: for<'a> serde::de::Deserialize<'a>>(data: &[u8]) -> Result<T, io::Error> {
    bincode::serde::decode_from_slice(data, bincode::config::standard())
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("反序列化失败: {}", e)))
        .map(|(value, _)| value)
}

/// 将对象序列化并压缩为带文件头的二进制格式
pub fn to_compressed<T: serde::Serialize>(obj: &T, version: [u8; 2]) -> Result<Vec<u8>, io::Error> {
    let binary = to_binary(obj)?;

    // 写入文件头：魔数、版本号、原始数据大小
    let mut output = Vec::with_capacity(binary.len() / 2 + HEADER_LEN);
    output.extend_from_slice(MAGIC_BYTES);
    output.extend_from_slice(&version);
    output.extend_from_slice(&(binary.len() as u32).to_le_bytes());

    // 压缩数据体
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    std::io::Write::write_all(&mut encoder, &binary)?;
    let compressed = encoder.finish()?;
    output.extend_from_slice(&compressed);

    Ok(output)
}

/// 从压缩的二进制格式反序列化对象，使用默认最大版本1
pub fn from_compressed<T: for<'a> serde::de::Deserialize<'a>>(data: &[u8]) -> Result<T, io::Error> {
    from_compressed_with_max_version(data, 1)
}

/// 从压缩的二进制格式反序列化对象，允许指定支持的最大主版本号
pub fn from_compressed_with_max_version<T: for<'a> serde::de::Deserialize<'a>>(
    data: &[u8],
    max_version: u8,
) -> Result<T, io::Error> {
    // 检查数据长度是否足够容纳文件头
    if data.len() < HEADER_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("数据太短，无法解析: {} 字节", data.len()),
        ));
    }

    // 验证魔数
    if &data[0..MAGIC_BYTES.len()] != MAGIC_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "无效的文件格式：魔数不匹配",
        ));
    }

    // 读取并验证版本号
    let version_offset = MAGIC_BYTES.len();
    let version = [data[version_offset], data[version_offset + 1]];
    if version[0] > max_version {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("不支持的索引版本: {}.{}", version[0], version[1]),
        ));
    }

    // 读取原始数据大小
    let size_offset = version_offset + 2;
    let mut size_bytes = [0u8; 4];
    size_bytes.copy_from_slice(&data[size_offset..size_offset + 4]);
    let original_size = u32::from_le_bytes(size_bytes) as usize;

    // 解压数据体
    let mut decoder = GzDecoder::new(&data[HEADER_LEN..]);
    let mut decompressed = Vec::with_capacity(original_size);
    decoder.read_to_end(&mut decompressed)?;

    // 校验解压后的数据大小
    if decompressed.len() != original_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "解压后数据大小不匹配: 期望 {} 字节, 实际 {} 字节",
                original_size,
                decompressed.len()
            ),
        ));
    }

    from_binary(&decompressed)
}
