//! 通用工具函数

use rand::RngCore;
use rand::rngs::OsRng;
use uuid::Uuid;

/// 生成新的 UUID v7（时间有序）
pub fn new_id() -> Uuid {
    Uuid::now_v7()
}

/// 生成十六进制编码的随机令牌，`bytes` 为熵的字节数
pub fn random_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}
