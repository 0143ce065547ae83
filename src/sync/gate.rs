//! 变更门控
//!
//! 记录上一次成功同步内容的 SHA-256 指纹，内容未变时跳过同步。
//! 指纹只在整轮同步成功后提交，失败的一轮不会改变它。

use sha2::{Digest, Sha256};

/// 内容指纹门控
#[derive(Debug, Clone, Default)]
pub struct ChangeGate {
    last: Option<String>,
}

impl ChangeGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// 计算原始字节的 SHA-256（十六进制）
    pub fn fingerprint(raw: &[u8]) -> String {
        let digest = Sha256::digest(raw);
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// 内容与上次提交的不同时返回 true
    pub fn should_sync(&self, raw: &[u8]) -> bool {
        self.last.as_deref() != Some(Self::fingerprint(raw).as_str())
    }

    /// 提交成功同步的内容
    pub fn commit(&mut self, raw: &[u8]) {
        self.last = Some(Self::fingerprint(raw));
    }

    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn last_fingerprint(&self) -> Option<&str> {
        self.last.as_deref()
    }
}
