//! 命令バッファ

use crate::Result;
use std::sync::atomic::{AtomicU8, Ordering};

/// コンパイル済みメソッドの命令バッファ
///
/// デバッガは実行中のスレッドがフェッチしている最中に単一バイトを
/// 書き換えるため、各バイトをアトミックに保持します。書き換えの順序
/// 自体はランデブープロトコルによって直列化されます。
pub struct Bytecodes {
    bytes: Vec<AtomicU8>,
}

impl Bytecodes {
    /// バイト列から命令バッファを作成する
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into_iter().map(AtomicU8::new).collect(),
        }
    }

    /// バッファの長さを取得する
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// バッファが空かどうか
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 指定されたオフセットのバイトを読み取る
    pub fn get_byte(&self, offset: usize) -> Result<u8> {
        let cell = self.bytes.get(offset).ok_or_else(|| {
            anyhow::anyhow!(
                "Instruction offset 0x{:x} out of range (buffer size: {})",
                offset,
                self.bytes.len()
            )
        })?;
        Ok(cell.load(Ordering::SeqCst))
    }

    /// 指定されたオフセットにバイトを書き込む
    pub fn set_byte(&self, offset: usize, byte: u8) -> Result<()> {
        let cell = self.bytes.get(offset).ok_or_else(|| {
            anyhow::anyhow!(
                "Instruction offset 0x{:x} out of range (buffer size: {})",
                offset,
                self.bytes.len()
            )
        })?;
        cell.store(byte, Ordering::SeqCst);
        Ok(())
    }

    /// バッファ全体のスナップショットを取得する
    pub fn snapshot(&self) -> Vec<u8> {
        self.bytes.iter().map(|b| b.load(Ordering::SeqCst)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_byte() {
        let bytecodes = Bytecodes::from_bytes(vec![0x01, 0x02, 0x03]);
        assert_eq!(bytecodes.get_byte(1).unwrap(), 0x02);

        bytecodes.set_byte(1, 0xCC).unwrap();
        assert_eq!(bytecodes.get_byte(1).unwrap(), 0xCC);
        assert_eq!(bytecodes.snapshot(), vec![0x01, 0xCC, 0x03]);
    }

    #[test]
    fn test_out_of_range() {
        let bytecodes = Bytecodes::from_bytes(vec![0x01]);
        assert!(bytecodes.get_byte(1).is_err());
        assert!(bytecodes.set_byte(5, 0x00).is_err());
    }
}
