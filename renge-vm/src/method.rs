//! コンパイル済みメソッド表現

use crate::bytecodes::Bytecodes;
use crate::opcode::Opcode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// メソッド識別子
///
/// 作成順にプロセス内で一意な値が割り当てられます。
pub type MethodId = u64;

static NEXT_METHOD_ID: AtomicU64 = AtomicU64::new(1);

/// 行テーブルのエントリ
///
/// 命令1つにつき、その先頭オフセットとソース行の対応を記録します。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEntry {
    pub offset: usize,
    pub line: u32,
}

/// コンパイル済みメソッド
///
/// 命令バッファと行テーブルを所有します。同一性は`MethodId`で判定します。
pub struct CompiledMethod {
    id: MethodId,
    name: String,
    bytecodes: Bytecodes,
    line_table: Vec<LineEntry>,
}

impl CompiledMethod {
    /// コンパイル済みメソッドを作成する
    pub fn new(name: &str, bytes: Vec<u8>, line_table: Vec<LineEntry>) -> Self {
        Self {
            id: NEXT_METHOD_ID.fetch_add(1, Ordering::SeqCst),
            name: name.to_string(),
            bytecodes: Bytecodes::from_bytes(bytes),
            line_table,
        }
    }

    /// メソッドIDを取得する
    pub fn id(&self) -> MethodId {
        self.id
    }

    /// メソッド名を取得する
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 命令バッファを取得する
    pub fn bytecodes(&self) -> &Bytecodes {
        &self.bytecodes
    }

    /// 行テーブルを取得する
    pub fn line_table(&self) -> &[LineEntry] {
        &self.line_table
    }

    /// 指定された行の最初の実行可能な命令オフセットを取得する
    ///
    /// その行に命令が存在しない場合はNoneを返します。
    pub fn first_offset_on_line(&self, line: u32) -> Option<usize> {
        self.line_table
            .iter()
            .find(|entry| entry.line == line)
            .map(|entry| entry.offset)
    }

    /// 命令オフセットに対応するソース行を取得する
    pub fn line_for_offset(&self, offset: usize) -> Option<u32> {
        self.line_table
            .iter()
            .find(|entry| entry.offset == offset)
            .map(|entry| entry.line)
    }
}

/// コンパイル済みメソッドを組み立てるビルダー
///
/// 命令を1つ発行するごとに行テーブルのエントリを記録します。
///
/// # Examples
/// ```
/// use renge_vm::MethodBuilder;
///
/// let method = MethodBuilder::new("pair_sum")
///     .line(1).push(4)
///     .line(2).push(5)
///     .line(3).add()
///     .line(4).halt()
///     .build();
///
/// assert_eq!(method.first_offset_on_line(2), Some(2));
/// ```
pub struct MethodBuilder {
    name: String,
    bytes: Vec<u8>,
    line_table: Vec<LineEntry>,
    current_line: u32,
}

impl MethodBuilder {
    /// ビルダーを作成する。行カーソルは1から始まります。
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            bytes: Vec::new(),
            line_table: Vec::new(),
            current_line: 1,
        }
    }

    /// 以降の命令のソース行を設定する
    pub fn line(mut self, line: u32) -> Self {
        self.current_line = line;
        self
    }

    /// 次に発行する命令のオフセットを取得する
    pub fn next_offset(&self) -> usize {
        self.bytes.len()
    }

    fn emit(&mut self, opcode: Opcode, operand: Option<u8>) {
        self.line_table.push(LineEntry {
            offset: self.bytes.len(),
            line: self.current_line,
        });
        self.bytes.push(opcode as u8);
        if let Some(operand) = operand {
            self.bytes.push(operand);
        }
    }

    pub fn halt(mut self) -> Self {
        self.emit(Opcode::Halt, None);
        self
    }

    pub fn push(mut self, value: u8) -> Self {
        self.emit(Opcode::Push, Some(value));
        self
    }

    pub fn pop(mut self) -> Self {
        self.emit(Opcode::Pop, None);
        self
    }

    pub fn dup(mut self) -> Self {
        self.emit(Opcode::Dup, None);
        self
    }

    pub fn add(mut self) -> Self {
        self.emit(Opcode::Add, None);
        self
    }

    pub fn sub(mut self) -> Self {
        self.emit(Opcode::Sub, None);
        self
    }

    pub fn jump(mut self, target: u8) -> Self {
        self.emit(Opcode::Jump, Some(target));
        self
    }

    pub fn jump_if_zero(mut self, target: u8) -> Self {
        self.emit(Opcode::JumpIfZero, Some(target));
        self
    }

    pub fn nop(mut self) -> Self {
        self.emit(Opcode::Nop, None);
        self
    }

    /// メソッドを構築する
    pub fn build(self) -> Arc<CompiledMethod> {
        Arc::new(CompiledMethod::new(&self.name, self.bytes, self.line_table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_emits_expected_bytes() {
        let method = MethodBuilder::new("sum")
            .line(1).push(4)
            .line(2).push(5)
            .line(3).add()
            .line(4).halt()
            .build();

        assert_eq!(
            method.bytecodes().snapshot(),
            vec![0x01, 4, 0x01, 5, 0x04, 0x00]
        );
        assert_eq!(method.name(), "sum");
    }

    #[test]
    fn test_first_offset_on_line() {
        let method = MethodBuilder::new("sum")
            .line(1).push(4)
            .line(2).push(5).add()
            .line(3).halt()
            .build();

        assert_eq!(method.first_offset_on_line(1), Some(0));
        // 行2の最初の命令はpush(オフセット2)で、同じ行のaddではない
        assert_eq!(method.first_offset_on_line(2), Some(2));
        assert_eq!(method.first_offset_on_line(3), Some(5));
        assert_eq!(method.first_offset_on_line(9999), None);
    }

    #[test]
    fn test_line_for_offset() {
        let method = MethodBuilder::new("sum")
            .line(1).push(4)
            .line(2).halt()
            .build();

        assert_eq!(method.line_for_offset(0), Some(1));
        assert_eq!(method.line_for_offset(2), Some(2));
        // オペランドバイトは命令の先頭ではない
        assert_eq!(method.line_for_offset(1), None);
    }

    #[test]
    fn test_method_ids_are_unique() {
        let a = MethodBuilder::new("a").line(1).halt().build();
        let b = MethodBuilder::new("b").line(1).halt().build();
        assert_ne!(a.id(), b.id());
    }
}
