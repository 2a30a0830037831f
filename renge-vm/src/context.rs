//! 実行コンテキスト

use crate::method::CompiledMethod;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// スレッド1本分の実行状態
///
/// 実行スレッドが所有し、トラップで一時停止している間だけデバッガ側から
/// 参照・書き換えされます。オフセットはフェッチのたびに更新され、
/// デバッガによる巻き戻しは次のフェッチで反映されます。
pub struct ExecutionContext {
    method: Mutex<Arc<CompiledMethod>>,
    offset: AtomicUsize,
}

impl ExecutionContext {
    /// メソッドの先頭を指す実行コンテキストを作成する
    pub fn new(method: Arc<CompiledMethod>) -> Self {
        Self {
            method: Mutex::new(method),
            offset: AtomicUsize::new(0),
        }
    }

    /// 現在実行中のメソッドを取得する
    pub fn method(&self) -> Arc<CompiledMethod> {
        self.method.lock().clone()
    }

    /// 現在実行中のメソッドを切り替える
    pub fn set_method(&self, method: Arc<CompiledMethod>) {
        *self.method.lock() = method;
        self.offset.store(0, Ordering::SeqCst);
    }

    /// 現在の命令オフセットを取得する
    pub fn offset(&self) -> usize {
        self.offset.load(Ordering::SeqCst)
    }

    /// 命令オフセットを設定する
    pub fn set_offset(&self, offset: usize) {
        self.offset.store(offset, Ordering::SeqCst);
    }
}
