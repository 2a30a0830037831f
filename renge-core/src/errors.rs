//! デバッグサブシステムのエラー型

use renge_vm::MethodId;
use thiserror::Error;

/// ブレークポイント操作とトラップ処理のエラー
///
/// 状態不変条件の違反(`AlreadyArmed`/`NotArmed`)と`UnhandledTrap`は
/// 登録・アームの順序に論理バグがあることを示し、セッションを中断させます。
#[derive(Debug, Error)]
pub enum DebugError {
    /// すでにアームされたハンドラを再度アームしようとした
    #[error("breakpoint at 0x{offset:x} in '{method}' is already armed")]
    AlreadyArmed { method: String, offset: usize },

    /// アームされていないハンドラを解除しようとした
    #[error("breakpoint at 0x{offset:x} in '{method}' is not armed")]
    NotArmed { method: String, offset: usize },

    /// 指定された行に実行可能な命令が存在しない
    #[error("no instruction on line {line} of '{method}'")]
    NoInstructionForLine { method: String, line: u32 },

    /// 指定された位置にブレークポイントが登録されていない
    #[error("no breakpoint registered at 0x{offset:x} in '{method}'")]
    NotRegistered { method: String, offset: usize },

    /// 登録のないオフセットでトラップが発火した
    ///
    /// 命令バッファとレジストリの整合が崩れており、回復手段はありません。
    #[error("trap fired at 0x{offset:x} in method {method} with no registered handler")]
    UnhandledTrap { method: MethodId, offset: usize },

    /// ハンドラの対象メソッドがすでに解放されている
    #[error("method for breakpoint at 0x{offset:x} has been dropped")]
    MethodDropped { offset: usize },

    /// ユーザーコールバックがエラーを返した
    #[error("breakpoint callback failed: {0}")]
    Callback(anyhow::Error),

    /// 命令バッファの読み書きに失敗した
    #[error(transparent)]
    Buffer(#[from] anyhow::Error),
}
