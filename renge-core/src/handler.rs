//! ブレークポイントハンドラ

use crate::errors::DebugError;
use renge_vm::{CompiledMethod, ExecutionContext, TRAP_OPCODE};
use std::sync::{Arc, Weak};

/// ブレークポイントのコールバック
///
/// 一時停止中のコンテキストを受け取ります。このコールバックの中から
/// 同じセッションのチャネルに対して送受信してはいけません(コントローラ
/// ループへの再入は未定義です)。
pub trait BreakHandler: Send {
    /// ブレークポイントヒット時に呼ばれる
    fn on_break(&mut self, ctx: &ExecutionContext) -> anyhow::Result<()>;
}

impl<F> BreakHandler for F
where
    F: FnMut(&ExecutionContext) -> anyhow::Result<()> + Send,
{
    fn on_break(&mut self, ctx: &ExecutionContext) -> anyhow::Result<()> {
        self(ctx)
    }
}

/// アームされたブレークポイント1つ分の状態
///
/// 対象メソッドへの弱参照、トラップオフセット、アーム時に退避した
/// 元のバイト、ユーザーコールバックを保持します。アーム済みか否かの
/// 状態は退避バイトの有無そのものです。
pub struct BreakpointHandler {
    method: Weak<CompiledMethod>,
    method_name: String,
    offset: usize,
    saved: Option<u8>,
    callback: Box<dyn BreakHandler>,
}

impl BreakpointHandler {
    /// 未アーム状態のハンドラを作成する。命令バッファには触れません。
    pub fn new(
        method: &Arc<CompiledMethod>,
        offset: usize,
        callback: Box<dyn BreakHandler>,
    ) -> Self {
        Self {
            method: Arc::downgrade(method),
            method_name: method.name().to_string(),
            offset,
            saved: None,
            callback,
        }
    }

    /// トラップオフセットを取得する
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// 対象メソッド名を取得する
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// アーム済みかどうか
    pub fn is_armed(&self) -> bool {
        self.saved.is_some()
    }

    fn method(&self) -> Result<Arc<CompiledMethod>, DebugError> {
        self.method
            .upgrade()
            .ok_or(DebugError::MethodDropped { offset: self.offset })
    }

    /// 現在のバイトを退避してトラップ命令を書き込む
    pub fn arm(&mut self) -> Result<(), DebugError> {
        if self.saved.is_some() {
            return Err(DebugError::AlreadyArmed {
                method: self.method_name.clone(),
                offset: self.offset,
            });
        }

        let method = self.method()?;
        let original = method.bytecodes().get_byte(self.offset)?;
        method.bytecodes().set_byte(self.offset, TRAP_OPCODE)?;
        self.saved = Some(original);
        Ok(())
    }

    /// 退避したバイトを書き戻し、コンテキストをトラップ位置まで巻き戻す
    ///
    /// 巻き戻し後のコンテキストは元の命令を再実行します。
    pub fn disarm_and_rewind(&mut self, ctx: &ExecutionContext) -> Result<(), DebugError> {
        let original = self.saved.ok_or(DebugError::NotArmed {
            method: self.method_name.clone(),
            offset: self.offset,
        })?;

        let method = self.method()?;
        method.bytecodes().set_byte(self.offset, original)?;
        self.saved = None;
        ctx.set_offset(self.offset);
        Ok(())
    }

    /// ユーザーコールバックを呼び出す
    pub fn invoke(&mut self, ctx: &ExecutionContext) -> anyhow::Result<()> {
        self.callback.on_break(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use renge_vm::MethodBuilder;

    fn noop_callback() -> Box<dyn BreakHandler> {
        Box::new(|_ctx: &ExecutionContext| -> anyhow::Result<()> { Ok(()) })
    }

    #[test]
    fn test_arm_disarm_roundtrip() {
        let method = MethodBuilder::new("target")
            .line(1).push(7)
            .line(2).halt()
            .build();
        let original = method.bytecodes().get_byte(0).unwrap();

        let mut handler = BreakpointHandler::new(&method, 0, noop_callback());
        assert!(!handler.is_armed());

        handler.arm().unwrap();
        assert!(handler.is_armed());
        assert_eq!(method.bytecodes().get_byte(0).unwrap(), TRAP_OPCODE);

        // トラップ発火直後の状態を作る: オフセットはトラップの1つ先
        let ctx = ExecutionContext::new(method.clone());
        ctx.set_offset(1);

        handler.disarm_and_rewind(&ctx).unwrap();
        assert!(!handler.is_armed());
        assert_eq!(method.bytecodes().get_byte(0).unwrap(), original);
        assert_eq!(ctx.offset(), 0);
    }

    #[test]
    fn test_arm_twice_fails() {
        let method = MethodBuilder::new("target").line(1).halt().build();
        let mut handler = BreakpointHandler::new(&method, 0, noop_callback());

        handler.arm().unwrap();
        let err = handler.arm().unwrap_err();
        assert!(matches!(err, DebugError::AlreadyArmed { .. }));
    }

    #[test]
    fn test_disarm_unarmed_fails() {
        let method = MethodBuilder::new("target").line(1).halt().build();
        let mut handler = BreakpointHandler::new(&method, 0, noop_callback());

        let ctx = ExecutionContext::new(method);
        let err = handler.disarm_and_rewind(&ctx).unwrap_err();
        assert!(matches!(err, DebugError::NotArmed { .. }));
    }

    #[test]
    fn test_arm_after_method_dropped_fails() {
        let method = MethodBuilder::new("target").line(1).halt().build();
        let mut handler = BreakpointHandler::new(&method, 0, noop_callback());
        drop(method);

        let err = handler.arm().unwrap_err();
        assert!(matches!(err, DebugError::MethodDropped { .. }));
    }
}
