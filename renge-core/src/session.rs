//! デバッグセッション
//!
//! レジストリとチャネル対を所有するコントローラ。トラップした
//! コンテキストの受信、ハンドラの解決、コールバックの呼び出し、
//! トラップの解除、スレッドの再開までを直列に処理します。

use crate::errors::DebugError;
use crate::handler::{BreakHandler, BreakpointHandler};
use crate::registry::BreakpointRegistry;
use crate::channel::RendezvousChannel;
use parking_lot::Mutex;
use renge_vm::{CompiledMethod, ExecutionContext, MethodId, TrapSink};
use std::sync::Arc;
use tracing::debug;

/// トラップ1件の処理結果
///
/// ハンドラが見つからなかった場合、呼び出し側はこれをセッション致命として
/// 扱う必要があります。命令列にはもう所有者のいないトラップバイトが
/// 残っているためです。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapOutcome {
    /// ハンドラが見つかり、解除と再開まで完了した
    Handled,
    /// 対応するハンドラが登録されていなかった。再開シグナルは送られない
    Unhandled { method: MethodId, offset: usize },
}

/// 実行スレッドに渡すチャネル対
///
/// デバッグチャネルでトラップしたコンテキストをコントローラへ運び、
/// 制御チャネルで再開シグナルを受け取ります。
struct DebugChannels {
    debug_channel: RendezvousChannel<Arc<ExecutionContext>>,
    control_channel: RendezvousChannel<()>,
}

impl TrapSink for DebugChannels {
    fn trap(&self, ctx: &Arc<ExecutionContext>) {
        self.debug_channel.send(ctx.clone());
        self.control_channel.receive();
    }
}

/// デバッグセッション
///
/// 接続された全スレッドが同じチャネル対を共有するため、トラップ処理は
/// 常にこのセッションを通して1件ずつ直列化されます。
pub struct DebugSession {
    channels: Arc<DebugChannels>,
    registry: Mutex<BreakpointRegistry>,
}

impl DebugSession {
    /// セッションを作成する
    pub fn new() -> Self {
        Self {
            channels: Arc::new(DebugChannels {
                debug_channel: RendezvousChannel::new(),
                control_channel: RendezvousChannel::new(),
            }),
            registry: Mutex::new(BreakpointRegistry::new()),
        }
    }

    /// スレッドをこのセッションに接続するためのハンドルを取得する
    ///
    /// `Interpreter::set_debugging`にそのまま渡せます。
    pub fn attach(&self) -> Arc<dyn TrapSink> {
        self.channels.clone()
    }

    /// 行にブレークポイントを登録し、同期的にアームする
    ///
    /// 戻った時点でトラップバイトは書き込まれています。すでに対象
    /// オフセットを通過して実行中のスレッドに対しては発火しません。
    pub fn on<H>(
        &self,
        method: &Arc<CompiledMethod>,
        line: u32,
        callback: H,
    ) -> Result<(), DebugError>
    where
        H: BreakHandler + 'static,
    {
        let offset = method
            .first_offset_on_line(line)
            .ok_or_else(|| DebugError::NoInstructionForLine {
                method: method.name().to_string(),
                line,
            })?;

        let mut registry = self.registry.lock();
        let handler = BreakpointHandler::new(method, offset, Box::new(callback));
        let entry = registry.register(method.id(), offset, handler);
        entry.arm()?;
        debug!("breakpoint armed at 0x{:x} in '{}'", offset, method.name());
        Ok(())
    }

    /// 発火済みのブレークポイントを明示的に再アームする
    pub fn rearm(&self, method: &Arc<CompiledMethod>, line: u32) -> Result<(), DebugError> {
        let offset = method
            .first_offset_on_line(line)
            .ok_or_else(|| DebugError::NoInstructionForLine {
                method: method.name().to_string(),
                line,
            })?;

        let mut registry = self.registry.lock();
        let handler =
            registry
                .get_mut(method.id(), offset)
                .ok_or_else(|| DebugError::NotRegistered {
                    method: method.name().to_string(),
                    offset,
                })?;
        handler.arm()?;
        debug!("breakpoint re-armed at 0x{:x} in '{}'", offset, method.name());
        Ok(())
    }

    /// 登録済みブレークポイントの数を取得する
    pub fn breakpoint_count(&self) -> usize {
        self.registry.lock().count()
    }

    /// 登録済みブレークポイントの (メソッド名, オフセット, アーム状態) 一覧
    pub fn breakpoints(&self) -> Vec<(String, usize, bool)> {
        self.registry
            .lock()
            .all()
            .map(|h| (h.method_name().to_string(), h.offset(), h.is_armed()))
            .collect()
    }

    /// トラップ1件を受信して処理する
    ///
    /// ハンドラが見つからない場合は再開シグナルを送らずに
    /// `TrapOutcome::Unhandled`を返します。コールバックが失敗しても
    /// トラップの解除と再開シグナルの送信は必ず行われます。
    pub fn process_one(&self) -> Result<TrapOutcome, DebugError> {
        let ctx = self.channels.debug_channel.receive();
        let method = ctx.method();
        let trap_offset = ctx.offset().saturating_sub(1);
        debug!(
            "trap received from '{}' at 0x{:x}",
            method.name(),
            trap_offset
        );

        let mut registry = self.registry.lock();
        let Some(handler) = registry.resolve(&ctx) else {
            return Ok(TrapOutcome::Unhandled {
                method: method.id(),
                offset: trap_offset,
            });
        };

        let callback_result = handler.invoke(&ctx);
        let disarm_result = handler.disarm_and_rewind(&ctx);
        drop(registry);

        // バッファの復元が先、再開シグナルが後。この順序によって
        // 再開したスレッドは必ず元の命令を再実行する。
        self.channels.control_channel.send(());
        debug!("released trapped thread");

        disarm_result?;
        callback_result.map_err(DebugError::Callback)?;
        Ok(TrapOutcome::Handled)
    }

    /// トラップを処理し続けるコントローラループ
    ///
    /// ハンドラの見つからないトラップは`UnhandledTrap`として致命扱いし、
    /// ループを抜けます。
    pub fn run(&self) -> Result<(), DebugError> {
        loop {
            match self.process_one()? {
                TrapOutcome::Handled => {}
                TrapOutcome::Unhandled { method, offset } => {
                    return Err(DebugError::UnhandledTrap { method, offset });
                }
            }
        }
    }
}

impl Default for DebugSession {
    fn default() -> Self {
        Self::new()
    }
}
