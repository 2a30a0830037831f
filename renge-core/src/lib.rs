//! Renge デバッグコア
//!
//! このクレートは、仮想マシンのブレークポイントとデバッグイベント同期の
//! 中核ロジックを提供します。ブレークポイントのアーム・解除、トラップした
//! コンテキストとコントローラの間のランデブー、セッションループを統合します。

pub mod errors;
pub mod channel;
pub mod handler;
pub mod registry;
pub mod session;
pub mod command;
pub mod parse;
pub mod disasm;

pub use errors::DebugError;
pub use channel::RendezvousChannel;
pub use handler::{BreakHandler, BreakpointHandler};
pub use registry::BreakpointRegistry;
pub use session::{DebugSession, TrapOutcome};
pub use command::Command;

// 他のクレートから使用するために再エクスポート
pub use renge_vm::{CompiledMethod, ExecutionContext, Interpreter, MethodBuilder, TrapSink};

/// デバッグコアの結果型
pub type Result<T> = anyhow::Result<T>;
