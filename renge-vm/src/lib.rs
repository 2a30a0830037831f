//! Renge 仮想マシンコア
//!
//! このクレートは、デバッグ対象となるバイトコード仮想マシンを提供します。
//! 命令セット、命令バッファ、コンパイル済みメソッド、実行コンテキスト、
//! インタプリタを含みます。

pub mod opcode;
pub mod bytecodes;
pub mod method;
pub mod context;
pub mod interpreter;

pub use opcode::{Opcode, TRAP_OPCODE};
pub use bytecodes::Bytecodes;
pub use method::{CompiledMethod, LineEntry, MethodBuilder, MethodId};
pub use context::ExecutionContext;
pub use interpreter::{Interpreter, TrapSink};

/// 仮想マシン操作の結果型
pub type Result<T> = anyhow::Result<T>;
