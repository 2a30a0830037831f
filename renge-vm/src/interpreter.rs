//! バイトコードインタプリタ

use crate::context::ExecutionContext;
use crate::method::CompiledMethod;
use crate::opcode::{Opcode, TRAP_OPCODE};
use crate::Result;
use std::sync::Arc;

/// トラップ命令のフェッチをデバッガに通知するシンク
///
/// デバッガ側が実装します。`trap`の呼び出しはコンテキストを引き渡し、
/// デバッガが再開を許可するまでブロックします。呼び出し時点で
/// コンテキストのオフセットはトラップ命令の1つ先を指しています。
pub trait TrapSink: Send + Sync {
    /// トラップを通知し、再開シグナルを受け取るまで待機する
    fn trap(&self, ctx: &Arc<ExecutionContext>);
}

/// バイトコードインタプリタ
///
/// 1本のスレッド上で実行コンテキストをHalt命令まで実行します。
/// デバッガが接続されている場合、トラップバイトのフェッチで
/// 実行を中断してコンテキストを引き渡します。
pub struct Interpreter {
    debug: Option<Arc<dyn TrapSink>>,
}

impl Interpreter {
    /// インタプリタを作成する
    pub fn new() -> Self {
        Self { debug: None }
    }

    /// デバッガを接続する
    pub fn set_debugging(&mut self, sink: Arc<dyn TrapSink>) {
        self.debug = Some(sink);
    }

    /// デバッガを切り離す
    pub fn clear_debugging(&mut self) {
        self.debug = None;
    }

    /// コンテキストをHalt命令まで実行し、スタックトップを返す
    pub fn run(&self, ctx: &Arc<ExecutionContext>) -> Result<Option<i64>> {
        let mut stack: Vec<i64> = Vec::new();

        loop {
            let method = ctx.method();
            let offset = ctx.offset();
            let byte = method.bytecodes().get_byte(offset)?;
            // フェッチでオフセットを1進める。トラップ時にはすでに
            // トラップ位置+1を指していることになる。
            ctx.set_offset(offset + 1);

            if byte == TRAP_OPCODE {
                let Some(sink) = &self.debug else {
                    return Err(anyhow::anyhow!(
                        "Trap instruction at 0x{:x} in '{}' but no debugger attached",
                        offset,
                        method.name()
                    ));
                };
                sink.trap(ctx);
                // 再開後はデバッガが巻き戻したオフセットから続行する
                continue;
            }

            let Some(opcode) = Opcode::from_byte(byte) else {
                return Err(anyhow::anyhow!(
                    "Unknown opcode 0x{:02x} at 0x{:x} in '{}'",
                    byte,
                    offset,
                    method.name()
                ));
            };

            match opcode {
                Opcode::Halt => return Ok(stack.last().copied()),
                Opcode::Push => {
                    let value = Self::fetch_operand(ctx, &method)?;
                    stack.push(value as i64);
                }
                Opcode::Pop => {
                    Self::pop_value(&mut stack, &method, offset)?;
                }
                Opcode::Dup => {
                    let top = *stack.last().ok_or_else(|| {
                        anyhow::anyhow!(
                            "Stack underflow at 0x{:x} in '{}'",
                            offset,
                            method.name()
                        )
                    })?;
                    stack.push(top);
                }
                Opcode::Add => {
                    let b = Self::pop_value(&mut stack, &method, offset)?;
                    let a = Self::pop_value(&mut stack, &method, offset)?;
                    stack.push(a + b);
                }
                Opcode::Sub => {
                    let b = Self::pop_value(&mut stack, &method, offset)?;
                    let a = Self::pop_value(&mut stack, &method, offset)?;
                    stack.push(a - b);
                }
                Opcode::Jump => {
                    let target = Self::fetch_operand(ctx, &method)?;
                    ctx.set_offset(target as usize);
                }
                Opcode::JumpIfZero => {
                    let target = Self::fetch_operand(ctx, &method)?;
                    let value = Self::pop_value(&mut stack, &method, offset)?;
                    if value == 0 {
                        ctx.set_offset(target as usize);
                    }
                }
                Opcode::Nop => {}
            }
        }
    }

    /// 現在のオフセットからオペランド1バイトを読み取り、オフセットを進める
    fn fetch_operand(ctx: &ExecutionContext, method: &CompiledMethod) -> Result<u8> {
        let offset = ctx.offset();
        let operand = method.bytecodes().get_byte(offset)?;
        ctx.set_offset(offset + 1);
        Ok(operand)
    }

    fn pop_value(stack: &mut Vec<i64>, method: &CompiledMethod, offset: usize) -> Result<i64> {
        stack.pop().ok_or_else(|| {
            anyhow::anyhow!("Stack underflow at 0x{:x} in '{}'", offset, method.name())
        })
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
