//! 2本のワーカースレッドがそれぞれブレークポイントを踏むサンプルプログラム
//! このプログラムを実行することで、単一のコントローラによるトラップ処理の
//! 直列化と、元の命令の復元・再実行を観察できます。

use anyhow::Result;
use renge_core::DebugSession;
use renge_vm::{CompiledMethod, ExecutionContext, Interpreter, MethodBuilder};
use std::sync::Arc;
use std::thread;

/// nから0までデクリメントするループを持つメソッドを構築する
fn counter_method(name: &str, start: u8) -> Arc<CompiledMethod> {
    MethodBuilder::new(name)
        .line(1).push(start)
        .line(2).push(1).sub()
        .line(3).dup().jump_if_zero(10)
        .line(4).jump(2)
        .line(5).halt()
        .build()
}

fn main() -> Result<()> {
    let session = Arc::new(DebugSession::new());

    let left = counter_method("left_counter", 3);
    let right = counter_method("right_counter", 5);

    // 各メソッドのループ本体(行2)にブレークポイントを設定する
    for method in [&left, &right] {
        let name = method.name().to_string();
        session.on(method, 2, move |ctx: &ExecutionContext| -> Result<()> {
            println!("break: '{}' paused at 0x{:x}", name, ctx.offset() - 1);
            Ok(())
        })?;
    }

    // コントローラは専用スレッドでトラップを1件ずつ処理する
    let controller = {
        let session = session.clone();
        thread::spawn(move || {
            for _ in 0..2 {
                session
                    .process_one()
                    .expect("trap handling should succeed");
            }
        })
    };

    let mut workers = Vec::new();
    for method in [left, right] {
        let sink = session.attach();
        workers.push(thread::spawn(move || {
            let name = method.name().to_string();
            let ctx = Arc::new(ExecutionContext::new(method));
            let mut interpreter = Interpreter::new();
            interpreter.set_debugging(sink);
            let result = interpreter.run(&ctx);
            (name, result)
        }));
    }

    for worker in workers {
        let (name, result) = worker.join().expect("worker should not panic");
        println!("done: '{}' -> {:?}", name, result?);
    }

    controller.join().expect("controller should not panic");
    Ok(())
}
