//! インタプリタ単体の実行テスト

use renge_vm::{CompiledMethod, ExecutionContext, Interpreter, LineEntry, MethodBuilder, TRAP_OPCODE};
use std::sync::Arc;

#[test]
fn test_run_straight_line_program() {
    let method = MethodBuilder::new("pair_sum")
        .line(1).push(4)
        .line(2).push(5)
        .line(3).add()
        .line(4).halt()
        .build();

    let ctx = Arc::new(ExecutionContext::new(method));
    let interpreter = Interpreter::new();

    let result = interpreter.run(&ctx).expect("program should run to halt");
    assert_eq!(result, Some(9));
}

#[test]
fn test_run_countdown_loop() {
    // 3から0までデクリメントするループ
    let method = MethodBuilder::new("countdown")
        .line(1).push(3)
        .line(2).push(1).sub()
        .line(3).dup().jump_if_zero(10)
        .line(4).jump(2)
        .line(5).halt()
        .build();

    let ctx = Arc::new(ExecutionContext::new(method));
    let interpreter = Interpreter::new();

    let result = interpreter.run(&ctx).expect("loop should terminate");
    assert_eq!(result, Some(0));
}

#[test]
fn test_trap_without_debugger_is_an_error() {
    let method = MethodBuilder::new("trapped")
        .line(1).nop()
        .line(2).halt()
        .build();
    method.bytecodes().set_byte(0, TRAP_OPCODE).unwrap();

    let ctx = Arc::new(ExecutionContext::new(method));
    let interpreter = Interpreter::new();

    let err = interpreter.run(&ctx).unwrap_err();
    assert!(err.to_string().contains("no debugger attached"));
}

#[test]
fn test_unknown_opcode_is_an_error() {
    let method = Arc::new(CompiledMethod::new(
        "broken",
        vec![0x7F],
        vec![LineEntry { offset: 0, line: 1 }],
    ));

    let ctx = Arc::new(ExecutionContext::new(method));
    let interpreter = Interpreter::new();

    let err = interpreter.run(&ctx).unwrap_err();
    assert!(err.to_string().contains("Unknown opcode"));
}

#[test]
fn test_stack_underflow_is_an_error() {
    let method = MethodBuilder::new("underflow")
        .line(1).add()
        .line(2).halt()
        .build();

    let ctx = Arc::new(ExecutionContext::new(method));
    let interpreter = Interpreter::new();

    let err = interpreter.run(&ctx).unwrap_err();
    assert!(err.to_string().contains("Stack underflow"));
}
