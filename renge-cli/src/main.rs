//! Renge CLI - コマンドラインインターフェース
//!
//! バイトコード仮想マシンのブレークポイントデバッガ renge のREPLインターフェース。
//! 組み込みのサンプルメソッドに対してブレークポイントを設定し、ワーカー
//! スレッドで実行してトラップの処理を観察できます。

use anyhow::Result;
use clap::Parser;
use renge_core::disasm;
use renge_core::parse::parse_location;
use renge_core::{Command, DebugSession};
use renge_vm::{CompiledMethod, ExecutionContext, Interpreter, MethodBuilder};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use tracing_subscriber::EnvFilter;

/// Renge - Bytecode VM Breakpoint Debugger
#[derive(Parser)]
#[command(name = "renge")]
#[command(version = "0.1.0")]
#[command(about = "Breakpoint debugger for the renge bytecode VM", long_about = None)]
struct Cli {
    /// Enable debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

/// REPLが操作するセッションとサンプルメソッド一式
struct Console {
    session: Arc<DebugSession>,
    methods: HashMap<String, Arc<CompiledMethod>>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    println!("Renge - Bytecode VM Breakpoint Debugger");
    println!("Version 0.1.0");
    println!();

    let console = init_console();
    run_repl(&console)?;

    Ok(())
}

/// セッションを作成し、コントローラループを専用スレッドで起動する
fn init_console() -> Console {
    let session = Arc::new(DebugSession::new());

    // コントローラはデバッグチャネルで待機し続ける。ハンドラの見つからない
    // トラップに遭遇した場合のみエラーで抜ける。
    {
        let session = session.clone();
        thread::spawn(move || {
            if let Err(e) = session.run() {
                eprintln!("Debug session terminated: {}", e);
            }
        });
    }

    let mut methods = HashMap::new();
    for method in sample_methods() {
        methods.insert(method.name().to_string(), method);
    }

    println!("Loaded {} sample methods", methods.len());
    println!("Use 'methods' to list them, 'break <method>:<line>' to set a breakpoint");
    println!();

    Console { session, methods }
}

/// 組み込みのサンプルメソッドを構築する
fn sample_methods() -> Vec<Arc<CompiledMethod>> {
    // 3から0までデクリメントするループ
    let countdown = MethodBuilder::new("countdown")
        .line(1).push(3)
        .line(2).push(1).sub()
        .line(3).dup().jump_if_zero(10)
        .line(4).jump(2)
        .line(5).halt()
        .build();

    // 4 + 5 を計算する直線プログラム
    let pair_sum = MethodBuilder::new("pair_sum")
        .line(1).push(4)
        .line(2).push(5)
        .line(3).add()
        .line(4).halt()
        .build();

    vec![countdown, pair_sum]
}

/// REPLループを実行する
fn run_repl(console: &Console) -> Result<()> {
    println!("Type 'help' for available commands, 'quit' to exit.");
    println!();

    let mut rl = DefaultEditor::new()?;

    loop {
        let readline = rl.readline("(renge) ");
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                rl.add_history_entry(line)?;

                if let Err(e) = handle_command(console, line) {
                    eprintln!("Error: {}", e);
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}

fn handle_command(console: &Console, line: &str) -> Result<()> {
    match Command::parse(line) {
        Some(Command::Help) => print_help(),
        Some(Command::Quit) => handle_quit(),
        Some(Command::Break(loc)) => handle_break(console, &loc)?,
        Some(Command::Rearm(loc)) => handle_rearm(console, &loc)?,
        Some(Command::InfoBreak) => handle_info_break(console),
        Some(Command::Run(name)) => handle_run(console, &name)?,
        Some(Command::Disasm(name)) => handle_disasm(console, &name)?,
        Some(Command::Methods) => handle_methods(console),
        None => {
            println!("Unknown command: {}", line);
            println!("Type 'help' for available commands.");
        }
    }

    Ok(())
}

fn find_method<'a>(console: &'a Console, name: &str) -> Result<&'a Arc<CompiledMethod>> {
    console
        .methods
        .get(name)
        .ok_or_else(|| anyhow::anyhow!("Unknown method '{}' (try 'methods')", name))
}

/// Quitコマンドを処理する
fn handle_quit() {
    println!("Goodbye!");
    std::process::exit(0);
}

/// Breakコマンドを処理する
fn handle_break(console: &Console, loc: &str) -> Result<()> {
    let (method_name, line) = parse_location(loc)?;
    let method = find_method(console, &method_name)?;

    let name = method.name().to_string();
    console.session.on(method, line, move |ctx: &ExecutionContext| -> anyhow::Result<()> {
        let offset = ctx.offset() - 1;
        let line = ctx.method().line_for_offset(offset);
        match line {
            Some(line) => println!("Breakpoint hit in '{}' at 0x{:x} (line {})", name, offset, line),
            None => println!("Breakpoint hit in '{}' at 0x{:x}", name, offset),
        }
        Ok(())
    })?;

    println!("Breakpoint set at {}:{}", method_name, line);
    Ok(())
}

/// Rearmコマンドを処理する
fn handle_rearm(console: &Console, loc: &str) -> Result<()> {
    let (method_name, line) = parse_location(loc)?;
    let method = find_method(console, &method_name)?;

    console.session.rearm(method, line)?;
    println!("Breakpoint re-armed at {}:{}", method_name, line);
    Ok(())
}

/// InfoBreakコマンドを処理する
fn handle_info_break(console: &Console) {
    let breakpoints = console.session.breakpoints();
    if breakpoints.is_empty() {
        println!("No breakpoints set");
        return;
    }

    println!("Breakpoints ({}):", breakpoints.len());
    for (method, offset, armed) in breakpoints {
        let state = if armed { "armed" } else { "disarmed" };
        println!("  {} @ 0x{:x} [{}]", method, offset, state);
    }
}

/// Runコマンドを処理する
///
/// メソッドをワーカースレッドで実行し、完了まで待機します。
/// ブレークポイントのヒットはコントローラスレッド側で報告されます。
fn handle_run(console: &Console, name: &str) -> Result<()> {
    let method = find_method(console, name)?.clone();
    let sink = console.session.attach();

    println!("Running '{}'...", name);

    let worker = thread::spawn(move || {
        let ctx = Arc::new(ExecutionContext::new(method));
        let mut interpreter = Interpreter::new();
        interpreter.set_debugging(sink);
        interpreter.run(&ctx)
    });

    match worker.join() {
        Ok(Ok(Some(value))) => println!("'{}' finished with {}", name, value),
        Ok(Ok(None)) => println!("'{}' finished with empty stack", name),
        Ok(Err(e)) => println!("'{}' failed: {}", name, e),
        Err(_) => println!("'{}' panicked", name),
    }

    Ok(())
}

/// Disasmコマンドを処理する
fn handle_disasm(console: &Console, name: &str) -> Result<()> {
    let method = find_method(console, name)?;

    println!("Disassembly of '{}':", name);
    for entry in disasm::disassemble(method)? {
        match entry.line {
            Some(line) => println!("  0x{:04x}  {:<12} ; line {}", entry.offset, entry.text, line),
            None => println!("  0x{:04x}  {}", entry.offset, entry.text),
        }
    }

    Ok(())
}

/// Methodsコマンドを処理する
fn handle_methods(console: &Console) {
    println!("Methods ({}):", console.methods.len());
    let mut names: Vec<&String> = console.methods.keys().collect();
    names.sort();
    for name in names {
        println!("  {}", name);
    }
}

fn print_help() {
    println!("Available commands:");
    println!();
    println!("  help                  - Show this help message");
    println!("  quit/exit/q           - Exit the debugger");
    println!();
    println!("Debug commands:");
    println!("  break <method>:<line> - Set a breakpoint and arm it");
    println!("  rearm <method>:<line> - Re-arm a breakpoint after it fired");
    println!("  info break            - List breakpoints");
    println!("  run <method>          - Execute a method on a worker thread");
    println!("  disasm <method>       - Disassemble a method's bytecode");
    println!("  methods               - List sample methods");
    println!();
    println!("Examples:");
    println!("  break countdown:2");
    println!("  run countdown");
    println!("  disasm pair_sum");
}
