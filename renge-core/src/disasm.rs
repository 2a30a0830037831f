//! 逆アセンブル機能

use crate::Result;
use renge_vm::{CompiledMethod, Opcode, TRAP_OPCODE};

/// 1命令分の逆アセンブル結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisasmLine {
    pub offset: usize,
    pub line: Option<u32>,
    pub text: String,
}

/// メソッドの現在の命令バッファを逆アセンブルする
///
/// アーム中のトラップバイトは "trap" として表示されます。
pub fn disassemble(method: &CompiledMethod) -> Result<Vec<DisasmLine>> {
    let bytes = method.bytecodes().snapshot();
    let mut result = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let byte = bytes[offset];

        if byte == TRAP_OPCODE {
            result.push(DisasmLine {
                offset,
                line: method.line_for_offset(offset),
                text: "trap".to_string(),
            });
            offset += 1;
            continue;
        }

        let opcode = Opcode::from_byte(byte).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown opcode 0x{:02x} at 0x{:x} in '{}'",
                byte,
                offset,
                method.name()
            )
        })?;

        let text = if opcode.operand_count() == 1 {
            let operand = bytes.get(offset + 1).ok_or_else(|| {
                anyhow::anyhow!(
                    "Truncated operand for '{}' at 0x{:x} in '{}'",
                    opcode.mnemonic(),
                    offset,
                    method.name()
                )
            })?;
            format!("{} {}", opcode.mnemonic(), operand)
        } else {
            opcode.mnemonic().to_string()
        };

        result.push(DisasmLine {
            offset,
            line: method.line_for_offset(offset),
            text,
        });
        offset += 1 + opcode.operand_count();
    }

    Ok(result)
}
