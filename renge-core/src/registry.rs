//! ブレークポイントレジストリ

use crate::handler::BreakpointHandler;
use renge_vm::{ExecutionContext, MethodId};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// (メソッド, オフセット) からハンドラへの対応表
///
/// セッションが排他的に所有します。エントリの削除は提供しません。
/// 解除済みのハンドラはトラップバイトが消えているため二度と一致しません。
pub struct BreakpointRegistry {
    handlers: HashMap<(MethodId, usize), BreakpointHandler>,
}

impl BreakpointRegistry {
    /// 空のレジストリを作成する
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// ハンドラを登録する
    ///
    /// 同じキーへの再登録は既存のエントリを置き換えます。
    pub fn register(
        &mut self,
        method: MethodId,
        offset: usize,
        handler: BreakpointHandler,
    ) -> &mut BreakpointHandler {
        match self.handlers.entry((method, offset)) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(handler);
                occupied.into_mut()
            }
            Entry::Vacant(vacant) => vacant.insert(handler),
        }
    }

    /// トラップしたコンテキストからハンドラを解決する
    ///
    /// フェッチ済みのオフセットはトラップ命令の1つ先を指しているため、
    /// 実際のトラップ位置は `offset - 1` として引きます。
    pub fn resolve(&mut self, ctx: &ExecutionContext) -> Option<&mut BreakpointHandler> {
        let trap_offset = ctx.offset().checked_sub(1)?;
        self.handlers.get_mut(&(ctx.method().id(), trap_offset))
    }

    /// キー指定でハンドラを取得する
    pub fn get_mut(&mut self, method: MethodId, offset: usize) -> Option<&mut BreakpointHandler> {
        self.handlers.get_mut(&(method, offset))
    }

    /// 全てのハンドラを取得する
    pub fn all(&self) -> impl Iterator<Item = &BreakpointHandler> {
        self.handlers.values()
    }

    /// 登録数を取得する
    pub fn count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for BreakpointRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use renge_vm::{ExecutionContext, MethodBuilder};

    fn noop() -> Box<dyn crate::handler::BreakHandler> {
        Box::new(|_ctx: &ExecutionContext| -> anyhow::Result<()> { Ok(()) })
    }

    #[test]
    fn test_resolve_uses_offset_minus_one() {
        let method = MethodBuilder::new("target")
            .line(1).push(1)
            .line(2).halt()
            .build();

        let mut registry = BreakpointRegistry::new();
        registry.register(method.id(), 2, BreakpointHandler::new(&method, 2, noop()));

        let ctx = ExecutionContext::new(method);
        // トラップ発火直後: オフセットはトラップ位置+1
        ctx.set_offset(3);
        let handler = registry.resolve(&ctx).expect("handler should resolve");
        assert_eq!(handler.offset(), 2);

        // 別のオフセットでは一致しない
        ctx.set_offset(2);
        assert!(registry.resolve(&ctx).is_none());

        // オフセット0はトラップ直後の値としてあり得ない
        ctx.set_offset(0);
        assert!(registry.resolve(&ctx).is_none());
    }

    #[test]
    fn test_reregistration_replaces() {
        let method = MethodBuilder::new("target").line(1).halt().build();

        let mut registry = BreakpointRegistry::new();
        registry.register(method.id(), 0, BreakpointHandler::new(&method, 0, noop()));

        let mut replacement = BreakpointHandler::new(&method, 0, noop());
        replacement.arm().unwrap();
        registry.register(method.id(), 0, replacement);

        assert_eq!(registry.count(), 1);
        let handler = registry.get_mut(method.id(), 0).unwrap();
        assert!(handler.is_armed());
    }
}
