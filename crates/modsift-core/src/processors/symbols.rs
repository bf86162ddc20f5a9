//! Collection of symbol references for version inference.

use crate::classfile::{ClassHeader, ClassVisitor, Method, MethodInsn};
use crate::context::ScanContext;
use crate::mapping::{SymbolKey, METHOD_PLACEHOLDER_PREFIX};

/// Records every invoked method, plus declared methods with generated names
#[derive(Debug, Default, Clone)]
pub struct SymbolCollector {
    class_name: String,
}

impl ClassVisitor<ScanContext> for SymbolCollector {
    fn visit_header(&mut self, _ctx: &mut ScanContext, header: &ClassHeader) {
        self.class_name = header.name.clone();
    }

    fn visit_method(&mut self, ctx: &mut ScanContext, method: &Method) {
        // A declared func_ name overrides a game method whose owner we can't map
        if method.name.starts_with(METHOD_PLACEHOLDER_PREFIX) {
            ctx.symbol_keys.insert(SymbolKey::method(
                &format!("{}/{}", self.class_name, method.name),
                &method.descriptor,
            ));
        }
    }

    fn visit_method_insn(&mut self, ctx: &mut ScanContext, insn: &MethodInsn) {
        ctx.symbol_keys.insert(SymbolKey::method(
            &format!("{}/{}", insn.owner, insn.name),
            &insn.descriptor,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::scan_class;
    use crate::test_support::ClassBuilder;

    #[test]
    fn test_collects_invocations_and_overrides() {
        let bytes = ClassBuilder::new("com/acme/BlockAcme")
            .super_class("net/minecraft/block/Block")
            .method("func_149674_a", "(Lnet/minecraft/world/World;III)V", &[])
            .method(
                "tick",
                "()V",
                &[
                    ("net/minecraft/world/World", "func_147439_a", "(III)Lnet/minecraft/block/Block;"),
                    ("com/acme/Util", "helper", "()V"),
                ],
            )
            .build();

        let mut ctx = ScanContext::new();
        scan_class(&bytes, &mut ctx, true).unwrap();

        let mut keys: Vec<&str> = ctx.symbol_keys.iter().map(SymbolKey::as_str).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "M:com/acme/Util/helper:()V",
                "M:func_147439_a:(III)Lnet/minecraft/block/Block;",
                "M:func_149674_a:(Lnet/minecraft/world/World;III)V",
            ]
        );
    }
}
