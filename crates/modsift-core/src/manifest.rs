//! The `META-INF/MANIFEST.MF` entry.

use crate::context::ScanContext;

/// Attribute naming a loading plugin that runs before regular mods
pub const CORE_PLUGIN_DIRECTIVE: &str = "FMLCorePlugin:";

/// Returns true if any line declares a core plugin
pub fn has_core_plugin(text: &str) -> bool {
    text.lines().any(|line| line.starts_with(CORE_PLUGIN_DIRECTIVE))
}

/// Flags the record when the manifest declares a core plugin
pub fn apply(ctx: &mut ScanContext, text: &str) {
    if has_core_plugin(text) {
        ctx.metadata.has_coremod = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_plugin_detection() {
        let manifest = "Manifest-Version: 1.0\r\nFMLCorePlugin: com.acme.Plugin\r\n";
        assert!(has_core_plugin(manifest));
        assert!(!has_core_plugin("Manifest-Version: 1.0\n FMLCorePlugin: indented\n"));
    }

    #[test]
    fn test_apply_never_clears_flag() {
        let mut ctx = ScanContext::new();
        apply(&mut ctx, "FMLCorePlugin: a.B\n");
        apply(&mut ctx, "Manifest-Version: 1.0\n");
        assert!(ctx.metadata.has_coremod);
        assert!(!ctx.metadata.valid);
    }
}
