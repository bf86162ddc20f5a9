//! Class visitors that extract mod metadata.
//!
//! Each processor is an independent [`ClassVisitor`] over a [`ScanContext`];
//! [`scan_class`] composes them over a single traversal of one class:
//!
//! - [`BaseModProcessor`]: legacy base-class convention
//! - [`ModAnnotationProcessor`]: `@Mod` annotation fields
//! - [`SymbolCollector`]: symbol references for version inference

mod annotation;
mod base_mod;
mod symbols;

use crate::classfile::{ClassFile, ClassVisitor, ReaderOptions};
use crate::context::ScanContext;
use crate::error::Result;

pub use annotation::{ModAnnotation, ModAnnotationProcessor};
pub use base_mod::BaseModProcessor;
pub use symbols::SymbolCollector;

/// Whether a declared platform version is usable.
///
/// Build templates leave placeholders such as `@VERSION@` or `${mcversion}`
/// behind; anything mentioning `ver`/`VER` is rejected.
pub fn is_valid_platform_version(version: &str) -> bool {
    !version.contains("ver") && !version.contains("VER")
}

/// Parses one class and runs every processor over it.
///
/// A parse error leaves `ctx` untouched.
pub fn scan_class(data: &[u8], ctx: &mut ScanContext, collect_symbols: bool) -> Result<()> {
    let options = ReaderOptions::new().skip_code(!collect_symbols);
    let class = ClassFile::parse_with_options(data, &options)?;

    let mut base_mod = BaseModProcessor::default();
    let mut annotation = ModAnnotationProcessor;
    let mut symbols = SymbolCollector::default();

    if collect_symbols {
        class.accept(ctx, &mut [&mut base_mod, &mut annotation, &mut symbols]);
    } else {
        class.accept(ctx, &mut [&mut base_mod, &mut annotation]);
    }
    Ok(())
}
