//! Detection of mods built on the legacy `BaseMod` convention.
//!
//! Such mods declare nothing but their superclass. The class's simple name
//! stands in for both identifier and display name, unless the class
//! overrides `getName`, in which case the real name is only known at runtime.

use crate::classfile::{ClassHeader, ClassVisitor, Method};
use crate::context::ScanContext;
use crate::merge::select;

const BASE_MOD_SUFFIXES: &[&str] = &["BaseMod", "BaseModMp"];
const NETWORK_MOD: &str = "forge/NetworkMod";
const NAME_METHOD: &str = "getName";

/// Whether `super_name` is one of the legacy mod base classes
fn is_base_mod(super_name: &str) -> bool {
    BASE_MOD_SUFFIXES.iter().any(|s| super_name.ends_with(s)) || super_name == NETWORK_MOD
}

/// Infers identity from a legacy base class
#[derive(Debug, Default, Clone)]
pub struct BaseModProcessor {
    simple_name: Option<String>,
}

impl ClassVisitor<ScanContext> for BaseModProcessor {
    fn visit_header(&mut self, ctx: &mut ScanContext, header: &ClassHeader) {
        if header.super_name.as_deref().map_or(false, is_base_mod) {
            self.simple_name = Some(header.simple_name().to_string());
            ctx.metadata.valid = true;
        }
    }

    fn visit_method(&mut self, _ctx: &mut ScanContext, method: &Method) {
        if method.name == NAME_METHOD {
            self.simple_name = None;
        }
    }

    fn visit_end(&mut self, ctx: &mut ScanContext) {
        if let Some(simple_name) = self.simple_name.take() {
            let name = select(ctx.metadata.name.take(), Some(simple_name));
            // A declared identifier is never replaced by a name
            if ctx.metadata.modid.is_none() {
                ctx.metadata.modid = name.clone();
            }
            ctx.metadata.name = name;
        }
    }
}
