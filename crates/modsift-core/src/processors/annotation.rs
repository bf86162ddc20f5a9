//! Extraction of `@Mod` annotation fields.

use crate::classfile::{Annotation, ClassVisitor, ElementValue};
use crate::context::ScanContext;
use crate::merge::{append_unique, select_longer};
use crate::metadata::Side;

use super::is_valid_platform_version;

/// A generation of the mod-declaring annotation.
///
/// Each generation was only ever used with a range of platform versions,
/// which narrows version inference once one has been seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModAnnotation {
    /// `Lfml/Mod;`, early 1.2.5 builds
    Legacy,
    /// `Lcpw/mods/fml/common/Mod;`, 1.2.5 to 1.7.10
    Cpw,
    /// `Lnet/minecraftforge/fml/common/Mod;`, 1.8 onwards
    Forge,
}

impl ModAnnotation {
    /// All generations, oldest first
    pub const ALL: [ModAnnotation; 3] = [ModAnnotation::Legacy, ModAnnotation::Cpw, ModAnnotation::Forge];

    /// The annotation type descriptor
    pub fn descriptor(&self) -> &'static str {
        match self {
            ModAnnotation::Legacy => "Lfml/Mod;",
            ModAnnotation::Cpw => "Lcpw/mods/fml/common/Mod;",
            ModAnnotation::Forge => "Lnet/minecraftforge/fml/common/Mod;",
        }
    }

    /// Maps a type descriptor to its generation
    pub fn from_descriptor(descriptor: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.descriptor() == descriptor)
    }

    /// Whether mods using this annotation can target platform `version`.
    ///
    /// Alpha/beta versions and anything that is not a dotted number are
    /// never compatible.
    pub fn accepts_version(&self, version: &str) -> bool {
        if version.starts_with('a') || version.starts_with('b') {
            return false;
        }

        let base = version.split('-').next().unwrap_or(version);
        let parsed: Result<Vec<u32>, _> = base.split('.').map(str::parse::<u32>).collect();
        let Ok(parts) = parsed else {
            return false;
        };
        if parts.len() < 2 || parts[0] != 1 {
            return false;
        }

        let minor = parts[1];
        match self {
            ModAnnotation::Legacy => minor == 2,
            ModAnnotation::Cpw => (2..8).contains(&minor),
            ModAnnotation::Forge => minor >= 8,
        }
    }
}

/// Applies `@Mod` annotation fields to the record
#[derive(Debug, Default, Clone, Copy)]
pub struct ModAnnotationProcessor;

impl ModAnnotationProcessor {
    /// Registers every `require*:<dependency>` item of a `;`-separated list
    fn apply_dependencies(ctx: &mut ScanContext, list: &str) {
        for item in list.split(';') {
            let mut parts: Vec<&str> = item.split(':').collect();
            while parts.last() == Some(&"") {
                parts.pop();
            }
            // ModLoader spelled it "require-", Forge "required-"
            if parts.len() == 2 && parts[0].starts_with("require") {
                ctx.metadata.dependencies.add(parts[1]);
            }
        }
    }
}

impl ClassVisitor<ScanContext> for ModAnnotationProcessor {
    fn visit_annotation(&mut self, ctx: &mut ScanContext, annotation: &Annotation) {
        let Some(generation) = ModAnnotation::from_descriptor(&annotation.descriptor) else {
            return;
        };
        ctx.mod_annotation = Some(generation);
        ctx.metadata.valid = true;

        let text = |name: &str| annotation.get(name).and_then(ElementValue::as_str);

        if let Some(modid) = text("modid") {
            ctx.metadata.modid = Some(modid.to_string());
            append_unique(&mut ctx.metadata.provides, modid.to_string());
        }

        if let Some(name) = text("name") {
            ctx.metadata.name = select_longer(ctx.metadata.name.take(), Some(name.to_string()));
        }

        if let Some(version) = text("version") {
            ctx.add_version_candidate(version);
        }

        if let Some(list) = text("dependencies").or_else(|| text("dependsOn")) {
            Self::apply_dependencies(ctx, list);
        }

        if let Some(platform) = text("acceptedMinecraftVersions") {
            if is_valid_platform_version(platform) {
                ctx.metadata.dependencies.add_platform(platform);
            }
        }

        if let Some(client_only) = annotation.get("clientSideOnly") {
            if client_only.as_bool() == Some(true) {
                ctx.metadata.side = Some(Side::Client);
            }
        } else if annotation.get("serverSideOnly").and_then(ElementValue::as_bool) == Some(true) {
            ctx.metadata.side = Some(Side::Server);
        }
    }
}
