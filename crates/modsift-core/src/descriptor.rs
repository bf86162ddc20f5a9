//! The bundled `mcmod.info` descriptor.
//!
//! Two encodings exist in the wild: an object wrapping a `modList` array,
//! and a bare array of entries. Both decode into a [`Descriptor`].

use serde::{Deserialize, Deserializer};

use crate::context::ScanContext;
use crate::error::Result;
use crate::merge::{append_unique, extend_unique, is_blank, select, select_longer};
use crate::processors::is_valid_platform_version;

/// Identifier template projects ship with and many mods never changed
pub const PLACEHOLDER_MODID: &str = "examplemod";

const BOM: char = '\u{feff}';

/// One mod declared by a descriptor.
///
/// Scalar fields also accept bare numbers and booleans, which hand-written
/// descriptors use for versions (`"version": 2.0`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DescriptorEntry {
    /// Mod identifier
    #[serde(deserialize_with = "lenient_string")]
    pub modid: Option<String>,
    /// Display name
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
    /// Free-form description
    #[serde(deserialize_with = "lenient_string")]
    pub description: Option<String>,
    /// Mod version
    #[serde(deserialize_with = "lenient_string")]
    pub version: Option<String>,
    /// Targeted platform version
    #[serde(deserialize_with = "lenient_string")]
    pub mcversion: Option<String>,
    /// Homepage
    #[serde(deserialize_with = "lenient_string")]
    pub url: Option<String>,
    /// Authors
    #[serde(alias = "authors")]
    pub author_list: Option<Vec<String>>,
    /// Free-form credits line
    #[serde(deserialize_with = "lenient_string")]
    pub credits: Option<String>,
    /// Identifiers of mods that must be present
    pub required_mods: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

/// Reads a string field that may have been written as a number or boolean
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::Text(text) => text,
        Scalar::Number(number) => number.to_string(),
        Scalar::Flag(flag) => flag.to_string(),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Wrapped {
    #[serde(default)]
    mod_list: Option<Vec<DescriptorEntry>>,
}

/// A decoded descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptor {
    /// Declared entries, in file order
    pub entries: Vec<DescriptorEntry>,
}

impl Descriptor {
    /// Decodes either encoding.
    ///
    /// When neither applies, the error from the object encoding is returned.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim_start_matches(BOM);
        match serde_json::from_str::<Wrapped>(text) {
            Ok(wrapped) => Ok(Self {
                entries: wrapped.mod_list.unwrap_or_default(),
            }),
            Err(object_err) => match serde_json::from_str::<Vec<DescriptorEntry>>(text) {
                Ok(entries) => Ok(Self { entries }),
                Err(_) => Err(object_err.into()),
            },
        }
    }

    /// Merges every entry belonging to the record into `ctx`.
    ///
    /// The first usable entry establishes the identifier when none is known
    /// yet; entries for other identifiers are ignored.
    pub fn apply(&self, ctx: &mut ScanContext) {
        for entry in &self.entries {
            let Some(modid) = entry.modid.as_deref() else {
                continue;
            };
            if is_blank(Some(modid)) || modid == PLACEHOLDER_MODID {
                continue;
            }

            if let Some(known) = ctx.metadata.modid.as_deref() {
                if known != modid {
                    continue;
                }
            } else {
                ctx.metadata.modid = Some(modid.to_string());
            }

            let metadata = &mut ctx.metadata;
            metadata.valid = true;
            append_unique(&mut metadata.provides, modid.to_string());
            metadata.name = select_longer(entry.name.clone(), metadata.name.take());
            metadata.description = select(entry.description.clone(), metadata.description.take());
            metadata.homepage = select(entry.url.clone(), metadata.homepage.take());

            if let Some(mcversion) = entry.mcversion.as_deref() {
                if is_valid_platform_version(mcversion) {
                    metadata.dependencies.add_platform(mcversion);
                }
            }
            if let Some(authors) = &entry.author_list {
                extend_unique(&mut metadata.authors, authors.iter().cloned());
            }
            if let Some(credits) = entry.credits.as_deref() {
                if !is_blank(Some(credits)) {
                    append_unique(&mut metadata.authors, credits.to_string());
                }
            }
            for required in entry.required_mods.iter().flatten() {
                if !is_blank(Some(required.as_str())) {
                    metadata.dependencies.add(required);
                }
            }

            if let Some(version) = entry.version.as_deref() {
                ctx.add_version_candidate(version);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Side;
    use pretty_assertions::assert_eq;

    const OBJECT: &str = r#"{
        "modListVersion": 2,
        "modList": [{
            "modid": "acme",
            "name": "Acme",
            "description": "Tools",
            "version": "2.0",
            "mcversion": "1.7.10",
            "url": "https://acme.example",
            "authorList": ["Wile", "Road"],
            "credits": "Road",
            "requiredMods": ["Forge", ""]
        }]
    }"#;

    #[test]
    fn test_parse_object_form() {
        let descriptor = Descriptor::parse(OBJECT).unwrap();
        assert_eq!(descriptor.entries.len(), 1);
        assert_eq!(descriptor.entries[0].mcversion.as_deref(), Some("1.7.10"));
    }

    #[test]
    fn test_parse_list_form_with_bom() {
        let text = "\u{feff}[{\"modid\": \"acme\", \"authors\": [\"Wile\"]}]";
        let descriptor = Descriptor::parse(text).unwrap();
        assert_eq!(
            descriptor.entries[0].author_list,
            Some(vec!["Wile".to_string()])
        );
    }

    #[test]
    fn test_parse_numeric_scalars() {
        let text = r#"[{"modid": "acme", "version": 2.0, "mcversion": "1.7.10", "name": null}]"#;
        let descriptor = Descriptor::parse(text).unwrap();
        let entry = &descriptor.entries[0];
        assert_eq!(entry.version.as_deref(), Some("2.0"));
        assert_eq!(entry.mcversion.as_deref(), Some("1.7.10"));
        assert_eq!(entry.name, None);

        let descriptor = Descriptor::parse(r#"{"modList": [{"modid": "acme", "mcversion": 1.7}]}"#).unwrap();
        assert_eq!(descriptor.entries[0].mcversion.as_deref(), Some("1.7"));
    }

    #[test]
    fn test_parse_garbage_is_error() {
        let err = Descriptor::parse("not json").unwrap_err();
        assert!(err.is_recoverable());
        assert!(Descriptor::parse("{\"modList\": 3}").is_err());
    }

    #[test]
    fn test_apply_entry() {
        let mut ctx = ScanContext::new();
        Descriptor::parse(OBJECT).unwrap().apply(&mut ctx);

        let metadata = &ctx.metadata;
        assert!(metadata.valid);
        assert_eq!(metadata.modid.as_deref(), Some("acme"));
        assert_eq!(metadata.provides, vec!["acme"]);
        assert_eq!(metadata.name.as_deref(), Some("Acme"));
        assert_eq!(metadata.description.as_deref(), Some("Tools"));
        assert_eq!(metadata.homepage.as_deref(), Some("https://acme.example"));
        assert_eq!(metadata.authors, vec!["Wile", "Road"]);
        let deps: Vec<(&str, &str)> = metadata.dependencies.iter().collect();
        assert_eq!(deps, vec![("Forge", "*"), ("minecraft", "1.7.10")]);
        assert_eq!(metadata.side, None::<Side>);
        assert_eq!(ctx.version_candidates, vec!["2.0"]);
    }

    #[test]
    fn test_apply_skips_placeholder_and_foreign_entries() {
        let text = r#"[
            {"modid": "examplemod", "name": "Example Mod"},
            {"modid": "acme", "name": "Acme", "mcversion": "${mcversion}"},
            {"modid": "other", "name": "Other"}
        ]"#;
        let mut ctx = ScanContext::new();
        Descriptor::parse(text).unwrap().apply(&mut ctx);

        assert_eq!(ctx.metadata.modid.as_deref(), Some("acme"));
        assert_eq!(ctx.metadata.name.as_deref(), Some("Acme"));
        assert!(ctx.metadata.dependencies.is_empty());
    }

    #[test]
    fn test_apply_keeps_longer_name() {
        let mut ctx = ScanContext::new();
        ctx.metadata.modid = Some("acme".into());
        ctx.metadata.name = Some("Acme Industries".into());
        Descriptor::parse(r#"[{"modid": "acme", "name": "Acme"}]"#)
            .unwrap()
            .apply(&mut ctx);
        assert_eq!(ctx.metadata.name.as_deref(), Some("Acme Industries"));
    }
}
