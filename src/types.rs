/// Serializable output types for the `options` listing.
///
/// Decoupled from the registry's `&'static` descriptors so the listing can be
/// written as JSON or rendered as a table.
use serde::Serialize;

use crate::cli::surface::ExposedOption;
use crate::engine::{FormattingMode, OptionValue};

/// One exposed formatting option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionInfoOutput {
    /// Engine option name (e.g., "expandCommaLists").
    pub name: String,
    /// Long flag as typed on the command line (e.g., "--no-expandCommaLists").
    pub flag: String,
    /// Short flag, or null.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
    /// "bool", "int", "string" or "enum".
    pub kind: &'static str,
    /// Value the engine uses when the flag is absent.
    pub default: OptionValue,
    /// Modes the option applies to.
    pub modes: Vec<FormattingMode>,
    pub description: String,
}

impl From<&ExposedOption> for OptionInfoOutput {
    fn from(opt: &ExposedOption) -> Self {
        let d = opt.descriptor;
        Self {
            name: d.name.to_owned(),
            flag: format!("--{}", opt.long()),
            short: opt.short().map(|c| format!("-{c}")),
            kind: d.kind.as_str(),
            default: d.default.to_value(),
            modes: d.modes.to_vec(),
            description: d.description.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::surface::Surface;
    use crate::cli::whitelist::WHITELIST;
    use crate::engine::OPTION_REFERENCE;

    fn info(name: &str) -> OptionInfoOutput {
        let surface = Surface::new(OPTION_REFERENCE, WHITELIST);
        let opt = surface
            .exposed()
            .iter()
            .find(|o| o.descriptor.name == name)
            .unwrap();
        OptionInfoOutput::from(opt)
    }

    #[test]
    fn test_negated_flag_info() {
        let i = info("expandCommaLists");
        assert_eq!(i.flag, "--no-expandCommaLists");
        assert_eq!(i.short.as_deref(), Some("-C"));
        assert_eq!(i.default, OptionValue::Bool(true));
        assert_eq!(i.modes, vec![FormattingMode::Standard]);
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(info("spacesPerTab")).unwrap();
        assert_eq!(json["flag"], "--spacesPerTab");
        assert_eq!(json["short"], "-s");
        assert_eq!(json["kind"], "int");
        assert_eq!(json["default"], 4);
        assert_eq!(json["modes"][0], "standard");
    }

    #[test]
    fn test_short_omitted_when_absent() {
        let json = serde_json::to_value(info("preserveComments")).unwrap();
        assert!(json.get("short").is_none());
        assert_eq!(json["modes"][0], "obfuscation");
    }
}
