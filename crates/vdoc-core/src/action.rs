use serde::{Deserialize, Serialize};

/// The request a virtual document is being resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    Completion,
    Hover,
    SignatureHelp,
    Definition,
    Formatting,
    #[default]
    Other,
}

impl ActionKind {
    /// Actions whose results reference or rewrite the file itself, so a
    /// shared, mutable cache file would be wrong for them.
    pub fn requires_fresh_file(self) -> bool {
        matches!(self, Self::Definition | Self::Formatting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_fresh_file() {
        assert!(ActionKind::Definition.requires_fresh_file());
        assert!(ActionKind::Formatting.requires_fresh_file());
        assert!(!ActionKind::Completion.requires_fresh_file());
        assert!(!ActionKind::Hover.requires_fresh_file());
        assert!(!ActionKind::SignatureHelp.requires_fresh_file());
        assert!(!ActionKind::Other.requires_fresh_file());
    }

    #[test]
    fn test_serde_names() {
        let kind: ActionKind = serde_json::from_str("\"signatureHelp\"").unwrap();
        assert_eq!(kind, ActionKind::SignatureHelp);
        assert_eq!(
            serde_json::to_string(&ActionKind::Definition).unwrap(),
            "\"definition\""
        );
    }
}
