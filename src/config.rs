//! Programmatic configuration for an embedder (ambient stack; flag/CLI
//! parsing itself remains an external collaborator per spec.md §1).

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DebuggerConfig {
    /// Depth limit passed to `StackWalker::stacktrace`.
    pub max_stack_depth: usize,
    /// Safety cap on how many temporary breakpoints the Next Engine will
    /// install for a single step, guarding against a pathologically large
    /// line table.
    pub max_next_temporaries: usize,
    /// Whether the Stack Walker should keep going (with a warning frame)
    /// when it hits a PC with no debug information, or stop immediately.
    pub truncate_on_foreign_frame: bool,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        DebuggerConfig {
            max_stack_depth: 200,
            max_next_temporaries: 4096,
            truncate_on_foreign_frame: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_bounds() {
        let cfg = DebuggerConfig::default();
        assert!(cfg.max_stack_depth > 0);
        assert!(cfg.max_next_temporaries > 0);
    }
}
