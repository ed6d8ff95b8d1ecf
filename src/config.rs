use std::fs;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::BuilderConfig;
use crate::editor::EditorConfig;
use crate::layout::LayoutConfig;
use crate::llm::LlmConfig;
use crate::session::SessionConfig;

/// Everything tunable, one section per component. Missing sections and
/// fields take their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub builder: BuilderConfig,
    pub layout: LayoutConfig,
    pub editor: EditorConfig,
    pub llm: LlmConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.builder.validate().context("invalid [builder] config")?;
        self.layout.validate().context("invalid [layout] config")?;
        self.editor.validate().context("invalid [editor] config")?;
        self.llm.validate().context("invalid [llm] config")?;
        self.session.validate().context("invalid [session] config")?;
        ensure!(
            (self.layout.hour_height - self.editor.hour_height).abs() < f64::EPSILON,
            "layout.hour_height and editor.hour_height must match"
        );
        Ok(())
    }
}
