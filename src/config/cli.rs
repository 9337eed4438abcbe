use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "xray-ddx")]
#[command(about = "Differential diagnosis assistant for uploaded medical images")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "xray-ddx.toml")]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Override the model name from config
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Override the relevance gate setting from config
    #[arg(long, global = true)]
    pub relevance_gate: Option<bool>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Serve the upload form
    Serve {
        /// Address to listen on, overrides server.listen_addr
        #[arg(long)]
        listen_addr: Option<String>,
    },
    /// Analyze a single image file and print the result
    Analyze {
        /// JPEG or PNG image
        image: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

impl CliConfig {
    /// 套用命令列覆蓋設定
    pub fn apply_overrides(&self, config: &mut super::AppConfig) {
        if let Some(model) = &self.model {
            config.model.name = model.clone();
            tracing::info!("🔧 Model overridden to: {}", model);
        }
        if let Some(gate) = self.relevance_gate {
            config.pipeline.relevance_gate = gate;
            tracing::info!("🔧 Relevance gate overridden to: {}", gate);
        }
        if let Command::Serve {
            listen_addr: Some(addr),
        } = &self.command
        {
            config.server.listen_addr = addr.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_overrides_are_applied() {
        let cli = CliConfig::parse_from([
            "xray-ddx",
            "--model",
            "gpt-4o-mini",
            "--relevance-gate",
            "false",
            "serve",
            "--listen-addr",
            "0.0.0.0:8080",
        ]);
        let mut config = AppConfig::from_toml_str("[model]\napi_key = \"sk-test\"\n").unwrap();

        cli.apply_overrides(&mut config);

        assert_eq!(config.model.name, "gpt-4o-mini");
        assert!(!config.pipeline.relevance_gate);
        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_analyze_subcommand() {
        let cli = CliConfig::parse_from(["xray-ddx", "analyze", "scan.png", "--json"]);
        match cli.command {
            Command::Analyze { image, json } => {
                assert_eq!(image, PathBuf::from("scan.png"));
                assert!(json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
