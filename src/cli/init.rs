//! Init command implementation

use std::path::PathBuf;

use colored::Colorize;

use crate::cli::args::GlobalOptions;
use crate::config::Config;
use crate::error::{ConfigError, Result};

/// Write a default configuration file
pub fn run(opts: &GlobalOptions, force: bool) -> Result<()> {
    let path = match opts.config_ref() {
        Some(path) => PathBuf::from(path),
        None => Config::default_path()?,
    };

    if path.exists() && !force {
        return Err(ConfigError::SaveError(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ))
        .into());
    }

    let mut config = Config::default();
    config.tenant_id = opts.tenant.clone();
    config.api_host = opts.api_host.clone();
    config.save_to(path.clone())?;

    println!(
        "{} Wrote configuration to {}",
        "✓".green(),
        path.display().to_string().cyan()
    );
    println!("  → Add api_token and tenant_id to use 'journeyvault fetch'");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn opts_for(path: &std::path::Path) -> GlobalOptions {
        GlobalOptions {
            config: Some(path.to_string_lossy().to_string()),
            tenant: Some("1964".to_string()),
            ..GlobalOptions::default()
        }
    }

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");

        run(&opts_for(&path), false).unwrap();

        let config = Config::load_from(path).unwrap();
        assert_eq!(config.tenant_id.as_deref(), Some("1964"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_init_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "tenant_id: \"1\"\n").unwrap();

        assert!(run(&opts_for(&path), false).is_err());
        run(&opts_for(&path), true).unwrap();
        let config = Config::load_from(path).unwrap();
        assert_eq!(config.tenant_id.as_deref(), Some("1964"));
    }
}
