//! Config command - show or initialize configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::RestorerResult;

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> RestorerResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> RestorerResult<()> {
    let toml = toml::to_string_pretty(config)?;
    println!("{}", toml);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> RestorerResult<()> {
    let path = manager.path();

    if path.exists() && !force {
        println!("Config already exists at {}", path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    println!("Configuration initialized at {}", path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn init_writes_defaults_into_new_directory() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("restorer").join("config.toml"));

        init_config(&manager, false).await.unwrap();

        let loaded = manager.load().await.unwrap();
        assert_eq!(loaded.platform.api, "0.7");
        assert!(manager.path().exists());
    }

    #[tokio::test]
    async fn init_keeps_existing_config_unless_forced() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[platform]\napi = \"0.9\"\n").unwrap();
        let manager = ConfigManager::with_path(path.clone());

        init_config(&manager, false).await.unwrap();
        assert_eq!(manager.load().await.unwrap().platform.api, "0.9");

        init_config(&manager, true).await.unwrap();
        assert_eq!(manager.load().await.unwrap().platform.api, "0.7");
    }

    #[tokio::test]
    async fn init_reports_unwritable_directory() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let manager = ConfigManager::with_path(blocker.join("config.toml"));

        let err = init_config(&manager, false).await.unwrap_err();
        assert!(matches!(err, crate::error::RestorerError::ConfigDirCreate { .. }));
    }
}
