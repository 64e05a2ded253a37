use std::path::PathBuf;
use anyhow::{Context, Result};
use clap::Parser;
use boom_remote::config::Config;
use boom_remote::{mdns, Boom, PresetChange};

/// Switch the active preset on a Boom server found on the local network
#[derive(Parser, Debug)]
#[command(name = "boomctl")]
struct Cli {
    /// Preset to activate; without one, list discovered hosts instead
    preset: Option<String>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("boom_remote=info,boomctl=info"))
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            tracing::info!("Loaded config from {}", path.display());
            config
        }
        None => Config::default(),
    };

    let Some(preset) = cli.preset else {
        return list_hosts(&config).await;
    };

    let mut boom = Boom::discover_and_connect(&config)
        .await
        .context("Failed to connect to a Boom server")?;

    let change = boom.set_preset(&preset).await;
    boom.close().await;

    match change.with_context(|| format!("Failed to set preset {}", preset))? {
        PresetChange::NotFound => {
            let names: Vec<_> = boom.state().presets().iter().map(|p| p.name.as_str()).collect();
            anyhow::bail!("no preset named \"{}\", available: {}", preset, names.join(", "))
        }
        PresetChange::AlreadyActive | PresetChange::Requested(_) => Ok(()),
    }
}

/// Scan without connecting and print every host with its filterable attributes
async fn list_hosts(config: &Config) -> Result<()> {
    let discovery = &config.discovery;
    let hosts = mdns::find_hosts(discovery.scan_delay(), discovery.max_wait(), &discovery.filters)
        .await
        .context("Failed to browse for Boom servers")?;

    for host in &hosts {
        println!("{}", host);
        println!("  type    = {}", host.service_type);
        println!("  server  = {}", host.hostname);
        println!("  address = {}", host.address);
        println!("  port    = {}", host.port);
        let mut attributes: Vec<_> = host.attributes.iter().collect();
        attributes.sort();
        for (key, value) in attributes {
            println!("  {} = {}", key, value);
        }
    }

    if hosts.is_empty() {
        anyhow::bail!("no Boom servers found");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_without_preset_lists_hosts() {
        let cli = Cli::try_parse_from(["boomctl", "--config", "boom.toml"]).unwrap();
        assert_eq!(cli.preset, None);
        assert_eq!(cli.config, Some(PathBuf::from("boom.toml")));
    }

    #[test]
    fn test_preset_with_short_config_flag() {
        let cli = Cli::try_parse_from(["boomctl", "Bass Boost", "-c", "boom.toml"]).unwrap();
        assert_eq!(cli.preset.as_deref(), Some("Bass Boost"));
        assert_eq!(cli.config, Some(PathBuf::from("boom.toml")));
    }

    #[test]
    fn test_no_arguments() {
        let cli = Cli::try_parse_from(["boomctl"]).unwrap();
        assert!(cli.preset.is_none() && cli.config.is_none());
    }

    #[test]
    fn test_extra_positional_is_rejected() {
        assert!(Cli::try_parse_from(["boomctl", "Flat", "boom.toml"]).is_err());
    }
}
