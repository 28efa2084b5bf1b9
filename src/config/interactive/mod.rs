
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, EmbeddingProvider, OllamaConfig};
use crate::embeddings::OllamaClient;

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!(
        "{}",
        style("🔧 Assessment Recommender Configuration").bold().cyan()
    );
    eprintln!();

    let mut config = load_existing_config(config_dir);

    eprintln!("{}", style("Embedding Provider").bold().yellow());
    configure_provider(&mut config)?;

    if config.embedding.provider == EmbeddingProvider::Ollama {
        eprintln!();
        eprintln!("{}", style("Ollama Configuration").bold().yellow());
        eprintln!("Configure the Ollama instance used to embed the catalog and queries.");
        eprintln!();

        configure_ollama(&mut config.ollama)?;

        eprintln!();
        eprintln!("{}", style("Testing configuration...").yellow());

        if test_ollama_connection(&config.ollama) {
            eprintln!("{}", style("✓ Ollama connection successful!").green());
        } else {
            eprintln!(
                "{}",
                style("⚠ Warning: Could not connect to Ollama").yellow()
            );
            eprintln!("You can continue, but make sure Ollama is running before serving.");
        }
    }

    eprintln!();
    eprintln!("{}", style("Catalog & Server").bold().yellow());
    configure_catalog_and_server(&mut config)?;

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding:").bold().yellow());
    eprintln!(
        "  Provider: {}",
        style(format!("{:?}", config.embedding.provider)).cyan()
    );
    if config.embedding.provider == EmbeddingProvider::Hashing {
        eprintln!("  Dimension: {}", style(config.embedding.dimension).cyan());
    }

    eprintln!();
    eprintln!("{}", style("Ollama Settings:").bold().yellow());
    eprintln!("  Host: {}", style(&config.ollama.host).cyan());
    eprintln!("  Port: {}", style(config.ollama.port).cyan());
    eprintln!("  Model: {}", style(&config.ollama.model).cyan());
    eprintln!("  Batch Size: {}", style(config.ollama.batch_size).cyan());
    match config.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!("{}", style("Recommender:").bold().yellow());
    eprintln!(
        "  Catalog: {}",
        style(config.catalog_path().display()).cyan()
    );
    eprintln!(
        "  Default top_k: {}",
        style(config.recommender.default_top_k).cyan()
    );
    eprintln!(
        "  Balance by category: {}",
        style(config.recommender.balance_by_default).cyan()
    );
    eprintln!(
        "  Expand synonyms: {}",
        style(config.recommender.expand_synonyms).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Server:").bold().yellow());
    match config.server.socket_addr() {
        Ok(addr) => eprintln!("  Bind: {}", style(addr).cyan()),
        Err(e) => eprintln!("  Bind: {} ({})", style("Invalid").red(), e),
    }
    eprintln!(
        "  Traces: {} ({})",
        style(config.logs_dir().join("traces.jsonl").display()).cyan(),
        if config.logging.trace_requests {
            "enabled"
        } else {
            "disabled"
        }
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Config {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            }
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            config
        },
    )
}

fn configure_provider(config: &mut Config) -> Result<()> {
    let providers = &["ollama", "hashing (offline, lexical)"];
    let default_index = match config.embedding.provider {
        EmbeddingProvider::Ollama => 0,
        EmbeddingProvider::Hashing => 1,
    };

    let index = Select::new()
        .with_prompt("Embedding provider")
        .default(default_index)
        .items(providers)
        .interact()?;

    config.embedding.provider = if index == 0 {
        EmbeddingProvider::Ollama
    } else {
        EmbeddingProvider::Hashing
    };

    Ok(())
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let mut draft = ollama.clone();
    draft.set_protocol(protocols[protocol_index].to_string())?;

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(draft.host.clone())
        .validate_with(|input: &String| draft.clone().set_host(input.clone()))
        .interact_text()?;
    draft.set_host(host)?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(draft.port)
        .validate_with(|input: &u16| draft.clone().set_port(*input))
        .interact_text()?;
    draft.set_port(port)?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(draft.model.clone())
        .validate_with(|input: &String| draft.clone().set_model(input.clone()))
        .interact_text()?;
    draft.set_model(model)?;

    let batch_size: u32 = Input::new()
        .with_prompt("Texts per embedding request")
        .default(draft.batch_size)
        .validate_with(|input: &u32| draft.clone().set_batch_size(*input))
        .interact_text()?;
    draft.set_batch_size(batch_size)?;

    *ollama = draft;
    Ok(())
}

fn configure_catalog_and_server(config: &mut Config) -> Result<()> {
    let catalog: String = Input::new()
        .with_prompt("Catalog CSV path")
        .default(config.catalog.path.display().to_string())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Catalog path cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("HTTP server port")
        .default(config.server.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    config.catalog.path = PathBuf::from(catalog.trim());
    config.server.port = port;

    Ok(())
}

fn test_ollama_connection(ollama: &OllamaConfig) -> bool {
    OllamaClient::new(ollama)
        .map(|client| {
            client
                .with_timeout(Duration::from_secs(5))
                .with_retry_attempts(1)
        })
        .and_then(|client| client.model_names())
        .is_ok()
}
