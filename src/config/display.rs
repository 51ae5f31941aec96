use console::style;

use super::Config;

/// Print the effective configuration to stderr with credentials masked
#[inline]
pub fn show_config(config: &Config) {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Model API:").bold().yellow());
    eprintln!("  Base URL: {}", style(&config.openai.base_url).cyan());
    eprintln!(
        "  API Key: {}",
        style(mask_secret(config.openai.api_key.as_deref())).cyan()
    );
    eprintln!(
        "  Embedding Model: {}",
        style(&config.openai.embedding_model).cyan()
    );
    eprintln!(
        "  Embedding Dimension: {}",
        style(config.openai.embedding_dimension).cyan()
    );
    eprintln!("  Chat Model: {}", style(&config.openai.chat_model).cyan());

    eprintln!();
    eprintln!("{}", style("Vector Store:").bold().yellow());
    match config.qdrant.qdrant_url() {
        Ok(url) => eprintln!("  URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  URL: {} ({})", style("Invalid").red(), e),
    }
    eprintln!(
        "  API Key: {}",
        style(mask_secret(config.qdrant.api_key.as_deref())).cyan()
    );
    eprintln!(
        "  Collection: {}",
        style(&config.qdrant.collection_name).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Server:").bold().yellow());
    eprintln!("  Bind: {}", style(config.server.bind_address()).cyan());
    eprintln!(
        "  CORS Origins: {}",
        style(config.server.cors_origins.join(", ")).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
}

/// Render a credential for display, keeping at most the last four characters
#[inline]
pub fn mask_secret(secret: Option<&str>) -> String {
    match secret {
        None => "not set".to_string(),
        Some(value) if value.trim().is_empty() => "not set".to_string(),
        Some(value) => {
            let chars: Vec<char> = value.chars().collect();
            if chars.len() <= 8 {
                "********".to_string()
            } else {
                let tail: String = chars[chars.len() - 4..].iter().collect();
                format!("********{}", tail)
            }
        }
    }
}
