//! `skillwatch status`: Show resolved configuration.

use skillwatch_config::{AppConfig, detect_environment};
use skillwatch_core::Result;

pub async fn run(config: &AppConfig) -> Result<()> {
    let reporter = &config.reporter;

    println!("SkillWatch Status");
    println!("=================");
    println!("  Config dir:      {}", AppConfig::config_dir().display());
    println!("  Client:          {}", reporter.client);
    println!("  Capture mode:    {}", reporter.capture_mode);
    println!("  Max breadcrumbs: {}", reporter.max_breadcrumbs);
    println!("  Environment:     {}", reporter.environment.as_deref().unwrap_or("-"));
    println!("  Release:         {}", reporter.release.as_deref().unwrap_or("-"));
    println!("  Log level:       {}", config.logging.level);

    match detect_environment() {
        Some(tags) => {
            println!("\n  Serverless host detected");
            for (name, value) in tags.to_tags() {
                println!("    {name:<10} {value}");
            }
        }
        None => println!("\n  No serverless host detected"),
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("\n  No config file, using defaults");
    }

    Ok(())
}
