/*
[INPUT]:  Interactive user input via CLI (or built-in defaults)
[OUTPUT]: Generated YAML configuration file
[POS]:    CLI initialization layer
[UPDATE]: When QueueConfig schema changes
*/

use anyhow::{Context, Result, bail};
use console::style;
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};
use std::path::Path;

use tunefetch_queue::QueueConfig;
use tunefetch_queue::config::{BackendConfig, DownloadDefaults, MonitorConfig};

const QUALITIES: &[&str] = &["(backend default)", "NORMAL", "HIGH", "VERY_HIGH", "LOSSLESS", "HI_RES"];

pub fn run_init(output: &Path, use_defaults: bool) -> Result<()> {
    if output.exists() && !use_defaults {
        let overwrite = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("{} exists. Overwrite?", output.display()))
            .default(false)
            .interact()?;
        if !overwrite {
            bail!("refusing to overwrite {}", output.display());
        }
    }

    let config = if use_defaults {
        QueueConfig::default()
    } else {
        prompt_config()?
    };
    config.validate()?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let yaml = config.to_yaml()?;
    std::fs::write(output, yaml)
        .with_context(|| format!("failed to write config to {}", output.display()))?;

    println!("\n{}", style("SUCCESS!").bold().green());
    println!("Configuration written to: {}", style(output.display()).cyan());

    Ok(())
}

fn prompt_config() -> Result<QueueConfig> {
    println!("{}", style("Welcome to tunefetch init").bold().cyan());
    println!(
        "{}",
        style("This will guide you through creating a client configuration.").dim()
    );

    let theme = ColorfulTheme::default();
    let defaults = QueueConfig::default();

    println!("\n{}", style("--- Backend ---").bold());
    let base_url: String = Input::with_theme(&theme)
        .with_prompt("Backend URL")
        .default(defaults.backend.base_url.clone())
        .interact_text()?;

    let timeout_secs: u64 = Input::with_theme(&theme)
        .with_prompt("Request timeout (seconds)")
        .default(defaults.backend.timeout_secs)
        .interact_text()?;

    println!("\n{}", style("--- Monitoring ---").bold());
    let poll_interval_ms: u64 = Input::with_theme(&theme)
        .with_prompt("Poll interval (ms)")
        .default(defaults.monitor.poll_interval_ms)
        .validate_with(|value: &u64| {
            if *value == 0 {
                Err("must be greater than zero")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let inactivity_timeout_secs: u64 = Input::with_theme(&theme)
        .with_prompt("Give up after this many seconds without progress")
        .default(defaults.monitor.inactivity_timeout_secs)
        .interact_text()?;

    println!("\n{}", style("--- Download defaults ---").bold());
    let main_account = optional_text(&theme, "Main account (blank for none)")?;
    let fallback_account = optional_text(&theme, "Fallback account (blank for none)")?;

    let quality = select_quality(&theme, "Preferred quality")?;
    let fallback_quality = if fallback_account.is_some() {
        select_quality(&theme, "Fallback quality")?
    } else {
        None
    };

    let real_time = Confirm::with_theme(&theme)
        .with_prompt("Use real-time downloads by default?")
        .default(false)
        .interact()?;

    Ok(QueueConfig {
        backend: BackendConfig {
            base_url,
            timeout_secs,
            ..defaults.backend
        },
        monitor: MonitorConfig {
            poll_interval_ms,
            inactivity_timeout_secs,
            ..defaults.monitor
        },
        defaults: DownloadDefaults {
            main_account,
            fallback_account,
            quality,
            fallback_quality,
            real_time,
        },
    })
}

fn optional_text(theme: &ColorfulTheme, prompt: &str) -> Result<Option<String>> {
    let value: String = Input::with_theme(theme)
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}

fn select_quality(theme: &ColorfulTheme, prompt: &str) -> Result<Option<String>> {
    let selection = Select::with_theme(theme)
        .with_prompt(prompt)
        .items(QUALITIES)
        .default(0)
        .interact()?;
    Ok((selection > 0).then(|| QUALITIES[selection].to_string()))
}
