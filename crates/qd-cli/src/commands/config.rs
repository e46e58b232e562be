use crate::context::AppContext;
use crate::output::Output;
use crate::ConfigCommands;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{modifiers, presets, Cell, Table};
use owo_colors::OwoColorize;
use qd_config::Config;
use serde_json::json;

pub async fn run_config(cmd: ConfigCommands, mut ctx: AppContext, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show_config(&ctx, output),
        ConfigCommands::Init { force } => init_config(&ctx, force, output),
        ConfigCommands::SetApiKey { key } => {
            let key = key.trim().to_string();
            if key.is_empty() {
                return Err(eyre!("API key cannot be empty"));
            }
            ctx.credentials.set_omdb_api_key(key);
            ctx.credentials
                .save()
                .map_err(|e| eyre!("Failed to save credentials: {}", e))?;
            output.success("OMDb API key saved");
            Ok(())
        }
    }
}

fn mask(value: &str) -> String {
    if value.len() <= 4 {
        return "****".to_string();
    }
    format!("{}****", &value[..2])
}

fn show_config(ctx: &AppContext, output: &Output) -> Result<()> {
    let config = &ctx.config;
    let api_key = ctx.credentials.get_omdb_api_key();
    let session = ctx.credentials.get_session_user_id();

    output.emit(
        &json!({
            "config_file": ctx.paths.config_file(),
            "store_file": ctx.paths.store_file(),
            "config": config,
            "omdb_api_key_set": api_key.is_some(),
            "session_user_id": session,
        }),
        || {
            let mut t = Table::new();
            t.load_preset(presets::UTF8_FULL);
            t.apply_modifier(modifiers::UTF8_ROUND_CORNERS);
            t.set_header(vec![Cell::new("Setting"), Cell::new("Value")]);
            t.add_row(vec![Cell::new("Config file"), Cell::new(ctx.paths.config_file().display())]);
            t.add_row(vec![Cell::new("Store"), Cell::new(ctx.paths.store_file().display())]);
            t.add_row(vec![Cell::new("Metadata URL"), Cell::new(&config.metadata.base_url)]);
            t.add_row(vec![
                Cell::new("OMDb API key"),
                Cell::new(match &api_key {
                    Some(key) => mask(key),
                    None => "not set".red().to_string(),
                }),
            ]);
            t.add_row(vec![Cell::new("Signed in as"), Cell::new(session.map(String::as_str).unwrap_or("-"))]);
            t.add_row(vec![Cell::new("Page size"), Cell::new(config.discovery.page_size)]);
            t.add_row(vec![Cell::new("Search window"), Cell::new(config.discovery.search_window)]);
            t.add_row(vec![Cell::new("Max poster bytes"), Cell::new(config.uploads.max_poster_bytes)]);
            t.add_row(vec![
                Cell::new("Welcome email"),
                Cell::new(if config.notifications.enabled { "✓".green().to_string() } else { "✗".red().to_string() }),
            ]);
            t.add_row(vec![Cell::new("Default sort"), Cell::new(config.queue.default_sort.label())]);
            t.add_row(vec![Cell::new("Services"), Cell::new(config.queue.services.join(", "))]);
            println!("{}", t);
        },
    );
    Ok(())
}

fn init_config(ctx: &AppContext, force: bool, output: &Output) -> Result<()> {
    let config_file = ctx.paths.config_file();
    if config_file.exists() && !force {
        output.warn(format!(
            "Configuration already exists at {}. Use --force to overwrite.",
            config_file.display()
        ));
        return Ok(());
    }

    Config::default()
        .save_to_file(&config_file)
        .map_err(|e| eyre!("Failed to write {}: {}", config_file.display(), e))?;
    output.success(format!("Wrote default configuration to {}", config_file.display()));
    Ok(())
}
