//! Templates command - inspect and validate extraction templates.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;

use fapiao_core::TemplateStore;

use super::{load_config, load_store};

/// Arguments for the templates command.
#[derive(Args)]
pub struct TemplatesArgs {
    #[command(subcommand)]
    command: TemplatesCommand,
}

#[derive(Subcommand)]
enum TemplatesCommand {
    /// List loaded templates in matching order
    List,

    /// Validate a template file
    Check {
        /// Template file (JSON)
        file: PathBuf,
    },
}

pub async fn run(args: TemplatesArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    match args.command {
        TemplatesCommand::List => list_templates(config_path),
        TemplatesCommand::Check { file } => check_templates(&file, config_path),
    }
}

fn list_templates(config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let store = load_store(&config)?;

    if store.is_empty() {
        println!("{} No templates loaded.", style("ℹ").blue());
        return Ok(());
    }

    let mut templates: Vec<_> = store.templates().iter().enumerate().collect();
    // Matching order: priority, then declaration order.
    templates.sort_by_key(|(i, t)| (std::cmp::Reverse(t.priority()), *i));

    for (_, template) in templates {
        let fields: Vec<&str> = template
            .rules()
            .iter()
            .flat_map(|r| r.targets().iter().map(String::as_str))
            .collect();

        println!(
            "{}  priority {}",
            style(template.issuer_id()).bold(),
            template.priority()
        );
        println!("  keywords: {}", template.keywords().join(", "));
        println!("  fields:   {}", fields.join(", "));
        let required = template.required_fields();
        if !required.is_empty() {
            println!("  required: {}", required.join(", "));
        }
    }

    Ok(())
}

fn check_templates(file: &Path, config_path: Option<&str>) -> anyhow::Result<()> {
    let loaded = TemplateStore::from_file(file)
        .map_err(|e| anyhow::anyhow!("Invalid template file {}: {}", file.display(), e))?;
    let count = loaded.len();

    // Issuer ids must not clash with the templates already configured.
    let config = load_config(config_path)?;
    let mut store = load_store(&config)?;
    store
        .extend(loaded)
        .map_err(|e| anyhow::anyhow!("Template file {} conflicts with loaded templates: {}", file.display(), e))?;

    println!(
        "{} {} valid ({} templates)",
        style("✓").green(),
        file.display(),
        count
    );

    Ok(())
}
