use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::path::Path;

use clap::Parser;
use jh_core::cli::{Cli, Command, RecipeArgs, ShoppingCommand, TasksCommand, VaultCommand};
use jh_core::config::config_path;
use jh_core::{init_logging, Assistant, Config, CoreError, Result};
use jh_services::{Mealie, Obsidian};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbosity());

    let config_file = cli.config.clone().unwrap_or_else(config_path);
    let mut config = Config::load_from(&config_file);
    if let Some(mode) = &cli.mode {
        config.assistant.mode = mode.clone();
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create async runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(dispatch(cli.command, &config, &config_file)) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn dispatch(command: Command, config: &Config, config_file: &Path) -> Result<()> {
    match command {
        Command::Ask { query } => ask(config, query).await,
        Command::Chat => chat(config).await,
        Command::Shopping(cmd) => shopping(config, cmd).await,
        Command::Recipe(args) => recipe(config, args).await,
        Command::Tasks(cmd) => tasks(config, cmd).await,
        Command::Vault(cmd) => vault(config, cmd).await,
        Command::Config => show_config(config, config_file),
    }
}

async fn ask(config: &Config, query: Vec<String>) -> Result<()> {
    let query = if query.is_empty() {
        read_stdin_query()?
    } else {
        query.join(" ")
    };
    if query.trim().is_empty() {
        return Err(CoreError::Config("no query given".to_string()));
    }

    let mut assistant = Assistant::from_config(config)?;
    println!("{}", assistant.run(query.trim()).await?);
    Ok(())
}

fn read_stdin_query() -> Result<String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(String::new());
    }
    let mut buf = String::new();
    stdin.lock().read_to_string(&mut buf)?;
    Ok(buf)
}

async fn chat(config: &Config) -> Result<()> {
    let mut assistant = Assistant::from_config(config)?;
    let interactive = io::stdin().is_terminal();
    let mut lines = io::stdin().lock().lines();

    loop {
        if interactive {
            print!("> ");
            io::stdout().flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query, "exit" | "quit") {
            break;
        }
        // A failed query leaves the session usable.
        match assistant.run(query).await {
            Ok(response) => println!("{response}"),
            Err(e) => eprintln!("error: {e}"),
        }
    }
    Ok(())
}

fn mealie(config: &Config) -> Result<Mealie> {
    let (url, key) = config.mealie.credentials().ok_or_else(|| {
        CoreError::Config("Mealie is not configured (set MEALIE_API_URL and MEALIE_API_KEY)".to_string())
    })?;
    Ok(Mealie::new(url, key, config.mealie.shopping_list_id.clone()))
}

fn obsidian(config: &Config) -> Result<Obsidian> {
    let (owner, repo, token) = config.obsidian.credentials().ok_or_else(|| {
        CoreError::Config(
            "Obsidian vault is not configured (set OBSIDIAN_VAULT_OWNER, OBSIDIAN_VAULT_REPOSITORY and OBSIDIAN_VAULT_TOKEN)"
                .to_string(),
        )
    })?;
    Ok(Obsidian::new(owner, repo, &config.obsidian.branch, token)
        .with_tasks_folder(config.obsidian.tasks_folder.clone()))
}

async fn shopping(config: &Config, cmd: ShoppingCommand) -> Result<()> {
    let mealie = mealie(config)?;
    match cmd {
        ShoppingCommand::List => {
            for item in mealie.shopping_items().await? {
                let label = item
                    .display
                    .as_deref()
                    .or(item.note.as_deref())
                    .unwrap_or_default();
                println!("- {label}");
            }
        }
        ShoppingCommand::Add { items } => {
            let parsed = mealie.parse_items(&items).await?;
            let result = mealie.add_shopping_items(parsed).await?;
            println!(
                "added {} item(s), updated {}",
                result.created_items.len(),
                result.updated_items.len()
            );
        }
        ShoppingCommand::Parse { items } => {
            let parsed = mealie.parse_items(&items).await?;
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }
    }
    Ok(())
}

async fn recipe(config: &Config, args: RecipeArgs) -> Result<()> {
    let mealie = mealie(config)?;
    let markdown = mealie.read_recipe(&args.name, args.scale, args.servings).await?;
    println!("{markdown}");
    Ok(())
}

async fn tasks(config: &Config, cmd: TasksCommand) -> Result<()> {
    let vault = obsidian(config)?;
    match cmd {
        TasksCommand::Add { tasks } => {
            let response = vault.add_tasks(&tasks).await?;
            let path = response["content"]["path"].as_str().unwrap_or_default();
            println!("added {} task(s) {path}", tasks.len());
        }
    }
    Ok(())
}

async fn vault(config: &Config, cmd: VaultCommand) -> Result<()> {
    let vault = obsidian(config)?;
    match cmd {
        VaultCommand::Ls { path } => {
            for entry in vault.list_files(&path).await? {
                let suffix = if entry.kind == "dir" { "/" } else { "" };
                println!("{}{suffix}", entry.path);
            }
        }
        VaultCommand::Cat { path } => {
            print!("{}", vault.read_file(&path).await?.content);
        }
    }
    Ok(())
}

fn show_config(config: &Config, config_file: &Path) -> Result<()> {
    println!("# {}", config_file.display());
    let rendered = toml::to_string_pretty(&config.redacted())
        .map_err(|e| CoreError::Config(e.to_string()))?;
    print!("{rendered}");
    Ok(())
}
