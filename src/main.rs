use clap::Parser;
use pref_sync::config::cli::position_to_index;
use pref_sync::core::OrderedPreferenceList;
use pref_sync::domain::model::ProjectId;
use pref_sync::utils::error::ErrorSeverity;
use pref_sync::utils::{logger, validation::Validate};
use pref_sync::{
    CliConfig, Command, HttpProjectCatalog, PortalError, PreferenceStore, ReorderController,
    ReorderOutcome,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if config.json_logs() {
        logger::init_json_logger(config.log_level());
    } else {
        logger::init_cli_logger(cli.verbose, config.log_level());
    }

    tracing::info!("Starting pref-sync");
    if cli.verbose {
        tracing::debug!("Resolved config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let catalog = Arc::new(HttpProjectCatalog::from_config(&config));
    let store = Arc::new(PreferenceStore::new(catalog));
    let controller = ReorderController::from_config(&config, store);

    if let Err(e) = run(&controller, &cli.command).await {
        tracing::error!(
            "❌ {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(controller: &ReorderController, command: &Command) -> Result<(), PortalError> {
    controller.load().await?;

    let outcome = match command {
        Command::List => {
            print_list(&controller.snapshot());
            return Ok(());
        }
        Command::Up { project_id } => controller.move_up(&ProjectId(project_id.clone())).await?,
        Command::Down { project_id } => {
            controller.move_down(&ProjectId(project_id.clone())).await?
        }
        Command::Move {
            project_id,
            position,
        } => {
            let index = position_to_index(*position)?;
            controller
                .move_to_index(&ProjectId(project_id.clone()), index)
                .await?
        }
        Command::Withdraw { project_id } => {
            controller.withdraw(&ProjectId(project_id.clone())).await?
        }
    };

    match outcome {
        ReorderOutcome::NoOp => println!("Nothing to change."),
        ReorderOutcome::Rejected => return Err(PortalError::ReorderRejected),
        ReorderOutcome::Committed { list, writes } => {
            println!("✅ Saved ({} updates)", writes);
            print_list(&list);
        }
        ReorderOutcome::RolledBack {
            list,
            error,
            reload_error,
        } => {
            print_list(&list);
            if let Some(reload_error) = reload_error {
                tracing::error!("Reload after rollback failed: {}", reload_error);
                eprintln!("⚠️ The list above may be out of date.");
            }
            return Err(error);
        }
    }

    Ok(())
}

fn print_list(list: &OrderedPreferenceList) {
    if list.is_empty() {
        println!("No applied projects.");
        return;
    }
    for entry in list.entries() {
        println!(
            "{:>3}. {:<12} {}",
            entry.rank(),
            entry.project_id(),
            entry.project.title
        );
    }
}
