use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use learner_style_engine::adaptation::{adapt_record, AdaptationDirective};
use learner_style_engine::config::Config;
use learner_style_engine::logging::init_tracing;
use learner_style_engine::style::{
    AgeBand, ClassificationError, ClassificationStore, ItemBank, ItemBankLoadError,
    LearnerClassificationRecord, SessionController,
};

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    ItemBank(#[from] ItemBankLoadError),

    #[error("unknown command {0:?}; expected `show` or `reset`")]
    UnknownCommand(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot<'a> {
    learner_id: &'a str,
    record: LearnerClassificationRecord,
    directive: AdaptationDirective,
    persistent: bool,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&config.logging);

    let command = std::env::args().nth(1);
    if let Err(err) = run(&config, command.as_deref()).await {
        tracing::error!(error = %err, "learner-style failed");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(config: &Config, command: Option<&str>) -> Result<(), CliError> {
    let store = Arc::new(ClassificationStore::from_config(&config.store).await);
    tracing::info!(
        learner_id = %config.store.learner_id,
        backend = store.backend().kind(),
        health = store.health().as_str(),
        "classification store ready"
    );

    match command {
        Some("show") => print_snapshot(config, &store).await,
        Some("reset") => {
            store.reset().await;
            print_snapshot(config, &store).await
        }
        Some(other) => Err(CliError::UnknownCommand(other.to_string())),
        None => {
            let bank = match &config.item_bank_path {
                Some(path) => ItemBank::from_json_file(path)?,
                None => ItemBank::reference(),
            };
            let mut controller = SessionController::new(Arc::clone(&store), Arc::new(bank));
            if run_questionnaire(&mut controller).await? {
                print_snapshot(config, &store).await?;
            }
            Ok(())
        }
    }
}

async fn print_snapshot(config: &Config, store: &ClassificationStore) -> Result<(), CliError> {
    let record = store.load().await;
    let snapshot = Snapshot {
        learner_id: &config.store.learner_id,
        record,
        directive: adapt_record(&record, ()).directive,
        persistent: store.backend().is_persistent() && !store.is_degraded(),
    };
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

/// Returns `false` when the learner quits before confirming.
async fn run_questionnaire(controller: &mut SessionController) -> Result<bool, CliError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    controller.start_session()?;

    while let Some(item) = controller.next_item().cloned() {
        let progress = controller.progress();
        println!();
        println!("[{}/{}] {}", progress.answered + 1, progress.total, item.prompt);
        for (index, option) in item.options.iter().enumerate() {
            let label = if option.label.is_empty() {
                option.option_id.as_str()
            } else {
                option.label.as_str()
            };
            println!("  {}) {}", index + 1, label);
        }

        let Some(input) = prompt(&mut lines, "answer (number, option id, or q to quit): ").await?
        else {
            controller.cancel()?;
            return Ok(false);
        };
        if input.eq_ignore_ascii_case("q") {
            controller.cancel()?;
            return Ok(false);
        }

        let option_id = input
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| item.options.get(i))
            .map(|o| o.option_id.clone())
            .unwrap_or(input);

        match controller.record_answer(&item.id, &option_id) {
            Ok(_) => {}
            Err(ClassificationError::InvalidAnswer { .. }) => {
                println!("  not one of the options, try again");
            }
            Err(err) => return Err(err.into()),
        }
    }

    let Some(result) = controller.resolved() else {
        controller.cancel()?;
        return Ok(false);
    };
    println!();
    println!("learning style: {} ({}% confidence)", result.style, result.confidence);
    if let Some(tally) = controller.tally() {
        println!("votes: {}", serde_json::to_string(&tally)?);
    }

    let current = controller.store().load().await.age_band;
    let age_band = loop {
        let question = format!(
            "age band [earlyYears/primary/secondary/adult] (enter keeps {current}): "
        );
        let Some(input) = prompt(&mut lines, &question).await? else {
            break None;
        };
        if input.is_empty() {
            break None;
        }
        match AgeBand::parse(&input) {
            Some(band) => break Some(band),
            None => println!("  unknown age band"),
        }
    };

    let record = controller.confirm(age_band).await?;
    tracing::debug!(style = %record.style, age_band = %record.age_band, "confirmed from cli");
    Ok(true)
}

async fn prompt(
    lines: &mut Lines<BufReader<Stdin>>,
    question: &str,
) -> Result<Option<String>, CliError> {
    use std::io::Write;

    print!("{question}");
    std::io::stdout().flush()?;
    Ok(lines.next_line().await?.map(|line| line.trim().to_string()))
}
