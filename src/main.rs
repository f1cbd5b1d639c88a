//! askdb — natural-language questions over a warehouse, with an evaluation
//! workflow for curating question/SQL pairs.

mod cli;

use anyhow::Context;
use askdb::config::Config;
use askdb::error::AskdbError;
use askdb::lifecycle::{EvaluationService, QuestionService};
use askdb::store::{data_source_store, user_store, DataSourceKind, FeedbackState, Store};
use askdb::translate::translator_for;
use askdb::warehouse::runner_for;
use askdb::logging;
use cli::{Cli, Command, DataSourceCommand, EvalCommand, UserCommand};
use tracing::error;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init_stderr_logging();

    if let Err(e) = run().await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;

    let store_path = cli
        .store
        .clone()
        .or_else(|| config.store.path.clone())
        .map_or_else(Store::default_path, Ok)
        .context("resolving state database path")?;
    let store = Store::open(&store_path).await.context("opening state database")?;

    let translator = translator_for(&config).context("building translation client")?;
    let runner = runner_for(&config).context("building query runner")?;

    let questions = QuestionService::new(store.clone(), translator.clone(), runner.clone());
    let evaluation = EvaluationService::new(store.clone(), translator, runner);

    match cli.command {
        Command::Ask {
            user,
            data_source,
            question,
        } => {
            let result = questions.create(user, data_source, &question).await?;
            print_json(&result)?;
        }
        Command::Results { question_id } => {
            let result = questions.results_for_id(question_id).await?;
            print_json(&result)?;
        }
        Command::SetSql { question_id, sql } => {
            let result = questions.update_sql(question_id, &sql).await?;
            print_json(&result)?;
        }
        Command::Feedback { question_id, state } => {
            let state = FeedbackState::parse(&state).ok_or_else(|| {
                AskdbError::validation(format!("unknown feedback state: {state}"))
            })?;
            let question = questions.record_feedback(question_id, state).await?;
            print_json(&question)?;
        }
        Command::History { user, data_source } => {
            let history = questions.history(user, data_source).await?;
            print_json(&history)?;
        }
        Command::Eval { command } => match command {
            EvalCommand::New {
                data_source,
                from_questions,
            } => {
                let group = if from_questions.is_empty() {
                    evaluation.create_group(data_source).await?
                } else {
                    evaluation
                        .group_from_questions(data_source, &from_questions)
                        .await?
                };
                print_json(&group)?;
            }
            EvalCommand::Load { group_id } => {
                let detail = evaluation.load(group_id).await?;
                print_json(&detail)?;
            }
            EvalCommand::Add { group_id, question } => {
                let member = evaluation.add_question(group_id, &question).await?;
                print_json(&member)?;
            }
            EvalCommand::Rm {
                group_id,
                question_id,
            } => {
                evaluation.remove_question(question_id, group_id).await?;
            }
            EvalCommand::SetSql { group_id, sql } => {
                let group = evaluation.set_correct_sql(group_id, &sql).await?;
                print_json(&group)?;
            }
            EvalCommand::Note { group_id, notes } => {
                let group = evaluation.update_notes(group_id, &notes).await?;
                print_json(&group)?;
            }
            EvalCommand::Correct {
                group_id,
                notes,
                assert_columns,
            } => {
                let columns = (!assert_columns.is_empty()).then_some(assert_columns.as_slice());
                let group = evaluation
                    .mark_correct(group_id, notes.as_deref(), columns)
                    .await?;
                print_json(&group)?;
            }
            EvalCommand::Delete { group_id } => {
                evaluation.delete_group(group_id).await?;
            }
            EvalCommand::List => {
                let groups = evaluation.list_groups().await?;
                print_json(&groups)?;
            }
        },
        Command::Datasource { command } => match command {
            DataSourceCommand::Add {
                name,
                kind,
                credentials,
            } => {
                let kind = DataSourceKind::parse(&kind).ok_or_else(|| {
                    AskdbError::validation(format!("unknown data source kind: {kind}"))
                })?;
                let credentials: serde_json::Value = serde_json::from_str(&credentials)
                    .map_err(|e| AskdbError::validation(format!("invalid credentials JSON: {e}")))?;
                let ds =
                    data_source_store::create_data_source(store.pool(), &name, kind, &credentials)
                        .await?;
                print_json(&ds)?;
            }
            DataSourceCommand::List => {
                let sources = data_source_store::list_data_sources(store.pool()).await?;
                print_json(&sources)?;
            }
        },
        Command::User { command } => match command {
            UserCommand::Add { email, name } => {
                let user = user_store::create_user(store.pool(), &email, &name).await?;
                print_json(&user)?;
            }
        },
    }

    store.close().await;
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
