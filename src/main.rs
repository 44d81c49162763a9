use anyhow::{Context, Result, anyhow, bail};
use bucketlink::entity::{CONTRIBUTIONS_COUNT, ENROLLMENTS_COUNT, LOCATION_ALIAS, RESULTS_FIELD};
use bucketlink::query::{Projection, SetExpression, UpdateStatement, validate_segment};
use bucketlink::{BucketClient, BucketConfig, Document, EntityKind, JsonObject, MemoryCluster};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Value, json};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "bucketlink")]
#[command(about = "Resilient document bucket access: demo and statement tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the result-record walkthrough against an in-process bucket
    Demo {
        #[arg(long, default_value = "crowd")]
        bucket: String,
        /// Result id to use; a random one is generated when omitted
        #[arg(long)]
        result_id: Option<String>,
    },
    /// Print the update statement a field mutator would run
    Statement {
        #[command(subcommand)]
        target: StatementTarget,
    },
}

#[derive(Subcommand)]
enum StatementTarget {
    Counter {
        #[arg(long, value_enum)]
        entity: CounterEntity,
        #[arg(long)]
        id: String,
        #[arg(long)]
        decrement: bool,
        #[arg(long, default_value = "crowd")]
        bucket: String,
    },
    Append {
        #[arg(long)]
        id: String,
        #[arg(long)]
        answer: String,
        /// JSON object to append, e.g. '{"lat":1,"lng":2}'
        #[arg(long)]
        location: String,
        #[arg(long, default_value = "crowd")]
        bucket: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CounterEntity {
    Result,
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Demo { bucket, result_id } => {
            let result_id = result_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            run_demo(&bucket, &result_id).await
        }
        Command::Statement { target } => {
            println!("{}", render_statement(target)?);
            Ok(())
        }
    }
}

async fn run_demo(bucket: &str, result_id: &str) -> Result<()> {
    let cluster = Arc::new(MemoryCluster::new());
    let client = BucketClient::connect(cluster, BucketConfig::default().bucket(bucket))
        .context("Failed to prepare bucket client")?;
    let results = client.results();

    print_step(
        "create",
        &results
            .create(result_id, JsonObject::new())
            .await
            .context("Failed to create result")?,
    );
    print_step(
        "add_one_to_contributions_count",
        &results
            .add_one_to_contributions_count(result_id)
            .await
            .context("Failed to bump contributions count")?,
    );
    print_step(
        "add_result_for_template",
        &results
            .add_result_for_template(result_id, "yes", object(json!({"lat": 1, "lng": 2}))?)
            .await
            .context("Failed to append result")?,
    );
    print_step(
        "fetch",
        &results
            .fetch(result_id)
            .await
            .context("Failed to fetch result")?,
    );
    print_step(
        "fetch_missing",
        &results
            .fetch("no-such-result")
            .await
            .context("Failed to fetch missing result")?,
    );

    Ok(())
}

fn render_statement(target: StatementTarget) -> Result<String> {
    match target {
        StatementTarget::Counter {
            entity,
            id,
            decrement,
            bucket,
        } => {
            let (kind, field) = match entity {
                CounterEntity::Result => (EntityKind::Result, CONTRIBUTIONS_COUNT),
                CounterEntity::Stats => (EntityKind::Stats, ENROLLMENTS_COUNT),
            };
            if decrement && matches!(entity, CounterEntity::Result) {
                bail!("the contributions count is only ever incremented");
            }
            let delta = if decrement { -1 } else { 1 };

            Ok(UpdateStatement::new(bucket, kind.alias())
                .use_keys(id)
                .set(field, SetExpression::Add(delta))
                .returning(Projection::field(field))
                .returning(Projection::MetaId)
                .build())
        }
        StatementTarget::Append {
            id,
            answer,
            location,
            bucket,
        } => {
            validate_segment(&answer).map_err(|err| anyhow!(err))?;
            let location: Value =
                serde_json::from_str(&location).context("Location must be valid JSON")?;
            let location = object(location)?;
            let path = format!("{RESULTS_FIELD}.{answer}");

            Ok(UpdateStatement::new(bucket, EntityKind::Result.alias())
                .use_keys(id)
                .set(path.as_str(), SetExpression::ArrayAppend(Value::Object(location)))
                .returning(Projection::last_element(path.as_str(), LOCATION_ALIAS))
                .returning(Projection::MetaId)
                .build())
        }
    }
}

fn object(value: Value) -> Result<JsonObject> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(anyhow!("Expected a JSON object, got {other}")),
    }
}

fn print_step(step: &str, document: &Document) {
    println!("{step}: {}", document.to_json());
}
