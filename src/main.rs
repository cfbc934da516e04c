// Operator entry point for the sitepulse core.
//
// Worker deployments embed the library and supply concrete crawler and
// curator providers; this binary covers the operator surfaces that need
// no provider: schedule inspection, progress polling, artifact reads, and
// timer enrollment.

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use sitepulse::{ProgressTracker, Scheduler, Settings, Store};

const USAGE: &str = "usage: sitepulse <command> [args]

commands:
  stats                      scheduler queue depths and cooldown counts
  progress <project-id>      current progress record for a project
  artifact <project-id> [n]  print the current artifact, or version n
  enroll <project-id>        enroll a project in both check timers
  unenroll <project-id>      remove a project from all scheduler keys
";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        eprint!("{USAGE}");
        std::process::exit(2);
    };

    let settings = Settings::from_env().context("loading settings from environment")?;

    let redis_client =
        redis::Client::open(settings.redis_url.as_str()).context("parsing redis url")?;
    let redis_conn = redis::aio::ConnectionManager::new(redis_client)
        .await
        .context("connecting to redis")?;
    let scheduler = Scheduler::new(redis_conn.clone(), &settings);

    match command {
        "stats" => {
            let stats = scheduler.stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        "progress" => {
            let project_id = args.get(1).context("progress requires a project id")?;
            let progress = ProgressTracker::new(redis_conn);
            match progress.get(project_id).await {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => println!("no progress recorded"),
            }
        }
        "artifact" => {
            let project_id = args.get(1).context("artifact requires a project id")?;
            let store = Store::connect(&settings.database_url).await?;
            match args.get(2) {
                Some(version) => {
                    let version: i64 = version.parse().context("version must be an integer")?;
                    match store.get_artifact_version(project_id, version).await? {
                        Some(row) => println!("{}", row.content),
                        None => bail!("no artifact version {version} for {project_id}"),
                    }
                }
                None => match store.get_artifact(project_id).await? {
                    Some(row) => println!("{}", row.content),
                    None => bail!("no artifact for {project_id}"),
                },
            }
        }
        "enroll" => {
            let project_id = args.get(1).context("enroll requires a project id")?;
            let times = scheduler.schedule_project(project_id).await?;
            println!("{}", serde_json::to_string_pretty(&times)?);
        }
        "unenroll" => {
            let project_id = args.get(1).context("unenroll requires a project id")?;
            scheduler.unschedule_project(project_id).await?;
            println!("unscheduled {project_id}");
        }
        other => {
            eprintln!("unknown command: {other}");
            eprint!("{USAGE}");
            std::process::exit(2);
        }
    }

    Ok(())
}
