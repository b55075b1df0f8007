use carmarket_core::sweep::{SweepKind, SweepReport};
use carmarket_engine::Sweeper;

use crate::commands::{load_config, open_pool, runtime, CommandResult, Failure, EXIT_CONFIG, EXIT_EXECUTION};

/// Runs one sweep by name, or every sweep for `all`.
pub fn run(target: &str) -> CommandResult {
    let kinds = match parse_target(target) {
        Some(kinds) => kinds,
        None => {
            return CommandResult::failure(
                "sweep",
                "invalid_argument",
                format!(
                    "unknown sweep `{target}` (expected all|{})",
                    SweepKind::ALL.map(|kind| kind.as_str()).join("|")
                ),
                EXIT_CONFIG,
            );
        }
    };
    let config = match load_config("sweep") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime("sweep") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        let sweeper = Sweeper::from_config(pool.clone(), &config);

        let mut reports = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let report = sweeper.run(kind).await.map_err(|error| {
                ("sweep_execution", format!("{kind} sweep failed: {error}"), EXIT_EXECUTION)
            })?;
            reports.push(report);
        }
        pool.close().await;
        Ok::<_, Failure>(reports)
    });

    match result {
        Ok(reports) => CommandResult::success("sweep", summarize(&reports)),
        Err(failure) => CommandResult::from_failure("sweep", failure),
    }
}

fn parse_target(target: &str) -> Option<Vec<SweepKind>> {
    if target.trim().eq_ignore_ascii_case("all") {
        return Some(SweepKind::ALL.to_vec());
    }
    SweepKind::parse(target).map(|kind| vec![kind])
}

fn summarize(reports: &[SweepReport]) -> String {
    reports
        .iter()
        .map(|report| {
            if report.skipped {
                format!("{}: skipped", report.kind)
            } else {
                format!(
                    "{}: affected={} notified={} failures={}",
                    report.kind, report.affected, report.notified, report.failures
                )
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}
