use carmarket_db::DemoSeedDataset;

use crate::commands::{load_config, open_pool, runtime, CommandResult, Failure, EXIT_EXECUTION};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime("seed") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;

        let seeded = DemoSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), EXIT_EXECUTION))?;
        let verification = DemoSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), EXIT_EXECUTION))?;
        pool.close().await;

        if !verification.all_present {
            return Err(("seed_verification", verification_failure(&verification.checks), EXIT_EXECUTION));
        }
        Ok::<_, Failure>(seeded)
    });

    match result {
        Ok(seeded) => {
            let statuses = seeded
                .listings_seeded
                .iter()
                .map(|listing| format!("{} ({})", listing.listing_id, listing.status))
                .collect::<Vec<_>>()
                .join(", ");
            CommandResult::success(
                "seed",
                format!(
                    "seeded {} owners and {} listings: {statuses}",
                    seeded.owners_seeded,
                    seeded.listings_seeded.len()
                ),
            )
        }
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

fn verification_failure(checks: &[(&'static str, bool)]) -> String {
    let failed = checks.iter().filter_map(|(check, passed)| (!passed).then_some(*check)).collect::<Vec<_>>();
    if failed.is_empty() {
        "some seed data failed to load".to_string()
    } else {
        format!("seed verification failed for checks: {}", failed.join(", "))
    }
}
