use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{print_json, OutputFormat, OutputOptions};
use crate::cli::renderer;
use crate::core::config::AppConfig;
use crate::core::models::tier::{CurrentLimits, TierLimits, UpgradeOffer};
use crate::core::models::usage::Tier;
use crate::core::upgrade::compute_multiplier;

#[derive(Serialize)]
struct TierPayload<'a> {
    tier: Tier,
    #[serde(flatten)]
    limits: &'a TierLimits,
    upgrade: UpgradeOffer,
}

pub fn run(config: &AppConfig, opts: &OutputOptions) -> Result<()> {
    let table = &config.tiers;
    match opts.format {
        OutputFormat::Text => println!("{}", renderer::render_tiers(table, opts.use_color)),
        OutputFormat::Json => {
            let payload: Vec<TierPayload> = table
                .iter()
                .map(|(tier, limits)| TierPayload {
                    tier,
                    limits,
                    upgrade: compute_multiplier(
                        tier,
                        CurrentLimits {
                            daily_limit: limits.daily_limit,
                            monthly_limit: limits.monthly_limit,
                        },
                        table,
                    ),
                })
                .collect();
            print_json(&payload, opts)?;
        }
    }
    Ok(())
}
