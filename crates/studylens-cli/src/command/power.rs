use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Args;
use studylens_power::{
    capacity::{self, CapacityPlan, CapacityRow},
    design::{PowerTarget, SampleSize, StudyDesign},
    pilot::{PilotColumns, PilotSummary},
};
use tracing::{info, warn};

use crate::util::{self, Output};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum DesignArg {
    /// Two independent groups
    Independent,
    /// Within-subjects comparison
    Paired,
}

impl From<DesignArg> for StudyDesign {
    fn from(value: DesignArg) -> Self {
        match value {
            DesignArg::Independent => StudyDesign::Independent,
            DesignArg::Paired => StudyDesign::Paired,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub(crate) struct PowerArg {
    #[arg(long, value_enum, default_value_t = DesignArg::Independent)]
    design: DesignArg,

    /// Significance level
    #[arg(long, default_value_t = 0.05)]
    alpha: f64,

    /// Target power
    #[arg(long, default_value_t = 0.80)]
    power: f64,

    /// Use a one-sided test
    #[arg(long)]
    one_sided: bool,

    /// Ratio of the second group's size to the first's
    #[arg(long, default_value_t = 1.0)]
    allocation_ratio: f64,

    /// Inflate sample sizes for the expected dropout rate (e.g. 0.10)
    #[arg(long, default_value_t = 0.0)]
    dropout_rate: f64,

    /// Effect size (Cohen's d for independent designs, d_z for paired)
    #[arg(long, allow_negative_numbers = true)]
    effect: Option<f64>,

    /// Pilot CSV to estimate the effect size from
    #[arg(long)]
    pilot_csv: Option<PathBuf>,

    #[arg(long, default_value = "mode")]
    pilot_group_col: String,

    #[arg(long, default_value = "outcome")]
    pilot_value_col: String,

    #[arg(long, default_value = "human")]
    pilot_group_a: String,

    #[arg(long, default_value = "vlm")]
    pilot_group_b: String,

    /// Use Hedges' g from the pilot instead of Cohen's d
    #[arg(long)]
    use_hedges_g: bool,

    /// Number of stories in the full study
    #[arg(long)]
    stories: Option<usize>,

    /// Study config JSON to read story ids from
    #[arg(long)]
    study_config: Option<PathBuf>,

    /// Study label used in capacity row keys (e.g. "formal_1" or "pilot")
    #[arg(long, default_value = "formal_1")]
    study_label: String,

    /// Print capacity rows as CSV
    #[arg(long)]
    print_capacity_csv: bool,
}

pub(crate) fn run(arg: &PowerArg) -> anyhow::Result<()> {
    let (effect, pilot) = resolve_effect(arg)?;
    let effect = effect.abs();

    let design = StudyDesign::from(arg.design);
    let target = PowerTarget {
        alpha: arg.alpha,
        power: arg.power,
        two_sided: !arg.one_sided,
    };
    let size = SampleSize::required(design, effect, &target, arg.allocation_ratio)
        .and_then(|size| size.with_dropout(arg.dropout_rate))
        .context("Failed to compute the required sample size")?;
    info!(%design, effect, total = size.total(), "computed sample size");

    let story_ids = arg.study_config.as_ref().and_then(|path| {
        let ids = util::open_file("study config", path).and_then(|reader| {
            capacity::load_unit_ids(reader)
                .with_context(|| format!("Failed to read story ids: {}", path.display()))
        });
        match ids {
            Ok(ids) => Some(ids),
            Err(err) => {
                warn!("ignoring study config: {err:#}");
                None
            }
        }
    });
    let story_count = capacity::resolve_unit_count(arg.stories, story_ids.as_deref());

    println!("=== Power analysis (normal approx) ===");
    println!("design: {design}");
    println!(
        "alpha: {} ({})",
        target.alpha,
        if target.two_sided {
            "two-sided"
        } else {
            "one-sided"
        }
    );
    println!("power: {}", target.power);
    println!(
        "effect size: {effect:.4} ({})",
        if arg.use_hedges_g {
            "Hedges g"
        } else {
            "Cohen d/dz"
        }
    );
    if arg.dropout_rate > 0.0 {
        println!("dropout-rate: {:.2}% (inflated)", arg.dropout_rate * 100.0);
    }
    if let Some(pilot) = &pilot {
        print_pilot(pilot);
    }

    println!("--- Required sample size ---");
    match size {
        SampleSize::Independent { n_a, n_b } => {
            println!("n_per_group ({}): {n_a}", arg.pilot_group_a);
            println!(
                "n_per_group ({}): {n_b}  (allocation ratio n_{}/n_{}={})",
                arg.pilot_group_b, arg.pilot_group_b, arg.pilot_group_a, arg.allocation_ratio
            );
            println!("n_total: {}", size.total());
        }
        SampleSize::Paired { n_pairs } => println!("n_total_pairs: {n_pairs}"),
    }

    let Some(story_count) = story_count else {
        return Ok(());
    };
    let Some(plan) = CapacityPlan::for_sample_size(&size, story_count)? else {
        return Ok(());
    };
    println!("--- Convert to per-story capacity ---");
    println!("stories: {}", plan.unit_count);
    println!("max_assignments per story/mode: {}", plan.per_unit);
    println!(
        "implied total capacity: {} (>= {})",
        plan.implied_total,
        size.total()
    );

    if arg.print_capacity_csv {
        let story_ids = capacity::select_unit_ids(story_ids, plan.unit_count);
        let rows = capacity::capacity_rows(&arg.study_label, &story_ids, plan.per_unit);
        println!("--- Capacity CSV ---");
        write_capacity_csv(&rows)?;
    }

    Ok(())
}

/// Effect size from `--effect`, else estimated from the pilot CSV.
fn resolve_effect(arg: &PowerArg) -> anyhow::Result<(f64, Option<PilotSummary>)> {
    if let Some(effect) = arg.effect {
        return Ok((effect, None));
    }
    let Some(path) = &arg.pilot_csv else {
        bail!("provide --effect or --pilot-csv to estimate an effect size");
    };

    let columns = PilotColumns {
        group_col: arg.pilot_group_col.clone(),
        value_col: arg.pilot_value_col.clone(),
        group_a: arg.pilot_group_a.clone(),
        group_b: arg.pilot_group_b.clone(),
    };
    let reader = util::open_file("pilot CSV", path)?;
    let pilot = PilotSummary::from_csv(reader, &columns)
        .with_context(|| format!("Failed to estimate effect size from {}", path.display()))?;
    let effect = if arg.use_hedges_g {
        pilot.hedges_g
    } else {
        pilot.cohens_d
    };
    Ok((effect, Some(pilot)))
}

fn print_pilot(pilot: &PilotSummary) {
    println!("--- Pilot summary used to estimate effect ---");
    println!(
        "{}: n={}, mean={:.4}, sd={:.4}",
        pilot.group_a, pilot.n_a, pilot.mean_a, pilot.sd_a
    );
    println!(
        "{}: n={}, mean={:.4}, sd={:.4}",
        pilot.group_b, pilot.n_b, pilot.mean_b, pilot.sd_b
    );
    println!("pooled_sd: {:.4}", pilot.pooled_sd);
    println!("cohens_d: {:.4}", pilot.cohens_d);
    println!("hedges_g: {:.4}", pilot.hedges_g);
}

fn write_capacity_csv(rows: &[CapacityRow]) -> anyhow::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Output::stdout());
    for row in rows {
        writer
            .serialize(row)
            .context("Failed to write capacity CSV row")?;
    }
    writer.flush().context("Failed to flush capacity CSV")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct Cli {
        #[command(flatten)]
        arg: PowerArg,
    }

    fn parse(args: &[&str]) -> PowerArg {
        Cli::try_parse_from(std::iter::once("power").chain(args.iter().copied()))
            .unwrap()
            .arg
    }

    #[test]
    fn test_explicit_effect_wins_over_pilot() {
        let arg = parse(&["--effect", "-0.4", "--pilot-csv", "does-not-exist.csv"]);
        let (effect, pilot) = resolve_effect(&arg).unwrap();
        assert_eq!(effect, -0.4);
        assert!(pilot.is_none());
    }

    #[test]
    fn test_missing_effect_is_fatal() {
        assert!(resolve_effect(&parse(&[])).is_err());
    }

    #[test]
    fn test_effect_from_pilot_csv() {
        let path = std::env::temp_dir().join(format!("studylens-pilot-{}.csv", std::process::id()));
        fs::write(
            &path,
            "mode,outcome\nhuman,1\nhuman,2\nhuman,3\nvlm,2\nvlm,3\nvlm,4\n",
        )
        .unwrap();
        let path_arg = path.to_str().unwrap();

        let (d, pilot) = resolve_effect(&parse(&["--pilot-csv", path_arg])).unwrap();
        let (g, _) = resolve_effect(&parse(&["--pilot-csv", path_arg, "--use-hedges-g"])).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(d, 1.0);
        assert!(pilot.is_some());
        assert!(g > 0.0 && g < d);
    }

    #[test]
    fn test_defaults() {
        let arg = parse(&[]);
        assert_eq!(arg.design, DesignArg::Independent);
        assert_eq!(arg.study_label, "formal_1");
        assert_eq!((arg.alpha, arg.power), (0.05, 0.80));
        assert!(!arg.print_capacity_csv);
    }
}
