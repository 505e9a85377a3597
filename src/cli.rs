//! CLI argument parsing and command dispatch

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;

use gold_deploy::catalog::{CatalogRules, DeployableUnit, DeployableUnitSet};
use gold_deploy::exec::SystemRunner;
use gold_deploy::orchestrator::{Orchestrator, RunOptions};
use gold_deploy::ui::{OutputConfig, StdinConfirm};

/// Gold Deploy - Roll out Gold services across the fleet
#[derive(Parser, Debug)]
#[command(name = "gold-deploy")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Units to deploy, as <instance>:<service> selectors. The special
    /// value "all" selects every unit in the catalog.
    #[arg(value_name = "UNIT", required = true)]
    units: Vec<String>,

    /// Deploy and monitor this unit before the rest. May be repeated.
    #[arg(long, value_name = "UNIT")]
    canary: Vec<String>,

    /// If set, regenerate configs and print intent without committing,
    /// pushing, or monitoring anything.
    #[arg(long)]
    dry_run: bool,

    /// If set, regenerate configs but skip the commit/push stage. Units
    /// are still pushed and monitored.
    #[arg(long)]
    no_commit: bool,

    /// Minimum continuous uptime every unit in a phase must exceed
    /// before the phase completes.
    #[arg(long, value_name = "DURATION", default_value = "5m", value_parser = humantime::parse_duration)]
    min_uptime: Duration,

    /// Interval between uptime polls.
    #[arg(long, value_name = "DURATION", default_value = "10s", value_parser = humantime::parse_duration)]
    poll_interval: Duration,

    /// Root directory of the shared, per-instance, and per-unit
    /// configuration layers and templates.
    ///
    /// Can also be set with the `GOLD_DEPLOY_SOURCE_ROOT` environment
    /// variable.
    #[arg(long, value_name = "DIR", default_value = "golden", env = "GOLD_DEPLOY_SOURCE_ROOT")]
    source_root: PathBuf,

    /// URL of the configuration repository the generated manifests are
    /// published to.
    #[arg(
        long,
        value_name = "URL",
        default_value = "https://skia.googlesource.com/k8s-config"
    )]
    repo_url: String,

    /// Colorize output (always, never, auto)
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        env_logger::Builder::new()
            .parse_filters(&self.log_level)
            .init();
        let output = OutputConfig::from_env_and_flag(&self.color);

        let catalog = DeployableUnitSet::production(&CatalogRules::production());
        let canaried = resolve_units(&catalog, &self.canary)?;

        let main_units = if self.units.iter().any(|s| s == "all") {
            if self.units.len() > 1 {
                bail!("\"all\" cannot be combined with other unit selectors");
            }
            catalog
                .units()
                .iter()
                .filter(|u| !canaried.contains(*u))
                .cloned()
                .collect()
        } else {
            let units = resolve_units(&catalog, &self.units)?;
            if let Some(unit) = units.iter().find(|u| canaried.contains(*u)) {
                bail!(
                    "{} is listed as both a canary and a main unit",
                    unit.id.canonical_name()
                );
            }
            units
        };

        let options = RunOptions {
            dry_run: self.dry_run,
            no_commit: self.no_commit,
            min_uptime: self.min_uptime,
            poll_interval: self.poll_interval,
            repo_url: self.repo_url,
            source_root: self.source_root,
        };
        let runner = SystemRunner;
        let orchestrator = Orchestrator::new(main_units, canaried, options, &runner, output);
        orchestrator.run(&mut StdinConfirm).map_err(Into::into)
    }
}

/// Resolves selectors against the catalog, deduplicating repeats and
/// reordering into catalog order so command sequences are reproducible
/// regardless of how the operator listed the units.
fn resolve_units(catalog: &DeployableUnitSet, selectors: &[String]) -> Result<Vec<DeployableUnit>> {
    let mut units: Vec<DeployableUnit> = Vec::new();
    for selector in selectors {
        let unit = catalog.resolve(selector)?.clone();
        if !units.contains(&unit) {
            units.push(unit);
        }
    }
    units.sort_by_key(|u| catalog.units().iter().position(|c| c.id == u.id));
    Ok(units)
}
