//! # Deployment Orchestration
//!
//! Composes the pipeline: confirm → checkout → regenerate →
//! commit/push → push canaries → monitor canaries → push remainder →
//! monitor remainder → cleanup.
//!
//! The pipeline is strictly sequential — one external command in
//! flight, one cluster context active, one unit processed at a time —
//! so command ordering is deterministic and operations meant for
//! different clusters never interleave. A failure at any stage aborts
//! all later stages without attempting partial rollback; re-runs are
//! safe because manifest applies are idempotent. The temporary checkout
//! is removed on every exit path.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;

use crate::catalog::DeployableUnit;
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::monitor;
use crate::push::PushExecutor;
use crate::regen::{self, RegenContext};
use crate::repo::{self, Checkout};
use crate::ui::{emoji, Confirm, OutputConfig};

/// Run-mode flags and parameters for one invocation.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Print intent without committing, pushing, or monitoring.
    pub dry_run: bool,
    /// Regenerate configs but skip the commit/push stage.
    pub no_commit: bool,
    /// How long every unit must have been continuously up before a
    /// phase completes.
    pub min_uptime: Duration,
    /// Steady interval between monitor polls.
    pub poll_interval: Duration,
    /// The configuration repository the generated manifests are
    /// published to.
    pub repo_url: String,
    /// Root of the shared/instance/unit configuration layers.
    pub source_root: PathBuf,
}

/// Drives one deployment run. Constructed once per invocation; state
/// advances sequentially through the pipeline stages.
pub struct Orchestrator<'a> {
    canaried: Vec<DeployableUnit>,
    main: Vec<DeployableUnit>,
    options: RunOptions,
    runner: &'a dyn CommandRunner,
    output: OutputConfig,
    sleeper: fn(Duration),
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        main: Vec<DeployableUnit>,
        canaried: Vec<DeployableUnit>,
        options: RunOptions,
        runner: &'a dyn CommandRunner,
        output: OutputConfig,
    ) -> Self {
        Self {
            canaried,
            main,
            options,
            runner,
            output,
            sleeper: std::thread::sleep,
        }
    }

    /// Replaces the inter-poll sleep, so tests run without a real
    /// clock.
    #[cfg(test)]
    pub fn with_sleeper(mut self, sleeper: fn(Duration)) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Executes the full pipeline.
    ///
    /// A declined prompt is not an error: the remaining stages are
    /// skipped and `Ok(())` is returned. The checkout is removed on
    /// success, decline, and error alike.
    pub fn run(&self, confirm: &mut dyn Confirm) -> Result<()> {
        self.print_plan();
        if !confirm.confirm("Proceed?")? {
            println!("Aborting.");
            return Ok(());
        }

        let checkout = repo::checkout(self.runner, &self.options.repo_url)?;
        let result = self.execute(&checkout, confirm);
        if let Err(e) = checkout.close() {
            log::warn!("failed to remove checkout: {}", e);
        }
        result
    }

    fn execute(&self, checkout: &Checkout, confirm: &mut dyn Confirm) -> Result<()> {
        let canaried: Vec<&DeployableUnit> = self.canaried.iter().collect();
        let main: Vec<&DeployableUnit> = self.main.iter().collect();

        println!(
            "{} Regenerating deployment configs...",
            emoji(&self.output, "🔄", "[REGEN]")
        );
        regen::regenerate(
            self.runner,
            &canaried,
            &main,
            &RegenContext {
                source_root: &self.options.source_root,
                checkout_root: checkout.path(),
                now: Utc::now(),
            },
        )?;

        if self.options.dry_run || self.options.no_commit {
            // The commit stage is skipped below; still show the operator
            // what changed.
            let summary = repo::summarize_changes(self.runner, checkout)?;
            if !summary.trim().is_empty() {
                println!("Pending configuration changes:\n{}", summary);
            }
        }
        let proceed = repo::commit_and_push(
            self.runner,
            checkout,
            self.options.dry_run,
            self.options.no_commit,
            confirm,
        )?;
        if !proceed {
            println!("Commit declined; stopping before any push.");
            return Ok(());
        }

        let mut executor = PushExecutor::new(
            self.runner,
            checkout.path(),
            &self.options.source_root,
            self.options.dry_run,
        );

        if !canaried.is_empty() {
            println!(
                "{} Pushing canaries...",
                emoji(&self.output, "🐤", "[CANARY]")
            );
            executor.push_units(&canaried)?;
            self.monitor_phase(&mut executor, &canaried)?;
        }

        if !main.is_empty() {
            println!(
                "{} Pushing remaining units...",
                emoji(&self.output, "🚀", "[PUSH]")
            );
            executor.push_units(&main)?;
            self.monitor_phase(&mut executor, &main)?;
        }

        println!(
            "{} Deployment complete.",
            emoji(&self.output, "✅", "[DONE]")
        );
        Ok(())
    }

    fn monitor_phase(
        &self,
        executor: &mut PushExecutor<'_>,
        units: &[&DeployableUnit],
    ) -> Result<()> {
        monitor::monitor(
            units,
            self.options.dry_run,
            self.options.min_uptime,
            self.options.poll_interval,
            || monitor::sample_uptimes(executor, units, Utc::now()),
            self.sleeper,
        )
    }

    fn print_plan(&self) {
        if !self.canaried.is_empty() {
            println!("Canary units:");
            for unit in &self.canaried {
                println!("  {}  ->  {}", unit.id.canonical_name(), unit.cluster());
            }
        }
        if !self.main.is_empty() {
            println!("Units:");
            for unit in &self.main {
                println!("  {}  ->  {}", unit.id.canonical_name(), unit.cluster());
            }
        }
        if self.options.dry_run {
            println!("DRY RUN MODE - nothing will be committed or pushed.");
        }
    }
}
