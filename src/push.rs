//! # Cluster Push Execution
//!
//! Applies regenerated ConfigMaps and deployment manifests to the
//! active cluster, switching credentials only when the target cluster
//! actually changes.
//!
//! The executor owns the run's only piece of shared mutable state: the
//! currently active cluster context, which is process-wide state for
//! the underlying cluster tooling. All cluster-scoped calls are
//! serialized through one executor, so that state is never read or
//! written concurrently.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::catalog::{ConfigMapSource, ConfigMapSpec, DeployableUnit, Instance};
use crate::cluster::Cluster;
use crate::error::{Error, Result};
use crate::exec::{argv, CommandRunner};

/// Projection for `kubectl get pods`: per pod, its owning app label and
/// the timestamp its single container most recently entered the running
/// state. Go templates print `<no value>` for pods that are not
/// running.
const POD_LISTING_TEMPLATE: &str = "{{range .items}}{{.metadata.labels.app}} \
{{(index .status.containerStatuses 0).state.running.startedAt}}{{\"\\n\"}}{{end}}";

/// Pushes units to their target clusters, one at a time.
pub struct PushExecutor<'a> {
    runner: &'a dyn CommandRunner,
    checkout_root: PathBuf,
    source_root: PathBuf,
    dry_run: bool,
    current: Option<Cluster>,
    /// (cluster, instance) pairs whose ConfigMap has been replaced
    /// during this run.
    pushed_config_maps: HashSet<(Cluster, Instance)>,
}

impl<'a> PushExecutor<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        checkout_root: &Path,
        source_root: &Path,
        dry_run: bool,
    ) -> Self {
        Self {
            runner,
            checkout_root: checkout_root.to_path_buf(),
            source_root: source_root.to_path_buf(),
            dry_run,
            current: None,
            pushed_config_maps: HashSet::new(),
        }
    }

    /// The cluster whose credentials are currently active, if any.
    pub fn current_cluster(&self) -> Option<Cluster> {
        self.current
    }

    /// Makes `cluster` the active cluster context.
    ///
    /// No external call is made when `cluster` is already active. A
    /// failed switch leaves the active context unchanged.
    pub fn switch(&mut self, cluster: Cluster) -> Result<()> {
        if self.current == Some(cluster) {
            return Ok(());
        }

        let args = argv([
            "container",
            "clusters",
            "get-credentials",
            cluster.name(),
            "--zone",
            cluster.zone(),
            "--project",
            cluster.project(),
        ]);
        let output = self.runner.run("gcloud", &args)?;
        if !output.success {
            return Err(Error::ClusterSwitch {
                cluster: cluster.name().to_string(),
                stderr: output.stderr.trim().to_string(),
            });
        }

        log::info!("switched to cluster {}", cluster);
        self.current = Some(cluster);
        Ok(())
    }

    /// Pushes each unit in order. In dry-run mode the intent is printed
    /// and zero external commands are issued.
    pub fn push_units(&mut self, units: &[&DeployableUnit]) -> Result<()> {
        for unit in units {
            self.push_unit(unit)?;
        }
        Ok(())
    }

    /// Pushes one unit: switch to its cluster, replace its ConfigMap if
    /// it declares one (at most once per (cluster, instance) pair per
    /// run), then apply its deployment manifest.
    pub fn push_unit(&mut self, unit: &DeployableUnit) -> Result<()> {
        let cluster = unit.cluster();
        let name = unit.id.canonical_name();

        if self.dry_run {
            println!("Would push {} to {}.", name, cluster);
            return Ok(());
        }

        self.switch(cluster)?;

        if let Some(spec) = unit.options.config_map(&unit.id)? {
            let key = (cluster, unit.id.instance.clone());
            if !self.pushed_config_maps.contains(&key) {
                self.replace_config_map(unit, &spec, cluster)?;
                self.pushed_config_maps.insert(key);
            }
        }

        let manifest = self
            .checkout_root
            .join(cluster.config_dir())
            .join(format!("{}.yaml", name));
        self.kubectl(
            argv(["apply".to_string(), "-f".to_string(), manifest.display().to_string()]),
            &name,
        )?;

        println!("Pushed {} to {}.", name, cluster);
        Ok(())
    }

    /// Deletes any existing ConfigMap of the unit's name and creates it
    /// fresh from the unit's source or generated file.
    fn replace_config_map(
        &mut self,
        unit: &DeployableUnit,
        spec: &ConfigMapSpec,
        cluster: Cluster,
    ) -> Result<()> {
        let name = unit.id.canonical_name();

        let delete = argv(["delete".to_string(), "configmap".to_string(), spec.name.clone()]);
        let output = self.runner.run("kubectl", &delete)?;
        if !output.success {
            // kubectl reports exit status 1 when the resource does not
            // exist, which is benign here.
            if output.code == Some(1) {
                log::info!("ConfigMap {} not present in {}, nothing to delete", spec.name, cluster);
            } else {
                return Err(Error::ClusterCommand {
                    command: delete.join(" "),
                    context: name,
                    stderr: output.stderr.trim().to_string(),
                });
            }
        }

        let source = match &spec.source {
            ConfigMapSource::File(path) => self.source_root.join(path),
            ConfigMapSource::Template(_) => self
                .checkout_root
                .join(cluster.config_dir())
                .join(format!("{}.json5", spec.name)),
        };
        self.kubectl(
            argv([
                "create".to_string(),
                "configmap".to_string(),
                spec.name.clone(),
                format!("--from-file={}", source.display()),
            ]),
            &name,
        )?;

        Ok(())
    }

    /// Switches to `cluster` and returns the raw pod listing used by
    /// the uptime monitor: one line per pod, with the pod's app label
    /// and the timestamp its container most recently entered the
    /// running state (or the `<no value>` sentinel).
    pub fn list_pods(&mut self, cluster: Cluster) -> Result<String> {
        self.switch(cluster)?;
        self.kubectl(
            argv([
                "get".to_string(),
                "pods".to_string(),
                "-o".to_string(),
                "go-template".to_string(),
                "--template".to_string(),
                POD_LISTING_TEMPLATE.to_string(),
            ]),
            cluster.name(),
        )
    }

    /// Runs one kubectl command against the active cluster, failing
    /// loudly on a non-zero exit.
    fn kubectl(&self, args: Vec<String>, context: &str) -> Result<String> {
        let output = self.runner.run("kubectl", &args)?;
        if !output.success {
            return Err(Error::ClusterCommand {
                command: args.join(" "),
                context: context.to_string(),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}
