//! # Config Regeneration
//!
//! Drives the external template expander (`kube-conf-gen`) to rebuild
//! each unit's deployment manifest — and, for template-sourced
//! ConfigMaps, the ConfigMap file — inside the configuration checkout.
//!
//! The expander is handed three configuration layers in a fixed order
//! (shared, instance-wide, unit-specific), an `INSTANCE_ID` and `NOW`
//! binding, and runs in strict mode with automatic string coercion of
//! parsed values disabled. Units are processed canaried-first, each
//! group in catalog order, so repeated runs produce identical command
//! sequences.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::catalog::{ConfigMapSource, DeployableUnit};
use crate::error::{Error, Result};
use crate::exec::{argv, CommandRunner};

/// The external template expander binary.
const EXPANDER: &str = "kube-conf-gen";

/// Timestamp format for the `NOW` template binding. Colons are not
/// filesystem-safe in every context the expanded value ends up in.
const NOW_FORMAT: &str = "%Y-%m-%dT%H_%M_%SZ";

/// Inputs shared by every regeneration in one run.
pub struct RegenContext<'a> {
    /// Root of the shared/instance/unit configuration layers and
    /// templates.
    pub source_root: &'a Path,
    /// Root of the configuration-repository checkout the generated
    /// files are written into.
    pub checkout_root: &'a Path,
    /// The timestamp bound to `NOW`. Injected so tests produce
    /// byte-identical command sequences.
    pub now: DateTime<Utc>,
}

/// Regenerates configs for all units of a run: canaried units first,
/// then main units, each in catalog order.
///
/// Catalog invariants (a ConfigMap declared without a valid source) are
/// checked for every unit before any external tool is invoked.
pub fn regenerate(
    runner: &dyn CommandRunner,
    canaried: &[&DeployableUnit],
    main: &[&DeployableUnit],
    ctx: &RegenContext,
) -> Result<()> {
    for unit in canaried.iter().chain(main.iter()).copied() {
        unit.options.config_map(&unit.id)?;
    }

    for unit in canaried.iter().chain(main.iter()).copied() {
        regenerate_unit(runner, unit, ctx)?;
    }
    Ok(())
}

/// Regenerates one unit's deployment manifest and, when its ConfigMap
/// is template-sourced, its ConfigMap file.
pub fn regenerate_unit(
    runner: &dyn CommandRunner,
    unit: &DeployableUnit,
    ctx: &RegenContext,
) -> Result<()> {
    let out_dir = ctx.checkout_root.join(unit.cluster().config_dir());
    fs::create_dir_all(&out_dir)?;

    let manifest_template = ctx
        .source_root
        .join("templates")
        .join(format!("gold-{}-template.yaml", unit.id.service));
    let manifest_out = out_dir.join(format!("{}.yaml", unit.id.canonical_name()));
    expand(runner, unit, ctx, &manifest_template, &manifest_out)?;

    if let Some(spec) = unit.options.config_map(&unit.id)? {
        if let ConfigMapSource::Template(template) = &spec.source {
            let config_map_out = out_dir.join(format!("{}.json5", spec.name));
            expand(
                runner,
                unit,
                ctx,
                &ctx.source_root.join(template),
                &config_map_out,
            )?;
        }
    }

    Ok(())
}

/// One expander invocation: layered configs, bindings, strict flags,
/// template in, generated file out.
fn expand(
    runner: &dyn CommandRunner,
    unit: &DeployableUnit,
    ctx: &RegenContext,
    template: &Path,
    output: &Path,
) -> Result<()> {
    let instance = &unit.id.instance;
    let instance_dir = ctx.source_root.join("instances").join(instance.as_str());

    let args = argv([
        "-c".to_string(),
        ctx.source_root
            .join("config")
            .join("gold-common.json5")
            .display()
            .to_string(),
        "-c".to_string(),
        instance_dir.join(format!("{}.json5", instance)).display().to_string(),
        "-c".to_string(),
        instance_dir
            .join(format!("{}-{}.json5", instance, unit.id.service))
            .display()
            .to_string(),
        "-extra".to_string(),
        format!("INSTANCE_ID:{}", instance),
        "-extra".to_string(),
        format!("NOW:{}", ctx.now.format(NOW_FORMAT)),
        "-strict".to_string(),
        "-parse_conf=false".to_string(),
        "-t".to_string(),
        template.display().to_string(),
        "-o".to_string(),
        output.display().to_string(),
    ]);

    let result = runner.run(EXPANDER, &args).map_err(|e| Error::Regeneration {
        unit: unit.id.canonical_name(),
        output: output.to_path_buf(),
        message: e.to_string(),
    })?;

    if !result.success {
        let message = if result.stderr.trim().is_empty() {
            format!("exit code {:?}", result.code)
        } else {
            result.stderr.trim().to_string()
        };
        return Err(Error::Regeneration {
            unit: unit.id.canonical_name(),
            output: output.to_path_buf(),
            message,
        });
    }

    log::info!("regenerated {}", output.display());
    Ok(())
}
