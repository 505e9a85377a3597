//! # Uptime Monitoring
//!
//! After a phase of units has been pushed, the orchestrator blocks here
//! until every unit in the phase has been continuously up for longer
//! than the configured minimum.
//!
//! The loop's two effects — sampling the clusters and sleeping between
//! polls — are injected as closures, so the cadence and termination
//! logic are exercised deterministically in tests with scripted inputs
//! and no real clock or cluster. Production wiring passes
//! [`sample_uptimes`] and `std::thread::sleep`.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::catalog::{DeployableUnit, DeployableUnitId};
use crate::cluster::Cluster;
use crate::error::{Error, Result};
use crate::push::PushExecutor;

/// Latest sampled continuous uptime per unit. A unit is absent when it
/// has no running pods (or no pods at all).
pub type UptimeMap = HashMap<DeployableUnitId, Duration>;

/// Warm-up delay before the first sample, giving freshly applied
/// manifests time to create pods. Distinct from the steady poll
/// interval.
const INITIAL_DELAY: Duration = Duration::from_secs(10);

/// Blocks until every unit's latest sampled uptime strictly exceeds
/// `min_uptime`.
///
/// In dry-run mode this returns immediately and invokes neither
/// `sample` nor `sleep`.
pub fn monitor<S, D>(
    units: &[&DeployableUnit],
    dry_run: bool,
    min_uptime: Duration,
    poll_interval: Duration,
    mut sample: S,
    mut sleep: D,
) -> Result<()>
where
    S: FnMut() -> Result<UptimeMap>,
    D: FnMut(Duration),
{
    if dry_run {
        println!("Skipping monitoring (dry-run).");
        return Ok(());
    }
    if units.is_empty() {
        return Ok(());
    }

    println!(
        "Monitoring {} unit(s) until uptime exceeds {}.",
        units.len(),
        humantime::format_duration(min_uptime)
    );

    let name_width = units
        .iter()
        .map(|u| u.id.canonical_name().len())
        .max()
        .unwrap_or(0);

    let mut first = true;
    loop {
        sleep(if first { INITIAL_DELAY } else { poll_interval });
        first = false;

        let uptimes = sample()?;
        for unit in units {
            let uptime = uptimes.get(&unit.id);
            let uptime_str = match uptime {
                Some(d) => format_uptime(*d),
                None => "<None>".to_string(),
            };
            let ready = uptime.is_some_and(|d| *d > min_uptime);
            println!(
                "{:>12}  {:>5}  {}",
                uptime_str,
                if ready { "yes" } else { "no" },
                unit.id.canonical_name()
            );
        }
        println!("{}", "-".repeat(name_width + 21));

        let all_ready = units
            .iter()
            .all(|u| uptimes.get(&u.id).is_some_and(|d| *d > min_uptime));
        if all_ready {
            break;
        }
    }

    Ok(())
}

/// Samples current uptimes for `units`, grouped by target cluster.
///
/// For each cluster with at least one unit, switches to it and issues
/// one pod-listing command. A unit is present in the result only if it
/// has at least one matching pod and none of its matching pods report
/// "not running"; its uptime is the minimum across its matching pods —
/// the worst pod determines the unit's readiness.
pub fn sample_uptimes(
    executor: &mut PushExecutor<'_>,
    units: &[&DeployableUnit],
    now: DateTime<Utc>,
) -> Result<UptimeMap> {
    let mut uptimes = UptimeMap::new();

    for cluster in Cluster::ALL {
        let in_cluster: Vec<&DeployableUnit> = units
            .iter()
            .copied()
            .filter(|u| u.cluster() == cluster)
            .collect();
        if in_cluster.is_empty() {
            continue;
        }

        let listing = executor.list_pods(cluster)?;
        parse_pod_listing(cluster, &listing, &in_cluster, now, &mut uptimes)?;
    }

    Ok(uptimes)
}

/// Parses one cluster's pod listing into `uptimes`. Every line must
/// parse; pods whose app label matches no monitored unit are ignored.
fn parse_pod_listing(
    cluster: Cluster,
    listing: &str,
    units: &[&DeployableUnit],
    now: DateTime<Utc>,
    uptimes: &mut UptimeMap,
) -> Result<()> {
    let mut not_running: HashSet<DeployableUnitId> = HashSet::new();

    for line in listing.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (app, timestamp) = line.split_once(' ').ok_or_else(|| Error::PodListing {
            cluster: cluster.name().to_string(),
            line: line.to_string(),
            message: "missing timestamp column".to_string(),
        })?;

        let Some(unit) = units.iter().find(|u| u.id.canonical_name() == app) else {
            continue;
        };

        let timestamp = timestamp.trim();
        if timestamp == "<no value>" {
            not_running.insert(unit.id.clone());
            continue;
        }

        let started = DateTime::parse_from_rfc3339(timestamp).map_err(|e| Error::PodListing {
            cluster: cluster.name().to_string(),
            line: line.to_string(),
            message: e.to_string(),
        })?;
        let uptime = (now - started.with_timezone(&Utc)).to_std().unwrap_or_default();

        uptimes
            .entry(unit.id.clone())
            .and_modify(|d| *d = (*d).min(uptime))
            .or_insert(uptime);
    }

    // A unit with any non-running pod is not considered up at all.
    for id in not_running {
        uptimes.remove(&id);
    }

    Ok(())
}

/// Formats an uptime for the readiness table, truncated to whole
/// seconds.
fn format_uptime(uptime: Duration) -> String {
    humantime::format_duration(Duration::from_secs(uptime.as_secs())).to_string()
}
