//! # Gold Deploy Library
//!
//! This library implements the deployment orchestrator for the fleet of
//! Gold backend services. It takes a declared catalog of
//! instance/service pairs ("deployable units"), regenerates their
//! Kubernetes manifests from templates, publishes the manifests to a
//! version-controlled configuration repository, and rolls them out to
//! one of two clusters — canaries first, then the remainder — while
//! monitoring each phase until the new workloads have been stably up
//! for a minimum duration.
//!
//! ## Quick Example
//!
//! ```
//! use gold_deploy::catalog::{CatalogRules, DeployableUnitSet};
//!
//! // Build the production catalog from its explicit rule tables.
//! let catalog = DeployableUnitSet::production(&CatalogRules::production());
//!
//! // Resolve a unit and derive its canonical name, used as the
//! // Deployment/ConfigMap name and pod app label in the cluster.
//! let unit = catalog.resolve("skia:diffcalculator").unwrap();
//! assert_eq!(unit.id.canonical_name(), "gold-skia-diffcalculator");
//! ```
//!
//! ## Core Concepts
//!
//! - **Catalog (`catalog`)**: pure data — the known instances and
//!   services, and the concrete ordered collection of deployable units
//!   with their per-unit deployment metadata.
//! - **Config Regeneration (`regen`)**: drives the external template
//!   expander to rebuild each unit's manifest (and templated ConfigMap)
//!   inside the configuration checkout.
//! - **Repository Management (`repo`)**: clones the configuration
//!   repository into a scoped temporary checkout and, subject to
//!   operator confirmation, commits and pushes the regenerated configs.
//! - **Push Execution (`push`)**: tracks the active cluster context,
//!   switching credentials only when needed, and applies ConfigMaps and
//!   manifests per unit.
//! - **Uptime Monitoring (`monitor`)**: polls pod status and blocks
//!   until every unit in a phase exceeds the minimum continuous uptime.
//! - **Orchestration (`orchestrator`)**: composes the above into the
//!   full pipeline with deterministic command ordering.
//!
//! ## Execution Flow
//!
//! The `orchestrator` executes the following high-level steps:
//!
//! 1.  **Confirm**: show the plan and ask the operator to proceed.
//! 2.  **Checkout**: clone the configuration repository into a
//!     temporary directory.
//! 3.  **Regenerate**: rebuild configs for canaried units first, then
//!     main units, each in catalog order.
//! 4.  **Commit/Push**: publish the regenerated configs, gated on a
//!     second confirmation (skipped in dry-run/no-commit mode).
//! 5.  **Canary Phase**: push canaried units and monitor them until
//!     stable.
//! 6.  **Main Phase**: push the remaining units and monitor them.
//! 7.  **Cleanup**: remove the checkout — on every exit path.
//!
//! All external tools (git, the template expander, the cluster
//! credential tool, kubectl) are invoked through the `exec` seam so the
//! exact command sequences are testable without real infrastructure.

pub mod catalog;
pub mod cluster;
pub mod error;
pub mod exec;
pub mod monitor;
pub mod orchestrator;
pub mod push;
pub mod regen;
pub mod repo;
pub mod ui;
