//! # Deployable Unit Catalog
//!
//! Pure data model for the fleet: which instances exist, which services
//! they run, and the per-unit deployment metadata. The catalog is built
//! once at process start by [`DeployableUnitSet::production`] and is
//! read-only for the remainder of a run.
//!
//! The build rules (which instances are public-view, which get a
//! baseline server, which instance is internal) are threaded in as an
//! explicit [`CatalogRules`] value rather than held in module-level
//! state, so production and test fixtures can coexist.

use std::fmt;
use std::path::PathBuf;

use crate::cluster::Cluster;
use crate::error::{Error, Result};

/// Known production instance identifiers.
pub mod instance_ids {
    pub const CHROME: &str = "chrome";
    pub const CHROME_PUBLIC: &str = "chrome-public";
    pub const FLUTTER: &str = "flutter";
    pub const FUCHSIA: &str = "fuchsia";
    pub const LOTTIE: &str = "lottie";
    pub const PDFIUM: &str = "pdfium";
    pub const SKIA: &str = "skia";
    pub const SKIA_INFRA: &str = "skia-infra";
}

/// Known production service identifiers.
pub mod service_ids {
    pub const BASELINESERVER: &str = "baselineserver";
    pub const DIFFCALCULATOR: &str = "diffcalculator";
    pub const FRONTEND: &str = "frontend";
    pub const INGESTION: &str = "ingestion";
}

/// Identifier for one product deployment (e.g. "skia", "chrome-public").
///
/// Compared by value. The set of valid identifiers is a property of the
/// catalog, not of this type: the concrete catalog is partly data-driven,
/// so membership is a runtime check via
/// [`DeployableUnitSet::is_known_instance`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Instance(String);

impl Instance {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier for a logical microservice role (e.g. "frontend").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Service(String);

impl Service {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The (instance, service) pair that identifies one deployable unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeployableUnitId {
    pub instance: Instance,
    pub service: Service,
}

impl DeployableUnitId {
    pub fn new(instance: Instance, service: Service) -> Self {
        Self { instance, service }
    }

    /// The unit's canonical name, used as the human label and as the
    /// Deployment/ConfigMap name and pod app label in the cluster.
    pub fn canonical_name(&self) -> String {
        format!("gold-{}-{}", self.instance, self.service)
    }
}

impl fmt::Display for DeployableUnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_name())
    }
}

/// Per-unit deployment metadata.
///
/// A unit needs a ConfigMap when any of the three `config_map_*` fields
/// is set; [`DeploymentOptions::config_map`] validates the combination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentOptions {
    /// Whether the unit targets the restricted corp cluster.
    pub internal: bool,
    /// Name of the ConfigMap attached to the unit, if any.
    pub config_map_name: Option<String>,
    /// Static source file for the ConfigMap, relative to the source root.
    pub config_map_file: Option<PathBuf>,
    /// Template the ConfigMap is generated from, relative to the source
    /// root. Mutually exclusive with `config_map_file`.
    pub config_map_template: Option<PathBuf>,
}

/// Where a unit's ConfigMap contents come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigMapSource {
    /// A static file under the source root.
    File(PathBuf),
    /// A template under the source root, expanded during config
    /// regeneration.
    Template(PathBuf),
}

/// A validated ConfigMap declaration: a non-empty name plus exactly one
/// source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigMapSpec {
    pub name: String,
    pub source: ConfigMapSource,
}

impl DeploymentOptions {
    /// Whether any ConfigMap field is set at all.
    pub fn needs_config_map(&self) -> bool {
        self.config_map_name.is_some()
            || self.config_map_file.is_some()
            || self.config_map_template.is_some()
    }

    /// Validates and returns the unit's ConfigMap declaration.
    ///
    /// Returns `Ok(None)` when no ConfigMap field is set. A partially
    /// specified declaration (missing name, missing source, or both a
    /// file and a template) is a catalog-invariant violation and yields
    /// [`Error::ConfigMapSettings`], attributed to `unit`.
    pub fn config_map(&self, unit: &DeployableUnitId) -> Result<Option<ConfigMapSpec>> {
        if !self.needs_config_map() {
            return Ok(None);
        }

        let name = match self.config_map_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                return Err(Error::ConfigMapSettings {
                    unit: unit.canonical_name(),
                    message: "ConfigMap name is missing".to_string(),
                })
            }
        };

        let source = match (&self.config_map_file, &self.config_map_template) {
            (Some(file), None) => ConfigMapSource::File(file.clone()),
            (None, Some(template)) => ConfigMapSource::Template(template.clone()),
            (Some(_), Some(_)) => {
                return Err(Error::ConfigMapSettings {
                    unit: unit.canonical_name(),
                    message: "both a source file and a template are set".to_string(),
                })
            }
            (None, None) => {
                return Err(Error::ConfigMapSettings {
                    unit: unit.canonical_name(),
                    message: "neither a source file nor a template is set".to_string(),
                })
            }
        };

        Ok(Some(ConfigMapSpec { name, source }))
    }
}

/// One deployable unit: an id plus its deployment metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployableUnit {
    pub id: DeployableUnitId,
    pub options: DeploymentOptions,
}

impl DeployableUnit {
    /// The cluster this unit is deployed to.
    pub fn cluster(&self) -> Cluster {
        if self.options.internal {
            Cluster::Corp
        } else {
            Cluster::Public
        }
    }
}

/// The catalog: the declared instances and services, and the concrete
/// ordered collection of deployable units.
///
/// Unit identity is unique by [`DeployableUnitId`]; inserting a unit
/// with an existing id overwrites it in place, preserving insertion
/// order otherwise.
#[derive(Debug, Clone, Default)]
pub struct DeployableUnitSet {
    known_instances: Vec<Instance>,
    known_services: Vec<Service>,
    units: Vec<DeployableUnit>,
}

impl DeployableUnitSet {
    /// Creates an empty catalog with the given declared instances and
    /// services.
    pub fn new(known_instances: Vec<Instance>, known_services: Vec<Service>) -> Self {
        Self {
            known_instances,
            known_services,
            units: Vec::new(),
        }
    }

    /// Builds the production catalog from the given rule tables.
    ///
    /// Every non-public-view instance receives the baseline bundle
    /// (diffcalculator, frontend, ingestion); public-view instances
    /// receive only the frontend; instances in
    /// `with_baseline_server` additionally receive a baseline server;
    /// the internal instance is routed to the corp cluster and its
    /// ingestion unit gets a templated ConfigMap. Deterministic given
    /// the same rules.
    pub fn production(rules: &CatalogRules) -> Self {
        let mut set = Self::new(rules.instances.clone(), rules.services.clone());

        for instance in &rules.instances {
            if rules.public_view.contains(instance) {
                set.add(instance.clone(), Service::new(service_ids::FRONTEND));
                continue;
            }

            let internal = *instance == rules.internal_instance;
            let base = DeploymentOptions {
                internal,
                ..DeploymentOptions::default()
            };

            set.add_with_options(
                instance.clone(),
                Service::new(service_ids::DIFFCALCULATOR),
                base.clone(),
            );
            set.add_with_options(
                instance.clone(),
                Service::new(service_ids::FRONTEND),
                base.clone(),
            );

            let ingestion_options = if internal {
                DeploymentOptions {
                    internal,
                    config_map_name: Some(format!("gold-{}-ingestion-config", instance)),
                    config_map_template: Some(rules.ingestion_config_template.clone()),
                    ..DeploymentOptions::default()
                }
            } else {
                base.clone()
            };
            set.add_with_options(
                instance.clone(),
                Service::new(service_ids::INGESTION),
                ingestion_options,
            );

            if rules.with_baseline_server.contains(instance) {
                set.add_with_options(
                    instance.clone(),
                    Service::new(service_ids::BASELINESERVER),
                    base,
                );
            }
        }

        set
    }

    /// Inserts a unit with default options, overwriting any unit with
    /// the same id.
    pub fn add(&mut self, instance: Instance, service: Service) {
        self.add_with_options(instance, service, DeploymentOptions::default());
    }

    /// Inserts a unit with the given options, overwriting in place any
    /// unit with the same id.
    pub fn add_with_options(
        &mut self,
        instance: Instance,
        service: Service,
        options: DeploymentOptions,
    ) {
        let unit = DeployableUnit {
            id: DeployableUnitId::new(instance, service),
            options,
        };
        match self.units.iter_mut().find(|u| u.id == unit.id) {
            Some(existing) => *existing = unit,
            None => self.units.push(unit),
        }
    }

    /// Looks up a unit by id. Never panics.
    pub fn get(&self, id: &DeployableUnitId) -> Option<&DeployableUnit> {
        self.units.iter().find(|u| &u.id == id)
    }

    /// Whether `instance` is in the declared instance catalog,
    /// independent of which units were actually instantiated.
    pub fn is_known_instance(&self, instance: &Instance) -> bool {
        self.known_instances.contains(instance)
    }

    /// Whether `service` is in the declared service catalog.
    pub fn is_known_service(&self, service: &Service) -> bool {
        self.known_services.contains(service)
    }

    /// The units in insertion order.
    pub fn units(&self) -> &[DeployableUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Resolves a `<instance>:<service>` selector against the catalog.
    ///
    /// Rejects stray identifiers with a specific error: an unknown
    /// instance, an unknown service, or a known pair the catalog does
    /// not deploy.
    pub fn resolve(&self, selector: &str) -> Result<&DeployableUnit> {
        let (instance, service) = selector.split_once(':').ok_or(Error::InvalidSelector {
            selector: selector.to_string(),
        })?;
        if instance.is_empty() || service.is_empty() {
            return Err(Error::InvalidSelector {
                selector: selector.to_string(),
            });
        }

        let instance = Instance::new(instance);
        let service = Service::new(service);
        if !self.is_known_instance(&instance) {
            return Err(Error::UnknownInstance {
                name: instance.to_string(),
            });
        }
        if !self.is_known_service(&service) {
            return Err(Error::UnknownService {
                name: service.to_string(),
            });
        }

        let id = DeployableUnitId::new(instance, service);
        self.get(&id).ok_or(Error::UnknownUnit {
            name: id.canonical_name(),
        })
    }
}

/// Explicit rule tables for building the production catalog.
///
/// Threaded into [`DeployableUnitSet::production`] as a parameter so
/// variants (production, test fixtures) can coexist.
#[derive(Debug, Clone)]
pub struct CatalogRules {
    /// Every known instance.
    pub instances: Vec<Instance>,
    /// Every known service.
    pub services: Vec<Service>,
    /// Instances that only serve baselines publicly: frontend only.
    pub public_view: Vec<Instance>,
    /// Instances that run a baseline server in addition to the bundle.
    pub with_baseline_server: Vec<Instance>,
    /// The one instance whose services run in the corp cluster.
    pub internal_instance: Instance,
    /// Template for the internal instance's ingestion ConfigMap,
    /// relative to the source root.
    pub ingestion_config_template: PathBuf,
}

impl CatalogRules {
    /// The production rule tables.
    pub fn production() -> Self {
        use instance_ids::*;
        Self {
            instances: [
                CHROME,
                CHROME_PUBLIC,
                FLUTTER,
                FUCHSIA,
                LOTTIE,
                PDFIUM,
                SKIA,
                SKIA_INFRA,
            ]
            .into_iter()
            .map(Instance::new)
            .collect(),
            services: [
                service_ids::BASELINESERVER,
                service_ids::DIFFCALCULATOR,
                service_ids::FRONTEND,
                service_ids::INGESTION,
            ]
            .into_iter()
            .map(Service::new)
            .collect(),
            public_view: [CHROME_PUBLIC, SKIA_INFRA].into_iter().map(Instance::new).collect(),
            with_baseline_server: [CHROME, FLUTTER].into_iter().map(Instance::new).collect(),
            internal_instance: Instance::new(FUCHSIA),
            ingestion_config_template: PathBuf::from("templates/ingestion-config-template.json5"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn production_set() -> DeployableUnitSet {
        DeployableUnitSet::production(&CatalogRules::production())
    }

    fn id(instance: &str, service: &str) -> DeployableUnitId {
        DeployableUnitId::new(Instance::new(instance), Service::new(service))
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(
            id("skia", "diffcalculator").canonical_name(),
            "gold-skia-diffcalculator"
        );
    }

    #[test]
    fn test_production_baseline_bundle() {
        let set = production_set();

        // Non-public-view instances get the full bundle.
        for service in [
            service_ids::DIFFCALCULATOR,
            service_ids::FRONTEND,
            service_ids::INGESTION,
        ] {
            assert!(
                set.get(&id("skia", service)).is_some(),
                "skia missing {}",
                service
            );
        }

        // Public-view instances get exactly the frontend.
        assert!(set.get(&id("chrome-public", service_ids::FRONTEND)).is_some());
        assert!(set.get(&id("chrome-public", service_ids::DIFFCALCULATOR)).is_none());
        assert!(set.get(&id("chrome-public", service_ids::INGESTION)).is_none());
    }

    #[test]
    fn test_production_baseline_server_subset() {
        let set = production_set();
        assert!(set.get(&id("chrome", service_ids::BASELINESERVER)).is_some());
        assert!(set.get(&id("flutter", service_ids::BASELINESERVER)).is_some());
        assert!(set.get(&id("skia", service_ids::BASELINESERVER)).is_none());
    }

    #[test]
    fn test_production_internal_instance() {
        let set = production_set();

        let ingestion = set.get(&id("fuchsia", service_ids::INGESTION)).unwrap();
        assert!(ingestion.options.internal);
        assert_eq!(ingestion.cluster(), Cluster::Corp);
        let spec = ingestion.options.config_map(&ingestion.id).unwrap().unwrap();
        assert_eq!(spec.name, "gold-fuchsia-ingestion-config");
        assert!(matches!(spec.source, ConfigMapSource::Template(_)));

        // Every fuchsia unit is routed to the corp cluster, with only
        // ingestion carrying a ConfigMap.
        let frontend = set.get(&id("fuchsia", service_ids::FRONTEND)).unwrap();
        assert_eq!(frontend.cluster(), Cluster::Corp);
        assert!(!frontend.options.needs_config_map());

        // Everything else stays public.
        let skia = set.get(&id("skia", service_ids::FRONTEND)).unwrap();
        assert_eq!(skia.cluster(), Cluster::Public);
    }

    #[test]
    fn test_production_config_maps_all_valid() {
        let set = production_set();
        for unit in set.units() {
            let spec = unit.options.config_map(&unit.id).unwrap();
            assert_eq!(spec.is_some(), unit.options.needs_config_map());
            if let Some(spec) = spec {
                assert!(!spec.name.is_empty());
            }
        }
    }

    #[test]
    fn test_add_with_options_then_get_roundtrip() {
        let mut set = DeployableUnitSet::new(
            vec![Instance::new("skia")],
            vec![Service::new("frontend")],
        );
        let options = DeploymentOptions {
            internal: true,
            ..DeploymentOptions::default()
        };
        set.add_with_options(Instance::new("skia"), Service::new("frontend"), options.clone());

        let unit = set.get(&id("skia", "frontend")).unwrap();
        assert_eq!(unit.options, options);
    }

    #[test]
    fn test_add_with_options_overwrites_in_place() {
        let mut set = DeployableUnitSet::new(
            vec![Instance::new("skia"), Instance::new("chrome")],
            vec![Service::new("frontend")],
        );
        set.add(Instance::new("skia"), Service::new("frontend"));
        set.add(Instance::new("chrome"), Service::new("frontend"));
        assert_eq!(set.len(), 2);

        let replacement = DeploymentOptions {
            internal: true,
            ..DeploymentOptions::default()
        };
        set.add_with_options(
            Instance::new("skia"),
            Service::new("frontend"),
            replacement.clone(),
        );

        // Size unchanged, options replaced, insertion order preserved.
        assert_eq!(set.len(), 2);
        assert_eq!(set.units()[0].id, id("skia", "frontend"));
        assert_eq!(set.units()[0].options, replacement);
        assert_eq!(set.units()[1].id, id("chrome", "frontend"));
    }

    #[test]
    fn test_get_missing_returns_none() {
        let set = production_set();
        assert!(set.get(&id("skia", "no-such-service")).is_none());
    }

    #[test]
    fn test_known_membership_checks() {
        let set = production_set();
        assert!(set.is_known_instance(&Instance::new("skia")));
        assert!(!set.is_known_instance(&Instance::new("skai")));
        assert!(set.is_known_service(&Service::new("frontend")));
        assert!(!set.is_known_service(&Service::new("frontends")));
    }

    #[test]
    fn test_config_map_requires_exactly_one_source() {
        let unit_id = id("fuchsia", "ingestion");

        let no_source = DeploymentOptions {
            config_map_name: Some("gold-fuchsia-ingestion-config".to_string()),
            ..DeploymentOptions::default()
        };
        assert!(matches!(
            no_source.config_map(&unit_id),
            Err(Error::ConfigMapSettings { .. })
        ));

        let both_sources = DeploymentOptions {
            config_map_name: Some("gold-fuchsia-ingestion-config".to_string()),
            config_map_file: Some(PathBuf::from("config/ingestion.json5")),
            config_map_template: Some(PathBuf::from("templates/ingestion.json5")),
            ..DeploymentOptions::default()
        };
        assert!(matches!(
            both_sources.config_map(&unit_id),
            Err(Error::ConfigMapSettings { .. })
        ));

        let no_name = DeploymentOptions {
            config_map_file: Some(PathBuf::from("config/ingestion.json5")),
            ..DeploymentOptions::default()
        };
        assert!(matches!(
            no_name.config_map(&unit_id),
            Err(Error::ConfigMapSettings { .. })
        ));

        let valid = DeploymentOptions {
            config_map_name: Some("gold-fuchsia-ingestion-config".to_string()),
            config_map_file: Some(PathBuf::from("config/ingestion.json5")),
            ..DeploymentOptions::default()
        };
        let spec = valid.config_map(&unit_id).unwrap().unwrap();
        assert_eq!(
            spec.source,
            ConfigMapSource::File(PathBuf::from("config/ingestion.json5"))
        );
    }

    #[test]
    fn test_config_map_absent_when_no_fields_set() {
        let unit_id = id("skia", "frontend");
        assert_eq!(
            DeploymentOptions::default().config_map(&unit_id).unwrap(),
            None
        );
    }

    #[test]
    fn test_resolve_selector() {
        let set = production_set();

        let unit = set.resolve("skia:frontend").unwrap();
        assert_eq!(unit.id.canonical_name(), "gold-skia-frontend");

        assert!(matches!(
            set.resolve("skia-frontend"),
            Err(Error::InvalidSelector { .. })
        ));
        assert!(matches!(
            set.resolve("skai:frontend"),
            Err(Error::UnknownInstance { .. })
        ));
        assert!(matches!(
            set.resolve("skia:frontends"),
            Err(Error::UnknownService { .. })
        ));
        // Known pair that the catalog does not deploy.
        assert!(matches!(
            set.resolve("chrome-public:ingestion"),
            Err(Error::UnknownUnit { .. })
        ));
    }
}
