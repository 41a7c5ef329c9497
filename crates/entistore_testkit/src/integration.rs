//! Oracle-backed integration harness.
//!
//! [`ModelHarness`] applies [`ModelOperation`]s to a real builder and to a
//! plain in-memory model of the expected modules, then checks that every
//! index of the store agrees with the model.

use crate::fixtures::{module_id, ProjectModel};
use crate::generators::ModelOperation;
use entistore_core::{Builder, EntityData, EntityStore, Fields, Snapshot, StoreError, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Expected state of one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    /// Entity source.
    pub source: String,
    /// Names of modules depended on, in field order.
    pub dependencies: Vec<String>,
}

/// Expected modules by name.
pub type Oracle = BTreeMap<String, ModuleRecord>;

/// A builder paired with the state it should hold.
pub struct ModelHarness {
    /// The project model.
    pub model: ProjectModel,
    /// The builder under test.
    pub builder: Builder,
    oracle: Oracle,
    history: Vec<(Snapshot, Oracle)>,
}

impl ModelHarness {
    /// Creates a harness around an empty builder.
    pub fn new() -> Self {
        let model = ProjectModel::new();
        let builder = model.builder();
        Self {
            model,
            builder,
            oracle: Oracle::new(),
            history: Vec::new(),
        }
    }

    /// Returns the expected modules.
    pub fn oracle(&self) -> &Oracle {
        &self.oracle
    }

    fn fields(&self, name: &str, dependencies: &[String]) -> Fields {
        let deps: Vec<&str> = dependencies.iter().map(String::as_str).collect();
        self.model.module_fields(name, &deps)
    }

    fn module_entity(&self, name: &str) -> Option<entistore_core::EntityId> {
        self.builder.resolve(&module_id(name)).map(|data| data.id())
    }

    /// Applies an operation to both the builder and the oracle.
    ///
    /// Operations on missing modules are skipped. Operations that must fail
    /// are checked to fail with a symbolic id conflict.
    pub fn apply(&mut self, op: &ModelOperation) {
        match op {
            ModelOperation::AddModule {
                name,
                source,
                dependencies,
            } => {
                let fields = self.fields(name, dependencies);
                let result = self
                    .builder
                    .add_entity(self.model.module, source.as_str(), fields);
                if self.oracle.contains_key(name) {
                    expect_duplicate(result.map(|_| ()));
                } else {
                    result.expect("Failed to add module");
                    self.oracle.insert(
                        name.clone(),
                        ModuleRecord {
                            source: source.clone(),
                            dependencies: dependencies.clone(),
                        },
                    );
                }
            }
            ModelOperation::RemoveModule { name } => {
                if let Some(id) = self.module_entity(name) {
                    self.builder.remove_entity(id).expect("Failed to remove module");
                    self.oracle.remove(name);
                }
            }
            ModelOperation::RenameModule { from, to } => {
                let Some(id) = self.module_entity(from) else {
                    return;
                };
                let result = self.builder.modify_entity(id, |update| {
                    update.set("name", to.as_str());
                });
                if from != to && self.oracle.contains_key(to) {
                    expect_duplicate(result.map(|_| ()));
                } else {
                    result.expect("Failed to rename module");
                    if let Some(record) = self.oracle.remove(from) {
                        self.oracle.insert(to.clone(), record);
                    }
                }
            }
            ModelOperation::SetDependencies { name, dependencies } => {
                let Some(id) = self.module_entity(name) else {
                    return;
                };
                let fields = self.fields(name, dependencies);
                self.builder
                    .modify_entity(id, |update| {
                        update.fields = fields;
                    })
                    .expect("Failed to set dependencies");
                if let Some(record) = self.oracle.get_mut(name) {
                    record.dependencies = dependencies.clone();
                }
            }
            ModelOperation::SetSource { name, source } => {
                let Some(id) = self.module_entity(name) else {
                    return;
                };
                self.builder
                    .modify_entity(id, |update| {
                        update.set_source(source.as_str());
                    })
                    .expect("Failed to set source");
                if let Some(record) = self.oracle.get_mut(name) {
                    record.source = source.clone();
                }
            }
            ModelOperation::Commit => self.commit(),
        }
    }

    /// Publishes a snapshot and remembers what it should contain.
    pub fn commit(&mut self) {
        let snapshot = self.builder.to_snapshot();
        debug!(version = %snapshot.version(), modules = self.oracle.len(), "harness commit");
        self.history.push((snapshot, self.oracle.clone()));
    }

    /// Checks the builder against the oracle.
    pub fn verify(&self) {
        verify_store(&self.builder, self.model.module, &self.oracle);
    }

    /// Checks every published snapshot against the oracle at its commit.
    pub fn verify_history(&self) {
        for (snapshot, oracle) in &self.history {
            verify_store(snapshot, self.model.module, oracle);
        }
        for pair in self.history.windows(2) {
            assert!(pair[0].0.version() <= pair[1].0.version());
        }
    }
}

impl Default for ModelHarness {
    fn default() -> Self {
        Self::new()
    }
}

fn expect_duplicate(result: Result<(), StoreError>) {
    match result {
        Err(err) => assert!(err.is_duplicate(), "Expected duplicate error, got {err}"),
        Ok(()) => panic!("Expected duplicate symbolic id error"),
    }
}

fn dependency_names(data: &EntityData) -> Vec<String> {
    data.get("dependencies")
        .and_then(Value::as_list)
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_reference)
        .map(|id| id.name().to_owned())
        .collect()
}

/// Checks that `store` holds exactly the modules in `oracle`.
pub fn verify_store(store: &EntityStore, module: entistore_core::EntityTypeId, oracle: &Oracle) {
    assert_eq!(
        store.entity_count_of(module),
        oracle.len(),
        "Module count mismatch"
    );

    for (name, record) in oracle {
        let data = store
            .resolve(&module_id(name))
            .unwrap_or_else(|| panic!("Module {name} does not resolve"));
        assert_eq!(data.source().as_str(), record.source, "Source of {name}");
        assert_eq!(dependency_names(data), record.dependencies, "Dependencies of {name}");
        assert_eq!(
            store.entity(data.id()).expect("Same lineage"),
            Some(data),
            "Lookup by id of {name}"
        );

        let expected: BTreeSet<&str> = oracle
            .iter()
            .filter(|(_, other)| other.dependencies.iter().any(|dep| dep == name))
            .map(|(other, _)| other.as_str())
            .collect();
        let actual: BTreeSet<String> = store
            .referrers(&module_id(name), module)
            .filter_map(|data| data.fields().text("name").map(str::to_owned))
            .collect();
        let actual: BTreeSet<&str> = actual.iter().map(String::as_str).collect();
        assert_eq!(actual, expected, "Referrers of {name}");
    }

    let listed: BTreeSet<String> = store
        .entities(module)
        .filter_map(|data| data.fields().text("name").map(str::to_owned))
        .collect();
    let expected: BTreeSet<String> = oracle.keys().cloned().collect();
    assert_eq!(listed, expected, "Listed modules");

    let by_source = store.entities_by_source(|_| true);
    let mut counted = 0;
    for (source, by_type) in &by_source {
        let modules = by_type.get(&module).map_or(0, Vec::len);
        let expected = oracle
            .values()
            .filter(|record| record.source == source.as_str())
            .count();
        assert_eq!(modules, expected, "Modules from {source}");
        counted += modules;
    }
    assert_eq!(counted, oracle.len(), "Sources cover every module once");
}
