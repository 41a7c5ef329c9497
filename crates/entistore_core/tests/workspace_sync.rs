//! End-to-end scenarios: a project model imported, edited and re-synced.

use entistore_core::{
    Builder, Config, DeclaredSchema, EntityChange, EntitySource, EntityTypeId, FileUrlManager,
    Fields, InternedFileUrls, Query, SchemaRegistry, Snapshot, StoreError, StoreVersion,
    SymbolicId, Value,
};
use std::sync::Arc;

struct Model {
    schemas: Arc<SchemaRegistry>,
    module: EntityTypeId,
    content_root: EntityTypeId,
    urls: InternedFileUrls,
}

impl Model {
    fn new() -> Self {
        let mut schemas = SchemaRegistry::new();
        let module = schemas
            .register(
                "module",
                DeclaredSchema::new()
                    .symbolic_id("module", "name")
                    .references("dependencies"),
            )
            .unwrap();
        let content_root = schemas
            .register(
                "content_root",
                DeclaredSchema::new().references("module").file_url("url"),
            )
            .unwrap();
        Self {
            schemas: Arc::new(schemas),
            module,
            content_root,
            urls: InternedFileUrls::new(),
        }
    }

    fn module(&self, name: &str, deps: &[&str]) -> Fields {
        let deps: Vec<Value> = deps.iter().map(|d| Value::Ref(module(d))).collect();
        Fields::new().with("name", name).with("dependencies", deps)
    }

    fn root(&self, name: &str) -> Fields {
        Fields::new()
            .with("module", module(name))
            .with("url", self.urls.get_or_create(&format!("file:///ws/{name}")))
    }

    /// Simulates an import: a fresh builder holding what the build tool
    /// reports. Each entry is a module name and its space-separated
    /// dependencies.
    fn import(&self, modules: &[(&str, &str)]) -> Builder {
        let mut builder = Builder::new(Arc::clone(&self.schemas));
        for (name, deps) in modules {
            let deps: Vec<&str> = deps.split_whitespace().collect();
            builder
                .add_entity(self.module, "gradle", self.module(name, &deps))
                .unwrap();
            builder
                .add_entity(self.content_root, "gradle", self.root(name))
                .unwrap();
        }
        builder
    }
}

fn module(name: &str) -> SymbolicId {
    SymbolicId::new("module", name)
}

fn names(snapshot: &Snapshot, target: &str, ty: EntityTypeId) -> Vec<String> {
    let mut names: Vec<String> = snapshot
        .referrers(&module(target), ty)
        .filter_map(|data| data.fields().text("name").map(str::to_owned))
        .collect();
    names.sort();
    names
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct ModuleNames(EntityTypeId);

impl Query for ModuleNames {
    type Output = Arc<Vec<String>>;

    fn evaluate(&self, snapshot: &Snapshot) -> Self::Output {
        let mut names: Vec<String> = snapshot
            .entities(self.0)
            .filter_map(|data| data.fields().text("name").map(str::to_owned))
            .collect();
        names.sort();
        Arc::new(names)
    }
}

#[test]
fn empty_then_first_module() {
    let model = Model::new();
    let mut builder = Builder::new(Arc::clone(&model.schemas));
    let empty = builder.to_snapshot();
    assert_eq!(empty.version(), StoreVersion::INITIAL);
    assert!(empty.is_empty());

    builder
        .add_entity(model.module, "gradle", model.module("a", &[]))
        .unwrap();
    let first = builder.to_snapshot();
    assert_eq!(first.version(), StoreVersion::new(1));
    assert!(first.resolve(&module("a")).is_some());
    assert!(!empty.contains(&module("a")));

    let again = builder.to_snapshot();
    assert!(again.ptr_eq(&first));
}

#[test]
fn user_edits_survive_reimport() {
    let model = Model::new();
    let mut workspace = model.import(&[("util", ""), ("core", "util"), ("app", "core")]);

    let app = workspace.resolve(&module("app")).unwrap().id();
    workspace
        .add_entity(model.module, "user", model.module("scratch", &["app"]))
        .unwrap();
    workspace.set_mapping("ui.expanded", app, true).unwrap();
    let before = workspace.to_snapshot();

    // The build tool drops `util`, rewires `core` and adds `cli`.
    let import = model.import(&[("core", ""), ("app", "core"), ("cli", "app")]);
    let gradle = EntitySource::new("gradle");
    let summary = workspace
        .replace_by_source(|source| *source == gradle, &import)
        .unwrap();
    // Content roots claim no symbolic id, so every old root is replaced.
    assert_eq!(summary.removed, 4);
    assert_eq!(summary.added, 4);
    assert_eq!(summary.modified, 1);
    assert_eq!(summary.unchanged, 1);

    let after = workspace.to_snapshot();
    assert_eq!(after.version(), before.version().next());

    assert!(!after.contains(&module("util")));
    assert!(after.contains(&module("cli")));
    assert!(after.contains(&module("scratch")));

    // `app` kept its ID and its mapping entry.
    assert_eq!(after.resolve(&module("app")).unwrap().id(), app);
    assert_eq!(after.external_mapping("ui.expanded").get::<bool>(app), Some(&true));

    assert_eq!(names(&after, "app", model.module), vec!["cli", "scratch"]);
    assert!(names(&after, "util", model.module).is_empty());
    assert_eq!(after.referrers(&module("core"), model.content_root).count(), 1);

    // The old snapshot is untouched.
    assert!(before.contains(&module("util")));
    assert_eq!(names(&before, "util", model.module), vec!["core"]);
}

#[test]
fn file_urls_follow_content_roots() {
    let model = Model::new();
    let mut workspace = model.import(&[("a", ""), ("b", "")]);
    let snapshot = workspace.to_snapshot();

    let url = model.urls.find("file:///ws/a").unwrap();
    let hits: Vec<_> = snapshot
        .virtual_file_url_index()
        .find_entities_by_url(&url)
        .collect();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].1, "url");

    let root = hits[0].0;
    workspace.remove_entity(root).unwrap();
    let next = workspace.to_snapshot();
    assert_eq!(
        next.virtual_file_url_index().find_entities_by_url(&url).count(),
        0
    );
    assert_eq!(
        snapshot
            .virtual_file_url_index()
            .find_entities_by_url(&url)
            .count(),
        1
    );
}

#[test]
fn forked_builders_merge() {
    let model = Model::new();
    let mut workspace = model.import(&[("a", ""), ("b", "a")]);
    let base = workspace.to_snapshot();

    let mut left = base.to_builder();
    let mut right = base.to_builder();
    left
        .add_entity(model.module, "user", model.module("l", &["a"]))
        .unwrap();
    let b = right.resolve(&module("b")).unwrap().id();
    right.remove_entity(b).unwrap();
    right
        .add_entity(model.module, "user", model.module("r", &[]))
        .unwrap();

    let changes = right.collect_changes().unwrap();
    assert!(matches!(
        changes[&model.module].as_slice(),
        [EntityChange::Removed(old), EntityChange::Added(new)]
            if old.id() == b && new.fields().text("name") == Some("r")
    ));

    let summary = left.apply_changes_from(&right).unwrap();
    assert_eq!(summary.added, 1);
    assert_eq!(summary.removed, 1);

    let merged = left.to_snapshot();
    assert!(merged.contains(&module("l")));
    assert!(merged.contains(&module("r")));
    assert!(!merged.contains(&module("b")));
    assert_eq!(names(&merged, "a", model.module), vec!["l"]);
    assert!(base.contains(&module("b")));
}

#[test]
fn foreign_ids_are_rejected_across_lineages() {
    let model = Model::new();
    let mut one = model.import(&[("a", "")]);
    let two = model.import(&[("a", "")]);
    let foreign = two.resolve(&module("a")).unwrap().id();

    assert!(matches!(
        one.entity(foreign),
        Err(StoreError::CrossLineage { .. })
    ));
    assert!(!one.contains_entity(foreign));
    assert!(one.remove_entity(foreign).is_err());
    assert!(matches!(
        one.apply_changes_from(&two),
        Err(StoreError::LineageMismatch { .. })
    ));
}

#[test]
fn queries_are_cached_per_snapshot() {
    let model = Model::new();
    let mut workspace = model.import(&[("b", ""), ("a", "")]);
    let first = workspace.to_snapshot();

    let names = first.cached(&ModuleNames(model.module));
    assert_eq!(*names, vec!["a", "b"]);
    assert!(Arc::ptr_eq(&names, &first.cached(&ModuleNames(model.module))));
    assert_eq!(first.cached_query_count(), 1);

    workspace
        .add_entity(model.module, "user", model.module("c", &[]))
        .unwrap();
    let second = workspace.to_snapshot();
    assert_eq!(second.cached_query_count(), 0);
    assert_eq!(*second.cached(&ModuleNames(model.module)), vec!["a", "b", "c"]);
    assert_eq!(*first.cached(&ModuleNames(model.module)), vec!["a", "b"]);
}

#[test]
fn snapshots_are_shared_across_threads() {
    let model = Model::new();
    let mut workspace = model.import(&[("a", ""), ("b", "a"), ("c", "a")]);
    let snapshot = workspace.to_snapshot();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let snapshot = snapshot.clone();
            let module = model.module;
            scope.spawn(move || {
                assert_eq!(snapshot.referrers(&SymbolicId::new("module", "a"), module).count(), 2);
                assert_eq!(snapshot.cached(&ModuleNames(module)).len(), 3);
            });
        }
    });
    assert_eq!(snapshot.cached_query_count(), 1);
}

#[test]
fn untracked_lineage_still_publishes() {
    let model = Model::new();
    let mut builder = Builder::with_config(
        Config::new().track_changes(false).index_shards(4),
        Arc::clone(&model.schemas),
    )
    .unwrap();
    builder
        .add_entity(model.module, "user", model.module("a", &[]))
        .unwrap();
    assert!(builder.has_changes());
    assert_eq!(
        builder.collect_changes(),
        Err(StoreError::ChangeTrackingDisabled)
    );
    let snapshot = builder.to_snapshot();
    assert!(snapshot.contains(&module("a")));
    assert_eq!(snapshot.config().index_shards, 4);
}
