//! Test fixtures: a small project model and prebuilt stores.
//!
//! The model has four entity types:
//! - `module`: claims `module:<name>`, references its `dependencies`
//! - `library`: claims `library:<name>`
//! - `content_root`: references its `module`, holds `url` and `excluded` urls
//! - `facet`: references its `module`

use entistore_core::{
    Builder, Config, DeclaredSchema, EntityTypeId, Fields, FileUrlManager, InternedFileUrls,
    SchemaRegistry, Snapshot, SymbolicId, Value,
};
use std::sync::Arc;

/// Source used by [`ProjectModel::sample_project`] for imported entities.
pub const GRADLE: &str = "gradle";
/// Source used by [`ProjectModel::sample_project`] for hand-made entities.
pub const USER: &str = "user";

/// Schema registry and type IDs of the sample project model.
#[derive(Debug, Clone)]
pub struct ProjectModel {
    /// Registered schemas.
    pub schemas: Arc<SchemaRegistry>,
    /// `module` type.
    pub module: EntityTypeId,
    /// `library` type.
    pub library: EntityTypeId,
    /// `content_root` type.
    pub content_root: EntityTypeId,
    /// `facet` type.
    pub facet: EntityTypeId,
    /// File url service shared by all fixtures of this model.
    pub urls: Arc<InternedFileUrls>,
}

impl ProjectModel {
    /// Registers the sample schemas.
    pub fn new() -> Self {
        let mut schemas = SchemaRegistry::new();
        let module = schemas
            .register(
                "module",
                DeclaredSchema::new()
                    .symbolic_id("module", "name")
                    .references("dependencies"),
            )
            .expect("Failed to register module");
        let library = schemas
            .register("library", DeclaredSchema::new().symbolic_id("library", "name"))
            .expect("Failed to register library");
        let content_root = schemas
            .register(
                "content_root",
                DeclaredSchema::new()
                    .references("module")
                    .file_url("url")
                    .file_url("excluded"),
            )
            .expect("Failed to register content_root");
        let facet = schemas
            .register("facet", DeclaredSchema::new().references("module"))
            .expect("Failed to register facet");
        Self {
            schemas: Arc::new(schemas),
            module,
            library,
            content_root,
            facet,
            urls: Arc::new(InternedFileUrls::new()),
        }
    }

    /// Creates an empty builder with the default config.
    pub fn builder(&self) -> Builder {
        Builder::new(Arc::clone(&self.schemas))
    }

    /// Creates an empty builder with a custom config.
    pub fn builder_with_config(&self, config: Config) -> Builder {
        Builder::with_config(config, Arc::clone(&self.schemas)).expect("Invalid test config")
    }

    /// Fields of a module depending on other modules.
    pub fn module_fields(&self, name: &str, dependencies: &[&str]) -> Fields {
        let dependencies: Vec<Value> = dependencies
            .iter()
            .map(|dep| Value::Ref(module_id(dep)))
            .collect();
        Fields::new()
            .with("name", name)
            .with("dependencies", dependencies)
    }

    /// Fields of a library.
    pub fn library_fields(&self, name: &str) -> Fields {
        Fields::new().with("name", name)
    }

    /// Fields of a content root of `module` at `url`.
    pub fn content_root_fields(&self, module: &str, url: &str) -> Fields {
        Fields::new()
            .with("module", module_id(module))
            .with("url", self.urls.get_or_create(url))
    }

    /// Fields of a facet attached to `module`.
    pub fn facet_fields(&self, module: &str, kind: &str) -> Fields {
        Fields::new()
            .with("module", module_id(module))
            .with("kind", kind)
    }

    /// Builds a three-module project:
    ///
    /// - `app` depends on `core` and the `junit` library
    /// - `core` depends on `util`
    /// - every module has a content root; `app` has a `spring` facet
    ///
    /// Everything comes from [`GRADLE`] except the facet, which is [`USER`].
    pub fn sample_project(&self) -> Snapshot {
        let mut builder = self.builder();
        self.populate(&mut builder);
        builder.to_snapshot()
    }

    /// Adds the sample project to a builder.
    pub fn populate(&self, builder: &mut Builder) {
        builder
            .add_entity(self.library, GRADLE, self.library_fields("junit"))
            .expect("Failed to add library");
        let app = self.module_fields("app", &[]).with(
            "dependencies",
            vec![Value::Ref(module_id("core")), Value::Ref(library_id("junit"))],
        );
        for (name, fields) in [
            ("util", self.module_fields("util", &[])),
            ("core", self.module_fields("core", &["util"])),
            ("app", app),
        ] {
            builder
                .add_entity(self.module, GRADLE, fields)
                .expect("Failed to add module");
            builder
                .add_entity(
                    self.content_root,
                    GRADLE,
                    self.content_root_fields(name, &format!("file:///project/{name}")),
                )
                .expect("Failed to add content root");
        }
        builder
            .add_entity(self.facet, USER, self.facet_fields("app", "spring"))
            .expect("Failed to add facet");
    }
}

impl Default for ProjectModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Symbolic id of a module.
pub fn module_id(name: &str) -> SymbolicId {
    SymbolicId::new("module", name)
}

/// Symbolic id of a library.
pub fn library_id(name: &str) -> SymbolicId {
    SymbolicId::new("library", name)
}
