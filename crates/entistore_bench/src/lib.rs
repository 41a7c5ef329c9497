//! Benchmark utilities.

use entistore_core::{
    Builder, DeclaredSchema, EntityTypeId, Fields, SchemaRegistry, Snapshot, SymbolicId, Value,
};
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;

/// Sources assigned to generated modules.
pub const SOURCES: [&str; 4] = ["gradle", "maven", "bazel", "user"];

/// Schema registry with a single `module` type.
pub fn module_schemas() -> (Arc<SchemaRegistry>, EntityTypeId) {
    let mut schemas = SchemaRegistry::new();
    let module = schemas
        .register(
            "module",
            DeclaredSchema::new()
                .symbolic_id("module", "name")
                .references("dependencies"),
        )
        .expect("Failed to register module");
    (Arc::new(schemas), module)
}

/// Symbolic id of the `index`-th generated module.
pub fn module_id(index: usize) -> SymbolicId {
    SymbolicId::new("module", format!("m{index}"))
}

/// Generate `count` module field sets, each depending on up to `fanout`
/// earlier modules chosen at random.
pub fn generate_modules(count: usize, fanout: usize) -> Vec<(&'static str, Fields)> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|index| {
            let dependencies: Vec<Value> = if index == 0 {
                Vec::new()
            } else {
                (0..rng.gen_range(0..=fanout))
                    .map(|_| Value::Ref(module_id(rng.gen_range(0..index))))
                    .collect()
            };
            let source = SOURCES.choose(&mut rng).copied().unwrap_or("user");
            let fields = Fields::new()
                .with("name", format!("m{index}"))
                .with("dependencies", dependencies);
            (source, fields)
        })
        .collect()
}

/// Build a snapshot holding `count` generated modules.
pub fn populated_snapshot(count: usize, fanout: usize) -> (Snapshot, EntityTypeId) {
    let (schemas, module) = module_schemas();
    let mut builder = Builder::new(schemas);
    for (source, fields) in generate_modules(count, fanout) {
        builder
            .add_entity(module, source, fields)
            .expect("Failed to add module");
    }
    (builder.to_snapshot(), module)
}
