//! Property-based test generators using proptest.
//!
//! Module names come from a deliberately small alphabet so that generated
//! sequences hit symbolic id collisions, renames onto taken names and
//! references to missing modules.

use proptest::prelude::*;

/// Strategy for generating module names.
pub fn module_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-e]{1,2}").expect("Invalid regex")
}

/// Strategy for generating entity sources.
pub fn source_strategy() -> impl Strategy<Value = String> {
    prop_oneof![Just("gradle"), Just("maven"), Just("user")].prop_map(str::to_owned)
}

/// Strategy for generating dependency lists.
pub fn dependencies_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(module_name_strategy(), 0..4)
}

/// An edit applied to a builder of the sample project model.
#[derive(Debug, Clone)]
pub enum ModelOperation {
    /// Add a module
    AddModule {
        /// Module name
        name: String,
        /// Entity source
        source: String,
        /// Names of modules depended on
        dependencies: Vec<String>,
    },
    /// Remove a module by name
    RemoveModule {
        /// Module name
        name: String,
    },
    /// Rename a module
    RenameModule {
        /// Current name
        from: String,
        /// New name
        to: String,
    },
    /// Replace a module's dependencies
    SetDependencies {
        /// Module name
        name: String,
        /// Names of modules depended on
        dependencies: Vec<String>,
    },
    /// Move a module to another source
    SetSource {
        /// Module name
        name: String,
        /// New entity source
        source: String,
    },
    /// Publish a snapshot
    Commit,
}

/// Strategy for generating model operations.
pub fn model_operation_strategy() -> impl Strategy<Value = ModelOperation> {
    prop_oneof![
        4 => (module_name_strategy(), source_strategy(), dependencies_strategy()).prop_map(
            |(name, source, dependencies)| ModelOperation::AddModule {
                name,
                source,
                dependencies,
            }
        ),
        2 => module_name_strategy().prop_map(|name| ModelOperation::RemoveModule { name }),
        1 => (module_name_strategy(), module_name_strategy())
            .prop_map(|(from, to)| ModelOperation::RenameModule { from, to }),
        2 => (module_name_strategy(), dependencies_strategy()).prop_map(|(name, dependencies)| {
            ModelOperation::SetDependencies { name, dependencies }
        }),
        1 => (module_name_strategy(), source_strategy())
            .prop_map(|(name, source)| ModelOperation::SetSource { name, source }),
        1 => Just(ModelOperation::Commit),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<ModelOperation>> {
    prop::collection::vec(model_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
