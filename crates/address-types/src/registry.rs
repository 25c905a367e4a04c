//! Registry trait for config-selected implementations.

/// Base trait for implementation registries.
///
/// Each backend module (token provider, validator, record store) exposes a
/// `Registry` struct implementing this trait so the builder can look it up by
/// the name used in configuration, e.g. `records.implementations.file`.
pub trait ImplementationRegistry {
	/// Name of the implementation table in configuration.
	const NAME: &'static str;

	/// Factory function type for this kind of implementation.
	type Factory;

	/// Returns the factory that creates the implementation from its config table.
	fn factory() -> Self::Factory;
}
