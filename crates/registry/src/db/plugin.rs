use std::collections::BTreeMap;

use ferry_primitives::DomainTree;

use super::BindingRegistry;
use super::module::ModuleRegistration;
use crate::error::RegistryError;

/// Statically submitted registration for a provider module.
///
/// ```ignore
/// inventory::submit! {
///     ModuleRegistrar { module: "desktop", register: |m| {
///         m.service("api.Shapes", &["desktop.ShapesImpl"])?;
///         Ok(())
///     } }
/// }
/// ```
pub struct ModuleRegistrar {
	/// Name of the module's domain in the [`DomainTree`].
	pub module: &'static str,
	pub register: fn(&mut ModuleRegistration<'_>) -> Result<(), RegistryError>,
}

inventory::collect!(ModuleRegistrar);

impl BindingRegistry {
	/// Runs every submitted [`ModuleRegistrar`], grouped by module name.
	///
	/// Returns the number of modules registered.
	pub fn register_inventory(&mut self, domains: &DomainTree) -> Result<usize, RegistryError> {
		let mut by_module: BTreeMap<&'static str, Vec<&'static ModuleRegistrar>> = BTreeMap::new();
		for registrar in inventory::iter::<ModuleRegistrar> {
			by_module.entry(registrar.module).or_default().push(registrar);
		}

		let count = by_module.len();
		for (name, registrars) in by_module {
			let domain = domains
				.find(name)
				.ok_or_else(|| RegistryError::UnknownModule(name.to_string()))?;
			let mut registration = self.register_module(domain)?;
			for registrar in registrars {
				(registrar.register)(&mut registration)?;
			}
			if self.verbose() {
				tracing::debug!(module = name, "module registered from inventory");
			}
		}
		Ok(count)
	}
}
