//! Deferred module requires bound to a loader.

use super::{lazify, lazy, Entry, LazyFacade};
use crate::error::ReflectError;
use std::sync::Arc;

/// Resolves module ids to modules. The registry behind it (files, bundles, ...) is up to the host.
pub trait ModuleLoader: Send + Sync {
    type Module: Clone + Send + 'static;

    fn load(&self, id: &str) -> Result<Self::Module, ReflectError>;
}

/// A `require` whose loads are deferred until the facade key is first read.
pub struct LazyRequire<L> {
    loader: Arc<L>,
}

/// Turn `loader` into a lazy require.
pub fn lazified<L: ModuleLoader + 'static>(loader: Arc<L>) -> LazyRequire<L> {
    LazyRequire { loader }
}

impl<L: ModuleLoader + 'static> LazyRequire<L> {
    /// Entry that loads `id` on first read.
    pub fn require(&self, id: &str) -> Entry<L::Module> {
        let loader = Arc::clone(&self.loader);
        let id = id.to_string();
        lazy(move || loader.load(&id))
    }

    /// Facade whose keys load the paired module ids on first read.
    pub fn facade<'a, K, I>(&self, requires: I) -> LazyFacade<L::Module>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, &'a str)>,
    {
        lazify(
            requires
                .into_iter()
                .map(|(key, id)| (key, self.require(id))),
        )
    }

    pub fn loader(&self) -> &Arc<L> {
        &self.loader
    }
}
