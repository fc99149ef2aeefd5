//! Instance resolution.
//!
//! Controllers are looked up through a [`Resolver`] by class key.  The
//! framework never constructs them itself.  [`Container`] is a small
//! factory-backed resolver; any other dependency container can be plugged in
//! by implementing the trait.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::ClassKey;

/// A type-erased, shareable instance.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Resolves class keys to instances.
pub trait Resolver: Send + Sync {
    /// The instance registered for `key`, if any.
    fn resolve_any(&self, key: &ClassKey) -> Option<Instance>;
}

impl dyn Resolver {
    /// Resolves `key` and downcasts it to `T`.
    pub fn resolve<T: Any + Send + Sync>(&self, key: &ClassKey) -> Option<Arc<T>> {
        self.resolve_any(key)?.downcast::<T>().ok()
    }
}

type Factory = Arc<dyn Fn(&Container) -> Option<Instance> + Send + Sync>;

/// A factory-backed [`Resolver`].
///
/// ```rust
/// use eki::{ClassKey, Container};
///
/// struct Greeter(&'static str);
///
/// let mut container = Container::new();
/// container.singleton("Greeter", Greeter("hello"));
/// let greeter = container.resolve::<Greeter>(&ClassKey::new("Greeter")).unwrap();
/// assert_eq!(greeter.0, "hello");
/// ```
#[derive(Clone, Default)]
pub struct Container {
    factories: HashMap<ClassKey, Factory>,
}

impl Container {
    /// An empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a fresh instance on every resolution.  The factory may decline
    /// by returning `None`.
    pub fn register<T, F>(&mut self, key: impl Into<ClassKey>, factory: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn(&Container) -> Option<T> + Send + Sync + 'static,
    {
        let factory: Factory =
            Arc::new(move |container: &Container| factory(container).map(|t| Arc::new(t) as Instance));
        self.factories.insert(key.into(), factory);
        self
    }

    /// Shares one instance across every resolution.
    pub fn singleton<T: Any + Send + Sync>(&mut self, key: impl Into<ClassKey>, instance: T) -> &mut Self {
        let instance: Instance = Arc::new(instance);
        let factory: Factory = Arc::new(move |_: &Container| Some(Arc::clone(&instance)));
        self.factories.insert(key.into(), factory);
        self
    }

    /// True if something is registered under `key`.
    pub fn contains(&self, key: &ClassKey) -> bool {
        self.factories.contains_key(key)
    }

    /// Resolves `key` and downcasts it to `T`.
    pub fn resolve<T: Any + Send + Sync>(&self, key: &ClassKey) -> Option<Arc<T>> {
        self.resolve_any(key)?.downcast::<T>().ok()
    }
}

impl Resolver for Container {
    fn resolve_any(&self, key: &ClassKey) -> Option<Instance> {
        let factory = self.factories.get(key)?;
        factory(self)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.factories.keys().collect();
        keys.sort();
        f.debug_struct("Container").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Counter(usize);

    #[test]
    fn factories_build_per_resolution() {
        let built = Arc::new(AtomicUsize::new(0));
        let mut container = Container::new();
        let count = Arc::clone(&built);
        container.register("Counter", move |_| Some(Counter(count.fetch_add(1, Ordering::SeqCst))));
        let key = ClassKey::new("Counter");
        assert_eq!(container.resolve::<Counter>(&key).unwrap().0, 0);
        assert_eq!(container.resolve::<Counter>(&key).unwrap().0, 1);
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn singletons_share_one_instance() {
        let mut container = Container::new();
        container.singleton("Counter", Counter(7));
        let key = ClassKey::new("Counter");
        let a = container.resolve::<Counter>(&key).unwrap();
        let b = container.resolve::<Counter>(&key).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn misses_and_wrong_types() {
        let mut container = Container::new();
        container.register::<Counter, _>("Declines", |_| None);
        container.singleton("Counter", Counter(1));
        assert!(container.resolve::<Counter>(&ClassKey::new("Missing")).is_none());
        assert!(container.resolve::<Counter>(&ClassKey::new("Declines")).is_none());
        assert!(container.resolve::<String>(&ClassKey::new("Counter")).is_none());
        let resolver: Arc<dyn Resolver> = Arc::new(container);
        assert_eq!(resolver.resolve::<Counter>(&ClassKey::new("Counter")).unwrap().0, 1);
    }
}
