use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

type Store = HashMap<TypeId, Box<dyn Any + Send + Sync>>;

/// Global config repository - stores config instances by type
static CONFIG_REPOSITORY: OnceLock<RwLock<Store>> = OnceLock::new();

/// Register a config in the global repository, replacing any previous value
pub fn register<T: Any + Send + Sync + 'static>(config: T) {
    let repo = CONFIG_REPOSITORY.get_or_init(|| RwLock::new(HashMap::new()));
    if let Ok(mut store) = repo.write() {
        store.insert(TypeId::of::<T>(), Box::new(config));
    }
}

/// Get a config from the global repository
pub fn get<T: Any + Send + Sync + Clone + 'static>() -> Option<T> {
    let store = CONFIG_REPOSITORY.get()?.read().ok()?;
    store.get(&TypeId::of::<T>())?.downcast_ref::<T>().cloned()
}

/// Check if a config type is registered in the global repository
pub fn has<T: Any + 'static>() -> bool {
    CONFIG_REPOSITORY
        .get()
        .and_then(|repo| repo.read().ok())
        .is_some_and(|store| store.contains_key(&TypeId::of::<T>()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Marker(u8);

    #[test]
    fn test_register_and_get() {
        register(Marker(1));
        register(Marker(2));
        assert!(has::<Marker>());
        assert_eq!(get::<Marker>(), Some(Marker(2)));
        assert_eq!(get::<String>(), None);
    }
}
