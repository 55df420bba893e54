//! Context resolution: context name + selection → ordered instance list.
//!
//! The resolver exclusively owns the in-memory cache map for the duration
//! of one command invocation. Callers persist it back through
//! [`ContextResolver::into_cache`] once the operation completes.

use anyhow::{Result, bail};

use crate::application::ports::{CacheMap, FleetDirectory};
use crate::application::remote::RemoteAccess;
use crate::domain::config::Defaults;
use crate::domain::instance::sort_by_id;
use crate::domain::{FleetError, InstanceRecord};

/// Which instances of a context an operation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every instance in the context.
    All,
    /// Explicit zero-based indices into the context's sorted list, in the
    /// caller's order (never re-sorted).
    Indices(Vec<usize>),
}

/// Pick list elements by explicit indices, preserving the caller's order.
///
/// # Errors
///
/// Returns an error when an index is out of range.
pub fn select_indices<T: Clone>(list: &[T], indices: &[usize]) -> Result<Vec<T>> {
    let mut out = Vec::with_capacity(indices.len());
    for &i in indices {
        match list.get(i) {
            Some(item) => out.push(item.clone()),
            None => bail!("index {i} is out of range ({} instances)", list.len()),
        }
    }
    Ok(out)
}

/// Resolve remote-access credentials for a batch.
///
/// Precedence: explicit override, then the first resolved instance's cached
/// value, then the profile default. A user that is still unset is fatal; an
/// unset key path is legal and omits `-i`.
///
/// # Errors
///
/// Returns [`FleetError::MissingCredential`] when no user can be resolved.
pub fn resolve_credentials(
    instances: &[InstanceRecord],
    override_user: &str,
    override_key: &str,
    defaults: &Defaults,
) -> Result<RemoteAccess, FleetError> {
    let cached_user = instances.first().map_or("", |i| i.access_user.as_str());
    let cached_key = instances
        .first()
        .map_or("", |i| i.access_key_path.as_str());

    let user = [override_user, cached_user, defaults.user.as_str()]
        .into_iter()
        .find(|u| !u.is_empty())
        .ok_or(FleetError::MissingCredential)?;
    let key_path = [override_key, cached_key, defaults.key.as_str()]
        .into_iter()
        .find(|k| !k.is_empty())
        .unwrap_or("");

    Ok(RemoteAccess {
        user: user.to_string(),
        key_path: key_path.to_string(),
    })
}

/// Maps a context name and selection to a concrete, ordered instance list,
/// reconciling the cache against live provider state.
pub struct ContextResolver<'a, D> {
    directory: &'a D,
    contexts: Option<CacheMap>,
}

impl<'a, D: FleetDirectory> ContextResolver<'a, D> {
    /// `cache` is `Some` when a cache store is configured; the resolver
    /// takes ownership of the loaded map.
    pub fn new(directory: &'a D, cache: Option<CacheMap>) -> Self {
        Self {
            directory,
            contexts: cache,
        }
    }

    /// Hand the (possibly refreshed) cache map back for persistence.
    #[must_use]
    pub fn into_cache(self) -> Option<CacheMap> {
        self.contexts
    }

    /// The context's full instance list, sorted ascending by id: the cache
    /// entry when one exists, otherwise a live tag query.
    async fn base_list(&self, ctx: &str) -> Result<Vec<InstanceRecord>> {
        if let Some(map) = &self.contexts
            && let Some(list) = map.get(ctx)
        {
            let mut list = list.clone();
            sort_by_id(&mut list);
            return Ok(list);
        }
        self.directory.describe_context(ctx).await
    }

    /// Re-describe the cached instance ids of `ctx` and replace the cache
    /// entry with live state, carrying cached credentials over.
    async fn refresh_context(&mut self, ctx: &str) -> Result<()> {
        let Some(list) = self.contexts.as_mut().and_then(|m| m.get_mut(ctx)) else {
            return Ok(());
        };
        if list.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = list.iter().map(|i| i.id.clone()).collect();
        let user = list[0].access_user.clone();
        let key = list[0].access_key_path.clone();

        let mut fresh = self.directory.describe_ids(&ids).await?;
        for inst in &mut fresh {
            inst.access_user.clone_from(&user);
            inst.access_key_path.clone_from(&key);
        }
        sort_by_id(&mut fresh);
        *list = fresh;
        Ok(())
    }

    /// Resolve `ctx` + `selection` for a remote-access operation.
    ///
    /// With `filter_running` (the "all" mode of remote-access operations),
    /// non-running instances are dropped after selection; an empty result is
    /// [`FleetError::NoReachableInstances`]. Without it (explicit indices),
    /// every selected instance must have a concrete public address; when a
    /// cache is configured, exactly one live refresh is attempted before
    /// concluding [`FleetError::InstanceNotReady`].
    pub async fn resolve(
        &mut self,
        ctx: &str,
        selection: &Selection,
        filter_running: bool,
    ) -> Result<Vec<InstanceRecord>> {
        let mut list = self.base_list(ctx).await?;

        // Stale sentinel addresses in the cache trigger one live refresh.
        if self.contexts.is_some() {
            let selected = self.select(&list, selection)?;
            if selected.iter().any(|i| !i.is_reachable()) {
                self.refresh_context(ctx).await?;
                list = self.base_list(ctx).await?;
            }
        }

        let selected = self.select(&list, selection)?;
        if filter_running {
            let running: Vec<InstanceRecord> =
                selected.into_iter().filter(InstanceRecord::is_running).collect();
            if running.is_empty() {
                return Err(FleetError::NoReachableInstances(ctx.to_string()).into());
            }
            Ok(running)
        } else {
            if selected.iter().any(|i| !i.is_reachable()) {
                return Err(FleetError::InstanceNotReady.into());
            }
            Ok(selected)
        }
    }

    fn select(
        &self,
        list: &[InstanceRecord],
        selection: &Selection,
    ) -> Result<Vec<InstanceRecord>> {
        match selection {
            Selection::All => Ok(list.to_vec()),
            Selection::Indices(indices) => select_indices(list, indices),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::LaunchSpec;
    use crate::domain::LifecycleState;
    use std::cell::{Cell, RefCell};
    use std::collections::BTreeMap;

    fn inst(id: &str, state: LifecycleState) -> InstanceRecord {
        InstanceRecord::from_observed(
            id.to_string(),
            "t2.micro".to_string(),
            "us-east-1a".to_string(),
            Some("10.0.0.1".to_string()),
            Some(format!("3.80.0.{}", id.len())),
            Some(format!("{id}.example")),
            state,
        )
    }

    /// Directory stub: canned describe results plus call counters.
    #[derive(Default)]
    struct StubDirectory {
        by_context: RefCell<Vec<InstanceRecord>>,
        by_ids: RefCell<Vec<InstanceRecord>>,
        context_calls: Cell<u32>,
        ids_calls: Cell<u32>,
    }

    impl FleetDirectory for StubDirectory {
        async fn describe_context(&self, _ctx: &str) -> Result<Vec<InstanceRecord>> {
            self.context_calls.set(self.context_calls.get() + 1);
            Ok(self.by_context.borrow().clone())
        }

        async fn describe_ids(&self, _ids: &[String]) -> Result<Vec<InstanceRecord>> {
            self.ids_calls.set(self.ids_calls.get() + 1);
            Ok(self.by_ids.borrow().clone())
        }

        async fn list_context_names(&self) -> Result<Vec<String>> {
            anyhow::bail!("not expected")
        }

        async fn create(&self, _spec: &LaunchSpec) -> Result<Vec<String>> {
            anyhow::bail!("not expected")
        }

        async fn terminate(&self, _ids: &[String]) -> Result<()> {
            anyhow::bail!("not expected")
        }

        async fn start(&self, _ids: &[String]) -> Result<()> {
            anyhow::bail!("not expected")
        }

        async fn stop(&self, _ids: &[String]) -> Result<()> {
            anyhow::bail!("not expected")
        }

        async fn reboot(&self, _ids: &[String]) -> Result<()> {
            anyhow::bail!("not expected")
        }
    }

    fn cache_with(ctx: &str, list: Vec<InstanceRecord>) -> CacheMap {
        let mut map = BTreeMap::new();
        map.insert(ctx.to_string(), list);
        map
    }

    #[tokio::test]
    async fn cache_entry_is_used_without_querying_the_directory() {
        let dir = StubDirectory::default();
        let cache = cache_with(
            "train",
            vec![
                inst("i-0b", LifecycleState::Running),
                inst("i-0a", LifecycleState::Running),
            ],
        );
        let mut resolver = ContextResolver::new(&dir, Some(cache));
        let list = resolver
            .resolve("train", &Selection::All, true)
            .await
            .expect("resolve");
        let ids: Vec<&str> = list.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["i-0a", "i-0b"], "re-sorted ascending by id");
        assert_eq!(dir.context_calls.get(), 0);
    }

    #[tokio::test]
    async fn missing_cache_entry_falls_back_to_live_query() {
        let dir = StubDirectory::default();
        *dir.by_context.borrow_mut() = vec![inst("i-0a", LifecycleState::Running)];
        let mut resolver = ContextResolver::new(&dir, Some(BTreeMap::new()));
        let list = resolver
            .resolve("train", &Selection::All, true)
            .await
            .expect("resolve");
        assert_eq!(list.len(), 1);
        assert!(dir.context_calls.get() >= 1);
    }

    #[tokio::test]
    async fn running_filter_drops_stopped_and_fails_on_empty() {
        let dir = StubDirectory::default();
        *dir.by_context.borrow_mut() = vec![
            inst("i-0a", LifecycleState::Stopped),
            inst("i-0b", LifecycleState::Running),
        ];
        let mut resolver = ContextResolver::new(&dir, None);
        let list = resolver
            .resolve("train", &Selection::All, true)
            .await
            .expect("resolve");
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "i-0b");

        *dir.by_context.borrow_mut() = vec![inst("i-0a", LifecycleState::Stopped)];
        let mut resolver = ContextResolver::new(&dir, None);
        let err = resolver
            .resolve("train", &Selection::All, true)
            .await
            .expect_err("no running instances");
        let fleet = err.downcast_ref::<FleetError>().expect("typed error");
        assert!(matches!(fleet, FleetError::NoReachableInstances(_)));
    }

    #[tokio::test]
    async fn explicit_indices_preserve_caller_order() {
        let dir = StubDirectory::default();
        *dir.by_context.borrow_mut() = vec![
            inst("i-0a", LifecycleState::Running),
            inst("i-0b", LifecycleState::Running),
            inst("i-0c", LifecycleState::Running),
        ];
        let mut resolver = ContextResolver::new(&dir, None);
        let list = resolver
            .resolve("train", &Selection::Indices(vec![2, 0]), false)
            .await
            .expect("resolve");
        let ids: Vec<&str> = list.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["i-0c", "i-0a"]);
    }

    #[tokio::test]
    async fn stale_sentinel_with_cache_refreshes_exactly_once() {
        let dir = StubDirectory::default();
        *dir.by_ids.borrow_mut() = vec![inst("i-0a", LifecycleState::Running)];
        let mut stale = inst("i-0a", LifecycleState::Running);
        stale.clear_public_addresses();
        stale.access_user = "ubuntu".to_string();
        let mut resolver = ContextResolver::new(&dir, Some(cache_with("train", vec![stale])));

        let list = resolver
            .resolve("train", &Selection::Indices(vec![0]), false)
            .await
            .expect("refresh recovers");
        assert_eq!(dir.ids_calls.get(), 1);
        assert!(list[0].is_reachable());
        assert_eq!(list[0].access_user, "ubuntu", "credentials carried over");

        let refreshed = resolver.into_cache().expect("cache retained");
        assert!(refreshed["train"][0].is_reachable(), "refresh persisted");
    }

    #[tokio::test]
    async fn still_stale_after_one_refresh_is_instance_not_ready() {
        let dir = StubDirectory::default();
        let mut stale = inst("i-0a", LifecycleState::Running);
        stale.clear_public_addresses();
        *dir.by_ids.borrow_mut() = vec![inst("i-0a", LifecycleState::Stopped)];
        let mut resolver = ContextResolver::new(&dir, Some(cache_with("train", vec![stale])));

        let err = resolver
            .resolve("train", &Selection::Indices(vec![0]), false)
            .await
            .expect_err("still not ready");
        assert_eq!(dir.ids_calls.get(), 1, "exactly one refresh");
        let fleet = err.downcast_ref::<FleetError>().expect("typed error");
        assert!(matches!(fleet, FleetError::InstanceNotReady));
    }

    #[tokio::test]
    async fn without_cache_sentinel_fails_immediately() {
        let dir = StubDirectory::default();
        *dir.by_context.borrow_mut() = vec![inst("i-0a", LifecycleState::Stopped)];
        let mut resolver = ContextResolver::new(&dir, None);
        let err = resolver
            .resolve("train", &Selection::Indices(vec![0]), false)
            .await
            .expect_err("not ready");
        assert_eq!(dir.ids_calls.get(), 0, "no refresh without a cache");
        let fleet = err.downcast_ref::<FleetError>().expect("typed error");
        assert!(matches!(fleet, FleetError::InstanceNotReady));
    }

    #[tokio::test]
    async fn out_of_range_index_is_an_error() {
        let dir = StubDirectory::default();
        *dir.by_context.borrow_mut() = vec![inst("i-0a", LifecycleState::Running)];
        let mut resolver = ContextResolver::new(&dir, None);
        let err = resolver
            .resolve("train", &Selection::Indices(vec![3]), false)
            .await
            .expect_err("index out of range");
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn credential_precedence_override_then_cached_then_default() {
        let mut cached = inst("i-0a", LifecycleState::Running);
        cached.access_user = "u2".to_string();
        cached.access_key_path = "k2".to_string();
        let instances = vec![cached];
        let defaults = Defaults {
            region: None,
            user: "u3".to_string(),
            key: "k3".to_string(),
        };

        let access =
            resolve_credentials(&instances, "u1", "k1", &defaults).expect("override wins");
        assert_eq!((access.user.as_str(), access.key_path.as_str()), ("u1", "k1"));

        let access = resolve_credentials(&instances, "", "", &defaults).expect("cached wins");
        assert_eq!((access.user.as_str(), access.key_path.as_str()), ("u2", "k2"));

        let bare = vec![inst("i-0a", LifecycleState::Running)];
        let access = resolve_credentials(&bare, "", "", &defaults).expect("default wins");
        assert_eq!((access.user.as_str(), access.key_path.as_str()), ("u3", "k3"));

        let err = resolve_credentials(&bare, "", "", &Defaults::default())
            .expect_err("all unset is fatal");
        assert!(matches!(err, FleetError::MissingCredential));
        assert_eq!(err.exit_code(), 15);
    }

    #[test]
    fn unset_key_is_allowed() {
        let bare = vec![inst("i-0a", LifecycleState::Running)];
        let access = resolve_credentials(&bare, "ubuntu", "", &Defaults::default())
            .expect("user alone is enough");
        assert_eq!(access.key_path, "");
    }
}
