//! Per-kind pool of reusable view instances.
//!
//! Idle instances are owned by the pool. [`RecyclePool::dequeue`] lends one
//! out wrapped in a [`Recycled`]; handing it back through
//! [`RecyclePool::enqueue`] runs the kind's reset hook before the instance
//! becomes idle again, so a reused view never carries state from its previous
//! row. Excess idle instances are only discarded by [`RecyclePool::trim`],
//! which the owner calls once per layout pass.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use crate::collections::map::HashMap;
use crate::error::{Result, TableError};

/// Idle instances kept per kind beyond the peak in-use count.
pub const DEFAULT_POOL_HEADROOM: usize = 2;

/// Key identifying the template a view instance was built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewKind(Rc<str>);

impl ViewKind {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Rc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ViewKind {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ViewKind {
    fn from(name: String) -> Self {
        Self(Rc::from(name))
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A view instance on loan from the pool.
#[derive(Debug)]
pub struct Recycled<V> {
    kind: ViewKind,
    view: V,
    reuse_count: usize,
}

impl<V> Recycled<V> {
    pub fn kind(&self) -> &ViewKind {
        &self.kind
    }

    /// How many times this instance went through the pool before.
    pub fn reuse_count(&self) -> usize {
        self.reuse_count
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }
}

impl<V> Deref for Recycled<V> {
    type Target = V;

    fn deref(&self) -> &V {
        &self.view
    }
}

impl<V> DerefMut for Recycled<V> {
    fn deref_mut(&mut self) -> &mut V {
        &mut self.view
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub headroom: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            headroom: DEFAULT_POOL_HEADROOM,
        }
    }
}

/// Lifecycle counters for one kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindStats {
    pub in_use: usize,
    pub idle: usize,
    /// Fresh instances adopted into the pool.
    pub created: usize,
    /// Dequeues satisfied from the idle set.
    pub reused: usize,
    /// Idle instances dropped by [`RecyclePool::trim`].
    pub discarded: usize,
}

type ResetHook<V> = Box<dyn FnMut(&mut V)>;

struct KindPool<V> {
    idle: Vec<(V, usize)>,
    reset: ResetHook<V>,
    in_use: usize,
    peak_in_use: usize,
    stats: KindStats,
}

impl<V> KindPool<V> {
    fn lend(&mut self) {
        self.in_use += 1;
        self.peak_in_use = self.peak_in_use.max(self.in_use);
    }
}

pub struct RecyclePool<V> {
    kinds: HashMap<ViewKind, KindPool<V>>,
    config: PoolConfig,
}

impl<V> fmt::Debug for RecyclePool<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self
            .kinds
            .iter()
            .map(|(kind, pool)| (kind.as_str(), pool.in_use, pool.idle.len()))
            .collect();
        kinds.sort();
        f.debug_struct("RecyclePool")
            .field("kinds", &kinds)
            .field("config", &self.config)
            .finish()
    }
}

impl<V> Default for RecyclePool<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> RecyclePool<V> {
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    pub fn with_config(config: PoolConfig) -> Self {
        Self {
            kinds: HashMap::default(),
            config,
        }
    }

    pub fn config(&self) -> PoolConfig {
        self.config
    }

    /// Declares a kind together with the hook that clears transient state
    /// (selection, loaded content, pending work) from a returned instance.
    ///
    /// Registering an existing kind replaces its hook and keeps its instances.
    pub fn register(&mut self, kind: impl Into<ViewKind>, reset: impl FnMut(&mut V) + 'static) {
        let kind = kind.into();
        match self.kinds.get_mut(&kind) {
            Some(pool) => pool.reset = Box::new(reset),
            None => {
                log::debug!("registered view kind `{kind}`");
                self.kinds.insert(
                    kind,
                    KindPool {
                        idle: Vec::new(),
                        reset: Box::new(reset),
                        in_use: 0,
                        peak_in_use: 0,
                        stats: KindStats::default(),
                    },
                );
            }
        }
    }

    pub fn is_registered(&self, kind: &ViewKind) -> bool {
        self.kinds.contains_key(kind)
    }

    /// Lends an idle instance of `kind`, or `None` when the caller has to
    /// construct a fresh one (and hand it over with [`adopt`](Self::adopt)).
    pub fn dequeue(&mut self, kind: &ViewKind) -> Result<Option<Recycled<V>>> {
        let pool = self.kind_mut(kind)?;
        let Some((view, reuse_count)) = pool.idle.pop() else {
            return Ok(None);
        };
        pool.lend();
        pool.stats.reused += 1;
        Ok(Some(Recycled {
            kind: kind.clone(),
            view,
            reuse_count: reuse_count + 1,
        }))
    }

    /// Lends a freshly constructed instance through the pool so that it can
    /// be returned with [`enqueue`](Self::enqueue) later.
    pub fn adopt(&mut self, kind: &ViewKind, view: V) -> Result<Recycled<V>> {
        let pool = self.kind_mut(kind)?;
        pool.lend();
        pool.stats.created += 1;
        Ok(Recycled {
            kind: kind.clone(),
            view,
            reuse_count: 0,
        })
    }

    /// Returns an instance to the idle set after running the reset hook.
    pub fn enqueue(&mut self, recycled: Recycled<V>) -> Result<()> {
        let Recycled {
            kind,
            mut view,
            reuse_count,
        } = recycled;
        let pool = self.kind_mut(&kind)?;
        (pool.reset)(&mut view);
        pool.in_use = pool.in_use.saturating_sub(1);
        pool.idle.push((view, reuse_count));
        Ok(())
    }

    /// Layout-pass maintenance: drops idle instances above each kind's
    /// high-water mark (peak in-use since the last trim plus headroom).
    /// In-use counts every lent view, so a table's beyond-bounds views sit
    /// under the mark alongside the visible ones.
    ///
    /// Returns the number of discarded instances.
    pub fn trim(&mut self) -> usize {
        let headroom = self.config.headroom;
        let mut discarded = 0;
        for (kind, pool) in self.kinds.iter_mut() {
            let high_water = pool.peak_in_use + headroom;
            let allowed_idle = high_water.saturating_sub(pool.in_use);
            if pool.idle.len() > allowed_idle {
                let excess = pool.idle.len() - allowed_idle;
                pool.idle.truncate(allowed_idle);
                pool.stats.discarded += excess;
                discarded += excess;
                log::trace!("trimmed {excess} idle `{kind}` instances");
            }
            pool.peak_in_use = pool.in_use;
        }
        discarded
    }

    pub fn stats(&self, kind: &ViewKind) -> Option<KindStats> {
        self.kinds.get(kind).map(|pool| KindStats {
            in_use: pool.in_use,
            idle: pool.idle.len(),
            ..pool.stats
        })
    }

    pub fn idle_count(&self, kind: &ViewKind) -> usize {
        self.kinds.get(kind).map_or(0, |pool| pool.idle.len())
    }

    pub fn in_use_count(&self, kind: &ViewKind) -> usize {
        self.kinds.get(kind).map_or(0, |pool| pool.in_use)
    }

    /// Pool-wide teardown: drops every idle instance. Kinds stay registered.
    pub fn clear(&mut self) {
        for pool in self.kinds.values_mut() {
            pool.idle.clear();
            pool.peak_in_use = pool.in_use;
        }
    }

    fn kind_mut(&mut self, kind: &ViewKind) -> Result<&mut KindPool<V>> {
        self.kinds.get_mut(kind).ok_or_else(|| {
            log::warn!("view kind `{kind}` used before registration");
            TableError::UnknownKind { kind: kind.clone() }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Cell {
        id: usize,
        selected: bool,
        image: Option<String>,
        resets: usize,
    }

    fn pool() -> RecyclePool<Cell> {
        let mut pool = RecyclePool::new();
        pool.register("cell", |cell: &mut Cell| {
            cell.selected = false;
            cell.image = None;
            cell.resets += 1;
        });
        pool.register("header", |_: &mut Cell| {});
        pool
    }

    #[test]
    fn dequeue_on_empty_pool_returns_none() {
        let mut pool = pool();
        assert!(pool.dequeue(&"cell".into()).unwrap().is_none());
    }

    #[test]
    fn round_trip_runs_reset_hook() {
        let mut pool = pool();
        let kind = ViewKind::from("cell");
        let mut lent = pool.adopt(&kind, Cell { id: 7, ..Cell::default() }).unwrap();
        lent.selected = true;
        lent.image = Some("avatar.png".into());
        pool.enqueue(lent).unwrap();

        let reused = pool.dequeue(&kind).unwrap().expect("idle instance");
        assert_eq!(reused.id, 7);
        assert!(!reused.selected);
        assert_eq!(reused.image, None);
        assert_eq!(reused.resets, 1);
        assert_eq!(reused.reuse_count(), 1);
    }

    #[test]
    fn kinds_do_not_mix() {
        let mut pool = pool();
        let header = pool.adopt(&"header".into(), Cell::default()).unwrap();
        pool.enqueue(header).unwrap();
        assert!(pool.dequeue(&"cell".into()).unwrap().is_none());
        assert!(pool.dequeue(&"header".into()).unwrap().is_some());
    }

    #[test]
    fn unknown_kind_is_reported_and_pool_survives() {
        let mut pool = pool();
        let err = pool.dequeue(&"footer".into()).unwrap_err();
        assert_eq!(err, TableError::UnknownKind { kind: "footer".into() });
        assert!(pool.adopt(&"footer".into(), Cell::default()).is_err());

        let cell = pool.adopt(&"cell".into(), Cell::default()).unwrap();
        pool.enqueue(cell).unwrap();
        assert_eq!(pool.idle_count(&"cell".into()), 1);
    }

    #[test]
    fn excess_idle_instances_wait_for_trim() {
        let mut pool = pool();
        let kind = ViewKind::from("cell");
        let lent: Vec<_> = (0..6)
            .map(|id| pool.adopt(&kind, Cell { id, ..Cell::default() }).unwrap())
            .collect();
        pool.trim();

        // Scroll to a region with a single visible row of this kind.
        let mut lent = lent.into_iter();
        let kept = lent.next().unwrap();
        for cell in lent {
            pool.enqueue(cell).unwrap();
        }
        assert_eq!(pool.idle_count(&kind), 5, "nothing is dropped on enqueue");

        // First pass still honours the previous peak of 6 visible rows.
        assert_eq!(pool.trim(), 0);
        // Second pass: peak is now 1, high-water mark 1 + 2.
        assert_eq!(pool.trim(), 3);
        assert_eq!(pool.idle_count(&kind), 2);
        let stats = pool.stats(&kind).unwrap();
        assert_eq!(stats.in_use, 1);
        assert_eq!(stats.created, 6);
        assert_eq!(stats.discarded, 3);
        drop(kept);
    }

    #[test]
    fn direction_reversal_reuses_idle_instances() {
        let mut pool = pool();
        let kind = ViewKind::from("cell");
        let first = pool.adopt(&kind, Cell::default()).unwrap();
        let second = pool.adopt(&kind, Cell::default()).unwrap();
        pool.enqueue(first).unwrap();
        let again = pool.dequeue(&kind).unwrap().unwrap();
        pool.enqueue(second).unwrap();
        pool.enqueue(again).unwrap();
        let stats = pool.stats(&kind).unwrap();
        assert_eq!(stats.created, 2);
        assert_eq!(stats.reused, 1);
        assert_eq!(stats.idle, 2);
    }

    #[test]
    fn clear_drops_idle_but_keeps_registration() {
        let mut pool = pool();
        let kind = ViewKind::from("cell");
        let cell = pool.adopt(&kind, Cell::default()).unwrap();
        pool.enqueue(cell).unwrap();
        pool.clear();
        assert_eq!(pool.idle_count(&kind), 0);
        assert!(pool.is_registered(&kind));
    }
}
