//! Host and task selection
//!
//! A query is a list of selections and a list of filters, both made of
//! exact names or tags. Selections are unioned (no selections means
//! everything), then each filter narrows the result by intersection.
//! Unknown terms match nothing.

mod host_query;
mod task_query;

pub use host_query::HostQuery;
pub use task_query::TaskQuery;

/// Something a query term can match
pub trait Selectable {
    /// Whether `term` names this entity or one of its groups
    fn matches(&self, term: &str) -> bool;

    /// Key used by the ordered accessors
    fn sort_key(&self) -> String;
}

/// Apply selections then filters to a candidate universe
pub(crate) fn resolve<'a, T, I>(universe: I, selections: &[String], filters: &[String]) -> Vec<&'a T>
where
    T: Selectable + 'a,
    I: IntoIterator<Item = &'a T>,
{
    universe
        .into_iter()
        .filter(|entity| selections.is_empty() || selections.iter().any(|s| entity.matches(s)))
        .filter(|entity| filters.iter().all(|f| entity.matches(f)))
        .collect()
}

pub(crate) fn order_by_name<T: Selectable>(entities: &mut [&T]) {
    entities.sort_by_cached_key(|entity| entity.sort_key());
}
