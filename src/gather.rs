use futures::future::join_all;
use std::future::Future;

/// Runs every operation concurrently and returns their outcomes aligned by input position.
///
/// Nothing is dropped or reordered: completion order never affects the output order, and
/// each failure stays in its slot for the caller to decide a fallback.
pub async fn gather_partial<I, F, T, E>(ops: I) -> Vec<Result<T, E>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    join_all(ops).await
}

/// Keeps the successful outcomes in input order, handing each failure to `on_err`.
pub fn successes<T, E>(results: Vec<Result<T, E>>, mut on_err: impl FnMut(E)) -> Vec<T> {
    results
        .into_iter()
        .filter_map(|r| match r {
            Ok(v) => Some(v),
            Err(e) => {
                on_err(e);
                None
            }
        })
        .collect()
}
