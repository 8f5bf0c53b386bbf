//! Stream operators used to compose record pipelines.

use std::pin::Pin;
use std::time::Duration;

use futures::stream::{BoxStream, Stream, StreamExt};
use tokio::time::Instant;

/// Drop items equal to the one emitted immediately before them.
pub fn distinct_until_changed<S, T>(input: S) -> BoxStream<'static, T>
where
    S: Stream<Item = T> + Send + 'static,
    T: PartialEq + Clone + Send + 'static,
{
    distinct_until_changed_by(input, T::clone)
}

/// Drop items whose `key` equals the key of the previously emitted item.
pub fn distinct_until_changed_by<S, T, K, F>(input: S, key: F) -> BoxStream<'static, T>
where
    S: Stream<Item = T> + Send + 'static,
    T: Send + 'static,
    K: PartialEq + Send + 'static,
    F: FnMut(&T) -> K + Send + 'static,
{
    async_stream::stream! {
        let mut input = Box::pin(input);
        let mut key = key;
        let mut last: Option<K> = None;
        while let Some(item) = input.next().await {
            let current = key(&item);
            if last.as_ref() == Some(&current) {
                continue;
            }
            last = Some(current);
            yield item;
        }
    }
    .boxed()
}

enum Debounced<T> {
    Item(T),
    Quiet,
    End,
}

/// Emit an item only after `period` passes with no newer item.
///
/// A pending item is flushed when the input ends.
pub fn debounce<S, T>(input: S, period: Duration) -> BoxStream<'static, T>
where
    S: Stream<Item = T> + Send + 'static,
    T: Send + 'static,
{
    async_stream::stream! {
        let mut input = Box::pin(input);
        let mut pending: Option<T> = None;
        let quiet = tokio::time::sleep(period);
        tokio::pin!(quiet);

        loop {
            let step = tokio::select! {
                item = input.next() => match item {
                    Some(item) => Debounced::Item(item),
                    None => Debounced::End,
                },
                () = &mut quiet, if pending.is_some() => Debounced::Quiet,
            };

            match step {
                Debounced::Item(item) => {
                    pending = Some(item);
                    quiet.as_mut().reset(Instant::now() + period);
                }
                Debounced::Quiet => {
                    if let Some(item) = pending.take() {
                        yield item;
                    }
                }
                Debounced::End => {
                    if let Some(item) = pending.take() {
                        yield item;
                    }
                    break;
                }
            }
        }
    }
    .boxed()
}

/// Forward items up to and including the first `Err`, then end.
///
/// The input is dropped as soon as the error has been emitted.
pub fn end_after_error<S, T, E>(input: S) -> BoxStream<'static, Result<T, E>>
where
    S: Stream<Item = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    async_stream::stream! {
        let mut input = Box::pin(input);
        while let Some(item) = input.next().await {
            let failed = item.is_err();
            yield item;
            if failed {
                break;
            }
        }
    }
    .boxed()
}

enum Switch<I, T> {
    Outer(Option<I>),
    Inner(Option<T>),
}

/// Flatten a stream of streams, following only the most recent inner stream.
///
/// A new inner stream drops the previous one before anything else is read
/// from it. The output ends once the outer stream and the current inner
/// stream have both ended.
pub fn switch_latest<S, I, T>(outer: S) -> BoxStream<'static, T>
where
    S: Stream<Item = I> + Send + 'static,
    I: Stream<Item = T> + Send + 'static,
    T: Send + 'static,
{
    async_stream::stream! {
        let mut outer = Box::pin(outer);
        let mut outer_done = false;
        let mut current: Option<Pin<Box<I>>> = None;

        loop {
            let step = match current.as_mut() {
                Some(inner) if !outer_done => tokio::select! {
                    biased;
                    next = outer.next() => Switch::Outer(next),
                    item = inner.next() => Switch::Inner(item),
                },
                Some(inner) => Switch::Inner(inner.next().await),
                None if !outer_done => Switch::Outer(outer.next().await),
                None => break,
            };

            match step {
                Switch::Outer(Some(next)) => current = Some(Box::pin(next)),
                Switch::Outer(None) => outer_done = true,
                Switch::Inner(Some(item)) => yield item,
                Switch::Inner(None) => current = None,
            }
        }
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_distinct_until_changed() {
        let out: Vec<i32> = distinct_until_changed(stream::iter([1, 1, 2, 2, 1, 3, 3]))
            .collect()
            .await;
        assert_eq!(out, vec![1, 2, 1, 3]);
    }

    #[tokio::test]
    async fn test_distinct_by_key() {
        let words = ["apple", "avocado", "banana", "blueberry", "apricot"];
        let out: Vec<&str> = distinct_until_changed_by(stream::iter(words), |w| w.chars().next())
            .collect()
            .await;
        assert_eq!(out, vec!["apple", "banana", "apricot"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_keeps_last_of_burst() {
        let input = async_stream::stream! {
            yield 1;
            tokio::time::sleep(Duration::from_millis(100)).await;
            yield 2;
            tokio::time::sleep(Duration::from_millis(100)).await;
            yield 3;
            tokio::time::sleep(Duration::from_millis(500)).await;
            yield 4;
            tokio::time::sleep(Duration::from_millis(500)).await;
        };
        let out: Vec<i32> = debounce(input, Duration::from_millis(300)).collect().await;
        assert_eq!(out, vec![3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_flushes_on_end() {
        let out: Vec<i32> = debounce(stream::iter([1, 2]), Duration::from_secs(10))
            .collect()
            .await;
        assert_eq!(out, vec![2]);
    }

    #[tokio::test]
    async fn test_end_after_error_stops_at_first_error() {
        let input = stream::iter([Ok(1), Err("gone"), Ok(2), Err("again")]);
        let out: Vec<Result<i32, &str>> = end_after_error(input).collect().await;
        assert_eq!(out, vec![Ok(1), Err("gone")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_after_error_stops_switch_before_next_inner() {
        let opened = Arc::new(AtomicUsize::new(0));
        let outer = {
            let opened = opened.clone();
            async_stream::stream! {
                opened.fetch_add(1, Ordering::SeqCst);
                yield stream::iter(vec![Ok::<i32, &str>(1), Err("gone")]);
                tokio::time::sleep(Duration::from_millis(10)).await;
                opened.fetch_add(1, Ordering::SeqCst);
                yield stream::iter(vec![Ok::<i32, &str>(2)]);
            }
        };
        let out: Vec<Result<i32, &str>> =
            end_after_error(switch_latest(outer)).collect().await;
        assert_eq!(out, vec![Ok(1), Err("gone")]);
        assert_eq!(opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_switch_latest_drops_superseded_inner() {
        let outer = stream::iter([stream::iter(vec![1, 2]), stream::iter(vec![3, 4])]);
        let out: Vec<i32> = switch_latest(outer).collect().await;
        assert_eq!(out, vec![3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_latest_drains_inner_between_outer_items() {
        let outer = async_stream::stream! {
            yield stream::iter(vec![1, 2]).boxed();
            tokio::time::sleep(Duration::from_millis(10)).await;
            yield stream::iter(vec![3]).boxed();
        };
        let out: Vec<i32> = switch_latest(outer).collect().await;
        assert_eq!(out, vec![1, 2, 3]);
    }
}
