use std::future::Future;

/// Run `steps` one after another.
///
/// Absent steps are skipped without calling `iterator`. Each present step is handed to
/// `iterator`, and the next one only starts once the returned future resolved to `Ok`. The first
/// `Err` stops the queue and is returned. A step that never resolves stalls the queue.
pub(crate) async fn run_queue<T, E, F, Fut>(
    steps: impl IntoIterator<Item = Option<T>>,
    mut iterator: F,
) -> Result<(), E>
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    for step in steps.into_iter().flatten() {
        iterator(step).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::cell::RefCell;

    #[test]
    fn runs_present_steps_in_order() {
        let seen = RefCell::new(Vec::new());
        let steps = [Some(1), None, Some(2), None, Some(3)];

        let result: Result<(), ()> = block_on(run_queue(steps, |step| {
            seen.borrow_mut().push(step);
            async { Ok(()) }
        }));

        assert_eq!(result, Ok(()));
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn stops_at_first_error() {
        let seen = RefCell::new(Vec::new());
        let steps = [Some(1), Some(2), Some(3)];

        let result = block_on(run_queue(steps, |step| {
            seen.borrow_mut().push(step);
            async move {
                match step {
                    2 => Err("halt"),
                    _ => Ok(()),
                }
            }
        }));

        assert_eq!(result, Err("halt"));
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn empty_queue_completes() {
        let steps: [Option<u8>; 2] = [None, None];
        let result: Result<(), ()> = block_on(run_queue(steps, |_| async { Ok(()) }));
        assert_eq!(result, Ok(()));
    }
}
