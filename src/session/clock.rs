use crate::session::model::SessionDuration;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
#[cfg(test)]
use std::sync::Mutex;
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    Elapsed,
    Cancelled,
}

/// Cancels a running countdown. Dropping the handle leaves the countdown running.
#[derive(Debug)]
pub struct TimerHandle {
    cancel: oneshot::Sender<()>,
}

impl TimerHandle {
    /// Best-effort cancellation. Returns false when the countdown already
    /// resolved, in which case nothing happens.
    pub fn cancel(self) -> bool {
        self.cancel.send(()).is_ok()
    }
}

/// A single countdown started by a [`SessionClock`].
pub struct Countdown {
    expiry: BoxFuture<'static, ()>,
    cancelled: oneshot::Receiver<()>,
}

impl Countdown {
    /// Resolves exactly once, either on elapse or on cancellation.
    pub async fn wait(self) -> TimerOutcome {
        let Countdown { expiry, cancelled } = self;
        tokio::select! {
            _ = expiry => TimerOutcome::Elapsed,
            Ok(()) = cancelled => TimerOutcome::Cancelled,
        }
    }
}

pub trait SessionClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Future that resolves once `duration` has elapsed.
    fn sleep(&self, duration: SessionDuration) -> BoxFuture<'static, ()>;

    fn start(&self, duration: SessionDuration) -> (TimerHandle, Countdown) {
        let (cancel, cancelled) = oneshot::channel();
        let countdown = Countdown {
            expiry: self.sleep(duration),
            cancelled,
        };
        (TimerHandle { cancel }, countdown)
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        handle.cancel()
    }
}

/// Wall clock backed by tokio's timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

impl SessionClock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: SessionDuration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration.to_std()))
    }
}

/// Clock that only moves when told to. Timers fire inside [`ManualClock::advance`].
#[cfg(test)]
pub struct ManualClock {
    state: Mutex<ManualState>,
}

#[cfg(test)]
struct ManualState {
    now: DateTime<Utc>,
    timers: Vec<(DateTime<Utc>, oneshot::Sender<()>)>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::new(ManualState {
                now: start,
                timers: Vec::new(),
            }),
        }
    }

    pub fn advance(&self, secs: i64) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.now += chrono::Duration::seconds(secs);
        let now = state.now;

        let (due, pending): (Vec<_>, Vec<_>) = state
            .timers
            .drain(..)
            .partition(|(deadline, _)| *deadline <= now);
        state.timers = pending;

        for (_, fire) in due {
            let _ = fire.send(());
        }
    }

    pub fn pending_timers(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.timers.iter().filter(|(_, fire)| !fire.is_closed()).count()
    }
}

#[cfg(test)]
impl SessionClock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).now
    }

    fn sleep(&self, duration: SessionDuration) -> BoxFuture<'static, ()> {
        let (fire, fired) = oneshot::channel();
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            // A deadline past the end of time is never reached.
            match duration.to_chrono().and_then(|delta| state.now.checked_add_signed(delta)) {
                Some(deadline) if deadline <= state.now => {
                    let _ = fire.send(());
                }
                Some(deadline) => state.timers.push((deadline, fire)),
                None => drop(fire),
            }
        }

        Box::pin(async move {
            // A dropped clock never fires.
            if fired.await.is_err() {
                futures::future::pending::<()>().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn countdown_elapses_after_full_duration() {
        let clock = clock();
        let (_handle, countdown) = clock.start(SessionDuration::from_secs(5));
        let waiter = tokio::spawn(countdown.wait());

        clock.advance(4);
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        clock.advance(1);
        assert_eq!(waiter.await.unwrap(), TimerOutcome::Elapsed);
    }

    #[tokio::test]
    async fn cancel_before_elapse_resolves_as_cancelled() {
        let clock = clock();
        let (handle, countdown) = clock.start(SessionDuration::from_secs(5));

        assert!(clock.cancel(handle));
        assert_eq!(countdown.wait().await, TimerOutcome::Cancelled);
    }

    #[tokio::test]
    async fn cancel_after_fire_is_a_no_op() {
        let clock = clock();
        let (handle, countdown) = clock.start(SessionDuration::from_secs(2));

        clock.advance(2);
        assert_eq!(countdown.wait().await, TimerOutcome::Elapsed);
        assert!(!handle.cancel());
    }

    #[tokio::test]
    async fn dropping_the_handle_keeps_the_countdown_running() {
        let clock = clock();
        let (handle, countdown) = clock.start(SessionDuration::from_secs(3));
        drop(handle);

        clock.advance(3);
        assert_eq!(countdown.wait().await, TimerOutcome::Elapsed);
    }

    #[test]
    fn advance_moves_now() {
        let clock = clock();
        let before = clock.now();
        clock.advance(90);
        assert_eq!(clock.now() - before, chrono::Duration::seconds(90));
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_clock_sleeps_for_whole_seconds() {
        let started = tokio::time::Instant::now();
        TokioClock.sleep(SessionDuration::from_secs(3)).await;
        assert_eq!(started.elapsed().as_secs(), 3);
    }
}
