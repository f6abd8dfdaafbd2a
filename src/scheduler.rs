//! Carousel scheduling: the active slide cursor plus the auto-advance timer.
//!
//! All state here is owned by the main event loop and mutated one event at
//! a time, so no transition can interleave with another. The timer does not
//! spawn anything; it holds a single deadline that the loop checks against
//! the current instant each frame.

use std::time::{Duration, Instant};

/// Repeating auto-advance timer.
///
/// `deadline` is the one outstanding tick; `None` means autoplay is
/// stopped. Holding it as an `Option` makes two live timers unrepresentable.
#[derive(Debug)]
struct AutoplayTimer {
    interval: Duration,
    deadline: Option<Instant>,
}

impl AutoplayTimer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    /// Arm a fresh full-length interval. Any previous deadline is released
    /// first, so compounding advance rates cannot happen.
    fn arm(&mut self, now: Instant) {
        self.stop();
        self.deadline = Some(now + self.interval);
    }

    /// Idempotent; safe to call with no timer outstanding.
    fn stop(&mut self) {
        self.deadline = None;
    }

    /// Whether the deadline has passed. Re-arms from `now` when it fires,
    /// keeping consecutive ticks a full interval apart.
    fn fired(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }

    fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }
}

/// State machine driving the carousel.
///
/// Owns the sole mutable selection state (the active index) and the
/// autoplay timer. User navigation stops the timer; only a pointer-leave
/// resume re-arms it.
pub struct SlideScheduler {
    slide_count: usize,
    active_index: usize,
    timer: AutoplayTimer,
}

impl SlideScheduler {
    /// New scheduler over `slide_count` slides, autoplay running.
    pub fn new(slide_count: usize, interval: Duration, now: Instant) -> Self {
        debug_assert!(slide_count > 0, "scheduler needs a non-empty deck");
        let mut timer = AutoplayTimer::new(interval);
        timer.arm(now);
        Self {
            slide_count,
            active_index: 0,
            timer,
        }
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn is_autoplaying(&self) -> bool {
        self.timer.is_armed()
    }

    /// Step the cursor with modulo wraparound; never leaves `[0, N)`.
    fn advance(&mut self, step: i64) {
        let n = self.slide_count as i64;
        let index = self.active_index as i64;
        self.active_index = ((index + step % n + n) % n) as usize;
    }

    /// Timer-driven forward advance. Returns true when the index moved.
    /// One advance per call; the event loop calls this every frame.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.timer.fired(now) {
            self.advance(1);
            true
        } else {
            false
        }
    }

    /// User navigation: step forward and suppress autoplay until an
    /// explicit pointer-leave resume.
    pub fn next(&mut self) {
        self.advance(1);
        self.timer.stop();
    }

    /// User navigation: step backward and suppress autoplay.
    pub fn previous(&mut self) {
        self.advance(-1);
        self.timer.stop();
    }

    /// Pointer entered the carousel area: pause autoplay.
    pub fn pointer_enter(&mut self) {
        self.timer.stop();
    }

    /// Pointer left: resume with a fresh full-length interval. Resuming
    /// always restarts the forward timer, including after a backward user
    /// navigation.
    pub fn pointer_leave(&mut self, now: Instant) {
        self.timer.arm(now);
    }

    /// Release the timer on teardown. No tick fires afterwards.
    pub fn shutdown(&mut self) {
        self.timer.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(1800);

    fn scheduler(slides: usize) -> (SlideScheduler, Instant) {
        let start = Instant::now();
        (SlideScheduler::new(slides, INTERVAL, start), start)
    }

    #[test]
    fn test_forward_cycle_returns_to_start() {
        for n in 1..=5 {
            let (mut s, _) = scheduler(n);
            for _ in 0..n {
                s.next();
            }
            assert_eq!(s.active_index(), 0, "cycle broken for {} slides", n);
        }
    }

    #[test]
    fn test_backward_inverts_forward() {
        let (mut s, _) = scheduler(3);
        s.next();
        s.previous();
        assert_eq!(s.active_index(), 0);

        // Also across the wraparound edge.
        s.previous();
        assert_eq!(s.active_index(), 2);
        s.next();
        assert_eq!(s.active_index(), 0);
    }

    #[test]
    fn test_tick_advances_on_deadline() {
        let (mut s, start) = scheduler(3);
        assert!(!s.tick(start));
        assert!(!s.tick(start + INTERVAL / 2));
        assert!(s.tick(start + INTERVAL));
        assert_eq!(s.active_index(), 1);
    }

    #[test]
    fn test_no_tick_while_paused() {
        let (mut s, start) = scheduler(3);
        s.pointer_enter();
        assert!(!s.is_autoplaying());

        // Well past two full intervals of simulated time.
        assert!(!s.tick(start + INTERVAL));
        assert!(!s.tick(start + INTERVAL * 2));
        assert!(!s.tick(start + INTERVAL * 2 + Duration::from_millis(1)));
        assert_eq!(s.active_index(), 0);
    }

    #[test]
    fn test_resume_fires_exactly_once_per_interval() {
        let (mut s, start) = scheduler(3);
        s.pointer_enter();
        let resumed = start + Duration::from_millis(300);
        s.pointer_leave(resumed);
        assert!(s.is_autoplaying());

        // Nothing before the fresh interval elapses.
        assert!(!s.tick(resumed + INTERVAL - Duration::from_millis(1)));

        // One tick at the deadline, not duplicated on the next check.
        assert!(s.tick(resumed + INTERVAL));
        assert!(!s.tick(resumed + INTERVAL));
        assert_eq!(s.active_index(), 1);

        // The follow-up tick lands a full interval later.
        assert!(s.tick(resumed + INTERVAL * 2));
        assert_eq!(s.active_index(), 2);
    }

    #[test]
    fn test_user_navigation_stops_autoplay() {
        let (mut s, start) = scheduler(3);
        assert!(s.is_autoplaying());
        s.next();
        assert!(!s.is_autoplaying());
        assert_eq!(s.active_index(), 1);

        // No tick until an explicit resume.
        assert!(!s.tick(start + INTERVAL * 5));
        assert_eq!(s.active_index(), 1);
    }

    #[test]
    fn test_previous_also_stops_autoplay() {
        let (mut s, start) = scheduler(3);
        s.previous();
        assert!(!s.is_autoplaying());
        assert!(!s.tick(start + INTERVAL * 3));
        assert_eq!(s.active_index(), 2);
    }

    #[test]
    fn test_shutdown_releases_timer() {
        let (mut s, start) = scheduler(3);
        s.shutdown();
        for k in 1..10u32 {
            assert!(!s.tick(start + INTERVAL * k));
        }
        assert_eq!(s.active_index(), 0);
        assert!(!s.is_autoplaying());
    }

    #[test]
    fn test_manual_nav_then_resume_scenario() {
        // 3 slides, start at 0. UserNext -> 1 and timer stopped;
        // pointer-leave restarts it; one interval later a tick lands on 2.
        let (mut s, start) = scheduler(3);
        s.next();
        assert_eq!(s.active_index(), 1);
        assert!(!s.is_autoplaying());

        let resumed = start + Duration::from_millis(500);
        s.pointer_leave(resumed);
        assert!(s.is_autoplaying());

        assert!(s.tick(resumed + INTERVAL));
        assert_eq!(s.active_index(), 2);
    }

    #[test]
    fn test_pointer_leave_is_stop_then_start() {
        let (mut s, start) = scheduler(3);

        // Repeated leaves must not stack deadlines: only the freshest one
        // counts, and each fires a single advance.
        let t1 = start + Duration::from_millis(100);
        let t2 = start + Duration::from_millis(200);
        s.pointer_leave(t1);
        s.pointer_leave(t2);

        assert!(!s.tick(t1 + INTERVAL));
        assert!(s.tick(t2 + INTERVAL));
        assert!(!s.tick(t2 + INTERVAL));
        assert_eq!(s.active_index(), 1);
    }

    #[test]
    fn test_single_slide_wraps_in_place() {
        let (mut s, start) = scheduler(1);
        assert!(s.tick(start + INTERVAL));
        assert_eq!(s.active_index(), 0);
        s.next();
        assert_eq!(s.active_index(), 0);
        s.previous();
        assert_eq!(s.active_index(), 0);
    }
}
