use std::{
    cmp::Reverse,
    collections::BinaryHeap,
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use tracing::trace;

/// Simulated time elapsed since the start of the simulation.
pub type SimTime = Duration;

/// Identifies the simulated thread of control (usually a node id) an event executes in.
pub type Context = u32;

/// The context of events scheduled outside of any node.
pub const NO_CONTEXT: Context = u32::MAX;

/// A scheduled event. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u64);

type Event = Box<dyn FnOnce() + Send + 'static>;

struct Pending {
    at: SimTime,
    context: Context,
    event: Event,
}

struct Core {
    now: SimTime,
    /// Context of the event currently executing.
    context: Context,
    next_id: u64,
    /// Ordered by time, then by id. Cancelled events leave stale entries behind which are
    /// skipped when popped.
    queue: BinaryHeap<Reverse<(SimTime, u64)>>,
    events: FxHashMap<u64, Pending>,
    stopped: bool,
}

impl Core {
    /// Returns the time of the next live event, discarding stale heads on the way.
    fn next_time(&mut self) -> Option<SimTime> {
        while let Some(&Reverse((at, id))) = self.queue.peek() {
            if self.events.contains_key(&id) {
                return Some(at);
            }
            self.queue.pop();
        }
        None
    }
}

struct Shared {
    core: Mutex<Core>,
    /// Signalled whenever an event is scheduled.
    wakeup: Condvar,
}

/// A cheap, thread-safe handle for scheduling and cancelling events.
#[derive(Clone)]
pub struct SimHandle {
    shared: Arc<Shared>,
}

impl SimHandle {
    /// The current simulated time.
    pub fn now(&self) -> SimTime {
        self.shared.core.lock().now
    }

    /// The context of the event currently executing, or [`NO_CONTEXT`].
    pub fn context(&self) -> Context {
        self.shared.core.lock().context
    }

    /// Schedules `f` to run `delay` after now, in the context of the current event.
    pub fn schedule<F>(&self, delay: Duration, f: F) -> EventId
    where
        F: FnOnce() + Send + 'static,
    {
        let mut core = self.shared.core.lock();
        let context = core.context;
        self.insert(&mut core, context, delay, Box::new(f))
    }

    /// Schedules `f` to run `delay` after now, in `context`. This is how events are posted
    /// from threads that are not driving the simulation.
    pub fn schedule_with_context<F>(&self, context: Context, delay: Duration, f: F) -> EventId
    where
        F: FnOnce() + Send + 'static,
    {
        let mut core = self.shared.core.lock();
        self.insert(&mut core, context, delay, Box::new(f))
    }

    fn insert(&self, core: &mut Core, context: Context, delay: Duration, event: Event) -> EventId {
        let id = core.next_id;
        core.next_id += 1;

        let at = core.now.saturating_add(delay);
        core.queue.push(Reverse((at, id)));
        core.events.insert(id, Pending { at, context, event });

        self.shared.wakeup.notify_all();
        EventId(id)
    }

    /// Cancels a pending event. Returns `false` if it already ran or was cancelled.
    pub fn cancel(&self, id: EventId) -> bool {
        // Dropped after the lock is released, the event may own things with their own `Drop`.
        let removed = self.shared.core.lock().events.remove(&id.0);
        removed.is_some()
    }

    /// Returns `true` if `id` has neither run nor been cancelled.
    pub fn is_pending(&self, id: EventId) -> bool {
        self.shared.core.lock().events.contains_key(&id.0)
    }

    /// The time a pending event is due at.
    pub fn scheduled_at(&self, id: EventId) -> Option<SimTime> {
        self.shared.core.lock().events.get(&id.0).map(|pending| pending.at)
    }

    /// Number of events waiting to run.
    pub fn pending(&self) -> usize {
        self.shared.core.lock().events.len()
    }

    /// Makes [`Simulator::run`] return after the event currently executing.
    pub fn stop(&self) {
        self.shared.core.lock().stopped = true;
    }
}

impl fmt::Debug for SimHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.shared.core.lock();
        f.debug_struct("SimHandle")
            .field("now", &core.now)
            .field("pending", &core.events.len())
            .finish()
    }
}

/// Drives the simulation. Events only ever execute on the thread calling into the simulator.
#[derive(Debug)]
pub struct Simulator {
    handle: SimHandle,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    /// Creates a simulator at time zero with nothing scheduled.
    pub fn new() -> Self {
        let core = Core {
            now: SimTime::ZERO,
            context: NO_CONTEXT,
            next_id: 0,
            queue: BinaryHeap::new(),
            events: FxHashMap::default(),
            stopped: false,
        };

        let shared = Arc::new(Shared { core: Mutex::new(core), wakeup: Condvar::new() });
        Self { handle: SimHandle { shared } }
    }

    /// Returns a handle that schedules into this simulator from any thread.
    pub fn handle(&self) -> SimHandle {
        self.handle.clone()
    }

    /// The current simulated time.
    pub fn now(&self) -> SimTime {
        self.handle.now()
    }

    /// Runs the next event, advancing the clock to its timestamp. Returns `false` if there
    /// was nothing to run.
    ///
    /// The scheduler lock is released while the event executes, so events are free to
    /// schedule and cancel other events.
    pub fn step(&mut self) -> bool {
        let (id, pending) = {
            let mut core = self.handle.shared.core.lock();
            if core.next_time().is_none() {
                return false;
            }

            let Some(Reverse((_, id))) = core.queue.pop() else { return false };
            let Some(pending) = core.events.remove(&id) else { return false };

            core.now = pending.at;
            core.context = pending.context;
            (id, pending)
        };

        trace!(id, at = ?pending.at, context = pending.context, "executing event");
        (pending.event)();

        self.handle.shared.core.lock().context = NO_CONTEXT;
        true
    }

    fn is_stopped(&self) -> bool {
        self.handle.shared.core.lock().stopped
    }

    /// Runs events until none are left or [`SimHandle::stop`] is called.
    pub fn run(&mut self) {
        self.handle.shared.core.lock().stopped = false;

        while !self.is_stopped() && self.step() {}
    }

    /// Runs every event due at or before `until`, then moves the clock to `until`.
    pub fn run_until(&mut self, until: SimTime) {
        loop {
            let next = self.handle.shared.core.lock().next_time();
            match next {
                Some(at) if at <= until => {
                    self.step();
                }
                _ => break,
            }
        }

        let mut core = self.handle.shared.core.lock();
        core.now = core.now.max(until);
    }

    /// Blocks until an event is pending or `timeout` elapses. Returns `true` if an event is
    /// pending.
    pub fn wait_for_events(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut core = self.handle.shared.core.lock();

        while core.events.is_empty() {
            if self.handle.shared.wakeup.wait_until(&mut core, deadline).timed_out() {
                break;
            }
        }

        !core.events.is_empty()
    }

    /// Keeps running events as they arrive from other threads, returning once no event has
    /// shown up for `quiet`.
    pub fn run_until_quiet(&mut self, quiet: Duration) {
        loop {
            self.run();
            if self.is_stopped() || !self.wait_for_events(quiet) {
                break;
            }
        }
    }
}
