//! The two-phase control loop.
//!
//! Each cycle:
//!
//! 1. **Preparing**: walk the current root, calling `prepare` on every object
//!    and combining the delays they report.
//! 2. **Waiting**: poll the command channel until that much virtual time has
//!    passed. Commands may change anything, the root included. The wait also
//!    ends once `max_wait_millis` of real time has passed, so a clock scaled
//!    to 0 cannot hang the loop.
//! 3. **Updating**: if the root is still the one that was prepared, walk it
//!    again calling `update`, then serve a pending log request.
//!
//! A root replaced while waiting was never prepared, so the update pass is
//! skipped for that cycle. The new root is prepared fresh on the next one.

use std::cell::Cell;
use std::ops::ControlFlow;
use std::rc::Rc;

use ctrlbox_core_store::{walk_root, IdChain, ObjectRef, PrepareMillis, RootSlot, Visitor};
use ctrlbox_sys::{TicksMillis, VirtualClock};

use crate::channel::{CommandChannel, LogRequest};
use crate::config::{LoopConfig, PreparePolicy};
use crate::error::Result;
use crate::value_log::log_values;

/// Where the loop is within a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoopState {
    #[default]
    Idle,
    Preparing,
    Waiting,
    Updating,
}

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The tree was updated.
    Updated,
    /// The root changed while waiting; nothing was updated.
    StaleRoot,
    /// There was no root to run.
    NoRoot,
}

/// Read-only view of the loop state, usable from inside commands.
#[derive(Debug, Clone, Default)]
pub struct StateWatch {
    state: Rc<Cell<LoopState>>,
}

impl StateWatch {
    pub fn get(&self) -> LoopState {
        self.state.get()
    }
}

/// Combines prepare delays into the wait for this cycle.
///
/// Each delay counts from the moment its object reported it, so objects
/// prepared late in a slow walk push the deadline out accordingly.
struct PrepareVisitor<'a> {
    clock: &'a VirtualClock,
    policy: PreparePolicy,
    start: TicksMillis,
    wait: TicksMillis,
}

impl PrepareVisitor<'_> {
    fn record(&mut self, delay: PrepareMillis) {
        if delay == 0 {
            return;
        }
        let elapsed = self.clock.millis().wrapping_sub(self.start);
        let deadline = elapsed.saturating_add(delay as TicksMillis);
        self.wait = match self.policy {
            PreparePolicy::Max => self.wait.max(deadline),
            PreparePolicy::Latest => deadline,
        };
    }
}

impl Visitor for PrepareVisitor<'_> {
    fn enter(&mut self, object: &ObjectRef, chain: &IdChain) -> ControlFlow<()> {
        log::trace!("prepare {}", chain);
        let delay = match object.try_borrow_mut() {
            Ok(mut o) => o.prepare(),
            Err(_) => {
                log::warn!("object at {} busy, not prepared", chain);
                0
            }
        };
        self.record(delay);
        ControlFlow::Continue(())
    }
}

struct UpdateVisitor;

impl Visitor for UpdateVisitor {
    fn enter(&mut self, object: &ObjectRef, chain: &IdChain) -> ControlFlow<()> {
        log::trace!("update {}", chain);
        match object.try_borrow_mut() {
            Ok(mut o) => o.update(),
            Err(_) => log::warn!("object at {} busy, not updated", chain),
        }
        ControlFlow::Continue(())
    }
}

/// Drives the object tree, one prepare/wait/update cycle at a time.
pub struct ControlLoop<C: CommandChannel> {
    config: LoopConfig,
    clock: VirtualClock,
    root: RootSlot,
    channel: C,
    log_request: LogRequest,
    state: Rc<Cell<LoopState>>,
}

impl<C: CommandChannel> ControlLoop<C> {
    pub fn new(clock: VirtualClock, root: RootSlot, channel: C) -> Self {
        Self {
            config: LoopConfig::default(),
            clock,
            root,
            channel,
            log_request: LogRequest::new(),
            state: Rc::new(Cell::new(LoopState::Idle)),
        }
    }

    pub fn with_config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    /// Share a log request with the commands that raise it.
    pub fn with_log_request(mut self, log_request: LogRequest) -> Self {
        self.log_request = log_request;
        self
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn clock(&self) -> &VirtualClock {
        &self.clock
    }

    pub fn root(&self) -> &RootSlot {
        &self.root
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn log_request(&self) -> LogRequest {
        self.log_request.clone()
    }

    pub fn state(&self) -> LoopState {
        self.state.get()
    }

    pub fn state_watch(&self) -> StateWatch {
        StateWatch {
            state: self.state.clone(),
        }
    }

    fn enter(&self, state: LoopState) {
        log::trace!("{:?} -> {:?}", self.state.get(), state);
        self.state.set(state);
    }

    /// Run one cycle: prepare, wait, and update if the root is unchanged.
    pub fn process(&mut self) -> Result<CycleOutcome> {
        let Some(root) = self.root.get() else {
            return Ok(CycleOutcome::NoRoot);
        };

        self.enter(LoopState::Preparing);
        let start = self.clock.millis();
        let wait = self.prepare(&root, start);

        self.enter(LoopState::Waiting);
        log::debug!("waiting {} ms", wait);
        let real_start = self.clock.base_millis();
        while self.clock.millis().wrapping_sub(start) < wait {
            // virtual time can stall at scale 0; real time still bounds the wait
            let real_elapsed = self.clock.base_millis().wrapping_sub(real_start);
            if real_elapsed >= self.config.max_wait_millis {
                log::warn!("virtual clock stalled, wait cut after {} ms", real_elapsed);
                break;
            }
            self.channel.receive();
        }

        if !self.root.is_current(&root) {
            log::warn!("root replaced while waiting, update skipped");
            self.enter(LoopState::Idle);
            return Ok(CycleOutcome::StaleRoot);
        }

        self.enter(LoopState::Updating);
        let _ = walk_root(&root, &mut UpdateVisitor);

        let logged = if self.log_request.take() {
            log_values(&root, self.config.log_frame_tag, self.channel.data_out()).map(|_| ())
        } else {
            Ok(())
        };
        self.enter(LoopState::Idle);
        logged?;
        Ok(CycleOutcome::Updated)
    }

    fn prepare(&self, root: &ObjectRef, start: TicksMillis) -> TicksMillis {
        let mut visitor = PrepareVisitor {
            clock: &self.clock,
            policy: self.config.prepare_policy,
            start,
            wait: 0,
        };
        let _ = walk_root(root, &mut visitor);
        visitor.wait.min(self.config.max_wait_millis)
    }

    /// One full loop iteration: a cycle followed by one more receive.
    pub fn run_once(&mut self) -> Result<CycleOutcome> {
        let outcome = self.process();
        self.channel.receive();
        outcome
    }

    /// Run `cycles` iterations, stopping at the first error.
    pub fn run_cycles(&mut self, cycles: usize) -> Result<Vec<CycleOutcome>> {
        (0..cycles).map(|_| self.run_once()).collect()
    }
}
