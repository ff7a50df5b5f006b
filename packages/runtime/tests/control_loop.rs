use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use ctrlbox_core_store::{
    id_chain, object_ref, DataOut, DynamicContainer, IndirectValue, Object, ObjectRef,
    OpenContainer, PrepareMillis, RegionAllocator, RootSlot, TransientValue,
};
use ctrlbox_ll_store::{share, ArrayNvStore, BufferDataIn, BufferDataOut};
use ctrlbox_runtime::{
    CommandChannel, ControlLoop, CycleOutcome, LoopConfig, LoopState, PreparePolicy, StateWatch,
};
use ctrlbox_sys::{ManualTicks, Ticks, VirtualClock};

type Action = Box<dyn FnOnce()>;

/// Advances time on every receive and runs one scripted command per receive.
struct SimChannel {
    ticks: Rc<ManualTicks>,
    step: u32,
    actions: VecDeque<Action>,
    watch: Option<StateWatch>,
    waiting_receives: u32,
    out: BufferDataOut,
}

impl SimChannel {
    fn new(ticks: Rc<ManualTicks>) -> Self {
        Self {
            ticks,
            step: 1,
            actions: VecDeque::new(),
            watch: None,
            waiting_receives: 0,
            out: BufferDataOut::new(),
        }
    }

    fn then(&mut self, action: impl FnOnce() + 'static) {
        self.actions.push_back(Box::new(action));
    }
}

impl CommandChannel for SimChannel {
    fn receive(&mut self) {
        if let Some(watch) = &self.watch {
            if watch.get() == LoopState::Waiting {
                self.waiting_receives += 1;
            }
        }
        if let Some(action) = self.actions.pop_front() {
            action();
        }
        self.ticks.advance(self.step);
    }

    fn data_out(&mut self) -> &mut dyn DataOut {
        &mut self.out
    }
}

#[derive(Default)]
struct Counts {
    prepares: Cell<u32>,
    updates: Cell<u32>,
}

/// Asks for a fixed delay and counts the calls it gets.
struct Probe {
    delay: PrepareMillis,
    counts: Rc<Counts>,
}

impl Object for Probe {
    fn prepare(&mut self) -> PrepareMillis {
        self.counts.prepares.set(self.counts.prepares.get() + 1);
        self.delay
    }

    fn update(&mut self) {
        self.counts.updates.set(self.counts.updates.get() + 1);
    }
}

fn probe(delay: PrepareMillis) -> (ObjectRef, Rc<Counts>) {
    let counts = Rc::new(Counts::default());
    let object = object_ref(Probe {
        delay,
        counts: counts.clone(),
    });
    (object, counts)
}

fn container_of(items: Vec<ObjectRef>) -> ObjectRef {
    let mut container = DynamicContainer::new();
    for (id, item) in items.into_iter().enumerate() {
        container.add(id as i8, item).unwrap();
    }
    object_ref(container)
}

fn sim_loop(root: RootSlot) -> (Rc<ManualTicks>, ControlLoop<SimChannel>) {
    let ticks = Rc::new(ManualTicks::new(0));
    let clock = VirtualClock::new(ticks.clone());
    let mut control = ControlLoop::new(clock, root, SimChannel::new(ticks.clone()));
    let watch = control.state_watch();
    control.channel_mut().watch = Some(watch);
    (ticks, control)
}

#[test]
fn test_root_swap_during_wait_skips_update() {
    let (p1, c1) = probe(10);
    let (p2, c2) = probe(0);
    let r1 = container_of(vec![p1]);
    let r2 = container_of(vec![p2]);
    let slot = RootSlot::with_root(r1);
    let (_, mut control) = sim_loop(slot.clone());

    let swap_slot = slot.clone();
    control.channel_mut().then(move || {
        swap_slot.replace(Some(r2));
    });

    assert_eq!(control.run_once().unwrap(), CycleOutcome::StaleRoot);
    assert_eq!(c1.prepares.get(), 1);
    assert_eq!(c1.updates.get(), 0);
    assert_eq!(c2.prepares.get(), 0);
    assert_eq!(c2.updates.get(), 0);

    assert_eq!(control.run_once().unwrap(), CycleOutcome::Updated);
    assert_eq!(c1.prepares.get(), 1);
    assert_eq!(c2.prepares.get(), 1);
    assert_eq!(c2.updates.get(), 1);
}

#[test]
fn test_wait_polls_channel_until_delay_elapsed() {
    let (p, counts) = probe(10);
    let (ticks, mut control) = sim_loop(RootSlot::with_root(container_of(vec![p])));

    assert_eq!(control.process().unwrap(), CycleOutcome::Updated);
    assert_eq!(control.channel().waiting_receives, 10);
    assert_eq!(ticks.millis(), 10);
    assert_eq!(counts.updates.get(), 1);
    assert_eq!(control.state(), LoopState::Idle);
}

#[test]
fn test_prepare_policy_max_waits_for_longest() {
    let (a, _) = probe(10);
    let (b, _) = probe(3);
    let (_, mut control) = sim_loop(RootSlot::with_root(container_of(vec![a, b])));
    control.process().unwrap();
    assert_eq!(control.channel().waiting_receives, 10);
}

#[test]
fn test_prepare_policy_latest_waits_for_last() {
    let (a, _) = probe(10);
    let (b, _) = probe(3);
    let (_, control) = sim_loop(RootSlot::with_root(container_of(vec![a, b])));
    let config = LoopConfig::from_json(r#"{"prepare_policy": "latest"}"#).unwrap();
    let mut control = control.with_config(config);
    assert_eq!(control.config().prepare_policy, PreparePolicy::Latest);
    control.process().unwrap();
    assert_eq!(control.channel().waiting_receives, 3);
}

#[test]
fn test_wait_is_capped() {
    let (p, _) = probe(10);
    let (_, control) = sim_loop(RootSlot::with_root(container_of(vec![p])));
    let mut control = control.with_config(LoopConfig {
        max_wait_millis: 4,
        ..LoopConfig::default()
    });
    control.process().unwrap();
    assert_eq!(control.channel().waiting_receives, 4);
}

#[test]
fn test_scaled_clock_shortens_real_wait() {
    let (p, _) = probe(10);
    let (_, mut control) = sim_loop(RootSlot::with_root(container_of(vec![p])));

    let clock = control.clock().as_object();
    {
        let mut node = clock.borrow_mut();
        let mut bytes = [0u8; 6];
        bytes[4..].copy_from_slice(&2u16.to_ne_bytes());
        let mut data = BufferDataIn::from_slice(&bytes);
        let mut mask = BufferDataIn::from_slice(&[0, 0, 0, 0, 0xFF, 0xFF]);
        node.as_writable()
            .unwrap()
            .write_masked_from(&mut data, &mut mask)
            .unwrap();
    }

    control.process().unwrap();
    assert_eq!(control.channel().waiting_receives, 5);
}

#[test]
fn test_stalled_clock_wait_ends_after_real_cap() {
    let (p, counts) = probe(10);
    let (_, control) = sim_loop(RootSlot::with_root(container_of(vec![p])));
    let mut control = control.with_config(LoopConfig {
        max_wait_millis: 20,
        ..LoopConfig::default()
    });

    let clock = control.clock().as_object();
    control.channel_mut().then(move || {
        let mut node = clock.borrow_mut();
        let mut data = BufferDataIn::from_slice(&[0; 6]);
        let mut mask = BufferDataIn::from_slice(&[0, 0, 0, 0, 0xFF, 0xFF]);
        node.as_writable()
            .unwrap()
            .write_masked_from(&mut data, &mut mask)
            .unwrap();
    });

    assert_eq!(control.process().unwrap(), CycleOutcome::Updated);
    assert_eq!(control.channel().waiting_receives, 20);
    assert_eq!(counts.updates.get(), 1);
    assert_eq!(control.clock().value().borrow().scale(), 0);
}

#[test]
fn test_indirect_value_in_logged_tree() {
    let nv = share(ArrayNvStore::new(32));
    let slot = RootSlot::new();

    let address = RegionAllocator::whole(nv.clone())
        .allocate_with(&id_chain![2, 0].to_bytes())
        .unwrap();
    let mut indirect = IndirectValue::new(nv, slot.clone());
    indirect.rehydrated(address);

    let inner = container_of(vec![object_ref(TransientValue::new(0x42u8))]);
    let mut root = DynamicContainer::new();
    root.add(2, inner).unwrap();
    root.add(3, object_ref(indirect)).unwrap();
    let root = object_ref(root);
    slot.replace(Some(root.clone()));

    let (_, mut control) = sim_loop(slot);
    control.log_request().raise();
    assert_eq!(control.run_once().unwrap(), CycleOutcome::Updated);
    assert_eq!(
        control.channel().out.data(),
        &[
            0x8A, //
            0x01, 0x82, 0x00, 0x00, 0x01, 0x42, //
            0x01, 0x03, 0x00, 0x01, 0x42,
        ]
    );

    let removal_root = root.clone();
    control.channel_mut().out.reset();
    control.channel_mut().then(move || {
        removal_root
            .borrow_mut()
            .as_open_container()
            .unwrap()
            .remove(2);
    });
    control.run_once().unwrap();
    control.log_request().raise();
    control.run_once().unwrap();
    assert_eq!(control.channel().out.data(), &[0x8A]);
}
