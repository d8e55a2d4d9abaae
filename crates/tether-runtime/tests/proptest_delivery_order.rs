//! Property-based tests for broker delivery.
//!
//! A reference model (an ordered list of live subscriptions per source)
//! is driven alongside the broker through random add / remove / release /
//! cleanup sequences.
//!
//! 1. Firing a source reaches exactly the model's live listeners, in
//!    registration order.
//! 2. After an idle pass, the broker's sink count per source equals the
//!    model's, and sources with no subscriptions have no entry. Releases
//!    alone are enough to get there; no fire or manual scheduling needed.
//! 3. Removing a pair that is not registered never changes delivery.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use tether_core::WeakHandle;
use tether_runtime::{CanExecuteChanged, Command, Listener, UiContext};

const SOURCES: usize = 3;
const LISTENERS: usize = 5;

#[derive(Debug, Clone)]
enum Op {
    Add { source: usize, listener: usize },
    Remove { source: usize, listener: usize },
    Release { listener: usize },
    Cleanup,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..SOURCES, 0..LISTENERS).prop_map(|(source, listener)| Op::Add { source, listener }),
        2 => (0..SOURCES, 0..LISTENERS).prop_map(|(source, listener)| Op::Remove { source, listener }),
        1 => (0..LISTENERS).prop_map(|listener| Op::Release { listener }),
        1 => Just(Op::Cleanup),
    ]
}

struct Tag {
    id: usize,
    log: Rc<RefCell<Vec<usize>>>,
}

struct World {
    ctx: UiContext,
    sources: Vec<WeakHandle<Command>>,
    targets: Vec<WeakHandle<Tag>>,
    listeners: Vec<Listener<CanExecuteChanged>>,
    released: Vec<bool>,
    log: Rc<RefCell<Vec<usize>>>,
    /// Registered listener ids per source, in registration order.
    model: Vec<Vec<usize>>,
}

impl World {
    fn new() -> Self {
        let mut ctx = UiContext::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sources = (0..SOURCES)
            .map(|i| ctx.alloc(Command::new(format!("cmd{i}"))))
            .collect();
        let mut targets = Vec::new();
        let mut listeners = Vec::new();
        for id in 0..LISTENERS {
            let target = ctx.alloc(Tag {
                id,
                log: Rc::clone(&log),
            });
            listeners.push(Listener::<CanExecuteChanged>::bound(target, |t: &Tag, _, _| {
                t.log.borrow_mut().push(t.id);
            }));
            targets.push(target);
        }
        Self {
            ctx,
            sources,
            targets,
            listeners,
            released: vec![false; LISTENERS],
            log,
            model: vec![Vec::new(); SOURCES],
        }
    }

    fn apply(&mut self, op: &Op) {
        match *op {
            Op::Add { source, listener } => {
                let result = self
                    .ctx
                    .add_handler::<CanExecuteChanged>(self.sources[source], &self.listeners[listener]);
                if self.released[listener] {
                    assert!(result.is_err());
                } else {
                    assert!(result.is_ok());
                    self.model[source].push(listener);
                }
            }
            Op::Remove { source, listener } => {
                let result = self
                    .ctx
                    .remove_handler::<CanExecuteChanged>(self.sources[source], &self.listeners[listener]);
                if self.released[listener] {
                    assert_eq!(result, Ok(false));
                } else {
                    let model = &mut self.model[source];
                    let expected = model.iter().position(|&l| l == listener);
                    if let Some(pos) = expected {
                        model.remove(pos);
                    }
                    assert_eq!(result, Ok(expected.is_some()));
                }
            }
            Op::Release { listener } => {
                self.ctx.release(self.targets[listener]);
                self.released[listener] = true;
                for model in &mut self.model {
                    model.retain(|&l| l != listener);
                }
            }
            Op::Cleanup => {
                self.ctx.process_idle();
            }
        }
    }

    fn fire(&self, source: usize) -> Vec<usize> {
        self.ctx
            .heap()
            .get(self.sources[source])
            .expect("sources are never released")
            .raise_can_execute_changed(self.ctx.heap());
        std::mem::take(&mut *self.log.borrow_mut())
    }
}

proptest! {
    #[test]
    fn delivery_matches_model(ops in proptest::collection::vec(op_strategy(), 1..80)) {
        let mut world = World::new();
        for op in &ops {
            world.apply(op);
            for source in 0..SOURCES {
                let delivered = world.fire(source);
                prop_assert_eq!(&delivered, &world.model[source], "after {:?}", op);
            }
        }
    }

    #[test]
    fn cleanup_converges_to_model(ops in proptest::collection::vec(op_strategy(), 1..80)) {
        let mut world = World::new();
        for op in &ops {
            world.apply(op);
        }
        world.apply(&Op::Cleanup);

        let broker = world.ctx.broker::<CanExecuteChanged>();
        for source in 0..SOURCES {
            let expected = world.model[source].len();
            prop_assert_eq!(broker.sink_count(world.sources[source]), expected);
            prop_assert_eq!(broker.has_source(world.sources[source]), expected > 0);
        }
    }
}
