//! Pull-based operation generators and their combinators.
//!
//! A generator is a cooperative producer: the driver asks for one operation
//! at a time and stops when it gets `None`. Combinators compose schedules
//! without the underlying fault types knowing about each other:
//!
//! - [`FlipFlop`] pairs a disruptive action with its inverse,
//! - [`Mix`] interleaves independent schedules at random,
//! - [`Seq`]/[`Concat`] produce deterministic (cleanup) orders,
//! - [`Delay`] paces a schedule without reordering it.

use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};

use rand::{Rng, RngCore};

use crate::history::Operation;

/// A cooperative producer of operations.
pub trait Generator: Send {
    /// The next operation, or `None` once the schedule is drained.
    fn next_op(&mut self, rng: &mut dyn RngCore) -> Option<Operation>;
}

/// Yields the same operation template forever.
pub struct Repeat {
    op: Operation,
}

impl Repeat {
    pub fn new(op: Operation) -> Self {
        Repeat { op }
    }
}

impl Generator for Repeat {
    fn next_op(&mut self, _rng: &mut dyn RngCore) -> Option<Operation> {
        Some(self.op.clone())
    }
}

/// Yields one of a fixed set of operation templates, chosen uniformly at
/// random on every call. Empty sets are immediately drained.
pub struct Choice {
    ops: Vec<Operation>,
}

impl Choice {
    pub fn new(ops: Vec<Operation>) -> Self {
        Choice { ops }
    }
}

impl Generator for Choice {
    fn next_op(&mut self, rng: &mut dyn RngCore) -> Option<Operation> {
        if self.ops.is_empty() {
            return None;
        }
        let idx = rng.gen_range(0..self.ops.len());
        Some(self.ops[idx].clone())
    }
}

/// Yields a fixed list of operations once, strictly in order.
pub struct Seq {
    ops: VecDeque<Operation>,
}

impl Seq {
    pub fn new(ops: Vec<Operation>) -> Self {
        Seq { ops: ops.into() }
    }
}

impl Generator for Seq {
    fn next_op(&mut self, _rng: &mut dyn RngCore) -> Option<Operation> {
        self.ops.pop_front()
    }
}

/// Alternates between two sub-generators: one op from `a`, one from `b`,
/// repeating until either side drains.
pub struct FlipFlop {
    a: Box<dyn Generator>,
    b: Box<dyn Generator>,
    flipped: bool,
}

impl FlipFlop {
    pub fn new(a: Box<dyn Generator>, b: Box<dyn Generator>) -> Self {
        FlipFlop {
            a,
            b,
            flipped: false,
        }
    }
}

impl Generator for FlipFlop {
    fn next_op(&mut self, rng: &mut dyn RngCore) -> Option<Operation> {
        let side = if self.flipped {
            &mut self.b
        } else {
            &mut self.a
        };
        let op = side.next_op(rng)?;
        self.flipped = !self.flipped;
        Some(op)
    }
}

/// Interleaves sub-generators: each call picks one of the still-live
/// sub-generators uniformly at random and yields its next operation.
/// A drained sub-generator leaves the rotation; each sub-schedule's internal
/// order is preserved relative to itself.
pub struct Mix {
    gens: Vec<Box<dyn Generator>>,
}

impl Mix {
    pub fn new(gens: Vec<Box<dyn Generator>>) -> Self {
        Mix { gens }
    }
}

impl Generator for Mix {
    fn next_op(&mut self, rng: &mut dyn RngCore) -> Option<Operation> {
        while !self.gens.is_empty() {
            let idx = rng.gen_range(0..self.gens.len());
            match self.gens[idx].next_op(rng) {
                Some(op) => return Some(op),
                None => {
                    self.gens.swap_remove(idx);
                }
            }
        }
        None
    }
}

/// Drains each sub-generator completely, in the given order.
pub struct Concat {
    gens: VecDeque<Box<dyn Generator>>,
}

impl Concat {
    pub fn new(gens: Vec<Box<dyn Generator>>) -> Self {
        Concat { gens: gens.into() }
    }
}

impl Generator for Concat {
    fn next_op(&mut self, rng: &mut dyn RngCore) -> Option<Operation> {
        while let Some(front) = self.gens.front_mut() {
            match front.next_op(rng) {
                Some(op) => return Some(op),
                None => {
                    self.gens.pop_front();
                }
            }
        }
        None
    }
}

/// Inserts a minimum wait before each operation the inner generator yields.
/// Pacing only: order is untouched, and the wait happens on the calling
/// driver's thread, never affecting other generators.
pub struct Delay {
    interval: Duration,
    inner: Box<dyn Generator>,
    last_yield: Option<Instant>,
}

impl Delay {
    pub fn new(interval: Duration, inner: Box<dyn Generator>) -> Self {
        Delay {
            interval,
            inner,
            last_yield: None,
        }
    }
}

impl Generator for Delay {
    fn next_op(&mut self, rng: &mut dyn RngCore) -> Option<Operation> {
        let wait = match self.last_yield {
            Some(last) => self.interval.saturating_sub(last.elapsed()),
            None => self.interval,
        };
        if !wait.is_zero() {
            thread::sleep(wait);
        }
        let op = self.inner.next_op(rng)?;
        self.last_yield = Some(Instant::now());
        Some(op)
    }
}
