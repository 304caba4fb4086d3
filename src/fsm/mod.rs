//! Function-pointer finite state machine engine.
//!
//! Classic embedded FSM pattern ported to Rust:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  StateTable<H>                                              │
//! │  ┌────────────┬──────────────┬─────────────────────────┐    │
//! │  │ StateId    │ on_enter     │ on_update               │    │
//! │  ├────────────┼──────────────┼─────────────────────────┤    │
//! │  │ InitCharge │ -            │ fn(ctx, hw) -> Option<> │    │
//! │  │ Integrate  │ -            │ fn(ctx, hw) -> Option<> │    │
//! │  │ TrackPower │ -            │ fn(ctx, hw) -> Option<> │    │
//! │  │ Done       │ fn(ctx, hw)  │ fn(ctx, hw) -> Option<> │    │
//! │  └────────────┴──────────────┴─────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each foreground pass the engine calls `on_update` for the **current**
//! state.  If it returns `Some(next_id)`, the engine runs `on_exit` for
//! the current state, then `on_enter` for the next, and updates the
//! current pointer.  Handlers receive the [`ChargeContext`] blackboard and
//! the board hardware `H`, so the whole table runs against mocks on the
//! host.

pub mod context;
pub mod states;

use context::ChargeContext;
use log::debug;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Charging state machine states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    InitCharge = 0,
    Integrate = 1,
    TrackPower = 2,
    Done = 3,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 4;

    /// Convert a table index back to `StateId`.  Out-of-range indices map
    /// to `Done`, the only state that never switches the converter.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::InitCharge,
            1 => Self::Integrate,
            2 => Self::TrackPower,
            3 => Self::Done,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Done
            }
        }
    }

    /// True for the two states the phase scheduler alternates between.
    pub fn is_switching(self) -> bool {
        matches!(self, Self::Integrate | Self::TrackPower)
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn<H> = fn(&mut ChargeContext, &mut H);

/// Signature for the per-pass update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn<H> = fn(&mut ChargeContext, &mut H) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
/// Stored in a fixed-size array indexed by `StateId`.
pub struct StateDescriptor<H> {
    pub name: &'static str,
    pub on_enter: Option<StateActionFn<H>>,
    pub on_exit: Option<StateActionFn<H>>,
    pub on_update: StateUpdateFn<H>,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
pub struct Fsm<H> {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor<H>; StateId::COUNT],
    current: usize,
}

impl<H> Fsm<H> {
    pub fn new(table: [StateDescriptor<H>; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut ChargeContext, hw: &mut H) {
        debug!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx, hw);
        }
    }

    /// Advance the FSM by one foreground pass.
    ///
    /// 1. Call `on_update` for the current state.
    /// 2. If it returns `Some(next)`, execute the transition:
    ///    `on_exit(current)` → update pointer → `on_enter(next)`.
    pub fn tick(&mut self, ctx: &mut ChargeContext, hw: &mut H) {
        let next = (self.table[self.current].on_update)(ctx, hw);

        if let Some(next_id) = next {
            self.transition(next_id, ctx, hw);
        }
    }

    /// Force an immediate transition.  Used to follow the phase the
    /// scheduler callback published.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut ChargeContext, hw: &mut H) {
        if next as usize != self.current {
            self.transition(next, ctx, hw);
        }
    }

    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }


    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut ChargeContext, hw: &mut H) {
        let next_idx = next_id as usize;

        // Phase flips happen twice per switching period; keep them at debug.
        debug!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx, hw);
        }

        self.current = next_idx;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx, hw);
        }
    }
}
