use collector_core::{update, BatchState, Effect, Msg};
use tokio::sync::watch;

/// Result of running one message through the state machine.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub state: BatchState,
    pub effects: Vec<Effect>,
}

/// Single owner of the batch state.
///
/// Every mutation goes through [`JobStore::dispatch`], which applies the pure
/// `update` function in place and notifies subscribers only when something
/// changed.
#[derive(Debug)]
pub struct JobStore {
    tx: watch::Sender<BatchState>,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(BatchState::new());
        Self { tx }
    }

    pub fn dispatch(&self, msg: Msg) -> Dispatched {
        match self.try_dispatch(msg, |_| Ok::<(), std::convert::Infallible>(())) {
            Ok(dispatched) => dispatched,
            Err(never) => match never {},
        }
    }

    /// Dispatch `msg` only if `check` accepts the state it would apply to.
    ///
    /// The check and the update run under the same lock, so no other
    /// dispatch can slip in between.
    pub fn try_dispatch<E>(
        &self,
        msg: Msg,
        check: impl FnOnce(&BatchState) -> Result<(), E>,
    ) -> Result<Dispatched, E> {
        let mut outcome = None;
        self.tx.send_if_modified(|state| {
            if let Err(err) = check(state) {
                outcome = Some(Err(err));
                return false;
            }
            let (next, effects) = update(state.clone(), msg);
            let changed = next != *state;
            *state = next;
            outcome = Some(Ok(Dispatched {
                state: state.clone(),
                effects,
            }));
            changed
        });
        match outcome {
            Some(result) => result,
            None => Ok(Dispatched {
                state: self.snapshot(),
                effects: Vec::new(),
            }),
        }
    }

    pub fn snapshot(&self) -> BatchState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BatchState> {
        self.tx.subscribe()
    }
}
