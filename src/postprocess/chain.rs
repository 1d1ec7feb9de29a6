//! Ping-pong role tracking for the postprocess chain.

use smallvec::SmallVec;

use crate::device::{CommandList, PassInvocation, PassKind, TextureHandle};

/// Where the next step reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainInput {
    /// The chain's current read slot.
    #[default]
    Nominal,
    /// A one-shot handle bypassing the read slot.
    Override(TextureHandle),
}

/// Read/write roles of one phase of the chain plus the pending override.
#[derive(Debug, Clone)]
pub struct PostprocessChain {
    read: TextureHandle,
    write: TextureHandle,
    input: ChainInput,
    executed: SmallVec<[PassKind; 16]>,
}

impl PostprocessChain {
    #[must_use]
    pub fn new(read: TextureHandle, write: TextureHandle) -> Self {
        Self {
            read,
            write,
            input: ChainInput::Nominal,
            executed: SmallVec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn read(&self) -> TextureHandle {
        self.read
    }

    #[inline]
    #[must_use]
    pub fn write(&self) -> TextureHandle {
        self.write
    }

    #[inline]
    #[must_use]
    pub fn pending(&self) -> ChainInput {
        self.input
    }

    /// Steps recorded so far, in order.
    #[must_use]
    pub fn executed(&self) -> &[PassKind] {
        &self.executed
    }

    /// Handle the next step consumes. A pending override is returned once and
    /// reset to [`ChainInput::Nominal`].
    pub fn take_input(&mut self) -> TextureHandle {
        match std::mem::take(&mut self.input) {
            ChainInput::Override(handle) => handle,
            ChainInput::Nominal => self.read,
        }
    }

    /// Routes `handle` directly into the next step.
    ///
    /// # Panics
    ///
    /// Panics if another override is still pending.
    pub fn set_override(&mut self, handle: TextureHandle) {
        assert!(
            self.input == ChainInput::Nominal,
            "postprocess override set while {:?} is still pending",
            self.input
        );
        self.input = ChainInput::Override(handle);
    }

    /// Exchanges read and write roles after a step wrote `write`.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.read, &mut self.write);
    }

    /// Starts a new phase over a fresh pair, keeping the execution log.
    ///
    /// # Panics
    ///
    /// Panics if an override is still pending; it would be lost.
    pub fn rebind(&mut self, read: TextureHandle, write: TextureHandle) {
        assert!(
            self.input == ChainInput::Nominal,
            "postprocess phase ended with a pending override"
        );
        self.read = read;
        self.write = write;
    }

    /// Records a standard step: consume the input, write the write slot, swap.
    ///
    /// `build` receives the input and output handles and returns the pass.
    pub fn step(
        &mut self,
        list: &mut CommandList,
        build: impl FnOnce(TextureHandle, TextureHandle) -> PassInvocation,
    ) {
        let input = self.take_input();
        let output = self.write;
        self.record(list, build(input, output));
        self.swap();
    }

    /// Records a pass and logs it without touching the roles.
    pub fn record(&mut self, list: &mut CommandList, pass: PassInvocation) {
        self.executed.push(pass.kind);
        list.dispatch(pass);
    }

    #[must_use]
    pub fn into_executed(self) -> SmallVec<[PassKind; 16]> {
        self.executed
    }
}
