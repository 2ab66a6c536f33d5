//! Subtree assembly stack
//!
//! LIFO of pending subtree roots. At a reduction of arity k the top k frames
//! are exactly the rule's operands, the rightmost grammar symbol on top.

use log::trace;

use crate::semantic::ast::NodeId;
use crate::utils::{Error, Result};

#[derive(Debug, Default)]
pub struct AssemblyStack {
    frames: Vec<NodeId>,
}

impl AssemblyStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: NodeId) {
        trace!("push node {} (depth {})", id.index(), self.frames.len() + 1);
        self.frames.push(id);
    }

    /// Pop one frame; an empty stack means the driver and dispatcher disagree
    pub fn pop(&mut self, rule: &str, line: u32) -> Result<NodeId> {
        let [id] = self.pop_n::<1>(rule, line)?;
        Ok(id)
    }

    /// Pop the top `N` frames, returned in push (left-to-right) order
    pub fn pop_n<const N: usize>(&mut self, rule: &str, line: u32) -> Result<[NodeId; N]> {
        if self.frames.len() < N {
            return Err(Error::StackUnderflow {
                rule: rule.to_string(),
                needed: N,
                available: self.frames.len(),
                line,
            });
        }
        let tail = self.frames.split_off(self.frames.len() - N);
        let available = tail.len();
        let out: [NodeId; N] = tail.try_into().map_err(|_| Error::StackUnderflow {
            rule: rule.to_string(),
            needed: N,
            available,
            line,
        })?;
        trace!("pop {} frame(s) for '{}' (depth {})", N, rule, self.frames.len());
        Ok(out)
    }

    pub fn peek(&self) -> Option<NodeId> {
        self.frames.last().copied()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
