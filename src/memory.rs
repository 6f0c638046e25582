// src/memory.rs

use tracing::debug;

use crate::ast::{grow_stack, Term, TermKind};

// --- Term Pool ---

/// Initial capacity of the free list; pools that grew past it are dropped on collection.
pub const DEFAULT_POOL_SIZE: usize = 500;

/// Recycling allocator for term nodes.
///
/// Reduction discards far more nodes than it creates, so released boxes are
/// kept on a free list and handed back out by [`TermPool::acquire`] instead of
/// going through the global allocator. A released subtree must not be used
/// again by the caller.
#[derive(Debug, Default)]
pub struct TermPool {
    free: Vec<Box<Term>>,
    fresh_allocations: usize,
    reused: usize,
}

impl TermPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Boxes `term`, reusing the most recently released node if there is one.
    pub fn acquire(&mut self, term: Term) -> Box<Term> {
        match self.free.pop() {
            Some(mut node) => {
                self.reused += 1;
                *node = term;
                node
            }
            None => {
                self.fresh_allocations += 1;
                Box::new(term)
            }
        }
    }

    /// Decomposes `node` recursively and pushes every box onto the free list.
    pub fn release(&mut self, mut node: Box<Term>) {
        let content = node.take();
        self.discard(content);
        self.push(node);
    }

    /// Releases the children of an unboxed term; the term itself is dropped.
    pub fn discard(&mut self, term: Term) {
        grow_stack(|| match term.into_kind() {
            TermKind::Var(_) | TermKind::Alias(_) => {}
            TermKind::Abs(_, body) => self.release(body),
            TermKind::App { left, right, .. } => {
                self.release(left);
                self.release(right);
            }
        })
    }

    /// Moves the content out of `node` and recycles the empty box.
    pub fn unbox(&mut self, mut node: Box<Term>) -> Term {
        let content = node.take();
        self.push(node);
        content
    }

    /// Deep copy built from pooled nodes. Closed flags and strict markers are kept.
    pub fn clone_term(&mut self, term: &Term) -> Term {
        grow_stack(|| self.clone_node(term))
    }

    fn clone_node(&mut self, term: &Term) -> Term {
        let kind = match &term.kind {
            TermKind::Var(name) => TermKind::Var(name.clone()),
            TermKind::Alias(name) => TermKind::Alias(name.clone()),
            TermKind::Abs(param, body) => {
                let body = self.clone_term(body);
                TermKind::Abs(param.clone(), self.acquire(body))
            }
            TermKind::App { left, right, strict, op } => {
                let left = self.clone_term(left);
                let right = self.clone_term(right);
                TermKind::App {
                    left: self.acquire(left),
                    right: self.acquire(right),
                    strict: *strict,
                    op: op.clone(),
                }
            }
        };
        Term { kind, closed: term.closed }
    }

    // The free list doubles, starting from DEFAULT_POOL_SIZE.
    fn push(&mut self, node: Box<Term>) {
        if self.free.len() == self.free.capacity() {
            let grow = self.free.capacity().max(DEFAULT_POOL_SIZE);
            self.free.reserve_exact(grow);
        }
        self.free.push(node);
    }

    /// Full collection pass, run after a complete top-level evaluation.
    /// Frees every pooled node and drops the free list itself if it outgrew
    /// the default size.
    pub fn collect(&mut self) {
        debug!(
            pooled = self.free.len(),
            capacity = self.free.capacity(),
            reused = self.reused,
            fresh = self.fresh_allocations,
            "collecting term pool"
        );
        if self.free.capacity() > DEFAULT_POOL_SIZE {
            self.free = Vec::new();
        } else {
            self.free.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.free.capacity()
    }

    /// Number of nodes handed out from the free list instead of the allocator.
    pub fn reused_count(&self) -> usize {
        self.reused
    }

    pub fn fresh_count(&self) -> usize {
        self.fresh_allocations
    }
}
