//! Conditional-execution scopes: enabled subsystems, clock domains, blocking
//! domains, and mux selectors each push a [`Context`] entry onto the context
//! stack of every node nested beneath them.

use crate::ids::NodeId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// The kind of node that introduced a context scope, and the policy that
/// follows from that kind.
///
/// Dispatch on `ContextRootKind` is a closed match rather than a trait
/// object: the set of scope-introducing node kinds is fixed by the node
/// hierarchy, so there is no benefit to dynamic dispatch here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextRootKind {
    /// A mux's selector scope: each input is reached only when the selector
    /// picks it.
    Mux,
    /// An enabled subsystem's scope: children execute only while enabled.
    EnabledSubSystem,
    /// A clock domain's scope: children execute at a re-rated clock.
    ClockDomain,
    /// A blocking domain's scope: children share a base sub-blocking length.
    BlockingDomain,
}

impl ContextRootKind {
    /// Whether a FIFO sitting in a context stack containing only this root
    /// kind may still have adjacent delays absorbed into it.
    ///
    /// Absorption folds a delay's initial conditions into the FIFO itself;
    /// that is only sound in scopes that execute unconditionally every
    /// sample, which clock/blocking domains do and enable/mux scopes do not.
    pub fn allows_fifo_absorption(self) -> bool {
        matches!(self, ContextRootKind::ClockDomain | ContextRootKind::BlockingDomain)
    }

    /// Whether this root kind survives "context reduction" for FIFO-merge
    /// bucketing, which strips clock-domain and blocking-domain entries
    /// since those do not affect which merge bucket a FIFO falls in.
    pub fn survives_reduction(self) -> bool {
        matches!(self, ContextRootKind::Mux | ContextRootKind::EnabledSubSystem)
    }
}

/// One entry in a node's context stack: the root node that introduced the
/// scope, and which of that root's sub-contexts (e.g. which mux input, or
/// the enabled-vs-disabled branch) this node sits under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Context {
    /// The node that introduced this scope.
    pub root: NodeId,
    /// What kind of root it is.
    pub root_kind: ContextRootKind,
    /// The sub-context index within that root (e.g. mux input index, or 0/1
    /// for an enabled subsystem's enabled/disabled branch).
    pub sub_context: usize,
}

/// An ordered, outermost-to-innermost stack of context scopes. Most nodes
/// sit zero to two scopes deep, hence the inline capacity.
pub type ContextStack = SmallVec<[Context; 4]>;

/// The length of the longest common prefix of two context stacks: the
/// deepest context the two nodes share.
pub fn find_most_specific_common_context(a: &[Context], b: &[Context]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Two nodes are in "equal context" iff their stacks are element-wise equal.
pub fn contexts_equal(a: &[Context], b: &[Context]) -> bool {
    a == b
}

/// The context stack with every [`ContextRootKind::ClockDomain`] and
/// [`ContextRootKind::BlockingDomain`] entry removed, used to bucket FIFOs
/// for merging: two FIFOs that differ only in which clock/blocking domain
/// they sit under may still be merge candidates.
pub fn reduced_context_stack(stack: &[Context]) -> ContextStack {
    stack.iter().copied().filter(|c| c.root_kind.survives_reduction()).collect()
}
