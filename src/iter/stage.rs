//! Walk modes and DFS stages.

use std::ops::BitOr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterMode {
    /// Depth first, reporting the stages selected with `set_dfs_stop_stages`.
    Dfs,
    /// Breadth first from the root.
    Bfs,
    /// Children before parents; the root comes last.
    ReverseTopological,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// First arrival at the node.
    Enter,
    /// About to descend into the child at `child_index`.
    VisitingChild,
    /// Back from the child at `child_index`.
    VisitedChild,
    /// All children done; the node is about to be left.
    Leave,
}

impl Stage {
    #[inline(always)]
    const fn bit(self) -> u8 {
        match self {
            Stage::Enter => 1,
            Stage::VisitingChild => 2,
            Stage::VisitedChild => 4,
            Stage::Leave => 8,
        }
    }
}

/// Set of DFS stages at which `next` returns control to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSet(u8);

impl StageSet {
    pub const ENTER: StageSet = StageSet(Stage::Enter.bit());
    pub const VISITING_CHILD: StageSet = StageSet(Stage::VisitingChild.bit());
    pub const VISITED_CHILD: StageSet = StageSet(Stage::VisitedChild.bit());
    pub const LEAVE: StageSet = StageSet(Stage::Leave.bit());
    pub const ALL: StageSet = StageSet(0b1111);

    pub const fn union(self, other: StageSet) -> StageSet {
        StageSet(self.0 | other.0)
    }

    #[inline(always)]
    pub const fn contains(self, stage: Stage) -> bool {
        self.0 & stage.bit() != 0
    }
}

impl Default for StageSet {
    fn default() -> Self {
        StageSet::ENTER
    }
}

impl BitOr for StageSet {
    type Output = StageSet;

    fn bitor(self, rhs: StageSet) -> StageSet {
        StageSet(self.0 | rhs.0)
    }
}

impl BitOr<Stage> for StageSet {
    type Output = StageSet;

    fn bitor(self, rhs: Stage) -> StageSet {
        StageSet(self.0 | rhs.bit())
    }
}

impl From<Stage> for StageSet {
    fn from(stage: Stage) -> Self {
        StageSet(stage.bit())
    }
}
