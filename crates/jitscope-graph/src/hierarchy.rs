use std::collections::HashSet;
use std::fmt;

use jitscope_types::{Block, Script};
use tracing::{debug, warn};

// ── Frame identity ──────────────────────────────────────────────

/// Index of an inline frame within an [`InlineTree`].
///
/// Frame ids double as style classes: the root is class 0 and every
/// discovered inline frame gets the next class in discovery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(u32);

impl FrameId {
    pub const ROOT: FrameId = FrameId(0);

    pub fn get(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}

/// One logical inlined invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineFrame {
    /// `None` only for the root frame.
    pub parent: Option<FrameId>,
    pub style: u32,
    /// Script the frame was opened for, when the producer sent one.
    pub script: Option<Script>,
    /// Block index of the call site that was inlined. `None` for the root.
    pub call_site: Option<u32>,
}

// ── Issues ──────────────────────────────────────────────────────

/// Malformed input met during reconstruction. The offending block is
/// placed in the root frame and reconstruction carries on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconstructionIssue {
    /// The predecessor walk from `block` came back to `revisited`.
    Cycle { block: usize, revisited: usize },
    /// `block` names block `index`, which does not exist.
    OutOfRange { block: usize, index: usize },
    /// `block` depends on the frame of `referenced`, which is not assigned yet.
    Unassigned { block: usize, referenced: usize },
}

impl ReconstructionIssue {
    pub fn block(&self) -> usize {
        match self {
            Self::Cycle { block, .. }
            | Self::OutOfRange { block, .. }
            | Self::Unassigned { block, .. } => *block,
        }
    }
}

impl fmt::Display for ReconstructionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cycle { block, revisited } => write!(
                f,
                "block {block}: predecessor chain loops back to block {revisited}"
            ),
            Self::OutOfRange { block, index } => {
                write!(f, "block {block}: references missing block {index}")
            }
            Self::Unassigned { block, referenced } => write!(
                f,
                "block {block}: depends on block {referenced}, which comes later"
            ),
        }
    }
}

impl std::error::Error for ReconstructionIssue {}

// ── Tree ────────────────────────────────────────────────────────

/// The inlining call tree of one compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineTree {
    frames: Vec<InlineFrame>,
    /// Frame of each block, by block index.
    block_frames: Vec<FrameId>,
    issues: Vec<ReconstructionIssue>,
}

impl InlineTree {
    pub fn frames(&self) -> &[InlineFrame] {
        &self.frames
    }

    pub fn frame(&self, id: FrameId) -> Option<&InlineFrame> {
        self.frames.get(id.index())
    }

    pub fn frame_of(&self, block: usize) -> Option<FrameId> {
        self.block_frames.get(block).copied()
    }

    pub fn children(&self, parent: FrameId) -> impl Iterator<Item = FrameId> + '_ {
        self.frame_ids()
            .filter(move |&id| self.frames[id.index()].parent == Some(parent))
    }

    /// Block indices assigned to `frame`, ascending.
    pub fn blocks_in(&self, frame: FrameId) -> impl Iterator<Item = usize> + '_ {
        self.block_frames
            .iter()
            .enumerate()
            .filter(move |(_, f)| **f == frame)
            .map(|(block, _)| block)
    }

    /// Number of inlining levels between `frame` and the root.
    pub fn depth(&self, frame: FrameId) -> usize {
        let mut depth = 0;
        let mut current = self.frame(frame).and_then(|f| f.parent);
        while let Some(parent) = current {
            depth += 1;
            current = self.frame(parent).and_then(|f| f.parent);
        }
        depth
    }

    pub fn frame_ids(&self) -> impl Iterator<Item = FrameId> + use<> {
        (0..self.frames.len() as u32).map(FrameId)
    }

    pub fn issues(&self) -> &[ReconstructionIssue] {
        &self.issues
    }
}

// ── Reconstruction ──────────────────────────────────────────────

/// Rebuilds the inline frame tree from the mir blocks of one compilation.
///
/// `scripts` is index-aligned with `blocks`: `scripts[i]` is the script a
/// frame opened at block `i` belongs to, and `scripts[0]` is the outermost
/// script.
pub fn reconstruct(blocks: &[Block], scripts: &[Script]) -> InlineTree {
    let mut builder = Builder {
        blocks,
        scripts,
        tree: InlineTree {
            frames: vec![InlineFrame {
                parent: None,
                style: 0,
                script: scripts.first().cloned(),
                call_site: None,
            }],
            block_frames: Vec::with_capacity(blocks.len()),
            issues: Vec::new(),
        },
    };

    for idx in 0..blocks.len() {
        let frame = match builder.assign(idx) {
            Ok(frame) => frame,
            Err(issue) => {
                warn!(%issue, "inline reconstruction fell back to the root frame");
                builder.tree.issues.push(issue);
                FrameId::ROOT
            }
        };
        builder.tree.block_frames.push(frame);
    }

    let tree = builder.tree;
    debug!(
        blocks = blocks.len(),
        frames = tree.frames.len(),
        issues = tree.issues.len(),
        "inline tree reconstructed"
    );
    tree
}

struct Builder<'a> {
    blocks: &'a [Block],
    scripts: &'a [Script],
    tree: InlineTree,
}

impl Builder<'_> {
    fn assign(&mut self, idx: usize) -> Result<FrameId, ReconstructionIssue> {
        let Some(caller) = self.blocks[idx].caller() else {
            return Ok(FrameId::ROOT);
        };
        let caller = caller as usize;

        if let Some(ancestor) = self.nearest_resume_ancestor(idx)?
            && let Some(ancestor_caller) = self.blocks[ancestor].caller()
        {
            let ancestor_caller = ancestor_caller as usize;
            // Same call site as the ancestor: still inside its frame.
            if ancestor_caller == caller {
                return self.frame_at(idx, ancestor);
            }
            // The ancestor's call site was itself inlined from our call
            // site: we came back out of the ancestor's frame.
            let enclosing = self.block(idx, ancestor_caller)?;
            if enclosing.caller().map(|c| c as usize) == Some(caller) {
                return self.frame_at(idx, ancestor_caller);
            }
        }

        let parent = self.frame_at(idx, caller)?;
        let id = FrameId(self.tree.frames.len() as u32);
        self.tree.frames.push(InlineFrame {
            parent: Some(parent),
            style: id.get(),
            script: self.scripts.get(idx).cloned(),
            call_site: Some(caller as u32),
        });
        debug!(block = idx, frame = %id, %parent, "opened inline frame");
        Ok(id)
    }

    /// Follows first predecessors back from `idx` to the closest block
    /// carrying a resume point. `None` when the chain ends without one.
    fn nearest_resume_ancestor(&self, idx: usize) -> Result<Option<usize>, ReconstructionIssue> {
        let mut visited = HashSet::from([idx]);
        let mut current = idx;
        loop {
            let Some(&pred) = self.blocks[current].predecessors.first() else {
                return Ok(None);
            };
            let pred = pred as usize;
            let block = self.block(idx, pred)?;
            if !visited.insert(pred) {
                return Err(ReconstructionIssue::Cycle {
                    block: idx,
                    revisited: pred,
                });
            }
            if block.resume_point.is_some() {
                return Ok(Some(pred));
            }
            current = pred;
        }
    }

    fn block(&self, idx: usize, index: usize) -> Result<&Block, ReconstructionIssue> {
        self.blocks
            .get(index)
            .ok_or(ReconstructionIssue::OutOfRange { block: idx, index })
    }

    fn frame_at(&self, idx: usize, referenced: usize) -> Result<FrameId, ReconstructionIssue> {
        self.block(idx, referenced)?;
        self.tree
            .frame_of(referenced)
            .ok_or(ReconstructionIssue::Unassigned {
                block: idx,
                referenced,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jitscope_types::{ResumeMode, ResumePoint};

    fn block(number: u32, caller: Option<Option<u32>>, predecessors: &[u32]) -> Block {
        Block {
            number,
            instructions: Vec::new(),
            resume_point: caller.map(|caller| ResumePoint {
                mode: ResumeMode::At,
                operands: Vec::new(),
                caller,
            }),
            predecessors: predecessors.to_vec(),
            successors: Vec::new(),
            attributes: Vec::new(),
        }
    }

    fn script(name: &str) -> Script {
        Script {
            display_name: Some(name.to_owned()),
            url: format!("file:///src/{name}.js"),
            start_line: 1,
            line_count: 5,
            source_start: 0,
            source_length: 40,
        }
    }

    fn frames_of(tree: &InlineTree, count: usize) -> Vec<u32> {
        (0..count)
            .map(|b| tree.frame_of(b).expect("every block has a frame").get())
            .collect()
    }

    #[test]
    fn blocks_without_caller_stay_in_root() {
        let blocks = vec![
            block(0, None, &[]),
            block(1, Some(None), &[0]),
            block(2, None, &[1]),
        ];
        let tree = reconstruct(&blocks, &[script("main")]);
        assert_eq!(frames_of(&tree, 3), vec![0, 0, 0]);
        assert_eq!(tree.frames().len(), 1);
        assert_eq!(
            tree.frame(FrameId::ROOT).and_then(|f| f.script.as_ref()),
            Some(&script("main"))
        );
        assert!(tree.issues().is_empty());
    }

    #[test]
    fn inlined_chain_opens_one_frame() {
        let blocks = vec![
            block(0, None, &[]),
            block(1, Some(Some(0)), &[0]),
            block(2, Some(Some(0)), &[1]),
        ];
        let scripts = vec![script("outer"), script("inner"), script("inner")];
        let tree = reconstruct(&blocks, &scripts);

        assert_eq!(frames_of(&tree, 3), vec![0, 1, 1]);
        let f1 = tree.frame(FrameId(1)).expect("frame 1");
        assert_eq!(f1.parent, Some(FrameId::ROOT));
        assert_eq!(f1.style, 1);
        assert_eq!(f1.call_site, Some(0));
        assert_eq!(f1.script.as_ref().map(Script::name), Some("inner"));
        assert_eq!(tree.children(FrameId::ROOT).collect::<Vec<_>>(), vec![FrameId(1)]);
        assert_eq!(tree.blocks_in(FrameId(1)).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(tree.depth(FrameId(1)), 1);
    }

    #[test]
    fn nested_inlining_and_return_to_enclosing_frame() {
        // 0: root, 1: inlined from 0, 2: inlined from 1, 3: back in 1's frame.
        let blocks = vec![
            block(0, None, &[]),
            block(1, Some(Some(0)), &[0]),
            block(2, Some(Some(1)), &[1]),
            block(3, Some(Some(0)), &[2]),
        ];
        let scripts = vec![script("a"), script("b"), script("c"), script("b")];
        let tree = reconstruct(&blocks, &scripts);

        assert_eq!(frames_of(&tree, 4), vec![0, 1, 2, 1]);
        assert_eq!(tree.frame(FrameId(2)).and_then(|f| f.parent), Some(FrameId(1)));
        assert_eq!(tree.depth(FrameId(2)), 2);
        assert_eq!(tree.frame(FrameId(2)).map(|f| f.style), Some(2));
    }

    #[test]
    fn sibling_inlines_get_distinct_frames() {
        let blocks = vec![
            block(0, None, &[]),
            block(1, Some(Some(0)), &[0]),
            block(2, None, &[1]),
            block(3, Some(Some(2)), &[2]),
        ];
        let tree = reconstruct(&blocks, &[script("a"), script("b"), script("a"), script("c")]);
        assert_eq!(frames_of(&tree, 4), vec![0, 1, 0, 2]);
        assert_eq!(
            tree.children(FrameId::ROOT).collect::<Vec<_>>(),
            vec![FrameId(1), FrameId(2)]
        );
    }

    #[test]
    fn walk_skips_blocks_without_resume_points() {
        let blocks = vec![
            block(0, None, &[]),
            block(1, Some(Some(0)), &[0]),
            block(2, None, &[1]),
            block(3, None, &[2]),
            block(4, Some(Some(0)), &[3]),
        ];
        let tree = reconstruct(&blocks, &[]);
        assert_eq!(frames_of(&tree, 5), vec![0, 1, 0, 0, 1]);
        assert!(tree.frame(FrameId(1)).is_some_and(|f| f.script.is_none()));
    }

    #[test]
    fn predecessor_cycle_is_reported_and_terminates() {
        let blocks = vec![
            block(0, None, &[]),
            block(1, None, &[2]),
            block(2, None, &[1]),
            block(3, Some(Some(0)), &[1]),
        ];
        let tree = reconstruct(&blocks, &[]);
        assert_eq!(tree.frame_of(3), Some(FrameId::ROOT));
        assert_eq!(
            tree.issues(),
            &[ReconstructionIssue::Cycle {
                block: 3,
                revisited: 1
            }]
        );
    }

    #[test]
    fn out_of_range_and_forward_references_fall_back_to_root() {
        let blocks = vec![
            block(0, None, &[]),
            block(1, Some(Some(9)), &[0]),
            block(2, Some(Some(3)), &[0]),
            block(3, None, &[]),
        ];
        let tree = reconstruct(&blocks, &[]);
        assert_eq!(frames_of(&tree, 4), vec![0, 0, 0, 0]);
        assert_eq!(
            tree.issues(),
            &[
                ReconstructionIssue::OutOfRange { block: 1, index: 9 },
                ReconstructionIssue::Unassigned {
                    block: 2,
                    referenced: 3
                },
            ]
        );
        assert_eq!(tree.issues()[0].block(), 1);
    }

    #[test]
    fn entry_block_with_caller_and_no_predecessors_is_handled() {
        let blocks = vec![block(0, Some(Some(0)), &[])];
        let tree = reconstruct(&blocks, &[]);
        assert_eq!(tree.frame_of(0), Some(FrameId::ROOT));
        assert_eq!(
            tree.issues(),
            &[ReconstructionIssue::Unassigned {
                block: 0,
                referenced: 0
            }]
        );
    }

    #[test]
    fn empty_graph_has_only_root() {
        let tree = reconstruct(&[], &[]);
        assert_eq!(tree.frames().len(), 1);
        assert_eq!(tree.frame_of(0), None);
        assert_eq!(tree.blocks_in(FrameId::ROOT).count(), 0);
    }
}
