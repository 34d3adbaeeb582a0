//! Structured control flow reconstruction
//!
//! Turns an arbitrary block graph into nested `Simple`, `Loop` and
//! `Multiple` shapes and renders them as code with labelled loops. Branches
//! that cross a shape boundary are rewritten into `label = N;` followed by
//! `break`/`continue`, and `Multiple` shapes dispatch on `label`.
//!
//! The construction follows the Emscripten relooper:
//!
//! * one entry without incoming edges becomes a `Simple` shape;
//! * several entries whose reachable regions are independent become a
//!   `Multiple` shape, one arm per entry;
//! * otherwise every block that can reach back to an entry forms the body
//!   of a `Loop`, and edges back to the entries become `continue`.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::emitter::Emitter;
use crate::error::{AvmError, AvmResult};

pub type BlockId = usize;
type ShapeId = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub target: BlockId,
    /// `None` for the default branch. In a switch block this is the case
    /// value.
    pub condition: Option<String>,
    /// Emitted whenever the branch is taken.
    pub code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Direct,
    Break(ShapeId),
    Continue(ShapeId),
}

#[derive(Debug)]
struct Block {
    code: String,
    switch_on: Option<String>,
    branches: Vec<Branch>,
    /// Parallel to `branches`; `None` while the branch is unprocessed.
    flows: Vec<Option<Flow>>,
}

#[derive(Debug)]
enum Shape {
    Simple {
        block: BlockId,
        next: Option<Box<Shape>>,
    },
    Loop {
        id: ShapeId,
        inner: Box<Shape>,
        next: Option<Box<Shape>>,
    },
    Multiple {
        id: ShapeId,
        handled: Vec<(BlockId, Shape)>,
        next: Option<Box<Shape>>,
    },
}

impl Shape {
    /// Entering this shape needs `label` to pick the entry block.
    fn needs_label(&self) -> bool {
        match self {
            Shape::Simple { .. } => false,
            Shape::Loop { inner, .. } => inner.needs_label(),
            Shape::Multiple { .. } => true,
        }
    }
}

#[derive(Debug, Default)]
pub struct Relooper {
    blocks: Vec<Block>,
    shape_count: usize,
}

impl Relooper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_block(&mut self, code: impl Into<String>) -> BlockId {
        self.push_block(code.into(), None)
    }

    /// A block that leaves through `switch (switch_on)`; branch conditions
    /// are the case values.
    pub fn add_switch_block(&mut self, code: impl Into<String>, switch_on: impl Into<String>) -> BlockId {
        self.push_block(code.into(), Some(switch_on.into()))
    }

    fn push_block(&mut self, code: String, switch_on: Option<String>) -> BlockId {
        self.blocks.push(Block {
            code,
            switch_on,
            branches: Vec::new(),
            flows: Vec::new(),
        });
        self.blocks.len() - 1
    }

    pub fn add_branch(&mut self, from: BlockId, target: BlockId, condition: Option<String>, code: Option<String>) {
        if let Some(block) = self.blocks.get_mut(from) {
            block.branches.push(Branch {
                target,
                condition,
                code,
            });
            block.flows.push(None);
        }
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Structure the graph reachable from `entry` and render it.
    pub fn render(mut self, entry: BlockId) -> AvmResult<String> {
        let count = self.blocks.len();
        if entry >= count {
            return Err(AvmError::compile(format!("Unknown entry block {}", entry)));
        }
        if let Some(branch) = self.blocks.iter().flat_map(|b| &b.branches).find(|br| br.target >= count) {
            return Err(AvmError::compile(format!("Branch to unknown block {}", branch.target)));
        }

        let shape = self.make_shape((0..count).collect(), BTreeSet::from([entry]));
        let mut out = Emitter::new();
        out.write_line("var label = 0;");
        if let Some(shape) = &shape {
            self.render_shape(shape, &mut out);
        }
        Ok(out.finish())
    }

    fn next_shape_id(&mut self) -> ShapeId {
        self.shape_count += 1;
        self.shape_count - 1
    }

    fn active_targets(&self, block: BlockId) -> Vec<BlockId> {
        self.blocks
            .get(block)
            .map(|b| {
                b.branches
                    .iter()
                    .zip(&b.flows)
                    .filter(|(_, flow)| flow.is_none())
                    .map(|(branch, _)| branch.target)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Unprocessed in-edges of every block, restricted to `blocks`.
    fn predecessors(&self, blocks: &BTreeSet<BlockId>) -> BTreeMap<BlockId, BTreeSet<BlockId>> {
        let mut preds: BTreeMap<BlockId, BTreeSet<BlockId>> = BTreeMap::new();
        for &block in blocks {
            for target in self.active_targets(block) {
                if blocks.contains(&target) {
                    preds.entry(target).or_default().insert(block);
                }
            }
        }
        preds
    }

    fn reachable(&self, blocks: &BTreeSet<BlockId>, entries: &BTreeSet<BlockId>) -> BTreeSet<BlockId> {
        let mut seen = entries.clone();
        let mut queue: Vec<BlockId> = entries.iter().copied().collect();
        while let Some(block) = queue.pop() {
            for target in self.active_targets(block) {
                if blocks.contains(&target) && seen.insert(target) {
                    queue.push(target);
                }
            }
        }
        seen
    }

    /// Assign a flow to each unprocessed branch of `block` for which
    /// `decide` returns one.
    fn process_branches(&mut self, block: BlockId, mut decide: impl FnMut(BlockId) -> Option<Flow>) {
        let Some(block) = self.blocks.get_mut(block) else {
            return;
        };
        for (branch, flow) in block.branches.iter().zip(block.flows.iter_mut()) {
            if flow.is_none() {
                *flow = decide(branch.target);
            }
        }
    }

    fn make_shape(&mut self, blocks: BTreeSet<BlockId>, entries: BTreeSet<BlockId>) -> Option<Shape> {
        let entries: BTreeSet<BlockId> = entries.intersection(&blocks).copied().collect();
        let blocks = self.reachable(&blocks, &entries);
        let first = *entries.first()?;

        if entries.len() == 1 && !self.predecessors(&blocks).contains_key(&first) {
            return Some(self.make_simple(blocks, first));
        }
        if entries.len() > 1 {
            if let Some(shape) = self.make_multiple(&blocks, &entries) {
                return Some(shape);
            }
        }
        self.make_loop(blocks, entries)
    }

    fn make_simple(&mut self, mut blocks: BTreeSet<BlockId>, entry: BlockId) -> Shape {
        blocks.remove(&entry);
        let mut next_entries = BTreeSet::new();
        self.process_branches(entry, |target| {
            if blocks.contains(&target) {
                next_entries.insert(target);
            }
            Some(Flow::Direct)
        });
        let next = self.make_shape(blocks, next_entries).map(Box::new);
        Shape::Simple { block: entry, next }
    }

    fn make_loop(&mut self, blocks: BTreeSet<BlockId>, entries: BTreeSet<BlockId>) -> Option<Shape> {
        let preds = self.predecessors(&blocks);
        let mut inner = entries.clone();
        let mut queue: Vec<BlockId> = entries.iter().copied().collect();
        while let Some(block) = queue.pop() {
            for &pred in preds.get(&block).into_iter().flatten() {
                if inner.insert(pred) {
                    queue.push(pred);
                }
            }
        }

        let id = self.next_shape_id();
        let mut next_entries = BTreeSet::new();
        for &block in &inner {
            self.process_branches(block, |target| {
                if entries.contains(&target) {
                    Some(Flow::Continue(id))
                } else if !inner.contains(&target) {
                    next_entries.insert(target);
                    Some(Flow::Break(id))
                } else {
                    None
                }
            });
        }

        let outer: BTreeSet<BlockId> = blocks.difference(&inner).copied().collect();
        let body = self.make_shape(inner, entries);
        let next = self.make_shape(outer, next_entries).map(Box::new);
        match body {
            Some(inner) => Some(Shape::Loop {
                id,
                inner: Box::new(inner),
                next,
            }),
            None => next.map(|next| *next),
        }
    }

    fn make_multiple(&mut self, blocks: &BTreeSet<BlockId>, entries: &BTreeSet<BlockId>) -> Option<Shape> {
        let preds = self.predecessors(blocks);

        // Flood from every entry at once; blocks reached from two entries
        // belong to nobody.
        let mut owner: BTreeMap<BlockId, Option<BlockId>> = entries.iter().map(|e| (*e, Some(*e))).collect();
        let mut queue: VecDeque<BlockId> = entries.iter().copied().collect();
        while let Some(block) = queue.pop_front() {
            let Some(Some(group)) = owner.get(&block).copied() else {
                continue;
            };
            for target in self.active_targets(block) {
                if !blocks.contains(&target) {
                    continue;
                }
                match owner.get(&target).copied() {
                    None => {
                        owner.insert(target, Some(group));
                        queue.push_back(target);
                    }
                    Some(Some(other)) if other != group => {
                        owner.insert(target, None);
                    }
                    _ => {}
                }
            }
        }

        let mut groups: Vec<(BlockId, BTreeSet<BlockId>)> = entries
            .iter()
            .filter(|e| owner.get(*e) == Some(&Some(**e)))
            .map(|e| {
                let members = owner
                    .iter()
                    .filter(|(_, o)| **o == Some(*e))
                    .map(|(b, _)| *b)
                    .collect();
                (*e, members)
            })
            .collect();

        // Blocks entered from outside their group, and everything below
        // them, leave the group.
        loop {
            let mut changed = false;
            for (entry, group) in groups.iter_mut() {
                let intruded: Vec<BlockId> = group
                    .iter()
                    .copied()
                    .filter(|b| b != entry && has_outside_predecessor(&preds, *b, group))
                    .collect();
                for block in intruded {
                    changed |= self.remove_subtree(group, block, *entry);
                }
            }
            if !changed {
                break;
            }
        }
        groups.retain(|(entry, group)| !has_outside_predecessor(&preds, *entry, group));
        if groups.is_empty() {
            return None;
        }

        let id = self.next_shape_id();
        let mut next_entries: BTreeSet<BlockId> = entries
            .iter()
            .filter(|e| !groups.iter().any(|(g, _)| g == *e))
            .copied()
            .collect();
        for (_, group) in &groups {
            for &block in group {
                self.process_branches(block, |target| {
                    if group.contains(&target) {
                        None
                    } else {
                        next_entries.insert(target);
                        Some(Flow::Break(id))
                    }
                });
            }
        }

        let rest: BTreeSet<BlockId> = blocks
            .iter()
            .filter(|b| !groups.iter().any(|(_, g)| g.contains(*b)))
            .copied()
            .collect();
        let mut handled = Vec::with_capacity(groups.len());
        for (entry, group) in groups {
            if let Some(shape) = self.make_shape(group, BTreeSet::from([entry])) {
                handled.push((entry, shape));
            }
        }
        let next = self.make_shape(rest, next_entries).map(Box::new);
        Some(Shape::Multiple { id, handled, next })
    }

    fn remove_subtree(&self, group: &mut BTreeSet<BlockId>, start: BlockId, entry: BlockId) -> bool {
        let mut removed = false;
        let mut queue = vec![start];
        while let Some(block) = queue.pop() {
            if block == entry || !group.remove(&block) {
                continue;
            }
            removed = true;
            queue.extend(self.active_targets(block));
        }
        removed
    }

    fn render_shape(&self, shape: &Shape, out: &mut Emitter) {
        match shape {
            Shape::Simple { block, next } => {
                if let Some(block) = self.blocks.get(*block) {
                    if !block.code.is_empty() {
                        out.write_line(&block.code);
                    }
                    let next_needs_label = next.as_deref().is_some_and(Shape::needs_label);
                    self.render_branches(block, next_needs_label, out);
                }
                if let Some(next) = next {
                    self.render_shape(next, out);
                }
            }
            Shape::Loop { id, inner, next } => {
                out.enter(&format!("L{}: while (true) {{", id));
                self.render_shape(inner, out);
                out.leave("}");
                if let Some(next) = next {
                    self.render_shape(next, out);
                }
            }
            Shape::Multiple { id, handled, next } => {
                out.enter(&format!("L{}: do {{", id));
                for (i, (entry, inner)) in handled.iter().enumerate() {
                    if i == 0 {
                        out.enter(&format!("if (label === {}) {{", entry));
                    } else {
                        out.leave_and_enter(&format!("}} else if (label === {}) {{", entry));
                    }
                    self.render_shape(inner, out);
                }
                if !handled.is_empty() {
                    out.leave("}");
                }
                out.leave("} while (0);");
                if let Some(next) = next {
                    self.render_shape(next, out);
                }
            }
        }
    }

    fn transfer(branch: &Branch, flow: Option<Flow>, next_needs_label: bool) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(code) = &branch.code {
            lines.push(code.clone());
        }
        let set_label = format!("label = {};", branch.target);
        match flow.unwrap_or(Flow::Direct) {
            Flow::Direct => {
                if next_needs_label {
                    lines.push(set_label);
                }
            }
            Flow::Break(id) => {
                lines.push(set_label);
                lines.push(format!("break L{};", id));
            }
            Flow::Continue(id) => {
                lines.push(set_label);
                lines.push(format!("continue L{};", id));
            }
        }
        lines
    }

    fn render_branches(&self, block: &Block, next_needs_label: bool, out: &mut Emitter) {
        let (conditional, default): (Vec<_>, Vec<_>) = block
            .branches
            .iter()
            .zip(&block.flows)
            .map(|(branch, flow)| {
                (
                    branch.condition.as_deref(),
                    Self::transfer(branch, *flow, next_needs_label),
                )
            })
            .partition(|(condition, _)| condition.is_some());
        let default = default.into_iter().next().map(|(_, lines)| lines).unwrap_or_default();

        if let Some(switch_on) = &block.switch_on {
            out.enter(&format!("switch ({}) {{", switch_on));
            for (condition, lines) in &conditional {
                out.enter(&format!("case {}: {{", condition.unwrap_or_default()));
                write_lines(out, lines);
                out.write_line("break;");
                out.leave("}");
            }
            out.enter("default: {");
            write_lines(out, &default);
            out.write_line("break;");
            out.leave("}");
            out.leave("}");
            return;
        }

        match conditional.as_slice() {
            [] => write_lines(out, &default),
            [(Some(condition), lines)] if lines.is_empty() => {
                if !default.is_empty() {
                    out.enter(&format!("if (!({})) {{", condition));
                    write_lines(out, &default);
                    out.leave("}");
                }
            }
            _ => {
                for (i, (condition, lines)) in conditional.iter().enumerate() {
                    let condition = condition.unwrap_or("true");
                    if i == 0 {
                        out.enter(&format!("if ({}) {{", condition));
                    } else {
                        out.leave_and_enter(&format!("}} else if ({}) {{", condition));
                    }
                    write_lines(out, lines);
                }
                if !default.is_empty() {
                    out.leave_and_enter("} else {");
                    write_lines(out, &default);
                }
                out.leave("}");
            }
        }
    }
}

fn has_outside_predecessor(
    preds: &BTreeMap<BlockId, BTreeSet<BlockId>>,
    block: BlockId,
    group: &BTreeSet<BlockId>,
) -> bool {
    preds
        .get(&block)
        .is_some_and(|ps| ps.iter().any(|p| !group.contains(p)))
}

fn write_lines(out: &mut Emitter, lines: &[String]) {
    for line in lines {
        out.write_line(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cond(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn straight_line_has_no_labels() {
        let mut relooper = Relooper::new();
        let a = relooper.add_block("a();");
        let b = relooper.add_block("return;");
        relooper.add_branch(a, b, None, None);
        assert_eq!(relooper.render(a).unwrap(), "var label = 0;\na();\nreturn;\n");
    }

    #[test]
    fn diamond_becomes_multiple() {
        let mut relooper = Relooper::new();
        let entry = relooper.add_block("a();");
        let then = relooper.add_block("b();");
        let otherwise = relooper.add_block("c();");
        let join = relooper.add_block("d();");
        relooper.add_branch(entry, then, cond("x"), None);
        relooper.add_branch(entry, otherwise, None, None);
        relooper.add_branch(then, join, None, None);
        relooper.add_branch(otherwise, join, None, None);

        let expected = "\
var label = 0;
a();
if (x) {
  label = 1;
} else {
  label = 2;
}
L0: do {
  if (label === 1) {
    b();
    label = 3;
    break L0;
  } else if (label === 2) {
    c();
    label = 3;
    break L0;
  }
} while (0);
d();
";
        assert_eq!(relooper.render(entry).unwrap(), expected);
    }

    #[test]
    fn back_edge_becomes_loop() {
        let mut relooper = Relooper::new();
        let init = relooper.add_block("i = 0;");
        let head = relooper.add_block("");
        let body = relooper.add_block("i++;");
        let exit = relooper.add_block("return i;");
        relooper.add_branch(init, head, None, None);
        relooper.add_branch(head, body, cond("i < 10"), None);
        relooper.add_branch(head, exit, None, None);
        relooper.add_branch(body, head, None, None);

        let expected = "\
var label = 0;
i = 0;
L0: while (true) {
  if (!(i < 10)) {
    label = 3;
    break L0;
  }
  i++;
  label = 1;
  continue L0;
}
return i;
";
        assert_eq!(relooper.render(init).unwrap(), expected);
    }

    #[test]
    fn switch_block_renders_cases() {
        let mut relooper = Relooper::new();
        let entry = relooper.add_switch_block("", "A");
        let one = relooper.add_block("return 1;");
        let two = relooper.add_block("return 2;");
        let other = relooper.add_block("return 0;");
        relooper.add_branch(entry, one, cond("0"), None);
        relooper.add_branch(entry, two, cond("1"), None);
        relooper.add_branch(entry, other, None, None);

        let out = relooper.render(entry).unwrap();
        assert!(out.contains("switch (A) {\n  case 0: {\n    label = 1;\n    break;\n  }\n"));
        assert!(out.contains("  default: {\n    label = 3;\n    break;\n  }\n"));
        assert!(out.contains("if (label === 1) {\n    return 1;\n"));
        assert!(out.contains("return 0;"));
    }

    #[test]
    fn branch_code_runs_before_transfer() {
        let mut relooper = Relooper::new();
        let a = relooper.add_block("");
        let b = relooper.add_block("return;");
        relooper.add_branch(a, b, None, Some("pc = 7;".to_string()));
        assert_eq!(relooper.render(a).unwrap(), "var label = 0;\npc = 7;\nreturn;\n");
    }

    #[test]
    fn mutually_reachable_entries_form_a_loop() {
        // entry dispatches into either half of a two-block cycle
        let mut relooper = Relooper::new();
        let entry = relooper.add_block("");
        let a = relooper.add_block("a();");
        let b = relooper.add_block("b();");
        relooper.add_branch(entry, a, cond("p"), None);
        relooper.add_branch(entry, b, None, None);
        relooper.add_branch(a, b, None, None);
        relooper.add_branch(b, a, None, None);

        let out = relooper.render(entry).unwrap();
        assert!(out.contains("L0: while (true) {"));
        assert!(out.contains("L1: do {"));
        assert!(out.contains("label = 2;\n      continue L0;"));
        assert!(out.contains("label = 1;\n      continue L0;"));
    }

    #[test]
    fn every_block_is_rendered_once() {
        let mut relooper = Relooper::new();
        let blocks: Vec<BlockId> = (0..6).map(|i| relooper.add_block(format!("b{}();", i))).collect();
        relooper.add_branch(blocks[0], blocks[1], cond("x"), None);
        relooper.add_branch(blocks[0], blocks[2], None, None);
        relooper.add_branch(blocks[1], blocks[3], None, None);
        relooper.add_branch(blocks[2], blocks[3], cond("y"), None);
        relooper.add_branch(blocks[2], blocks[4], None, None);
        relooper.add_branch(blocks[3], blocks[0], cond("z"), None);
        relooper.add_branch(blocks[3], blocks[5], None, None);
        relooper.add_branch(blocks[4], blocks[5], None, None);

        let out = relooper.render(blocks[0]).unwrap();
        for i in 0..6 {
            assert_eq!(out.matches(&format!("b{}();", i)).count(), 1, "{}", out);
        }
    }

    #[test]
    fn unknown_blocks_are_rejected() {
        let relooper = Relooper::new();
        assert!(relooper.render(0).is_err());

        let mut relooper = Relooper::new();
        let a = relooper.add_block("");
        relooper.add_branch(a, 9, None, None);
        assert!(matches!(relooper.render(a), Err(AvmError::Compile { .. })));
    }
}
