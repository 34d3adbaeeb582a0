//! Basic-block analysis of AVM2 method bodies

use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::bytecode::{MethodBody, Op, Pc};
use crate::error::{AvmError, AvmResult};

/// Instructions `start..end` of the body (indices, not offsets).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    pub id: usize,
    pub start: usize,
    pub end: usize,
    pub successors: Vec<usize>,
    pub is_catch_target: bool,
}

#[derive(Debug)]
pub struct MethodAnalysis {
    pub blocks: Vec<BasicBlock>,
    block_by_pc: FxHashMap<Pc, usize>,
    index_by_pc: FxHashMap<Pc, usize>,
}

impl MethodAnalysis {
    /// Block starting at `pc`.
    pub fn block_at(&self, pc: Pc) -> Option<usize> {
        self.block_by_pc.get(&pc).copied()
    }

    pub fn index_of(&self, pc: Pc) -> Option<usize> {
        self.index_by_pc.get(&pc).copied()
    }
}

fn unknown_target(pc: Pc, target: Pc) -> AvmError {
    AvmError::compile(format!("Branch at {} targets unknown offset {}", pc, target))
}

pub fn analyze(body: &MethodBody) -> AvmResult<MethodAnalysis> {
    let code = &body.code;
    let index_by_pc: FxHashMap<Pc, usize> = code.iter().enumerate().map(|(i, ins)| (ins.pc, i)).collect();
    let resolve = |from: Pc, target: Pc| index_by_pc.get(&target).copied().ok_or_else(|| unknown_target(from, target));

    let mut is_leader = vec![false; code.len()];
    let mut mark = |i: usize| {
        if let Some(slot) = is_leader.get_mut(i) {
            *slot = true;
        }
    };
    mark(0);
    for handler in &body.exceptions {
        mark(resolve(handler.target_pc, handler.target_pc)?);
    }
    for (i, ins) in code.iter().enumerate() {
        for target in branch_targets(&ins.op) {
            mark(resolve(ins.pc, target)?);
        }
        if ins.op.is_branch() {
            mark(i + 1);
        }
    }

    let starts: Vec<usize> = is_leader
        .iter()
        .enumerate()
        .filter_map(|(i, leader)| leader.then_some(i))
        .collect();
    let block_of_index = |index: usize| starts.partition_point(|start| *start <= index).checked_sub(1);

    let mut blocks = Vec::with_capacity(starts.len());
    for (id, start) in starts.iter().enumerate() {
        let end = starts.get(id + 1).copied().unwrap_or(code.len());
        let mut successors = Vec::new();
        if let Some(last) = end.checked_sub(1).and_then(|last| code.get(last)) {
            let mut targets = branch_targets(&last.op)
                .into_iter()
                .map(|target| resolve(last.pc, target))
                .collect::<AvmResult<Vec<_>>>()?;
            if !last.op.ends_flow() && end < code.len() {
                targets.push(end);
            }
            for target in targets {
                if let Some(succ) = block_of_index(target) {
                    if !successors.contains(&succ) {
                        successors.push(succ);
                    }
                }
            }
        }
        blocks.push(BasicBlock {
            id,
            start: *start,
            end,
            successors,
            is_catch_target: false,
        });
    }

    let block_by_pc: FxHashMap<Pc, usize> = blocks
        .iter()
        .filter_map(|b| code.get(b.start).map(|ins| (ins.pc, b.id)))
        .collect();
    for handler in &body.exceptions {
        if let Some(block) = block_by_pc.get(&handler.target_pc).and_then(|id| blocks.get_mut(*id)) {
            block.is_catch_target = true;
        }
    }

    Ok(MethodAnalysis {
        blocks,
        block_by_pc,
        index_by_pc,
    })
}

/// Every explicit branch target of `op`.
pub fn branch_targets(op: &Op) -> Vec<Pc> {
    match op {
        Op::Jump(target) => vec![*target],
        Op::LookupSwitch { default, cases } => {
            let mut targets = vec![*default];
            targets.extend(cases.iter().copied());
            targets
        }
        _ => op.conditional_target().into_iter().collect(),
    }
}

/// Cached analysis of `body`, computed on first use.
pub fn analyzed(body: &MethodBody) -> AvmResult<Rc<MethodAnalysis>> {
    if let Some(analysis) = body.analysis.get() {
        return Ok(Rc::clone(analysis));
    }
    let analysis = Rc::new(analyze(body)?);
    Ok(Rc::clone(body.analysis.get_or_init(|| analysis)))
}
