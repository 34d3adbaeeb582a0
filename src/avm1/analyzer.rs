//! Control flow analysis of action blobs
//!
//! Resolves every branch once so the interpreter loop only follows indices.

use std::rc::Rc;

use super::actions::{Action, ActionsData};

/// Resolved successors of one action; `None` ends the blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionCodeBlockItem {
    pub next: Option<usize>,
    /// Taken when the handler reports a branch
    pub conditional_jump_to: Option<usize>,
}

#[derive(Debug)]
pub struct AnalyzerResults {
    pub items: Vec<ActionCodeBlockItem>,
}

impl AnalyzerResults {
    pub fn item(&self, position: usize) -> Option<&ActionCodeBlockItem> {
        self.items.get(position)
    }
}

/// `from + 1 + offset` when it lands on an action of the blob.
fn branch_target(from: usize, offset: i64, len: usize) -> Option<usize> {
    let target = from as i64 + 1 + offset;
    if target < 0 || target >= len as i64 {
        None
    } else {
        Some(target as usize)
    }
}

pub fn analyze(data: &ActionsData) -> AnalyzerResults {
    let len = data.actions.len();
    let fallthrough = |i: usize| if i + 1 < len { Some(i + 1) } else { None };

    let items = data
        .actions
        .iter()
        .enumerate()
        .map(|(i, action)| match action {
            Action::Jump { offset } => ActionCodeBlockItem {
                next: branch_target(i, i64::from(*offset), len),
                conditional_jump_to: None,
            },
            Action::If { offset } => ActionCodeBlockItem {
                next: fallthrough(i),
                conditional_jump_to: branch_target(i, i64::from(*offset), len),
            },
            Action::WaitForFrame { skip_count, .. } | Action::WaitForFrame2 { skip_count } => {
                ActionCodeBlockItem {
                    next: fallthrough(i),
                    conditional_jump_to: branch_target(i, *skip_count as i64, len),
                }
            }
            Action::Return | Action::End => ActionCodeBlockItem {
                next: None,
                conditional_jump_to: None,
            },
            _ => ActionCodeBlockItem {
                next: fallthrough(i),
                conditional_jump_to: None,
            },
        })
        .collect();

    AnalyzerResults { items }
}

/// Cached analysis of `data`, computed on first use.
pub fn analyzed(data: &ActionsData) -> Rc<AnalyzerResults> {
    Rc::clone(data.ir.get_or_init(|| Rc::new(analyze(data))))
}
