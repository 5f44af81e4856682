//! Repeating group traversal.
//!
//! Fixed fields can be addressed at `base + offset` inside their block, but
//! nested groups and variable-length data can only be reached by walking the
//! message in schema order. [`Traversal`] is the phase machine that the
//! message encoder and decoder share to enforce that order. It holds a stack
//! that alternates block frames (the root or one group element) and group
//! frames; byte positions are owned by the caller.

use std::fmt;

use super::{Error, Result};
use crate::schema::{BlockLayout, GroupDef, VarDataDef};

/// Where a traversal currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Root fixed fields are accessible
    RootFields,
    /// Between root-level groups
    Groups {
        /// Next group the schema expects
        next: String,
    },
    /// Inside a repeating group
    GroupElement {
        /// Innermost open group
        group: String,
        /// Elements of that group opened so far
        opened: usize,
        /// Declared element count
        count: usize,
        /// Number of open groups
        depth: usize,
    },
    /// Root variable-length fields
    VariableFields,
    /// Message complete
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootFields => write!(f, "root fields"),
            Self::Groups { next } => write!(f, "root groups (next {next})"),
            Self::GroupElement {
                group,
                opened,
                count,
                depth,
            } => write!(f, "group {group} element {opened}/{count} (depth {depth})"),
            Self::VariableFields => write!(f, "variable fields"),
            Self::Done => write!(f, "done"),
        }
    }
}

#[derive(Debug)]
struct BlockFrame<'s> {
    layout: &'s BlockLayout,
    base: usize,
    len: usize,
    next_group: usize,
    next_var: usize,
}

impl BlockFrame<'_> {
    fn is_complete(&self) -> bool {
        self.next_group == self.layout.groups.len() && self.next_var == self.layout.var_data.len()
    }

    fn fixed_open(&self) -> bool {
        self.next_group == 0 && self.next_var == 0
    }

    /// Next nested item the schema expects at this level.
    fn pending(&self) -> String {
        if let Some(group) = self.layout.groups.get(self.next_group) {
            format!("group {}", group.name)
        } else if let Some(var) = self.layout.var_data.get(self.next_var) {
            format!("var data {}", var.name)
        } else {
            "end of block".to_owned()
        }
    }
}

#[derive(Debug)]
struct GroupFrame<'s> {
    def: &'s GroupDef,
    block_len: usize,
    count: usize,
    opened: usize,
}

#[derive(Debug)]
enum Frame<'s> {
    Block(BlockFrame<'s>),
    Group(GroupFrame<'s>),
}

/// Phase machine over one message traversal.
#[derive(Debug)]
pub(crate) struct Traversal<'s> {
    stack: Vec<Frame<'s>>,
    done: bool,
}

impl<'s> Traversal<'s> {
    /// Start at the root block.
    pub(crate) fn new(root: &'s BlockLayout, base: usize, len: usize) -> Self {
        Self {
            stack: vec![Frame::Block(BlockFrame {
                layout: root,
                base,
                len,
                next_group: 0,
                next_var: 0,
            })],
            done: false,
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        if self.done {
            return Phase::Done;
        }
        let depth = self
            .stack
            .iter()
            .filter(|frame| matches!(frame, Frame::Group(_)))
            .count();
        let innermost = self.stack.iter().rev().find_map(|frame| match frame {
            Frame::Group(group) => Some(group),
            Frame::Block(_) => None,
        });
        if let Some(group) = innermost {
            return Phase::GroupElement {
                group: group.def.name.clone(),
                opened: group.opened,
                count: group.count,
                depth,
            };
        }
        match self.stack.first() {
            Some(Frame::Block(root)) if root.fixed_open() => Phase::RootFields,
            Some(Frame::Block(root)) if root.next_var == 0 => {
                match root.layout.groups.get(root.next_group) {
                    Some(group) => Phase::Groups {
                        next: group.name.clone(),
                    },
                    None => Phase::VariableFields,
                }
            }
            _ => Phase::VariableFields,
        }
    }

    fn violation(&self, expected: impl Into<String>, found: impl Into<String>) -> Error {
        Error::Sequencing {
            phase: self.phase().to_string(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    fn top_block(&self, found: &str) -> Result<&BlockFrame<'s>> {
        if self.done {
            return Err(self.violation("nothing (message finished)", found));
        }
        match self.stack.last() {
            Some(Frame::Block(block)) => Ok(block),
            Some(Frame::Group(group)) => Err(self.violation(
                format!("next element or end of group {}", group.def.name),
                found,
            )),
            None => Err(self.violation("a block", found)),
        }
    }

    fn top_block_mut(&mut self) -> Option<&mut BlockFrame<'s>> {
        match self.stack.last_mut() {
            Some(Frame::Block(block)) => Some(block),
            _ => None,
        }
    }

    fn top_group(&self, found: &str) -> Result<&GroupFrame<'s>> {
        match self.stack.last() {
            Some(Frame::Group(group)) if !self.done => Ok(group),
            _ => Err(self.violation("an open group", found)),
        }
    }

    /// Region of the current block, while its fixed fields are accessible.
    pub(crate) fn fixed_block(&self) -> Result<(usize, usize)> {
        let block = self.top_block("fixed field access")?;
        if !block.fixed_open() {
            return Err(self.violation(block.pending(), "fixed field access"));
        }
        Ok((block.base, block.len))
    }

    /// Layout and progress of the current block.
    pub(crate) fn current(&self) -> Result<(&'s BlockLayout, usize, usize)> {
        let block = self.top_block("nested content")?;
        Ok((block.layout, block.next_group, block.next_var))
    }

    /// Descriptor of the group `name`, if it is the next one due.
    pub(crate) fn expect_group(&self, name: &str) -> Result<&'s GroupDef> {
        let found = format!("group {name}");
        let block = self.top_block(&found)?;
        if block.next_var > 0 {
            return Err(self.violation(block.pending(), found));
        }
        let layout: &'s BlockLayout = block.layout;
        match layout.groups.get(block.next_group) {
            Some(def) if def.name == name => Ok(def),
            _ => Err(self.violation(block.pending(), found)),
        }
    }

    /// Open a group validated by [`Traversal::expect_group`].
    pub(crate) fn enter_group(&mut self, def: &'s GroupDef, count: usize, block_len: usize) {
        if let Some(block) = self.top_block_mut() {
            block.next_group += 1;
        }
        self.stack.push(Frame::Group(GroupFrame {
            def,
            block_len,
            count,
            opened: 0,
        }));
    }

    /// Close the current element if one is open. It must be complete.
    pub(crate) fn close_element(&mut self) -> Result<()> {
        match self.stack.last() {
            Some(Frame::Block(block)) if self.stack.len() > 1 => {
                if !block.is_complete() {
                    return Err(self.violation(block.pending(), "next element"));
                }
                self.stack.pop();
                Ok(())
            }
            Some(Frame::Group(_)) if !self.done => Ok(()),
            _ => Err(self.violation("an open group", "next element")),
        }
    }

    /// Elements of the current group not yet opened, and their block width.
    pub(crate) fn remaining(&self) -> Result<(usize, usize)> {
        let group = self.top_group("next element")?;
        Ok((group.count - group.opened, group.block_len))
    }

    /// Open the next element at `base`.
    pub(crate) fn push_element(&mut self, base: usize) -> Result<usize> {
        let next = match self.stack.last_mut() {
            Some(Frame::Group(group)) if group.opened < group.count => {
                group.opened += 1;
                let def: &'s GroupDef = group.def;
                Some((&def.layout, group.block_len, group.opened - 1))
            }
            _ => None,
        };
        let Some((layout, len, index)) = next else {
            return Err(self.violation("an open group with elements left", "next element"));
        };
        self.stack.push(Frame::Block(BlockFrame {
            layout,
            base,
            len,
            next_group: 0,
            next_var: 0,
        }));
        Ok(index)
    }

    /// Close the current group once every declared element was traversed.
    pub(crate) fn end_group(&mut self) -> Result<()> {
        if matches!(self.stack.last(), Some(Frame::Block(_))) && self.stack.len() > 1 {
            let block = self.top_block("end of group")?;
            if !block.is_complete() {
                return Err(self.violation(block.pending(), "end of group"));
            }
            self.stack.pop();
        }
        let group = self.top_group("end of group")?;
        if group.opened != group.count {
            return Err(self.violation(
                format!("{} more element(s) of {}", group.count - group.opened, group.def.name),
                "end of group",
            ));
        }
        self.stack.pop();
        Ok(())
    }

    /// Descriptor of the var data field `name`, if it is the next one due.
    pub(crate) fn expect_var(&self, name: &str) -> Result<&'s VarDataDef> {
        let found = format!("var data {name}");
        let block = self.top_block(&found)?;
        if block.next_group < block.layout.groups.len() {
            return Err(self.violation(block.pending(), found));
        }
        let layout: &'s BlockLayout = block.layout;
        match layout.var_data.get(block.next_var) {
            Some(def) if def.name == name => Ok(def),
            _ => Err(self.violation(block.pending(), found)),
        }
    }

    /// Mark the var data field returned by [`Traversal::expect_var`] as done.
    pub(crate) fn commit_var(&mut self) {
        if let Some(block) = self.top_block_mut() {
            block.next_var += 1;
        }
    }

    /// Require the traversal to be back at a complete root.
    pub(crate) fn finish(&mut self) -> Result<()> {
        let block = self.top_block("end of message")?;
        if self.stack.len() > 1 || !block.is_complete() {
            return Err(self.violation(block.pending(), "end of message"));
        }
        self.done = true;
        Ok(())
    }
}
