//! Call recording and fault injection.

use bridgevfs_core::{ProviderOp, VfsErrorKind};

/// One recorded provider call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderCall {
    pub op: ProviderOp,
    pub path: String,
    pub offset: Option<u64>,
    pub len: Option<usize>,
}

impl ProviderCall {
    pub fn new(op: ProviderOp, path: &str) -> Self {
        Self {
            op,
            path: path.to_string(),
            offset: None,
            len: None,
        }
    }

    pub fn at(mut self, offset: u64, len: usize) -> Self {
        self.offset = Some(offset);
        self.len = Some(len);
        self
    }
}

/// What an injected fault does instead of the real call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultAction {
    /// Return an error of this kind.
    Fail(VfsErrorKind),
    /// Panic inside the provider.
    Panic,
    /// Report success without doing anything. Positioned reads and writes
    /// report zero bytes.
    Ignore,
}

#[derive(Clone, Debug)]
pub(crate) struct Fault {
    pub op: ProviderOp,
    pub action: FaultAction,
    pub remaining: usize,
}

pub(crate) fn take_fault(faults: &mut Vec<Fault>, op: ProviderOp) -> Option<FaultAction> {
    let index = faults.iter().position(|fault| fault.op == op)?;
    let fault = &mut faults[index];
    let action = fault.action;
    fault.remaining -= 1;
    if fault.remaining == 0 {
        faults.remove(index);
    }
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_faults_are_consumed() {
        let mut faults = vec![Fault {
            op: ProviderOp::Flush,
            action: FaultAction::Panic,
            remaining: 1,
        }];
        assert_eq!(take_fault(&mut faults, ProviderOp::Close), None);
        assert_eq!(take_fault(&mut faults, ProviderOp::Flush), Some(FaultAction::Panic));
        assert_eq!(take_fault(&mut faults, ProviderOp::Flush), None);
    }

    #[test]
    fn counted_faults_repeat() {
        let mut faults = vec![Fault {
            op: ProviderOp::Length,
            action: FaultAction::Fail(VfsErrorKind::Io),
            remaining: 2,
        }];
        assert!(take_fault(&mut faults, ProviderOp::Length).is_some());
        assert!(take_fault(&mut faults, ProviderOp::Length).is_some());
        assert!(faults.is_empty());
    }
}
