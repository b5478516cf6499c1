use crate::calls::{Fault, FaultAction, ProviderCall, take_fault};
use crate::config::MemConfig;
use crate::handle::MemIo;
use bridgevfs_core::{
    AccessCheck, OpenFlags, OpenOptions, ProviderIo, ProviderOp, VfsError, VfsErrorKind,
    VfsProvider, VfsResult,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) type SharedData = Arc<Mutex<Vec<u8>>>;

#[derive(Debug, Default)]
pub(crate) struct MemState {
    config: MemConfig,
    pub(crate) files: Mutex<HashMap<String, SharedData>>,
    calls: Mutex<Vec<ProviderCall>>,
    faults: Mutex<Vec<Fault>>,
}

impl MemState {
    /// Record `call` and apply any pending fault for it. Returns `Ok(true)`
    /// when the call must be skipped.
    pub(crate) fn intercept(&self, call: ProviderCall, context: &'static str) -> VfsResult<bool> {
        let op = call.op;
        if self.config.record_calls {
            self.calls.lock().push(call);
        }
        let action = take_fault(&mut self.faults.lock(), op);
        match action {
            None => Ok(false),
            Some(FaultAction::Ignore) => Ok(true),
            Some(FaultAction::Fail(kind)) => Err(VfsError::new(kind, context)),
            Some(FaultAction::Panic) => panic!("injected fault in {op}"),
        }
    }
}

/// Provider keeping every file as a byte vector in memory.
///
/// Clones share the same files, call log and faults.
#[derive(Clone, Debug, Default)]
pub struct MemProvider {
    state: Arc<MemState>,
}

impl MemProvider {
    pub fn new(config: MemConfig) -> Self {
        Self {
            state: Arc::new(MemState {
                config,
                ..Default::default()
            }),
        }
    }

    /// A provider that records every call.
    pub fn recording() -> Self {
        Self::new(MemConfig { record_calls: true })
    }

    pub fn insert_file(&self, path: &str, data: impl Into<Vec<u8>>) {
        self.state
            .files
            .lock()
            .insert(path.to_string(), Arc::new(Mutex::new(data.into())));
    }

    pub fn file_contents(&self, path: &str) -> Option<Vec<u8>> {
        let files = self.state.files.lock();
        files.get(path).map(|data| data.lock().clone())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.state.files.lock().contains_key(path)
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.state.files.lock().keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state.calls.lock().clone()
    }

    /// Recorded calls whose op is one of `ops`, in order.
    pub fn calls_of(&self, ops: &[ProviderOp]) -> Vec<ProviderCall> {
        self.state
            .calls
            .lock()
            .iter()
            .filter(|call| ops.contains(&call.op))
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.calls.lock().clear();
    }

    /// Make the next call of `op` behave as `action`.
    pub fn fail_next(&self, op: ProviderOp, action: FaultAction) {
        self.fail_times(op, action, 1);
    }

    /// Make the next `times` calls of `op` behave as `action`.
    pub fn fail_times(&self, op: ProviderOp, action: FaultAction, times: usize) {
        if times == 0 {
            return;
        }
        self.state.faults.lock().push(Fault {
            op,
            action,
            remaining: times,
        });
    }

    pub fn clear_faults(&self) {
        self.state.faults.lock().clear();
    }
}

impl VfsProvider for MemProvider {
    fn name(&self) -> &str {
        "mem"
    }

    fn open(&self, path: &str, opts: &OpenOptions) -> VfsResult<Box<dyn ProviderIo>> {
        if self
            .state
            .intercept(ProviderCall::new(ProviderOp::Open, path), "mem.open")?
        {
            return Err(VfsError::new(VfsErrorKind::NotFound, "mem.open.ignored"));
        }

        let data = {
            let mut files = self.state.files.lock();
            match files.get(path) {
                Some(_) if opts.flags.contains(OpenFlags::EXCLUSIVE) => {
                    return Err(VfsError::new(VfsErrorKind::AlreadyExists, "mem.open.exclusive"));
                }
                Some(data) => data.clone(),
                None if opts.flags.contains(OpenFlags::CREATE) => {
                    let data = SharedData::default();
                    files.insert(path.to_string(), data.clone());
                    data
                }
                None => return Err(VfsError::new(VfsErrorKind::NotFound, "mem.open")),
            }
        };
        tracing::trace!(path, kind = ?opts.kind, "mem file opened");

        Ok(Box::new(MemIo::new(
            self.state.clone(),
            path.to_string(),
            data,
            opts.flags,
        )))
    }

    fn delete(&self, path: &str) -> VfsResult<()> {
        if self
            .state
            .intercept(ProviderCall::new(ProviderOp::Delete, path), "mem.delete")?
        {
            return Ok(());
        }
        match self.state.files.lock().remove(path) {
            Some(_) => Ok(()),
            None => Err(VfsError::new(VfsErrorKind::NotFound, "mem.delete")),
        }
    }

    fn access(&self, path: &str, check: AccessCheck) -> VfsResult<bool> {
        if self
            .state
            .intercept(ProviderCall::new(ProviderOp::Access, path), "mem.access")?
        {
            return Ok(false);
        }
        let files = self.state.files.lock();
        let Some(data) = files.get(path) else {
            return Ok(false);
        };
        Ok(match check {
            AccessCheck::Exists => !data.lock().is_empty(),
            AccessCheck::Read | AccessCheck::ReadWrite => true,
        })
    }
}
