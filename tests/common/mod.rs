//! Fixtures shared by the integration suites.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use neo::approver::ChannelPrompter;
use neo::directives::Dispatcher;
use neo::executor::{ExecutorMode, ExecutorSettings, TerminalExecutor};
use neo::policy::{ApprovalGate, ApprovalRequest};

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Scratch directory removed on drop.
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub fn new(label: &str) -> Self {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!("neo-it-{label}-{}-{n}", std::process::id()));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).expect("create scratch dir");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn child(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Every approval request the background answerer has seen.
#[derive(Clone, Default)]
pub struct Approvals {
    seen: Arc<Mutex<Vec<ApprovalRequest>>>,
}

impl Approvals {
    pub fn commands(&self) -> Vec<String> {
        self.seen
            .lock()
            .expect("approvals lock")
            .iter()
            .map(|r| r.command.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<ApprovalRequest> {
        self.seen.lock().expect("approvals lock").clone()
    }
}

/// Channel prompter answered by a spawned task replaying `answers`.
/// Prompts beyond the script are denied.
pub fn scripted_prompter(answers: &[&str]) -> (ChannelPrompter, Approvals) {
    let (prompter, mut rx) = ChannelPrompter::channel();
    let approvals = Approvals::default();
    let seen = approvals.seen.clone();
    let mut answers: Vec<String> = answers.iter().rev().map(|a| a.to_string()).collect();
    tokio::spawn(async move {
        while let Some(pending) = rx.recv().await {
            seen.lock()
                .expect("approvals lock")
                .push(pending.request().clone());
            let answer = answers.pop().unwrap_or_else(|| "n".to_string());
            pending.respond(answer);
        }
    });
    (prompter, approvals)
}

pub fn settings(scratch: &ScratchDir, mode: ExecutorMode) -> ExecutorSettings {
    ExecutorSettings {
        mode,
        session_name: format!("neo-it-{}", COUNTER.fetch_add(1, Ordering::Relaxed)),
        runtime_dir: Some(scratch.child("runtime")),
        poll_interval: Duration::from_millis(20),
        max_wait: Duration::from_secs(10),
        ..ExecutorSettings::default()
    }
}

/// Dispatcher over every built-in handler, answered by `answers`.
pub fn dispatcher(
    answers: &[&str],
    settings: ExecutorSettings,
) -> (Dispatcher, Arc<TerminalExecutor>, Approvals) {
    let (prompter, approvals) = scripted_prompter(answers);
    let executor = Arc::new(TerminalExecutor::new(settings));
    let dispatcher = Dispatcher::new(ApprovalGate::new(Arc::new(prompter)), executor.clone());
    (dispatcher, executor, approvals)
}
