//! Daemon tasks queued for node agents.

use chrono::{DateTime, Utc};

/// Operation a daemon task asks the node agent to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonTaskType {
    ServerStart,
    ServerStop,
    ServerRestart,
    ServerInstall,
    ServerUpdate,
    ServerDelete,
    CmdExec,
}

impl DaemonTaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DaemonTaskType::ServerStart => "gsstart",
            DaemonTaskType::ServerStop => "gsstop",
            DaemonTaskType::ServerRestart => "gsrest",
            DaemonTaskType::ServerInstall => "gsinst",
            DaemonTaskType::ServerUpdate => "gsupd",
            DaemonTaskType::ServerDelete => "gsdel",
            DaemonTaskType::CmdExec => "cmdexec",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "gsstart" => Some(DaemonTaskType::ServerStart),
            "gsstop" => Some(DaemonTaskType::ServerStop),
            "gsrest" => Some(DaemonTaskType::ServerRestart),
            "gsinst" => Some(DaemonTaskType::ServerInstall),
            "gsupd" => Some(DaemonTaskType::ServerUpdate),
            "gsdel" => Some(DaemonTaskType::ServerDelete),
            "cmdexec" => Some(DaemonTaskType::CmdExec),
            _ => None,
        }
    }
}

/// Execution state of a daemon task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DaemonTaskStatus {
    #[default]
    Waiting,
    Working,
    Error,
    Success,
    Canceled,
}

impl DaemonTaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DaemonTaskStatus::Waiting => "waiting",
            DaemonTaskStatus::Working => "working",
            DaemonTaskStatus::Error => "error",
            DaemonTaskStatus::Success => "success",
            DaemonTaskStatus::Canceled => "canceled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "waiting" => Some(DaemonTaskStatus::Waiting),
            "working" => Some(DaemonTaskStatus::Working),
            "error" => Some(DaemonTaskStatus::Error),
            "success" => Some(DaemonTaskStatus::Success),
            "canceled" => Some(DaemonTaskStatus::Canceled),
            _ => None,
        }
    }
}

/// A queued unit of work for a node agent.
#[derive(Debug, Clone)]
pub struct DaemonTask {
    pub id: u64,
    pub node_id: u64,
    pub server_id: Option<u64>,
    /// Run only after this task has completed.
    pub run_after_id: Option<u64>,
    pub task: DaemonTaskType,
    pub cmd: Option<String>,
    pub output: Option<String>,
    pub status: DaemonTaskStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
