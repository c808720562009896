use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::error;

/// 进化事件类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvolutionEventType {
    GapIdentified,
    GenerationStarted,
    GenerationCompleted,
    ValidationStarted,
    ValidationPassed,
    ValidationFailed,
    SkillDeployed,
    SkillRepaired,
    SkillDeprecated,
    EngineInitialized,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventOutcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDetails {
    #[serde(default)]
    pub gap_id: Option<String>,
    #[serde(default)]
    pub artifact_id: Option<String>,
    pub action: String,
    pub result: EventOutcome,
    #[serde(default)]
    pub error: Option<String>,
}

/// 追加式审计记录，一旦产生不再修改。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionEvent {
    pub id: String,
    pub timestamp_ms: i64,
    #[serde(rename = "type")]
    pub event_type: EvolutionEventType,
    pub details: EventDetails,
}

impl EvolutionEvent {
    pub fn success(event_type: EvolutionEventType, action: &str) -> Self {
        Self {
            id: format!("evt_{}", uuid::Uuid::new_v4().simple()),
            timestamp_ms: Utc::now().timestamp_millis(),
            event_type,
            details: EventDetails {
                gap_id: None,
                artifact_id: None,
                action: action.to_string(),
                result: EventOutcome::Success,
                error: None,
            },
        }
    }

    pub fn failure(event_type: EvolutionEventType, action: &str, error: &str) -> Self {
        let mut event = Self::success(event_type, action);
        event.details.result = EventOutcome::Failure;
        event.details.error = Some(error.to_string());
        event
    }

    pub fn with_gap(mut self, gap_id: &str) -> Self {
        self.details.gap_id = Some(gap_id.to_string());
        self
    }

    pub fn with_artifact(mut self, artifact_id: &str) -> Self {
        self.details.artifact_id = Some(artifact_id.to_string());
        self
    }
}

/// 事件汇（注入式）。
///
/// The engine appends, the owner of the sink decides retention. Implementors
/// never mutate stored events.
pub trait EventSink: Send + Sync {
    fn append(&self, event: EvolutionEvent);
    /// 最近 `limit` 条事件，按发生顺序返回
    fn recent(&self, limit: usize) -> Vec<EvolutionEvent>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 内存环形事件汇：超出容量后丢弃最旧事件
pub struct MemoryEventSink {
    events: Mutex<VecDeque<EvolutionEvent>>,
    cap: usize,
}

impl MemoryEventSink {
    pub fn new(cap: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            cap: cap.max(1),
        }
    }
}

impl EventSink for MemoryEventSink {
    fn append(&self, event: EvolutionEvent) {
        let mut events = self.events.lock().unwrap();
        events.push_back(event);
        while events.len() > self.cap {
            events.pop_front();
        }
    }

    fn recent(&self, limit: usize) -> Vec<EvolutionEvent> {
        let events = self.events.lock().unwrap();
        let skip = events.len().saturating_sub(limit);
        events.iter().skip(skip).cloned().collect()
    }

    fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

/// JSONL 文件事件汇：按日期追加写入，一行一个事件
pub struct JsonlEventSink {
    events_dir: PathBuf,
}

impl JsonlEventSink {
    pub fn new(events_dir: PathBuf) -> Self {
        Self { events_dir }
    }

    fn current_log_file(&self) -> PathBuf {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        self.events_dir.join(format!("{}.jsonl", today))
    }

    fn read_today(&self) -> Vec<EvolutionEvent> {
        let log_file = self.current_log_file();
        if !log_file.exists() {
            return Vec::new();
        }
        let content = match std::fs::read_to_string(&log_file) {
            Ok(c) => c,
            Err(e) => {
                error!(error = %e, "事件日志读取失败");
                return Vec::new();
            }
        };
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(event) => Some(event),
                Err(e) => {
                    error!(error = %e, line = %line, "事件日志行解析失败");
                    None
                }
            })
            .collect()
    }
}

impl EventSink for JsonlEventSink {
    fn append(&self, event: EvolutionEvent) {
        let log_file = self.current_log_file();
        let write = || -> std::io::Result<()> {
            if let Some(parent) = log_file.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = OpenOptions::new().create(true).append(true).open(&log_file)?;
            let json = serde_json::to_string(&event)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            writeln!(file, "{}", json)?;
            Ok(())
        };
        if let Err(e) = write() {
            error!(error = %e, "事件日志写入失败");
        }
    }

    fn recent(&self, limit: usize) -> Vec<EvolutionEvent> {
        let events = self.read_today();
        let skip = events.len().saturating_sub(limit);
        events.into_iter().skip(skip).collect()
    }

    fn len(&self) -> usize {
        self.read_today().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_sink_preserves_order() {
        let sink = MemoryEventSink::new(10);
        sink.append(EvolutionEvent::success(
            EvolutionEventType::GapIdentified,
            "first",
        ));
        sink.append(EvolutionEvent::success(
            EvolutionEventType::GenerationStarted,
            "second",
        ));

        let events = sink.recent(10);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].details.action, "first");
        assert_eq!(events[1].details.action, "second");
    }

    #[test]
    fn test_memory_sink_trims_oldest_at_cap() {
        let sink = MemoryEventSink::new(3);
        for i in 0..5 {
            sink.append(EvolutionEvent::success(
                EvolutionEventType::GapIdentified,
                &format!("event {}", i),
            ));
        }
        assert_eq!(sink.len(), 3);
        let events = sink.recent(10);
        assert_eq!(events[0].details.action, "event 2");
        assert_eq!(events[2].details.action, "event 4");
    }

    #[test]
    fn test_event_builders() {
        let event = EvolutionEvent::failure(
            EvolutionEventType::ValidationFailed,
            "validation",
            "syntax gate failed",
        )
        .with_gap("gap_1")
        .with_artifact("art_1");

        assert_eq!(event.details.result, EventOutcome::Failure);
        assert_eq!(event.details.gap_id.as_deref(), Some("gap_1"));
        assert_eq!(event.details.artifact_id.as_deref(), Some("art_1"));
        assert!(event.details.error.as_deref().unwrap().contains("syntax"));
    }

    #[test]
    fn test_jsonl_sink_roundtrip() {
        let dir = TempDir::new().unwrap();
        let sink = JsonlEventSink::new(dir.path().to_path_buf());

        sink.append(
            EvolutionEvent::success(EvolutionEventType::SkillDeployed, "deploy").with_gap("gap_9"),
        );
        sink.append(EvolutionEvent::success(
            EvolutionEventType::EngineInitialized,
            "init",
        ));

        assert_eq!(sink.len(), 2);
        let events = sink.recent(1);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EvolutionEventType::EngineInitialized);
    }
}
