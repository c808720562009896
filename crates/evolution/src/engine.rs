use crate::codegen::{ArtifactStatus, CodeSynthesizer};
use crate::events::{EventSink, EvolutionEvent, EvolutionEventType};
use crate::gap::{CapabilityGap, CapabilityGapTracker, GapStatus};
use crate::repository::{RepositoryEntry, SkillRepository};
use crate::template::TemplateSynthesizer;
use crate::validator::{CompletionOracle, PlausibilityOracle, ValidationStatus, Validator, ValidatorConfig};
use skillcell_core::{Error, EvolutionConfig, Paths, Result};
use skillcell_providers::CompletionProvider;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, Semaphore};
use tracing::{debug, info, warn};

/// 进化引擎：缺口 → 规格 → 源码 → 验证 →（修复 → 再验证）→ 入库 → 部署。
///
/// 并发模型：整条 pipeline 由一个容量为 1 的准入槽守护（try_acquire），
/// 竞争时直接丢弃请求（返回 None）而不是排队 — 调用方自行择机重试。
pub struct EvolutionEngine {
    config: EvolutionConfig,
    provider: Arc<dyn CompletionProvider>,
    oracle: Arc<dyn PlausibilityOracle>,
    tracker: Mutex<CapabilityGapTracker>,
    template: TemplateSynthesizer,
    codegen: CodeSynthesizer,
    validator: Validator,
    repository: Mutex<SkillRepository>,
    events: Arc<dyn EventSink>,
    slot: Semaphore,
}

impl EvolutionEngine {
    pub fn new(
        config: EvolutionConfig,
        paths: &Paths,
        provider: Arc<dyn CompletionProvider>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let repository = SkillRepository::load(paths.clone())?;
        let model_label = config
            .model
            .clone()
            .unwrap_or_else(|| "provider-default".to_string());

        let engine = Self {
            validator: Validator::new(ValidatorConfig::from(&config)),
            codegen: CodeSynthesizer::new(config.max_iterations, &model_label),
            template: TemplateSynthesizer::new(),
            tracker: Mutex::new(CapabilityGapTracker::new()),
            repository: Mutex::new(repository),
            oracle: Arc::new(CompletionOracle::new(provider.clone())),
            provider,
            events,
            slot: Semaphore::new(1),
            config,
        };

        engine.events.append(EvolutionEvent::success(
            EvolutionEventType::EngineInitialized,
            "evolution engine initialized",
        ));
        info!(
            auto_evolve = engine.config.enabled,
            auto_approve = engine.config.auto_approve,
            "🧬 [进化] 引擎已初始化"
        );

        Ok(engine)
    }

    /// 替换似然性裁决器（默认使用补全服务；测试或接入真实检查器时替换）
    pub fn with_oracle(mut self, oracle: Arc<dyn PlausibilityOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    /// 上报一次能力缺失。
    ///
    /// 缺口成立时记录 `gap_identified` 事件；启用自动进化时以 fire-and-forget
    /// 方式触发 pipeline，不阻塞调用方。
    pub async fn report_failure(
        self: &Arc<Self>,
        user_request: &str,
        attempted_actions: &[String],
        failure_reason: &str,
        existing_capabilities: &[String],
    ) -> Result<Option<CapabilityGap>> {
        let gap = {
            let mut tracker = self.tracker.lock().await;
            tracker
                .report(
                    user_request,
                    attempted_actions,
                    failure_reason,
                    existing_capabilities,
                    self.provider.as_ref(),
                )
                .await?
        };

        if let Some(gap) = &gap {
            self.events.append(
                EvolutionEvent::success(
                    EvolutionEventType::GapIdentified,
                    "capability gap recorded",
                )
                .with_gap(&gap.id),
            );

            if self.config.enabled {
                let engine = Arc::clone(self);
                let gap_id = gap.id.clone();
                tokio::spawn(async move {
                    engine.evolve_skill(&gap_id).await;
                });
            }
        }

        Ok(gap)
    }

    /// 直接登记一条用户请求的缺口（不触发 pipeline）
    pub async fn record_gap(&self, description: &str) -> CapabilityGap {
        let gap = {
            let mut tracker = self.tracker.lock().await;
            tracker.insert(CapabilityGap::manual(description))
        };
        self.events.append(
            EvolutionEvent::success(
                EvolutionEventType::GapIdentified,
                "user-requested capability",
            )
            .with_gap(&gap.id),
        );
        gap
    }

    /// 便捷入口：从用户描述直接合成缺口并走完整 pipeline。
    pub async fn create_skill_from_description(&self, description: &str) -> Option<RepositoryEntry> {
        let gap = self.record_gap(description).await;
        self.evolve_skill(&gap.id).await
    }

    /// 执行一条缺口的完整进化 pipeline。
    ///
    /// 引擎忙碌时立即返回 None（丢弃而非排队），缺口状态不变。
    /// 任何阶段异常都在引擎边界被吞掉：记失败事件、缺口置 failed、返回 None —
    /// 原始错误不会抛给调用方，事件历史可查。
    pub async fn evolve_skill(&self, gap_id: &str) -> Option<RepositoryEntry> {
        match self.try_evolve(gap_id).await {
            Ok(entry) => Some(entry),
            Err(Error::Busy(_)) => {
                // 丢弃而非失败：缺口状态不变，调用方可重试。
                info!(
                    gap_id = %gap_id,
                    "🧬 [进化] pipeline 正忙，本次请求被丢弃（可稍后重试）"
                );
                None
            }
            Err(e) => {
                warn!(gap_id = %gap_id, error = %e, "🧬 [进化] pipeline 失败");
                None
            }
        }
    }

    async fn try_evolve(&self, gap_id: &str) -> Result<RepositoryEntry> {
        let _permit = self.slot.try_acquire().map_err(|_| {
            Error::Busy(format!("evolution pipeline already running, gap {} dropped", gap_id))
        })?;
        self.run_pipeline(gap_id).await
    }

    async fn run_pipeline(&self, gap_id: &str) -> Result<RepositoryEntry> {
        let gap = {
            let tracker = self.tracker.lock().await;
            tracker.get(gap_id).cloned()
        }
        .ok_or_else(|| Error::NotFound(format!("gap {} not found", gap_id)))?;

        info!(
            gap_id = %gap_id,
            category = ?gap.capability.category,
            "🧬 [进化] 开始进化: {}",
            gap.capability.description
        );

        // ─── Step 1: 规格合成 ───
        if let Err(e) = self.transition(gap_id, GapStatus::Generating).await {
            self.fail_stage(gap_id, EvolutionEventType::GenerationStarted, "pipeline admission", &e)
                .await;
            return Err(e);
        }
        self.events.append(
            EvolutionEvent::success(
                EvolutionEventType::GenerationStarted,
                "specification synthesis started",
            )
            .with_gap(gap_id),
        );

        let spec = match self.template.synthesize(&gap, self.provider.as_ref()).await {
            Ok(spec) => spec,
            Err(e) => {
                self.fail_stage(gap_id, EvolutionEventType::GenerationCompleted, "specification synthesis", &e)
                    .await;
                return Err(e);
            }
        };

        // ─── Step 2: 代码合成（内部有界迭代）───
        let mut artifact = match self.codegen.generate(&spec, self.provider.as_ref()).await {
            Ok(artifact) => artifact,
            Err(e) => {
                self.fail_stage(gap_id, EvolutionEventType::GenerationCompleted, "code synthesis", &e)
                    .await;
                return Err(e);
            }
        };
        self.events.append(
            EvolutionEvent::success(
                EvolutionEventType::GenerationCompleted,
                &format!("generated {} v{}", spec.name, spec.version),
            )
            .with_gap(gap_id)
            .with_artifact(&artifact.id),
        );

        // ─── Step 3: 验证 ───
        if let Err(e) = self.transition(gap_id, GapStatus::Validating).await {
            self.fail_stage(gap_id, EvolutionEventType::ValidationStarted, "validation admission", &e)
                .await;
            return Err(e);
        }
        self.events.append(
            EvolutionEvent::success(EvolutionEventType::ValidationStarted, "validation started")
                .with_gap(gap_id)
                .with_artifact(&artifact.id),
        );

        let mut record = match self
            .validator
            .validate(&artifact.source, &spec, self.oracle.as_ref())
            .await
        {
            Ok(record) => record,
            Err(e) => {
                self.fail_stage(gap_id, EvolutionEventType::ValidationFailed, "validation", &e)
                    .await;
                return Err(e);
            }
        };
        artifact.validation = record.clone();

        // ─── Step 4: 恰好一次修复 + 再验证 ───
        if record.status == ValidationStatus::Failed {
            let report = record.error_report();
            self.events.append(
                EvolutionEvent::failure(
                    EvolutionEventType::ValidationFailed,
                    "validation",
                    &truncate(&report, 400),
                )
                .with_gap(gap_id)
                .with_artifact(&artifact.id),
            );

            if let Err(e) = self.transition(gap_id, GapStatus::Generating).await {
                self.fail_stage(gap_id, EvolutionEventType::SkillRepaired, "repair admission", &e)
                    .await;
                return Err(e);
            }

            let repaired = match self
                .codegen
                .repair(&artifact, &report, self.provider.as_ref())
                .await
            {
                Ok(source) => source,
                Err(e) => {
                    self.fail_stage(gap_id, EvolutionEventType::SkillRepaired, "repair", &e)
                        .await;
                    return Err(e);
                }
            };
            artifact.source = repaired;
            artifact.meta.iterations += 1;
            self.events.append(
                EvolutionEvent::success(EvolutionEventType::SkillRepaired, "one repair attempt applied")
                    .with_gap(gap_id)
                    .with_artifact(&artifact.id),
            );

            if let Err(e) = self.transition(gap_id, GapStatus::Validating).await {
                self.fail_stage(gap_id, EvolutionEventType::ValidationStarted, "re-validation admission", &e)
                    .await;
                return Err(e);
            }
            self.events.append(
                EvolutionEvent::success(EvolutionEventType::ValidationStarted, "re-validation started")
                    .with_gap(gap_id)
                    .with_artifact(&artifact.id),
            );

            record = match self
                .validator
                .validate(&artifact.source, &spec, self.oracle.as_ref())
                .await
            {
                Ok(record) => record,
                Err(e) => {
                    self.fail_stage(gap_id, EvolutionEventType::ValidationFailed, "re-validation", &e)
                        .await;
                    return Err(e);
                }
            };
            artifact.validation = record.clone();

            if record.status == ValidationStatus::Failed {
                let error = Error::RepairExhausted(format!(
                    "{} still failing after one repair attempt",
                    spec.name
                ));
                self.events.append(
                    EvolutionEvent::failure(
                        EvolutionEventType::ValidationFailed,
                        "re-validation",
                        &truncate(&record.error_report(), 400),
                    )
                    .with_gap(gap_id)
                    .with_artifact(&artifact.id),
                );
                {
                    let mut tracker = self.tracker.lock().await;
                    if let Err(te) = tracker.transition(gap_id, GapStatus::Failed) {
                        debug!(gap_id = %gap_id, error = %te, "缺口置失败状态时出错");
                    }
                }
                warn!(
                    gap_id = %gap_id,
                    skill = %spec.name,
                    "🧬 [进化] ❌ 修复后仍未通过验证，停止该缺口的自动尝试"
                );
                return Err(error);
            }
        }

        self.events.append(
            EvolutionEvent::success(EvolutionEventType::ValidationPassed, "all gates passed")
                .with_gap(gap_id)
                .with_artifact(&artifact.id),
        );
        artifact.status = ArtifactStatus::Validated;

        // ─── Step 5: 入库 + 部署判定 ───
        let deploy = self.config.auto_approve || !self.config.require_human_review;
        if deploy {
            artifact.status = ArtifactStatus::Deployed;
        }

        let entry = {
            let mut repository = self.repository.lock().await;
            match repository.add(
                artifact.specification.clone(),
                &artifact.source,
                "skillcell-evolution",
                deploy,
            ) {
                Ok(entry) => entry,
                Err(e) => {
                    self.fail_stage(gap_id, EvolutionEventType::SkillDeployed, "repository persist", &e)
                        .await;
                    return Err(e);
                }
            }
        };

        if deploy {
            self.events.append(
                EvolutionEvent::success(
                    EvolutionEventType::SkillDeployed,
                    &format!("{} v{} deployed", entry.manifest.name, entry.manifest.version),
                )
                .with_gap(gap_id)
                .with_artifact(&artifact.id),
            );
        } else {
            info!(
                gap_id = %gap_id,
                skill = %entry.manifest.name,
                "🧬 [进化] 验证通过，等待人工批准后部署"
            );
        }

        {
            let mut tracker = self.tracker.lock().await;
            if let Err(e) = tracker.transition(gap_id, GapStatus::Resolved) {
                debug!(gap_id = %gap_id, error = %e, "缺口置 resolved 状态时出错");
            }
        }

        info!(
            gap_id = %gap_id,
            skill = %entry.manifest.name,
            version = %entry.manifest.version,
            deployed = deploy,
            iterations = artifact.meta.iterations,
            "🧬 [进化] ✅ 进化完成: {} v{}",
            entry.manifest.name, entry.manifest.version
        );

        Ok(entry)
    }

    /// 人工批准一个 `validated` 待部署的技能
    pub async fn approve(&self, skill_id: &str) -> Result<RepositoryEntry> {
        let mut repository = self.repository.lock().await;
        let mut entry = repository
            .get(skill_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("skill {} not found", skill_id)))?;

        if entry.enabled {
            return Ok(entry);
        }

        entry.enabled = true;
        repository.update_entry(entry.clone())?;
        self.events.append(EvolutionEvent::success(
            EvolutionEventType::SkillDeployed,
            &format!("{} v{} approved and deployed", entry.manifest.name, entry.manifest.version),
        ));

        info!(
            skill_id = %skill_id,
            skill = %entry.manifest.name,
            "🧬 [进化] 人工批准部署: {}",
            entry.manifest.name
        );
        Ok(entry)
    }

    /// 弃用一个已部署的技能
    pub async fn deprecate_skill(&self, skill_id: &str) -> Result<()> {
        let mut repository = self.repository.lock().await;
        repository.deprecate(skill_id)?;
        self.events.append(EvolutionEvent::success(
            EvolutionEventType::SkillDeprecated,
            &format!("skill {} deprecated", skill_id),
        ));
        Ok(())
    }

    pub async fn gap(&self, id: &str) -> Option<CapabilityGap> {
        self.tracker.lock().await.get(id).cloned()
    }

    pub async fn pending_gaps(&self) -> Vec<CapabilityGap> {
        self.tracker
            .lock()
            .await
            .list_pending()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn event_history(&self, limit: usize) -> Vec<EvolutionEvent> {
        self.events.recent(limit)
    }

    pub async fn repository(&self) -> MutexGuard<'_, SkillRepository> {
        self.repository.lock().await
    }

    async fn transition(&self, gap_id: &str, status: GapStatus) -> Result<()> {
        let mut tracker = self.tracker.lock().await;
        tracker.transition(gap_id, status)
    }

    /// 阶段失败的统一处理：失败事件 + 缺口置 failed。
    async fn fail_stage(
        &self,
        gap_id: &str,
        event_type: EvolutionEventType,
        action: &str,
        error: &Error,
    ) {
        warn!(
            gap_id = %gap_id,
            stage = %action,
            error = %error,
            "🧬 [进化] ❌ 阶段失败: {}",
            action
        );
        self.events.append(
            EvolutionEvent::failure(event_type, action, &error.to_string()).with_gap(gap_id),
        );
        let mut tracker = self.tracker.lock().await;
        if let Err(te) = tracker.transition(gap_id, GapStatus::Failed) {
            debug!(gap_id = %gap_id, error = %te, "缺口置 failed 状态时出错");
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}
