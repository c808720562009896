use crate::codegen::short_digest;
use crate::specdoc::{SkillSpecification, TriggerSpec};
use serde::{Deserialize, Serialize};
use skillcell_core::{Error, Paths, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 注册器侧的加载状态（仅镜像，本 crate 不做加载）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Error,
}

/// 资源上限，随 manifest 一起交给注册器
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLimits {
    pub max_execution_ms: u64,
    pub max_memory_mb: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_execution_ms: 30_000,
            max_memory_mb: 128,
        }
    }
}

/// 技能清单：注册器懒加载所需的触发/权限摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillManifest {
    pub name: String,
    pub version: String,
    pub description: String,
    pub triggers: TriggerSpec,
    pub permissions: Vec<String>,
    #[serde(default)]
    pub resource_limits: ResourceLimits,
}

impl SkillManifest {
    fn from_spec(spec: &SkillSpecification) -> Self {
        Self {
            name: spec.name.clone(),
            version: spec.version.clone(),
            description: spec.description.clone(),
            triggers: spec.triggers.clone(),
            permissions: spec.permissions.clone(),
            resource_limits: ResourceLimits::default(),
        }
    }
}

/// 一条版本记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillVersion {
    pub version: String,
    pub created_at: i64,
    pub changelog: String,
    pub author: String,
    pub content_hash: String,
}

/// 使用统计（增量均值，不保留完整历史）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageStats {
    pub created_at: i64,
    pub updated_at: i64,
    pub execution_count: u64,
    pub success_rate: f64,
    pub avg_execution_time_ms: f64,
    #[serde(default)]
    pub last_used: Option<i64>,
}

impl UsageStats {
    fn new() -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            created_at: now,
            updated_at: now,
            execution_count: 0,
            success_rate: 0.0,
            avg_execution_time_ms: 0.0,
            last_used: None,
        }
    }
}

/// 持久化的版本化技能条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryEntry {
    pub id: String,
    pub manifest: SkillManifest,
    pub specification: SkillSpecification,
    pub spec_path: PathBuf,
    pub source_path: PathBuf,
    pub versions: Vec<SkillVersion>,
    pub current_version: String,
    pub stats: UsageStats,
    pub enabled: bool,
    #[serde(default)]
    pub load_state: LoadState,
}

/// 仓库聚合统计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryStats {
    pub total_skills: usize,
    pub enabled_skills: usize,
    pub total_executions: u64,
    pub avg_success_rate: f64,
}

/// 源码内容的短指纹。
/// 确定性：相同文本永远得到相同摘要 — 用于完整性展示和 no-op 更新短路。
pub fn content_hash(source: &str) -> String {
    short_digest(source)
}

/// patch 位严格 +1
fn bump_patch(version: &str) -> String {
    let mut parts: Vec<u64> = version
        .split('.')
        .map(|p| p.parse().unwrap_or(0))
        .collect();
    parts.resize(3, 0);
    format!("{}.{}.{}", parts[0], parts[1], parts[2] + 1)
}

/// 技能仓库。
///
/// The on-disk index is read fully into memory at load and rewritten fully on
/// every mutation (write-whole-file-then-replace, so a crash mid-write leaves
/// the previous index intact). Single-writer by design.
pub struct SkillRepository {
    paths: Paths,
    entries: HashMap<String, RepositoryEntry>,
}

impl SkillRepository {
    pub fn load(paths: Paths) -> Result<Self> {
        paths.ensure_dirs()?;

        let index_file = paths.skills_index_file();
        let entries = if index_file.exists() {
            let content = std::fs::read_to_string(&index_file)?;
            serde_json::from_str(&content)?
        } else {
            HashMap::new()
        };

        let repo = Self { paths, entries };
        debug!(
            skills = repo.entries.len(),
            index = %repo.paths.skills_index_file().display(),
            "技能仓库已加载"
        );
        Ok(repo)
    }

    /// 全量重写索引：先写临时文件再原子替换
    fn persist(&self) -> Result<()> {
        let index_file = self.paths.skills_index_file();
        let tmp_file = index_file.with_extension("json.tmp");

        let content = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| Error::Persistence(format!("index serialize failed: {}", e)))?;
        std::fs::write(&tmp_file, content)
            .map_err(|e| Error::Persistence(format!("index write failed: {}", e)))?;
        std::fs::rename(&tmp_file, &index_file)
            .map_err(|e| Error::Persistence(format!("index replace failed: {}", e)))?;
        Ok(())
    }

    /// 新增技能：写规格文档与源码文件，创建初始版本，持久化索引。
    pub fn add(
        &mut self,
        spec: SkillSpecification,
        source: &str,
        author: &str,
        enabled: bool,
    ) -> Result<RepositoryEntry> {
        let slug = spec.slug();
        if slug.is_empty() {
            return Err(Error::Persistence("skill name yields empty slug".to_string()));
        }
        let spec_path = self.paths.specs_dir().join(format!("{}.md", slug));
        let source_path = self.paths.sources_dir().join(format!("{}.js", slug));

        std::fs::write(&spec_path, spec.render())
            .map_err(|e| Error::Persistence(format!("spec write failed: {}", e)))?;
        std::fs::write(&source_path, source)
            .map_err(|e| Error::Persistence(format!("source write failed: {}", e)))?;

        let entry = RepositoryEntry {
            id: format!("skill_{}", uuid::Uuid::new_v4().simple()),
            manifest: SkillManifest::from_spec(&spec),
            current_version: spec.version.clone(),
            versions: vec![SkillVersion {
                version: spec.version.clone(),
                created_at: chrono::Utc::now().timestamp(),
                changelog: "Initial version".to_string(),
                author: author.to_string(),
                content_hash: content_hash(source),
            }],
            specification: spec,
            spec_path,
            source_path,
            stats: UsageStats::new(),
            enabled,
            load_state: LoadState::Unloaded,
        };

        info!(
            skill_id = %entry.id,
            skill = %entry.manifest.name,
            version = %entry.current_version,
            enabled = enabled,
            "技能已入库: {} v{}",
            entry.manifest.name, entry.current_version
        );

        self.entries.insert(entry.id.clone(), entry.clone());
        self.persist()?;
        Ok(entry)
    }

    pub fn get(&self, id: &str) -> Option<&RepositoryEntry> {
        self.entries.get(id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&RepositoryEntry> {
        self.entries.values().find(|e| e.manifest.name == name)
    }

    pub fn list(&self) -> Vec<&RepositoryEntry> {
        let mut entries: Vec<&RepositoryEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| a.manifest.name.cmp(&b.manifest.name));
        entries
    }

    pub fn list_enabled(&self) -> Vec<&RepositoryEntry> {
        self.list().into_iter().filter(|e| e.enabled).collect()
    }

    /// 整条替换既有条目并持久化
    pub fn update_entry(&mut self, entry: RepositoryEntry) -> Result<()> {
        if !self.entries.contains_key(&entry.id) {
            return Err(Error::NotFound(format!("skill {} not found", entry.id)));
        }
        self.entries.insert(entry.id.clone(), entry);
        self.persist()
    }

    /// 写入新版本源码。
    ///
    /// Content-hash short-circuit: identical source is a no-op and returns
    /// `None` without bumping anything. Otherwise the patch component is
    /// strictly incremented and exactly one SkillVersion record appended.
    pub fn update_skill(
        &mut self,
        id: &str,
        new_source: &str,
        changelog: &str,
        author: &str,
    ) -> Result<Option<SkillVersion>> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("skill {} not found", id)))?;

        let new_hash = content_hash(new_source);
        if let Some(last) = entry.versions.last() {
            if last.content_hash == new_hash {
                debug!(
                    skill_id = %id,
                    hash = %new_hash,
                    "源码内容未变化，跳过版本更新"
                );
                return Ok(None);
            }
        }

        let new_version = bump_patch(&entry.current_version);
        std::fs::write(&entry.source_path, new_source)
            .map_err(|e| Error::Persistence(format!("source write failed: {}", e)))?;

        let version = SkillVersion {
            version: new_version.clone(),
            created_at: chrono::Utc::now().timestamp(),
            changelog: changelog.to_string(),
            author: author.to_string(),
            content_hash: new_hash,
        };
        entry.versions.push(version.clone());
        entry.current_version = new_version.clone();
        entry.manifest.version = new_version.clone();
        entry.specification.version = new_version;
        entry.stats.updated_at = chrono::Utc::now().timestamp();

        // Keep the persisted spec document in sync with the bumped version.
        let rendered = entry.specification.render();
        std::fs::write(&entry.spec_path, rendered)
            .map_err(|e| Error::Persistence(format!("spec write failed: {}", e)))?;

        info!(
            skill_id = %id,
            version = %version.version,
            "技能已更新到 v{}",
            version.version
        );

        self.persist()?;
        Ok(Some(version))
    }

    /// 弃用：禁用但保留在库中
    pub fn deprecate(&mut self, id: &str) -> Result<()> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("skill {} not found", id)))?;
        entry.enabled = false;
        entry.stats.updated_at = chrono::Utc::now().timestamp();
        info!(skill_id = %id, skill = %entry.manifest.name, "技能已弃用");
        self.persist()
    }

    /// 移除条目并删除其文件
    pub fn remove(&mut self, id: &str) -> Result<RepositoryEntry> {
        let entry = self
            .entries
            .remove(id)
            .ok_or_else(|| Error::NotFound(format!("skill {} not found", id)))?;
        let _ = std::fs::remove_file(&entry.spec_path);
        let _ = std::fs::remove_file(&entry.source_path);
        self.persist()?;
        info!(skill_id = %id, skill = %entry.manifest.name, "技能已移除");
        Ok(entry)
    }

    /// 大小写不敏感的子串检索：名称、描述、意图标签、示例语句
    pub fn search(&self, query: &str) -> Vec<&RepositoryEntry> {
        let needle = query.to_lowercase();
        self.list()
            .into_iter()
            .filter(|e| {
                e.manifest.name.to_lowercase().contains(&needle)
                    || e.manifest.description.to_lowercase().contains(&needle)
                    || e.manifest
                        .triggers
                        .intents
                        .iter()
                        .any(|i| i.to_lowercase().contains(&needle))
                    || e.manifest
                        .triggers
                        .examples
                        .iter()
                        .any(|x| x.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// 记录一次执行：增量均值更新，数值上对长期运行稳定。
    pub fn record_execution(&mut self, id: &str, success: bool, elapsed_ms: f64) -> Result<()> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("skill {} not found", id)))?;

        let now = chrono::Utc::now().timestamp();
        entry.stats.execution_count += 1;
        let n = entry.stats.execution_count as f64;
        entry.stats.avg_execution_time_ms += (elapsed_ms - entry.stats.avg_execution_time_ms) / n;
        let outcome = if success { 1.0 } else { 0.0 };
        entry.stats.success_rate += (outcome - entry.stats.success_rate) / n;
        entry.stats.last_used = Some(now);
        entry.stats.updated_at = now;

        self.persist()
    }

    pub fn get_stats(&self) -> RepositoryStats {
        let total_skills = self.entries.len();
        let enabled_skills = self.entries.values().filter(|e| e.enabled).count();
        let total_executions = self.entries.values().map(|e| e.stats.execution_count).sum();
        let avg_success_rate = if total_skills == 0 {
            0.0
        } else {
            self.entries.values().map(|e| e.stats.success_rate).sum::<f64>() / total_skills as f64
        };
        RepositoryStats {
            total_skills,
            enabled_skills,
            total_executions,
            avg_success_rate,
        }
    }

    /// 截断版本列表到最近 N 条；当前生效版本永不删除。
    pub fn cleanup_old_versions(&mut self, id: &str, keep: usize) -> Result<usize> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("skill {} not found", id)))?;

        let keep = keep.max(1);
        if entry.versions.len() <= keep {
            return Ok(0);
        }

        let to_remove = entry.versions.len() - keep;
        let removed: Vec<SkillVersion> = entry.versions.drain(..to_remove).collect();
        // Versions are appended in order, so the active (last) version survives
        // any truncation from the front.
        debug_assert!(entry
            .versions
            .iter()
            .any(|v| v.version == entry.current_version));

        info!(
            skill_id = %id,
            removed = removed.len(),
            kept = entry.versions.len(),
            "清理旧版本记录"
        );
        self.persist()?;
        Ok(removed.len())
    }

    /// 导出为 tar.gz：entry.json + 规格文档 + 源码
    pub fn export(&self, id: &str, output_path: &Path) -> Result<()> {
        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("skill {} not found", id)))?;

        let slug = entry.specification.slug();
        let file = std::fs::File::create(output_path)?;
        let enc = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut tar = tar::Builder::new(enc);

        let entry_json = serde_json::to_vec_pretty(entry)?;
        let mut header = tar::Header::new_gnu();
        header.set_size(entry_json.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        tar.append_data(&mut header, format!("{}/entry.json", slug), entry_json.as_slice())
            .map_err(|e| Error::Persistence(format!("archive write failed: {}", e)))?;

        tar.append_path_with_name(&entry.spec_path, format!("{}/{}.md", slug, slug))
            .map_err(|e| Error::Persistence(format!("archive write failed: {}", e)))?;
        tar.append_path_with_name(&entry.source_path, format!("{}/{}.js", slug, slug))
            .map_err(|e| Error::Persistence(format!("archive write failed: {}", e)))?;
        tar.finish()
            .map_err(|e| Error::Persistence(format!("archive finish failed: {}", e)))?;

        info!(
            skill_id = %id,
            output = %output_path.display(),
            "技能已导出"
        );
        Ok(())
    }

    /// 从导出档案导入。冲突时分配新 id；文件落到本仓库的目录下。
    pub fn import(&mut self, archive_path: &Path) -> Result<RepositoryEntry> {
        let file = std::fs::File::open(archive_path)?;
        let dec = flate2::read::GzDecoder::new(file);
        let mut archive = tar::Archive::new(dec);

        let temp_dir = std::env::temp_dir().join(format!(
            "skill_import_{}",
            chrono::Utc::now().timestamp_millis()
        ));
        std::fs::create_dir_all(&temp_dir)?;
        archive
            .unpack(&temp_dir)
            .map_err(|e| Error::Persistence(format!("archive unpack failed: {}", e)))?;

        // Single top-level slug directory with entry.json inside.
        let mut imported: Option<RepositoryEntry> = None;
        for dir_entry in std::fs::read_dir(&temp_dir)?.flatten() {
            let entry_json = dir_entry.path().join("entry.json");
            if entry_json.exists() {
                let content = std::fs::read_to_string(&entry_json)?;
                imported = Some(serde_json::from_str(&content)?);
                break;
            }
        }
        let mut entry = imported
            .ok_or_else(|| Error::Persistence("archive contains no entry.json".to_string()))?;

        if self.entries.contains_key(&entry.id) {
            entry.id = format!("skill_{}", uuid::Uuid::new_v4().simple());
        }

        let slug = entry.specification.slug();
        entry.spec_path = self.paths.specs_dir().join(format!("{}.md", slug));
        entry.source_path = self.paths.sources_dir().join(format!("{}.js", slug));
        let unpacked = temp_dir.join(&slug);
        std::fs::copy(unpacked.join(format!("{}.md", slug)), &entry.spec_path)?;
        std::fs::copy(unpacked.join(format!("{}.js", slug)), &entry.source_path)?;

        entry.load_state = LoadState::Unloaded;
        self.entries.insert(entry.id.clone(), entry.clone());
        self.persist()?;

        let _ = std::fs::remove_dir_all(&temp_dir);

        info!(
            skill_id = %entry.id,
            skill = %entry.manifest.name,
            "技能已导入"
        );
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn spec(name: &str) -> SkillSpecification {
        let doc = format!(
            "# Skill: {}\n\n## Metadata\n- description: test skill\n\n## Triggers\n- intent: test-intent\n- example: run the {} skill\n",
            name, name
        );
        SkillSpecification::parse_document(&doc).unwrap()
    }

    fn repo(dir: &TempDir) -> SkillRepository {
        SkillRepository::load(Paths::with_base(dir.path().to_path_buf())).unwrap()
    }

    #[test]
    fn test_content_hash_idempotent() {
        let a = content_hash("const x = 1;");
        let b = content_hash("const x = 1;");
        assert_eq!(a, b);
        assert_ne!(a, content_hash("const x = 2;"));
    }

    #[test]
    fn test_add_and_get() {
        let dir = TempDir::new().unwrap();
        let mut repo = repo(&dir);
        let entry = repo.add(spec("CSV Parser"), "source v1", "tester", true).unwrap();

        assert_eq!(entry.current_version, "1.0.0");
        assert_eq!(entry.versions.len(), 1);
        assert!(entry.enabled);
        assert_eq!(entry.load_state, LoadState::Unloaded);
        assert!(entry.spec_path.exists());
        assert!(entry.source_path.exists());

        assert!(repo.get(&entry.id).is_some());
        assert!(repo.get_by_name("CSV Parser").is_some());
        assert!(repo.get_by_name("missing").is_none());
    }

    #[test]
    fn test_index_survives_reload() {
        let dir = TempDir::new().unwrap();
        let id = {
            let mut repo = repo(&dir);
            repo.add(spec("Persist Me"), "src", "tester", true).unwrap().id
        };
        let repo = repo(&dir);
        assert_eq!(repo.get(&id).unwrap().manifest.name, "Persist Me");
    }

    #[test]
    fn test_update_skill_version_monotonicity() {
        let dir = TempDir::new().unwrap();
        let mut repo = repo(&dir);
        let entry = repo.add(spec("Versioned"), "v1 source", "tester", true).unwrap();

        let updates = 4;
        for i in 0..updates {
            let version = repo
                .update_skill(&entry.id, &format!("source revision {}", i), "tweak", "tester")
                .unwrap()
                .expect("update should produce a version");
            assert_eq!(version.version, format!("1.0.{}", i + 1));
        }

        let entry = repo.get(&entry.id).unwrap();
        assert_eq!(entry.versions.len(), updates + 1);
        assert_eq!(entry.current_version, "1.0.4");
        assert_eq!(entry.manifest.version, "1.0.4");
    }

    #[test]
    fn test_update_skill_noop_on_identical_source() {
        let dir = TempDir::new().unwrap();
        let mut repo = repo(&dir);
        let entry = repo.add(spec("Stable"), "same source", "tester", true).unwrap();

        let result = repo
            .update_skill(&entry.id, "same source", "no change", "tester")
            .unwrap();
        assert!(result.is_none());

        let entry = repo.get(&entry.id).unwrap();
        assert_eq!(entry.versions.len(), 1);
        assert_eq!(entry.current_version, "1.0.0");
    }

    #[test]
    fn test_search_matches_name_intents_examples() {
        let dir = TempDir::new().unwrap();
        let mut repo = repo(&dir);
        repo.add(spec("CSV Parser"), "src", "tester", true).unwrap();
        repo.add(spec("Mail Sender"), "src", "tester", true).unwrap();

        assert_eq!(repo.search("csv").len(), 1);
        assert_eq!(repo.search("TEST-INTENT").len(), 2);
        assert_eq!(repo.search("run the mail").len(), 1);
        assert!(repo.search("nonexistent").is_empty());
    }

    #[test]
    fn test_record_execution_incremental_means() {
        let dir = TempDir::new().unwrap();
        let mut repo = repo(&dir);
        let entry = repo.add(spec("Stats"), "src", "tester", true).unwrap();

        repo.record_execution(&entry.id, true, 100.0).unwrap();
        repo.record_execution(&entry.id, true, 200.0).unwrap();
        repo.record_execution(&entry.id, false, 300.0).unwrap();

        let stats = &repo.get(&entry.id).unwrap().stats;
        assert_eq!(stats.execution_count, 3);
        assert!((stats.avg_execution_time_ms - 200.0).abs() < 1e-9);
        assert!((stats.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert!(stats.last_used.is_some());
    }

    #[test]
    fn test_cleanup_old_versions_keeps_current() {
        let dir = TempDir::new().unwrap();
        let mut repo = repo(&dir);
        let entry = repo.add(spec("Cleanup"), "v0", "tester", true).unwrap();
        for i in 0..5 {
            repo.update_skill(&entry.id, &format!("rev {}", i), "tweak", "tester")
                .unwrap();
        }

        let removed = repo.cleanup_old_versions(&entry.id, 2).unwrap();
        assert_eq!(removed, 4);

        let entry = repo.get(&entry.id).unwrap();
        assert_eq!(entry.versions.len(), 2);
        assert_eq!(
            entry.versions.last().unwrap().version,
            entry.current_version
        );
    }

    #[test]
    fn test_deprecate_and_list_enabled() {
        let dir = TempDir::new().unwrap();
        let mut repo = repo(&dir);
        let a = repo.add(spec("Keep"), "src", "tester", true).unwrap();
        let b = repo.add(spec("Drop"), "src", "tester", true).unwrap();

        repo.deprecate(&b.id).unwrap();
        let enabled = repo.list_enabled();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].id, a.id);
        // Deprecated entry stays inspectable.
        assert!(repo.get(&b.id).is_some());
    }

    #[test]
    fn test_remove_deletes_files() {
        let dir = TempDir::new().unwrap();
        let mut repo = repo(&dir);
        let entry = repo.add(spec("Gone"), "src", "tester", true).unwrap();
        let spec_path = entry.spec_path.clone();

        repo.remove(&entry.id).unwrap();
        assert!(repo.get(&entry.id).is_none());
        assert!(!spec_path.exists());
    }

    #[test]
    fn test_export_import_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut repo = repo(&dir);
        let entry = repo.add(spec("Portable"), "exported source", "tester", true).unwrap();

        let archive = dir.path().join("portable.tar.gz");
        repo.export(&entry.id, &archive).unwrap();

        let other_dir = TempDir::new().unwrap();
        let mut other = SkillRepository::load(Paths::with_base(other_dir.path().to_path_buf())).unwrap();
        let imported = other.import(&archive).unwrap();

        assert_eq!(imported.manifest.name, "Portable");
        assert_eq!(imported.current_version, "1.0.0");
        assert!(imported.source_path.exists());
        let source = std::fs::read_to_string(&imported.source_path).unwrap();
        assert_eq!(source, "exported source");
    }

    #[test]
    fn test_get_stats() {
        let dir = TempDir::new().unwrap();
        let mut repo = repo(&dir);
        let a = repo.add(spec("A"), "src", "tester", true).unwrap();
        repo.add(spec("B"), "src", "tester", false).unwrap();
        repo.record_execution(&a.id, true, 10.0).unwrap();

        let stats = repo.get_stats();
        assert_eq!(stats.total_skills, 2);
        assert_eq!(stats.enabled_skills, 1);
        assert_eq!(stats.total_executions, 1);
    }

    #[test]
    fn test_bump_patch() {
        assert_eq!(bump_patch("1.0.0"), "1.0.1");
        assert_eq!(bump_patch("2.3.9"), "2.3.10");
        assert_eq!(bump_patch("weird"), "0.0.1");
    }
}
