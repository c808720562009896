pub mod codegen;
pub mod engine;
pub mod events;
pub mod extract;
pub mod gap;
pub mod repository;
pub mod specdoc;
pub mod template;
pub mod validator;

pub use codegen::{
    basic_syntax_check, missing_shapes, short_digest, ArtifactStatus, CodeSynthesizer,
    GeneratedSkillArtifact, GenerationMeta,
};
pub use engine::EvolutionEngine;
pub use events::{
    EventDetails, EventOutcome, EventSink, EvolutionEvent, EvolutionEventType, JsonlEventSink,
    MemoryEventSink,
};
pub use gap::{
    CapabilityGap, CapabilityGapTracker, Complexity, GapCategory, GapContext, GapStatus,
    RequiredCapability,
};
pub use repository::{
    content_hash, LoadState, RepositoryEntry, RepositoryStats, ResourceLimits, SkillManifest,
    SkillRepository, SkillVersion, UsageStats,
};
pub use specdoc::{
    ActionKind, DependencySpec, LogicStep, SkillSpecification, SpecParseError, TestCase,
    TriggerSpec,
};
pub use template::TemplateSynthesizer;
pub use validator::{
    CompletionOracle, OracleVerdict, PlausibilityOracle, SecurityReviewResult, SecurityRisk,
    Severity, TestResult, ValidationRecord, ValidationStatus, Validator, ValidatorConfig,
};
