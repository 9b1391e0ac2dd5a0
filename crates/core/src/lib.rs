pub mod config;
pub mod connector;
pub mod context;
pub mod dashboard;
pub mod domain;
pub mod errors;
pub mod normalize;
pub mod registry;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use connector::{
    ConnectorStatus, CrmConnector, DiscardSink, EntityKind, FetchQuery, HealthState, HealthStatus,
    RecordSink, SyncReport,
};
pub use context::AssistantContext;
pub use dashboard::DashboardSummary;
pub use domain::budget::{BudgetSummary, DealBucket, StageBreakdown, StageSentinels};
pub use domain::call::{Call, CallDirection};
pub use domain::lead::Lead;
pub use errors::{ApplicationError, ConnectorError, InterfaceError};
pub use registry::{
    ConnectorRegistry, PlatformInfo, PlatformOutcome, PlatformResult, PlatformResults,
    SharedConnector,
};
