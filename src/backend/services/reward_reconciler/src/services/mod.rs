pub mod batch_grouping_service;
pub mod discovery_service;
pub mod oracle_service;
pub mod reconciliation_service;
pub mod reward_aggregation_service;
pub mod submission_queue;
pub mod withdrawal_service;

pub use batch_grouping_service::BatchGroupingService;
pub use discovery_service::DiscoveryService;
pub use oracle_service::OracleService;
pub use reconciliation_service::{ReconcileMode, ReconciliationService, ReconciliationSummary};
pub use reward_aggregation_service::RewardAggregationService;
pub use submission_queue::{SubmissionHandle, SubmissionQueue};
pub use withdrawal_service::WithdrawalService;
