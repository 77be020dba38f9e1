// phd-domain library entry point
//
// Tipos planos compartidos por los stores (sin dependencias de base de datos).
pub mod analytics;
pub mod error;
pub mod pagination;
pub mod progress;
pub mod submission;
pub mod time;
pub mod user;

pub use analytics::{AnalyticsFilter, DashboardStats, FormTypeStats, MonthlyCount, OverallStats, SubmissionAnalytics};
pub use error::DomainError;
pub use pagination::{PageRequest, SubmissionPage, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
pub use progress::{FormProgress, ProgressId, ProgressStat, ProgressSummary, ProgressWithUser};
pub use submission::{FormSubmission, SortField, SortOrder, SubmissionDetail, SubmissionId, SubmissionQuery, SubmissionStatus,
                     UserSubmissionFilter};
pub use time::parse_timestamp;
pub use user::{UserId, UserProfile};
