use phd_domain::{AnalyticsFilter, DashboardStats, FormSubmission, PageRequest, SubmissionAnalytics, SubmissionDetail,
                 SubmissionId, SubmissionPage, SubmissionQuery, SubmissionStatus, UserId, UserSubmissionFilter};
use serde_json::Value;

use crate::errors::PersistenceError;

/// Envíos finales y su flujo de revisión.
///
/// Estados: `pending -> approved | rejected | deleted`. El borrado es lógico.
/// Si se rechazan o no las transiciones repetidas depende de la
/// `TransitionPolicy` con la que se construyó el store.
pub trait FormSubmissionStore {
    /// Crea el envío en estado `pending` dentro de una transacción.
    fn create(&mut self, user_id: UserId, form_type: &str, form_data: &Value) -> Result<FormSubmission, PersistenceError>;

    fn find_by_id(&self, id: SubmissionId) -> Result<Option<SubmissionDetail>, PersistenceError>;

    /// Envíos de un usuario, más recientes primero.
    fn user_submissions(&self,
                        user_id: UserId,
                        filter: &UserSubmissionFilter,
                        page: PageRequest)
                        -> Result<SubmissionPage<FormSubmission>, PersistenceError>;

    fn all_submissions(&self,
                       query: &SubmissionQuery,
                       page: PageRequest)
                       -> Result<SubmissionPage<SubmissionDetail>, PersistenceError>;

    /// Cola de revisión: pendientes, el más antiguo primero.
    fn pending_submissions(&self, page: PageRequest) -> Result<SubmissionPage<SubmissionDetail>, PersistenceError>;

    fn update_status(&mut self,
                     id: SubmissionId,
                     status: SubmissionStatus,
                     reviewer_id: UserId,
                     comments: Option<&str>)
                     -> Result<Option<FormSubmission>, PersistenceError>;

    fn approve(&mut self,
               id: SubmissionId,
               reviewer_id: UserId,
               comments: Option<&str>)
               -> Result<Option<FormSubmission>, PersistenceError> {
        self.update_status(id, SubmissionStatus::Approved, reviewer_id, comments)
    }

    fn reject(&mut self,
              id: SubmissionId,
              reviewer_id: UserId,
              comments: Option<&str>)
              -> Result<Option<FormSubmission>, PersistenceError> {
        self.update_status(id, SubmissionStatus::Rejected, reviewer_id, comments)
    }

    /// Borrado lógico. `true` si alguna fila cambió.
    fn delete(&mut self, id: SubmissionId) -> Result<bool, PersistenceError>;

    fn analytics(&self, filter: &AnalyticsFilter) -> Result<SubmissionAnalytics, PersistenceError>;

    fn dashboard_stats(&self) -> Result<DashboardStats, PersistenceError>;
}
