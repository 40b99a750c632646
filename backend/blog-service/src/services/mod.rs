/// Business logic layer for blog-service
///
/// - Category service: deletion cascade orchestration and cached listings
/// - Reassignment engine: keeps posts categorized while a category goes away
/// - Validation: ordered preconditions of a deletion
pub mod categories;
pub mod reassignment;
pub mod validation;

// Re-export commonly used services
pub use categories::{
    action_result, CategoryService, DeletionError, DeletionStage, DeletionSuccess,
    DELETE_SUCCESS_MESSAGE,
};
pub use reassignment::{
    plan_for_link_count, CascadeError, LinkAction, ReassignmentEngine, ReassignmentReport,
};
pub use validation::{
    authorize_deletion, validate_deletion, AuthorizedDeletion, ValidatedDeletion,
};
