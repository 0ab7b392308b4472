//! Review reconciler: per-product review collection with the
//! one-review-per-user invariant and an edit/delete state machine.
//!
//! One reconciler instance serves one (product, viewing user) context. A
//! view that navigates to a different product constructs a new instance, so
//! a response that resolves late cannot land in the wrong product's
//! collection.
//!
//! The backend is authoritative for the single-review invariant; the
//! reconciler mirrors it locally to gate the UI (`can_create`) and always
//! handles the backend's duplicate rejection.

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use shoppy_core::{ProductId, ReviewId, UserId};

use crate::error::ApiError;
use crate::transport::Transport;
use crate::types::Review;

/// Default star rating offered in a fresh form.
const DEFAULT_RATING: u8 = 5;

/// Review form state, scoped to the viewing user.
///
/// The "no review yet" condition of the state machine is not a variant: it
/// is the derived condition `own_review() == None` while `Viewing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReviewPhase {
    /// Reviews shown, form idle.
    #[default]
    Viewing,
    /// Own review open for edit; no server state touched yet.
    Editing(ReviewId),
    /// Create or edit request in flight.
    Submitting,
    /// Delete request in flight.
    Deleting(ReviewId),
}

/// Errors that can occur during review operations.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Reviews require an authenticated session.
    #[error("sign in to leave a review")]
    NotSignedIn,

    /// Another review operation is still in flight.
    #[error("another review operation is in flight")]
    Busy,

    /// Comment must be non-empty before submission is attempted.
    #[error("review comment cannot be empty")]
    EmptyComment,

    /// The target review is not in the current collection.
    #[error("review {0} is not in the current collection")]
    UnknownReview(ReviewId),

    /// No edit is in progress.
    #[error("no review edit in progress")]
    NotEditing,

    /// Business-rule rejection from the backend (duplicate review).
    #[error("{0}")]
    Conflict(String),

    /// Backend request failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ReviewError {
    /// One display string for the invoking view.
    #[must_use]
    pub fn display_message(&self, fallback: &str) -> String {
        match self {
            Self::Api(err) => err.display_message(fallback),
            other => other.to_string(),
        }
    }

    fn from_api(err: ApiError, fallback: &str) -> Self {
        if err.is_conflict() {
            Self::Conflict(err.display_message(fallback))
        } else {
            Self::Api(err)
        }
    }
}

/// The single review, if any, whose author is the given user.
///
/// Every operation below resolves "own review" through this lookup rather
/// than re-deriving it ad hoc.
#[must_use]
pub fn find_own_review(reviews: &[Review], user_id: UserId) -> Option<&Review> {
    reviews.iter().find(|r| r.user_id == user_id)
}

#[derive(Serialize)]
struct ReviewRequest<'a> {
    comment: &'a str,
    rating: u8,
}

/// Owner of one product's review collection and form state.
pub struct ReviewReconciler {
    transport: Transport,
    product_id: ProductId,
    user_id: Option<UserId>,
    reviews: Vec<Review>,
    phase: ReviewPhase,
    draft_comment: String,
    draft_rating: u8,
    last_error: Option<String>,
}

impl ReviewReconciler {
    /// Create a reconciler for one product, scoped to the viewing user
    /// (`None` while anonymous).
    #[must_use]
    pub fn new(transport: Transport, product_id: ProductId, user_id: Option<UserId>) -> Self {
        Self {
            transport,
            product_id,
            user_id,
            reviews: Vec::new(),
            phase: ReviewPhase::Viewing,
            draft_comment: String::new(),
            draft_rating: DEFAULT_RATING,
            last_error: None,
        }
    }

    // =========================================================================
    // Read access
    // =========================================================================

    /// The product this reconciler serves.
    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        self.product_id
    }

    /// The current review collection, newest first as the backend sends it.
    #[must_use]
    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    /// The viewing user's own review, if any.
    #[must_use]
    pub fn own_review(&self) -> Option<&Review> {
        self.user_id
            .and_then(|user_id| find_own_review(&self.reviews, user_id))
    }

    /// Whether the create form should be offered: signed in, idle, and no
    /// own review known locally. The backend remains authoritative.
    #[must_use]
    pub fn can_create(&self) -> bool {
        self.user_id.is_some() && self.phase == ReviewPhase::Viewing && self.own_review().is_none()
    }

    /// Current form phase.
    #[must_use]
    pub const fn phase(&self) -> ReviewPhase {
        self.phase
    }

    /// Whether a request is in flight.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self.phase, ReviewPhase::Submitting | ReviewPhase::Deleting(_))
    }

    /// The retained error from the last failed operation, already
    /// normalized for display.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Draft comment text.
    #[must_use]
    pub fn draft_comment(&self) -> &str {
        &self.draft_comment
    }

    /// Draft star rating.
    #[must_use]
    pub const fn draft_rating(&self) -> u8 {
        self.draft_rating
    }

    // =========================================================================
    // Form input
    // =========================================================================

    /// Update the draft comment.
    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.draft_comment = comment.into();
    }

    /// Update the draft rating, clamped to 1..=5.
    pub fn set_rating(&mut self, rating: u8) {
        self.draft_rating = rating.clamp(1, 5);
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Fetch the product's reviews, replacing the local collection.
    ///
    /// Failures degrade to an empty collection; the review list is never
    /// the reason a product page hard-fails. When the viewing user has a
    /// review, the form is seeded from it.
    #[instrument(skip(self), fields(product_id = %self.product_id))]
    pub async fn load(&mut self) -> &[Review] {
        let path = format!("/products/{}/reviews", self.product_id);
        self.reviews = self
            .transport
            .get::<Vec<Review>>(&path)
            .await
            .unwrap_or_default();
        self.seed_from_own_review();
        &self.reviews
    }

    /// Create the viewing user's review from the current draft.
    ///
    /// Permitted only while idle with no own review known; a concurrent
    /// session may still win the race, in which case the backend rejection
    /// surfaces as `ReviewError::Conflict`.
    ///
    /// # Errors
    ///
    /// `NotSignedIn`, `Busy`, `EmptyComment`, `Conflict`, or `Api`.
    #[instrument(skip(self), fields(product_id = %self.product_id))]
    pub async fn create(&mut self) -> Result<(), ReviewError> {
        self.last_error = None;
        if self.user_id.is_none() {
            return Err(ReviewError::NotSignedIn);
        }
        if self.is_busy() {
            return Err(ReviewError::Busy);
        }
        if self.draft_comment.trim().is_empty() {
            return Err(ReviewError::EmptyComment);
        }

        self.phase = ReviewPhase::Submitting;
        let path = format!("/products/{}/reviews", self.product_id);
        let request = ReviewRequest {
            comment: &self.draft_comment,
            rating: self.draft_rating.clamp(1, 5),
        };

        match self.transport.post::<_, Review>(&path, &request).await {
            Ok(_) => {
                // Re-fetch: the authoritative ordering and author name come
                // from the backend.
                self.phase = ReviewPhase::Viewing;
                self.load().await;
                Ok(())
            }
            Err(err) => {
                self.phase = ReviewPhase::Viewing;
                let err = ReviewError::from_api(err, "Failed to submit review.");
                self.last_error = Some(err.display_message("Failed to submit review."));
                Err(err)
            }
        }
    }

    /// Open a review for edit, seeding the form with its current values.
    ///
    /// No server state is touched.
    ///
    /// # Errors
    ///
    /// `Busy` while a request is in flight, `UnknownReview` when the id is
    /// not in the collection.
    pub fn begin_edit(&mut self, review_id: ReviewId) -> Result<(), ReviewError> {
        if self.is_busy() {
            return Err(ReviewError::Busy);
        }
        let review = self
            .reviews
            .iter()
            .find(|r| r.id == review_id)
            .ok_or(ReviewError::UnknownReview(review_id))?;

        self.draft_comment = review.comment.clone();
        self.draft_rating = review.rating;
        self.last_error = None;
        self.phase = ReviewPhase::Editing(review_id);
        Ok(())
    }

    /// Submit the in-progress edit.
    ///
    /// On success the single matching review is replaced in place by id -
    /// never appended. On failure the state reverts to `Editing` with the
    /// error retained, so the user can retry without re-entering data.
    ///
    /// # Errors
    ///
    /// `NotEditing`, `EmptyComment`, `Conflict`, or `Api`.
    #[instrument(skip(self), fields(product_id = %self.product_id))]
    pub async fn commit_edit(&mut self) -> Result<&Review, ReviewError> {
        self.last_error = None;
        let ReviewPhase::Editing(review_id) = self.phase else {
            return Err(ReviewError::NotEditing);
        };
        if self.draft_comment.trim().is_empty() {
            return Err(ReviewError::EmptyComment);
        }

        self.phase = ReviewPhase::Submitting;
        let path = format!("/reviews/{review_id}");
        let request = ReviewRequest {
            comment: &self.draft_comment,
            rating: self.draft_rating.clamp(1, 5),
        };

        match self.transport.put::<_, Review>(&path, &request).await {
            Ok(updated) => {
                if let Some(slot) = self.reviews.iter_mut().find(|r| r.id == updated.id) {
                    *slot = updated;
                }
                self.phase = ReviewPhase::Viewing;
                self.reviews
                    .iter()
                    .find(|r| r.id == review_id)
                    .ok_or(ReviewError::UnknownReview(review_id))
            }
            Err(err) => {
                self.phase = ReviewPhase::Editing(review_id);
                let err = ReviewError::from_api(err, "Failed to update review.");
                self.last_error = Some(err.display_message("Failed to update review."));
                Err(err)
            }
        }
    }

    /// Discard the in-progress edit and restore the form to the persisted
    /// review's values, when one exists.
    ///
    /// A no-op outside `Editing`; the collection is never touched.
    pub fn cancel_edit(&mut self) {
        if matches!(self.phase, ReviewPhase::Editing(_)) {
            self.phase = ReviewPhase::Viewing;
            self.seed_from_own_review();
            self.last_error = None;
        }
    }

    /// Delete a review by id. Explicit confirmation happens upstream.
    ///
    /// On success the review is removed from the collection; deleting the
    /// own review mid-edit implicitly cancels the edit. On failure the
    /// prior phase is restored with the error retained.
    ///
    /// # Errors
    ///
    /// `Busy`, `UnknownReview`, `Conflict`, or `Api`.
    #[instrument(skip(self), fields(product_id = %self.product_id, review_id = %review_id))]
    pub async fn delete(&mut self, review_id: ReviewId) -> Result<(), ReviewError> {
        self.last_error = None;
        if self.is_busy() {
            return Err(ReviewError::Busy);
        }
        if !self.reviews.iter().any(|r| r.id == review_id) {
            return Err(ReviewError::UnknownReview(review_id));
        }

        let prior = self.phase;
        self.phase = ReviewPhase::Deleting(review_id);
        let path = format!("/reviews/{review_id}");

        match self.transport.delete(&path).await {
            Ok(_) => {
                self.reviews.retain(|r| r.id != review_id);
                self.phase = match prior {
                    // Editing the review that was just deleted: implicit cancel.
                    ReviewPhase::Editing(editing) if editing == review_id => ReviewPhase::Viewing,
                    ReviewPhase::Deleting(_) | ReviewPhase::Submitting => ReviewPhase::Viewing,
                    other => other,
                };
                if !matches!(self.phase, ReviewPhase::Editing(_)) {
                    self.seed_from_own_review();
                }
                Ok(())
            }
            Err(err) => {
                self.phase = prior;
                let err = ReviewError::from_api(err, "Failed to delete review.");
                self.last_error = Some(err.display_message("Failed to delete review."));
                Err(err)
            }
        }
    }

    /// Reset the form to the persisted own review, or to the blank default.
    fn seed_from_own_review(&mut self) {
        match self.own_review() {
            Some(review) => {
                let comment = review.comment.clone();
                let rating = review.rating;
                self.draft_comment = comment;
                self.draft_rating = rating;
            }
            None => {
                self.draft_comment.clear();
                self.draft_rating = DEFAULT_RATING;
            }
        }
    }
}
