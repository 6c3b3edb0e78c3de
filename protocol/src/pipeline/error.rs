use alloy_primitives::{TxHash, U256};
use std::time::Duration;
use thiserror::Error;

use super::PipelineStep;
use crate::chain::ChainError;
use crate::crypto::EncryptionError;
use crate::offer::AllowanceError;
use crate::storage::UploadError;

/// Why the approval step did not grant an allowance.
#[derive(Debug, Clone, Error)]
pub enum ApprovalError {
    /// The transfer amount does not fit in a uint256. No wallet call was made.
    #[error(transparent)]
    Allowance(#[from] AllowanceError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    /// The approval was broadcast but not mined in time. It can still be
    /// mined later, so the allowance may end up granted.
    #[error(
        "approval {hash} not confirmed after {}s; allowance of {amount} may still be granted",
        .waited.as_secs()
    )]
    Unconfirmed {
        hash: TxHash,
        waited: Duration,
        amount: U256,
    },
}

/// Everything that can stop an offer submission.
#[derive(Debug, Error)]
pub enum OfferError {
    /// The caller's pre-flight check refused the request, or there was no
    /// offer record to encrypt. Nothing was attempted.
    #[error("offer request rejected before submission")]
    ValidationRejected,

    /// Another attempt is still running in this session.
    #[error("an offer submission is already in progress")]
    AttemptInFlight,

    #[error("could not encrypt offer: {0}")]
    Encryption(#[from] EncryptionError),

    #[error("could not upload offer: {0}")]
    Upload(#[from] UploadError),

    /// No allowance was granted, except for [`ApprovalError::Unconfirmed`].
    #[error("token approval failed: {0}")]
    Approval(#[from] ApprovalError),

    /// The allowance from the approval step is still granted.
    #[error("offer submission failed: {source}")]
    Submission {
        source: ChainError,
        allowance_outstanding: U256,
    },
}

impl OfferError {
    /// Step the error belongs to, or `None` for pre-flight rejections.
    pub fn step(&self) -> Option<PipelineStep> {
        match self {
            Self::ValidationRejected | Self::AttemptInFlight => None,
            Self::Encryption(_) | Self::Upload(_) => Some(PipelineStep::Uploading),
            Self::Approval(_) => Some(PipelineStep::Approving),
            Self::Submission { .. } => Some(PipelineStep::Submitting),
        }
    }

    /// Allowance left granted on chain by a failed attempt.
    pub fn allowance_outstanding(&self) -> Option<U256> {
        match self {
            Self::Submission {
                allowance_outstanding,
                ..
            } => Some(*allowance_outstanding),
            Self::Approval(ApprovalError::Unconfirmed { amount, .. }) => Some(*amount),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_their_step() {
        assert_eq!(OfferError::ValidationRejected.step(), None);
        assert_eq!(
            OfferError::Encryption(EncryptionError::KeypairUnavailable).step(),
            Some(PipelineStep::Uploading)
        );
        assert_eq!(
            OfferError::Approval(AllowanceError::Overflow.into()).step(),
            Some(PipelineStep::Approving)
        );
    }

    #[test]
    fn broadcast_transactions_report_an_allowance() {
        let approval = OfferError::Approval(ChainError::Rejected("denied".into()).into());
        assert_eq!(approval.allowance_outstanding(), None);

        let unconfirmed = OfferError::Approval(ApprovalError::Unconfirmed {
            hash: TxHash::ZERO,
            waited: Duration::from_secs(120),
            amount: U256::from(15),
        });
        assert_eq!(unconfirmed.allowance_outstanding(), Some(U256::from(15)));
        assert!(unconfirmed.to_string().contains("may still be granted"));

        let submission = OfferError::Submission {
            source: ChainError::Reverted {
                hash: TxHash::ZERO,
            },
            allowance_outstanding: U256::from(15),
        };
        assert_eq!(submission.allowance_outstanding(), Some(U256::from(15)));
        assert!(submission.to_string().contains("reverted"));
    }
}
