use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{CandidateId, CompanyCandidateId, CompanyId, PhaseId};

/// Who controls the candidate's profile data inside a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnershipStatus {
    CompanyOwned,
    PendingInvitation,
    UserOwned,
}

impl OwnershipStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::CompanyOwned => "company_owned",
            Self::PendingInvitation => "pending_invitation",
            Self::UserOwned => "user_owned",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub sent_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateContact {
    pub name: String,
    pub email: String,
}

/// Point-in-time copy of the candidate profile as the company saw it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub markdown: String,
    pub data: serde_json::Value,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyCandidate {
    pub id: CompanyCandidateId,
    pub candidate_id: CandidateId,
    pub company_id: CompanyId,
    pub phase_id: Option<PhaseId>,
    pub ownership_status: OwnershipStatus,
    pub invitation: Option<Invitation>,
    pub contact: CandidateContact,
    pub snapshot: Option<ProfileSnapshot>,
    pub cv_file: Option<String>,
}

/// Inbound payload for linking a candidate to a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyCandidateDraft {
    pub candidate_id: CandidateId,
    pub company_id: CompanyId,
    pub contact: CandidateContact,
    #[serde(default)]
    pub phase_id: Option<PhaseId>,
    #[serde(default)]
    pub cv_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompanyCandidateError {
    #[error("company candidate {0} not found")]
    NotFound(CompanyCandidateId),
    #[error("invalid company candidate: {0}")]
    Validation(String),
    #[error("candidate {candidate_id} is already linked to company {company_id}")]
    AlreadyExists {
        candidate_id: CandidateId,
        company_id: CompanyId,
    },
    #[error("invitation expired at {expired_at}")]
    InvitationExpired { expired_at: DateTime<Utc> },
    #[error("invitation was already processed")]
    InvitationAlreadyProcessed,
    #[error("cannot change ownership from {} to {}", .from.label(), .to.label())]
    InvalidOwnershipTransition {
        from: OwnershipStatus,
        to: OwnershipStatus,
    },
}

impl CompanyCandidate {
    pub fn create(
        id: CompanyCandidateId,
        draft: CompanyCandidateDraft,
    ) -> Result<Self, CompanyCandidateError> {
        if draft.candidate_id.is_blank() {
            return Err(CompanyCandidateError::Validation(
                "candidate_id must not be empty".to_string(),
            ));
        }
        if draft.company_id.is_blank() {
            return Err(CompanyCandidateError::Validation(
                "company_id must not be empty".to_string(),
            ));
        }
        let email = draft.contact.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(CompanyCandidateError::Validation(format!(
                "'{}' is not a usable email address",
                draft.contact.email
            )));
        }

        Ok(Self {
            id,
            candidate_id: draft.candidate_id,
            company_id: draft.company_id,
            phase_id: draft.phase_id,
            ownership_status: OwnershipStatus::CompanyOwned,
            invitation: None,
            contact: CandidateContact {
                name: draft.contact.name.trim().to_string(),
                email: email.to_string(),
            },
            snapshot: None,
            cv_file: draft.cv_file,
        })
    }

    /// Ask the candidate to take ownership of their profile.
    pub fn invite(&mut self, now: DateTime<Utc>, ttl: Duration) -> Result<(), CompanyCandidateError> {
        if self.ownership_status != OwnershipStatus::CompanyOwned {
            return Err(CompanyCandidateError::InvalidOwnershipTransition {
                from: self.ownership_status,
                to: OwnershipStatus::PendingInvitation,
            });
        }

        let expires_at = now.checked_add_signed(ttl).ok_or_else(|| {
            CompanyCandidateError::Validation(format!(
                "invitation ttl of {} hours is out of range",
                ttl.num_hours()
            ))
        })?;

        self.ownership_status = OwnershipStatus::PendingInvitation;
        self.invitation = Some(Invitation {
            sent_at: now,
            expires_at,
            processed_at: None,
        });
        Ok(())
    }

    pub fn accept_invitation(&mut self, now: DateTime<Utc>) -> Result<(), CompanyCandidateError> {
        self.process_invitation(now, OwnershipStatus::UserOwned)
    }

    pub fn reject_invitation(&mut self, now: DateTime<Utc>) -> Result<(), CompanyCandidateError> {
        self.process_invitation(now, OwnershipStatus::CompanyOwned)
    }

    fn process_invitation(
        &mut self,
        now: DateTime<Utc>,
        outcome: OwnershipStatus,
    ) -> Result<(), CompanyCandidateError> {
        let Some(invitation) = self.invitation.as_mut() else {
            return Err(CompanyCandidateError::InvalidOwnershipTransition {
                from: self.ownership_status,
                to: outcome,
            });
        };
        if invitation.processed_at.is_some() {
            return Err(CompanyCandidateError::InvitationAlreadyProcessed);
        }
        if self.ownership_status != OwnershipStatus::PendingInvitation {
            return Err(CompanyCandidateError::InvalidOwnershipTransition {
                from: self.ownership_status,
                to: outcome,
            });
        }
        if now > invitation.expires_at {
            return Err(CompanyCandidateError::InvitationExpired {
                expired_at: invitation.expires_at,
            });
        }

        invitation.processed_at = Some(now);
        self.ownership_status = outcome;
        Ok(())
    }

    pub fn capture_snapshot(
        &mut self,
        markdown: impl Into<String>,
        data: serde_json::Value,
        now: DateTime<Utc>,
    ) {
        self.snapshot = Some(ProfileSnapshot {
            markdown: markdown.into(),
            data,
            captured_at: now,
        });
    }
}
