//! Workflow rules for BOQ status transitions and approvals

use chrono::Utc;
use thiserror::Error;

use crate::core::entity::Status;
use crate::core::validation::ValidationReport;
use crate::entities::boq::Boq;

/// Errors that can occur during workflow operations
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Invalid status transition: {from} → {to}")]
    InvalidTransition { from: Status, to: Status },

    #[error("BOQ {id} is {status} and cannot be modified; create a new version instead")]
    Locked { id: String, status: Status },

    #[error("Cannot approve BOQ with validation errors ({errors} error(s))")]
    ValidationErrors { errors: usize },

    #[error("A rejection reason is required")]
    MissingReason,
}

/// Status transition rules
pub struct BoqWorkflow;

impl BoqWorkflow {
    /// Check if a status transition is valid
    pub fn is_valid_transition(from: Status, to: Status) -> bool {
        matches!(
            (from, to),
            (Status::Draft, Status::Validated)
                | (Status::Validated, Status::Validated)
                | (Status::Validated, Status::Draft)
                | (Status::Draft, Status::Approved)
                | (Status::Validated, Status::Approved)
                | (Status::Draft, Status::Rejected)
                | (Status::Validated, Status::Rejected)
        )
    }

    /// Get allowed transitions from the current status
    pub fn allowed_transitions(current: Status) -> Vec<Status> {
        match current {
            Status::Draft => vec![Status::Validated, Status::Approved, Status::Rejected],
            Status::Validated => vec![Status::Draft, Status::Approved, Status::Rejected],
            Status::Approved | Status::Rejected => vec![],
        }
    }

    /// Refuse edits on approved or rejected BOQs
    pub fn ensure_editable(boq: &Boq) -> Result<(), WorkflowError> {
        if boq.status.is_locked() {
            return Err(WorkflowError::Locked {
                id: boq.id.to_string(),
                status: boq.status,
            });
        }
        Ok(())
    }

    fn transition(boq: &mut Boq, to: Status) -> Result<(), WorkflowError> {
        let from = boq.status;
        if !Self::is_valid_transition(from, to) {
            return Err(WorkflowError::InvalidTransition { from, to });
        }
        boq.status = to;
        boq.updated = Utc::now();
        tracing::info!(id = %boq.id, %from, %to, "status transition");
        Ok(())
    }

    /// Store a validation report; a report without errors promotes a draft
    pub fn record_validation(boq: &mut Boq, report: ValidationReport) -> Result<(), WorkflowError> {
        Self::ensure_editable(boq)?;
        let passed = !report.has_errors();
        boq.validation = Some(report);
        if passed {
            Self::transition(boq, Status::Validated)
        } else {
            if boq.status == Status::Validated {
                Self::transition(boq, Status::Draft)?;
            }
            Ok(())
        }
    }

    /// Approve using a freshly computed report
    pub fn approve(
        boq: &mut Boq,
        report: ValidationReport,
        approver: &str,
    ) -> Result<(), WorkflowError> {
        Self::ensure_editable(boq)?;
        if report.has_errors() {
            let errors = report.error_count;
            Self::record_validation(boq, report)?;
            return Err(WorkflowError::ValidationErrors { errors });
        }
        boq.validation = Some(report);
        Self::transition(boq, Status::Approved)?;
        boq.approved_by = Some(approver.to_string());
        boq.approved_at = Some(Utc::now());
        Ok(())
    }

    pub fn reject(boq: &mut Boq, reason: &str) -> Result<(), WorkflowError> {
        Self::ensure_editable(boq)?;
        if reason.trim().is_empty() {
            return Err(WorkflowError::MissingReason);
        }
        Self::transition(boq, Status::Rejected)?;
        boq.rejection_reason = Some(reason.trim().to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validation::{BoqValidator, ValidationRules};
    use crate::entities::boq::BoqItem;

    fn boq_with(items: Vec<BoqItem>) -> Boq {
        let mut boq = Boq::new("BOQ-2025-010", "L&T Campus Kitchen", "test".to_string());
        boq.customer_name = Some("L&T".to_string());
        for item in items {
            boq.add_item(item);
        }
        boq
    }

    fn report(boq: &Boq) -> ValidationReport {
        BoqValidator::new(&ValidationRules::default()).validate(boq)
    }

    #[test]
    fn test_valid_transitions() {
        assert!(BoqWorkflow::is_valid_transition(Status::Draft, Status::Validated));
        assert!(BoqWorkflow::is_valid_transition(Status::Validated, Status::Approved));
        assert!(!BoqWorkflow::is_valid_transition(Status::Approved, Status::Draft));
        assert!(!BoqWorkflow::is_valid_transition(Status::Rejected, Status::Approved));
        assert!(BoqWorkflow::allowed_transitions(Status::Approved).is_empty());
    }

    #[test]
    fn test_passing_validation_promotes_draft() {
        let mut boq = boq_with(vec![BoqItem::new("Hood", 2.0, "nos").with_price(90000.0)]);
        let r = report(&boq);
        BoqWorkflow::record_validation(&mut boq, r).unwrap();
        assert_eq!(boq.status, Status::Validated);
        assert!(boq.validation.is_some());
    }

    #[test]
    fn test_failed_validation_keeps_draft() {
        let mut boq = boq_with(vec![BoqItem::new("Hood", 0.0, "nos")]);
        let r = report(&boq);
        BoqWorkflow::record_validation(&mut boq, r).unwrap();
        assert_eq!(boq.status, Status::Draft);
    }

    #[test]
    fn test_approve_refuses_errors() {
        let mut boq = boq_with(vec![BoqItem::new("Hood", -1.0, "nos")]);
        let r = report(&boq);
        let err = BoqWorkflow::approve(&mut boq, r, "lead").unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Cannot approve BOQ with validation errors"));
        assert_eq!(boq.status, Status::Draft);
        assert!(boq.approved_by.is_none());
    }

    #[test]
    fn test_approve_then_locked() {
        let mut boq = boq_with(vec![BoqItem::new("Hood", 1.0, "nos").with_price(10.0)]);
        let r = report(&boq);
        BoqWorkflow::approve(&mut boq, r, "lead").unwrap();
        assert_eq!(boq.status, Status::Approved);
        assert_eq!(boq.approved_by.as_deref(), Some("lead"));

        assert!(matches!(
            BoqWorkflow::ensure_editable(&boq),
            Err(WorkflowError::Locked { .. })
        ));
        assert!(BoqWorkflow::reject(&mut boq, "too late").is_err());
    }

    #[test]
    fn test_reject_requires_reason() {
        let mut boq = boq_with(vec![BoqItem::new("Hood", 1.0, "nos")]);
        assert!(matches!(
            BoqWorkflow::reject(&mut boq, "  "),
            Err(WorkflowError::MissingReason)
        ));
        BoqWorkflow::reject(&mut boq, "scope changed").unwrap();
        assert_eq!(boq.status, Status::Rejected);
        assert_eq!(boq.rejection_reason.as_deref(), Some("scope changed"));
    }
}
