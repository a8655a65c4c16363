pub mod audit;
pub mod grievance;
pub mod incident;
pub mod project;
pub mod tenant;
pub mod user;

pub use audit::{
    AuditReport, AuditReportDetail, AuditResult, AuditResultInput, CreateAuditReport,
    NonConformity, NonConformityInput, UpdateAuditReport,
};
pub use grievance::{CreateGrievance, Grievance, UpdateGrievance};
pub use incident::{
    CorrectiveAction, CorrectiveActionInput, CreateIncidentReport, IncidentReport,
    IncidentReportDetail, InvolvedPerson, InvolvedPersonInput, UpdateIncidentReport,
};
pub use project::{CreateProject, Project, UpdateProject};
pub use tenant::{derive_slug, CreateTenant, Tenant, UpdateTenant};
pub use user::{CreateMember, Membership, Role, UpdateMember, User};
